use crate::error::VocoderError;
use std::io::{Read, Write};
use std::path::Path;

/// WAV audio format codes.
const WAV_FORMAT_PCM: u16 = 1;
const WAV_FORMAT_IEEE_FLOAT: u16 = 3;

/// Sample encoding used when writing a WAV file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 16-bit signed PCM.
    #[default]
    Pcm16,
    /// 32-bit IEEE float.
    Float32,
}

/// Decoded audio, one `Vec` per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct WavAudio {
    /// Per-channel samples, all of equal length.
    pub channels: Vec<Vec<f64>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl WavAudio {
    /// Creates audio from per-channel samples.
    pub fn new(channels: Vec<Vec<f64>>, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate,
        }
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel.
    pub fn num_frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Samples in channel-major order: all of channel 0, then channel 1, ...
    pub fn to_channel_major(&self) -> Vec<f64> {
        self.channels.concat()
    }

    /// Builds audio from a channel-major buffer of `num_channels` channels.
    pub fn from_channel_major(data: &[f64], num_channels: usize, sample_rate: u32) -> Self {
        let frames = if num_channels == 0 {
            0
        } else {
            data.len() / num_channels
        };
        let channels = (0..num_channels)
            .map(|c| data[c * frames..(c + 1) * frames].to_vec())
            .collect();
        Self::new(channels, sample_rate)
    }

    fn interleaved(&self) -> impl Iterator<Item = f64> + '_ {
        let frames = self.num_frames();
        (0..frames).flat_map(move |i| {
            self.channels
                .iter()
                .map(move |ch| ch.get(i).copied().unwrap_or(0.0))
        })
    }
}

/// Reads a WAV file from a byte slice.
///
/// Supports 16- and 24-bit PCM and 32-bit float with any channel count.
pub fn read_wav(data: &[u8]) -> Result<WavAudio, VocoderError> {
    let mut cursor = 0;

    if data.len() < 44 {
        return Err(VocoderError::InvalidFormat(
            "WAV file too short".to_string(),
        ));
    }

    if &data[0..4] != b"RIFF" {
        return Err(VocoderError::InvalidFormat(
            "Missing RIFF header".to_string(),
        ));
    }
    cursor += 8;

    if &data[cursor..cursor + 4] != b"WAVE" {
        return Err(VocoderError::InvalidFormat(
            "Missing WAVE identifier".to_string(),
        ));
    }
    cursor += 4;

    let mut format_code: u16 = 0;
    let mut num_channels: u16 = 0;
    let mut sample_rate: u32 = 0;
    let mut bits_per_sample: u16 = 0;
    let mut audio_data: &[u8] = &[];

    while cursor + 8 <= data.len() {
        let chunk_id = &data[cursor..cursor + 4];
        let chunk_size = read_u32_le(data, cursor + 4) as usize;
        cursor += 8;

        if chunk_id == b"fmt " {
            if cursor + 16 > data.len() {
                return Err(VocoderError::InvalidFormat(
                    "fmt chunk too short".to_string(),
                ));
            }
            format_code = read_u16_le(data, cursor);
            num_channels = read_u16_le(data, cursor + 2);
            sample_rate = read_u32_le(data, cursor + 4);
            // byte rate and block align are implied
            bits_per_sample = read_u16_le(data, cursor + 14);
        } else if chunk_id == b"data" {
            let end = cursor.saturating_add(chunk_size).min(data.len());
            audio_data = &data[cursor..end];
        }

        cursor = cursor.saturating_add(chunk_size);
        // chunks are word-aligned
        if chunk_size % 2 != 0 {
            cursor = cursor.saturating_add(1);
        }
    }

    if sample_rate == 0 {
        return Err(VocoderError::InvalidFormat(
            "No fmt chunk found".to_string(),
        ));
    }
    if num_channels == 0 {
        return Err(VocoderError::InvalidFormat(
            "WAV file declares zero channels".to_string(),
        ));
    }

    let samples: Vec<f64> = match (format_code, bits_per_sample) {
        (WAV_FORMAT_PCM, 16) => audio_data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f64 / 32768.0)
            .collect(),
        (WAV_FORMAT_PCM, 24) => audio_data
            .chunks_exact(3)
            .map(|b| {
                // sign-extend through the top byte
                let raw = i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8;
                raw as f64 / 8_388_608.0
            })
            .collect(),
        (WAV_FORMAT_IEEE_FLOAT, 32) => audio_data
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        (fmt, bits) => {
            return Err(VocoderError::InvalidFormat(format!(
                "Unsupported WAV format: code={}, bits={}",
                fmt, bits
            )))
        }
    };

    let num_channels = num_channels as usize;
    let frames = samples.len() / num_channels;
    let mut channels = vec![Vec::with_capacity(frames); num_channels];
    for frame in samples.chunks_exact(num_channels) {
        for (ch, &s) in channels.iter_mut().zip(frame) {
            ch.push(s);
        }
    }

    Ok(WavAudio::new(channels, sample_rate))
}

/// Reads a WAV file from disk.
pub fn read_wav_file(path: impl AsRef<Path>) -> Result<WavAudio, VocoderError> {
    let mut file = std::fs::File::open(path)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    read_wav(&data)
}

/// Encodes audio as a WAV file in the given sample format.
pub fn write_wav(audio: &WavAudio, format: SampleFormat) -> Result<Vec<u8>, VocoderError> {
    let num_channels = u16::try_from(audio.num_channels())
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            VocoderError::InvalidFormat(format!(
                "Cannot write {} channels",
                audio.num_channels()
            ))
        })?;
    let (format_code, bits_per_sample) = match format {
        SampleFormat::Pcm16 => (WAV_FORMAT_PCM, 16u16),
        SampleFormat::Float32 => (WAV_FORMAT_IEEE_FLOAT, 32u16),
    };
    let bytes_per_sample = (bits_per_sample / 8) as usize;
    let block_align = num_channels * (bits_per_sample / 8);
    let byte_rate = audio.sample_rate * block_align as u32;
    let data_size = u32::try_from(audio.num_frames() * block_align as usize).map_err(|_| {
        VocoderError::InvalidFormat("Audio too long for a WAV file".to_string())
    })?;
    let file_size = 36 + data_size;

    let mut out = Vec::with_capacity(44 + data_size as usize);

    // RIFF header
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&file_size.to_le_bytes());
    out.extend_from_slice(b"WAVE");

    // fmt chunk
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&format_code.to_le_bytes());
    out.extend_from_slice(&num_channels.to_le_bytes());
    out.extend_from_slice(&audio.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_size.to_le_bytes());

    for sample in audio.interleaved() {
        match format {
            SampleFormat::Pcm16 => {
                let raw = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                out.extend_from_slice(&raw.to_le_bytes());
            }
            SampleFormat::Float32 => out.extend_from_slice(&(sample as f32).to_le_bytes()),
        }
    }
    debug_check!(
        out.len() == 44 + audio.num_frames() * num_channels as usize * bytes_per_sample,
        "WAV size mismatch"
    );

    Ok(out)
}

/// Writes a WAV file to disk.
pub fn write_wav_file(
    path: impl AsRef<Path>,
    audio: &WavAudio,
    format: SampleFormat,
) -> Result<(), VocoderError> {
    let data = write_wav(audio, format)?;
    let mut file = std::fs::File::create(path)?;
    file.write_all(&data)?;
    Ok(())
}

#[inline]
fn read_u16_le(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

#[inline]
fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}
