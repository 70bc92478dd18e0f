#![forbid(unsafe_code)]
//! Real-time phase vocoder with phase gradient heap integration.
//!
//! `rtpv` time-stretches audio streams without changing their pitch. Audio is
//! analysed with a short-time Fourier transform, the phase of every frame is
//! rebuilt from the magnitudes alone by integrating their time and frequency
//! derivatives along a magnitude-ordered heap (RTPGHI), and the frames are
//! resynthesized at a fixed hop. The stretch ratio may change on every call.
//!
//! All buffers are allocated at construction; the processing calls never
//! allocate, lock or fail.
//!
//! # Quick Start
//!
//! ```
//! use rtpv::{PhaseVocoder, VocoderConfig};
//!
//! let config = VocoderConfig::default().with_max_channels(1).with_seed(7);
//! let mut pv = PhaseVocoder::new(config).unwrap();
//!
//! let input: Vec<f64> = (0..1024).map(|i| (i as f64 * 0.05).sin()).collect();
//! let out_len = pv.next_outlen(input.len());
//! let mut output = vec![0.0; out_len];
//! pv.execute([input.as_slice()], input.len(), 1.0, [output.as_mut_slice()], out_len);
//! ```
//!
//! # Offline
//!
//! [`stretch`] runs whole signals through a vocoder and removes its delay:
//!
//! ```
//! use rtpv::VocoderConfig;
//!
//! let signal = vec![vec![0.0; 4096]];
//! let config = VocoderConfig::default().with_max_channels(1).with_seed(7);
//! let out = rtpv::stretch(&signal, 2.0, config).unwrap();
//! assert_eq!(out[0].len(), 8192);
//! ```

#[macro_use]
mod macros;

pub mod core;
pub mod error;
pub mod io;
pub mod stream;
pub mod stretch;

pub use core::window::WindowShape;
pub use error::VocoderError;
pub use stream::{FrameLayout, Identity, ProcessorConfig, SpectralProcessor, StreamingTransformProcessor};
pub use stretch::{PhaseVocoder, Position, VocoderConfig};

/// Stretches whole signals, one `Vec` per channel.
///
/// Streams the input through a [`PhaseVocoder`] in blocks of
/// `config.max_block_len`, feeds silence until the processing delay has been
/// flushed, and returns `round(len * stretch)` samples per channel aligned
/// with the input. The stretch is quantized the same way
/// [`PhaseVocoder::set_stretch`] does.
///
/// # Errors
/// Returns an error if the configuration is invalid, if there are no channels
/// or more than `config.max_channels`, or if the channels differ in length.
pub fn stretch(
    input: &[Vec<f64>],
    stretch: f64,
    config: VocoderConfig,
) -> Result<Vec<Vec<f64>>, VocoderError> {
    let num_chans = input.len();
    if num_chans == 0 {
        return Err(VocoderError::InvalidFormat("input has no channels".to_string()));
    }
    if num_chans > config.max_channels {
        return Err(VocoderError::TooManyChannels {
            provided: num_chans,
            max: config.max_channels,
        });
    }
    let frames = input[0].len();
    if input.iter().any(|ch| ch.len() != frames) {
        return Err(VocoderError::InvalidFormat(
            "channels differ in length".to_string(),
        ));
    }

    let block_len = config.max_block_len;
    let mut pv = PhaseVocoder::new(config)?;
    pv.set_stretch(stretch);

    let skip = pv.output_latency();
    let wanted = (frames as f64 * pv.stretch()).round() as usize;
    tracing::debug!(
        stretch = pv.stretch(),
        latency = pv.latency(),
        output_latency = skip,
        "offline stretch"
    );

    let max_out = pv.next_outlen(block_len) + 1;
    let mut in_buf = vec![0.0; num_chans * block_len];
    let mut out_buf = vec![0.0; num_chans * max_out];
    let mut output = vec![Vec::with_capacity(skip + wanted + max_out); num_chans];

    let mut pos = 0;
    while output[0].len() < skip + wanted {
        // silence once the input runs out
        let len = if pos < frames {
            block_len.min(frames - pos)
        } else {
            block_len
        };
        for (src, chunk) in input.iter().zip(in_buf.chunks_mut(len)) {
            let avail = src.get(pos..).unwrap_or(&[]);
            let copied = avail.len().min(len);
            chunk[..copied].copy_from_slice(&avail[..copied]);
            chunk[copied..].fill(0.0);
        }
        pos += len;

        let out_len = pv.next_outlen(len).min(max_out);
        pv.execute_compact(&in_buf, len, num_chans, stretch, &mut out_buf, out_len);
        if out_len > 0 {
            for (ch, chunk) in output.iter_mut().zip(out_buf.chunks(out_len)) {
                ch.extend_from_slice(chunk);
            }
        }
    }
    pv.log_position();

    for ch in &mut output {
        ch.drain(..skip);
        ch.truncate(wanted);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> VocoderConfig {
        VocoderConfig::default()
            .with_max_channels(2)
            .with_max_block_len(64)
            .with_synthesis_hop(64)
            .with_fft_size(512)
            .with_window_len(256)
            .with_max_stretch(4.0)
            .with_seed(5)
    }

    #[test]
    fn test_stretch_length() {
        let tone: Vec<f64> = (0..2000).map(|i| (i as f64 * 0.1).sin() * 0.5).collect();
        let output = stretch(&[tone.clone(), tone], 2.0, small_config()).unwrap();
        assert_eq!(output.len(), 2);
        assert_eq!(output[0].len(), 4000);
        assert_eq!(output[1].len(), 4000);
    }

    #[test]
    fn test_unit_stretch_is_transparent() {
        let tone: Vec<f64> = (0..1500).map(|i| (i as f64 * 0.07).sin()).collect();
        let output = stretch(&[tone.clone()], 1.0, small_config()).unwrap();
        assert_eq!(output[0].len(), tone.len());
        for (o, i) in output[0].iter().zip(&tone) {
            assert!((o - i).abs() < 1e-9, "{} vs {}", o, i);
        }
    }

    #[test]
    fn test_stretch_rejects_bad_input() {
        assert!(matches!(
            stretch(&[], 1.0, small_config()),
            Err(VocoderError::InvalidFormat(_))
        ));
        assert!(matches!(
            stretch(&vec![vec![0.0; 10]; 3], 1.0, small_config()),
            Err(VocoderError::TooManyChannels { provided: 3, max: 2 })
        ));
        assert!(matches!(
            stretch(&[vec![0.0; 10], vec![0.0; 11]], 1.0, small_config()),
            Err(VocoderError::InvalidFormat(_))
        ));
        assert!(matches!(
            stretch(&[vec![0.0; 10]], 1.0, small_config().with_fft_size(128)),
            Err(VocoderError::InvalidConfig(_))
        ));
    }
}
