#![allow(dead_code)]

use std::f64::consts::PI;

use rtpv::PhaseVocoder;

/// Sine at `freq` cycles per sample.
pub fn gen_sine(freq: f64, n: usize, amp: f64) -> Vec<f64> {
    (0..n).map(|i| amp * (2.0 * PI * freq * i as f64).sin()).collect()
}

pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Frequency in cycles per sample estimated from the zero-crossing rate.
pub fn dominant_frequency(samples: &[f64]) -> f64 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
        .count();
    crossings as f64 / (2.0 * (samples.len() - 1) as f64)
}

/// Streams `channels` through `pv` in blocks of `block_len` at a fixed
/// stretch and returns everything produced, one `Vec` per channel.
pub fn run_blocks(
    pv: &mut PhaseVocoder,
    channels: &[Vec<f64>],
    block_len: usize,
    stretch: f64,
) -> Vec<Vec<f64>> {
    let num_chans = channels.len();
    let frames = channels[0].len();
    let mut output = vec![Vec::new(); num_chans];
    let mut out_block = vec![vec![0.0; block_len * 11]; num_chans];

    pv.set_stretch(stretch);
    let mut pos = 0;
    while pos < frames {
        let len = block_len.min(frames - pos);
        let out_len = pv.next_outlen(len);
        let inputs: Vec<&[f64]> = channels.iter().map(|ch| &ch[pos..pos + len]).collect();
        let outputs: Vec<&mut [f64]> = out_block.iter_mut().map(|b| &mut b[..out_len]).collect();
        pv.execute(inputs, len, stretch, outputs, out_len);
        for (out, block) in output.iter_mut().zip(&out_block) {
            out.extend_from_slice(&block[..out_len]);
        }
        pos += len;
    }
    output
}
