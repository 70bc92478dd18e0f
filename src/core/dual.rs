//! Canonical dual windows for painless Gabor frames.
//!
//! A frame with window `g`, hop `a` and `m` channels is painless when
//! `m >= g.len()` and `m > a`. The frame operator is then diagonal and the
//! canonical dual is the window divided by that diagonal.

use super::array::periodize;
use crate::error::VocoderError;

/// Sum of `g[t]^2` over every `t` congruent to `k` modulo `a`, for `k < a`.
///
/// `g` is zero-delay, so sample `i` sits at time `i` in the right half and
/// `i - g.len()` in the left half.
fn energy_per_phase(g: &[f64], a: usize) -> Vec<f64> {
    let gl = g.len() as isize;
    let half = g.len().div_ceil(2);
    let mut d = vec![0.0; a];
    for (i, &v) in g.iter().enumerate() {
        let t = if i < half { i as isize } else { i as isize - gl };
        d[t.rem_euclid(a as isize) as usize] += v * v;
    }
    d
}

/// Diagonal of the frame operator of `(g, a, m)` over `len` samples.
///
/// The diagonal is `a`-periodic: `out[l] = m * sum_n g(l - n*a)^2`.
pub fn frame_diagonal(g: &[f64], a: usize, m: usize, len: usize) -> Vec<f64> {
    let mut out = vec![0.0; len];
    if a == 0 {
        return out;
    }
    let mut d = energy_per_phase(g, a);
    let scale = m as f64;
    for v in d.iter_mut() {
        *v *= scale;
    }
    periodize(&d, &mut out);
    out
}

/// Computes the dual of `g` for hop `a` and `m` channels.
///
/// The result is scaled for an inverse transform normalized by `1 / m`, so
/// overlap-adding `g * dual` at hop `a` sums to one everywhere. Returns an
/// error outside the painless regime or when the window leaves gaps at this
/// hop.
pub fn painless_dual(g: &[f64], a: usize, m: usize) -> Result<Vec<f64>, VocoderError> {
    if g.is_empty() {
        return Err(VocoderError::InvalidConfig(
            "window must not be empty".to_string(),
        ));
    }
    if a == 0 {
        return Err(VocoderError::InvalidConfig(
            "hop must be positive".to_string(),
        ));
    }
    if m < g.len() || m <= a {
        return Err(VocoderError::InvalidConfig(format!(
            "frame is not painless: window length {}, hop {}, {} channels",
            g.len(),
            a,
            m
        )));
    }

    let d = energy_per_phase(g, a);
    if d.iter().any(|&v| v <= f64::EPSILON) {
        return Err(VocoderError::InvalidConfig(format!(
            "window of length {} does not cover hop {}",
            g.len(),
            a
        )));
    }

    let gl = g.len() as isize;
    let half = g.len().div_ceil(2);
    let dual = g
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let t = if i < half { i as isize } else { i as isize - gl };
            v / d[t.rem_euclid(a as isize) as usize]
        })
        .collect();
    Ok(dual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::window::{generate_window, WindowShape};
    use approx::assert_relative_eq;

    /// Overlap-adds `g * gd` at hop `a` and returns one period of the result.
    fn overlap_sum(g: &[f64], gd: &[f64], a: usize) -> Vec<f64> {
        let gl = g.len() as isize;
        let half = g.len().div_ceil(2);
        let mut acc = vec![0.0; a];
        for i in 0..g.len() {
            let t = if i < half { i as isize } else { i as isize - gl };
            acc[t.rem_euclid(a as isize) as usize] += g[i] * gd[i];
        }
        acc
    }

    #[test]
    fn test_hann_dual_reconstructs() {
        let g = generate_window(WindowShape::Hann, 64);
        let gd = painless_dual(&g, 16, 128).unwrap();
        for v in overlap_sum(&g, &gd, 16) {
            assert_relative_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_hann_dual_at_75_percent_overlap_is_scaled_window() {
        // Squared Hann at 75% overlap sums to 1.5.
        let g = generate_window(WindowShape::Hann, 64);
        let gd = painless_dual(&g, 16, 64).unwrap();
        for (a, b) in g.iter().zip(&gd) {
            assert_relative_eq!(*b, a / 1.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_odd_window_dual_reconstructs() {
        let g = generate_window(WindowShape::Blackman, 45);
        let gd = painless_dual(&g, 9, 64).unwrap();
        for v in overlap_sum(&g, &gd, 9) {
            assert_relative_eq!(v, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_not_painless_is_rejected() {
        let g = generate_window(WindowShape::Hann, 64);
        assert!(painless_dual(&g, 16, 32).is_err());
        assert!(painless_dual(&g, 64, 64).is_err());
        assert!(painless_dual(&g, 0, 128).is_err());
        assert!(painless_dual(&[], 4, 128).is_err());
    }

    #[test]
    fn test_gap_is_rejected() {
        let g = generate_window(WindowShape::Rect, 8);
        assert!(painless_dual(&g, 12, 16).is_err());
    }

    #[test]
    fn test_frame_diagonal_is_periodic_and_scaled() {
        let g = generate_window(WindowShape::Hann, 64);
        let diag = frame_diagonal(&g, 16, 128, 96);
        assert_eq!(diag.len(), 96);
        for l in 16..96 {
            assert_eq!(diag[l], diag[l - 16]);
        }
        // Hann at 75% overlap has a constant energy sum of 1.5.
        for &v in &diag {
            assert_relative_eq!(v, 128.0 * 1.5, epsilon = 1e-9);
        }
    }
}
