//! Real-time phase reconstruction for a stream of spectral frames.
//!
//! [`RtpghiState`] keeps a three-frame history per channel, estimates the
//! phase time and frequency gradients from the analysis phase, and rebuilds
//! a coherent phase for the synthesis hop with a
//! [`PhaseGradientHeapIntegrator`]. The output lags the input by one frame.

use std::f64::consts::PI;

use rustfft::num_complex::Complex;

use super::integrator::PhaseGradientHeapIntegrator;

/// Stretch ratios this close to one pass the analysis phase through.
const BYPASS_THRESHOLD: f64 = 1e-4;

/// Wraps a phase into `[-pi, pi]`.
#[inline]
pub fn princarg(x: f64) -> f64 {
    x - 2.0 * PI * (x / (2.0 * PI)).round()
}

/// Per-channel frame history and phase reconstruction state.
#[derive(Debug)]
pub struct RtpghiState {
    num_chans: usize,
    bins: usize,
    fft_size: usize,
    synthesis_hop: usize,
    /// Magnitudes of frames n-2, n-1, n.
    magnitude: Vec<f64>,
    /// Analysis phase of frames n-2, n-1, n.
    phase_in: Vec<f64>,
    /// Time gradient of frames n-2, n-1.
    tgrad: Vec<f64>,
    /// Frequency gradient of frame n-1.
    fgrad: Vec<f64>,
    /// Output phase of the last emitted frame.
    phase: Vec<f64>,
    start_phase: Vec<f64>,
    stretch: f64,
    integrator: PhaseGradientHeapIntegrator,
}

impl RtpghiState {
    /// Creates the state for `num_chans` channels, a fixed synthesis hop and
    /// transform size `fft_size`.
    pub fn new(
        num_chans: usize,
        synthesis_hop: usize,
        fft_size: usize,
        tolerance: f64,
        seed: Option<u64>,
    ) -> Self {
        debug_check!(num_chans > 0, "num_chans must be positive");
        debug_check!(synthesis_hop > 0, "synthesis_hop must be positive");
        debug_check!(fft_size > 0, "fft_size must be positive");

        let bins = fft_size / 2 + 1;
        Self {
            num_chans,
            bins,
            fft_size,
            synthesis_hop: synthesis_hop.max(1),
            magnitude: vec![0.0; 3 * bins * num_chans],
            phase_in: vec![0.0; 3 * bins * num_chans],
            tgrad: vec![0.0; 2 * bins * num_chans],
            fgrad: vec![0.0; bins * num_chans],
            phase: vec![0.0; bins * num_chans],
            start_phase: vec![0.0; bins],
            stretch: 1.0,
            integrator: PhaseGradientHeapIntegrator::new(fft_size, tolerance, seed),
        }
    }

    /// Stretch used for the previous frame.
    pub fn stretch(&self) -> f64 {
        self.stretch
    }

    /// Number of channels.
    pub fn num_chans(&self) -> usize {
        self.num_chans
    }

    /// Bins per channel.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Relative magnitude below which bins get a random phase.
    pub fn tolerance(&self) -> f64 {
        self.integrator.tolerance()
    }

    /// Changes the random-phase threshold, see
    /// [`PhaseGradientHeapIntegrator::set_tolerance`].
    pub fn set_tolerance(&mut self, tolerance: f64) {
        self.integrator.set_tolerance(tolerance);
    }

    /// Clears the history.
    ///
    /// `initial` optionally provides, per channel, the magnitudes of the two
    /// most recent frames (`2 * bins` values each, older frame first). The
    /// newer one is emitted by the next call. Missing channels stay silent.
    pub fn reset(&mut self, initial: Option<&[&[f64]]>) {
        self.magnitude.fill(0.0);
        self.phase_in.fill(0.0);
        self.tgrad.fill(0.0);
        self.fgrad.fill(0.0);
        self.phase.fill(0.0);

        let m2 = self.bins;
        if let Some(initial) = initial {
            for (chan, init) in self
                .magnitude
                .chunks_exact_mut(3 * m2)
                .zip(initial.iter())
            {
                let n = init.len().min(2 * m2);
                chan[m2..m2 + n].copy_from_slice(&init[..n]);
            }
        }
    }

    /// Consumes one analysis frame and emits one synthesis frame for every
    /// channel.
    ///
    /// The emitted frame is the previous input frame with its phase rebuilt
    /// for the synthesis hop. `stretch` is the ratio the processor used to
    /// pick the hop of the incoming frame.
    pub fn execute(&mut self, input: &[Complex<f64>], stretch: f64, output: &mut [Complex<f64>]) {
        let m2 = self.bins;
        debug_check!(
            input.len() >= self.num_chans * m2,
            "input holds {} bins, {} needed",
            input.len(),
            self.num_chans * m2
        );
        debug_check!(
            output.len() >= self.num_chans * m2,
            "output holds {} bins, {} needed",
            output.len(),
            self.num_chans * m2
        );
        debug_check!(stretch > 0.0, "stretch must be positive");

        let asyn = self.synthesis_hop as f64;
        let old_stretch = self.stretch;
        let hop_prev = (asyn / old_stretch).round().max(1.0);
        let hop_next = (asyn / stretch).round().max(1.0);
        let bypass = (stretch - 1.0).abs() < BYPASS_THRESHOLD;

        for (w, (cin, cout)) in input
            .chunks_exact(m2)
            .zip(output.chunks_exact_mut(m2))
            .take(self.num_chans)
            .enumerate()
        {
            let mag = &mut self.magnitude[3 * w * m2..3 * (w + 1) * m2];
            let pin = &mut self.phase_in[3 * w * m2..3 * (w + 1) * m2];
            let tgrad = &mut self.tgrad[2 * w * m2..2 * (w + 1) * m2];
            let fgrad = &mut self.fgrad[w * m2..(w + 1) * m2];
            let phase = &mut self.phase[w * m2..(w + 1) * m2];

            mag.copy_within(m2.., 0);
            pin.copy_within(m2.., 0);
            tgrad.copy_within(m2.., 0);
            for ((s, p), c) in mag[2 * m2..].iter_mut().zip(&mut pin[2 * m2..]).zip(cin) {
                *s = c.norm();
                *p = c.arg();
            }

            time_gradient(
                pin,
                m2,
                self.fft_size,
                asyn,
                hop_prev,
                hop_next,
                &mut tgrad[m2..],
            );

            if bypass {
                phase.copy_from_slice(&pin[m2..2 * m2]);
            } else {
                frequency_gradient(&pin[m2..2 * m2], old_stretch, fgrad);
                self.start_phase.copy_from_slice(phase);
                self.integrator
                    .execute(&mag[..2 * m2], tgrad, fgrad, &self.start_phase, phase);
            }

            for ((c, &s), &p) in cout.iter_mut().zip(&mag[m2..2 * m2]).zip(phase.iter()) {
                *c = Complex::from_polar(s, p);
            }
        }

        self.stretch = stretch;
    }
}

/// Phase advance per synthesis hop of frame n-1, from a centred difference
/// over frames n-2, n-1 and n.
///
/// `phase` holds three columns of `bins` values. The expected advance of bin
/// `m` over an analysis hop is removed before wrapping, and the deviation is
/// rescaled to the synthesis hop.
fn time_gradient(
    phase: &[f64],
    bins: usize,
    fft_size: usize,
    asyn: f64,
    hop_prev: f64,
    hop_next: f64,
    out: &mut [f64],
) {
    let m = fft_size as f64;
    let omega_prev = 2.0 * PI * hop_prev / m;
    let omega_next = 2.0 * PI * hop_next / m;
    let omega_syn = 2.0 * PI * asyn / m;

    let (p0, rest) = phase.split_at(bins);
    let (p1, p2) = rest.split_at(bins);
    for (k, tg) in out.iter_mut().enumerate().take(bins) {
        let kf = k as f64;
        let dev_next = princarg(p2[k] - p1[k] - omega_next * kf) / hop_next;
        let dev_prev = princarg(p1[k] - p0[k] - omega_prev * kf) / hop_prev;
        *tg = asyn * (dev_next + dev_prev) / 2.0 + omega_syn * kf;
    }
}

/// Phase difference between neighbouring bins, scaled by the stretch.
///
/// Inner bins use a centred difference, the edge bins a one-sided one.
fn frequency_gradient(phase: &[f64], stretch: f64, out: &mut [f64]) {
    let bins = phase.len();
    if bins < 2 {
        out.iter_mut().for_each(|v| *v = 0.0);
        return;
    }
    for k in 1..bins - 1 {
        out[k] = (princarg(phase[k + 1] - phase[k]) + princarg(phase[k] - phase[k - 1])) / 2.0
            * stretch;
    }
    out[0] = princarg(phase[1] - phase[0]) * stretch;
    out[bins - 1] = princarg(phase[bins - 1] - phase[bins - 2]) * stretch;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const M: usize = 32;
    const M2: usize = M / 2 + 1;
    const ASYN: usize = 8;

    fn random_frame(seed: u64) -> Vec<Complex<f64>> {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..M2)
            .map(|_| Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect()
    }

    /// Frame n of a stationary signal analysed with hop `aana`.
    fn stationary_frame(n: usize, aana: usize, peak: usize) -> Vec<Complex<f64>> {
        (0..M2)
            .map(|m| {
                let d = m as f64 - peak as f64;
                let mag = (-d * d / 4.0).exp();
                let ph = 2.0 * PI * (m * aana * n) as f64 / M as f64;
                Complex::from_polar(mag, ph)
            })
            .collect()
    }

    #[test]
    fn test_princarg() {
        assert_relative_eq!(princarg(0.5), 0.5);
        assert_relative_eq!(princarg(2.0 * PI + 0.5), 0.5, epsilon = 1e-12);
        assert_relative_eq!(princarg(-3.0 * PI - 0.5), PI - 0.5, epsilon = 1e-12);
        assert!(princarg(7.0).abs() <= PI);
    }

    #[test]
    fn test_first_frame_is_silent() {
        let mut state = RtpghiState::new(1, ASYN, M, 1e-6, Some(1));
        let input = random_frame(1);
        let mut output = vec![Complex::new(9.0, 9.0); M2];
        state.execute(&input, 2.0, &mut output);
        for c in &output {
            assert_eq!(c.norm(), 0.0);
        }
    }

    #[test]
    fn test_bypass_copies_previous_frame() {
        for stretch in [1.0, 1.0 + 1e-5, 1.0 - 1e-5] {
            let mut state = RtpghiState::new(2, ASYN, M, 1e-6, Some(1));
            let mut previous: Option<Vec<Complex<f64>>> = None;
            for n in 0..4 {
                let mut input = random_frame(2 * n);
                input.extend(random_frame(2 * n + 1));
                let mut output = vec![Complex::new(0.0, 0.0); 2 * M2];
                state.execute(&input, stretch, &mut output);

                if let Some(prev) = &previous {
                    for (o, c) in output.iter().zip(prev) {
                        assert_eq!(*o, Complex::from_polar(c.norm(), c.arg()));
                    }
                }
                previous = Some(input);
            }
            assert_eq!(state.stretch(), stretch);
        }
    }

    #[test]
    fn test_stationary_peak_advances_by_synthesis_hop() {
        let stretch = 2.0;
        let aana = ASYN / 2;
        let peak = 3;
        let mut state = RtpghiState::new(1, ASYN, M, 1e-6, Some(7));
        let mut output = vec![Complex::new(0.0, 0.0); M2];
        let mut last_phase = None;
        let expected = 2.0 * PI * (peak * ASYN) as f64 / M as f64;

        for n in 0..8 {
            let input = stationary_frame(n, aana, peak);
            state.execute(&input, stretch, &mut output);
            let ph = output[peak].arg();
            if n >= 3 {
                let prev: f64 = last_phase.unwrap();
                assert_relative_eq!(princarg(ph - prev - expected), 0.0, epsilon = 1e-9);
            }
            last_phase = Some(ph);
        }
    }

    #[test]
    fn test_magnitude_is_preserved() {
        let mut state = RtpghiState::new(1, ASYN, M, 1e-6, Some(7));
        let frames: Vec<_> = (0..5).map(|n| random_frame(100 + n)).collect();
        let mut output = vec![Complex::new(0.0, 0.0); M2];
        for (n, frame) in frames.iter().enumerate() {
            state.execute(frame, 1.5, &mut output);
            if n > 0 {
                for (o, c) in output.iter().zip(&frames[n - 1]) {
                    assert_relative_eq!(o.norm(), c.norm(), epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn test_reset_with_initial_magnitudes() {
        let mut state = RtpghiState::new(2, ASYN, M, 1e-6, Some(7));
        let mut output = vec![Complex::new(0.0, 0.0); 2 * M2];
        let mut input = random_frame(5);
        input.extend(random_frame(6));
        state.execute(&input, 2.0, &mut output);

        let init = vec![0.25; 2 * M2];
        state.reset(Some(&[&init[..]]));

        // The newer initial frame of channel 0 is emitted on the next call.
        let silent = vec![Complex::new(0.0, 0.0); 2 * M2];
        state.execute(&silent, 2.0, &mut output);
        for c in &output[..M2] {
            assert_relative_eq!(c.norm(), 0.25, epsilon = 1e-12);
        }
        for c in &output[M2..] {
            assert_eq!(c.norm(), 0.0);
        }
    }

    #[test]
    fn test_frequency_gradient_edges() {
        let phase = [0.0, 0.5, 1.5, 1.0];
        let mut out = [0.0; 4];
        frequency_gradient(&phase, 2.0, &mut out);
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], 1.5);
        assert_relative_eq!(out[2], 0.5);
        assert_relative_eq!(out[3], -1.0);
    }

    #[test]
    fn test_tolerance_passthrough() {
        let mut state = RtpghiState::new(1, ASYN, M, 1e-6, None);
        state.set_tolerance(1e-2);
        assert_eq!(state.tolerance(), 1e-2);
        assert_eq!(state.bins(), M2);
        assert_eq!(state.num_chans(), 1);
    }
}
