//! Phase Gradient Heap Integration for one frame.
//!
//! Given the magnitudes of two consecutive frames, the phase time gradient of
//! both and the phase frequency gradient of the newer one, the integrator
//! reconstructs the newer frame's phase from the older frame's phase. Bins
//! are visited loudest first, so integration spreads outward from the most
//! reliable coefficients.

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::heap::MagnitudeHeap;

/// Integration state of one bin of the frame being reconstructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinState {
    Pending,
    Known,
    Random,
}

/// Reconstructs one frame of phase per call.
///
/// All slices passed to [`execute`](Self::execute) use two-column layouts of
/// `2 * bins` values: column 0 is the previous frame, column 1 the frame
/// being reconstructed. Heap keys below `bins` refer to column 0, the others
/// to column 1.
#[derive(Debug)]
pub struct PhaseGradientHeapIntegrator {
    bins: usize,
    tolerance: f64,
    state: Vec<BinState>,
    heap: MagnitudeHeap,
    rng: StdRng,
}

impl PhaseGradientHeapIntegrator {
    /// Creates an integrator for transforms of size `fft_size`.
    ///
    /// Bins of the reconstructed frame quieter than `tolerance` times the
    /// loudest bin of either frame get a random phase. `seed` makes those
    /// random phases reproducible; `None` seeds from the operating system.
    pub fn new(fft_size: usize, tolerance: f64, seed: Option<u64>) -> Self {
        debug_check!(fft_size > 0, "fft_size must be positive");
        debug_check!(
            tolerance > 0.0 && tolerance < 1.0,
            "tolerance {} outside (0, 1)",
            tolerance
        );
        let bins = fft_size / 2 + 1;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            bins,
            tolerance,
            state: vec![BinState::Pending; bins],
            heap: MagnitudeHeap::with_capacity(2 * bins),
            rng,
        }
    }

    /// Number of bins per frame.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Relative magnitude below which bins get a random phase.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Changes the relative magnitude threshold. Values outside `(0, 1)` are
    /// ignored.
    pub fn set_tolerance(&mut self, tolerance: f64) {
        debug_check!(
            tolerance > 0.0 && tolerance < 1.0,
            "tolerance {} outside (0, 1)",
            tolerance
        );
        if tolerance > 0.0 && tolerance < 1.0 {
            self.tolerance = tolerance;
        }
    }

    /// Integrates the phase of column 1 into `phase`.
    ///
    /// * `s` - magnitudes, two columns
    /// * `tgrad` - phase time gradient, two columns
    /// * `fgrad` - phase frequency gradient of column 1
    /// * `start_phase` - phase of column 0
    pub fn execute(
        &mut self,
        s: &[f64],
        tgrad: &[f64],
        fgrad: &[f64],
        start_phase: &[f64],
        phase: &mut [f64],
    ) {
        self.state.fill(BinState::Pending);
        self.integrate(s, tgrad, fgrad, start_phase, phase);
    }

    /// Like [`execute`](Self::execute), but bins flagged in `known` already
    /// hold their final phase in `phase` and seed the integration directly.
    pub fn execute_with_mask(
        &mut self,
        s: &[f64],
        tgrad: &[f64],
        fgrad: &[f64],
        start_phase: &[f64],
        known: &[bool],
        phase: &mut [f64],
    ) {
        debug_check!(known.len() >= self.bins, "mask shorter than {}", self.bins);
        for (state, &k) in self.state.iter_mut().zip(known) {
            *state = if k { BinState::Known } else { BinState::Pending };
        }
        self.integrate(s, tgrad, fgrad, start_phase, phase);
    }

    fn integrate(
        &mut self,
        s: &[f64],
        tgrad: &[f64],
        fgrad: &[f64],
        start_phase: &[f64],
        phase: &mut [f64],
    ) {
        let m2 = self.bins;
        debug_check!(s.len() >= 2 * m2, "magnitudes shorter than {}", 2 * m2);
        debug_check!(tgrad.len() >= 2 * m2, "tgrad shorter than {}", 2 * m2);
        debug_check!(fgrad.len() >= m2, "fgrad shorter than {}", m2);
        debug_check!(start_phase.len() >= m2, "start phase shorter than {}", m2);
        debug_check!(phase.len() >= m2, "phase shorter than {}", m2);
        if s.len() < 2 * m2
            || tgrad.len() < 2 * m2
            || fgrad.len() < m2
            || start_phase.len() < m2
            || phase.len() < m2
        {
            return;
        }

        let s = &s[..2 * m2];
        let max = s.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let abs_tol = max * self.tolerance;
        let next_mag = &s[m2..];

        let mut heap = self.heap.bind(s);
        // Bins of column 1 still waiting for a phase.
        let mut remaining = m2;

        for m in 0..m2 {
            match self.state[m] {
                BinState::Known => {
                    heap.push(m + m2);
                    remaining -= 1;
                }
                _ if next_mag[m] <= abs_tol => {
                    self.state[m] = BinState::Random;
                    remaining -= 1;
                }
                _ => heap.push(m),
            }
        }

        while remaining > 0 {
            let Some(key) = heap.pop() else {
                break;
            };

            if key >= m2 {
                // Column 1: spread along frequency.
                let m = key - m2;
                if m + 1 < m2 && self.state[m + 1] == BinState::Pending {
                    phase[m + 1] = phase[m] + (fgrad[m] + fgrad[m + 1]) / 2.0;
                    self.state[m + 1] = BinState::Known;
                    heap.push(key + 1);
                    remaining -= 1;
                }
                if m > 0 && self.state[m - 1] == BinState::Pending {
                    phase[m - 1] = phase[m] - (fgrad[m] + fgrad[m - 1]) / 2.0;
                    self.state[m - 1] = BinState::Known;
                    heap.push(key - 1);
                    remaining -= 1;
                }
            } else if self.state[key] == BinState::Pending {
                // Column 0: step forward in time.
                phase[key] = start_phase[key] + (tgrad[key] + tgrad[key + m2]) / 2.0;
                self.state[key] = BinState::Known;
                heap.push(key + m2);
                remaining -= 1;
            }
        }
        drop(heap);

        for (p, state) in phase.iter_mut().zip(&self.state) {
            if *state == BinState::Random {
                *p = self.rng.gen_range(-2.0 * PI..2.0 * PI);
            }
        }
    }
}
