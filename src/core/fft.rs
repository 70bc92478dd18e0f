//! Windowed single-frame transforms between time frames and half spectra.
//!
//! [`FramedTransform`] maps a `gl`-sample frame to `M/2+1` complex bins,
//! [`InverseFramedTransform`] maps them back. Frames shorter than `M` are
//! zero-padded, longer frames are folded (aliased) onto `M` samples, and the
//! inverse periodizes instead, which is the adjoint of folding.
//!
//! Both transforms plan their FFT once at construction and reuse their
//! scratch buffers, so `execute` never allocates.

use std::sync::Arc;

use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::num_complex::Complex;

use super::array::{circshift, fftshift, fold, periodize};

/// Zero-valued complex number, used for spectrum buffer initialization.
pub const COMPLEX_ZERO: Complex<f64> = Complex::new(0.0, 0.0);

/// Number of non-redundant bins of a real transform of size `m`.
#[inline]
pub fn half_spectrum_len(m: usize) -> usize {
    m / 2 + 1
}

/// Where the time origin of a frame sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseConvention {
    /// The frame centre is time zero; stationary sinusoids keep a constant
    /// phase from frame to frame apart from their own rotation.
    #[default]
    Zero,
    /// The first sample of the frame is time zero.
    HalfShift,
}

/// Forward windowed transform of one frame per channel.
pub struct FramedTransform {
    window: Vec<f64>,
    m: usize,
    phase: PhaseConvention,
    frame_buf: Vec<f64>,
    fft_buf: Vec<f64>,
    scratch: Vec<Complex<f64>>,
    fft: Arc<dyn RealToComplex<f64>>,
}

impl FramedTransform {
    /// Creates a forward transform of size `m` for the zero-delay `window`.
    pub fn new(window: &[f64], m: usize, phase: PhaseConvention) -> Self {
        debug_check!(!window.is_empty(), "window must not be empty");
        debug_check!(m > 0, "transform size must be positive");

        let mut centred = window.to_vec();
        fftshift(&mut centred);

        let m = m.max(1);
        let mut planner = RealFftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(m);
        let scratch = fft.make_scratch_vec();

        Self {
            frame_buf: vec![0.0; centred.len()],
            window: centred,
            m,
            phase,
            fft_buf: vec![0.0; m],
            scratch,
            fft,
        }
    }

    /// Window length.
    #[inline]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Transform size.
    #[inline]
    pub fn size(&self) -> usize {
        self.m
    }

    /// Phase convention in use.
    #[inline]
    pub fn phase_convention(&self) -> PhaseConvention {
        self.phase
    }

    /// Transforms `num_chans` frames laid out back to back with stride
    /// `window_len()` into `num_chans` half spectra with stride `M/2+1`.
    pub fn execute(&mut self, frames: &[f64], num_chans: usize, out: &mut [Complex<f64>]) {
        let gl = self.window.len();
        let m2 = half_spectrum_len(self.m);
        if gl == 0 {
            out.fill(COMPLEX_ZERO);
            return;
        }
        debug_check!(
            frames.len() >= num_chans * gl,
            "{} frame samples for {} channels",
            frames.len(),
            num_chans
        );
        debug_check!(
            out.len() >= num_chans * m2,
            "{} bins for {} channels",
            out.len(),
            num_chans
        );

        for (frame, spectrum) in frames
            .chunks_exact(gl)
            .zip(out.chunks_exact_mut(m2))
            .take(num_chans)
        {
            for ((dst, &x), &g) in self.frame_buf.iter_mut().zip(frame).zip(&self.window) {
                *dst = x * g;
            }
            fold(&self.frame_buf, &mut self.fft_buf);
            if self.phase == PhaseConvention::Zero {
                circshift(&mut self.fft_buf, -((gl / 2) as isize));
            }

            if let Err(err) =
                self.fft
                    .process_with_scratch(&mut self.fft_buf, spectrum, &mut self.scratch)
            {
                tracing::error!(error = %err, "forward transform failed");
                spectrum.fill(COMPLEX_ZERO);
            }
        }
    }
}

impl std::fmt::Debug for FramedTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FramedTransform")
            .field("window_len", &self.window.len())
            .field("size", &self.m)
            .field("phase", &self.phase)
            .finish()
    }
}

/// Inverse windowed transform of one half spectrum per channel.
///
/// The inverse FFT is normalized by `1/M`, so with a rectangular window and
/// `gl == M` the pair is an exact identity.
pub struct InverseFramedTransform {
    window: Vec<f64>,
    m: usize,
    phase: PhaseConvention,
    spec_buf: Vec<Complex<f64>>,
    fft_buf: Vec<f64>,
    scratch: Vec<Complex<f64>>,
    ifft: Arc<dyn ComplexToReal<f64>>,
}

impl InverseFramedTransform {
    /// Creates an inverse transform of size `m` for the zero-delay `window`.
    pub fn new(window: &[f64], m: usize, phase: PhaseConvention) -> Self {
        debug_check!(!window.is_empty(), "window must not be empty");
        debug_check!(m > 0, "transform size must be positive");

        let mut centred = window.to_vec();
        fftshift(&mut centred);

        let m = m.max(1);
        let mut planner = RealFftPlanner::<f64>::new();
        let ifft = planner.plan_fft_inverse(m);
        let scratch = ifft.make_scratch_vec();

        Self {
            window: centred,
            m,
            phase,
            spec_buf: vec![COMPLEX_ZERO; half_spectrum_len(m)],
            fft_buf: vec![0.0; m],
            scratch,
            ifft,
        }
    }

    /// Window length.
    #[inline]
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Transform size.
    #[inline]
    pub fn size(&self) -> usize {
        self.m
    }

    /// Transforms `num_chans` half spectra with stride `M/2+1` into frames
    /// laid out back to back with stride `window_len()`.
    pub fn execute(&mut self, spectra: &[Complex<f64>], num_chans: usize, out: &mut [f64]) {
        let gl = self.window.len();
        let m2 = half_spectrum_len(self.m);
        if gl == 0 {
            return;
        }
        debug_check!(
            spectra.len() >= num_chans * m2,
            "{} bins for {} channels",
            spectra.len(),
            num_chans
        );
        debug_check!(
            out.len() >= num_chans * gl,
            "{} frame samples for {} channels",
            out.len(),
            num_chans
        );

        let scale = 1.0 / self.m as f64;
        for (spectrum, frame) in spectra
            .chunks_exact(m2)
            .zip(out.chunks_exact_mut(gl))
            .take(num_chans)
        {
            self.spec_buf.copy_from_slice(spectrum);
            // A real signal has purely real DC and Nyquist bins.
            self.spec_buf[0].im = 0.0;
            if self.m % 2 == 0 {
                self.spec_buf[m2 - 1].im = 0.0;
            }

            if let Err(err) =
                self.ifft
                    .process_with_scratch(&mut self.spec_buf, &mut self.fft_buf, &mut self.scratch)
            {
                tracing::error!(error = %err, "inverse transform failed");
                frame.fill(0.0);
                continue;
            }

            if self.phase == PhaseConvention::Zero {
                circshift(&mut self.fft_buf, (gl / 2) as isize);
            }
            periodize(&self.fft_buf, frame);
            for (x, &g) in frame.iter_mut().zip(&self.window) {
                *x *= g * scale;
            }
        }
    }
}

impl std::fmt::Debug for InverseFramedTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InverseFramedTransform")
            .field("window_len", &self.window.len())
            .field("size", &self.m)
            .field("phase", &self.phase)
            .finish()
    }
}
