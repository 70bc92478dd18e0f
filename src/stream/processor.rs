use rustfft::num_complex::Complex;

use crate::core::dual::painless_dual;
use crate::core::fft::{
    half_spectrum_len, FramedTransform, InverseFramedTransform, PhaseConvention, COMPLEX_ZERO,
};
use crate::core::ring_buffer::{AnalysisRingBuffer, SynthesisRingBuffer};
use crate::core::window::{generate_window, WindowShape};
use crate::error::VocoderError;

/// Shape of the spectral frames handed to a [`SpectralProcessor`].
///
/// Spectra are stored channel after channel, `bins` complex values each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    /// Bins per channel (`M/2+1`).
    pub bins: usize,
    /// Number of channels in the frame.
    pub channels: usize,
}

impl FrameLayout {
    /// Total number of complex values in a frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.bins * self.channels
    }

    /// Returns true if the frame holds no bins.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-frame spectral transformation run between analysis and synthesis.
///
/// Implementations run on the audio thread and must not allocate.
pub trait SpectralProcessor {
    /// Transforms one multichannel half-spectrum frame.
    ///
    /// Both slices hold at least `layout.len()` values.
    fn process(&mut self, input: &[Complex<f64>], output: &mut [Complex<f64>], layout: FrameLayout);
}

/// Passes spectra through unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity;

impl SpectralProcessor for Identity {
    fn process(&mut self, input: &[Complex<f64>], output: &mut [Complex<f64>], layout: FrameLayout) {
        let n = layout.len();
        output[..n].copy_from_slice(&input[..n]);
    }
}

/// Sizing of a [`StreamingTransformProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Initial analysis and synthesis hop.
    pub hop: usize,
    /// Transform size `M`.
    pub fft_size: usize,
    /// Number of channels the buffers are sized for.
    pub max_channels: usize,
    /// Largest block accepted or produced per call.
    pub max_block_len: usize,
    /// Zeros the analysis buffer starts with. Must lie in
    /// `[window_len - 1, window_len - 1 + max_block_len]`.
    pub proc_delay: usize,
}

/// Streaming short-time transform processor.
///
/// Accepts arbitrarily sized input blocks, cuts them into hop-spaced windowed
/// frames, hands their spectra to a [`SpectralProcessor`], and overlap-adds
/// the resynthesized frames into arbitrarily sized output blocks. All memory
/// is allocated at construction.
pub struct StreamingTransformProcessor<P = Identity> {
    analysis: AnalysisRingBuffer,
    synthesis: SynthesisRingBuffer,
    forward: FramedTransform,
    inverse: InverseFramedTransform,
    analysis_frames: Vec<f64>,
    synthesis_frames: Vec<f64>,
    spectrum_in: Vec<Complex<f64>>,
    spectrum_out: Vec<Complex<f64>>,
    layout: FrameLayout,
    max_block_len: usize,
    processor: P,
}

impl<P: SpectralProcessor> StreamingTransformProcessor<P> {
    /// Creates a processor with a generated analysis window and its
    /// canonical dual as synthesis window.
    pub fn new(
        shape: WindowShape,
        window_len: usize,
        config: ProcessorConfig,
        processor: P,
    ) -> Result<Self, VocoderError> {
        let g = generate_window(shape, window_len);
        let gd = painless_dual(&g, config.hop, config.fft_size)?;
        Self::from_windows(&g, &gd, config, processor)
    }

    /// Creates a processor from explicit zero-delay analysis and synthesis
    /// windows, which may differ in length.
    pub fn from_windows(
        analysis_window: &[f64],
        synthesis_window: &[f64],
        config: ProcessorConfig,
        processor: P,
    ) -> Result<Self, VocoderError> {
        let gal = analysis_window.len();
        let gsl = synthesis_window.len();
        if gal == 0 || gsl == 0 {
            return Err(VocoderError::InvalidConfig(
                "windows must not be empty".to_string(),
            ));
        }
        if config.hop == 0 || config.fft_size == 0 {
            return Err(VocoderError::InvalidConfig(
                "hop and transform size must be positive".to_string(),
            ));
        }
        if config.max_channels == 0 || config.max_block_len == 0 {
            return Err(VocoderError::InvalidConfig(
                "channel count and block length must be positive".to_string(),
            ));
        }
        let gl_max = gal.max(gsl) - 1;
        if config.proc_delay < gl_max || config.proc_delay > gl_max + config.max_block_len {
            return Err(VocoderError::InvalidConfig(format!(
                "processing delay {} outside [{}, {}]",
                config.proc_delay,
                gl_max,
                gl_max + config.max_block_len
            )));
        }

        let chans = config.max_channels;
        let m2 = half_spectrum_len(config.fft_size);
        tracing::debug!(
            analysis_window = gal,
            synthesis_window = gsl,
            hop = config.hop,
            fft_size = config.fft_size,
            channels = chans,
            max_block_len = config.max_block_len,
            proc_delay = config.proc_delay,
            "creating streaming transform processor"
        );

        Ok(Self {
            analysis: AnalysisRingBuffer::new(
                config.max_block_len + gal,
                config.proc_delay,
                gal,
                config.hop,
                chans,
            ),
            synthesis: SynthesisRingBuffer::new(
                config.max_block_len + gsl,
                gsl,
                config.hop,
                chans,
            ),
            forward: FramedTransform::new(analysis_window, config.fft_size, PhaseConvention::Zero),
            inverse: InverseFramedTransform::new(
                synthesis_window,
                config.fft_size,
                PhaseConvention::Zero,
            ),
            analysis_frames: vec![0.0; chans * gal],
            synthesis_frames: vec![0.0; chans * gsl],
            spectrum_in: vec![COMPLEX_ZERO; chans * m2],
            spectrum_out: vec![COMPLEX_ZERO; chans * m2],
            layout: FrameLayout {
                bins: m2,
                channels: chans,
            },
            max_block_len: config.max_block_len,
            processor,
        })
    }

    /// Zeroes the contents of both ring buffers.
    pub fn reset(&mut self) {
        self.analysis.reset();
        self.synthesis.reset();
    }

    /// Changes the hop between consecutive analysis frames.
    pub fn set_analysis_hop(&mut self, hop: usize) {
        self.analysis.set_hop(hop);
    }

    /// Changes the hop between consecutive synthesis frames.
    pub fn set_synthesis_hop(&mut self, hop: usize) {
        self.synthesis.set_hop(hop);
    }

    /// Current analysis hop.
    pub fn analysis_hop(&self) -> usize {
        self.analysis.hop()
    }

    /// Current synthesis hop.
    pub fn synthesis_hop(&self) -> usize {
        self.synthesis.hop()
    }

    /// Number of channels the processor was sized for.
    pub fn num_chans(&self) -> usize {
        self.layout.channels
    }

    /// Largest block accepted or produced per call.
    pub fn max_block_len(&self) -> usize {
        self.max_block_len
    }

    /// Layout of the spectral frames passed to the processor.
    pub fn layout(&self) -> FrameLayout {
        self.layout
    }

    /// Spectral processor.
    pub fn processor(&self) -> &P {
        &self.processor
    }

    /// Mutable access to the spectral processor.
    pub fn processor_mut(&mut self) -> &mut P {
        &mut self.processor
    }

    /// Processes `len` samples per channel, producing as many.
    pub fn execute<'a, 'b, I, O>(&mut self, input: I, len: usize, output: O)
    where
        I: IntoIterator<Item = &'a [f64]>,
        O: IntoIterator<Item = &'b mut [f64]>,
    {
        self.execute_gen(input, len, output, len);
    }

    /// Writes `in_len` samples per input channel and reads `out_len` samples
    /// per output channel.
    ///
    /// Output channels beyond the configured channel count and output samples
    /// beyond what the synthesis buffer can supply are zero-filled. Input
    /// beyond the configured block length is dropped.
    pub fn execute_gen<'a, 'b, I, O>(&mut self, input: I, in_len: usize, output: O, out_len: usize)
    where
        I: IntoIterator<Item = &'a [f64]>,
        O: IntoIterator<Item = &'b mut [f64]>,
    {
        if in_len == 0 && out_len == 0 {
            return;
        }

        let in_len = in_len.min(self.max_block_len);
        let written = self.analysis.write(input, in_len);

        while self.synthesis.can_write_frame() && self.analysis.read(&mut self.analysis_frames) > 0
        {
            let chans = self.layout.channels;
            self.forward
                .execute(&self.analysis_frames, chans, &mut self.spectrum_in);
            self.processor
                .process(&self.spectrum_in, &mut self.spectrum_out, self.layout);
            self.inverse
                .execute(&self.spectrum_out, chans, &mut self.synthesis_frames);
            self.synthesis.write(&self.synthesis_frames);
        }

        let chans = self.layout.channels;
        let read_len = out_len.min(self.max_block_len);
        let mut outputs = output.into_iter();
        let read = self.synthesis.read(
            read_len,
            outputs.by_ref().take(chans).map(|chan| {
                let n = out_len.min(chan.len());
                let chan = &mut chan[..n];
                chan.fill(0.0);
                chan
            }),
        );
        for chan in outputs {
            let n = out_len.min(chan.len());
            chan[..n].fill(0.0);
        }

        if written != in_len {
            tracing::debug!(requested = in_len, written, "input not fully written");
        }
        if read != out_len {
            tracing::debug!(requested = out_len, read, "output not fully supplied");
        }
    }

    /// Like [`execute`](Self::execute) for channel-major contiguous buffers
    /// holding `num_chans` channels of `len` samples each.
    pub fn execute_compact(&mut self, input: &[f64], len: usize, num_chans: usize, output: &mut [f64]) {
        self.execute_gen_compact(input, len, num_chans, output, len);
    }

    /// Like [`execute_gen`](Self::execute_gen) for channel-major contiguous
    /// buffers.
    pub fn execute_gen_compact(
        &mut self,
        input: &[f64],
        in_len: usize,
        num_chans: usize,
        output: &mut [f64],
        out_len: usize,
    ) {
        if num_chans == 0 {
            return;
        }
        self.execute_gen(
            input.chunks(in_len.max(1)).take(num_chans),
            in_len,
            output.chunks_mut(out_len.max(1)).take(num_chans),
            out_len,
        );
    }
}

impl<P> std::fmt::Debug for StreamingTransformProcessor<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingTransformProcessor")
            .field("analysis", &self.analysis)
            .field("synthesis", &self.synthesis)
            .field("forward", &self.forward)
            .field("inverse", &self.inverse)
            .field("layout", &self.layout)
            .field("max_block_len", &self.max_block_len)
            .finish()
    }
}
