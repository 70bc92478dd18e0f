use std::fmt;

use rustfft::num_complex::Complex;

use super::params::VocoderConfig;
use super::rtpghi::RtpghiState;
use crate::error::VocoderError;
use crate::stream::processor::{
    FrameLayout, ProcessorConfig, SpectralProcessor, StreamingTransformProcessor,
};

/// Feeds every frame through [`RtpghiState`] at the vocoder's current stretch.
#[derive(Debug)]
struct StretchingProcessor {
    state: RtpghiState,
    stretch: f64,
}

impl SpectralProcessor for StretchingProcessor {
    fn process(&mut self, input: &[Complex<f64>], output: &mut [Complex<f64>], _layout: FrameLayout) {
        self.state.execute(input, self.stretch, output);
    }
}

/// Snapshot of the sample position bookkeeping of a [`PhaseVocoder`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Input samples consumed so far.
    pub in_pos: usize,
    /// Output samples produced so far.
    pub out_pos: usize,
    /// Output samples owed for the input consumed so far, minus those produced.
    pub in_out_offset: f64,
    /// Input samples owed for the output produced so far, minus those consumed.
    pub out_in_offset: f64,
    /// Stretch ratio in effect.
    pub stretch: f64,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in_pos: {}, out_pos: {}, in_out_offset: {:.3}, out_in_offset: {:.3}, stretch: {:.3}",
            self.in_pos, self.out_pos, self.in_out_offset, self.out_in_offset, self.stretch
        )
    }
}

/// Real-time phase vocoder.
///
/// Time-stretches a multichannel stream by a ratio that may change on every
/// call, without changing its pitch. The synthesis hop is fixed; the analysis
/// hop is `round(synthesis_hop / stretch)`, so the stretch actually applied is
/// the nearest ratio of integers. Phase is rebuilt by phase gradient heap
/// integration.
///
/// # Example
///
/// ```
/// use rtpv::{PhaseVocoder, VocoderConfig};
///
/// let config = VocoderConfig::default().with_max_channels(1).with_seed(1);
/// let mut pv = PhaseVocoder::new(config).unwrap();
///
/// let input = vec![0.0; 1024];
/// let out_len = pv.next_outlen(input.len());
/// let mut output = vec![0.0; out_len];
/// pv.execute_compact(&input, input.len(), 1, 1.5, &mut output, out_len);
/// ```
pub struct PhaseVocoder {
    processor: StreamingTransformProcessor<StretchingProcessor>,
    config: VocoderConfig,
    analysis_hop: usize,
    stretch: f64,
    in_pos: usize,
    out_pos: usize,
    in_out_offset: f64,
    out_in_offset: f64,
}

impl PhaseVocoder {
    /// Creates a vocoder, allocating every buffer it will ever use.
    ///
    /// # Errors
    /// Returns `VocoderError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: VocoderConfig) -> Result<Self, VocoderError> {
        config.validate()?;

        let processor_config = ProcessorConfig {
            hop: config.synthesis_hop,
            fft_size: config.fft_size,
            max_channels: config.max_channels,
            max_block_len: config.block_capacity(),
            proc_delay: config.proc_delay(),
        };
        let state = RtpghiState::new(
            config.max_channels,
            config.synthesis_hop,
            config.fft_size,
            config.tolerance,
            config.seed,
        );
        let processor = StreamingTransformProcessor::new(
            config.window,
            config.window_len,
            processor_config,
            StretchingProcessor { state, stretch: 1.0 },
        )?;

        tracing::debug!(
            synthesis_hop = config.synthesis_hop,
            fft_size = config.fft_size,
            window_len = config.window_len,
            window = %config.window,
            proc_delay = config.proc_delay(),
            "phase vocoder ready"
        );

        Ok(Self {
            processor,
            analysis_hop: config.synthesis_hop,
            config,
            stretch: 1.0,
            in_pos: 0,
            out_pos: 0,
            in_out_offset: 0.0,
            out_in_offset: 0.0,
        })
    }

    /// Configuration the vocoder was built with.
    pub fn config(&self) -> &VocoderConfig {
        &self.config
    }

    /// Stretch ratio in effect (`synthesis_hop / analysis_hop`).
    pub fn stretch(&self) -> f64 {
        self.stretch
    }

    /// Current analysis hop.
    pub fn analysis_hop(&self) -> usize {
        self.analysis_hop
    }

    /// Fixed synthesis hop.
    pub fn synthesis_hop(&self) -> usize {
        self.config.synthesis_hop
    }

    /// Processing delay in input samples.
    pub fn latency(&self) -> usize {
        self.config.proc_delay()
    }

    /// Output samples preceding the first input sample, assuming the current
    /// stretch has been in effect from the start.
    pub fn output_latency(&self) -> usize {
        let half = (self.config.window_len / 2) as f64;
        let delay = (self.latency() as f64 - half) * self.stretch
            + self.config.synthesis_hop as f64
            + half;
        delay.round() as usize
    }

    /// Input samples to pass with the next call so that it yields `out_len`
    /// output samples.
    pub fn next_inlen(&self, out_len: usize) -> usize {
        (out_len as f64 / self.stretch + self.out_in_offset)
            .round()
            .max(0.0) as usize
    }

    /// Output samples the next call should request for `in_len` input samples.
    pub fn next_outlen(&self, in_len: usize) -> usize {
        (in_len as f64 * self.stretch + self.in_out_offset)
            .round()
            .max(0.0) as usize
    }

    /// Records that `in_len` samples went in and `out_len` came out.
    pub fn advance_by(&mut self, in_len: usize, out_len: usize) {
        self.in_pos += in_len;
        self.out_pos += out_len;
        self.in_out_offset += in_len as f64 * self.stretch - out_len as f64;
        self.out_in_offset += out_len as f64 / self.stretch - in_len as f64;
    }

    /// Requests a new stretch ratio.
    ///
    /// The ratio is clamped to `[synthesis_hop / window_len, max_stretch]` and
    /// quantized to an integer analysis hop. Non-positive or non-finite
    /// ratios are ignored.
    pub fn set_stretch(&mut self, stretch: f64) {
        debug_check!(
            stretch.is_finite() && stretch > 0.0,
            "stretch {} must be positive and finite",
            stretch
        );
        if !(stretch.is_finite() && stretch > 0.0) {
            return;
        }

        let min = self.config.min_stretch();
        let max = self.config.max_stretch;
        let clamped = stretch.clamp(min, max);
        if clamped != stretch {
            tracing::debug!(requested = stretch, clamped, "stretch out of range");
        }

        let asyn = self.config.synthesis_hop;
        let mut hop = ((asyn as f64 / clamped).round() as usize).max(1);
        if asyn as f64 / hop as f64 > max {
            hop += 1;
        }
        let true_stretch = asyn as f64 / hop as f64;

        if (true_stretch - self.stretch).abs() > f64::EPSILON {
            tracing::debug!(
                analysis_hop = hop,
                stretch = true_stretch,
                "analysis hop changed"
            );
            self.analysis_hop = hop;
            self.stretch = true_stretch;
            self.processor.set_analysis_hop(hop);
        }
    }

    /// Processes one block of per-channel slices.
    ///
    /// Consumes `in_len` samples per input channel and fills `out_len`
    /// samples per output channel at the given stretch. Use
    /// [`next_outlen`](Self::next_outlen) or [`next_inlen`](Self::next_inlen)
    /// to pick lengths that keep input and output in step.
    pub fn execute<'a, 'b, I, O>(
        &mut self,
        input: I,
        in_len: usize,
        stretch: f64,
        output: O,
        out_len: usize,
    ) where
        I: IntoIterator<Item = &'a [f64]>,
        O: IntoIterator<Item = &'b mut [f64]>,
    {
        self.prepare(in_len, stretch, out_len);
        self.processor.execute_gen(input, in_len, output, out_len);
    }

    /// Like [`execute`](Self::execute) for channel-major contiguous buffers
    /// holding `num_chans` channels.
    pub fn execute_compact(
        &mut self,
        input: &[f64],
        in_len: usize,
        num_chans: usize,
        stretch: f64,
        output: &mut [f64],
        out_len: usize,
    ) {
        self.prepare(in_len, stretch, out_len);
        self.processor
            .execute_gen_compact(input, in_len, num_chans, output, out_len);
    }

    /// Clears all buffered audio, the phase history and the position
    /// bookkeeping. The stretch is kept.
    pub fn reset(&mut self) {
        self.processor.reset();
        self.processor.processor_mut().state.reset(None);
        self.in_pos = 0;
        self.out_pos = 0;
        self.in_out_offset = 0.0;
        self.out_in_offset = 0.0;
    }

    /// Current position bookkeeping.
    pub fn position(&self) -> Position {
        Position {
            in_pos: self.in_pos,
            out_pos: self.out_pos,
            in_out_offset: self.in_out_offset,
            out_in_offset: self.out_in_offset,
            stretch: self.stretch,
        }
    }

    /// Logs the position bookkeeping at debug level.
    pub fn log_position(&self) {
        tracing::debug!(position = %self.position(), "phase vocoder position");
    }

    fn prepare(&mut self, in_len: usize, stretch: f64, out_len: usize) {
        self.advance_by(in_len, out_len);
        self.set_stretch(stretch);
        self.processor.processor_mut().stretch = self.stretch;
    }
}

impl fmt::Debug for PhaseVocoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseVocoder")
            .field("config", &self.config)
            .field("analysis_hop", &self.analysis_hop)
            .field("position", &self.position())
            .finish()
    }
}
