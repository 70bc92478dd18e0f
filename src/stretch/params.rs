use serde::{Deserialize, Serialize};

use crate::core::window::WindowShape;
use crate::error::VocoderError;

/// Parameters of a [`PhaseVocoder`](super::PhaseVocoder).
///
/// Every buffer is sized from these values once, at construction. Missing
/// fields take their defaults when deserializing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocoderConfig {
    /// Largest stretch ratio the buffers are sized for (default: 10).
    pub max_stretch: f64,
    /// Largest number of channels (default: 2).
    pub max_channels: usize,
    /// Largest block passed in or out per call (default: 1024).
    pub max_block_len: usize,
    /// Fixed synthesis hop in samples (default: 1024).
    pub synthesis_hop: usize,
    /// Transform size (default: 8192).
    pub fft_size: usize,
    /// Analysis window length (default: 4096).
    pub window_len: usize,
    /// Analysis window shape (default: Hann).
    pub window: WindowShape,
    /// Relative magnitude below which bins get a random phase (default: 1e-6).
    pub tolerance: f64,
    /// Seed for the random phases; `None` seeds from the operating system.
    pub seed: Option<u64>,
}

impl Default for VocoderConfig {
    fn default() -> Self {
        Self {
            max_stretch: 10.0,
            max_channels: 2,
            max_block_len: 1024,
            synthesis_hop: 1024,
            fft_size: 8192,
            window_len: 4096,
            window: WindowShape::Hann,
            tolerance: 1e-6,
            seed: None,
        }
    }
}

impl VocoderConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the largest stretch ratio.
    pub fn with_max_stretch(mut self, max_stretch: f64) -> Self {
        self.max_stretch = max_stretch;
        self
    }

    /// Set the largest channel count.
    pub fn with_max_channels(mut self, max_channels: usize) -> Self {
        self.max_channels = max_channels;
        self
    }

    /// Set the largest block length.
    pub fn with_max_block_len(mut self, max_block_len: usize) -> Self {
        self.max_block_len = max_block_len;
        self
    }

    /// Set the synthesis hop.
    pub fn with_synthesis_hop(mut self, synthesis_hop: usize) -> Self {
        self.synthesis_hop = synthesis_hop;
        self
    }

    /// Set the transform size.
    pub fn with_fft_size(mut self, fft_size: usize) -> Self {
        self.fft_size = fft_size;
        self
    }

    /// Set the analysis window length.
    pub fn with_window_len(mut self, window_len: usize) -> Self {
        self.window_len = window_len;
        self
    }

    /// Set the analysis window shape.
    pub fn with_window(mut self, window: WindowShape) -> Self {
        self.window = window;
        self
    }

    /// Set the random-phase tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Seed the random phase generator.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Smallest stretch the window length supports.
    pub fn min_stretch(&self) -> f64 {
        self.synthesis_hop as f64 / self.window_len as f64
    }

    /// Block capacity of the internal streaming processor.
    ///
    /// Large enough for the input a maximal output block needs at the smallest
    /// stretch and for the output a maximal input block yields at the largest.
    pub fn block_capacity(&self) -> usize {
        let at_max = ((self.max_block_len + self.synthesis_hop) as f64 * self.max_stretch).ceil();
        let at_min = (self.max_block_len as f64 / self.min_stretch()).ceil();
        self.max_block_len.max(at_max as usize).max(at_min as usize)
    }

    /// Zeros the analysis buffer starts with.
    pub fn proc_delay(&self) -> usize {
        self.window_len.max(self.block_capacity())
    }

    /// Validate all parameters.
    pub fn validate(&self) -> Result<(), VocoderError> {
        if !self.max_stretch.is_finite() || self.max_stretch <= 0.0 {
            return Err(VocoderError::InvalidConfig(format!(
                "max_stretch must be positive and finite, got {}",
                self.max_stretch
            )));
        }
        if self.max_channels == 0 {
            return Err(VocoderError::InvalidConfig(
                "max_channels must be positive".to_string(),
            ));
        }
        if self.max_block_len == 0 {
            return Err(VocoderError::InvalidConfig(
                "max_block_len must be positive".to_string(),
            ));
        }
        if self.synthesis_hop == 0 || self.window_len == 0 {
            return Err(VocoderError::InvalidConfig(
                "synthesis_hop and window_len must be positive".to_string(),
            ));
        }
        if self.synthesis_hop > self.window_len {
            return Err(VocoderError::InvalidConfig(format!(
                "synthesis_hop {} exceeds window_len {}",
                self.synthesis_hop, self.window_len
            )));
        }
        if self.fft_size < self.window_len || self.fft_size <= self.synthesis_hop {
            return Err(VocoderError::InvalidConfig(format!(
                "fft_size {} must be at least window_len {} and exceed synthesis_hop {}",
                self.fft_size, self.window_len, self.synthesis_hop
            )));
        }
        if self.max_stretch < self.min_stretch() {
            return Err(VocoderError::InvalidConfig(format!(
                "max_stretch {} below the smallest supported stretch {}",
                self.max_stretch,
                self.min_stretch()
            )));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(VocoderError::InvalidConfig(format!(
                "tolerance must be in (0, 1), got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = VocoderConfig::default();
        assert_eq!(config.synthesis_hop, 1024);
        assert_eq!(config.fft_size, 8192);
        assert_eq!(config.window_len, 4096);
        assert_eq!(config.window, WindowShape::Hann);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_derived_sizes() {
        let config = VocoderConfig::default();
        assert_eq!(config.block_capacity(), 20480);
        assert_eq!(config.proc_delay(), 20480);
        assert_eq!(config.min_stretch(), 0.25);

        let small = config.clone().with_max_stretch(1.0);
        // 1024 input samples per output block at stretch 0.25 need 4096.
        assert_eq!(small.block_capacity(), 4096);
        assert_eq!(small.proc_delay(), 4096);
    }

    #[test]
    fn test_builder() {
        let config = VocoderConfig::new()
            .with_max_stretch(4.0)
            .with_max_channels(1)
            .with_max_block_len(256)
            .with_synthesis_hop(256)
            .with_fft_size(2048)
            .with_window_len(1024)
            .with_window(WindowShape::Blackman)
            .with_tolerance(1e-4)
            .with_seed(9);
        assert_eq!(config.max_channels, 1);
        assert_eq!(config.seed, Some(9));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let base = VocoderConfig::default();
        assert!(base.clone().with_max_stretch(f64::NAN).validate().is_err());
        assert!(base.clone().with_max_stretch(0.1).validate().is_err());
        assert!(base.clone().with_max_channels(0).validate().is_err());
        assert!(base.clone().with_max_block_len(0).validate().is_err());
        assert!(base.clone().with_synthesis_hop(0).validate().is_err());
        assert!(base.clone().with_synthesis_hop(8192).validate().is_err());
        assert!(base.clone().with_fft_size(2048).validate().is_err());
        assert!(base.clone().with_tolerance(0.0).validate().is_err());
        assert!(base.clone().with_tolerance(1.0).validate().is_err());
    }

    #[test]
    fn test_json_round_trip_and_defaults() {
        let config = VocoderConfig::default().with_seed(3).with_window(WindowShape::SqrtHann);
        let json = serde_json::to_string(&config).unwrap();
        let back: VocoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        let partial: VocoderConfig =
            serde_json::from_str(r#"{"max_stretch": 3.0, "window": "hamming"}"#).unwrap();
        assert_eq!(partial.max_stretch, 3.0);
        assert_eq!(partial.window, WindowShape::Hamming);
        assert_eq!(partial.fft_size, 8192);
        assert_eq!(partial.seed, None);
    }
}
