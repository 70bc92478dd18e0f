//! Time stretching by phase gradient heap integration.

pub mod heap;
pub mod integrator;
pub mod params;
pub mod phase_vocoder;
pub mod rtpghi;

pub use integrator::PhaseGradientHeapIntegrator;
pub use params::VocoderConfig;
pub use phase_vocoder::{PhaseVocoder, Position};
pub use rtpghi::RtpghiState;
