//! Error types for the rtpv crate.
//!
//! Only configuration and file handling report errors. The streaming engine
//! itself never fails: capacity problems are clamped and zero-filled, and
//! precondition violations are logged in debug builds.

use thiserror::Error;

/// Errors that can occur while configuring the vocoder or handling audio files.
#[derive(Debug, Error)]
pub enum VocoderError {
    /// Invalid vocoder configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Unknown window shape name.
    #[error("unknown window shape: {0}")]
    UnknownWindow(String),
    /// Invalid audio format or parameters.
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    /// More channels than the vocoder was configured for.
    #[error("too many channels: {provided} provided, at most {max} supported")]
    TooManyChannels { provided: usize, max: usize },
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
