//! Ring buffers, windows and the framed transforms.

pub mod array;
pub mod dual;
pub mod fft;
pub mod index;
pub mod ring_buffer;
pub mod window;

pub use dual::{frame_diagonal, painless_dual};
pub use fft::{FramedTransform, InverseFramedTransform, PhaseConvention};
pub use index::RingIndex;
pub use ring_buffer::{AnalysisRingBuffer, SynthesisRingBuffer};
pub use window::{generate_window, mtgauss, mtgauss_length, WindowShape};
