//! Configuration, types, and message framing for binary-music-analyzer.
//!
//! Shared by every crate of the workspace. No DSP dependency: everything
//! here works on plain bits and samples.

pub mod config;
pub mod error;
pub mod framing;
pub mod signal;

pub use config::DecoderConfig;
pub use error::DecodeError;
pub use framing::{FrameStatus, MessageFramer};
pub use signal::SampleBuffer;
