// Beat-coded message decoding: spectral analysis, tempo estimation, bit
// extraction and tempo calibration for binary-music-analyzer.

pub mod beat;
pub mod bits;
pub mod calibrate;
pub mod decode;
pub mod fft;
pub mod tempo;

#[cfg(test)]
mod synth;

pub use calibrate::{AttemptOutcome, DecodedMessage, decode};
pub use fft::SpectralAnalyzer;
pub use tempo::{TempoConfidence, TempoEstimate, estimate_tempo};
