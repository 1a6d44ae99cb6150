use bma_core::config::DecoderConfig;
use bma_core::error::DecodeError;
use bma_core::framing::{FrameStatus, MessageFramer};

use crate::bits::BitExtractor;
use crate::fft::SpectralAnalyzer;

/// Outcome of one decoding attempt at a fixed tempo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// A self-repeating message was found.
    Framed(String),
    /// A checkpoint ended on a non alphanumeric symbol.
    NonAsciiSymbol(u8),
    /// The data ran out after this many beats.
    OutOfData {
        /// Beats read before the data ran out.
        beats: usize,
    },
}

impl AttemptOutcome {
    /// `true` for a framed message.
    #[must_use]
    pub fn is_framed(&self) -> bool {
        matches!(self, Self::Framed(_))
    }
}

/// Successfully decoded hidden message.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMessage {
    /// The message, one character per symbol.
    pub text: String,
    /// Tempo the message was framed at.
    pub bpm: f64,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Run bit extraction and framing from scratch at one tempo.
///
/// Bits and symbols live only for this call.
///
/// # Errors
/// `UndeterminableTempo`, `InvalidWindow` or `FrequencyOutOfRange`. The
/// recoverable kinds are returned as an [`AttemptOutcome`].
pub fn run_attempt(
    data: &[f32],
    bpm: f64,
    sample_rate: u32,
    config: &DecoderConfig,
    analyzer: &mut SpectralAnalyzer,
) -> Result<AttemptOutcome, DecodeError> {
    let extractor = match BitExtractor::new(data, bpm, sample_rate, config, analyzer) {
        Ok(extractor) => extractor,
        Err(DecodeError::OutOfData { beat, .. }) => {
            return Ok(AttemptOutcome::OutOfData { beats: beat });
        }
        Err(e) => return Err(e),
    };
    let mut framer = MessageFramer::new();

    for bit in extractor {
        let bit = match bit {
            Ok(bit) => bit,
            Err(DecodeError::OutOfData { beat, .. }) => {
                return Ok(AttemptOutcome::OutOfData { beats: beat });
            }
            Err(e) => return Err(e),
        };

        match framer.push(bit) {
            Ok(FrameStatus::Framed(message)) => return Ok(AttemptOutcome::Framed(message)),
            Ok(FrameStatus::Incomplete) => {}
            Err(DecodeError::NonAsciiSymbol { value }) => {
                return Ok(AttemptOutcome::NonAsciiSymbol(value));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(AttemptOutcome::OutOfData {
        beats: framer.len(),
    })
}

/// Search for the hidden message, adjusting the tempo after each failure.
///
/// Starts at `initial_bpm`, then follows `config.search` one bpm at a time
/// for at most `config.max_attempts` attempts. Candidates that fall to zero
/// or below are skipped but still count against the budget.
///
/// # Errors
/// - `UndeterminableTempo` if `initial_bpm` is not a positive finite number.
/// - `NotFound` when every attempt failed.
/// - `InvalidWindow` / `FrequencyOutOfRange` from the spectral analysis.
///
/// # Example
/// ```
/// use bma_audio::calibrate::decode;
/// use bma_core::config::DecoderConfig;
/// use bma_core::error::DecodeError;
///
/// let silence = vec![0.0f32; 8000];
/// let result = decode(&silence, 120.0, 8000, &DecoderConfig::default());
/// assert_eq!(result, Err(DecodeError::NotFound { attempts: 10 }));
/// ```
pub fn decode(
    data: &[f32],
    initial_bpm: f64,
    sample_rate: u32,
    config: &DecoderConfig,
) -> Result<DecodedMessage, DecodeError> {
    if !initial_bpm.is_finite() || initial_bpm <= 0.0 {
        return Err(DecodeError::UndeterminableTempo { bpm: initial_bpm });
    }
    if config.carrier_hz >= f64::from(sample_rate) / 2.0 {
        log::warn!(
            "Porteuse {} Hz au-delà de Nyquist ({} Hz), politique {:?}",
            config.carrier_hz,
            f64::from(sample_rate) / 2.0,
            config.bin_policy
        );
    }

    let mut analyzer = SpectralAnalyzer::new(config.bin_policy);

    for attempt in 0..config.max_attempts {
        let bpm = initial_bpm + config.search.offset(attempt) as f64;
        if bpm <= 0.0 {
            log::debug!("Tentative {}: tempo {bpm} ignoré", attempt + 1);
            continue;
        }

        let outcome = run_attempt(data, bpm, sample_rate, config, &mut analyzer)?;
        log::debug!("Tentative {} @ {bpm:.2} bpm : {outcome:?}", attempt + 1);

        if let AttemptOutcome::Framed(text) = outcome {
            log::info!(
                "Message trouvé @ {bpm:.2} bpm après {} tentative(s)",
                attempt + 1
            );
            return Ok(DecodedMessage {
                text,
                bpm,
                attempts: attempt + 1,
            });
        }
    }

    log::info!(
        "Aucun message après {} tentatives depuis {initial_bpm:.2} bpm",
        config.max_attempts
    );
    Err(DecodeError::NotFound {
        attempts: config.max_attempts,
    })
}
