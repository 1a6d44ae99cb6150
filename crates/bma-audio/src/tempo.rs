use bma_core::config::TempoConfig;
use bma_core::error::DecodeError;

use crate::beat::OnsetTempoDetector;

/// Below this many beats the estimate is reported as low confidence.
const CONFIDENT_BEATS: usize = 4;

/// How much the beats found back a tempo estimate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TempoConfidence {
    /// Fewer than two beats: no interval, bpm is 0.
    Undeterminable,
    /// Two or three beats.
    Low,
    /// Four beats or more.
    Normal,
}

/// Tempo of a whole track, derived from its beat timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct TempoEstimate {
    /// Median of the per-interval tempos, 0 when undeterminable.
    pub bpm: f64,
    /// Beat timestamps in seconds.
    pub beats: Vec<f64>,
    /// Confidence derived from the beat count.
    pub confidence: TempoConfidence,
}

impl TempoEstimate {
    /// `true` if the estimate can size a beat window.
    #[must_use]
    pub fn is_determinable(&self) -> bool {
        self.confidence != TempoConfidence::Undeterminable && self.bpm > 0.0
    }

    /// The bpm, or `InsufficientBeats` if it is undeterminable.
    ///
    /// # Errors
    /// `InsufficientBeats` when fewer than two usable beats were found.
    ///
    /// # Example
    /// ```
    /// use bma_audio::tempo::tempo_from_beats;
    /// assert!(tempo_from_beats(vec![1.0]).require_bpm().is_err());
    /// ```
    pub fn require_bpm(&self) -> Result<f64, DecodeError> {
        if self.is_determinable() {
            Ok(self.bpm)
        } else {
            Err(DecodeError::InsufficientBeats {
                found: self.beats.len(),
            })
        }
    }
}

/// Stream `samples` through an onset detector and collect beat timestamps.
///
/// Reads hop by hop; the stream ends after the first hop shorter than
/// `hop_size`, which is still analyzed (zero-padded).
#[must_use]
pub fn detect_beats(samples: &[f32], sample_rate: u32, config: &TempoConfig) -> Vec<f64> {
    let mut detector = OnsetTempoDetector::new(config.win_size, config.hop_size, sample_rate);
    let hop = detector.hop_size();
    let mut beats = Vec::new();
    let mut offset = 0;

    loop {
        let end = (offset + hop).min(samples.len());
        let read = end - offset;
        let event = detector.advance(&samples[offset..end]);
        if event.is_beat {
            log::trace!(
                "Beat @ {:.3}s (strength {:.2})",
                event.timestamp_s,
                event.strength
            );
            beats.push(event.timestamp_s);
        }
        offset = end;
        if read < hop {
            break;
        }
    }

    beats
}

/// Estimate the tempo of a whole buffer.
///
/// Never fails: an undeterminable tempo is reported as `bpm == 0.0` with a
/// warning. Use [`TempoEstimate::require_bpm`] before dividing by it.
///
/// # Example
/// ```
/// use bma_audio::tempo::{estimate_tempo, TempoConfidence};
/// use bma_core::config::TempoConfig;
/// let estimate = estimate_tempo(&[0.0; 44100], 44100, &TempoConfig::default());
/// assert_eq!(estimate.confidence, TempoConfidence::Undeterminable);
/// assert_eq!(estimate.bpm, 0.0);
/// ```
#[must_use]
pub fn estimate_tempo(samples: &[f32], sample_rate: u32, config: &TempoConfig) -> TempoEstimate {
    let estimate = tempo_from_beats(detect_beats(samples, sample_rate, config));
    match estimate.confidence {
        TempoConfidence::Undeterminable => {
            log::warn!("Pas assez de beats trouvés ({})", estimate.beats.len());
        }
        TempoConfidence::Low => {
            log::warn!(
                "Peu de beats trouvés ({}), tempo peu fiable : {:.2} bpm",
                estimate.beats.len(),
                estimate.bpm
            );
        }
        TempoConfidence::Normal => {
            log::info!(
                "Tempo estimé : {:.2} bpm sur {} beats",
                estimate.bpm,
                estimate.beats.len()
            );
        }
    }
    estimate
}

/// Reduce beat timestamps to a tempo: median of `60 / Δt`.
///
/// Non-positive intervals are skipped.
///
/// # Example
/// ```
/// use bma_audio::tempo::{tempo_from_beats, TempoConfidence};
/// let estimate = tempo_from_beats(vec![0.0, 0.5, 1.0, 1.5, 2.5]);
/// assert!((estimate.bpm - 120.0).abs() < 1e-9);
/// assert_eq!(estimate.confidence, TempoConfidence::Normal);
/// ```
#[must_use]
pub fn tempo_from_beats(beats: Vec<f64>) -> TempoEstimate {
    let mut tempos: Vec<f64> = beats
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|&dt| dt > 0.0)
        .map(|dt| 60.0 / dt)
        .collect();

    let confidence = match beats.len() {
        0 | 1 => TempoConfidence::Undeterminable,
        n if n < CONFIDENT_BEATS => TempoConfidence::Low,
        _ => TempoConfidence::Normal,
    };

    match median(&mut tempos) {
        Some(bpm) if confidence != TempoConfidence::Undeterminable => TempoEstimate {
            bpm,
            beats,
            confidence,
        },
        _ => TempoEstimate {
            bpm: 0.0,
            beats,
            confidence: TempoConfidence::Undeterminable,
        },
    }
}

/// Median of `values` (mean of the two middle values for even counts).
/// Sorts `values` in place.
///
/// # Example
/// ```
/// use bma_audio::tempo::median;
/// assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
/// assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
/// assert_eq!(median(&mut []), None);
/// ```
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
