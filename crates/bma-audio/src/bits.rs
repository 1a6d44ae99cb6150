use std::ops::Range;

use bma_core::config::DecoderConfig;
use bma_core::error::DecodeError;

use crate::fft::SpectralAnalyzer;

/// Samples per beat at `bpm`, as a fractional count.
///
/// # Example
/// ```
/// use bma_audio::bits::samples_per_beat;
/// assert!((samples_per_beat(120.0, 44100) - 22050.0).abs() < 1e-9);
/// ```
#[inline]
#[must_use]
pub fn samples_per_beat(bpm: f64, sample_rate: u32) -> f64 {
    (60.0 / bpm) * f64::from(sample_rate)
}

/// Sample range of beat `index`: `floor(i·spb) .. floor((i+1)·spb)`.
///
/// Boundaries are truncated independently, so window lengths may differ by
/// one sample from beat to beat.
///
/// # Example
/// ```
/// use bma_audio::bits::beat_window;
/// assert_eq!(beat_window(0, 2.5), 0..2);
/// assert_eq!(beat_window(1, 2.5), 2..5);
/// ```
#[inline]
#[must_use]
pub fn beat_window(index: usize, samples_per_beat: f64) -> Range<usize> {
    let start = (index as f64 * samples_per_beat) as usize;
    let end = ((index + 1) as f64 * samples_per_beat) as usize;
    start..end
}

/// Lazy per-beat bit reader.
///
/// Yields one bit per beat window: 1 when the magnitude at the carrier
/// reaches the energy threshold, 0 otherwise. The first window that runs
/// past the data yields `OutOfData` and ends the iteration.
///
/// # Example
/// ```
/// use bma_audio::bits::BitExtractor;
/// use bma_audio::fft::SpectralAnalyzer;
/// use bma_core::config::DecoderConfig;
///
/// let config = DecoderConfig::default();
/// let mut analyzer = SpectralAnalyzer::default();
/// let silence = vec![0.0f32; 8000];
/// let bits: Vec<_> = BitExtractor::new(&silence, 120.0, 8000, &config, &mut analyzer)
///     .unwrap()
///     .collect();
/// assert_eq!(bits.len(), 3); // two beats, then OutOfData
/// assert!(bits[2].is_err());
/// ```
pub struct BitExtractor<'a> {
    data: &'a [f32],
    sample_rate: u32,
    samples_per_beat: f64,
    carrier_hz: f64,
    energy_threshold: f64,
    analyzer: &'a mut SpectralAnalyzer,
    beat: usize,
    done: bool,
}

impl<'a> BitExtractor<'a> {
    /// Prepare a reader over `data` at the given tempo.
    ///
    /// # Errors
    /// - `UndeterminableTempo` if `bpm` is not a positive finite number.
    /// - `OutOfData` at beat 0 if a beat is shorter than one sample.
    pub fn new(
        data: &'a [f32],
        bpm: f64,
        sample_rate: u32,
        config: &DecoderConfig,
        analyzer: &'a mut SpectralAnalyzer,
    ) -> Result<Self, DecodeError> {
        if !bpm.is_finite() || bpm <= 0.0 {
            return Err(DecodeError::UndeterminableTempo { bpm });
        }
        let spb = samples_per_beat(bpm, sample_rate);
        if spb < 1.0 {
            return Err(DecodeError::OutOfData {
                beat: 0,
                needed: 1,
                available: data.len(),
            });
        }
        Ok(Self {
            data,
            sample_rate,
            samples_per_beat: spb,
            carrier_hz: config.carrier_hz,
            energy_threshold: config.energy_threshold,
            analyzer,
            beat: 0,
            done: false,
        })
    }

    /// Index of the next beat to read.
    #[must_use]
    pub fn beat(&self) -> usize {
        self.beat
    }

    /// Samples per beat used by this reader.
    #[must_use]
    pub fn samples_per_beat(&self) -> f64 {
        self.samples_per_beat
    }
}

impl Iterator for BitExtractor<'_> {
    type Item = Result<u8, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let range = beat_window(self.beat, self.samples_per_beat);
        if range.end > self.data.len() {
            self.done = true;
            return Some(Err(DecodeError::OutOfData {
                beat: self.beat,
                needed: range.end,
                available: self.data.len(),
            }));
        }

        let energy = match self.analyzer.energy_at_frequency(
            &self.data[range],
            self.sample_rate,
            self.carrier_hz,
        ) {
            Ok(e) => e,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let bit = u8::from(energy >= self.energy_threshold);
        log::trace!("Beat {} : énergie {energy:.0} -> {bit}", self.beat);
        self.beat += 1;
        Some(Ok(bit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u32 = 8000;

    fn config_with_threshold(threshold: f64) -> DecoderConfig {
        DecoderConfig {
            energy_threshold: threshold,
            ..DecoderConfig::default()
        }
    }

    #[test]
    fn tone_present_and_absent_windows() {
        // 120 bpm at 8 kHz: 4000 samples per beat, 50 Hz sits exactly on bin 25.
        let mut data: Vec<f32> = (0..4000)
            .map(|i| 10000.0 * (2.0 * std::f32::consts::PI * 50.0 * i as f32 / RATE as f32).sin())
            .collect();
        data.extend(std::iter::repeat_n(0.0, 4000));

        let config = config_with_threshold(1.0e7);
        let mut analyzer = SpectralAnalyzer::default();
        let bits: Vec<u8> = BitExtractor::new(&data, 120.0, RATE, &config, &mut analyzer)
            .expect("valid tempo")
            .take(2)
            .collect::<Result<_, _>>()
            .expect("two full windows");
        assert_eq!(bits, vec![1, 0]);
    }

    #[test]
    fn threshold_is_inclusive() {
        // 10000 * 4000 / 2 = 2e7 at the carrier bin.
        let data: Vec<f32> = (0..4000)
            .map(|i| 10000.0 * (2.0 * std::f32::consts::PI * 50.0 * i as f32 / RATE as f32).sin())
            .collect();
        let mut analyzer = SpectralAnalyzer::default();
        let energy = analyzer
            .energy_at_frequency(&data, RATE, 50.0)
            .expect("non-empty");
        let config = config_with_threshold(energy);
        let mut reader =
            BitExtractor::new(&data, 120.0, RATE, &config, &mut analyzer).expect("valid tempo");
        assert_eq!(reader.next(), Some(Ok(1)));
    }

    #[test]
    fn out_of_data_ends_iteration() {
        let data = vec![0.0f32; 9000];
        let config = DecoderConfig::default();
        let mut analyzer = SpectralAnalyzer::default();
        let mut reader =
            BitExtractor::new(&data, 120.0, RATE, &config, &mut analyzer).expect("valid tempo");
        assert_eq!(reader.next(), Some(Ok(0)));
        assert_eq!(reader.next(), Some(Ok(0)));
        assert_eq!(
            reader.next(),
            Some(Err(DecodeError::OutOfData {
                beat: 2,
                needed: 12000,
                available: 9000
            }))
        );
        assert_eq!(reader.next(), None);
        assert_eq!(reader.beat(), 2);
    }

    #[test]
    fn zero_bpm_is_rejected() {
        let mut analyzer = SpectralAnalyzer::default();
        let config = DecoderConfig::default();
        assert!(matches!(
            BitExtractor::new(&[0.0; 10], 0.0, RATE, &config, &mut analyzer),
            Err(DecodeError::UndeterminableTempo { .. })
        ));
        assert!(BitExtractor::new(&[0.0; 10], f64::NAN, RATE, &config, &mut analyzer).is_err());
    }

    #[test]
    fn beat_shorter_than_one_sample_is_out_of_data() {
        let mut analyzer = SpectralAnalyzer::default();
        let config = DecoderConfig::default();
        assert!(matches!(
            BitExtractor::new(&[0.0; 1000], 9.0e6, RATE, &config, &mut analyzer),
            Err(DecodeError::OutOfData {
                beat: 0,
                available: 1000,
                ..
            })
        ));
    }

    #[test]
    fn windows_truncate_cumulative_boundaries() {
        let spb = samples_per_beat(122.0, RATE);
        let lengths: Vec<usize> = (0..5).map(|i| beat_window(i, spb).len()).collect();
        assert!(lengths.iter().all(|&l| l == 3934 || l == 3935));
        assert_eq!(beat_window(3, spb).start, (3.0 * spb) as usize);
    }
}
