use std::path::Path;

use anyhow::{Context, Result};
use bma_audio::calibrate::{self, DecodedMessage};
use bma_audio::decode::decode_file;
use bma_audio::tempo::estimate_tempo;
use bma_core::config::DecoderConfig;
use bma_core::error::DecodeError;
use bma_core::signal::SampleBuffer;

/// Decode `song` and search it for a hidden message.
///
/// Returns `Ok(None)` when the calibration budget is exhausted.
///
/// # Errors
/// Returns an error if the file cannot be decoded, the tempo is
/// undeterminable, or the spectral analysis fails.
pub fn find_message(
    song: &Path,
    config: &DecoderConfig,
    bpm_override: Option<f64>,
) -> Result<Option<DecodedMessage>> {
    let buffer = decode_file(song, config.channel, config.amplitude_scale)?;
    find_message_in_buffer(&buffer, config, bpm_override)
        .with_context(|| format!("Analyse de {} échouée", song.display()))
}

/// Search an already decoded buffer for a hidden message.
///
/// The tempo is estimated once; the buffer is then reused read-only by every
/// calibration attempt.
///
/// # Errors
/// See [`find_message`].
pub fn find_message_in_buffer(
    buffer: &SampleBuffer,
    config: &DecoderConfig,
    bpm_override: Option<f64>,
) -> Result<Option<DecodedMessage>> {
    if buffer.is_empty() {
        anyhow::bail!("Aucun échantillon audio");
    }

    let bpm = if let Some(bpm) = bpm_override {
        log::info!("Tempo imposé : {bpm} bpm");
        bpm
    } else {
        estimate_tempo(&buffer.samples, buffer.sample_rate, &config.tempo)
            .require_bpm()
            .context("Tempo indéterminable")?
    };

    match calibrate::decode(&buffer.samples, bpm, buffer.sample_rate, config) {
        Ok(message) => Ok(Some(message)),
        Err(DecodeError::NotFound { attempts }) => {
            log::debug!("Budget de {attempts} tentatives épuisé");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beat_coded(message: &[u8], repeats: usize, bpm: f64, rate: u32) -> SampleBuffer {
        let spb = 60.0 / bpm * f64::from(rate);
        let bits: Vec<u8> = message
            .iter()
            .cycle()
            .take(message.len() * repeats)
            .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
            .collect();
        let len = (bits.len() as f64 * spb) as usize;
        let samples = (0..len)
            .map(|n| {
                let beat = (n as f64 / spb) as usize;
                if bits.get(beat) == Some(&1) {
                    let t = n as f64 / f64::from(rate);
                    (8000.0 * (2.0 * std::f64::consts::PI * 50.0 * t).sin()) as f32
                } else {
                    0.0
                }
            })
            .collect();
        SampleBuffer::new(samples, rate)
    }

    /// Add a 256-sample 1 kHz click at the start of every beat.
    fn add_clicks(buffer: &mut SampleBuffer, bpm: f64) {
        let spb = 60.0 / bpm * f64::from(buffer.sample_rate);
        let rate = buffer.sample_rate as f32;
        let beats = (buffer.len() as f64 / spb).ceil() as usize;
        for beat in 0..beats {
            let start = (beat as f64 * spb) as usize;
            for (i, slot) in buffer.samples[start..].iter_mut().take(256).enumerate() {
                *slot += 20000.0 * (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / rate).sin();
            }
        }
    }

    #[test]
    fn estimated_tempo_decodes_message() {
        let mut buffer = beat_coded(b"AbC", 2, 120.0, 44100);
        add_clicks(&mut buffer, 120.0);
        let config = DecoderConfig {
            // Half the on-bin magnitude of a 22050-sample window at amplitude 8000.
            energy_threshold: 8000.0 * 22050.0 / 4.0,
            ..DecoderConfig::default()
        };
        let found = find_message_in_buffer(&buffer, &config, None)
            .expect("clicks give a tempo")
            .expect("message within budget");
        assert_eq!(found.text, "AbC");
        assert!((found.bpm - 120.0).abs() < 1.0, "framed at {} bpm", found.bpm);
    }

    #[test]
    fn empty_buffer_is_an_error() {
        let buffer = SampleBuffer::new(Vec::new(), 44100);
        assert!(find_message_in_buffer(&buffer, &DecoderConfig::default(), None).is_err());
    }

    #[test]
    fn silence_has_no_tempo() {
        let buffer = SampleBuffer::new(vec![0.0; 44100], 44100);
        let err = find_message_in_buffer(&buffer, &DecoderConfig::default(), None)
            .err()
            .map(|e| format!("{e:#}"));
        assert!(err.is_some_and(|msg| msg.contains("Tempo indéterminable")));
    }

    #[test]
    fn silence_with_forced_tempo_is_not_found() {
        let buffer = SampleBuffer::new(vec![0.0; 44100], 44100);
        let found = find_message_in_buffer(&buffer, &DecoderConfig::default(), Some(120.0))
            .expect("not found is not an error");
        assert!(found.is_none());
    }

    #[test]
    fn forced_tempo_decodes_message() {
        let buffer = beat_coded(b"Rust42", 2, 100.0, 8000);
        let config = DecoderConfig {
            // Half the on-bin magnitude of a 4800-sample window at amplitude 8000.
            energy_threshold: 8000.0 * 4800.0 / 4.0,
            ..DecoderConfig::default()
        };
        let found = find_message_in_buffer(&buffer, &config, Some(100.0)).expect("no fatal error");
        assert_eq!(found.map(|m| m.text), Some("Rust42".to_string()));
    }
}
