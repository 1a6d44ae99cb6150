//! Test fixtures: synthetic beat-coded signals.

use crate::bits::{beat_window, samples_per_beat};

/// Encode `message` repeated `repeats` times, one bit per beat, MSB first.
///
/// A `1` beat carries a continuous-phase sine at `carrier_hz`, a `0` beat is
/// silent. Beat boundaries use the same truncation as the decoder.
pub(crate) fn encode_message(
    message: &[u8],
    repeats: usize,
    bpm: f64,
    sample_rate: u32,
    carrier_hz: f64,
    amplitude: f32,
) -> Vec<f32> {
    let bits: Vec<u8> = message
        .iter()
        .cycle()
        .take(message.len() * repeats)
        .flat_map(|byte| (0..8).rev().map(move |shift| (byte >> shift) & 1))
        .collect();

    let spb = samples_per_beat(bpm, sample_rate);
    let len = (bits.len() as f64 * spb) as usize;
    let mut samples = vec![0.0f32; len];

    for (i, &bit) in bits.iter().enumerate() {
        if bit == 0 {
            continue;
        }
        let range = beat_window(i, spb);
        let start = range.start;
        for (offset, slot) in samples[range].iter_mut().enumerate() {
            let t = (start + offset) as f64 / f64::from(sample_rate);
            *slot = amplitude * (2.0 * std::f64::consts::PI * carrier_hz * t).sin() as f32;
        }
    }

    samples
}
