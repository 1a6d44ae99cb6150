use crate::fft::FftPipeline;

/// Frames ignored after start-up to let the running average settle.
const WARMUP_FRAMES: u64 = 10;

/// Minimum time between two onsets, in seconds.
const ONSET_COOLDOWN_S: f32 = 0.13;

/// Fraction of the running spectral energy added to the adaptive threshold.
///
/// Relative so the detector behaves the same on normalized and PCM-scaled
/// samples. A steady tone keeps its flux well below this floor.
const FLUX_FLOOR_RATIO: f32 = 0.2;

/// Outcome of one detector step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BeatEvent {
    /// An onset fired on this hop.
    pub is_beat: bool,
    /// Stream time in seconds of the hop that was just consumed.
    pub timestamp_s: f64,
    /// How far the flux exceeded the threshold, in [0, 1].
    pub strength: f32,
}

/// Streaming onset detector.
///
/// Keeps a sliding analysis frame of `win_size` samples, advanced by one
/// hop per call. Uses spectral flux with an adaptive threshold and an
/// onset cooldown. All state lives in the struct: one detector per stream.
///
/// # Example
/// ```
/// use bma_audio::beat::OnsetTempoDetector;
/// let mut detector = OnsetTempoDetector::new(1024, 512, 44100);
/// let event = detector.advance(&[0.0; 512]);
/// assert!(!event.is_beat);
/// ```
pub struct OnsetTempoDetector {
    fft: FftPipeline,
    /// Sliding analysis frame, newest hop at the end.
    frame: Vec<f32>,
    hop_size: usize,
    sample_rate: u32,
    /// Previous spectrum for flux calculation (pre-allocated, reused via copy_from_slice).
    prev_spectrum: Vec<f32>,
    /// Running average of flux for adaptive threshold.
    flux_avg: f32,
    /// Running average of the weighted spectral magnitude.
    energy_avg: f32,
    /// Frame counter at the last onset.
    last_onset_frame: u64,
    /// Frames processed so far.
    frame_count: u64,
    /// Minimum frames between two onsets.
    cooldown_frames: u64,
}

impl OnsetTempoDetector {
    /// Create a detector.
    ///
    /// # Panics
    /// Panics if `win_size` is 0.
    #[must_use]
    pub fn new(win_size: usize, hop_size: usize, sample_rate: u32) -> Self {
        let hop_size = hop_size.clamp(1, win_size.max(1));
        let frames_per_sec = sample_rate as f32 / hop_size as f32;
        Self {
            fft: FftPipeline::new(win_size),
            frame: vec![0.0; win_size],
            hop_size,
            sample_rate,
            prev_spectrum: Vec::new(),
            flux_avg: 0.0,
            energy_avg: 0.0,
            last_onset_frame: 0,
            frame_count: 0,
            cooldown_frames: (frames_per_sec * ONSET_COOLDOWN_S).max(2.0) as u64,
        }
    }

    /// Samples expected per call.
    #[must_use]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Push one hop of samples and report whether it holds a beat.
    ///
    /// Short hops are zero-padded, extra samples are ignored.
    pub fn advance(&mut self, hop: &[f32]) -> BeatEvent {
        let timestamp_s = if self.sample_rate == 0 {
            0.0
        } else {
            (self.frame_count * self.hop_size as u64) as f64 / f64::from(self.sample_rate)
        };
        self.frame_count += 1;

        // Slide the frame by one hop
        let win = self.frame.len();
        let keep = win - self.hop_size;
        self.frame.copy_within(self.hop_size.., 0);
        for (i, slot) in self.frame[keep..].iter_mut().enumerate() {
            *slot = hop.get(i).copied().unwrap_or(0.0);
        }

        let spectrum = self.fft.process(&self.frame);

        // Spectral flux, weight bass bands (first 1/4 of spectrum) more heavily
        let bass_cutoff = spectrum.len() / 4;
        let weight = |i: usize| -> f32 { if i < bass_cutoff { 2.0 } else { 1.0 } };
        let flux: f32 = if self.prev_spectrum.len() == spectrum.len() {
            spectrum
                .iter()
                .zip(self.prev_spectrum.iter())
                .enumerate()
                .map(|(i, (&cur, &prev))| (cur - prev).max(0.0) * weight(i))
                .sum()
        } else {
            0.0
        };
        let energy: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &mag)| mag * weight(i))
            .sum();

        // Adaptive threshold, floored relative to the signal level
        self.flux_avg = self.flux_avg * 0.93 + flux * 0.07;
        self.energy_avg = self.energy_avg * 0.93 + energy * 0.07;
        let threshold = self.flux_avg * 1.5 + self.energy_avg * FLUX_FLOOR_RATIO;

        let strength = if flux > threshold {
            ((flux - threshold) / threshold.max(f32::EPSILON)).clamp(0.0, 1.0)
        } else {
            0.0
        };

        let frames_since = self.frame_count - self.last_onset_frame;
        let warmup_complete = self.frame_count > WARMUP_FRAMES;
        let is_beat = warmup_complete && flux > threshold && frames_since > self.cooldown_frames;
        if is_beat {
            self.last_onset_frame = self.frame_count;
        }

        if self.prev_spectrum.len() != spectrum.len() {
            self.prev_spectrum.resize(spectrum.len(), 0.0);
        }
        self.prev_spectrum.copy_from_slice(&spectrum);

        BeatEvent {
            is_beat,
            timestamp_s,
            strength,
        }
    }
}
