/// Single-channel sample buffer at a fixed sample rate.
///
/// Filled once by the audio loader, then only borrowed (`&[f32]`) by the
/// tempo estimator and every calibration attempt.
///
/// # Example
/// ```
/// use bma_core::signal::SampleBuffer;
/// let buf = SampleBuffer::new(vec![0.0; 44100], 44100);
/// assert!((buf.duration_secs() - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBuffer {
    /// Amplitude samples, in the scale chosen by the loader.
    pub samples: Vec<f32>,
    /// Samples per second.
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Wrap already-selected mono samples.
    #[must_use]
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Keep one channel of interleaved frames, scaling every sample.
    ///
    /// `channel` is clamped to the last available channel. A trailing
    /// incomplete frame is ignored.
    ///
    /// # Example
    /// ```
    /// use bma_core::signal::SampleBuffer;
    /// let interleaved = [0.1, 0.9, 0.2, 0.8, 0.3, 0.7];
    /// let left = SampleBuffer::from_interleaved(&interleaved, 2, 0, 1.0, 8000);
    /// assert_eq!(left.samples, vec![0.1, 0.2, 0.3]);
    /// ```
    #[must_use]
    pub fn from_interleaved(
        interleaved: &[f32],
        channels: usize,
        channel: usize,
        scale: f32,
        sample_rate: u32,
    ) -> Self {
        let channels = channels.max(1);
        let channel = channel.min(channels - 1);
        let samples = interleaved
            .chunks_exact(channels)
            .map(|frame| frame[channel] * scale)
            .collect();
        Self::new(samples, sample_rate)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if the buffer holds no sample.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds. 0 when the sample rate is unknown.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_right_channel_and_scales() {
        let interleaved = [0.5, -0.5, 0.25, -0.25];
        let right = SampleBuffer::from_interleaved(&interleaved, 2, 1, 2.0, 48000);
        assert_eq!(right.samples, vec![-1.0, -0.5]);
        assert_eq!(right.sample_rate, 48000);
    }

    #[test]
    fn channel_index_is_clamped() {
        let interleaved = [1.0, 2.0, 3.0, 4.0];
        let buf = SampleBuffer::from_interleaved(&interleaved, 2, 7, 1.0, 8000);
        assert_eq!(buf.samples, vec![2.0, 4.0]);
    }

    #[test]
    fn incomplete_trailing_frame_is_dropped() {
        let interleaved = [1.0, 2.0, 3.0, 4.0, 5.0];
        let buf = SampleBuffer::from_interleaved(&interleaved, 2, 0, 1.0, 8000);
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn zero_sample_rate_duration() {
        let buf = SampleBuffer::new(vec![0.0; 10], 0);
        assert_eq!(buf.duration_secs(), 0.0);
        assert!(!buf.is_empty());
    }
}
