use bma_core::config::BinPolicy;
use bma_core::error::DecodeError;
use realfft::RealFftPlanner;
use realfft::num_complex::Complex;

/// FFT pipeline: windowed real FFT using realfft.
///
/// Pre-allocates the FFT plan and scratch buffers for zero-allocation hot path.
/// Feeds the onset detector; bit decoding uses [`SpectralAnalyzer`] instead.
///
/// # Example
/// ```
/// use bma_audio::fft::FftPipeline;
/// let fft = FftPipeline::new(2048);
/// ```
pub struct FftPipeline {
    fft_size: usize,
    input_buf: Vec<f32>,
    spectrum_buf: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    plan: std::sync::Arc<dyn realfft::RealToComplex<f32>>,
    /// Hann window coefficients.
    window: Vec<f32>,
}

impl FftPipeline {
    /// Create a new FFT pipeline with the given window size.
    ///
    /// # Panics
    /// Panics if `size` is 0.
    #[must_use]
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "FFT size must be > 0");

        let mut planner = RealFftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);

        let input_buf = plan.make_input_vec();
        let spectrum_buf = plan.make_output_vec();
        let scratch = plan.make_scratch_vec();

        // Hann window
        let window: Vec<f32> = (0..size)
            .map(|i| {
                0.5 * (1.0
                    - (2.0 * std::f32::consts::PI * i as f32 / (size as f32 - 1.0).max(1.0)).cos())
            })
            .collect();

        Self {
            fft_size: size,
            input_buf,
            spectrum_buf,
            scratch,
            plan,
            window,
        }
    }

    /// Process `samples` through windowed FFT.
    ///
    /// Returns the spectrum magnitude (N/2+1 bins), normalized by N.
    ///
    /// # Example
    /// ```
    /// use bma_audio::fft::FftPipeline;
    /// let mut fft = FftPipeline::new(256);
    /// let samples = vec![0.0f32; 256];
    /// let spectrum = fft.process(&samples);
    /// assert_eq!(spectrum.len(), 129); // N/2 + 1
    /// ```
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let n = self.fft_size.min(samples.len());

        // Copy and window
        for (i, slot) in self.input_buf.iter_mut().enumerate() {
            *slot = if i < n {
                samples[i] * self.window[i]
            } else {
                0.0
            };
        }

        if self
            .plan
            .process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .is_err()
        {
            return vec![0.0; self.spectrum_buf.len()];
        }

        self.spectrum_buf
            .iter()
            .map(|c| (c.re * c.re + c.im * c.im).sqrt() / self.fft_size as f32)
            .collect()
    }

    /// FFT window size.
    #[must_use]
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}

/// Magnitude of the spectrum at (or just above) a target frequency.
///
/// Plain, unwindowed and unnormalized DFT of the whole window, computed in
/// `f64`. Window lengths change with the tempo, so plans are cached by the
/// planner instead of being fixed at construction.
///
/// # Example
/// ```
/// use bma_audio::fft::SpectralAnalyzer;
/// use bma_core::config::BinPolicy;
///
/// let rate = 8000;
/// let tone: Vec<f32> = (0..800)
///     .map(|i| (2.0 * std::f32::consts::PI * 50.0 * i as f32 / rate as f32).sin())
///     .collect();
/// let mut analyzer = SpectralAnalyzer::new(BinPolicy::FallbackToDc);
/// let energy = analyzer.energy_at_frequency(&tone, rate, 50.0).unwrap();
/// assert!((energy - 400.0).abs() < 1.0); // amplitude * N / 2
/// ```
pub struct SpectralAnalyzer {
    planner: RealFftPlanner<f64>,
    input_buf: Vec<f64>,
    spectrum_buf: Vec<Complex<f64>>,
    scratch: Vec<Complex<f64>>,
    policy: BinPolicy,
}

impl SpectralAnalyzer {
    /// Create an analyzer with the given out-of-range bin policy.
    #[must_use]
    pub fn new(policy: BinPolicy) -> Self {
        Self {
            planner: RealFftPlanner::new(),
            input_buf: Vec::new(),
            spectrum_buf: Vec::new(),
            scratch: Vec::new(),
            policy,
        }
    }

    /// Bin policy in use.
    #[must_use]
    pub fn policy(&self) -> BinPolicy {
        self.policy
    }

    /// Magnitude at the first bin whose frequency is `>= target_hz`.
    ///
    /// # Errors
    /// `InvalidWindow` for an empty window, `FrequencyOutOfRange` when no bin
    /// qualifies and the policy is `Reject`.
    pub fn energy_at_frequency(
        &mut self,
        window: &[f32],
        sample_rate: u32,
        target_hz: f64,
    ) -> Result<f64, DecodeError> {
        if window.is_empty() {
            return Err(DecodeError::InvalidWindow);
        }
        let n = window.len();
        let bin = carrier_bin(n, sample_rate, target_hz, self.policy)?;

        let plan = self.planner.plan_fft_forward(n);
        self.input_buf.clear();
        self.input_buf.extend(window.iter().map(|&s| f64::from(s)));
        self.spectrum_buf
            .resize(plan.complex_len(), Complex::new(0.0, 0.0));
        self.scratch
            .resize(plan.get_scratch_len(), Complex::new(0.0, 0.0));

        plan.process_with_scratch(&mut self.input_buf, &mut self.spectrum_buf, &mut self.scratch)
            .map_err(|e| {
                log::error!("FFT failed on a {n}-sample window: {e}");
                DecodeError::InvalidWindow
            })?;

        Ok(self.spectrum_buf[bin].norm())
    }
}

impl Default for SpectralAnalyzer {
    fn default() -> Self {
        Self::new(BinPolicy::default())
    }
}

/// One-shot variant of [`SpectralAnalyzer::energy_at_frequency`].
///
/// # Errors
/// Same as [`SpectralAnalyzer::energy_at_frequency`].
pub fn energy_at_frequency(
    window: &[f32],
    sample_rate: u32,
    target_hz: f64,
    policy: BinPolicy,
) -> Result<f64, DecodeError> {
    SpectralAnalyzer::new(policy).energy_at_frequency(window, sample_rate, target_hz)
}

/// Index of the first non-negative frequency bin `>= target_hz` for an
/// `n`-point DFT.
///
/// Bins follow the two-sided layout: index `k` is `k * rate / n` for
/// `k <= (n - 1) / 2`, later indices are negative frequencies.
///
/// # Errors
/// `FrequencyOutOfRange` when no bin qualifies and `policy` is `Reject`.
///
/// # Example
/// ```
/// use bma_audio::fft::carrier_bin;
/// use bma_core::config::BinPolicy;
/// assert_eq!(carrier_bin(4000, 8000, 50.0, BinPolicy::Reject), Ok(25));
/// assert_eq!(carrier_bin(4000, 8000, 50.1, BinPolicy::Reject), Ok(26));
/// assert_eq!(carrier_bin(8, 8000, 5000.0, BinPolicy::FallbackToDc), Ok(0));
/// ```
pub fn carrier_bin(
    n: usize,
    sample_rate: u32,
    target_hz: f64,
    policy: BinPolicy,
) -> Result<usize, DecodeError> {
    if n == 0 {
        return Err(DecodeError::InvalidWindow);
    }
    let bin_hz = 1.0 / (n as f64 * (1.0 / f64::from(sample_rate)));
    let last_positive = (n - 1) / 2;

    if let Some(k) = (0..=last_positive).find(|&k| k as f64 * bin_hz >= target_hz) {
        return Ok(k);
    }

    match policy {
        BinPolicy::FallbackToDc => Ok(0),
        BinPolicy::Reject => Err(DecodeError::FrequencyOutOfRange {
            target_hz,
            max_hz: last_positive as f64 * bin_hz,
        }),
    }
}
