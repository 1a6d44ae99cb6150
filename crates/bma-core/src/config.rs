use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Complete decoder configuration.
///
/// Serializable to TOML. Every field has a sane default matching the
/// reference encoder (50 Hz carrier, 16-bit PCM amplitude scale).
///
/// # Example
/// ```
/// use bma_core::config::DecoderConfig;
/// let config = DecoderConfig::default();
/// assert_eq!(config.max_attempts, 10);
/// assert!((config.carrier_hz - 50.0).abs() < f64::EPSILON);
/// ```
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct DecoderConfig {
    // === Bit detection ===
    /// Carrier frequency in Hz whose per-beat energy encodes a bit.
    pub carrier_hz: f64,
    /// Magnitude at the carrier bin from which a beat reads as `1`.
    ///
    /// Coupled to `amplitude_scale`: the default assumes 16-bit PCM values.
    pub energy_threshold: f64,
    /// What to do when no frequency bin reaches the carrier.
    pub bin_policy: BinPolicy,

    // === Calibration ===
    /// Number of tempo candidates tried before giving up.
    pub max_attempts: u32,
    /// Order in which tempo candidates are tried.
    pub search: SearchDirection,

    // === Input ===
    /// Channel kept from multi-channel files (0 = left).
    pub channel: usize,
    /// Factor applied to normalized decoded samples. 32768 restores 16-bit PCM values.
    pub amplitude_scale: f32,

    // === Tempo ===
    /// Onset detector parameters.
    pub tempo: TempoConfig,
}

/// Streaming onset detector parameters.
///
/// # Example
/// ```
/// use bma_core::config::TempoConfig;
/// let tempo = TempoConfig::default();
/// assert_eq!((tempo.win_size, tempo.hop_size), (1024, 512));
/// ```
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct TempoConfig {
    /// Analysis window in samples.
    pub win_size: usize,
    /// Samples consumed per detector step.
    pub hop_size: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            win_size: 1024,
            hop_size: 512,
        }
    }
}

/// Behaviour when the carrier lies above every non-negative frequency bin.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum BinPolicy {
    /// Read bin 0 (DC). Keeps compatibility with material decoded by the reference tool.
    #[default]
    FallbackToDc,
    /// Fail with `FrequencyOutOfRange`.
    Reject,
}

/// Direction of the tempo search during calibration.
///
/// # Example
/// ```
/// use bma_core::config::SearchDirection;
/// let dir: SearchDirection = "both".parse().unwrap_or_default();
/// assert_eq!(dir, SearchDirection::Both);
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum SearchDirection {
    /// 0, -1, -2, ... bpm from the estimate.
    #[default]
    Down,
    /// 0, +1, +2, ... bpm from the estimate.
    Up,
    /// 0, -1, +1, -2, +2, ... bpm from the estimate.
    Both,
}

impl SearchDirection {
    /// Offset in bpm applied to the initial tempo for the given attempt index.
    ///
    /// # Example
    /// ```
    /// use bma_core::config::SearchDirection;
    /// let offsets: Vec<i64> = (0..5).map(|i| SearchDirection::Both.offset(i)).collect();
    /// assert_eq!(offsets, vec![0, -1, 1, -2, 2]);
    /// ```
    #[must_use]
    pub fn offset(self, attempt: u32) -> i64 {
        match self {
            Self::Down => -i64::from(attempt),
            Self::Up => i64::from(attempt),
            Self::Both => {
                let step = i64::from(attempt.div_ceil(2));
                if attempt % 2 == 1 { -step } else { step }
            }
        }
    }
}

impl FromStr for SearchDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "down" => Ok(Self::Down),
            "up" => Ok(Self::Up),
            "both" => Ok(Self::Both),
            other => anyhow::bail!("Direction de recherche inconnue : {other} (down, up, both)"),
        }
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            carrier_hz: 50.0,
            energy_threshold: 30_000_000.0,
            bin_policy: BinPolicy::FallbackToDc,
            max_attempts: 10,
            search: SearchDirection::Down,
            channel: 0,
            amplitude_scale: 32768.0,
            tempo: TempoConfig::default(),
        }
    }
}

impl DecoderConfig {
    /// Clamp all numeric fields to their valid ranges.
    /// Called after TOML deserialization to prevent out-of-range values.
    pub fn clamp_all(&mut self) {
        self.carrier_hz = self.carrier_hz.max(0.0);
        self.energy_threshold = self.energy_threshold.max(0.0);
        self.max_attempts = self.max_attempts.clamp(1, 1000);
        self.amplitude_scale = self.amplitude_scale.clamp(1.0e-6, 1.0e9);
        self.tempo.win_size = self.tempo.win_size.clamp(64, 65536);
        self.tempo.hop_size = self.tempo.hop_size.clamp(1, self.tempo.win_size);
    }
}

/// Intermediate TOML structure, every section optional.
#[derive(Deserialize)]
struct ConfigFile {
    decoder: Option<DecoderSection>,
    tempo: Option<TempoSection>,
}

/// Decoder section of the TOML config, all fields optional for partial override.
#[derive(Deserialize)]
struct DecoderSection {
    carrier_hz: Option<f64>,
    energy_threshold: Option<f64>,
    bin_policy: Option<BinPolicy>,
    max_attempts: Option<u32>,
    search: Option<SearchDirection>,
    channel: Option<usize>,
    amplitude_scale: Option<f32>,
}

/// Tempo section of the TOML config, all fields optional.
#[derive(Deserialize)]
struct TempoSection {
    win_size: Option<usize>,
    hop_size: Option<usize>,
}

/// Parse TOML text and merge it over the defaults.
///
/// # Errors
/// Returns an error if the text is not valid TOML for this schema.
///
/// # Example
/// ```
/// use bma_core::config::parse_config;
/// let config = parse_config("[decoder]\ncarrier_hz = 60.0\n").unwrap_or_default();
/// assert!((config.carrier_hz - 60.0).abs() < f64::EPSILON);
/// assert_eq!(config.max_attempts, 10);
/// ```
pub fn parse_config(content: &str) -> Result<DecoderConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;

    let mut config = DecoderConfig::default();

    if let Some(d) = file.decoder {
        if let Some(v) = d.carrier_hz {
            config.carrier_hz = v;
        }
        if let Some(v) = d.energy_threshold {
            config.energy_threshold = v;
        }
        if let Some(v) = d.bin_policy {
            config.bin_policy = v;
        }
        if let Some(v) = d.max_attempts {
            config.max_attempts = v;
        }
        if let Some(v) = d.search {
            config.search = v;
        }
        if let Some(v) = d.channel {
            config.channel = v;
        }
        if let Some(v) = d.amplitude_scale {
            config.amplitude_scale = v;
        }
    }

    if let Some(t) = file.tempo {
        if let Some(v) = t.win_size {
            config.tempo.win_size = v;
        }
        if let Some(v) = t.hop_size {
            config.tempo.hop_size = v;
        }
    }

    config.clamp_all();
    Ok(config)
}

/// Load a TOML file and merge it over the defaults.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
/// ```no_run
/// use bma_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<DecoderConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;

    let config = parse_config(&content)
        .with_context(|| format!("Configuration invalide dans {}", path.display()))?;
    log::info!("Configuration chargée depuis {}", path.display());
    Ok(config)
}
