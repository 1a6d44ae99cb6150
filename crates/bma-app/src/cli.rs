use std::path::PathBuf;

use bma_core::config::DecoderConfig;
use clap::Parser;

/// Binary Music Analyzer: finds hidden messages embedded inside the beat of a song.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Chemin vers la chanson (WAV, FLAC, MP3, OGG).
    pub song: PathBuf,

    /// Fichier de configuration TOML.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Fréquence porteuse en Hz (défaut 50).
    #[arg(short, long)]
    pub frequency: Option<f64>,

    /// Tempo initial en bpm. Saute l'estimation du tempo.
    #[arg(long)]
    pub bpm: Option<f64>,

    /// Nombre maximal de tempos essayés.
    #[arg(long)]
    pub attempts: Option<u32>,

    /// Seuil d'énergie à la porteuse pour lire un bit à 1.
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Direction de recherche du tempo : down, up, both.
    #[arg(long)]
    pub search: Option<String>,

    /// Canal audio à analyser (0 = gauche).
    #[arg(long)]
    pub channel: Option<usize>,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

impl Cli {
    /// Apply the command-line overrides on top of a loaded configuration.
    ///
    /// # Errors
    /// Returns an error if `--search` names an unknown direction.
    pub fn apply_overrides(&self, config: &mut DecoderConfig) -> anyhow::Result<()> {
        if let Some(hz) = self.frequency {
            config.carrier_hz = hz;
        }
        if let Some(n) = self.attempts {
            config.max_attempts = n;
        }
        if let Some(t) = self.threshold {
            config.energy_threshold = t;
        }
        if let Some(ref dir) = self.search {
            config.search = dir.parse()?;
        }
        if let Some(c) = self.channel {
            config.channel = c;
        }
        config.clamp_all();
        Ok(())
    }
}
