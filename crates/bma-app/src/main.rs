use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

pub mod cli;
pub mod pipeline;

fn main() -> Result<ExitCode> {
    // 1. Parser CLI (usage + code non nul si l'argument manque)
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config puis appliquer les overrides CLI
    let mut config = resolve_config(&cli)?;
    cli.apply_overrides(&mut config)?;
    log::debug!("Configuration : {config:?}");

    // 4. Chercher le message
    println!(
        "Trying to find the hidden message in song '{}'...",
        cli.song.display()
    );
    match pipeline::find_message(&cli.song, &config, cli.bpm)? {
        Some(message) => {
            log::info!(
                "Trouvé @ {:.2} bpm en {} tentative(s)",
                message.bpm,
                message.attempts
            );
            println!("Hidden message: '{}'", message.text);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("Sorry! Hidden message couldn't be found.");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Resolve config: `--config` file if it exists, built-in defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<bma_core::config::DecoderConfig> {
    if cli.config.exists() {
        bma_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(bma_core::config::DecoderConfig::default())
    }
}
