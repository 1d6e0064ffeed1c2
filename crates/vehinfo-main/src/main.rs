// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of VehInfo.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz


mod cli;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::FmtSubscriber;

use cli::{Cli, Commands};
use config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;

    // Initialize tracing with env filter support
    // Respects RUST_LOG environment variable
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &config.source {
        Some(path) => info!("✅ Loaded configuration from {}", path.display()),
        None => info!("No configuration file found, using defaults"),
    }

    let output = match cli.command {
        Commands::Normalize {
            file,
            write,
            changes,
        } => commands::normalize_file(&file, write, changes)?,
        Commands::Detect { file } => commands::detect_file(&file)?,
        Commands::Resolve { entity } => commands::resolve_entity(&config, &entity).await?,
        Commands::Model { entity } => commands::model_name(&config, &entity).await?,
        Commands::Roles => commands::describe_roles(),
    };

    print!("{output}");
    if !output.ends_with('\n') && !output.is_empty() {
        println!();
    }
    Ok(())
}
