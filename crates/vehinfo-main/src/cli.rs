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


//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "vehinfo")]
#[command(author, version, about = "VehInfo configuration and entity tooling")]
#[command(
    long_about = "Upgrade vehicle card configurations to the current schema and resolve\n\
    the Home Assistant entities behind a vehicle.\n\
    \nExamples:\n  \
    vehinfo normalize card.yaml             # Print the upgraded configuration\n  \
    vehinfo normalize card.json --write     # Upgrade the file in place\n  \
    vehinfo resolve sensor.car_odometer     # Role map of the car's device\n  \
    vehinfo roles                           # List every known role"
)]
pub struct Cli {
    /// Configuration file (TOML or JSON). Defaults to ./vehinfo.toml when present
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upgrade a card configuration to the current schema
    #[command(
        long_about = "Apply every migration rule to a card configuration (JSON or YAML).\n\
        \nThe upgraded configuration is printed in the input format. With --write the\n\
        file is rewritten, but only when something changed.\n\
        \nExamples:\n  \
        vehinfo normalize card.yaml\n  \
        vehinfo normalize card.json --write --changes"
    )]
    Normalize {
        /// Card configuration file (.json, .yaml or .yml)
        file: PathBuf,

        /// Rewrite the file with the upgraded configuration
        #[arg(long)]
        write: bool,

        /// Print the change log instead of the configuration
        #[arg(long)]
        changes: bool,
    },

    /// Report which legacy shapes a card configuration still contains
    Detect {
        /// Card configuration file (.json, .yaml or .yml)
        file: PathBuf,
    },

    /// Resolve the telemetry entities of the vehicle owning an entity
    Resolve {
        /// Any entity of the vehicle, e.g. sensor.car_odometer
        entity: String,
    },

    /// Print the model of the vehicle owning an entity
    Model {
        /// Any entity of the vehicle
        entity: String,
    },

    /// List every telemetry role and its naming rule
    Roles,
}
