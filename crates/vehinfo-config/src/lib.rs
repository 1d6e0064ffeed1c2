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

//! Configuration normalization for the vehicle info card.
//!
//! Takes a card configuration from any released schema version and upgrades
//! it to the current one, keeping a verbatim snapshot of the original so the
//! user can revert.

mod access;
pub mod button_order;
pub mod catalog;
pub mod changelog;
pub mod errors;
pub mod flags;
pub mod normalize;
pub mod section;
pub mod session;

pub use changelog::{ChangeEntry, ChangeLog, MigrationRule};
pub use errors::{ConfigError, ConfigResult};
pub use flags::{MigrationFlags, detect};
pub use normalize::{LegacySnapshot, NormalizeOutcome, normalize};
pub use section::{SectionId, SectionOrder};
pub use session::{ConfigSession, ConfigSink};
