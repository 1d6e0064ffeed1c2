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

use thiserror::Error;

/// Errors raised by explicit edits to an active configuration.
///
/// Normalization itself never fails; these only come from user-driven
/// setters such as drag-reorder with stale indices.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("No pending migration to revert")]
    NoPendingMigration,

    #[error("Index {index} out of range for {list} (length {len})")]
    IndexOutOfRange {
        list: &'static str,
        index: usize,
        len: usize,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
