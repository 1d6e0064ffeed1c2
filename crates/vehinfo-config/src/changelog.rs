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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, warn};

/// One step of a normalization pass, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationRule {
    ButtonCards,
    CustomButtons,
    MiniMap,
    SectionVisibility,
    ButtonGrid,
    Theme,
    Services,
    ButtonOrderBootstrap,
    ButtonOrderReconcile,
    SectionOrderReconcile,
}

impl fmt::Display for MigrationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ButtonCards => "button cards",
            Self::CustomButtons => "custom buttons",
            Self::MiniMap => "mini map",
            Self::SectionVisibility => "section visibility",
            Self::ButtonGrid => "button grid",
            Self::Theme => "theme",
            Self::Services => "services",
            Self::ButtonOrderBootstrap => "button order bootstrap",
            Self::ButtonOrderReconcile => "button order reconcile",
            Self::SectionOrderReconcile => "section order reconcile",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEntry {
    pub rule: MigrationRule,
    pub detail: String,
}

/// Ordered record of what a normalization pass moved, renamed or dropped
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeLog(Vec<ChangeEntry>);

impl ChangeLog {
    pub fn record(&mut self, rule: MigrationRule, detail: impl Into<String>) {
        let detail = detail.into();
        debug!("🔧 [MIGRATE] {rule}: {detail}");
        self.0.push(ChangeEntry { rule, detail });
    }

    /// Record a legacy value that had the wrong shape and was not carried over
    pub(crate) fn discard(&mut self, rule: MigrationRule, key: &str, value: &Value) {
        warn!("⚠️ [MIGRATE] {rule}: discarding malformed '{key}' = {value}");
        self.0.push(ChangeEntry {
            rule,
            detail: format!("discarded malformed '{key}'"),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn entries(&self) -> &[ChangeEntry] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChangeEntry> {
        self.0.iter()
    }

    pub fn touches(&self, rule: MigrationRule) -> bool {
        self.0.iter().any(|entry| entry.rule == rule)
    }
}

impl fmt::Display for ChangeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.0 {
            writeln!(f, "[{}] {}", entry.rule, entry.detail)?;
        }
        Ok(())
    }
}
