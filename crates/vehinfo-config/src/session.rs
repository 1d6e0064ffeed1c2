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

//! Active configuration held for a session, with migrate/accept/revert and
//! the explicit edit operations the editor uses.
//!
//! Every change to the active config is handed to a [`ConfigSink`], which is
//! the host's save callback.

use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, info};

use crate::access::object_entry;
use crate::button_order::stored_button_order;
use crate::catalog::{BUTTON_GRID, BUTTON_ORDER, EXTRA_CONFIGS, SECTION_ORDER};
use crate::changelog::ChangeLog;
use crate::errors::{ConfigError, ConfigResult};
use crate::normalize::{LegacySnapshot, normalize};
use crate::section::{SectionId, SectionOrder};

/// Receives the configuration every time it must be persisted
pub trait ConfigSink {
    fn save(&mut self, config: &Value);
}

impl<F> ConfigSink for F
where
    F: FnMut(&Value),
{
    fn save(&mut self, config: &Value) {
        self(config);
    }
}

pub struct ConfigSession<S: ConfigSink> {
    config: Value,
    pending: Option<LegacySnapshot>,
    last_changes: ChangeLog,
    sink: S,
}

impl<S: ConfigSink> fmt::Debug for ConfigSession<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSession")
            .field("config", &self.config)
            .field("pending", &self.pending.is_some())
            .field("last_changes", &self.last_changes.len())
            .finish_non_exhaustive()
    }
}

impl<S: ConfigSink> ConfigSession<S> {
    pub fn new(sink: S) -> Self {
        Self {
            config: Value::Object(Map::new()),
            pending: None,
            last_changes: ChangeLog::default(),
            sink,
        }
    }

    /// Load a configuration from host storage.
    ///
    /// Any snapshot from a previous load is dropped. The normalized object is
    /// only persisted when normalization actually changed it.
    pub fn set_config(&mut self, raw: Value) -> &ChangeLog {
        self.pending = None;

        let outcome = normalize(&raw);
        let changed = outcome.config != raw;
        self.config = outcome.config;
        self.pending = outcome.legacy_snapshot;
        self.last_changes = outcome.changes;

        if changed {
            info!(
                "💾 Persisting migrated config ({} change(s))",
                self.last_changes.len()
            );
            self.sink.save(&self.config);
        }
        &self.last_changes
    }

    pub fn config(&self) -> &Value {
        &self.config
    }

    pub fn last_changes(&self) -> &ChangeLog {
        &self.last_changes
    }

    /// Snapshot offered to the user for revert, if the last load migrated anything
    pub fn legacy_snapshot(&self) -> Option<&LegacySnapshot> {
        self.pending.as_ref()
    }

    /// Keep the migrated config and forget the snapshot
    pub fn accept_migration(&mut self) -> bool {
        let had_snapshot = self.pending.take().is_some();
        if had_snapshot {
            debug!("Migration accepted, legacy snapshot discarded");
        }
        had_snapshot
    }

    /// Restore the pre-migration config as the active, persisted config
    pub fn revert_migration(&mut self) -> ConfigResult<()> {
        let snapshot = self.pending.take().ok_or(ConfigError::NoPendingMigration)?;
        info!("↩️ Reverting to legacy config captured at {}", snapshot.taken_at);
        self.config = snapshot.config;
        self.last_changes = ChangeLog::default();
        self.sink.save(&self.config);
        Ok(())
    }

    pub fn section_order(&self) -> SectionOrder {
        self.config
            .get(EXTRA_CONFIGS)
            .and_then(|extra| extra.get(SECTION_ORDER))
            .and_then(SectionOrder::from_value)
            .unwrap_or_default()
    }

    pub fn set_section_order(&mut self, order: &SectionOrder) {
        object_entry(self.root_mut(), EXTRA_CONFIGS)
            .insert(SECTION_ORDER.to_owned(), order.to_value());
        self.persist();
    }

    pub fn set_section_visible(&mut self, section: SectionId, visible: bool) {
        let mut order = self.section_order();
        if order.set_visible(section, visible) {
            self.set_section_order(&order);
        }
    }

    pub fn move_section(&mut self, from: usize, to: usize) -> ConfigResult<()> {
        let mut order = self.section_order();
        let len = order.as_slice().len();
        if !order.move_entry(from, to) {
            return Err(ConfigError::IndexOutOfRange {
                list: SECTION_ORDER,
                index: from.max(to),
                len,
            });
        }
        self.set_section_order(&order);
        Ok(())
    }

    pub fn button_order(&self) -> Vec<String> {
        self.config
            .as_object()
            .and_then(stored_button_order)
            .unwrap_or_default()
    }

    pub fn move_button(&mut self, from: usize, to: usize) -> ConfigResult<()> {
        let mut order = self.button_order();
        let len = order.len();
        if from >= len || to >= len {
            return Err(ConfigError::IndexOutOfRange {
                list: BUTTON_ORDER,
                index: from.max(to),
                len,
            });
        }
        let key = order.remove(from);
        order.insert(to, key);

        let grid = object_entry(object_entry(self.root_mut(), EXTRA_CONFIGS), BUTTON_GRID);
        grid.insert(
            BUTTON_ORDER.to_owned(),
            Value::Array(order.into_iter().map(Value::String).collect()),
        );
        self.persist();
        Ok(())
    }

    /// Replace one top-level key.
    ///
    /// The result is normalized again so that added or removed buttons are
    /// reconciled into the button order right away.
    pub fn patch(&mut self, key: &str, value: Value) {
        self.root_mut().insert(key.to_owned(), value);
        let outcome = normalize(&self.config);
        self.config = outcome.config;
        self.last_changes = outcome.changes;
        self.persist();
    }

    fn root_mut(&mut self) -> &mut Map<String, Value> {
        if !self.config.is_object() {
            self.config = Value::Object(Map::new());
        }
        match &mut self.config {
            Value::Object(root) => root,
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
                unreachable!("root was normalized to an object above")
            }
        }
    }

    fn persist(&mut self) {
        self.sink.save(&self.config);
    }
}
