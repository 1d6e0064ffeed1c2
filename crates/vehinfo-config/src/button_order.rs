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

//! Button order bootstrap and reconciliation.
//!
//! The order lives at `extra_configs.button_grid.button_order` and may only
//! contain keys of `default_buttons` plus keys of visible `custom_buttons`.

use serde_json::{Map, Value};

use crate::access::{nested, object_entry, string_items};
use crate::catalog::{BUTTON_GRID, BUTTON_ORDER, CUSTOM_BUTTONS, DEFAULT_BUTTONS, EXTRA_CONFIGS, HIDE_FIELD};
use crate::changelog::{ChangeLog, MigrationRule};

/// Keys allowed in the button order: default buttons first, then custom
/// buttons that are not hidden, each in their configured order.
pub fn eligible_button_keys(config: &Map<String, Value>) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();

    if let Some(defaults) = config.get(DEFAULT_BUTTONS).and_then(Value::as_object) {
        keys.extend(defaults.keys().cloned());
    }

    if let Some(customs) = config.get(CUSTOM_BUTTONS).and_then(Value::as_object) {
        for (key, button) in customs {
            let hidden = button.get(HIDE_FIELD).and_then(Value::as_bool) == Some(true);
            if !hidden && !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }

    keys
}

/// Stored button order, or `None` when absent or not an array
pub fn stored_button_order(config: &Map<String, Value>) -> Option<Vec<String>> {
    nested(config, &[EXTRA_CONFIGS, BUTTON_GRID, BUTTON_ORDER]).and_then(string_items)
}

/// Merge `eligible` into `current`.
///
/// Keys that are no longer eligible (and repeats) are dropped, surviving keys
/// keep their relative order, and missing eligible keys are appended in
/// eligibility order.
pub fn reconcile(current: &[String], eligible: &[String]) -> Vec<String> {
    let mut order: Vec<String> = Vec::with_capacity(eligible.len());
    for key in current {
        if eligible.contains(key) && !order.contains(key) {
            order.push(key.clone());
        }
    }
    for key in eligible {
        if !order.contains(key) {
            order.push(key.clone());
        }
    }
    order
}

fn write_order(config: &mut Map<String, Value>, order: &[String]) {
    let grid = object_entry(object_entry(config, EXTRA_CONFIGS), BUTTON_GRID);
    grid.insert(
        BUTTON_ORDER.to_owned(),
        Value::Array(order.iter().cloned().map(Value::String).collect()),
    );
}

/// Synthesize an order when none exists yet
pub(crate) fn bootstrap(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    if stored_button_order(config).is_some() {
        return;
    }
    let eligible = eligible_button_keys(config);
    if eligible.is_empty() {
        return;
    }
    write_order(config, &eligible);
    changes.record(
        MigrationRule::ButtonOrderBootstrap,
        format!("button_order = [{}]", eligible.join(", ")),
    );
}

/// Bring the stored order back in sync with the button bags. Runs on every pass.
pub(crate) fn reconcile_in_place(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    let eligible = eligible_button_keys(config);
    let stored_value = nested(config, &[EXTRA_CONFIGS, BUTTON_GRID, BUTTON_ORDER]).cloned();
    let stored = stored_value.as_ref().and_then(string_items);

    if stored.is_none() && eligible.is_empty() {
        return;
    }

    let current = stored.unwrap_or_default();
    let reconciled = reconcile(&current, &eligible);
    let reconciled_value = Value::Array(reconciled.iter().cloned().map(Value::String).collect());
    if stored_value.as_ref() == Some(&reconciled_value) {
        return;
    }

    let added: Vec<&str> = reconciled
        .iter()
        .filter(|key| !current.contains(key))
        .map(String::as_str)
        .collect();
    let removed: Vec<&str> = current
        .iter()
        .filter(|key| !reconciled.contains(key))
        .map(String::as_str)
        .collect();

    write_order(config, &reconciled);
    changes.record(
        MigrationRule::ButtonOrderReconcile,
        format!(
            "added [{}], removed [{}]",
            added.join(", "),
            removed.join(", ")
        ),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|key| (*key).to_owned()).collect()
    }

    #[test]
    fn test_eligible_skips_hidden_custom_buttons() {
        let config = json!({
            "default_buttons": {"trip_card": {}, "eco_card": {}},
            "custom_buttons": {"garage": {"hide": false}, "secret": {"hide": true}, "charger": {}}
        });
        assert_eq!(
            eligible_button_keys(config.as_object().unwrap()),
            keys(&["trip_card", "eco_card", "garage", "charger"])
        );
    }

    #[test]
    fn test_reconcile_preserves_relative_order() {
        let current = keys(&["eco_card", "gone", "trip_card"]);
        let eligible = keys(&["trip_card", "eco_card", "garage"]);
        assert_eq!(
            reconcile(&current, &eligible),
            keys(&["eco_card", "trip_card", "garage"])
        );
    }

    #[test]
    fn test_reconcile_drops_duplicates() {
        let current = keys(&["a", "a", "b"]);
        assert_eq!(reconcile(&current, &keys(&["a", "b"])), keys(&["a", "b"]));
    }

    #[test]
    fn test_reconcile_in_place_is_stable() {
        let mut config = json!({
            "default_buttons": {"a": {}},
            "extra_configs": {"button_grid": {"button_order": ["a"]}}
        })
        .as_object()
        .cloned()
        .unwrap();
        let mut changes = ChangeLog::default();
        reconcile_in_place(&mut config, &mut changes);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_reconcile_in_place_leaves_empty_config_alone() {
        let mut config = Map::new();
        let mut changes = ChangeLog::default();
        reconcile_in_place(&mut config, &mut changes);
        assert!(config.is_empty());
        assert!(changes.is_empty());
    }

    #[test]
    fn test_malformed_order_is_rebuilt() {
        let mut config = json!({
            "default_buttons": {"a": {}},
            "extra_configs": {"button_grid": {"button_order": "a"}}
        })
        .as_object()
        .cloned()
        .unwrap();
        let mut changes = ChangeLog::default();
        reconcile_in_place(&mut config, &mut changes);
        assert_eq!(
            config["extra_configs"]["button_grid"]["button_order"],
            json!(["a"])
        );
        assert!(changes.touches(MigrationRule::ButtonOrderReconcile));
    }
}
