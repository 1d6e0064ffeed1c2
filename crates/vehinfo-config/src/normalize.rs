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

//! Config normalizer: upgrades any historical configuration to the current
//! schema.
//!
//! Rules run in a fixed order and each consumes only its own legacy keys.
//! Later rules never read legacy fields written by earlier ones; they only
//! share the `extra_configs` container. The button order reconciliation runs
//! on every pass, so `normalize` applied to its own output changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::access::{as_bool, as_height, object_entry, string_items};
use crate::button_order;
use crate::catalog::{
    ADDED_CARDS, ADDED_CARD_BUTTON, ADDED_CARD_CARDS, BUTTON_CARD_PROPS, BUTTON_FIELD,
    BUTTON_GRID, BUTTON_GRID_DROPPED, BUTTON_ORDER, CARD_TYPE_CUSTOM, CARD_TYPE_DEFAULT,
    CARD_TYPE_FIELD, CUSTOM_BUTTONS, CUSTOM_CARD_FIELD, DEFAULT_BUTTONS, EXTRA_CONFIGS,
    EXTRA_CONFIG_MAP_PROPS, HIDE_FIELD, LEGACY_BUTTON_GRID, LEGACY_SELECTED_THEME,
    LEGACY_SERVICES, LEGACY_SERVICES_ENABLED, MINI_MAP, MapConversion, MapProp, SECTION_ORDER,
    SERVICES_CONFIG, SERVICES_ENABLED_FIELD, SERVICES_ITEMS_FIELD, SHOW_COSMETIC_PROPS,
    SHOW_SECTION_PROPS, THEME_CONFIG, TOP_LEVEL_MAP_PROPS, USE_CUSTOM_CARDS, is_known_service,
};
use crate::changelog::{ChangeLog, MigrationRule};
use crate::flags::{MigrationFlags, detect_map};
use crate::section::SectionOrder;

/// Verbatim copy of a configuration taken before migration, kept so the
/// user can revert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySnapshot {
    pub taken_at: DateTime<Utc>,
    pub flags: MigrationFlags,
    pub config: Value,
}

impl LegacySnapshot {
    fn capture(config: &Value, flags: MigrationFlags) -> Self {
        Self {
            taken_at: Utc::now(),
            flags,
            config: config.clone(),
        }
    }
}

/// Result of one normalization pass
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    pub config: Value,
    pub flags: MigrationFlags,
    pub changes: ChangeLog,
    /// Present when any legacy shape was found
    pub legacy_snapshot: Option<LegacySnapshot>,
}

impl NormalizeOutcome {
    pub fn migrated(&self) -> bool {
        self.legacy_snapshot.is_some()
    }
}

/// Upgrade `config` to the current schema.
///
/// Never fails. The input is left untouched and a new object is returned.
pub fn normalize(config: &Value) -> NormalizeOutcome {
    let Some(source) = config.as_object() else {
        warn!("⚠️ [MIGRATE] Config root is not an object, leaving it untouched");
        return NormalizeOutcome {
            config: config.clone(),
            flags: MigrationFlags::default(),
            changes: ChangeLog::default(),
            legacy_snapshot: None,
        };
    };

    let flags = detect_map(source);
    let mut target = source.clone();
    let mut changes = ChangeLog::default();

    if flags.has_legacy_default_button {
        migrate_button_cards(&mut target, &mut changes);
    }
    if flags.has_legacy_custom_button {
        migrate_custom_buttons(&mut target, &mut changes);
    }
    if flags.has_legacy_map_config {
        migrate_map(&mut target, &mut changes);
    }
    if flags.has_legacy_show_section_props {
        migrate_show_props(&mut target, &mut changes);
    }
    if flags.has_legacy_button_grid_config {
        migrate_button_grid(&mut target, &mut changes);
    }
    if flags.has_legacy_selected_theme_config {
        migrate_theme(&mut target, &mut changes);
    }
    if flags.has_legacy_services_config {
        migrate_services(&mut target, &mut changes);
    }
    if flags.has_not_button_order {
        button_order::bootstrap(&mut target, &mut changes);
    }
    button_order::reconcile_in_place(&mut target, &mut changes);
    reconcile_section_order(&mut target, &mut changes);

    let legacy_snapshot = flags.any().then(|| LegacySnapshot::capture(config, flags));
    if !changes.is_empty() {
        info!(
            "✅ [MIGRATE] Normalized config: {} change(s), legacy shapes found: {}",
            changes.len(),
            flags.any()
        );
    }

    NormalizeOutcome {
        config: Value::Object(target),
        flags,
        changes,
        legacy_snapshot,
    }
}

// ============= Always: section order =============

/// Drop duplicate and unknown section identifiers from a stored order.
///
/// A stored value that is not an array is removed, which restores the
/// canonical order.
fn reconcile_section_order(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    const RULE: MigrationRule = MigrationRule::SectionOrderReconcile;

    let Some(Value::Object(extra)) = config.get_mut(EXTRA_CONFIGS) else {
        return;
    };
    let Some(stored) = extra.get(SECTION_ORDER) else {
        return;
    };

    match SectionOrder::from_value(stored) {
        Some(order) => {
            let cleaned = order.to_value();
            if &cleaned != stored {
                changes.record(RULE, format!("{SECTION_ORDER} {stored} -> {cleaned}"));
                extra.insert(SECTION_ORDER.to_owned(), cleaned);
            }
        }
        None => {
            if let Some(stored) = extra.remove(SECTION_ORDER) {
                changes.discard(RULE, SECTION_ORDER, &stored);
            }
        }
    }
}

// ============= Rule 1: built-in button cards =============

fn migrate_button_cards(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    const RULE: MigrationRule = MigrationRule::ButtonCards;

    let mut use_custom = match config.remove(USE_CUSTOM_CARDS) {
        Some(Value::Object(bag)) => bag,
        Some(other) => {
            changes.discard(RULE, USE_CUSTOM_CARDS, &other);
            Map::new()
        }
        None => Map::new(),
    };

    for props in &BUTTON_CARD_PROPS {
        let button = match config.remove(props.button_key) {
            Some(Value::Object(button)) => Some(button),
            Some(other) => {
                changes.discard(RULE, props.button_key, &other);
                None
            }
            None => None,
        };
        let cards = match config.remove(props.card_key) {
            Some(Value::Array(cards)) => Some(cards),
            Some(other) => {
                changes.discard(RULE, props.card_key, &other);
                None
            }
            None => None,
        };
        let use_custom_card = match use_custom.remove(props.default_key) {
            Some(flag) => {
                let parsed = as_bool(&flag);
                if parsed.is_none() {
                    changes.discard(RULE, props.default_key, &flag);
                }
                parsed
            }
            None => None,
        };

        if button.is_none() && cards.is_none() && use_custom_card.is_none() {
            continue;
        }

        let entry = object_entry(object_entry(config, DEFAULT_BUTTONS), props.default_key);
        if let Some(button) = button {
            let target = object_entry(entry, BUTTON_FIELD);
            for (key, value) in button {
                target.insert(key, value);
            }
        }
        if let Some(cards) = cards {
            entry.insert(CUSTOM_CARD_FIELD.to_owned(), Value::Array(cards));
        }
        match use_custom_card {
            Some(true) => {
                entry.insert(CARD_TYPE_FIELD.to_owned(), Value::from(CARD_TYPE_CUSTOM));
            }
            Some(false) => {
                entry.insert(CARD_TYPE_FIELD.to_owned(), Value::from(CARD_TYPE_DEFAULT));
            }
            None => {
                entry
                    .entry(CARD_TYPE_FIELD)
                    .or_insert_with(|| Value::from(CARD_TYPE_DEFAULT));
            }
        }

        changes.record(
            RULE,
            format!("{} button/card settings -> default_buttons.{}", props.family, props.default_key),
        );
    }

    for (key, value) in use_custom {
        changes.discard(RULE, &format!("{USE_CUSTOM_CARDS}.{key}"), &value);
    }
}

// ============= Rule 2: user-added buttons =============

fn migrate_custom_buttons(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    const RULE: MigrationRule = MigrationRule::CustomButtons;

    let added = match config.remove(ADDED_CARDS) {
        Some(Value::Object(added)) => added,
        Some(other) => {
            changes.discard(RULE, ADDED_CARDS, &other);
            return;
        }
        None => return,
    };

    for (key, entry) in added {
        let mut entry = match entry {
            Value::Object(entry) => entry,
            other => {
                changes.discard(RULE, &format!("{ADDED_CARDS}.{key}"), &other);
                continue;
            }
        };

        let mut button = match entry.remove(ADDED_CARD_BUTTON) {
            Some(Value::Object(button)) => button,
            Some(other) => {
                changes.discard(RULE, &format!("{ADDED_CARDS}.{key}.{ADDED_CARD_BUTTON}"), &other);
                Map::new()
            }
            None => Map::new(),
        };
        let cards = match entry.remove(ADDED_CARD_CARDS) {
            Some(Value::Array(cards)) => cards,
            Some(other) => {
                changes.discard(RULE, &format!("{ADDED_CARDS}.{key}.{ADDED_CARD_CARDS}"), &other);
                Vec::new()
            }
            None => Vec::new(),
        };
        let hide = button
            .remove(HIDE_FIELD)
            .and_then(|hide| as_bool(&hide))
            .unwrap_or(false);

        let target = object_entry(object_entry(config, CUSTOM_BUTTONS), &key);
        // Anything else stored next to the button travels along unchanged
        for (field, value) in entry {
            target.insert(field, value);
        }
        target.insert(BUTTON_FIELD.to_owned(), Value::Object(button));
        target.insert(CARD_TYPE_FIELD.to_owned(), Value::from(CARD_TYPE_CUSTOM));
        target.insert(CUSTOM_CARD_FIELD.to_owned(), Value::Array(cards));
        target.insert(HIDE_FIELD.to_owned(), Value::Bool(hide));

        changes.record(RULE, format!("added_cards.{key} -> custom_buttons.{key}"));
    }
}

// ============= Rule 3: map =============

fn migrate_map(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    let mut mini_map = match config.remove(MINI_MAP) {
        Some(Value::Object(existing)) => existing,
        Some(other) => {
            changes.discard(MigrationRule::MiniMap, MINI_MAP, &other);
            Map::new()
        }
        None => Map::new(),
    };

    // Nested bag first so the top-level keys win on conflict
    if let Some(Value::Object(extra)) = config.get_mut(EXTRA_CONFIGS) {
        for prop in &EXTRA_CONFIG_MAP_PROPS {
            if let Some(value) = extra.remove(prop.legacy) {
                let origin = format!("{EXTRA_CONFIGS}.{}", prop.legacy);
                apply_map_prop(prop, &origin, value, &mut mini_map, changes);
            }
        }
    }
    for prop in &TOP_LEVEL_MAP_PROPS {
        if let Some(value) = config.remove(prop.legacy) {
            apply_map_prop(prop, prop.legacy, value, &mut mini_map, changes);
        }
    }

    if !mini_map.is_empty() {
        config.insert(MINI_MAP.to_owned(), Value::Object(mini_map));
    }
}

fn apply_map_prop(
    prop: &MapProp,
    origin: &str,
    value: Value,
    mini_map: &mut Map<String, Value>,
    changes: &mut ChangeLog,
) {
    const RULE: MigrationRule = MigrationRule::MiniMap;

    match prop.conversion {
        MapConversion::Verbatim => {
            mini_map.insert(prop.target.to_owned(), value);
            changes.record(RULE, format!("{origin} -> {MINI_MAP}.{}", prop.target));
        }
        MapConversion::InvertBool => match as_bool(&value) {
            Some(flag) => {
                mini_map.insert(prop.target.to_owned(), Value::Bool(!flag));
                changes.record(RULE, format!("{origin} -> {MINI_MAP}.{} (inverted)", prop.target));
            }
            None => changes.discard(RULE, origin, &value),
        },
        MapConversion::Height => match as_height(&value) {
            Some(height) => {
                mini_map.insert(prop.target.to_owned(), Value::from(height));
                changes.record(RULE, format!("{origin} -> {MINI_MAP}.{} = {height}", prop.target));
            }
            None => changes.discard(RULE, origin, &value),
        },
        MapConversion::Flatten => match value {
            Value::Object(fields) => {
                for (key, field) in fields {
                    debug!("   {origin}.{key} -> {MINI_MAP}.{key}");
                    mini_map.insert(key, field);
                }
                changes.record(RULE, format!("{origin} flattened into {MINI_MAP}"));
            }
            other => changes.discard(RULE, origin, &other),
        },
    }
}

// ============= Rule 4: visibility flags =============

fn migrate_show_props(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    const RULE: MigrationRule = MigrationRule::SectionVisibility;

    let mut order = config
        .get(EXTRA_CONFIGS)
        .and_then(|extra| extra.get(SECTION_ORDER))
        .and_then(SectionOrder::from_value)
        .unwrap_or_default();
    let mut order_touched = false;

    for prop in &SHOW_SECTION_PROPS {
        let Some(value) = config.remove(prop.legacy) else {
            continue;
        };
        match as_bool(&value) {
            Some(visible) => {
                order.set_visible(prop.section, visible);
                order_touched = true;
                changes.record(
                    RULE,
                    format!(
                        "{} = {visible} -> {} {} section_order",
                        prop.legacy,
                        prop.section,
                        if visible { "in" } else { "removed from" }
                    ),
                );
            }
            None => changes.discard(RULE, prop.legacy, &value),
        }
    }

    let mut cosmetic = Vec::new();
    for prop in &SHOW_COSMETIC_PROPS {
        let Some(value) = config.remove(prop.legacy) else {
            continue;
        };
        let converted = if prop.invert {
            as_bool(&value).map(|flag| Value::Bool(!flag))
        } else {
            Some(value.clone())
        };
        match converted {
            Some(converted) => {
                changes.record(RULE, format!("{} -> {EXTRA_CONFIGS}.{}", prop.legacy, prop.target));
                cosmetic.push((prop.target, converted));
            }
            None => changes.discard(RULE, prop.legacy, &value),
        }
    }

    if !order_touched && cosmetic.is_empty() {
        return;
    }
    let extra = object_entry(config, EXTRA_CONFIGS);
    if order_touched {
        extra.insert(SECTION_ORDER.to_owned(), order.to_value());
    }
    for (target, value) in cosmetic {
        extra.insert(target.to_owned(), value);
    }
}

// ============= Rule 5: button grid =============

fn migrate_button_grid(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    const RULE: MigrationRule = MigrationRule::ButtonGrid;

    let mut legacy = match config.remove(LEGACY_BUTTON_GRID) {
        Some(Value::Object(grid)) => grid,
        Some(other) => {
            changes.discard(RULE, LEGACY_BUTTON_GRID, &other);
            return;
        }
        None => return,
    };

    for dropped in BUTTON_GRID_DROPPED {
        if legacy.remove(dropped).is_some() {
            changes.record(RULE, format!("dropped {LEGACY_BUTTON_GRID}.{dropped} (now per button)"));
        }
    }

    let grid = object_entry(object_entry(config, EXTRA_CONFIGS), BUTTON_GRID);
    for (key, value) in legacy {
        if key == BUTTON_ORDER && grid.contains_key(BUTTON_ORDER) {
            continue;
        }
        grid.insert(key, value);
    }
    changes.record(RULE, format!("{LEGACY_BUTTON_GRID} -> {EXTRA_CONFIGS}.{BUTTON_GRID}"));
}

// ============= Rule 6: theme =============

fn migrate_theme(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    if let Some(theme) = config.remove(LEGACY_SELECTED_THEME) {
        object_entry(config, EXTRA_CONFIGS).insert(THEME_CONFIG.to_owned(), theme);
        changes.record(
            MigrationRule::Theme,
            format!("{LEGACY_SELECTED_THEME} -> {EXTRA_CONFIGS}.{THEME_CONFIG}"),
        );
    }
}

// ============= Rule 7: services =============

fn migrate_services(config: &mut Map<String, Value>, changes: &mut ChangeLog) {
    const RULE: MigrationRule = MigrationRule::Services;

    let enabled = match config.remove(LEGACY_SERVICES_ENABLED) {
        Some(value) => {
            let parsed = as_bool(&value);
            if parsed.is_none() {
                changes.discard(RULE, LEGACY_SERVICES_ENABLED, &value);
            }
            parsed
        }
        None => None,
    };
    let services = match config.remove(LEGACY_SERVICES) {
        Some(Value::Object(services)) => services,
        Some(other) => {
            changes.discard(RULE, LEGACY_SERVICES, &other);
            Map::new()
        }
        None => Map::new(),
    };

    let services_config = object_entry(object_entry(config, EXTRA_CONFIGS), SERVICES_CONFIG);
    let mut items = services_config
        .get(SERVICES_ITEMS_FIELD)
        .and_then(string_items)
        .unwrap_or_default();

    for (service, flag) in &services {
        if !is_known_service(service) {
            debug!("   Skipping unknown service '{service}'");
            continue;
        }
        if as_bool(flag) == Some(true) && !items.contains(service) {
            items.push(service.clone());
        }
    }

    match enabled {
        Some(enabled) => {
            services_config.insert(SERVICES_ENABLED_FIELD.to_owned(), Value::Bool(enabled));
        }
        None => {
            services_config
                .entry(SERVICES_ENABLED_FIELD)
                .or_insert(Value::Bool(false));
        }
    }
    services_config.insert(
        SERVICES_ITEMS_FIELD.to_owned(),
        Value::Array(items.iter().cloned().map(Value::String).collect()),
    );

    changes.record(
        RULE,
        format!(
            "services -> {EXTRA_CONFIGS}.{SERVICES_CONFIG} (items: [{}])",
            items.join(", ")
        ),
    );
}
