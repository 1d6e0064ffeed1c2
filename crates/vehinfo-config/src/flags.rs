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
use serde_json::{Map, Value};

use crate::button_order::{eligible_button_keys, stored_button_order};
use crate::catalog::{
    ADDED_CARDS, BUTTON_CARD_PROPS, EXTRA_CONFIGS, EXTRA_CONFIG_MAP_PROPS, LEGACY_BUTTON_GRID,
    LEGACY_SELECTED_THEME, LEGACY_SERVICES, LEGACY_SERVICES_ENABLED, SHOW_COSMETIC_PROPS,
    SHOW_SECTION_PROPS, TOP_LEVEL_MAP_PROPS, USE_CUSTOM_CARDS,
};

/// Which legacy shapes are present in a configuration.
///
/// Computed fresh for every pass and never stored with the config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationFlags {
    pub has_legacy_default_button: bool,
    pub has_legacy_custom_button: bool,
    pub has_legacy_map_config: bool,
    pub has_legacy_show_section_props: bool,
    pub has_legacy_button_grid_config: bool,
    pub has_legacy_selected_theme_config: bool,
    pub has_legacy_services_config: bool,
    pub has_not_button_order: bool,
}

impl MigrationFlags {
    /// True when at least one rule has work to do
    pub fn any(&self) -> bool {
        self.has_legacy_default_button
            || self.has_legacy_custom_button
            || self.has_legacy_map_config
            || self.has_legacy_show_section_props
            || self.has_legacy_button_grid_config
            || self.has_legacy_selected_theme_config
            || self.has_legacy_services_config
            || self.has_not_button_order
    }

    pub fn is_current(&self) -> bool {
        !self.any()
    }
}

/// Inspect a configuration for deprecated shapes.
///
/// Anything that is not a JSON object has nothing to migrate.
pub fn detect(config: &Value) -> MigrationFlags {
    config.as_object().map(detect_map).unwrap_or_default()
}

pub(crate) fn detect_map(config: &Map<String, Value>) -> MigrationFlags {
    let has = |key: &str| config.contains_key(key);
    let extra = config.get(EXTRA_CONFIGS).and_then(Value::as_object);

    let has_legacy_default_button = has(USE_CUSTOM_CARDS)
        || BUTTON_CARD_PROPS
            .iter()
            .any(|props| has(props.button_key) || has(props.card_key));
    let has_legacy_custom_button = has(ADDED_CARDS);

    let has_legacy_map_config = TOP_LEVEL_MAP_PROPS.iter().any(|prop| has(prop.legacy))
        || extra.is_some_and(|extra| {
            EXTRA_CONFIG_MAP_PROPS
                .iter()
                .any(|prop| extra.contains_key(prop.legacy))
        });

    let has_legacy_show_section_props = SHOW_SECTION_PROPS.iter().any(|prop| has(prop.legacy))
        || SHOW_COSMETIC_PROPS.iter().any(|prop| has(prop.legacy));

    let has_not_button_order = stored_button_order(config).is_none()
        && (has_legacy_default_button
            || has_legacy_custom_button
            || !eligible_button_keys(config).is_empty());

    MigrationFlags {
        has_legacy_default_button,
        has_legacy_custom_button,
        has_legacy_map_config,
        has_legacy_show_section_props,
        has_legacy_button_grid_config: has(LEGACY_BUTTON_GRID),
        has_legacy_selected_theme_config: has(LEGACY_SELECTED_THEME),
        has_legacy_services_config: has(LEGACY_SERVICES_ENABLED) || has(LEGACY_SERVICES),
        has_not_button_order,
    }
}
