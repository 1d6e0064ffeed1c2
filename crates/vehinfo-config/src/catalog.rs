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

//! Schema catalog: every deprecated field, where it lives in the current
//! schema, and how its value is converted on the way.
//!
//! Nothing in here has behavior beyond lookup. The normalizer walks these
//! tables so that each legacy key is described exactly once.

use crate::section::SectionId;

// ============= Current schema locations =============

pub const DEFAULT_BUTTONS: &str = "default_buttons";
pub const CUSTOM_BUTTONS: &str = "custom_buttons";
pub const EXTRA_CONFIGS: &str = "extra_configs";
pub const MINI_MAP: &str = "mini_map";
pub const BUTTON_GRID: &str = "button_grid";
pub const BUTTON_ORDER: &str = "button_order";
pub const SECTION_ORDER: &str = "section_order";
pub const THEME_CONFIG: &str = "theme_config";
pub const SERVICES_CONFIG: &str = "services_config";

// Fields inside a default/custom button entry
pub const BUTTON_FIELD: &str = "button";
pub const CARD_TYPE_FIELD: &str = "card_type";
pub const CUSTOM_CARD_FIELD: &str = "custom_card";
pub const HIDE_FIELD: &str = "hide";

pub const CARD_TYPE_DEFAULT: &str = "default";
pub const CARD_TYPE_CUSTOM: &str = "custom";

// ============= Button cards =============

/// Legacy keys of one built-in card family
#[derive(Debug, Clone, Copy)]
pub struct ButtonCardProps {
    pub family: &'static str,
    /// Top-level button settings object
    pub button_key: &'static str,
    /// Top-level card list
    pub card_key: &'static str,
    /// Key inside both `use_custom_cards` and `default_buttons`
    pub default_key: &'static str,
}

pub const BUTTON_CARD_PROPS: [ButtonCardProps; 4] = [
    ButtonCardProps {
        family: "trip",
        button_key: "trip_button",
        card_key: "trip_card",
        default_key: "trip_card",
    },
    ButtonCardProps {
        family: "vehicle",
        button_key: "vehicle_button",
        card_key: "vehicle_card",
        default_key: "vehicle_card",
    },
    ButtonCardProps {
        family: "eco",
        button_key: "eco_button",
        card_key: "eco_card",
        default_key: "eco_card",
    },
    ButtonCardProps {
        family: "tyre",
        button_key: "tyre_button",
        card_key: "tyre_card",
        default_key: "tyre_card",
    },
];

/// Legacy bag of per-family "use custom card" booleans
pub const USE_CUSTOM_CARDS: &str = "use_custom_cards";

// ============= Custom buttons =============

/// Legacy container of user-added cards, `{key: {button, cards}}`
pub const ADDED_CARDS: &str = "added_cards";
pub const ADDED_CARD_BUTTON: &str = "button";
pub const ADDED_CARD_CARDS: &str = "cards";

// ============= Map =============

/// How a legacy map value is carried into `mini_map`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapConversion {
    /// Copied unchanged
    Verbatim,
    /// Boolean, negated
    InvertBool,
    /// Integer pixel height from a number or numeric string
    Height,
    /// Object whose fields are lifted one level into `mini_map`
    Flatten,
}

#[derive(Debug, Clone, Copy)]
pub struct MapProp {
    pub legacy: &'static str,
    pub target: &'static str,
    pub conversion: MapConversion,
}

const fn map_prop(legacy: &'static str, target: &'static str, conversion: MapConversion) -> MapProp {
    MapProp {
        legacy,
        target,
        conversion,
    }
}

pub const MAP_POPUP_CONFIG: &str = "map_popup_config";

/// Map settings that used to live at the top level of the config
pub const TOP_LEVEL_MAP_PROPS: [MapProp; 7] = [
    map_prop("device_tracker", "device_tracker", MapConversion::Verbatim),
    map_prop("google_api_key", "google_api_key", MapConversion::Verbatim),
    map_prop("maptiler_api_key", "maptiler_api_key", MapConversion::Verbatim),
    map_prop("enable_map_popup", "enable_popup", MapConversion::Verbatim),
    map_prop("show_address", "hide_map_address", MapConversion::InvertBool),
    map_prop("mini_map_height", "map_height", MapConversion::Height),
    map_prop(MAP_POPUP_CONFIG, MAP_POPUP_CONFIG, MapConversion::Flatten),
];

/// Map settings that used to live inside `extra_configs`
pub const EXTRA_CONFIG_MAP_PROPS: [MapProp; 4] = [
    map_prop("mini_map_height", "map_height", MapConversion::Height),
    map_prop("maptiler_api_key", "maptiler_api_key", MapConversion::Verbatim),
    map_prop("show_address", "hide_map_address", MapConversion::InvertBool),
    map_prop(MAP_POPUP_CONFIG, MAP_POPUP_CONFIG, MapConversion::Flatten),
];

// ============= Show / visibility =============

#[derive(Debug, Clone, Copy)]
pub struct ShowSectionProp {
    pub legacy: &'static str,
    pub section: SectionId,
}

pub const SHOW_SECTION_PROPS: [ShowSectionProp; 4] = [
    ShowSectionProp {
        legacy: "show_header_info",
        section: SectionId::HeaderInfo,
    },
    ShowSectionProp {
        legacy: "show_slides",
        section: SectionId::ImagesSlider,
    },
    ShowSectionProp {
        legacy: "show_map",
        section: SectionId::MiniMap,
    },
    ShowSectionProp {
        legacy: "show_buttons",
        section: SectionId::Buttons,
    },
];

/// Cosmetic flag moved into `extra_configs` without touching section order
#[derive(Debug, Clone, Copy)]
pub struct CosmeticProp {
    pub legacy: &'static str,
    pub target: &'static str,
    pub invert: bool,
}

pub const SHOW_COSMETIC_PROPS: [CosmeticProp; 2] = [
    CosmeticProp {
        legacy: "show_background",
        target: "hide_background",
        invert: true,
    },
    CosmeticProp {
        legacy: "show_error_notify",
        target: "show_error_notify",
        invert: false,
    },
];

// ============= Button grid =============

pub const LEGACY_BUTTON_GRID: &str = "button_grid";

/// Grid keys now owned by each button's own config
pub const BUTTON_GRID_DROPPED: [&str; 2] = ["button_layout", "transparent"];

// ============= Theme =============

pub const LEGACY_SELECTED_THEME: &str = "selected_theme";

// ============= Services =============

/// Only a JSON boolean is carried over. Anything else, the string `"true"`
/// included, is discarded and `services_config.enabled` falls back to `false`.
pub const LEGACY_SERVICES_ENABLED: &str = "enable_services_control";
pub const LEGACY_SERVICES: &str = "services";
pub const SERVICES_ENABLED_FIELD: &str = "enabled";
pub const SERVICES_ITEMS_FIELD: &str = "items";

pub const KNOWN_SERVICES: [&str; 9] = [
    "auxheat",
    "charge",
    "doorsLock",
    "engine",
    "preheat",
    "sendRoute",
    "sigPos",
    "sunroof",
    "windows",
];

// ============= Lookups =============

pub fn section_for_show_flag(legacy: &str) -> Option<SectionId> {
    SHOW_SECTION_PROPS
        .iter()
        .find(|prop| prop.legacy == legacy)
        .map(|prop| prop.section)
}

pub fn is_known_service(key: &str) -> bool {
    KNOWN_SERVICES.contains(&key)
}

pub fn button_card_props(family: &str) -> Option<&'static ButtonCardProps> {
    BUTTON_CARD_PROPS.iter().find(|props| props.family == family)
}

/// Every top-level key the catalog considers deprecated
pub fn legacy_top_level_keys() -> impl Iterator<Item = &'static str> {
    BUTTON_CARD_PROPS
        .iter()
        .flat_map(|props| [props.button_key, props.card_key])
        .chain([USE_CUSTOM_CARDS, ADDED_CARDS])
        .chain(TOP_LEVEL_MAP_PROPS.iter().map(|prop| prop.legacy))
        .chain(SHOW_SECTION_PROPS.iter().map(|prop| prop.legacy))
        .chain(SHOW_COSMETIC_PROPS.iter().map(|prop| prop.legacy))
        .chain([
            LEGACY_BUTTON_GRID,
            LEGACY_SELECTED_THEME,
            LEGACY_SERVICES_ENABLED,
            LEGACY_SERVICES,
        ])
}
