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

//! Defensive readers for loosely typed legacy values.
//!
//! Each helper performs exactly one conversion and returns `None` when the
//! value does not have the expected shape.

use serde_json::{Map, Value};

pub(crate) fn as_bool(value: &Value) -> Option<bool> {
    value.as_bool()
}

/// Pixel height from an integer, a float (truncated) or a numeric string
pub(crate) fn as_height(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|height| height.is_finite() && *height >= 0.0)
                .map(|height| height.trunc() as u64)
        }),
        Value::String(raw) => {
            let trimmed = raw.trim().trim_end_matches("px").trim();
            trimmed.parse::<u64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|height| height.is_finite() && *height >= 0.0)
                    .map(|height| height.trunc() as u64)
            })
        }
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// String entries of an array, skipping anything else
pub(crate) fn string_items(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect()
    })
}

/// Child object at `key`, created (or replacing a non-object) when needed
pub(crate) fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_owned())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        tracing::warn!("Replacing non-object value at '{key}' with an empty object");
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(child) => child,
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) | Value::Array(_) => {
            unreachable!("slot was normalized to an object above")
        }
    }
}

pub(crate) fn nested<'a>(map: &'a Map<String, Value>, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = map.get(*first)?;
    for key in rest {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}
