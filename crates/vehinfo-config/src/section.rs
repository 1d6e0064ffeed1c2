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

//! Render sections and their ordering.
//!
//! The section order doubles as the visibility list: a section missing from
//! the list is hidden.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Independently orderable region of the rendered card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    HeaderInfo,
    ImagesSlider,
    MiniMap,
    Buttons,
}

impl SectionId {
    /// Canonical render order, used when no order has been configured
    pub const ALL: [SectionId; 4] = [
        SectionId::HeaderInfo,
        SectionId::ImagesSlider,
        SectionId::MiniMap,
        SectionId::Buttons,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::HeaderInfo => "header_info",
            Self::ImagesSlider => "images_slider",
            Self::MiniMap => "mini_map",
            Self::Buttons => "buttons",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|section| section.as_str() == raw)
    }

    fn canonical_rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|section| *section == self)
            .unwrap_or(Self::ALL.len())
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered, duplicate-free list of visible sections
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionOrder(Vec<SectionId>);

impl Default for SectionOrder {
    fn default() -> Self {
        Self(SectionId::ALL.to_vec())
    }
}

impl SectionOrder {
    pub fn new(sections: impl IntoIterator<Item = SectionId>) -> Self {
        let mut order = Self(Vec::new());
        for section in sections {
            if !order.contains(section) {
                order.0.push(section);
            }
        }
        order
    }

    /// Read an order from a stored JSON array.
    ///
    /// Unknown identifiers and duplicates are skipped; anything that is not an
    /// array yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let items = value.as_array()?;
        Some(Self::new(
            items
                .iter()
                .filter_map(Value::as_str)
                .filter_map(SectionId::parse),
        ))
    }

    pub fn to_value(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|section| Value::String(section.as_str().to_owned()))
                .collect(),
        )
    }

    pub fn as_slice(&self) -> &[SectionId] {
        &self.0
    }

    pub fn contains(&self, section: SectionId) -> bool {
        self.0.contains(&section)
    }

    pub fn remove(&mut self, section: SectionId) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| *existing != section);
        before != self.0.len()
    }

    /// Insert a section at its canonical position relative to the sections
    /// already present. Returns false when it was already visible.
    pub fn insert(&mut self, section: SectionId) -> bool {
        if self.contains(section) {
            return false;
        }
        let rank = section.canonical_rank();
        let index = self
            .0
            .iter()
            .position(|existing| existing.canonical_rank() > rank)
            .unwrap_or(self.0.len());
        self.0.insert(index, section);
        true
    }

    pub fn set_visible(&mut self, section: SectionId, visible: bool) -> bool {
        if visible {
            self.insert(section)
        } else {
            self.remove(section)
        }
    }

    /// Drag-reorder: move the entry at `from` so it ends up at `to`
    pub fn move_entry(&mut self, from: usize, to: usize) -> bool {
        if from >= self.0.len() || to >= self.0.len() {
            return false;
        }
        let section = self.0.remove(from);
        self.0.insert(to, section);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_canonical() {
        let order = SectionOrder::default();
        assert_eq!(order.as_slice(), &SectionId::ALL);
    }

    #[test]
    fn test_from_value_skips_duplicates_and_unknown() {
        let order =
            SectionOrder::from_value(&json!(["buttons", "weather", "buttons", "mini_map"]))
                .unwrap();
        assert_eq!(
            order.as_slice(),
            &[SectionId::Buttons, SectionId::MiniMap]
        );
        assert!(SectionOrder::from_value(&json!("buttons")).is_none());
    }

    #[test]
    fn test_insert_uses_canonical_position() {
        let mut order = SectionOrder::new([SectionId::HeaderInfo, SectionId::Buttons]);
        assert!(order.insert(SectionId::MiniMap));
        assert_eq!(
            order.as_slice(),
            &[SectionId::HeaderInfo, SectionId::MiniMap, SectionId::Buttons]
        );
        assert!(!order.insert(SectionId::MiniMap));
    }

    #[test]
    fn test_insert_into_user_reordered_list() {
        let mut order = SectionOrder::new([SectionId::Buttons, SectionId::HeaderInfo]);
        order.insert(SectionId::ImagesSlider);
        assert_eq!(
            order.as_slice(),
            &[
                SectionId::ImagesSlider,
                SectionId::Buttons,
                SectionId::HeaderInfo
            ]
        );
    }

    #[test]
    fn test_move_entry() {
        let mut order = SectionOrder::default();
        assert!(order.move_entry(3, 0));
        assert_eq!(order.as_slice()[0], SectionId::Buttons);
        assert!(!order.move_entry(0, 9));
    }

    #[test]
    fn test_round_trip_through_json() {
        let order = SectionOrder::new([SectionId::MiniMap, SectionId::HeaderInfo]);
        assert_eq!(order.to_value(), json!(["mini_map", "header_info"]));
    }
}
