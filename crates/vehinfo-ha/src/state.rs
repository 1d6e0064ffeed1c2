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

use crate::types::HaEntityState;
use std::collections::HashMap;

/// Synchronous lookup of live entity states
pub trait StateStore: Send + Sync {
    fn get(&self, entity_id: &str) -> Option<&HaEntityState>;
}

/// Point-in-time copy of the host's state machine, keyed by entity id
#[derive(Debug, Clone, Default)]
pub struct StateSnapshot {
    states: HashMap<String, HaEntityState>,
}

impl StateSnapshot {
    pub fn from_states(states: impl IntoIterator<Item = HaEntityState>) -> Self {
        Self {
            states: states
                .into_iter()
                .map(|state| (state.entity_id.clone(), state))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn insert(&mut self, state: HaEntityState) {
        self.states.insert(state.entity_id.clone(), state);
    }
}

impl StateStore for StateSnapshot {
    fn get(&self, entity_id: &str) -> Option<&HaEntityState> {
        self.states.get(entity_id)
    }
}
