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

//! Keeps only the answer to the most recent resolution request.
//!
//! A resolution may still be in flight when the widget switches to another
//! vehicle. Every request takes a ticket naming the requested identifier; a
//! result whose identifier is no longer the requested one is dropped on
//! arrival. Results for the current identifier are kept, and the ticket
//! generation only stops an older one from replacing a newer one.

use crate::errors::HaResult;
use crate::resolver::EntityResolver;
use crate::roles::RoleMap;
use parking_lot::Mutex;
use tracing::debug;

/// Proof of a started request, handed back on completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    key: String,
    generation: u64,
}

impl RequestTicket {
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[derive(Debug)]
struct LatestState<T> {
    generation: u64,
    key: Option<String>,
    value: Option<T>,
    stored_generation: u64,
}

/// Result cache keyed by the requested identifier, newest request wins
#[derive(Debug)]
pub struct LatestRequest<T> {
    state: Mutex<LatestState<T>>,
}

impl<T> Default for LatestRequest<T> {
    fn default() -> Self {
        Self {
            state: Mutex::new(LatestState {
                generation: 0,
                key: None,
                value: None,
                stored_generation: 0,
            }),
        }
    }
}

impl<T: Clone> LatestRequest<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request for `key`; tickets for other keys become stale
    pub fn begin(&self, key: &str) -> RequestTicket {
        let mut state = self.state.lock();
        state.generation += 1;
        if state.key.as_deref() != Some(key) {
            state.value = None;
            state.stored_generation = 0;
        }
        state.key = Some(key.to_owned());
        RequestTicket {
            key: key.to_owned(),
            generation: state.generation,
        }
    }

    /// True while `ticket` asks for the currently requested identifier
    pub fn is_current(&self, ticket: &RequestTicket) -> bool {
        self.state.lock().key.as_deref() == Some(ticket.key.as_str())
    }

    /// Accept `value` if `ticket` still asks for the requested identifier.
    ///
    /// The value is cached unless a newer request for the same identifier
    /// already stored its result. Returns `None` when the identifier changed.
    pub fn complete(&self, ticket: &RequestTicket, value: T) -> Option<T> {
        let mut state = self.state.lock();
        if state.key.as_deref() != Some(ticket.key.as_str()) {
            debug!("Discarding stale result for {}", ticket.key);
            return None;
        }
        if ticket.generation > state.stored_generation {
            state.value = Some(value.clone());
            state.stored_generation = ticket.generation;
        }
        Some(value)
    }

    /// Completed value for `key`, if `key` is still the current request
    pub fn cached(&self, key: &str) -> Option<T> {
        let state = self.state.lock();
        if state.key.as_deref() == Some(key) {
            state.value.clone()
        } else {
            None
        }
    }

    pub fn current_key(&self) -> Option<String> {
        self.state.lock().key.clone()
    }
}

/// Role map of the currently displayed vehicle
#[derive(Debug)]
pub struct VehicleEntityTracker {
    resolver: EntityResolver,
    roles: LatestRequest<RoleMap>,
}

impl VehicleEntityTracker {
    pub fn new(resolver: EntityResolver) -> Self {
        Self {
            resolver,
            roles: LatestRequest::new(),
        }
    }

    /// Roles for `root_entity_id`, resolving only when the identifier changed.
    ///
    /// `Ok(None)` means another vehicle was requested while this one was
    /// resolving and the result was dropped. Concurrent calls for the same
    /// vehicle each get their result.
    pub async fn entities_for(&self, root_entity_id: &str) -> HaResult<Option<RoleMap>> {
        if let Some(roles) = self.roles.cached(root_entity_id) {
            return Ok(Some(roles));
        }

        let ticket = self.roles.begin(root_entity_id);
        match self.resolver.resolve_vehicle_entities(root_entity_id).await {
            Ok(roles) => Ok(self.roles.complete(&ticket, roles)),
            Err(e) if self.roles.is_current(&ticket) => Err(e),
            Err(e) => {
                debug!("Ignoring error of superseded request {}: {}", ticket.key(), e);
                Ok(None)
            }
        }
    }

    pub fn current(&self) -> Option<RoleMap> {
        let key = self.roles.current_key()?;
        self.roles.cached(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EntityRegistry;
    use crate::roles::Role;
    use crate::state::StateSnapshot;
    use crate::types::{DeviceEntry, RegistryEntity};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[test]
    fn test_stale_ticket_is_discarded() {
        let latest = LatestRequest::new();
        let first = latest.begin("a");
        let second = latest.begin("b");

        assert_eq!(latest.complete(&first, 1), None);
        assert_eq!(latest.cached("a"), None);
        assert_eq!(latest.complete(&second, 2), Some(2));
        assert_eq!(latest.cached("b"), Some(2));
        assert_eq!(latest.current_key().as_deref(), Some("b"));
    }

    #[test]
    fn test_same_key_requests_both_complete() {
        let latest = LatestRequest::new();
        let first = latest.begin("a");
        let second = latest.begin("a");

        assert!(latest.is_current(&first));
        assert_eq!(latest.complete(&second, 2), Some(2));
        assert_eq!(latest.complete(&first, 1), Some(1));
        // The older answer does not replace the newer one
        assert_eq!(latest.cached("a"), Some(2));
    }

    #[test]
    fn test_new_key_clears_previous_value() {
        let latest = LatestRequest::new();
        let ticket = latest.begin("a");
        latest.complete(&ticket, "roles-a");

        latest.begin("b");
        assert_eq!(latest.cached("a"), None);
        assert_eq!(latest.cached("b"), None);
    }

    fn odometer(entity_id: &str, device_id: &str) -> RegistryEntity {
        RegistryEntity {
            entity_id: entity_id.to_owned(),
            device_id: Some(device_id.to_owned()),
            original_name: None,
            unique_id: Some(format!("{device_id}_odometer")),
            platform: None,
            disabled_by: None,
            hidden_by: None,
        }
    }

    /// Each listing waits until the test releases it
    #[derive(Default)]
    struct GatedRegistry {
        gates: parking_lot::Mutex<VecDeque<oneshot::Receiver<Vec<RegistryEntity>>>>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EntityRegistry for GatedRegistry {
        async fn list_entities(&self) -> HaResult<Vec<RegistryEntity>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gates.lock().pop_front();
            match gate {
                Some(rx) => Ok(rx.await.unwrap_or_default()),
                None => Ok(vec![
                    odometer("sensor.a_odometer", "a"),
                    odometer("sensor.b_odometer", "b"),
                ]),
            }
        }

        async fn list_devices(&self) -> HaResult<Vec<DeviceEntry>> {
            Ok(Vec::new())
        }
    }

    fn tracker(registry: &Arc<GatedRegistry>) -> VehicleEntityTracker {
        VehicleEntityTracker::new(EntityResolver::new(
            registry.clone(),
            Arc::new(StateSnapshot::default()),
        ))
    }

    #[tokio::test]
    async fn test_superseded_resolution_is_dropped() {
        let registry = Arc::new(GatedRegistry::default());
        let (tx_a, rx_a) = oneshot::channel();
        let (tx_b, rx_b) = oneshot::channel();
        registry.gates.lock().extend([rx_a, rx_b]);
        let tracker = tracker(&registry);

        let entities = vec![
            odometer("sensor.a_odometer", "a"),
            odometer("sensor.b_odometer", "b"),
        ];
        let release = async {
            // The newer request settles before the older one
            tx_b.send(entities.clone()).unwrap();
            tokio::task::yield_now().await;
            tx_a.send(entities.clone()).unwrap();
        };

        let (first, second, ()) = tokio::join!(
            tracker.entities_for("sensor.a_odometer"),
            tracker.entities_for("sensor.b_odometer"),
            release
        );

        assert_eq!(first.unwrap(), None);
        let roles = second.unwrap().unwrap();
        assert_eq!(
            roles.get(&Role::Odometer).map(String::as_str),
            Some("sensor.b_odometer")
        );
        assert_eq!(tracker.current(), Some(roles));
    }

    #[tokio::test]
    async fn test_same_identifier_is_not_resolved_twice() {
        let registry = Arc::new(GatedRegistry::default());
        let tracker = tracker(&registry);

        let first = tracker.entities_for("sensor.a_odometer").await.unwrap();
        let again = tracker.entities_for("sensor.a_odometer").await.unwrap();
        assert_eq!(first, again);
        assert_eq!(registry.calls.load(Ordering::SeqCst), 1);

        tracker.entities_for("sensor.b_odometer").await.unwrap();
        assert_eq!(registry.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_for_same_vehicle_both_resolve() {
        let registry = Arc::new(GatedRegistry::default());
        let (tx_first, rx_first) = oneshot::channel();
        let (tx_second, rx_second) = oneshot::channel();
        registry.gates.lock().extend([rx_first, rx_second]);
        let tracker = tracker(&registry);

        let entities = vec![odometer("sensor.a_odometer", "a")];
        let release = async {
            tx_second.send(entities.clone()).unwrap();
            tokio::task::yield_now().await;
            tx_first.send(entities.clone()).unwrap();
        };

        let (first, second, ()) = tokio::join!(
            tracker.entities_for("sensor.a_odometer"),
            tracker.entities_for("sensor.a_odometer"),
            release
        );

        let first = first.unwrap().unwrap();
        let second = second.unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first.get(&Role::Odometer).map(String::as_str),
            Some("sensor.a_odometer")
        );
        assert_eq!(registry.calls.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.current(), Some(first));
    }
}
