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

use crate::errors::HaResult;
use crate::registry::EntityRegistry;
use crate::roles::{RoleMap, match_roles};
use crate::state::StateStore;
use crate::types::RegistryEntity;
use std::sync::Arc;
use tracing::{debug, info};

/// Resolves a root vehicle entity into the telemetry entities of its device
#[derive(Clone)]
pub struct EntityResolver {
    registry: Arc<dyn EntityRegistry>,
    states: Arc<dyn StateStore>,
}

impl std::fmt::Debug for EntityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityResolver").finish_non_exhaustive()
    }
}

impl EntityResolver {
    pub fn new(registry: Arc<dyn EntityRegistry>, states: Arc<dyn StateStore>) -> Self {
        Self { registry, states }
    }

    /// Build the role map for the device owning `root_entity_id`.
    ///
    /// An unknown root, or one without a device, yields an empty map.
    /// Registry failures are returned as-is.
    pub async fn resolve_vehicle_entities(&self, root_entity_id: &str) -> HaResult<RoleMap> {
        let entities = self.registry.list_entities().await?;

        let Some(device_id) = entities
            .iter()
            .find(|entity| entity.entity_id == root_entity_id)
            .and_then(|root| root.device_id.as_deref())
        else {
            debug!("Root entity {} has no registry device", root_entity_id);
            return Ok(RoleMap::new());
        };

        let candidates = entities
            .iter()
            .filter(|entity| entity.device_id.as_deref() == Some(device_id))
            .filter(|entity| self.is_usable(entity));

        let roles = match_roles(candidates);
        info!(
            "✅ [RESOLVE] {} roles resolved for {} (device {})",
            roles.len(),
            root_entity_id,
            device_id
        );
        Ok(roles)
    }

    /// Model of the device owning `root_entity_id`, empty when any hop is missing
    pub async fn resolve_model_name(&self, root_entity_id: &str) -> HaResult<String> {
        let entities = self.registry.list_entities().await?;
        let Some(device_id) = entities
            .into_iter()
            .find(|entity| entity.entity_id == root_entity_id)
            .and_then(|root| root.device_id)
        else {
            return Ok(String::new());
        };

        let devices = self.registry.list_devices().await?;
        Ok(devices
            .into_iter()
            .find(|device| device.id == device_id)
            .and_then(|device| device.model)
            .unwrap_or_default())
    }

    fn is_usable(&self, entity: &RegistryEntity) -> bool {
        if entity.is_hidden() || entity.is_disabled() {
            return false;
        }
        // No live state is not the same as an unavailable one
        self.states
            .get(&entity.entity_id)
            .is_none_or(|state| state.is_available())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HaError;
    use crate::roles::Role;
    use crate::state::StateSnapshot;
    use crate::types::{DeviceEntry, HaEntityState};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeRegistry {
        entities: Vec<RegistryEntity>,
        devices: Vec<DeviceEntry>,
        fail: bool,
        entity_calls: AtomicUsize,
    }

    #[async_trait]
    impl EntityRegistry for FakeRegistry {
        async fn list_entities(&self) -> HaResult<Vec<RegistryEntity>> {
            self.entity_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HaError::WebSocket("connection refused".to_owned()));
            }
            Ok(self.entities.clone())
        }

        async fn list_devices(&self) -> HaResult<Vec<DeviceEntry>> {
            if self.fail {
                return Err(HaError::WebSocket("connection refused".to_owned()));
            }
            Ok(self.devices.clone())
        }
    }

    fn entity(entity_id: &str, device_id: Option<&str>, unique_id: &str) -> RegistryEntity {
        RegistryEntity {
            entity_id: entity_id.to_owned(),
            device_id: device_id.map(str::to_owned),
            original_name: None,
            unique_id: Some(unique_id.to_owned()),
            platform: Some("mbapi2020".to_owned()),
            disabled_by: None,
            hidden_by: None,
        }
    }

    fn live(entity_id: &str, state: &str) -> HaEntityState {
        HaEntityState {
            entity_id: entity_id.to_owned(),
            state: state.to_owned(),
            attributes: serde_json::Value::Null,
            last_changed: String::new(),
            last_updated: String::new(),
        }
    }

    fn resolver(registry: FakeRegistry, states: StateSnapshot) -> (EntityResolver, Arc<FakeRegistry>) {
        let registry = Arc::new(registry);
        let resolver = EntityResolver::new(registry.clone(), Arc::new(states));
        (resolver, registry)
    }

    fn car_entities() -> Vec<RegistryEntity> {
        vec![
            entity("sensor.car_odometer", Some("car"), "WDD123_odometer"),
            entity("lock.car_lock", Some("car"), "WDD123_lock"),
            entity("sensor.other_odometer", Some("other"), "WDD999_odometer"),
        ]
    }

    #[tokio::test]
    async fn test_unknown_root_yields_empty_map() {
        let (resolver, registry) = resolver(
            FakeRegistry {
                entities: car_entities(),
                ..FakeRegistry::default()
            },
            StateSnapshot::default(),
        );

        let roles = resolver.resolve_vehicle_entities("sensor.nonexistent").await.unwrap();
        assert!(roles.is_empty());
        assert_eq!(registry.entity_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_root_without_device_yields_empty_map() {
        let (resolver, _) = resolver(
            FakeRegistry {
                entities: vec![entity("sensor.orphan_odometer", None, "X_odometer")],
                ..FakeRegistry::default()
            },
            StateSnapshot::default(),
        );

        assert!(resolver
            .resolve_vehicle_entities("sensor.orphan_odometer")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_roles_are_scoped_to_the_root_device() {
        let (resolver, _) = resolver(
            FakeRegistry {
                entities: car_entities(),
                ..FakeRegistry::default()
            },
            StateSnapshot::default(),
        );

        let roles = resolver.resolve_vehicle_entities("sensor.car_odometer").await.unwrap();

        let expected: RoleMap = [
            (Role::Odometer, "sensor.car_odometer".to_owned()),
            (Role::Lock, "lock.car_lock".to_owned()),
        ]
        .into_iter()
        .collect();
        assert_eq!(roles, expected);
        assert!(!roles.contains_key(&Role::TirePressureFrontLeft));
    }

    #[tokio::test]
    async fn test_hidden_disabled_and_unavailable_are_skipped() {
        let mut entities = car_entities();
        entities[1].hidden_by = Some("user".to_owned());
        entities.push(entity("sensor.car_fuel", Some("car"), "WDD123_fuellevelpercent"));
        entities.push(entity("sensor.car_range", Some("car"), "WDD123_rangeliquid"));
        entities.push(entity("sensor.car_ign", Some("car"), "WDD123_ignitionstate"));
        entities[3].disabled_by = Some("integration".to_owned());

        let states = StateSnapshot::from_states([
            live("sensor.car_odometer", "12000"),
            live("sensor.car_range", "unknown"),
            live("sensor.car_ign", "4"),
        ]);
        let (resolver, _) = resolver(
            FakeRegistry {
                entities,
                ..FakeRegistry::default()
            },
            states,
        );

        let roles = resolver.resolve_vehicle_entities("sensor.car_odometer").await.unwrap();

        assert_eq!(roles.len(), 2);
        assert!(roles.contains_key(&Role::Odometer));
        assert!(roles.contains_key(&Role::IgnitionState));
        assert!(!roles.contains_key(&Role::Lock));
        assert!(!roles.contains_key(&Role::FuelLevel));
        assert!(!roles.contains_key(&Role::RangeLiquid));
    }

    #[tokio::test]
    async fn test_duplicate_matches_keep_registry_order() {
        let mut entities = car_entities();
        entities.push(entity("sensor.car_odometer_2", Some("car"), "WDD124_odometer"));
        let (resolver, _) = resolver(
            FakeRegistry {
                entities,
                ..FakeRegistry::default()
            },
            StateSnapshot::default(),
        );

        let roles = resolver.resolve_vehicle_entities("lock.car_lock").await.unwrap();
        assert_eq!(
            roles.get(&Role::Odometer).map(String::as_str),
            Some("sensor.car_odometer")
        );
    }

    #[tokio::test]
    async fn test_registry_failure_propagates() {
        let (resolver, _) = resolver(
            FakeRegistry {
                fail: true,
                ..FakeRegistry::default()
            },
            StateSnapshot::default(),
        );

        assert!(matches!(
            resolver.resolve_vehicle_entities("sensor.car_odometer").await,
            Err(HaError::WebSocket(_))
        ));
        assert!(resolver.resolve_model_name("sensor.car_odometer").await.is_err());
    }

    #[tokio::test]
    async fn test_model_name_hops() {
        let mut entities = car_entities();
        entities.push(entity("sensor.ghost", Some("gone"), "G_odometer"));
        let (resolver, _) = resolver(
            FakeRegistry {
                entities,
                devices: vec![DeviceEntry {
                    id: "car".to_owned(),
                    name: Some("Car".to_owned()),
                    name_by_user: None,
                    manufacturer: Some("Mercedes-Benz".to_owned()),
                    model: Some("EQA 250".to_owned()),
                }],
                ..FakeRegistry::default()
            },
            StateSnapshot::default(),
        );

        assert_eq!(resolver.resolve_model_name("sensor.car_odometer").await.unwrap(), "EQA 250");
        assert_eq!(resolver.resolve_model_name("sensor.ghost").await.unwrap(), "");
        assert_eq!(resolver.resolve_model_name("sensor.nope").await.unwrap(), "");
        assert_eq!(resolver.resolve_model_name("sensor.other_odometer").await.unwrap(), "");
    }
}
