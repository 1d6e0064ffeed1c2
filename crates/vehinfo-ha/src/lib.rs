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

//! Home Assistant side of VehInfo: REST states, WebSocket registries and
//! resolution of a vehicle's telemetry entities.

pub mod client;
pub mod errors;
pub mod latest;
pub mod registry;
pub mod resolver;
pub mod roles;
pub mod state;
pub mod types;

pub use client::HomeAssistantClient;
pub use errors::{HaError, HaResult};
pub use latest::{LatestRequest, RequestTicket, VehicleEntityTracker};
pub use registry::{EntityRegistry, RegistryClient};
pub use resolver::EntityResolver;
pub use roles::{ROLE_CATALOG, Role, RoleMap, RoleRule, match_roles};
pub use state::{StateSnapshot, StateStore};
pub use types::{DeviceEntry, HaEntityState, RegistryEntity};
