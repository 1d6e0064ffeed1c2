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

//! Telemetry roles and the naming rules that bind them to registry entities.

use crate::types::RegistryEntity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Semantic telemetry category a dashboard widget reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Odometer,
    FuelLevel,
    RangeLiquid,
    RangeElectric,
    Soc,
    MaxSoc,
    ChargingPower,
    AverageSpeedStart,
    AverageSpeedReset,
    DistanceStart,
    DistanceReset,
    #[serde(rename = "distanceZEStart")]
    DistanceZeStart,
    #[serde(rename = "distanceZEReset")]
    DistanceZeReset,
    DrivenTimeStart,
    DrivenTimeReset,
    #[serde(rename = "drivenTimeZEStart")]
    DrivenTimeZeStart,
    #[serde(rename = "drivenTimeZEReset")]
    DrivenTimeZeReset,
    LiquidConsumptionStart,
    LiquidConsumptionReset,
    ElectricConsumptionStart,
    ElectricConsumptionReset,
    LockSensor,
    Lock,
    WindowsClosed,
    ParkBrake,
    IgnitionState,
    StarterBatteryState,
    PrecondStatus,
    #[serde(rename = "chargeFlapDCStatus")]
    ChargeFlapDcStatus,
    SunroofStatus,
    AuxheatStatus,
    DeviceTracker,
    TirePressureWarning,
    LowCoolantLevel,
    LowBrakeFluid,
    LowWashWater,
    TirePressureFrontLeft,
    TirePressureFrontRight,
    TirePressureRearLeft,
    TirePressureRearRight,
    EcoScoreBonusRange,
    EcoScoreAcceleration,
    EcoScoreConstant,
    EcoScoreFreeWheel,
}

impl Role {
    /// Key used for the role in serialized role maps
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Odometer => "odometer",
            Self::FuelLevel => "fuelLevel",
            Self::RangeLiquid => "rangeLiquid",
            Self::RangeElectric => "rangeElectric",
            Self::Soc => "soc",
            Self::MaxSoc => "maxSoc",
            Self::ChargingPower => "chargingPower",
            Self::AverageSpeedStart => "averageSpeedStart",
            Self::AverageSpeedReset => "averageSpeedReset",
            Self::DistanceStart => "distanceStart",
            Self::DistanceReset => "distanceReset",
            Self::DistanceZeStart => "distanceZEStart",
            Self::DistanceZeReset => "distanceZEReset",
            Self::DrivenTimeStart => "drivenTimeStart",
            Self::DrivenTimeReset => "drivenTimeReset",
            Self::DrivenTimeZeStart => "drivenTimeZEStart",
            Self::DrivenTimeZeReset => "drivenTimeZEReset",
            Self::LiquidConsumptionStart => "liquidConsumptionStart",
            Self::LiquidConsumptionReset => "liquidConsumptionReset",
            Self::ElectricConsumptionStart => "electricConsumptionStart",
            Self::ElectricConsumptionReset => "electricConsumptionReset",
            Self::LockSensor => "lockSensor",
            Self::Lock => "lock",
            Self::WindowsClosed => "windowsClosed",
            Self::ParkBrake => "parkBrake",
            Self::IgnitionState => "ignitionState",
            Self::StarterBatteryState => "starterBatteryState",
            Self::PrecondStatus => "precondStatus",
            Self::ChargeFlapDcStatus => "chargeFlapDCStatus",
            Self::SunroofStatus => "sunroofStatus",
            Self::AuxheatStatus => "auxheatStatus",
            Self::DeviceTracker => "deviceTracker",
            Self::TirePressureWarning => "tirePressureWarning",
            Self::LowCoolantLevel => "lowCoolantLevel",
            Self::LowBrakeFluid => "lowBrakeFluid",
            Self::LowWashWater => "lowWashWater",
            Self::TirePressureFrontLeft => "tirePressureFrontLeft",
            Self::TirePressureFrontRight => "tirePressureFrontRight",
            Self::TirePressureRearLeft => "tirePressureRearLeft",
            Self::TirePressureRearRight => "tirePressureRearRight",
            Self::EcoScoreBonusRange => "ecoScoreBonusRange",
            Self::EcoScoreAcceleration => "ecoScoreAcceleration",
            Self::EcoScoreConstant => "ecoScoreConstant",
            Self::EcoScoreFreeWheel => "ecoScoreFreeWheel",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role -> entity id. Roles without a matching entity are absent.
pub type RoleMap = BTreeMap<Role, String>;

/// How a role is recognised among the device's entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRule {
    /// `unique_id` ends with `suffix`, and `entity_id` starts with `prefix` when one is given
    Suffix {
        prefix: Option<&'static str>,
        suffix: &'static str,
    },
    /// `original_name` equals the given name exactly
    OriginalName(&'static str),
}

impl RoleRule {
    pub fn matches(self, entity: &RegistryEntity) -> bool {
        match self {
            Self::Suffix { prefix, suffix } => {
                let unique_ok = entity
                    .unique_id
                    .as_deref()
                    .is_some_and(|id| id.ends_with(suffix));
                let prefix_ok = prefix.is_none_or(|p| entity.entity_id.starts_with(p));
                unique_ok && prefix_ok
            }
            Self::OriginalName(name) => entity.original_name.as_deref() == Some(name),
        }
    }
}

const fn sensor(suffix: &'static str) -> RoleRule {
    RoleRule::Suffix {
        prefix: Some("sensor."),
        suffix,
    }
}

const fn binary_sensor(suffix: &'static str) -> RoleRule {
    RoleRule::Suffix {
        prefix: Some("binary_sensor."),
        suffix,
    }
}

const fn any_domain(suffix: &'static str) -> RoleRule {
    RoleRule::Suffix {
        prefix: None,
        suffix,
    }
}

/// Every role with its rule, in resolution order
pub const ROLE_CATALOG: &[(Role, RoleRule)] = &[
    (Role::Odometer, sensor("_odometer")),
    (Role::FuelLevel, sensor("_fuellevelpercent")),
    (Role::RangeLiquid, sensor("_rangeliquid")),
    (Role::RangeElectric, sensor("_rangeelectrickm")),
    (Role::Soc, RoleRule::OriginalName("State of Charge")),
    (Role::MaxSoc, RoleRule::OriginalName("Max State of Charge")),
    (Role::ChargingPower, sensor("_chargingpowerkw")),
    (Role::AverageSpeedStart, any_domain("_averagespeedstart")),
    (Role::AverageSpeedReset, any_domain("_averagespeedreset")),
    (Role::DistanceStart, any_domain("_distancestart")),
    (Role::DistanceReset, any_domain("_distancereset")),
    (Role::DistanceZeStart, any_domain("_distancezestart")),
    (Role::DistanceZeReset, any_domain("_distancezereset")),
    (Role::DrivenTimeStart, any_domain("_driventimestart")),
    (Role::DrivenTimeReset, any_domain("_driventimereset")),
    (Role::DrivenTimeZeStart, any_domain("_driventimezestart")),
    (Role::DrivenTimeZeReset, any_domain("_driventimezereset")),
    (Role::LiquidConsumptionStart, any_domain("_liquidconsumptionstart")),
    (Role::LiquidConsumptionReset, any_domain("_liquidconsumptionreset")),
    (Role::ElectricConsumptionStart, any_domain("_electricconsumptionstart")),
    (Role::ElectricConsumptionReset, any_domain("_electricconsumptionreset")),
    (Role::LockSensor, sensor("_lock")),
    (
        Role::Lock,
        RoleRule::Suffix {
            prefix: Some("lock."),
            suffix: "_lock",
        },
    ),
    (Role::WindowsClosed, binary_sensor("_windowsclosed")),
    (Role::ParkBrake, binary_sensor("_parkbrakestatus")),
    (Role::IgnitionState, sensor("_ignitionstate")),
    (Role::StarterBatteryState, sensor("_starterbatterystate")),
    (Role::PrecondStatus, binary_sensor("_precondstatus")),
    (Role::ChargeFlapDcStatus, any_domain("_chargeflapdcstatus")),
    (Role::SunroofStatus, sensor("_sunroofstatus")),
    (Role::AuxheatStatus, binary_sensor("_auxheatstatus")),
    (
        Role::DeviceTracker,
        RoleRule::Suffix {
            prefix: Some("device_tracker."),
            suffix: "_devicetracker",
        },
    ),
    (Role::TirePressureWarning, binary_sensor("_tirewarninglamp")),
    (Role::LowCoolantLevel, binary_sensor("_liquidlevelcoolant")),
    (Role::LowBrakeFluid, binary_sensor("_brakefluidwarning")),
    (Role::LowWashWater, binary_sensor("_washwaterwarning")),
    (Role::TirePressureFrontLeft, sensor("_tirepressurefrontleft")),
    (Role::TirePressureFrontRight, sensor("_tirepressurefrontright")),
    (Role::TirePressureRearLeft, sensor("_tirepressurerearleft")),
    (Role::TirePressureRearRight, sensor("_tirepressurerearright")),
    (Role::EcoScoreBonusRange, sensor("_ecoscorebonusrange")),
    (Role::EcoScoreAcceleration, sensor("_ecoscoreaccel")),
    (Role::EcoScoreConstant, sensor("_ecoscoreconst")),
    (Role::EcoScoreFreeWheel, sensor("_ecoscorefreewhl")),
];

/// Look up the rule for one role
pub fn rule_for(role: Role) -> Option<RoleRule> {
    ROLE_CATALOG
        .iter()
        .find(|(candidate, _)| *candidate == role)
        .map(|(_, rule)| *rule)
}

/// Bind every catalog role to the first candidate satisfying its rule.
///
/// Candidates are scanned in the order given, so when several entities
/// satisfy the same rule the earliest one in registry order wins.
pub fn match_roles<'a>(candidates: impl IntoIterator<Item = &'a RegistryEntity>) -> RoleMap {
    let candidates: Vec<&RegistryEntity> = candidates.into_iter().collect();
    let mut roles = RoleMap::new();

    for (role, rule) in ROLE_CATALOG {
        if let Some(entity) = candidates.iter().find(|entity| rule.matches(entity)) {
            debug!("🔗 [ROLE] {} -> {}", role, entity.entity_id);
            roles.insert(*role, entity.entity_id.clone());
        }
    }

    roles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(entity_id: &str, unique_id: &str) -> RegistryEntity {
        RegistryEntity {
            entity_id: entity_id.to_owned(),
            device_id: Some("dev1".to_owned()),
            original_name: None,
            unique_id: Some(unique_id.to_owned()),
            platform: Some("mbapi2020".to_owned()),
            disabled_by: None,
            hidden_by: None,
        }
    }

    #[test]
    fn test_catalog_covers_every_role_once() {
        let mut seen = std::collections::BTreeSet::new();
        for (role, _) in ROLE_CATALOG {
            assert!(seen.insert(*role), "duplicate rule for {role}");
        }
        assert_eq!(seen.len(), 44);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for (role, _) in ROLE_CATALOG {
            let json = serde_json::to_value(role).unwrap();
            assert_eq!(json, serde_json::Value::String(role.as_str().to_owned()));
        }
    }

    #[test]
    fn test_lock_prefix_separates_sensor_and_lock() {
        let entities = [
            entity("sensor.car_lock", "WDD_lock"),
            entity("lock.car_lock", "WDD_lock"),
        ];
        let roles = match_roles(&entities);

        assert_eq!(roles.get(&Role::LockSensor).map(String::as_str), Some("sensor.car_lock"));
        assert_eq!(roles.get(&Role::Lock).map(String::as_str), Some("lock.car_lock"));
    }

    #[test]
    fn test_soc_matches_original_name_only() {
        let mut soc = entity("sensor.car_soc", "WDD_soc");
        soc.original_name = Some("State of Charge".to_owned());
        let mut max_soc = entity("sensor.car_max_soc", "WDD_max_soc");
        max_soc.original_name = Some("Max State of Charge".to_owned());
        let mut lookalike = entity("sensor.car_soc_pct", "WDD_soc_pct");
        lookalike.original_name = Some("state of charge".to_owned());

        let roles = match_roles([&lookalike, &max_soc, &soc]);

        assert_eq!(roles.get(&Role::Soc).map(String::as_str), Some("sensor.car_soc"));
        assert_eq!(roles.get(&Role::MaxSoc).map(String::as_str), Some("sensor.car_max_soc"));
    }

    #[test]
    fn test_first_match_in_order_wins() {
        let entities = [
            entity("sensor.first_odometer", "A_odometer"),
            entity("sensor.second_odometer", "B_odometer"),
        ];
        let roles = match_roles(&entities);
        assert_eq!(roles.get(&Role::Odometer).map(String::as_str), Some("sensor.first_odometer"));

        let roles = match_roles(entities.iter().rev());
        assert_eq!(roles.get(&Role::Odometer).map(String::as_str), Some("sensor.second_odometer"));
    }

    #[test]
    fn test_missing_unique_id_never_matches_suffix() {
        let mut odometer = entity("sensor.car_odometer", "x");
        odometer.unique_id = None;
        assert!(match_roles([&odometer]).is_empty());
        assert_eq!(rule_for(Role::Odometer), Some(sensor("_odometer")));
    }
}
