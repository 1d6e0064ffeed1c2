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

use anyhow::{Context, Result};
use serde_json::Value;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use vehinfo_config::{ConfigSession, detect};
use vehinfo_ha::{EntityResolver, HomeAssistantClient, ROLE_CATALOG, RegistryClient, RoleRule};

use crate::config::AppConfig;

/// Serialization of a card configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Yaml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unsupported card configuration file {}, expected .json, .yaml or .yml",
                path.display()
            ),
        }
    }

    pub fn parse(self, content: &str) -> Result<Value> {
        Ok(match self {
            Self::Json => serde_json::from_str(content)?,
            Self::Yaml => serde_yaml::from_str(content)?,
        })
    }

    pub fn render(self, value: &Value) -> Result<String> {
        Ok(match self {
            Self::Json => {
                let mut text = serde_json::to_string_pretty(value)?;
                text.push('\n');
                text
            }
            Self::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

fn read_document(path: &Path) -> Result<(DocumentFormat, Value)> {
    let format = DocumentFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let value = format
        .parse(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok((format, value))
}

/// Normalize a card configuration file, optionally rewriting it
pub fn normalize_file(path: &Path, write: bool, show_changes: bool) -> Result<String> {
    let (format, raw) = read_document(path)?;

    let mut saved: Option<Value> = None;
    let (config, changes) = {
        let mut session = ConfigSession::new(|config: &Value| saved = Some(config.clone()));
        let changes = session.set_config(raw).clone();
        (session.config().clone(), changes)
    };

    if changes.is_empty() {
        info!("✅ {} is already current", path.display());
    } else {
        info!("🔧 {} change(s) applied to {}", changes.len(), path.display());
    }

    if write {
        match &saved {
            Some(config) => {
                std::fs::write(path, format.render(config)?)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("💾 Wrote {}", path.display());
            }
            None => info!("Nothing to write for {}", path.display()),
        }
    }

    if show_changes {
        let mut out = String::new();
        for entry in changes.iter() {
            writeln!(out, "{}: {}", entry.rule, entry.detail)?;
        }
        return Ok(out);
    }

    format.render(&config)
}

/// Legacy shape report of a card configuration file
pub fn detect_file(path: &Path) -> Result<String> {
    let (_, raw) = read_document(path)?;
    let flags = detect(&raw);
    if flags.is_current() {
        info!("✅ {} uses the current schema", path.display());
    }
    Ok(serde_json::to_string_pretty(&flags)?)
}

fn connect(config: &AppConfig) -> Result<(HomeAssistantClient, RegistryClient)> {
    let client = HomeAssistantClient::from_config(config.ha.base_url.clone(), config.ha.token.clone())
        .context("Failed to create Home Assistant client")?;
    let registry = RegistryClient::from_client(&client)
        .context("Failed to create registry client")?
        .with_timeout(config.registry_timeout());
    Ok((client, registry))
}

async fn resolver(config: &AppConfig) -> Result<EntityResolver> {
    let (client, registry) = connect(config)?;
    if !client.ping().await? {
        warn!("Home Assistant at {} did not answer the health check", client.base_url());
    }
    let states = client
        .state_snapshot()
        .await
        .context("Failed to fetch entity states")?;
    Ok(EntityResolver::new(Arc::new(registry), Arc::new(states)))
}

/// Role map of the vehicle owning `entity`, as JSON
pub async fn resolve_entity(config: &AppConfig, entity: &str) -> Result<String> {
    let roles = resolver(config)
        .await?
        .resolve_vehicle_entities(entity)
        .await
        .with_context(|| format!("Failed to resolve entities for {entity}"))?;

    if roles.is_empty() {
        warn!("No telemetry entities found for {}", entity);
    }
    Ok(serde_json::to_string_pretty(&roles)?)
}

/// Model of the vehicle owning `entity`
pub async fn model_name(config: &AppConfig, entity: &str) -> Result<String> {
    let (_, registry) = connect(config)?;
    let resolver = EntityResolver::new(Arc::new(registry), Arc::new(vehinfo_ha::StateSnapshot::default()));
    resolver
        .resolve_model_name(entity)
        .await
        .with_context(|| format!("Failed to look up the model of {entity}"))
}

/// Table of every role and its naming rule
pub fn describe_roles() -> String {
    let mut out = String::new();
    for (role, rule) in ROLE_CATALOG {
        let rule = match rule {
            RoleRule::Suffix {
                prefix: Some(prefix),
                suffix,
            } => format!("{prefix}* with unique id *{suffix}"),
            RoleRule::Suffix {
                prefix: None,
                suffix,
            } => format!("unique id *{suffix}"),
            RoleRule::OriginalName(name) => format!("original name \"{name}\""),
        };
        let _ = writeln!(out, "{:<26} {rule}", role.as_str());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn legacy_card() -> Value {
        json!({
            "type": "custom:vehicle-info-card",
            "entity": "sensor.car_odometer",
            "show_slides": false,
            "show_map": true,
            "services": {"windows": true},
            "enable_services_control": true
        })
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.JSON")).unwrap(), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(Path::new("a.yml")).unwrap(), DocumentFormat::Yaml);
        assert!(DocumentFormat::from_path(Path::new("a.txt")).is_err());
    }

    #[test]
    fn test_normalize_json_file_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.json");
        std::fs::write(&path, legacy_card().to_string()).unwrap();

        let printed = normalize_file(&path, true, false).unwrap();
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

        assert_eq!(serde_json::from_str::<Value>(&printed).unwrap(), written);
        assert!(written.get("show_slides").is_none());
        assert_eq!(
            written["extra_configs"]["services_config"],
            json!({"enabled": true, "items": ["windows"]})
        );
        assert_eq!(written["entity"], "sensor.car_odometer");
    }

    #[test]
    fn test_current_file_is_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.json");
        std::fs::write(&path, legacy_card().to_string()).unwrap();
        normalize_file(&path, true, false).unwrap();
        let first = std::fs::read_to_string(&path).unwrap();

        let changes = normalize_file(&path, true, true).unwrap();

        assert!(changes.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn test_normalize_yaml_reports_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.yaml");
        std::fs::write(
            &path,
            "type: custom:vehicle-info-card\nselected_theme:\n  theme: Default\n",
        )
        .unwrap();

        let changes = normalize_file(&path, false, true).unwrap();

        assert!(changes.contains("theme"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("selected_theme"));
    }

    #[test]
    fn test_detect_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.json");
        std::fs::write(&path, legacy_card().to_string()).unwrap();

        let report: Value = serde_json::from_str(&detect_file(&path).unwrap()).unwrap();

        assert_eq!(report["hasLegacyShowSectionProps"], true);
        assert_eq!(report["hasLegacyServicesConfig"], true);
        assert_eq!(report["hasLegacyButtonGridConfig"], false);
    }

    #[test]
    fn test_describe_roles_lists_catalog() {
        let table = describe_roles();
        assert_eq!(table.lines().count(), ROLE_CATALOG.len());
        assert!(table.contains("original name \"State of Charge\""));
        assert!(table.contains("lock.* with unique id *_lock"));
    }
}
