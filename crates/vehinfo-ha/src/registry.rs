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

//! Entity and device registry access over the Home Assistant WebSocket API.
//!
//! The registries are not exposed over REST, so each listing opens a short
//! WebSocket session: wait for `auth_required`, send the access token, wait
//! for `auth_ok`, then issue one command and read frames until the `result`
//! carrying the same id arrives.

use crate::client::{HomeAssistantClient, SUPERVISOR_BASE_URL};
use crate::errors::{HaError, HaResult};
use crate::types::{DeviceEntry, RegistryEntity};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, error, info};

const SUPERVISOR_WEBSOCKET_URL: &str = "ws://supervisor/core/websocket";
const ENTITY_REGISTRY_LIST: &str = "config/entity_registry/list";
const DEVICE_REGISTRY_LIST: &str = "config/device_registry/list";
const COMMAND_ID: u64 = 1;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Read-only, whole-collection registry queries
#[async_trait]
pub trait EntityRegistry: Send + Sync {
    async fn list_entities(&self) -> HaResult<Vec<RegistryEntity>>;

    async fn list_devices(&self) -> HaResult<Vec<DeviceEntry>>;
}

#[derive(Debug, Deserialize)]
struct WsFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<WsErrorBody>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WsErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Registry client speaking the HA WebSocket protocol
#[derive(Clone)]
pub struct RegistryClient {
    ws_url: String,
    token: String,
    timeout: Duration,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("ws_url", &self.ws_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Derive the WebSocket endpoint from a REST base URL
pub fn websocket_url(base_url: &str) -> HaResult<String> {
    let base = base_url.trim_end_matches('/');
    if base == SUPERVISOR_BASE_URL {
        return Ok(SUPERVISOR_WEBSOCKET_URL.to_owned());
    }

    let (scheme, host) = if let Some(host) = base.strip_prefix("https://") {
        ("wss://", host)
    } else if let Some(host) = base.strip_prefix("http://") {
        ("ws://", host)
    } else {
        return Err(HaError::ConfigError(format!(
            "Unsupported Home Assistant URL scheme: {base_url}"
        )));
    };

    Ok(format!("{scheme}{host}/api/websocket"))
}

impl RegistryClient {
    pub fn new(ws_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
            token: token.into(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_base_url(base_url: &str, token: impl Into<String>) -> HaResult<Self> {
        let ws_url = websocket_url(base_url)?;
        info!("Initializing HA registry client: {}", ws_url);
        Ok(Self::new(ws_url, token))
    }

    /// Reuse the endpoint and token of a REST client
    pub fn from_client(client: &HomeAssistantClient) -> HaResult<Self> {
        Self::from_base_url(client.base_url(), client.token())
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Run one command in a fresh authenticated session
    async fn call<T: DeserializeOwned>(&self, command: &str) -> HaResult<T> {
        debug!("🔍 [HA WS] {}", command);
        let result = tokio::time::timeout(self.timeout, self.call_inner(command))
            .await
            .map_err(|_| {
                error!("❌ [HA WS] {} timed out after {:?}", command, self.timeout);
                HaError::Timeout
            })??;

        Ok(serde_json::from_value(result)?)
    }

    async fn call_inner(&self, command: &str) -> HaResult<Value> {
        let (mut ws, _response) = connect_async(self.ws_url.as_str())
            .await
            .map_err(|e| HaError::WebSocket(e.to_string()))?;

        self.authenticate(&mut ws).await?;

        let request = json!({ "id": COMMAND_ID, "type": command });
        send_json(&mut ws, &request).await?;

        let result = loop {
            let frame = next_frame(&mut ws).await?;
            if frame.kind != "result" || frame.id != Some(COMMAND_ID) {
                debug!("Skipping unrelated frame of type {}", frame.kind);
                continue;
            }
            break frame;
        };

        // Best effort, the server drops the session on its own otherwise
        let _ = ws.close(None).await;

        if result.success == Some(true) {
            return Ok(result.result);
        }

        let (code, message) = result
            .error
            .map(|e| (e.code, e.message))
            .unwrap_or_default();
        error!("❌ [HA WS] {} failed: {} {}", command, code, message);
        Err(HaError::ApiError {
            status: 0,
            message: format!("{code}: {message}"),
        })
    }

    async fn authenticate(&self, ws: &mut WsStream) -> HaResult<()> {
        let hello = next_frame(ws).await?;
        if hello.kind != "auth_required" {
            return Err(HaError::InvalidResponse(format!(
                "expected auth_required, got {}",
                hello.kind
            )));
        }

        send_json(ws, &json!({ "type": "auth", "access_token": self.token })).await?;

        let reply = next_frame(ws).await?;
        match reply.kind.as_str() {
            "auth_ok" => Ok(()),
            "auth_invalid" => {
                error!(
                    "❌ [HA WS] Authentication rejected: {}",
                    reply.message.unwrap_or_default()
                );
                Err(HaError::AuthenticationFailed)
            }
            other => Err(HaError::InvalidResponse(format!(
                "unexpected auth reply: {other}"
            ))),
        }
    }
}

async fn send_json(ws: &mut WsStream, payload: &Value) -> HaResult<()> {
    ws.send(Message::Text(payload.to_string()))
        .await
        .map_err(|e| HaError::WebSocket(e.to_string()))
}

async fn next_frame(ws: &mut WsStream) -> HaResult<WsFrame> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
            Some(Ok(
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_),
            )) => {}
            Some(Ok(Message::Close(frame))) => {
                return Err(HaError::WebSocket(format!("connection closed: {frame:?}")));
            }
            Some(Err(e)) => return Err(HaError::WebSocket(e.to_string())),
            None => return Err(HaError::WebSocket("connection closed".to_owned())),
        }
    }
}

#[async_trait]
impl EntityRegistry for RegistryClient {
    async fn list_entities(&self) -> HaResult<Vec<RegistryEntity>> {
        let entities: Vec<RegistryEntity> = self.call(ENTITY_REGISTRY_LIST).await?;
        debug!("✅ [HA WS] {} registry entities", entities.len());
        Ok(entities)
    }

    async fn list_devices(&self) -> HaResult<Vec<DeviceEntry>> {
        let devices: Vec<DeviceEntry> = self.call(DEVICE_REGISTRY_LIST).await?;
        debug!("✅ [HA WS] {} registry devices", devices.len());
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// How the scripted server answers the command
    enum Reply {
        Result(Value),
        Failure,
        Silent,
    }

    /// Serve a single session and return the command type it received
    async fn spawn_server(
        accept_token: &'static str,
        reply: Reply,
    ) -> (String, tokio::task::JoinHandle<Option<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

            ws.send(Message::Text(json!({"type": "auth_required"}).to_string()))
                .await
                .unwrap();

            let auth: Value = match ws.next().await {
                Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
                other => panic!("expected auth frame, got {other:?}"),
            };
            assert_eq!(auth["type"], "auth");
            if auth["access_token"] != accept_token {
                ws.send(Message::Text(
                    json!({"type": "auth_invalid", "message": "Invalid access token"}).to_string(),
                ))
                .await
                .unwrap();
                return None;
            }
            ws.send(Message::Text(json!({"type": "auth_ok"}).to_string()))
                .await
                .unwrap();

            let command: Value = match ws.next().await {
                Some(Ok(Message::Text(text))) => serde_json::from_str(&text).unwrap(),
                other => panic!("expected command frame, got {other:?}"),
            };
            let id = command["id"].clone();

            match reply {
                Reply::Result(result) => {
                    // An event for another subscription arrives first
                    ws.send(Message::Text(
                        json!({"id": 99, "type": "event", "event": {}}).to_string(),
                    ))
                    .await
                    .unwrap();
                    ws.send(Message::Text(
                        json!({"id": id, "type": "result", "success": true, "result": result})
                            .to_string(),
                    ))
                    .await
                    .unwrap();
                }
                Reply::Failure => {
                    ws.send(Message::Text(
                        json!({
                            "id": id,
                            "type": "result",
                            "success": false,
                            "error": {"code": "unauthorized", "message": "Unauthorized"}
                        })
                        .to_string(),
                    ))
                    .await
                    .unwrap();
                }
                Reply::Silent => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }

            command["type"].as_str().map(str::to_owned)
        });

        (url, handle)
    }

    #[tokio::test]
    async fn test_list_entities() {
        let (url, server) = spawn_server(
            "test_token",
            Reply::Result(json!([
                {
                    "entity_id": "sensor.car_odometer",
                    "device_id": "dev1",
                    "unique_id": "WDD123_odometer",
                    "original_name": "Odometer",
                    "disabled_by": null,
                    "hidden_by": null
                }
            ])),
        )
        .await;

        let client = RegistryClient::new(url, "test_token");
        let entities = client.list_entities().await.unwrap();

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].entity_id, "sensor.car_odometer");
        assert_eq!(
            server.await.unwrap().as_deref(),
            Some("config/entity_registry/list")
        );
    }

    #[tokio::test]
    async fn test_list_devices() {
        let (url, server) = spawn_server(
            "test_token",
            Reply::Result(json!([{"id": "dev1", "model": "EQA 250", "name": "Car"}])),
        )
        .await;

        let client = RegistryClient::new(url, "test_token");
        let devices = client.list_devices().await.unwrap();

        assert_eq!(devices[0].model.as_deref(), Some("EQA 250"));
        assert_eq!(
            server.await.unwrap().as_deref(),
            Some("config/device_registry/list")
        );
    }

    #[tokio::test]
    async fn test_auth_invalid() {
        let (url, _server) = spawn_server("test_token", Reply::Silent).await;

        let client = RegistryClient::new(url, "wrong_token");
        let result = client.list_entities().await;

        assert!(matches!(result, Err(HaError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_unsuccessful_result_is_api_error() {
        let (url, _server) = spawn_server("test_token", Reply::Failure).await;

        let client = RegistryClient::new(url, "test_token");
        match client.list_entities().await {
            Err(HaError::ApiError { message, .. }) => assert!(message.contains("unauthorized")),
            other => panic!("expected ApiError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout() {
        let (url, _server) = spawn_server("test_token", Reply::Silent).await;

        let client =
            RegistryClient::new(url, "test_token").with_timeout(Duration::from_millis(200));
        let result = client.list_entities().await;

        assert!(matches!(result, Err(HaError::Timeout)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = RegistryClient::new(url, "test_token");
        assert!(matches!(
            client.list_devices().await,
            Err(HaError::WebSocket(_))
        ));
    }

    #[test]
    fn test_websocket_url() {
        assert_eq!(
            websocket_url("http://homeassistant.local:8123/").unwrap(),
            "ws://homeassistant.local:8123/api/websocket"
        );
        assert_eq!(
            websocket_url("https://ha.example.com").unwrap(),
            "wss://ha.example.com/api/websocket"
        );
        assert_eq!(
            websocket_url("http://supervisor/core").unwrap(),
            "ws://supervisor/core/websocket"
        );
        assert!(matches!(
            websocket_url("ftp://nope"),
            Err(HaError::ConfigError(_))
        ));
    }
}
