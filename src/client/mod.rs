//! Agua IOT client: session, device listing, reads and writes
//!
//! [`AguaIotClient`] is the facade over the whole protocol. It owns the
//! transport, the session and per-instance caches for registers maps and
//! decoded device data. Operations targeting the same device are expected to
//! be serialized by the caller; operations on different devices can run
//! concurrently, the caches are keyed per device.

pub mod jobs;
pub mod session;
pub mod transport;

use crate::config::{AguaIotConfig, Credentials};
use crate::error::{AguaIotError, Result};
use crate::registers::codec::{self, DeviceData};
use crate::registers::{id_text, RegistersMap};
use jobs::{JobStatus, PollSettings};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use session::{Session, SessionState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use transport::{
    Transport, PATH_DEVICE_BUFFER_READING, PATH_DEVICE_INFO, PATH_DEVICE_LIST,
    PATH_DEVICE_REGISTERS_MAP, PATH_DEVICE_WRITING,
};
use uuid::Uuid;

/// `last_update` sentinel that makes the platform return the full map
const LAST_UPDATE_SENTINEL: &str = "2018-06-03T08:59:54.043";

/// The only buffer the vendor app ever reads
const BUFFER_ID: i64 = 1;

/// Register driving on/off in every known register map
const STATUS_MANAGED_REGISTER: &str = "status_managed_get";

/// One stove as listed on the account
///
/// Identifier fields are kept as raw JSON values and echoed back into
/// request payloads untouched; tenants disagree about whether they are
/// strings or numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AguaIotDevice {
    /// Account-level row id
    pub id: Option<Value>,
    /// Device identifier, used in every per-device payload
    pub id_device: Value,
    /// Product identifier, paired with `id_device` in payloads
    pub id_product: Value,
    /// Serial number printed on the stove
    pub product_serial: Option<String>,
    /// Name given by the owner
    pub name: Option<String>,
    /// Whether the stove currently has cloud connectivity
    pub is_online: bool,
    /// Product model name
    pub name_product: Option<String>,
    /// Registers map variant hint from `deviceGetInfo`
    pub id_registers_map: Option<Value>,
}

impl AguaIotDevice {
    /// Cache key for this device instance
    pub fn instance_key(&self) -> String {
        id_text(&self.id_device)
    }

    /// Best available human-readable name
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.name_product.clone())
            .unwrap_or_else(|| self.instance_key())
    }
}

/// Per-client caches, keyed by device instance
#[derive(Debug, Clone)]
pub struct ClientContext {
    /// Registers maps, one fetch per device until invalidated
    pub registers_maps: Arc<RwLock<HashMap<String, RegistersMap>>>,

    /// Last decoded buffer per device
    pub device_data: Arc<RwLock<HashMap<String, DeviceData>>>,
}

impl Default for ClientContext {
    fn default() -> Self {
        Self {
            registers_maps: Arc::new(RwLock::new(HashMap::new())),
            device_data: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl ClientContext {
    /// Create new client context
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached registers map for a device instance
    pub async fn cached_registers_map(&self, key: &str) -> Option<RegistersMap> {
        self.registers_maps.read().await.get(key).cloned()
    }

    /// Store a freshly fetched registers map
    pub async fn store_registers_map(&self, key: String, map: RegistersMap) {
        self.registers_maps.write().await.insert(key, map);
    }

    /// Drop a cached registers map
    pub async fn invalidate_registers_map(&self, key: &str) {
        self.registers_maps.write().await.remove(key);
    }

    /// Last decoded data for a device instance
    pub async fn cached_device_data(&self, key: &str) -> Option<DeviceData> {
        self.device_data.read().await.get(key).cloned()
    }

    /// Store freshly decoded device data
    pub async fn store_device_data(&self, key: String, data: DeviceData) {
        self.device_data.write().await.insert(key, data);
    }

    /// Drop all cached state
    pub async fn clear(&self) {
        self.registers_maps.write().await.clear();
        self.device_data.write().await.clear();
    }
}

/// Client for one Agua IOT account on one brand tenant
pub struct AguaIotClient {
    config: AguaIotConfig,
    transport: Transport,
    session: Session,
    context: ClientContext,
}

impl AguaIotClient {
    /// Create a client from a configuration and account credentials
    ///
    /// The app-instance id is taken from the configuration when set, so a
    /// caller can keep one identity across restarts; otherwise a fresh v4
    /// UUID is generated.
    pub fn new(config: AguaIotConfig, credentials: Credentials) -> Result<Self> {
        config.validate()?;
        credentials.validate()?;

        let transport = Transport::new(&config)?;
        let client_id = config
            .client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let session = Session::new(credentials, client_id);

        Ok(Self {
            config,
            transport,
            session,
            context: ClientContext::new(),
        })
    }

    /// The configuration this client was built from
    pub fn config(&self) -> &AguaIotConfig {
        &self.config
    }

    /// Cache context, for inspection and explicit invalidation
    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Force the signup/login handshake now
    ///
    /// Operations log in on demand, so calling this is only needed to fail
    /// fast on bad credentials or to force a new token after a 401.
    pub async fn authenticate(&self) -> Result<()> {
        self.session.authenticate(&self.transport).await
    }

    /// Snapshot of the session's token state
    pub async fn session_state(&self) -> SessionState {
        self.session.state().await
    }

    /// List the account's devices, enriched with their registers-map hint
    ///
    /// A failing `deviceGetInfo` for a single device is logged and leaves
    /// that device's hint unset rather than failing the whole listing.
    pub async fn list_devices(&self) -> Result<Vec<AguaIotDevice>> {
        let response = self
            .session
            .authenticated_request(&self.transport, Method::POST, PATH_DEVICE_LIST, Some(&json!({})))
            .await?;

        let raw_devices = match response.get("device").and_then(Value::as_array) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => {
                info!("Account has no devices");
                return Ok(Vec::new());
            }
        };

        let mut devices = Vec::with_capacity(raw_devices.len());
        for raw in &raw_devices {
            let Some(id_device) = raw.get("id_device").cloned() else {
                warn!("Skipping device entry without id_device");
                continue;
            };

            let mut device = AguaIotDevice {
                id: raw.get("id").cloned(),
                id_device,
                id_product: raw.get("id_product").cloned().unwrap_or(Value::Null),
                product_serial: raw
                    .get("product_serial")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                name: raw.get("name").and_then(Value::as_str).map(str::to_string),
                is_online: json_bool(raw.get("is_online")),
                name_product: raw
                    .get("name_product")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                id_registers_map: None,
            };

            match self.fetch_registers_map_hint(&device).await {
                Ok(hint) => device.id_registers_map = hint,
                Err(e) => warn!(
                    "Could not fetch info for device {}: {e}",
                    device.instance_key()
                ),
            }

            devices.push(device);
        }

        info!("Found {} device(s)", devices.len());
        Ok(devices)
    }

    /// Registers map for a device, fetched once and cached per instance
    pub async fn registers_map_for(&self, device: &AguaIotDevice) -> Result<RegistersMap> {
        let key = device.instance_key();
        if let Some(map) = self.context.cached_registers_map(&key).await {
            debug!("Registers map cache hit for device {key}");
            return Ok(map);
        }
        self.fetch_registers_map(device).await
    }

    /// Drop the cached registers map and fetch a fresh one
    ///
    /// The platform updates register maps with firmware releases; callers
    /// that detect a stale map (unknown registers, odd scaling) can force a
    /// re-download here.
    pub async fn refresh_registers_map(&self, device: &AguaIotDevice) -> Result<RegistersMap> {
        self.context
            .invalidate_registers_map(&device.instance_key())
            .await;
        self.fetch_registers_map(device).await
    }

    /// Read and decode the device's buffer
    ///
    /// Submits a buffer read job, waits for it to complete, then decodes
    /// the answer into register values. The result is also cached for
    /// [`cached_data`](Self::cached_data) / [`cached_value`](Self::cached_value).
    pub async fn read_device_data(&self, device: &AguaIotDevice) -> Result<DeviceData> {
        let map = self.registers_map_for(device).await?;

        let mut payload = self.device_payload(device);
        payload["BufferId"] = json!(BUFFER_ID);

        let job = jobs::submit_and_wait(
            &self.transport,
            &self.session,
            Method::POST,
            PATH_DEVICE_BUFFER_READING,
            &payload,
            self.poll_settings(),
        )
        .await?;

        let answer = job.data.ok_or_else(|| {
            AguaIotError::malformed_buffer("read job completed without jobAnswerData")
        })?;
        let data = codec::decode_job_answer(&map, &answer)?;

        self.context
            .store_device_data(device.instance_key(), data.clone())
            .await;
        info!(
            "Decoded {} register values for device {}",
            data.len(),
            device.instance_key()
        );
        Ok(data)
    }

    /// Write one register by key, using the map's inverse scaling
    pub async fn write_register(
        &self,
        device: &AguaIotDevice,
        register_key: &str,
        value: f64,
    ) -> Result<JobStatus> {
        let map = self.registers_map_for(device).await?;
        let write = codec::encode_write(&map, register_key, value)?;
        debug!(
            "Writing {register_key}={value} as raw {} at offset {}",
            write.value, write.offset
        );

        let mut payload = self.device_payload(device);
        payload["Protocol"] = json!("RWMSmaster");
        payload["BitData"] = json!([8]);
        payload["Endianess"] = json!(["L"]);
        payload["Items"] = json!([write.offset]);
        payload["Masks"] = json!([write.mask]);
        payload["Values"] = json!([write.value]);

        let status = jobs::submit_and_wait(
            &self.transport,
            &self.session,
            Method::POST,
            PATH_DEVICE_WRITING,
            &payload,
            self.poll_settings(),
        )
        .await?;
        info!("Write {register_key}={value} completed");
        Ok(status)
    }

    /// Turn the stove on via its managed-status register
    pub async fn turn_on(&self, device: &AguaIotDevice) -> Result<JobStatus> {
        self.set_power_state(device, true).await
    }

    /// Turn the stove off via its managed-status register
    pub async fn turn_off(&self, device: &AguaIotDevice) -> Result<JobStatus> {
        self.set_power_state(device, false).await
    }

    /// Last decoded data for a device, if any read succeeded before
    pub async fn cached_data(&self, device: &AguaIotDevice) -> Option<DeviceData> {
        self.context
            .cached_device_data(&device.instance_key())
            .await
    }

    /// One register value out of the cached data
    pub async fn cached_value(&self, device: &AguaIotDevice, register_key: &str) -> Option<f64> {
        self.cached_data(device)
            .await
            .and_then(|data| data.get(register_key).copied())
    }

    async fn set_power_state(&self, device: &AguaIotDevice, on: bool) -> Result<JobStatus> {
        let map = self.registers_map_for(device).await?;
        let register = map.get(STATUS_MANAGED_REGISTER).ok_or_else(|| {
            AguaIotError::unsupported(format!(
                "device has no {STATUS_MANAGED_REGISTER} register"
            ))
        })?;

        let value = if on {
            register.value_on
        } else {
            register.value_off
        };
        let value = value.ok_or_else(|| {
            AguaIotError::unsupported(format!(
                "{STATUS_MANAGED_REGISTER} defines no {} value",
                if on { "ON" } else { "OFF" }
            ))
        })?;

        self.write_register(device, STATUS_MANAGED_REGISTER, value)
            .await
    }

    async fn fetch_registers_map(&self, device: &AguaIotDevice) -> Result<RegistersMap> {
        let key = device.instance_key();
        info!("Fetching registers map for device {key}");

        let mut payload = self.device_payload(device);
        payload["last_update"] = json!(LAST_UPDATE_SENTINEL);

        let response = self
            .session
            .authenticated_request(
                &self.transport,
                Method::POST,
                PATH_DEVICE_REGISTERS_MAP,
                Some(&payload),
            )
            .await?;

        let map = RegistersMap::from_response(&response, device.id_registers_map.as_ref())?;
        info!("Loaded {} registers for device {key}", map.len());

        self.context.store_registers_map(key, map.clone()).await;
        Ok(map)
    }

    async fn fetch_registers_map_hint(&self, device: &AguaIotDevice) -> Result<Option<Value>> {
        let payload = self.device_payload(device);
        let response = self
            .session
            .authenticated_request(&self.transport, Method::POST, PATH_DEVICE_INFO, Some(&payload))
            .await?;

        Ok(response
            .get("device_info")
            .and_then(Value::as_array)
            .and_then(|info| info.first())
            .and_then(|first| first.get("id_registers_map"))
            .filter(|hint| !hint.is_null())
            .cloned())
    }

    fn device_payload(&self, device: &AguaIotDevice) -> Value {
        json!({
            "id_device": device.id_device,
            "id_product": device.id_product,
        })
    }

    fn poll_settings(&self) -> PollSettings {
        PollSettings {
            interval: self.config.job_poll_interval,
            attempts: self.config.job_poll_attempts,
        }
    }
}

/// Boolean out of the loose shapes tenants use for flags
fn json_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        Some(Value::String(s)) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_bool_accepts_tenant_shapes() {
        assert!(json_bool(Some(&json!(true))));
        assert!(json_bool(Some(&json!(1))));
        assert!(json_bool(Some(&json!("1"))));
        assert!(json_bool(Some(&json!("true"))));
        assert!(json_bool(Some(&json!("TRUE"))));

        assert!(!json_bool(Some(&json!(false))));
        assert!(!json_bool(Some(&json!(0))));
        assert!(!json_bool(Some(&json!("0"))));
        assert!(!json_bool(Some(&json!(null))));
        assert!(!json_bool(None));
    }

    #[test]
    fn test_instance_key_is_type_stable() {
        let mut device = AguaIotDevice {
            id: None,
            id_device: json!("B123"),
            id_product: json!(5),
            product_serial: None,
            name: None,
            is_online: false,
            name_product: None,
            id_registers_map: None,
        };
        assert_eq!(device.instance_key(), "B123");

        // numeric ids key the same whether quoted or not
        device.id_device = json!(123);
        let numeric_key = device.instance_key();
        device.id_device = json!("123");
        assert_eq!(device.instance_key(), numeric_key);
    }

    #[test]
    fn test_display_name_fallbacks() {
        let mut device = AguaIotDevice {
            id: None,
            id_device: json!("dev-1"),
            id_product: json!(1),
            product_serial: None,
            name: Some("Living room".to_string()),
            is_online: true,
            name_product: Some("Stove 9000".to_string()),
            id_registers_map: None,
        };
        assert_eq!(device.display_name(), "Living room");

        device.name = None;
        assert_eq!(device.display_name(), "Stove 9000");

        device.name_product = None;
        assert_eq!(device.display_name(), "dev-1");
    }
}
