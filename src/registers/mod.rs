//! Register maps: the description of what a stove's raw buffer means
//!
//! Every device model publishes a registers map on the platform: a list of
//! named registers, each with a buffer offset, a bit mask, scaling formulas
//! and optional ON/OFF encodings. The map response can carry several
//! variants; the device's `id_registers_map` hint from `deviceGetInfo` picks
//! the right one.

pub mod codec;
pub mod formula;

use crate::error::{AguaIotError, Result};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// One register definition out of a device's registers map
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterDescriptor {
    /// Register name, e.g. `temp_air_get` or `status_managed_get`
    pub key: String,
    /// Vendor type tag for the register
    pub reg_type: Option<String>,
    /// Position of the register's raw value in the device buffer
    pub offset: i64,
    /// Bit mask applied to the raw value before any scaling
    pub mask: i64,
    /// Scaling formula, raw -> display (`"#/2"`)
    pub formula: Option<String>,
    /// Scaling formula, display -> raw (`"#*2"`)
    pub formula_inverse: Option<String>,
    /// Vendor display format hint
    pub format_string: Option<String>,
    /// Smallest writable display value, when the vendor declares one
    pub set_min: Option<f64>,
    /// Largest writable display value, when the vendor declares one
    pub set_max: Option<f64>,
    /// Display value meaning "on", from the `enc_val` table
    pub value_on: Option<f64>,
    /// Display value meaning "off", from the `enc_val` table
    pub value_off: Option<f64>,
}

/// Registers map selected and parsed for one device
#[derive(Debug, Clone, Default)]
pub struct RegistersMap {
    /// Identifier of the variant the map was built from
    pub id: Option<Value>,
    pub(crate) registers: HashMap<String, RegisterDescriptor>,
}

impl RegistersMap {
    /// Look up a register by key
    pub fn get(&self, key: &str) -> Option<&RegisterDescriptor> {
        self.registers.get(key)
    }

    /// Number of registers in the map
    pub fn len(&self) -> usize {
        self.registers.len()
    }

    /// Whether the map holds no registers
    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Iterate over register keys
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.registers.keys().map(String::as_str)
    }

    /// Iterate over `(key, descriptor)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegisterDescriptor)> {
        self.registers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a map from a `deviceGetRegistersMap` response
    ///
    /// The response carries `device_registers_map.registers_map`, an array of
    /// map variants. When `hint` (the device's `id_registers_map`) matches a
    /// variant id that variant is used; otherwise the first variant is taken,
    /// with a warning when a hint went unmatched. Registers without a usable
    /// offset or mask are skipped: they can never be located in a buffer.
    pub fn from_response(response: &Value, hint: Option<&Value>) -> Result<Self> {
        let variants = response
            .get("device_registers_map")
            .and_then(|m| m.get("registers_map"))
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AguaIotError::no_registers_map("response carries no registers_map array")
            })?;

        if variants.is_empty() {
            return Err(AguaIotError::no_registers_map("registers_map is empty"));
        }

        let variant = match hint {
            Some(h) => variants
                .iter()
                .find(|v| v.get("id").is_some_and(|id| ids_match(id, h)))
                .unwrap_or_else(|| {
                    warn!(
                        "No registers map variant matches id {h}, using the first of {}",
                        variants.len()
                    );
                    &variants[0]
                }),
            None => &variants[0],
        };

        let raw_registers = variant
            .get("registers")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                AguaIotError::no_registers_map("selected map variant has no registers array")
            })?;

        let mut registers = HashMap::new();
        for raw in raw_registers {
            let Some(key) = raw.get("reg_key").and_then(Value::as_str) else {
                warn!("Skipping register without reg_key");
                continue;
            };
            let (Some(offset), Some(mask)) = (
                raw.get("offset").and_then(json_i64),
                raw.get("mask").and_then(json_i64),
            ) else {
                warn!("Skipping register '{key}': no usable offset/mask");
                continue;
            };

            let mut descriptor = RegisterDescriptor {
                key: key.to_string(),
                reg_type: raw
                    .get("reg_type")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                offset,
                mask,
                formula: raw
                    .get("formula")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                formula_inverse: raw
                    .get("formula_inverse")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                format_string: raw
                    .get("format_string")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                set_min: raw.get("set_min").and_then(json_f64),
                set_max: raw.get("set_max").and_then(json_f64),
                value_on: None,
                value_off: None,
            };

            // ON/OFF display values live in the English enc_val entries
            if let Some(enc_vals) = raw.get("enc_val").and_then(Value::as_array) {
                for enc in enc_vals {
                    if enc.get("lang").and_then(Value::as_str) != Some("ENG") {
                        continue;
                    }
                    match enc.get("description").and_then(Value::as_str) {
                        Some("ON") => descriptor.value_on = enc.get("value").and_then(json_f64),
                        Some("OFF") => descriptor.value_off = enc.get("value").and_then(json_f64),
                        _ => {}
                    }
                }
            }

            registers.insert(descriptor.key.clone(), descriptor);
        }

        debug!(
            "Loaded registers map {:?} with {} registers",
            variant.get("id"),
            registers.len()
        );

        Ok(Self {
            id: variant.get("id").cloned(),
            registers,
        })
    }
}

/// Integer out of a JSON value that may be a number or a numeric string
///
/// The platform is inconsistent about this: offsets and masks show up as
/// `12`, `"12"` or even `12.0` depending on the tenant.
pub(crate) fn json_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

/// Float out of a JSON value that may be a number or a numeric string
pub(crate) fn json_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Loose identifier equality: numeric when both sides are numeric, else textual
pub(crate) fn ids_match(a: &Value, b: &Value) -> bool {
    match (json_i64(a), json_i64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => id_text(a) == id_text(b),
    }
}

/// Canonical text form of a server-side identifier, for cache keys
pub(crate) fn id_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}
