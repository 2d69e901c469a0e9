//! Buffer decoding and write encoding against a registers map
//!
//! A buffer read job answers with two parallel arrays: `Items` holds buffer
//! offsets, `Values` the raw words at those offsets. Decoding walks the
//! registers map, masks each register's raw word and applies its scaling
//! formula. Encoding is the reverse path for a single register write.

use crate::error::{AguaIotError, Result};
use crate::registers::{formula, json_i64, RegistersMap};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Decoded register values for one device, keyed by register name
pub type DeviceData = HashMap<String, f64>;

/// Raw single-register write derived from a display value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegisterWrite {
    /// Buffer offset of the target register
    pub offset: i64,
    /// Bit mask of the target register
    pub mask: i64,
    /// Raw value to write, after the inverse formula and rounding
    pub value: i64,
}

/// Decode a completed read job's `jobAnswerData` into register values
pub fn decode_job_answer(map: &RegistersMap, answer: &Value) -> Result<DeviceData> {
    let items = answer
        .get("Items")
        .and_then(Value::as_array)
        .ok_or_else(|| AguaIotError::malformed_buffer("job answer carries no Items array"))?;
    let values = answer
        .get("Values")
        .and_then(Value::as_array)
        .ok_or_else(|| AguaIotError::malformed_buffer("job answer carries no Values array"))?;
    decode_buffer(map, items, values)
}

/// Decode parallel offset/value arrays into register values
///
/// The arrays must be the same length. Per register the mask is applied
/// before the formula; registers whose offset is absent from the buffer are
/// simply left out of the result.
pub fn decode_buffer(map: &RegistersMap, items: &[Value], values: &[Value]) -> Result<DeviceData> {
    if items.len() != values.len() {
        return Err(AguaIotError::malformed_buffer(format!(
            "Items has {} entries but Values has {}",
            items.len(),
            values.len()
        )));
    }

    let mut buffer: HashMap<i64, i64> = HashMap::new();
    for (item, value) in items.iter().zip(values) {
        let (Some(offset), Some(raw)) = (json_i64(item), json_i64(value)) else {
            warn!("Skipping non-numeric buffer entry {item}:{value}");
            continue;
        };
        buffer.insert(offset, raw);
    }

    let mut data = DeviceData::new();
    for (key, register) in map.iter() {
        let Some(&raw) = buffer.get(&register.offset) else {
            continue;
        };
        let masked = (raw & register.mask) as f64;
        data.insert(
            key.to_string(),
            formula::apply(register.formula.as_deref(), masked),
        );
    }

    debug!("Decoded {} of {} mapped registers", data.len(), map.len());
    Ok(data)
}

/// Encode a display value into a raw single-register write
///
/// Applies the register's inverse formula and rounds to the nearest integer,
/// which is what the write endpoint expects in its `Values` array.
pub fn encode_write(map: &RegistersMap, key: &str, value: f64) -> Result<RegisterWrite> {
    let register = map
        .get(key)
        .ok_or_else(|| AguaIotError::unknown_register(key))?;

    let raw = formula::apply(register.formula_inverse.as_deref(), value);
    Ok(RegisterWrite {
        offset: register.offset,
        mask: register.mask,
        value: raw.round() as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registers::RegisterDescriptor;
    use serde_json::json;

    fn descriptor(key: &str, offset: i64, mask: i64, formula: Option<&str>) -> RegisterDescriptor {
        RegisterDescriptor {
            key: key.to_string(),
            reg_type: None,
            offset,
            mask,
            formula: formula.map(str::to_string),
            formula_inverse: None,
            format_string: None,
            set_min: None,
            set_max: None,
            value_on: None,
            value_off: None,
        }
    }

    fn map_of(descriptors: Vec<RegisterDescriptor>) -> RegistersMap {
        RegistersMap {
            id: None,
            registers: descriptors
                .into_iter()
                .map(|d| (d.key.clone(), d))
                .collect(),
        }
    }

    #[test]
    fn test_decode_applies_formula_after_mask() {
        let map = map_of(vec![descriptor("temp_air_get", 10, 255, Some("#/2"))]);
        let data = decode_buffer(&map, &[json!(10)], &[json!(140)]).unwrap();
        assert_eq!(data["temp_air_get"], 70.0);

        // 0x1FF masked to 0xFF first, then halved
        let data = decode_buffer(&map, &[json!(10)], &[json!(0x1FF)]).unwrap();
        assert_eq!(data["temp_air_get"], 127.5);
    }

    #[test]
    fn test_decode_without_formula_keeps_masked_raw() {
        let map = map_of(vec![descriptor("status_get", 2, 0x00FF, None)]);
        let data = decode_buffer(&map, &[json!(2)], &[json!(0x0102)]).unwrap();
        assert_eq!(data["status_get"], 2.0);
    }

    #[test]
    fn test_decode_length_mismatch_is_malformed() {
        let map = map_of(vec![descriptor("temp_air_get", 10, 255, None)]);
        let err = decode_buffer(&map, &[json!(10), json!(11)], &[json!(140)]).unwrap_err();
        assert!(matches!(err, AguaIotError::MalformedBuffer(_)));
    }

    #[test]
    fn test_decode_omits_registers_missing_from_buffer() {
        let map = map_of(vec![
            descriptor("present", 1, 255, None),
            descriptor("absent", 99, 255, None),
        ]);
        let data = decode_buffer(&map, &[json!(1)], &[json!(7)]).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["present"], 7.0);
        assert!(!data.contains_key("absent"));
    }

    #[test]
    fn test_decode_accepts_string_numbers() {
        let map = map_of(vec![descriptor("temp_air_get", 10, 255, Some("#/2"))]);
        let data = decode_buffer(&map, &[json!("10")], &[json!("140")]).unwrap();
        assert_eq!(data["temp_air_get"], 70.0);
    }

    #[test]
    fn test_decode_skips_non_numeric_entries() {
        let map = map_of(vec![
            descriptor("a", 1, 255, None),
            descriptor("b", 2, 255, None),
        ]);
        let data =
            decode_buffer(&map, &[json!(1), json!(null)], &[json!(5), json!(6)]).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["a"], 5.0);
    }

    #[test]
    fn test_decode_job_answer_requires_both_arrays() {
        let map = map_of(vec![descriptor("temp_air_get", 10, 255, None)]);

        let err = decode_job_answer(&map, &json!({"Values": [1]})).unwrap_err();
        assert!(matches!(err, AguaIotError::MalformedBuffer(_)));

        let err = decode_job_answer(&map, &json!({"Items": [1]})).unwrap_err();
        assert!(matches!(err, AguaIotError::MalformedBuffer(_)));

        let data =
            decode_job_answer(&map, &json!({"Items": [10], "Values": [84]})).unwrap();
        assert_eq!(data["temp_air_get"], 84.0);
    }

    #[test]
    fn test_encode_applies_inverse_and_rounds() {
        let mut reg = descriptor("temp_air_set", 12, 255, Some("#/2"));
        reg.formula_inverse = Some("#*2".to_string());
        let map = map_of(vec![reg]);

        let write = encode_write(&map, "temp_air_set", 21.0).unwrap();
        assert_eq!(
            write,
            RegisterWrite {
                offset: 12,
                mask: 255,
                value: 42
            }
        );

        let write = encode_write(&map, "temp_air_set", 21.3).unwrap();
        assert_eq!(write.value, 43);
    }

    #[test]
    fn test_encode_identity_inverse_rounds_only() {
        let map = map_of(vec![descriptor("power_set", 5, 7, None)]);
        let write = encode_write(&map, "power_set", 3.6).unwrap();
        assert_eq!(write.offset, 5);
        assert_eq!(write.mask, 7);
        assert_eq!(write.value, 4);
    }

    #[test]
    fn test_encode_unknown_register() {
        let map = map_of(vec![]);
        let err = encode_write(&map, "temp_air_set", 21.0).unwrap_err();
        assert!(matches!(err, AguaIotError::UnknownRegister(_)));
    }

    #[test]
    fn test_round_trip_within_rounding() {
        let mut reg = descriptor("temp_air_get", 10, 255, Some("#/2"));
        reg.formula_inverse = Some("#*2".to_string());
        let map = map_of(vec![reg]);

        let write = encode_write(&map, "temp_air_get", 70.0).unwrap();
        let data =
            decode_buffer(&map, &[json!(write.offset)], &[json!(write.value)]).unwrap();
        assert_eq!(data["temp_air_get"], 70.0);
    }
}
