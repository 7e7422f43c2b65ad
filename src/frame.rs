use std::time::UNIX_EPOCH;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};

use crate::error::DecodeError;

/// Forwarder field names and the field each one stands in for
const FIELD_ALIASES: [(&str, &str); 2] = [("gear", "current_gear"), ("lap_count", "lap")];

/// One reading of vehicle state.
///
/// Frames are plain values: they are built once, copied on read, and carry no
/// reference to the source that produced them. The `Default` frame is the
/// "nothing received yet" frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Wall clock nanoseconds since the unix epoch, stamped when the frame was produced
    #[serde(default, skip_deserializing)]
    pub received_time: u64,
    /// m/s
    #[serde(default, deserialize_with = "float_or_zero")]
    pub car_speed: f64,
    #[serde(default, deserialize_with = "rpm_or_zero")]
    pub engine_rpm: u32,
    /// 0 is neutral (or unknown), negative is reverse
    #[serde(default, deserialize_with = "gear_or_neutral")]
    pub current_gear: i32,
    /// 0..1
    #[serde(default, deserialize_with = "float_or_zero")]
    pub throttle: f64,
    /// 0..1
    #[serde(default, deserialize_with = "float_or_zero")]
    pub brake: f64,
    #[serde(default, deserialize_with = "float_or_zero")]
    pub steering: f64,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "optional_lap"
    )]
    pub lap: Option<u32>,
}

impl TelemetryFrame {
    /// Decode one datagram payload, a single JSON object.
    ///
    /// Missing and `null` fields take their zero value and unknown fields are
    /// ignored. `gear` and `lap_count` are read as `current_gear` and `lap`
    /// when the canonical field is absent. Any `received_time` in the payload
    /// is replaced by `received_time`.
    pub fn decode(payload: &[u8], received_time: u64) -> Result<Self, DecodeError> {
        let mut object: Map<String, Value> = serde_json::from_slice(payload)?;
        for (alias, field) in FIELD_ALIASES {
            if let Some(value) = object.remove(alias) {
                object.entry(field).or_insert(value);
            }
        }
        let mut frame: TelemetryFrame = serde_json::from_value(Value::Object(object))?;
        frame.received_time = received_time;
        Ok(frame)
    }

    /// Encode as the one-object JSON payload carried by a datagram
    pub fn encode(&self) -> Vec<u8> {
        // a struct of plain numbers always serializes
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn speed_kph(&self) -> f64 {
        self.car_speed * 3.6
    }

    pub fn gear_label(&self) -> String {
        match self.current_gear {
            0 => "N".to_string(),
            g if g < 0 => "R".to_string(),
            g => g.to_string(),
        }
    }
}

/// Wall clock nanoseconds since the unix epoch, 0 if the clock reads earlier
pub fn now_ns() -> u64 {
    UNIX_EPOCH
        .elapsed()
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    Ok(Option::<Number>::deserialize(d)?.and_then(|n| n.as_f64()))
}

fn float_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    Ok(number(d)?.unwrap_or_default())
}

// float to int casts truncate toward zero and saturate, NaN becomes 0
fn rpm_or_zero<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    Ok(number(d)?.map(|v| v as u32).unwrap_or_default())
}

fn gear_or_neutral<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    Ok(number(d)?.map(|v| v as i32).unwrap_or_default())
}

fn optional_lap<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(number(d)?.map(|v| v as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_zero() {
        let frame =
            TelemetryFrame::decode(br#"{"car_speed": 42.0, "engine_rpm": 6000, "current_gear": 3}"#, 7)
                .unwrap();
        assert_eq!(frame.received_time, 7);
        assert_eq!(frame.car_speed, 42.0);
        assert_eq!(frame.engine_rpm, 6000);
        assert_eq!(frame.current_gear, 3);
        assert_eq!(frame.throttle, 0.0);
        assert_eq!(frame.brake, 0.0);
        assert_eq!(frame.steering, 0.0);
        assert_eq!(frame.lap, None);
    }

    #[test]
    fn payload_timestamp_is_replaced() {
        let frame = TelemetryFrame::decode(br#"{"received_time": 1, "car_speed": 1}"#, 99).unwrap();
        assert_eq!(frame.received_time, 99);
        assert_eq!(frame.car_speed, 1.0);
    }

    #[test]
    fn accepts_forwarder_aliases_and_loose_numbers() {
        let payload = br#"{"gear": 4.0, "lap_count": 2, "engine_rpm": 7250.9, "brake": null, "fuel": 30}"#;
        let frame = TelemetryFrame::decode(payload, 0).unwrap();
        assert_eq!(frame.current_gear, 4);
        assert_eq!(frame.lap, Some(2));
        assert_eq!(frame.engine_rpm, 7250);
        assert_eq!(frame.brake, 0.0);
    }

    #[test]
    fn canonical_field_wins_over_alias() {
        let payload = br#"{"current_gear": 3, "gear": 5, "lap": 7, "lap_count": 1, "car_speed": 9}"#;
        let frame = TelemetryFrame::decode(payload, 0).unwrap();
        assert_eq!(frame.current_gear, 3);
        assert_eq!(frame.lap, Some(7));
        assert_eq!(frame.car_speed, 9.0);

        // alias order in the payload does not matter
        let frame = TelemetryFrame::decode(br#"{"gear": 5, "current_gear": null}"#, 0).unwrap();
        assert_eq!(frame.current_gear, 0);
    }

    #[test]
    fn negative_rpm_saturates() {
        let frame = TelemetryFrame::decode(br#"{"engine_rpm": -50}"#, 0).unwrap();
        assert_eq!(frame.engine_rpm, 0);
    }

    #[test]
    fn rejects_non_objects_and_bad_types() {
        assert!(TelemetryFrame::decode(b"not json", 0).is_err());
        assert!(TelemetryFrame::decode(b"[1, 2, 3]", 0).is_err());
        assert!(TelemetryFrame::decode(br#"{"car_speed": "fast"}"#, 0).is_err());
        assert!(TelemetryFrame::decode(&[0xff, 0xfe, 0x7b], 0).is_err());
    }

    #[test]
    fn encode_skips_unknown_lap() {
        let frame = TelemetryFrame {
            car_speed: 12.5,
            current_gear: 2,
            ..Default::default()
        };
        let text = String::from_utf8(frame.encode()).unwrap();
        assert!(!text.contains("lap"));
        let back = TelemetryFrame::decode(text.as_bytes(), 0).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn gear_labels() {
        let mut frame = TelemetryFrame::default();
        assert_eq!(frame.gear_label(), "N");
        frame.current_gear = -1;
        assert_eq!(frame.gear_label(), "R");
        frame.current_gear = 5;
        assert_eq!(frame.gear_label(), "5");
    }
}
