use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

pub const TEMPERATURE_KEY: &str = "esp32_temperature";
pub const HUMIDITY_KEY: &str = "esp32_humidity";
pub const GAS_KEY: &str = "esp32_gaz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    On,
    Off,
}

impl DeviceState {
    pub fn from_on(on: bool) -> Self {
        if on {
            DeviceState::On
        } else {
            DeviceState::Off
        }
    }

    // Anything the backend reports other than "on" counts as off, e.g. "0" from a failed CoAP read.
    pub fn from_reported(text: &str) -> Self {
        Self::from_on(text.trim().eq_ignore_ascii_case("on"))
    }

    pub fn is_on(self) -> bool {
        self == DeviceState::On
    }

    pub fn toggled(self) -> Self {
        Self::from_on(!self.is_on())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::On => "on",
            DeviceState::Off => "off",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "on" => Ok(DeviceState::On),
            "off" => Ok(DeviceState::Off),
            other => Err(format!("state must be on or off, got {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    #[serde(deserialize_with = "deserialize_readings")]
    pub sensors: BTreeMap<String, f64>,
    #[serde(deserialize_with = "deserialize_devices")]
    pub devices: BTreeMap<String, DeviceState>,
}

impl StatusSnapshot {
    pub fn temperature(&self) -> Option<f64> {
        self.sensors.get(TEMPERATURE_KEY).copied()
    }

    pub fn humidity(&self) -> Option<f64> {
        self.sensors.get(HUMIDITY_KEY).copied()
    }

    pub fn gas(&self) -> Option<f64> {
        self.sensors.get(GAS_KEY).copied()
    }

    pub fn device(&self, key: &str) -> Option<DeviceState> {
        self.devices.get(key).copied()
    }

    pub fn gas_alert(&self, threshold_ppm: f64) -> Option<f64> {
        self.gas().filter(|ppm| *ppm > threshold_ppm)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reading {
    Number(f64),
    Text(String),
}

// Readings arrive as numbers or numeric text.
fn deserialize_readings<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Reading>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(name, reading)| {
            let value = match reading {
                Reading::Number(n) => n,
                Reading::Text(text) => text.trim().parse::<f64>().map_err(|_| {
                    de::Error::custom(format!("sensor {name} is not numeric: {text:?}"))
                })?,
            };
            Ok((name, value))
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Reported {
    Text(String),
    Other(de::IgnoredAny),
}

impl Reported {
    fn state(&self) -> DeviceState {
        match self {
            Reported::Text(text) => DeviceState::from_reported(text),
            Reported::Other(_) => DeviceState::Off,
        }
    }
}

fn deserialize_devices<'de, D>(deserializer: D) -> Result<BTreeMap<String, DeviceState>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Reported>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, reported)| (name, reported.state()))
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StatusPayload {
    Valid(StatusSnapshot),
    Malformed { reason: String },
}

impl StatusPayload {
    pub fn from_body(body: serde_json::Value) -> Self {
        match serde_json::from_value::<StatusSnapshot>(body) {
            Ok(snapshot) => StatusPayload::Valid(snapshot),
            Err(err) => StatusPayload::Malformed {
                reason: err.to_string(),
            },
        }
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        match self {
            StatusPayload::Valid(snapshot) => Some(snapshot),
            StatusPayload::Malformed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollState {
    pub latest: Option<StatusPayload>,
    pub is_mock: bool,
    pub tick: u64,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl PollState {
    pub fn empty() -> Self {
        Self {
            latest: None,
            is_mock: false,
            tick: 0,
            updated_at: None,
            last_error: None,
        }
    }

    pub fn snapshot(&self) -> Option<&StatusSnapshot> {
        self.latest.as_ref().and_then(StatusPayload::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_numeric_and_text_readings() {
        let payload = StatusPayload::from_body(json!({
            "sensors": {"esp32_temperature": "22.5", "esp32_humidity": 48, "esp32_gaz": " 120 "},
            "devices": {"kitchen": "on", "cooler": "off"}
        }));

        let snapshot = payload.snapshot().expect("valid snapshot");
        assert_eq!(snapshot.temperature(), Some(22.5));
        assert_eq!(snapshot.humidity(), Some(48.0));
        assert_eq!(snapshot.gas(), Some(120.0));
        assert_eq!(snapshot.device("kitchen"), Some(DeviceState::On));
        assert_eq!(snapshot.device("cooler"), Some(DeviceState::Off));
    }

    #[test]
    fn unreadable_device_values_are_off() {
        let payload = StatusPayload::from_body(json!({
            "sensors": {"esp32_temperature": "21.8", "esp32_humidity": "0", "esp32_gaz": "0"},
            "devices": {"kitchen": "ON", "living": "0", "bedroom": "off", "cooler": null}
        }));

        let snapshot = payload.snapshot().expect("valid snapshot");
        assert_eq!(snapshot.temperature(), Some(21.8));
        assert_eq!(snapshot.device("kitchen"), Some(DeviceState::On));
        assert_eq!(snapshot.device("living"), Some(DeviceState::Off));
        assert_eq!(snapshot.device("bedroom"), Some(DeviceState::Off));
        assert_eq!(snapshot.device("cooler"), Some(DeviceState::Off));
    }

    #[test]
    fn reported_state_is_on_only_for_on() {
        assert_eq!(DeviceState::from_reported(" On "), DeviceState::On);
        assert_eq!(DeviceState::from_reported("0"), DeviceState::Off);
        assert_eq!(DeviceState::from_reported(""), DeviceState::Off);
    }

    #[test]
    fn missing_devices_key_is_malformed() {
        let payload = StatusPayload::from_body(json!({"sensors": {"esp32_temperature": 21.0}}));
        assert!(matches!(payload, StatusPayload::Malformed { .. }));
        assert!(payload.snapshot().is_none());
    }

    #[test]
    fn non_numeric_reading_is_malformed() {
        let payload = StatusPayload::from_body(json!({
            "sensors": {"esp32_gaz": "n/a"},
            "devices": {}
        }));
        match payload {
            StatusPayload::Malformed { reason } => assert!(reason.contains("esp32_gaz")),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn gas_alert_only_above_threshold() {
        let mut snapshot = StatusSnapshot {
            sensors: BTreeMap::from([(GAS_KEY.to_string(), 400.0)]),
            devices: BTreeMap::new(),
        };
        assert_eq!(snapshot.gas_alert(400.0), None);

        snapshot.sensors.insert(GAS_KEY.to_string(), 512.0);
        assert_eq!(snapshot.gas_alert(400.0), Some(512.0));
    }

    #[test]
    fn device_state_toggles() {
        assert_eq!(DeviceState::Off.toggled(), DeviceState::On);
        assert_eq!(DeviceState::On.toggled(), DeviceState::Off);
        assert_eq!(serde_json::to_value(DeviceState::On).unwrap(), json!("on"));
    }
}
