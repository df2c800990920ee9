use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sensor {
    Temperature,
    Humidity,
    Gas,
}

impl Sensor {
    pub const ALL: [Sensor; 3] = [Sensor::Temperature, Sensor::Humidity, Sensor::Gas];

    /// Path segment for `/{sensor}` and `/{sensor}/history`.
    pub fn history_segment(self) -> &'static str {
        match self {
            Sensor::Temperature => "temperature",
            Sensor::Humidity => "humidity",
            Sensor::Gas => "gaz",
        }
    }

    /// Path segment for `/{sensor}/stats`; the stats route spells gas in English.
    pub fn stats_segment(self) -> &'static str {
        match self {
            Sensor::Temperature => "temperature",
            Sensor::Humidity => "humidity",
            Sensor::Gas => "gas",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Sensor::Temperature => "°C",
            Sensor::Humidity => "%",
            Sensor::Gas => "ppm",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Sensor::Temperature => "Temperature",
            Sensor::Humidity => "Humidity",
            Sensor::Gas => "Gas",
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stats_segment())
    }
}

impl FromStr for Sensor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(Sensor::Temperature),
            "humidity" => Ok(Sensor::Humidity),
            "gas" | "gaz" => Ok(Sensor::Gas),
            other => Err(format!("unknown sensor: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsInterval {
    #[default]
    Day,
    Week,
    Month,
}

impl StatsInterval {
    pub fn as_str(self) -> &'static str {
        match self {
            StatsInterval::Day => "day",
            StatsInterval::Week => "week",
            StatsInterval::Month => "month",
        }
    }

    pub fn next(self) -> Self {
        match self {
            StatsInterval::Day => StatsInterval::Week,
            StatsInterval::Week => StatsInterval::Month,
            StatsInterval::Month => StatsInterval::Day,
        }
    }
}

impl fmt::Display for StatsInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatsInterval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(StatsInterval::Day),
            "week" => Ok(StatsInterval::Week),
            "month" => Ok(StatsInterval::Month),
            other => Err(format!("unknown interval: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKey {
    Kitchen,
    Living,
    Bedroom,
    Cooler,
}

impl DeviceKey {
    pub const ALL: [DeviceKey; 4] = [
        DeviceKey::Kitchen,
        DeviceKey::Living,
        DeviceKey::Bedroom,
        DeviceKey::Cooler,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKey::Kitchen => "kitchen",
            DeviceKey::Living => "living",
            DeviceKey::Bedroom => "bedroom",
            DeviceKey::Cooler => "cooler",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            DeviceKey::Kitchen => "Kitchen light",
            DeviceKey::Living => "Living room light",
            DeviceKey::Bedroom => "Bedroom light",
            DeviceKey::Cooler => "Cooler",
        }
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown device: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateStat {
    pub label: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

impl AggregateStat {
    pub fn rounded(&self) -> Self {
        Self {
            label: self.label.clone(),
            avg: round2(self.avg),
            min: round2(self.min),
            max: round2(self.max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStat {
    pub label: String,
    pub hours: f64,
    pub cost: f64,
}

impl UsageStat {
    pub fn rounded(&self) -> Self {
        Self {
            label: self.label.clone(),
            hours: round2(self.hours),
            cost: round2(self.cost),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub history: Vec<TimeSeriesPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub stats: Vec<AggregateStat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageResponse {
    pub usage: Vec<UsageStat>,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
