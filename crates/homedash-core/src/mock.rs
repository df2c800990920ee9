use std::collections::BTreeMap;
use std::ops::Range;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;

use crate::snapshot::{DeviceState, StatusSnapshot, GAS_KEY, HUMIDITY_KEY, TEMPERATURE_KEY};
use crate::types::{round2, AggregateStat, DeviceKey, Sensor, TimeSeriesPoint, UsageStat};

const HISTORY_POINTS: i64 = 10;
const TABLE_ROWS: usize = 7;

/// Placeholder payloads shaped like the real API responses.
#[derive(Debug, Clone)]
pub struct MockData {
    status: StatusSnapshot,
}

impl Default for MockData {
    fn default() -> Self {
        let sensors = BTreeMap::from([
            (TEMPERATURE_KEY.to_string(), 22.5),
            (HUMIDITY_KEY.to_string(), 48.0),
            (GAS_KEY.to_string(), 120.0),
        ]);
        let devices = BTreeMap::from([
            (DeviceKey::Kitchen.to_string(), DeviceState::On),
            (DeviceKey::Living.to_string(), DeviceState::Off),
            (DeviceKey::Bedroom.to_string(), DeviceState::On),
            (DeviceKey::Cooler.to_string(), DeviceState::Off),
        ]);

        Self {
            status: StatusSnapshot { sensors, devices },
        }
    }
}

impl MockData {
    pub fn status(&self) -> StatusSnapshot {
        self.status.clone()
    }

    /// Ten hourly points, the last one at `now`.
    pub fn history(&self, sensor: Sensor, now: DateTime<Utc>) -> Vec<TimeSeriesPoint> {
        let range = history_range(sensor);
        let mut rng = rand::thread_rng();
        (0..HISTORY_POINTS)
            .map(|i| {
                let ts = now - Duration::hours(HISTORY_POINTS - 1 - i);
                TimeSeriesPoint {
                    timestamp: ts.to_rfc3339_opts(SecondsFormat::Millis, true),
                    value: rng.gen_range(range.clone()),
                }
            })
            .collect()
    }

    pub fn stats(&self) -> Vec<AggregateStat> {
        let mut rng = rand::thread_rng();
        (1..=TABLE_ROWS)
            .map(|day| AggregateStat {
                label: format!("Day {day}"),
                avg: rng.gen_range(20.0..25.0),
                min: rng.gen_range(18.0..20.0),
                max: rng.gen_range(25.0..27.0),
            })
            .collect()
    }

    pub fn cooler_usage(&self) -> Vec<UsageStat> {
        let mut rng = rand::thread_rng();
        (1..=TABLE_ROWS)
            .map(|day| UsageStat {
                label: format!("Day {day}"),
                hours: f64::from(rng.gen_range(0_u32..=8)),
                cost: round2(rng.gen_range(0.0..=10.0)),
            })
            .collect()
    }
}

fn history_range(sensor: Sensor) -> Range<f64> {
    match sensor {
        Sensor::Temperature => 20.0..25.0,
        Sensor::Humidity => 40.0..60.0,
        Sensor::Gas => 100.0..150.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn status_matches_fixed_payload() {
        let status = MockData::default().status();
        assert_eq!(status.temperature(), Some(22.5));
        assert_eq!(status.humidity(), Some(48.0));
        assert_eq!(status.gas(), Some(120.0));
        assert_eq!(status.device("kitchen"), Some(DeviceState::On));
        assert_eq!(status.device("living"), Some(DeviceState::Off));
        assert_eq!(status.device("bedroom"), Some(DeviceState::On));
        assert_eq!(status.device("cooler"), Some(DeviceState::Off));
    }

    #[test]
    fn history_is_hourly_and_ends_now() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).single().expect("valid date");
        let points = MockData::default().history(Sensor::Humidity, now);

        assert_eq!(points.len(), 10);
        assert_eq!(points[0].timestamp, "2026-10-19T03:00:00.000Z");
        assert_eq!(points[9].timestamp, "2026-10-19T12:00:00.000Z");
        assert!(points.iter().all(|p| (40.0..60.0).contains(&p.value)));
    }

    #[test]
    fn tables_have_seven_rows_in_range() {
        let mock = MockData::default();

        let stats = mock.stats();
        assert_eq!(stats.len(), 7);
        assert_eq!(stats[0].label, "Day 1");
        assert!(stats.iter().all(|s| s.min < s.avg && s.avg < s.max));

        let usage = mock.cooler_usage();
        assert_eq!(usage.len(), 7);
        assert!(usage.iter().all(|u| (0.0..=8.0).contains(&u.hours) && u.hours.fract() == 0.0));
        assert!(usage.iter().all(|u| (0.0..=10.0).contains(&u.cost)));
    }
}
