//! Per-screen fetch logic. Every section degrades to an empty table on failure.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::client::SmartHomeApi;
use crate::mock::MockData;
use crate::types::{AggregateStat, Sensor, StatsInterval, TimeSeriesPoint, UsageStat};

pub async fn load_history(api: &dyn SmartHomeApi, sensor: Sensor) -> Vec<TimeSeriesPoint> {
    match api.get_sensor_history(sensor).await {
        Ok(mut points) => {
            // The backend returns newest first.
            points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
            points
        }
        Err(err) => {
            warn!(%sensor, error = %err, "history unavailable");
            Vec::new()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsReport {
    pub interval: StatsInterval,
    pub temperature: Vec<AggregateStat>,
    pub humidity: Vec<AggregateStat>,
    pub gas: Vec<AggregateStat>,
    pub cooler: Vec<UsageStat>,
}

impl StatsReport {
    pub fn sensor(&self, sensor: Sensor) -> &[AggregateStat] {
        match sensor {
            Sensor::Temperature => &self.temperature,
            Sensor::Humidity => &self.humidity,
            Sensor::Gas => &self.gas,
        }
    }

    /// Sections that should render a "no data" line.
    pub fn missing_sections(&self) -> Vec<&'static str> {
        let mut missing: Vec<&'static str> = Sensor::ALL
            .into_iter()
            .filter(|sensor| self.sensor(*sensor).is_empty())
            .map(Sensor::label)
            .collect();
        if self.cooler.is_empty() {
            missing.push("Cooler");
        }
        missing
    }
}

pub async fn load_stats(api: &dyn SmartHomeApi, interval: StatsInterval) -> StatsReport {
    let (temperature, humidity, gas, cooler) = tokio::join!(
        load_sensor_stats(api, Sensor::Temperature, interval),
        load_sensor_stats(api, Sensor::Humidity, interval),
        load_sensor_stats(api, Sensor::Gas, interval),
        async {
            match api.get_cooler_usage(interval).await {
                Ok(usage) => usage.iter().map(UsageStat::rounded).collect(),
                Err(err) => {
                    warn!(%interval, error = %err, "cooler usage unavailable");
                    Vec::new()
                }
            }
        },
    );

    StatsReport {
        interval,
        temperature,
        humidity,
        gas,
        cooler,
    }
}

/// Where the Graphs and Stats screens get their tables from.
#[derive(Clone)]
pub enum ScreenSource {
    Live(Arc<dyn SmartHomeApi>),
    Demo(MockData),
}

impl ScreenSource {
    pub fn new(api: Arc<dyn SmartHomeApi>, demo: Option<MockData>) -> Self {
        match demo {
            Some(mock) => ScreenSource::Demo(mock),
            None => ScreenSource::Live(api),
        }
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, ScreenSource::Demo(_))
    }

    pub async fn history(&self, sensor: Sensor) -> Vec<TimeSeriesPoint> {
        match self {
            ScreenSource::Live(api) => load_history(api.as_ref(), sensor).await,
            ScreenSource::Demo(mock) => mock.history(sensor, Utc::now()),
        }
    }

    pub async fn stats(&self, interval: StatsInterval) -> StatsReport {
        match self {
            ScreenSource::Live(api) => load_stats(api.as_ref(), interval).await,
            ScreenSource::Demo(mock) => StatsReport {
                interval,
                temperature: mock.stats(),
                humidity: mock.stats(),
                gas: mock.stats(),
                cooler: mock.cooler_usage(),
            },
        }
    }
}

async fn load_sensor_stats(
    api: &dyn SmartHomeApi,
    sensor: Sensor,
    interval: StatsInterval,
) -> Vec<AggregateStat> {
    match api.get_sensor_stats(sensor, interval).await {
        Ok(stats) => stats.iter().map(AggregateStat::rounded).collect(),
        Err(err) => {
            warn!(%sensor, %interval, error = %err, "stats unavailable");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedApi;

    fn stat(label: &str, avg: f64) -> AggregateStat {
        AggregateStat {
            label: label.to_string(),
            avg,
            min: avg - 2.0,
            max: avg + 2.0,
        }
    }

    #[tokio::test]
    async fn history_failure_yields_empty_series() {
        let api = ScriptedApi::new().with_history(
            Sensor::Temperature,
            vec![TimeSeriesPoint {
                timestamp: "2026-10-19T10:00:00Z".to_string(),
                value: 21.0,
            }],
        );

        assert_eq!(load_history(&api, Sensor::Temperature).await.len(), 1);
        assert!(load_history(&api, Sensor::Gas).await.is_empty());
    }

    #[tokio::test]
    async fn history_is_returned_oldest_first() {
        let point = |timestamp: &str, value| TimeSeriesPoint {
            timestamp: timestamp.to_string(),
            value,
        };
        let api = ScriptedApi::new().with_history(
            Sensor::Gas,
            vec![
                point("2026-10-19 12:00:00", 130.0),
                point("2026-10-19 11:00:00", 125.0),
                point("2026-10-19 10:00:00", 120.0),
            ],
        );

        let values: Vec<f64> = load_history(&api, Sensor::Gas)
            .await
            .iter()
            .map(|p| p.value)
            .collect();

        assert_eq!(values, vec![120.0, 125.0, 130.0]);
    }

    #[tokio::test]
    async fn demo_source_never_touches_the_backend() {
        let api: Arc<dyn SmartHomeApi> = Arc::new(ScriptedApi::new());
        let source = ScreenSource::new(api, Some(MockData::default()));

        let history = source.history(Sensor::Humidity).await;
        let report = source.stats(StatsInterval::Month).await;

        assert!(source.is_demo());
        assert_eq!(history.len(), 10);
        assert!(history.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(report.interval, StatsInterval::Month);
        assert!(report.missing_sections().is_empty());
    }

    #[tokio::test]
    async fn live_source_degrades_to_empty_when_offline() {
        let api: Arc<dyn SmartHomeApi> = Arc::new(ScriptedApi::new());
        let source = ScreenSource::new(api, None);

        assert!(!source.is_demo());
        assert!(source.history(Sensor::Temperature).await.is_empty());
        assert_eq!(source.stats(StatsInterval::Day).await.missing_sections().len(), 4);
    }

    #[tokio::test]
    async fn stats_sections_fail_independently() {
        let api = ScriptedApi::new()
            .with_stats(Sensor::Temperature, vec![stat("2026-10-18", 21.4567)])
            .with_stats(Sensor::Gas, vec![stat("2026-10-18", 130.0)])
            .with_usage(vec![UsageStat {
                label: "2026-10-18".to_string(),
                hours: 3.14159,
                cost: 0.1884,
            }]);

        let report = load_stats(&api, StatsInterval::Week).await;

        assert_eq!(report.interval, StatsInterval::Week);
        assert_eq!(report.temperature[0].avg, 21.46);
        assert!(report.humidity.is_empty());
        assert_eq!(report.cooler[0].hours, 3.14);
        assert_eq!(report.cooler[0].cost, 0.19);
        assert_eq!(report.missing_sections(), vec!["Humidity"]);
    }

    #[tokio::test]
    async fn unreachable_backend_leaves_every_section_empty() {
        let report = load_stats(&ScriptedApi::new(), StatsInterval::Day).await;
        assert_eq!(
            report.missing_sections(),
            vec!["Temperature", "Humidity", "Gas", "Cooler"]
        );
    }
}
