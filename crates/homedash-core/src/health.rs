use serde::Serialize;
use serde_json::json;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::client::{ApiError, SmartHomeApi};
use crate::types::{DeviceKey, Sensor, StatsInterval};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Status,
    Reading(Sensor),
    History(Sensor),
    CoolerEnergy,
    CoolerUsage,
    Stats(Sensor),
    Device(DeviceKey),
}

impl Endpoint {
    pub fn all() -> Vec<Endpoint> {
        let mut endpoints = vec![Endpoint::Status];
        endpoints.extend(Sensor::ALL.map(Endpoint::Reading));
        endpoints.extend(Sensor::ALL.map(Endpoint::History));
        endpoints.push(Endpoint::CoolerEnergy);
        endpoints.push(Endpoint::CoolerUsage);
        endpoints.extend(Sensor::ALL.map(Endpoint::Stats));
        endpoints.extend(DeviceKey::ALL.map(Endpoint::Device));
        endpoints
    }

    pub fn name(self) -> String {
        match self {
            Endpoint::Status => "Status".to_string(),
            Endpoint::Reading(sensor) => sensor.label().to_string(),
            Endpoint::History(sensor) => format!("{} history", sensor.label()),
            Endpoint::CoolerEnergy => "Cooler energy".to_string(),
            Endpoint::CoolerUsage => "Cooler usage".to_string(),
            Endpoint::Stats(sensor) => format!("{} stats", sensor.label()),
            Endpoint::Device(key) => format!("Device {key}"),
        }
    }

    pub fn path(self, interval: StatsInterval) -> String {
        match self {
            Endpoint::Status => "/status".to_string(),
            Endpoint::Reading(sensor) => format!("/{}", sensor.history_segment()),
            Endpoint::History(sensor) => format!("/{}/history", sensor.history_segment()),
            Endpoint::CoolerEnergy => format!("/cooler/energy?interval={interval}"),
            Endpoint::CoolerUsage => format!("/cooler/usage?interval={interval}"),
            Endpoint::Stats(sensor) => {
                format!("/{}/stats?interval={interval}", sensor.stats_segment())
            }
            Endpoint::Device(key) => format!("/devices/{key}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointCheck {
    pub name: String,
    pub path: String,
    pub ok: bool,
    pub elapsed_ms: u64,
    pub error: Option<String>,
    pub body: Option<serde_json::Value>,
}

fn to_body<T: Serialize>(value: T) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|err| ApiError::Shape(err.to_string()))
}

async fn fetch(
    api: &dyn SmartHomeApi,
    endpoint: Endpoint,
    interval: StatsInterval,
) -> Result<serde_json::Value, ApiError> {
    match endpoint {
        Endpoint::Status => api.get_status().await,
        Endpoint::Reading(sensor) => api.get_sensor_value(sensor).await,
        Endpoint::History(sensor) => to_body(api.get_sensor_history(sensor).await?),
        Endpoint::CoolerEnergy => api.get_cooler_energy(interval).await,
        Endpoint::CoolerUsage => to_body(api.get_cooler_usage(interval).await?),
        Endpoint::Stats(sensor) => to_body(api.get_sensor_stats(sensor, interval).await?),
        Endpoint::Device(key) => {
            let state = api.get_device_state(key).await?;
            let mut body = serde_json::Map::new();
            body.insert(key.to_string(), json!(state));
            Ok(serde_json::Value::Object(body))
        }
    }
}

pub async fn check_endpoint(
    api: &dyn SmartHomeApi,
    endpoint: Endpoint,
    interval: StatsInterval,
) -> EndpointCheck {
    let started = Instant::now();
    let result = fetch(api, endpoint, interval).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let path = endpoint.path(interval);
    let (ok, error, body) = match result {
        Ok(body) => {
            debug!(%path, elapsed_ms, "endpoint ok");
            (true, None, Some(body))
        }
        Err(err) => {
            warn!(%path, elapsed_ms, error = %err, "endpoint failed");
            (false, Some(err.to_string()), None)
        }
    };

    EndpointCheck {
        name: endpoint.name(),
        path,
        ok,
        elapsed_ms,
        error,
        body,
    }
}

/// Calls every read endpoint once, in order. Device state is read but never written.
pub async fn check_all(api: &dyn SmartHomeApi, interval: StatsInterval) -> Vec<EndpointCheck> {
    let mut checks = Vec::new();
    for endpoint in Endpoint::all() {
        checks.push(check_endpoint(api, endpoint, interval).await);
    }
    checks
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::snapshot::DeviceState;
    use crate::testing::ScriptedApi;
    use crate::types::TimeSeriesPoint;

    #[test]
    fn every_route_is_listed_once() {
        let paths: Vec<String> = Endpoint::all()
            .into_iter()
            .map(|e| e.path(StatsInterval::Day))
            .collect();

        assert_eq!(paths.len(), 16);
        assert_eq!(paths[0], "/status");
        assert!(paths.contains(&"/gaz/history".to_string()));
        assert!(paths.contains(&"/gas/stats?interval=day".to_string()));
        assert!(paths.contains(&"/cooler/energy?interval=day".to_string()));
        assert!(paths.contains(&"/devices/cooler".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn reports_latency_and_failures_per_endpoint() {
        let api = ScriptedApi::new()
            .with_status(vec![Ok(json!({"sensors": {}, "devices": {}}))])
            .with_delay(Duration::from_millis(250))
            .with_history(
                Sensor::Temperature,
                vec![TimeSeriesPoint {
                    timestamp: "2026-10-19T10:00:00Z".to_string(),
                    value: 21.0,
                }],
            )
            .with_device(DeviceKey::Kitchen, Ok(DeviceState::On));

        let checks = check_all(&api, StatsInterval::Week).await;

        assert_eq!(checks.len(), 16);
        assert!(checks[0].ok);
        assert!(checks[0].elapsed_ms >= 250);

        let history = checks.iter().find(|c| c.name == "Temperature history").expect("history");
        assert!(history.ok);
        assert_eq!(history.body.as_ref().map(|b| b[0]["value"].clone()), Some(json!(21.0)));

        let kitchen = checks.iter().find(|c| c.path == "/devices/kitchen").expect("kitchen");
        assert_eq!(kitchen.body, Some(json!({"kitchen": "on"})));

        let usage = checks.iter().find(|c| c.name == "Cooler usage").expect("usage");
        assert!(!usage.ok);
        assert_eq!(usage.path, "/cooler/usage?interval=week");
        assert!(usage.error.as_deref().unwrap_or("").contains("connection refused"));

        assert_eq!(checks.iter().filter(|c| c.ok).count(), 3);
    }
}
