use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::snapshot::DeviceState;
use crate::types::{
    AggregateStat, DeviceKey, HistoryResponse, Sensor, StatsInterval, StatsResponse,
    TimeSeriesPoint, UsageResponse, UsageStat,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http error: status {status}")]
    Http { status: u16 },
    #[error("unexpected response shape: {0}")]
    Shape(String),
}

impl ApiError {
    /// Transport and HTTP failures switch the poller to mock data; shape errors do not.
    pub fn is_fallback_trigger(&self) -> bool {
        matches!(self, ApiError::Transport(_) | ApiError::Http { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return ApiError::Http {
                status: status.as_u16(),
            };
        }
        if err.is_decode() {
            return ApiError::Shape(err.to_string());
        }
        ApiError::Transport(err.to_string())
    }
}

/// The backend surface the dashboard talks to. Every call issues exactly one request.
#[async_trait]
pub trait SmartHomeApi: Send + Sync {
    async fn get_status(&self) -> Result<serde_json::Value, ApiError>;
    async fn get_sensor_value(&self, sensor: Sensor) -> Result<serde_json::Value, ApiError>;
    async fn get_sensor_history(&self, sensor: Sensor) -> Result<Vec<TimeSeriesPoint>, ApiError>;
    async fn get_sensor_stats(
        &self,
        sensor: Sensor,
        interval: StatsInterval,
    ) -> Result<Vec<AggregateStat>, ApiError>;
    async fn get_device_state(&self, device: DeviceKey) -> Result<DeviceState, ApiError>;
    async fn set_device_state(
        &self,
        device: DeviceKey,
        state: DeviceState,
    ) -> Result<serde_json::Value, ApiError>;
    async fn get_cooler_usage(&self, interval: StatsInterval) -> Result<Vec<UsageStat>, ApiError>;
    async fn get_cooler_energy(&self, interval: StatsInterval)
        -> Result<serde_json::Value, ApiError>;
}

pub struct HttpClient {
    http: Client,
    base_url: String,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|err| ApiError::Transport(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(url = %response.url(), status = status.as_u16(), "response");
        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, ApiError> {
        let response = self.send(self.http.get(self.url(path))).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| ApiError::Shape(err.to_string()))
    }

    async fn get_typed<T: DeserializeOwned + Send>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.get_json(path).await?;
        serde_json::from_value(body).map_err(|err| ApiError::Shape(err.to_string()))
    }
}

#[async_trait]
impl SmartHomeApi for HttpClient {
    async fn get_status(&self) -> Result<serde_json::Value, ApiError> {
        self.get_json("status").await
    }

    async fn get_sensor_value(&self, sensor: Sensor) -> Result<serde_json::Value, ApiError> {
        self.get_json(sensor.history_segment()).await
    }

    async fn get_sensor_history(&self, sensor: Sensor) -> Result<Vec<TimeSeriesPoint>, ApiError> {
        let body: HistoryResponse = self
            .get_typed(&format!("{}/history", sensor.history_segment()))
            .await?;
        Ok(body.history)
    }

    async fn get_sensor_stats(
        &self,
        sensor: Sensor,
        interval: StatsInterval,
    ) -> Result<Vec<AggregateStat>, ApiError> {
        let body: StatsResponse = self
            .get_typed(&format!("{}/stats?interval={interval}", sensor.stats_segment()))
            .await?;
        Ok(body.stats)
    }

    async fn get_device_state(&self, device: DeviceKey) -> Result<DeviceState, ApiError> {
        let body = self.get_json(&format!("devices/{device}")).await?;
        device_state_from_body(device, body)
    }

    async fn set_device_state(
        &self,
        device: DeviceKey,
        state: DeviceState,
    ) -> Result<serde_json::Value, ApiError> {
        let request = self
            .http
            .post(self.url(&format!("devices/{device}")))
            .json(&json!({ "state": state }));
        let response = self.send(request).await?;
        response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| ApiError::Shape(err.to_string()))
    }

    async fn get_cooler_usage(&self, interval: StatsInterval) -> Result<Vec<UsageStat>, ApiError> {
        let body: UsageResponse = self
            .get_typed(&format!("cooler/usage?interval={interval}"))
            .await?;
        Ok(body.usage)
    }

    async fn get_cooler_energy(
        &self,
        interval: StatsInterval,
    ) -> Result<serde_json::Value, ApiError> {
        self.get_json(&format!("cooler/energy?interval={interval}"))
            .await
    }
}

/// Extracts `{ "<key>": "on"|... }` from a device endpoint body; anything but "on" is off.
pub fn device_state_from_body(
    device: DeviceKey,
    body: serde_json::Value,
) -> Result<DeviceState, ApiError> {
    let value = body
        .get(device.as_str())
        .ok_or_else(|| ApiError::Shape(format!("missing key {device}")))?;
    Ok(value
        .as_str()
        .map(DeviceState::from_reported)
        .unwrap_or(DeviceState::Off))
}
