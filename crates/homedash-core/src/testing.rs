use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::client::{ApiError, SmartHomeApi};
use crate::snapshot::DeviceState;
use crate::types::{AggregateStat, DeviceKey, Sensor, StatsInterval, TimeSeriesPoint, UsageStat};

/// In-memory backend that replays scripted responses. Anything unscripted is unreachable.
pub(crate) struct ScriptedApi {
    status: Mutex<VecDeque<Result<serde_json::Value, ApiError>>>,
    devices: Mutex<BTreeMap<DeviceKey, Result<DeviceState, ApiError>>>,
    set_results: Mutex<VecDeque<Result<serde_json::Value, ApiError>>>,
    set_calls: Mutex<Vec<(DeviceKey, DeviceState)>>,
    history: Mutex<BTreeMap<&'static str, Vec<TimeSeriesPoint>>>,
    stats: Mutex<BTreeMap<&'static str, Vec<AggregateStat>>>,
    usage: Mutex<Option<Vec<UsageStat>>>,
    delay: Duration,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn unreachable() -> ApiError {
    ApiError::Transport("connection refused".to_string())
}

impl ScriptedApi {
    pub(crate) fn new() -> Self {
        Self {
            status: Mutex::new(VecDeque::new()),
            devices: Mutex::new(BTreeMap::new()),
            set_results: Mutex::new(VecDeque::new()),
            set_calls: Mutex::new(Vec::new()),
            history: Mutex::new(BTreeMap::new()),
            stats: Mutex::new(BTreeMap::new()),
            usage: Mutex::new(None),
            delay: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_status(self, script: Vec<Result<serde_json::Value, ApiError>>) -> Self {
        *self.status.lock().unwrap() = script.into();
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_device(self, key: DeviceKey, state: Result<DeviceState, ApiError>) -> Self {
        self.devices.lock().unwrap().insert(key, state);
        self
    }

    pub(crate) fn with_set_results(self, script: Vec<Result<serde_json::Value, ApiError>>) -> Self {
        *self.set_results.lock().unwrap() = script.into();
        self
    }

    pub(crate) fn with_history(self, sensor: Sensor, points: Vec<TimeSeriesPoint>) -> Self {
        self.history.lock().unwrap().insert(sensor.history_segment(), points);
        self
    }

    pub(crate) fn with_stats(self, sensor: Sensor, stats: Vec<AggregateStat>) -> Self {
        self.stats.lock().unwrap().insert(sensor.stats_segment(), stats);
        self
    }

    pub(crate) fn with_usage(self, usage: Vec<UsageStat>) -> Self {
        *self.usage.lock().unwrap() = Some(usage);
        self
    }

    pub(crate) fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn set_calls(&self) -> Vec<(DeviceKey, DeviceState)> {
        self.set_calls.lock().unwrap().clone()
    }

    async fn simulate_latency(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[async_trait]
impl SmartHomeApi for ScriptedApi {
    async fn get_status(&self) -> Result<serde_json::Value, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        self.simulate_latency().await;
        let next = self.status.lock().unwrap().pop_front();

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next.unwrap_or_else(|| Err(unreachable()))
    }

    async fn get_sensor_value(&self, _sensor: Sensor) -> Result<serde_json::Value, ApiError> {
        Err(unreachable())
    }

    async fn get_sensor_history(&self, sensor: Sensor) -> Result<Vec<TimeSeriesPoint>, ApiError> {
        self.history
            .lock()
            .unwrap()
            .get(sensor.history_segment())
            .cloned()
            .ok_or_else(unreachable)
    }

    async fn get_sensor_stats(
        &self,
        sensor: Sensor,
        _interval: StatsInterval,
    ) -> Result<Vec<AggregateStat>, ApiError> {
        self.stats
            .lock()
            .unwrap()
            .get(sensor.stats_segment())
            .cloned()
            .ok_or_else(unreachable)
    }

    async fn get_device_state(&self, device: DeviceKey) -> Result<DeviceState, ApiError> {
        self.devices
            .lock()
            .unwrap()
            .get(&device)
            .cloned()
            .unwrap_or_else(|| Err(unreachable()))
    }

    async fn set_device_state(
        &self,
        device: DeviceKey,
        state: DeviceState,
    ) -> Result<serde_json::Value, ApiError> {
        self.set_calls.lock().unwrap().push((device, state));
        self.simulate_latency().await;
        self.set_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                let mut echo = serde_json::Map::new();
                echo.insert(device.to_string(), json!(state));
                Ok(serde_json::Value::Object(echo))
            })
    }

    async fn get_cooler_usage(&self, _interval: StatsInterval) -> Result<Vec<UsageStat>, ApiError> {
        self.usage.lock().unwrap().clone().ok_or_else(unreachable)
    }

    async fn get_cooler_energy(
        &self,
        _interval: StatsInterval,
    ) -> Result<serde_json::Value, ApiError> {
        Err(unreachable())
    }
}
