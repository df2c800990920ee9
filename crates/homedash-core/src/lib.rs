pub mod client;
pub mod config;
pub mod device;
pub mod health;
pub mod mock;
pub mod poller;
pub mod screens;
pub mod snapshot;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiError, HttpClient, SmartHomeApi};
pub use config::{ClientConfig, ConfigError, PollerConfig};
pub use device::{DeviceController, DeviceToggle, FailurePolicy, ToggleError, ToggleOutcome, TogglePhase};
pub use health::{check_all, check_endpoint, Endpoint, EndpointCheck};
pub use mock::MockData;
pub use poller::{poll_once, LivePoller};
pub use screens::{load_history, load_stats, ScreenSource, StatsReport};
pub use snapshot::{DeviceState, PollState, StatusPayload, StatusSnapshot};
pub use types::{AggregateStat, DeviceKey, Sensor, StatsInterval, TimeSeriesPoint, UsageStat};
