use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::client::{ApiError, SmartHomeApi};
use crate::snapshot::DeviceState;
use crate::types::DeviceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Rollback,
    KeepOptimistic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TogglePhase {
    Idle,
    Pending { previous: DeviceState },
    Committed,
    RolledBack { error: String },
}

#[derive(Debug, Error, PartialEq)]
pub enum ToggleError {
    #[error("{0} already has a command in flight")]
    AlreadyPending(DeviceKey),
    #[error("{0} has no command in flight")]
    NotPending(DeviceKey),
    #[error("{0} is not managed by this controller")]
    Unknown(DeviceKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Committed(DeviceState),
    Failed { shown: DeviceState, alert: String },
}

#[derive(Debug, Clone)]
pub struct DeviceToggle {
    key: DeviceKey,
    displayed: DeviceState,
    phase: TogglePhase,
}

impl DeviceToggle {
    pub fn new(key: DeviceKey, state: DeviceState) -> Self {
        Self {
            key,
            displayed: state,
            phase: TogglePhase::Idle,
        }
    }

    pub fn displayed(&self) -> DeviceState {
        self.displayed
    }

    pub fn phase(&self) -> &TogglePhase {
        &self.phase
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, TogglePhase::Pending { .. })
    }

    pub fn begin(&mut self, target: DeviceState) -> Result<(), ToggleError> {
        if self.is_pending() {
            return Err(ToggleError::AlreadyPending(self.key));
        }
        self.phase = TogglePhase::Pending {
            previous: self.displayed,
        };
        self.displayed = target;
        Ok(())
    }

    pub fn commit(&mut self) -> Result<DeviceState, ToggleError> {
        if !self.is_pending() {
            return Err(ToggleError::NotPending(self.key));
        }
        self.phase = TogglePhase::Committed;
        Ok(self.displayed)
    }

    /// Finishes a failed command and returns the alert to show, exactly once.
    pub fn fail(&mut self, error: &ApiError, policy: FailurePolicy) -> Result<String, ToggleError> {
        let TogglePhase::Pending { previous } = self.phase else {
            return Err(ToggleError::NotPending(self.key));
        };

        match policy {
            FailurePolicy::Rollback => {
                self.displayed = previous;
                self.phase = TogglePhase::RolledBack {
                    error: error.to_string(),
                };
            }
            FailurePolicy::KeepOptimistic => {
                self.phase = TogglePhase::Committed;
            }
        }

        Ok(format!(
            "Could not send the command to {}: {error}",
            self.key.display_name()
        ))
    }

    pub fn sync(&mut self, state: DeviceState) {
        if !self.is_pending() {
            self.displayed = state;
            self.phase = TogglePhase::Idle;
        }
    }
}

pub struct DeviceController {
    api: Arc<dyn SmartHomeApi>,
    policy: FailurePolicy,
    toggles: BTreeMap<DeviceKey, DeviceToggle>,
}

impl DeviceController {
    pub fn new(api: Arc<dyn SmartHomeApi>, policy: FailurePolicy) -> Self {
        let toggles = DeviceKey::ALL
            .into_iter()
            .map(|key| (key, DeviceToggle::new(key, DeviceState::Off)))
            .collect();

        Self {
            api,
            policy,
            toggles,
        }
    }

    pub fn toggle_state(&self, key: DeviceKey) -> &DeviceToggle {
        &self.toggles[&key]
    }

    pub fn states(&self) -> BTreeMap<DeviceKey, DeviceState> {
        self.toggles
            .iter()
            .map(|(key, toggle)| (*key, toggle.displayed()))
            .collect()
    }

    /// Reads every device; a device that cannot be read is shown as off.
    pub async fn refresh(&mut self) -> Vec<(DeviceKey, ApiError)> {
        let mut failures = Vec::new();
        for key in DeviceKey::ALL {
            let state = match self.api.get_device_state(key).await {
                Ok(state) => state,
                Err(err) => {
                    warn!(device = %key, error = %err, "failed to read device state");
                    failures.push((key, err));
                    DeviceState::Off
                }
            };
            if let Some(toggle) = self.toggles.get_mut(&key) {
                toggle.sync(state);
            }
        }
        failures
    }

    pub async fn toggle(&mut self, key: DeviceKey) -> Result<ToggleOutcome, ToggleError> {
        let target = self
            .toggles
            .get(&key)
            .ok_or(ToggleError::Unknown(key))?
            .displayed()
            .toggled();
        self.set(key, target).await
    }

    pub async fn set(
        &mut self,
        key: DeviceKey,
        target: DeviceState,
    ) -> Result<ToggleOutcome, ToggleError> {
        let policy = self.policy;
        let toggle = self
            .toggles
            .get_mut(&key)
            .ok_or(ToggleError::Unknown(key))?;
        toggle.begin(target)?;

        match self.api.set_device_state(key, target).await {
            Ok(_) => {
                let state = toggle.commit()?;
                info!(device = %key, %state, "device command accepted");
                Ok(ToggleOutcome::Committed(state))
            }
            Err(err) => {
                warn!(device = %key, error = %err, ?policy, "device command failed");
                let alert = toggle.fail(&err, policy)?;
                Ok(ToggleOutcome::Failed {
                    shown: toggle.displayed(),
                    alert,
                })
            }
        }
    }
}
