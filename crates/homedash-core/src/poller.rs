use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{ApiError, SmartHomeApi};
use crate::config::{ConfigError, PollerConfig};
use crate::mock::MockData;
use crate::snapshot::{PollState, StatusPayload};

pub fn next_state(tick: u64, result: Result<serde_json::Value, ApiError>, mock: &MockData) -> PollState {
    let (latest, is_mock, last_error) = match result {
        Ok(body) => (StatusPayload::from_body(body), false, None),
        Err(err) if err.is_fallback_trigger() => {
            (StatusPayload::Valid(mock.status()), true, Some(err.to_string()))
        }
        Err(err) => (
            StatusPayload::Malformed {
                reason: err.to_string(),
            },
            false,
            Some(err.to_string()),
        ),
    };

    PollState {
        latest: Some(latest),
        is_mock,
        tick,
        updated_at: Some(Utc::now()),
        last_error,
    }
}

pub async fn poll_once(api: &dyn SmartHomeApi, mock: &MockData) -> PollState {
    next_state(1, api.get_status().await, mock)
}

struct Publisher {
    sender: Mutex<Option<watch::Sender<PollState>>>,
}

impl Publisher {
    fn lock(&self) -> MutexGuard<'_, Option<watch::Sender<PollState>>> {
        self.sender.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, state: PollState) -> bool {
        match self.lock().as_ref() {
            Some(sender) => {
                sender.send_replace(state);
                true
            }
            None => false,
        }
    }

    fn revoke(&self) {
        self.lock().take();
    }
}

pub struct LivePoller {
    state_rx: watch::Receiver<PollState>,
    publisher: Arc<Publisher>,
    cancel_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl LivePoller {
    /// Starts polling immediately; must be called inside a tokio runtime.
    pub fn spawn(
        api: Arc<dyn SmartHomeApi>,
        mock: MockData,
        config: PollerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let (state_tx, state_rx) = watch::channel(PollState::empty());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let publisher = Arc::new(Publisher {
            sender: Mutex::new(Some(state_tx)),
        });

        info!(interval_ms = %config.interval.as_millis(), "starting live status poller");
        let task = tokio::spawn(run(api, mock, config, publisher.clone(), cancel_rx));

        Ok(Self {
            state_rx,
            publisher,
            cancel_tx,
            task: Some(task),
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state_rx.clone()
    }

    pub fn current(&self) -> PollState {
        self.state_rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// No state is applied after this returns; an in-flight request is dropped.
    pub fn stop(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        self.publisher.revoke();
        let _ = self.cancel_tx.send(true);
        task.abort();
        info!("live status poller stopped");
    }
}

impl Drop for LivePoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run(
    api: Arc<dyn SmartHomeApi>,
    mock: MockData,
    config: PollerConfig,
    publisher: Arc<Publisher>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval(config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut tick = 0_u64;

    loop {
        tokio::select! {
            _ = cancel_rx.changed() => break,
            _ = ticker.tick() => {}
        }
        tick += 1;

        let result = tokio::select! {
            _ = cancel_rx.changed() => break,
            result = api.get_status() => result,
        };

        let state = next_state(tick, result, &mock);
        if state.is_mock {
            warn!(tick, error = state.last_error.as_deref().unwrap_or(""), "status fetch failed, using mock data");
        } else if let Some(StatusPayload::Malformed { reason }) = &state.latest {
            warn!(tick, %reason, "status response has unexpected shape");
        } else {
            debug!(tick, "status fetched");
        }

        if !publisher.publish(state) {
            break;
        }
    }
}
