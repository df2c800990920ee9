use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use homedash_core::{
    check_all, poll_once, ClientConfig, DeviceController, DeviceKey, DeviceState, FailurePolicy, HttpClient,
    LivePoller, MockData, PollState, PollerConfig, ScreenSource, Sensor, SmartHomeApi,
    StatsInterval, ToggleOutcome,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod render;
mod viewer;

#[derive(Debug, Parser)]
#[command(name = "homedash")]
#[command(about = "Smart home dashboard: live status, device control and sensor statistics")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(long, default_value = homedash_core::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,

    /// Per-request timeout; the transport default applies when omitted.
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long, default_value_t = 400.0)]
    gas_alert_ppm: f64,

    /// Keep the optimistic device state on screen when a command fails.
    #[arg(long)]
    keep_optimistic: bool,

    /// Serve history and statistics from placeholder data instead of the backend.
    #[arg(long)]
    demo: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    Status {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Watch {
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Read {
        sensor: Sensor,
    },
    Devices,
    Set {
        device: DeviceKey,
        state: DeviceState,
    },
    History {
        sensor: Sensor,
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Stats {
        #[arg(long, default_value = "day")]
        interval: StatsInterval,
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    Energy {
        #[arg(long, default_value = "day")]
        interval: StatsInterval,
    },
    Check {
        #[arg(long, default_value = "day")]
        interval: StatsInterval,
        #[arg(long, value_enum, default_value = "human")]
        format: OutputFormat,
    },
    View,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Ndjson,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let client_config = ClientConfig {
        base_url: cli.base_url.clone(),
        request_timeout: cli.timeout_ms.map(Duration::from_millis),
    };
    let poller_config = PollerConfig {
        interval: Duration::from_millis(cli.interval_ms),
        gas_alert_ppm: cli.gas_alert_ppm,
    };
    poller_config.validate()?;

    let policy = if cli.keep_optimistic {
        FailurePolicy::KeepOptimistic
    } else {
        FailurePolicy::Rollback
    };

    let api: Arc<dyn SmartHomeApi> = Arc::new(HttpClient::new(&client_config)?);
    let mock = MockData::default();
    let source = ScreenSource::new(api.clone(), cli.demo.then(|| mock.clone()));

    match cli.command {
        Command::Status { format } => {
            let state = poll_once(api.as_ref(), &mock).await;
            print_state(&state, format, poller_config.gas_alert_ppm)?;
        }
        Command::Watch { format } => {
            watch_loop(api, mock, poller_config, format).await?;
        }
        Command::Read { sensor } => {
            let body = api.get_sensor_value(sensor).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Devices => {
            let mut controller = DeviceController::new(api, policy);
            let failures = controller.refresh().await;
            print_lines(render::device_lines(&controller.states(), &failures));
        }
        Command::Set { device, state } => {
            let mut controller = DeviceController::new(api, policy);
            match controller.set(device, state).await? {
                ToggleOutcome::Committed(state) => println!("{device} -> {state}"),
                ToggleOutcome::Failed { alert, .. } => bail!(alert),
            }
        }
        Command::History { sensor, format } => {
            let points = source.history(sensor).await;
            match format {
                OutputFormat::Human => print_lines(render::history_lines(sensor, &points)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&points)?),
                OutputFormat::Ndjson => {
                    for point in &points {
                        println!("{}", serde_json::to_string(point)?);
                    }
                }
            }
        }
        Command::Stats { interval, format } => {
            let report = source.stats(interval).await;
            match format {
                OutputFormat::Human => print_lines(render::stats_lines(&report)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Ndjson => println!("{}", serde_json::to_string(&report)?),
            }
        }
        Command::Energy { interval } => {
            let body = api.get_cooler_energy(interval).await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Command::Check { interval, format } => {
            let checks = check_all(api.as_ref(), interval).await;
            match format {
                OutputFormat::Human => print_lines(render::check_lines(&checks)),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&checks)?),
                OutputFormat::Ndjson => {
                    for check in &checks {
                        println!("{}", serde_json::to_string(check)?);
                    }
                }
            }
        }
        Command::View => {
            let mut poller = LivePoller::spawn(api.clone(), mock, poller_config.clone())?;
            let controller = DeviceController::new(api.clone(), policy);
            let result = viewer::run_viewer(&poller, controller, source, &poller_config).await;
            poller.stop();
            result?;
        }
    }

    Ok(())
}

async fn watch_loop(
    api: Arc<dyn SmartHomeApi>,
    mock: MockData,
    config: PollerConfig,
    format: OutputFormat,
) -> Result<()> {
    let gas_alert_ppm = config.gas_alert_ppm;
    let mut poller = LivePoller::spawn(api, mock, config)?;
    let mut updates = poller.subscribe();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                warn!("received ctrl-c, stopping");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_state(&state, format, gas_alert_ppm)?;
                info!(tick = state.tick, mock = state.is_mock, "tick");
            }
        }
    }

    poller.stop();
    Ok(())
}

fn print_state(state: &PollState, format: OutputFormat, gas_alert_ppm: f64) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(state)?),
        OutputFormat::Ndjson => println!("{}", serde_json::to_string(state)?),
        OutputFormat::Human => print_lines(render::poll_state_lines(state, gas_alert_ppm)),
    }
    Ok(())
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}
