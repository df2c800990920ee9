use std::collections::BTreeMap;

use homedash_core::{
    ApiError, DeviceKey, DeviceState, EndpointCheck, PollState, Sensor, StatsReport, StatusPayload, TimeSeriesPoint,
};

pub fn on_off(state: Option<DeviceState>) -> &'static str {
    match state {
        Some(DeviceState::On) => "ON",
        Some(DeviceState::Off) => "OFF",
        None => "?",
    }
}

pub fn reading(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v} {unit}"),
        None => "n/a".to_string(),
    }
}

pub fn poll_state_lines(state: &PollState, gas_alert_ppm: f64) -> Vec<String> {
    let mut lines = vec!["=== Smart Home ===".to_string()];

    let updated = state
        .updated_at
        .map(|ts| ts.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    lines.push(format!(
        "Tick:        {} updated={} source={}",
        state.tick,
        updated,
        if state.is_mock { "DEMO" } else { "live" }
    ));
    if let Some(err) = &state.last_error {
        lines.push(format!("Last error:  {err}"));
    }

    match &state.latest {
        None => lines.push("Loading data...".to_string()),
        Some(StatusPayload::Malformed { reason }) => {
            lines.push(format!("Error: invalid data structure ({reason})"));
        }
        Some(StatusPayload::Valid(snapshot)) => {
            if let Some(ppm) = snapshot.gas_alert(gas_alert_ppm) {
                lines.push(format!("DANGER: gas above limit ({ppm} ppm)!"));
            }
            lines.push(format!(
                "Sensors:     temperature={} humidity={} gas={}",
                reading(snapshot.temperature(), Sensor::Temperature.unit()),
                reading(snapshot.humidity(), Sensor::Humidity.unit()),
                reading(snapshot.gas(), Sensor::Gas.unit()),
            ));
            let devices = DeviceKey::ALL
                .iter()
                .map(|key| format!("{key}={}", on_off(snapshot.device(key.as_str()))))
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(format!("Devices:     {devices}"));
        }
    }

    lines
}

pub fn history_lines(sensor: Sensor, points: &[TimeSeriesPoint]) -> Vec<String> {
    let mut lines = vec![format!("=== {} history ===", sensor.label())];
    if points.is_empty() {
        lines.push(format!("No data for {}!", sensor.label().to_lowercase()));
        return lines;
    }
    for point in points {
        lines.push(format!("{:<28} {:>8.2} {}", point.timestamp, point.value, sensor.unit()));
    }
    lines
}

pub fn stats_lines(report: &StatsReport) -> Vec<String> {
    let mut lines = vec![format!("=== Statistics ({}) ===", report.interval)];

    for sensor in Sensor::ALL {
        lines.push(format!("{} ({}):", sensor.label(), sensor.unit()));
        let stats = report.sensor(sensor);
        if stats.is_empty() {
            lines.push(format!("  No data for {}!", sensor.label().to_lowercase()));
            continue;
        }
        for stat in stats {
            lines.push(format!(
                "  {:<12} avg={:>8.2} min={:>8.2} max={:>8.2}",
                stat.label, stat.avg, stat.min, stat.max
            ));
        }
    }

    lines.push("Cooler usage:".to_string());
    if report.cooler.is_empty() {
        lines.push("  No data for cooler!".to_string());
    }
    for usage in &report.cooler {
        lines.push(format!(
            "  {:<12} hours={:>6.2} cost={:>6.2}",
            usage.label, usage.hours, usage.cost
        ));
    }

    lines
}

pub fn device_lines(
    states: &BTreeMap<DeviceKey, DeviceState>,
    failures: &[(DeviceKey, ApiError)],
) -> Vec<String> {
    let mut lines = vec!["=== Devices ===".to_string()];
    for (idx, key) in DeviceKey::ALL.iter().enumerate() {
        let failure = failures
            .iter()
            .find(|(failed, _)| failed == key)
            .map(|(_, err)| format!("  (unreadable: {err})"))
            .unwrap_or_default();
        lines.push(format!(
            "[{}] {:<18} {}{}",
            idx + 1,
            key.display_name(),
            on_off(states.get(key).copied()),
            failure
        ));
    }
    lines
}

pub fn check_lines(checks: &[EndpointCheck]) -> Vec<String> {
    let mut lines = vec!["=== Endpoint check ===".to_string()];
    for check in checks {
        let outcome = match &check.error {
            None => "ok".to_string(),
            Some(err) => format!("error: {err}"),
        };
        lines.push(format!(
            "[{}] {:<22} {:<36} {:>6} ms  {}",
            if check.ok { " ok " } else { "FAIL" },
            check.name,
            check.path,
            check.elapsed_ms,
            outcome
        ));
    }
    let ok = checks.iter().filter(|c| c.ok).count();
    lines.push(format!("Succeeded: {ok}/{}", checks.len()));
    lines.push(format!("Failed:    {}/{}", checks.len() - ok, checks.len()));
    lines
}
