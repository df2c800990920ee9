use std::io;
use std::time::Duration;

use anyhow::Result;
use chrono::DateTime;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use homedash_core::{
    DeviceController, DeviceKey, LivePoller, PollState, PollerConfig, ScreenSource, Sensor,
    StatsInterval, StatsReport, StatusPayload, StatusSnapshot, TimeSeriesPoint,
    ToggleOutcome, TogglePhase,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Dataset, Paragraph};
use ratatui::Terminal;
use tokio::sync::watch;

use crate::render::{on_off, reading};

const SENSOR_COLORS: [(Sensor, Color); 3] = [
    (Sensor::Temperature, Color::Blue),
    (Sensor::Humidity, Color::Cyan),
    (Sensor::Gas, Color::Yellow),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Home,
    Graphs,
    Stats,
    Devices,
}

impl Screen {
    fn next(self) -> Self {
        match self {
            Screen::Home => Screen::Graphs,
            Screen::Graphs => Screen::Stats,
            Screen::Stats => Screen::Devices,
            Screen::Devices => Screen::Home,
        }
    }

    fn title(self) -> &'static str {
        match self {
            Screen::Home => "Home",
            Screen::Graphs => "Graphs",
            Screen::Stats => "Statistics",
            Screen::Devices => "Devices",
        }
    }
}

struct ViewerState {
    screen: Screen,
    poll: PollState,
    sensor: Sensor,
    history: Vec<TimeSeriesPoint>,
    interval: StatsInterval,
    stats: StatsReport,
    alert: Option<String>,
}

impl ViewerState {
    fn new() -> Self {
        Self {
            screen: Screen::Home,
            poll: PollState::empty(),
            sensor: Sensor::Temperature,
            history: Vec::new(),
            interval: StatsInterval::Day,
            stats: StatsReport::default(),
            alert: None,
        }
    }

    fn sensor_color(&self, sensor: Sensor) -> Color {
        SENSOR_COLORS
            .iter()
            .find(|(s, _)| *s == sensor)
            .map(|(_, c)| *c)
            .unwrap_or(Color::White)
    }
}

fn next_sensor(sensor: Sensor, forward: bool) -> Sensor {
    let all = Sensor::ALL;
    let idx = all.iter().position(|s| *s == sensor).unwrap_or(0);
    let next = if forward { idx + 1 } else { idx + all.len() - 1 };
    all[next % all.len()]
}

pub async fn run_viewer(
    poller: &LivePoller,
    mut controller: DeviceController,
    source: ScreenSource,
    config: &PollerConfig,
) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut updates: watch::Receiver<PollState> = poller.subscribe();
    let mut state = ViewerState::new();

    let run_result = async {
        controller.refresh().await;
        state.history = source.history(state.sensor).await;
        state.stats = source.stats(state.interval).await;

        loop {
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => break,
                        KeyCode::Tab => state.screen = state.screen.next(),
                        KeyCode::Char('h') => state.screen = Screen::Home,
                        KeyCode::Char('g') => state.screen = Screen::Graphs,
                        KeyCode::Char('s') => state.screen = Screen::Stats,
                        KeyCode::Char('d') => state.screen = Screen::Devices,
                        KeyCode::Left | KeyCode::Right if state.screen == Screen::Graphs => {
                            state.sensor = next_sensor(state.sensor, key.code == KeyCode::Right);
                            state.history = source.history(state.sensor).await;
                        }
                        KeyCode::Char('i') if state.screen == Screen::Stats => {
                            state.interval = state.interval.next();
                            state.stats = source.stats(state.interval).await;
                        }
                        KeyCode::Char('r') => match state.screen {
                            Screen::Graphs => state.history = source.history(state.sensor).await,
                            Screen::Stats => state.stats = source.stats(state.interval).await,
                            Screen::Devices => {
                                controller.refresh().await;
                            }
                            Screen::Home => {}
                        },
                        KeyCode::Char(c @ '1'..='4') => {
                            let idx = (c as usize) - ('1' as usize);
                            let device = DeviceKey::ALL[idx];
                            state.alert = match controller.toggle(device).await? {
                                ToggleOutcome::Committed(_) => None,
                                ToggleOutcome::Failed { alert, .. } => Some(alert),
                            };
                        }
                        _ => {}
                    }
                }
            }

            if updates.has_changed().unwrap_or(false) {
                state.poll = updates.borrow_and_update().clone();
            }

            terminal.draw(|frame| draw_ui(frame.size(), frame, &state, &controller, config))?;
        }

        Ok::<(), anyhow::Error>(())
    }
    .await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    run_result
}

fn draw_ui(
    area: Rect,
    frame: &mut ratatui::Frame<'_>,
    state: &ViewerState,
    controller: &DeviceController,
    config: &PollerConfig,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    frame.render_widget(render_header(state, config), rows[0]);

    match state.screen {
        Screen::Home => draw_home(frame, rows[1], state),
        Screen::Graphs => draw_graphs(frame, rows[1], state),
        Screen::Stats => draw_stats(frame, rows[1], state),
        Screen::Devices => draw_devices(frame, rows[1], state, controller),
    }
}

fn render_header(state: &ViewerState, config: &PollerConfig) -> Paragraph<'static> {
    let mut first = vec![Span::styled(
        "Smart Home  ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    if state.poll.is_mock {
        first.push(Span::styled(
            " DEMO ",
            Style::default().fg(Color::Black).bg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
        first.push(Span::raw(" "));
    }
    let updated = state
        .poll
        .updated_at
        .map(|ts| ts.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    first.push(Span::raw(format!(
        "[{}] tick={} updated={}  (tab: screens, 1-4: toggle, q: quit)",
        state.screen.title(),
        state.poll.tick,
        updated
    )));

    let second = match (
        state.poll.snapshot().and_then(|s| s.gas_alert(config.gas_alert_ppm)),
        &state.alert,
    ) {
        (Some(ppm), _) => Line::from(Span::styled(
            format!("DANGER: gas above limit ({ppm} ppm)!"),
            Style::default().fg(Color::White).bg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        (None, Some(alert)) => Line::from(Span::styled(alert.clone(), Style::default().fg(Color::Red))),
        (None, None) => Line::from(" "),
    };

    Paragraph::new(vec![Line::from(first), second])
        .block(Block::default().borders(Borders::ALL).title("Status"))
}

fn draw_home(frame: &mut ratatui::Frame<'_>, area: Rect, state: &ViewerState) {
    let snapshot: &StatusSnapshot = match &state.poll.latest {
        Some(StatusPayload::Valid(snapshot)) => snapshot,
        Some(StatusPayload::Malformed { reason }) => {
            let body = Paragraph::new(vec![
                Line::from("Loading data..."),
                Line::from(Span::styled(
                    format!("Error: invalid data structure ({reason})"),
                    Style::default().fg(Color::Red),
                )),
            ]);
            frame.render_widget(body, area);
            return;
        }
        None => {
            frame.render_widget(Paragraph::new("Loading data..."), area);
            return;
        }
    };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Length(5), Constraint::Min(0)])
        .split(area);

    let sensor_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(rows[0]);
    let values = [snapshot.temperature(), snapshot.humidity(), snapshot.gas()];
    for (idx, sensor) in Sensor::ALL.into_iter().enumerate() {
        let color = state.sensor_color(sensor);
        let card = Paragraph::new(Line::from(Span::styled(
            reading(values[idx], sensor.unit()),
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(sensor.label()),
        );
        frame.render_widget(card, sensor_cols[idx]);
    }

    let device_cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4])
        .split(rows[1]);
    for (idx, key) in DeviceKey::ALL.into_iter().enumerate() {
        let device = snapshot.device(key.as_str());
        let color = if device.is_some_and(|d| d.is_on()) {
            Color::Green
        } else {
            Color::DarkGray
        };
        let card = Paragraph::new(on_off(device)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(key.display_name()),
        );
        frame.render_widget(card, device_cols[idx]);
    }
}

fn short_time(timestamp: &str) -> String {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|ts| ts.format("%H:%M").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

fn draw_graphs(frame: &mut ratatui::Frame<'_>, area: Rect, state: &ViewerState) {
    let sensor = state.sensor;
    let title = format!("{} history ({})  <-/->: sensor", sensor.label(), sensor.unit());

    if state.history.is_empty() {
        let body = Paragraph::new(Span::styled(
            format!("No data for {}!", sensor.label().to_lowercase()),
            Style::default().fg(Color::Red),
        ))
        .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(body, area);
        return;
    }

    let points: Vec<(f64, f64)> = state
        .history
        .iter()
        .enumerate()
        .map(|(idx, p)| (idx as f64, p.value))
        .collect();
    let y_bounds = value_bounds(&points);
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let first = state.history.first().map(|p| short_time(&p.timestamp)).unwrap_or_default();
    let last = state.history.last().map(|p| short_time(&p.timestamp)).unwrap_or_default();

    let dataset = Dataset::default()
        .name(sensor.label())
        .marker(symbols::Marker::Braille)
        .graph_type(ratatui::widgets::GraphType::Line)
        .style(Style::default().fg(state.sensor_color(sensor)))
        .data(&points);

    let chart = Chart::new(vec![dataset])
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(
            Axis::default()
                .title("time")
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(vec![Span::raw(first), Span::raw(last)]),
        )
        .y_axis(
            Axis::default()
                .title(sensor.unit())
                .style(Style::default().fg(Color::Gray))
                .bounds(y_bounds)
                .labels(vec![
                    Span::raw(format!("{:.1}", y_bounds[0])),
                    Span::raw(format!("{:.1}", (y_bounds[0] + y_bounds[1]) / 2.0)),
                    Span::raw(format!("{:.1}", y_bounds[1])),
                ]),
        );

    frame.render_widget(chart, area);
}

fn value_bounds(points: &[(f64, f64)]) -> [f64; 2] {
    if points.is_empty() {
        return [0.0, 1.0];
    }
    let mut min = f64::MAX;
    let mut max = f64::MIN;
    for (_, y) in points {
        min = min.min(*y);
        max = max.max(*y);
    }
    if (max - min).abs() < f64::EPSILON {
        [min - 1.0, max + 1.0]
    } else {
        let pad = (max - min) * 0.12;
        [min - pad, max + pad]
    }
}

fn draw_stats(frame: &mut ratatui::Frame<'_>, area: Rect, state: &ViewerState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Ratio(1, 3); 3])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2); 2])
        .split(rows[0]);
    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2); 2])
        .split(rows[1]);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 2); 2])
        .split(rows[2]);

    let interval = state.stats.interval;
    let sensor_areas = [top[0], top[1], middle[0]];
    for (sensor, area) in Sensor::ALL.into_iter().zip(sensor_areas) {
        let bars: Vec<(String, f64)> = state
            .stats
            .sensor(sensor)
            .iter()
            .map(|s| (s.label.clone(), s.avg))
            .collect();
        let title = format!("{} avg per {interval} ({})", sensor.label(), sensor.unit());
        render_bars(frame, area, &title, &bars, state.sensor_color(sensor));
    }

    let hours: Vec<(String, f64)> = state.stats.cooler.iter().map(|u| (u.label.clone(), u.hours)).collect();
    let cost: Vec<(String, f64)> = state.stats.cooler.iter().map(|u| (u.label.clone(), u.cost)).collect();
    render_bars(frame, middle[1], "Cooler on (hours)  i: interval", &hours, Color::Cyan);
    render_bars(frame, bottom[0], "Estimated cooler cost", &cost, Color::Yellow);

    let missing = state.stats.missing_sections();
    let summary = if missing.is_empty() {
        Line::from(format!("interval={interval}"))
    } else {
        Line::from(Span::styled(
            format!("No data for: {}", missing.join(", ")),
            Style::default().fg(Color::Red),
        ))
    };
    frame.render_widget(
        Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Summary")),
        bottom[1],
    );
}

fn render_bars(frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, data: &[(String, f64)], color: Color) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    if data.is_empty() {
        let empty = Paragraph::new(Span::styled("No data", Style::default().fg(Color::Red))).block(block);
        frame.render_widget(empty, area);
        return;
    }

    let bars: Vec<Bar> = data
        .iter()
        .map(|(label, value)| {
            Bar::default()
                .label(Line::from(label.clone()))
                .value((value.max(0.0) * 100.0).round() as u64)
                .text_value(format!("{value:.2}"))
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .bar_width(7)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

fn draw_devices(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &ViewerState,
    controller: &DeviceController,
) {
    let mut lines = Vec::new();
    for (idx, key) in DeviceKey::ALL.into_iter().enumerate() {
        let toggle = controller.toggle_state(key);
        let on = toggle.displayed().is_on();
        let marker = match toggle.phase() {
            TogglePhase::Pending { .. } => " (sending...)",
            TogglePhase::RolledBack { .. } => " (reverted)",
            TogglePhase::Idle | TogglePhase::Committed => "",
        };
        let style = if on {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        lines.push(Line::from(vec![
            Span::raw(format!("[{}] {:<20}", idx + 1, key.display_name())),
            Span::styled(if on { "ON " } else { "OFF" }, style),
            Span::raw(marker),
        ]));
    }
    if let Some(alert) = &state.alert {
        lines.push(Line::from(" "));
        lines.push(Line::from(Span::styled(alert.clone(), Style::default().fg(Color::Red))));
    }

    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Device control  r: refresh")),
        area,
    );
}
