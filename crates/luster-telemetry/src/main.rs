//! luster-telemetry — TUI dashboard for the luster clustered lighting pipeline.
//!
//! Listens for JSON snapshots on UDP port 9200 and displays stage timings,
//! overflow, cluster occupancy and captured logs in a terminal dashboard
//! using ratatui.
//!
//! Run a luster program with the `diagnostics` feature (on by default), e.g.
//! `cargo run --example flythrough`, then `cargo run -p luster-telemetry`.

use std::collections::VecDeque;
use std::io;
use std::net::UdpSocket;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Sparkline};
use ratatui::Terminal;
use serde::Deserialize;

const LISTEN_ADDR: &str = "127.0.0.1:9200";

// ── Wire types (must match luster's JSON format) ────────────────────────

#[derive(Deserialize, Clone, Default)]
struct DiagSnapshot {
    elapsed_secs: f32,
    frames_per_sec: f32,
    state: String,
    stats: FrameStatsInfo,
    config: ConfigInfo,
    #[serde(default)]
    occupancy_histogram: Vec<u32>,
    #[serde(default)]
    depth_profile: Vec<f32>,
    #[serde(default)]
    logs: Vec<LogEntryInfo>,
}

#[derive(Deserialize, Clone, Default)]
struct FrameStatsInfo {
    frame: u64,
    clustered: bool,
    point_lights: usize,
    area_lights: usize,
    clusters: usize,
    counters: CountersInfo,
    max_occupancy: usize,
    mean_occupancy: f32,
    empty_clusters: usize,
    grid_rebuilt: bool,
    prepare_us: f64,
    build_us: f64,
    assign_us: f64,
}

#[derive(Deserialize, Clone, Default)]
struct CountersInfo {
    intersection_tests: u64,
    overflow: u64,
    point_assignments: u64,
    area_assignments: u64,
    partial_area_assignments: u64,
    normal_rejections: u64,
}

#[derive(Deserialize, Clone, Default)]
struct ConfigInfo {
    grid: [u32; 3],
    normal_bins: u32,
    max_lights_per_cluster: u32,
    batch_size: u32,
    depth_slicing: String,
    min_perceivable_intensity: f32,
}

#[derive(Deserialize, Clone, Default)]
struct LogEntryInfo {
    level: String,
    target: String,
    message: String,
    timestamp_secs: f32,
}

// ── Tabs ─────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum Tab {
    Overview,
    Clusters,
    Logs,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Overview, Tab::Clusters, Tab::Logs];

    fn next(self) -> Self {
        match self {
            Tab::Overview => Tab::Clusters,
            Tab::Clusters => Tab::Logs,
            Tab::Logs => Tab::Overview,
        }
    }

    fn prev(self) -> Self {
        match self {
            Tab::Overview => Tab::Logs,
            Tab::Clusters => Tab::Overview,
            Tab::Logs => Tab::Clusters,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Clusters => "Clusters",
            Tab::Logs => "Logs",
        }
    }
}

// ── Log level filter ────────────────────────────────────────────────────

#[derive(Clone, Copy, PartialEq, Eq)]
enum LogFilter {
    All,
    Info,
    Warn,
    Error,
}

impl LogFilter {
    fn next(self) -> Self {
        match self {
            LogFilter::All => LogFilter::Info,
            LogFilter::Info => LogFilter::Warn,
            LogFilter::Warn => LogFilter::Error,
            LogFilter::Error => LogFilter::All,
        }
    }

    fn label(self) -> &'static str {
        match self {
            LogFilter::All => "ALL",
            LogFilter::Info => "INFO+",
            LogFilter::Warn => "WARN+",
            LogFilter::Error => "ERROR",
        }
    }

    fn passes(self, level: &str) -> bool {
        match self {
            LogFilter::All => true,
            LogFilter::Info => matches!(level, "INFO" | "WARN" | "ERROR"),
            LogFilter::Warn => matches!(level, "WARN" | "ERROR"),
            LogFilter::Error => level == "ERROR",
        }
    }
}

// ── Accumulated log entry (persists across snapshots) ───────────────────

#[derive(Clone)]
struct LogEntry {
    level: String,
    target: String,
    message: String,
    timestamp_secs: f32,
}

// ── App state ────────────────────────────────────────────────────────────

const HISTORY_CAP: usize = 1200;
const LOG_CAP: usize = 2000;

struct App {
    latest: DiagSnapshot,
    /// Whole pipeline time per snapshot, in microseconds.
    time_history: VecDeque<u64>,
    overflow_history: VecDeque<u64>,
    /// Mean lights per cluster, ×100 for the sparkline's integer scale.
    occupancy_history: VecDeque<u64>,
    active_tab: Tab,
    paused: bool,
    connected: bool,
    rebuilds: u64,

    // Logs tab state
    log_entries: Vec<LogEntry>,
    log_filter: LogFilter,
    log_auto_scroll: bool,
    log_scroll_offset: usize,
    show_targets: bool,
}

fn push_capped(history: &mut VecDeque<u64>, value: u64) {
    if history.len() >= HISTORY_CAP {
        history.pop_front();
    }
    history.push_back(value);
}

impl App {
    fn new() -> Self {
        Self {
            latest: DiagSnapshot::default(),
            time_history: VecDeque::with_capacity(HISTORY_CAP),
            overflow_history: VecDeque::with_capacity(HISTORY_CAP),
            occupancy_history: VecDeque::with_capacity(HISTORY_CAP),
            active_tab: Tab::Overview,
            paused: false,
            connected: false,
            rebuilds: 0,
            log_entries: Vec::new(),
            log_filter: LogFilter::All,
            log_auto_scroll: true,
            log_scroll_offset: 0,
            show_targets: false,
        }
    }

    fn push_snapshot(&mut self, snap: DiagSnapshot) {
        if self.paused {
            return;
        }

        let s = &snap.stats;
        push_capped(
            &mut self.time_history,
            (s.prepare_us + s.build_us + s.assign_us).round().max(0.0) as u64,
        );
        push_capped(&mut self.overflow_history, s.counters.overflow);
        push_capped(
            &mut self.occupancy_history,
            (s.mean_occupancy * 100.0).round().max(0.0) as u64,
        );
        if s.grid_rebuilt {
            self.rebuilds += 1;
        }

        for log in &snap.logs {
            self.log_entries.push(LogEntry {
                level: log.level.clone(),
                target: log.target.clone(),
                message: log.message.clone(),
                timestamp_secs: log.timestamp_secs,
            });
        }
        if self.log_entries.len() > LOG_CAP {
            let excess = self.log_entries.len() - LOG_CAP;
            self.log_entries.drain(..excess);
        }

        self.latest = snap;
        self.connected = true;
    }

    /// Count log entries by level.
    fn log_counts(&self) -> (usize, usize, usize) {
        let (mut i, mut w, mut e) = (0, 0, 0);
        for log in &self.log_entries {
            match log.level.as_str() {
                "INFO" => i += 1,
                "WARN" => w += 1,
                "ERROR" => e += 1,
                _ => {}
            }
        }
        (i, w, e)
    }

    fn filtered_logs(&self) -> Vec<&LogEntry> {
        self.log_entries
            .iter()
            .filter(|e| self.log_filter.passes(&e.level))
            .collect()
    }
}

// ── Main ─────────────────────────────────────────────────────────────────

fn main() -> io::Result<()> {
    let recv_socket = UdpSocket::bind(LISTEN_ADDR).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("failed to bind {LISTEN_ADDR} (is another luster-telemetry running?): {e}"),
        )
    })?;
    recv_socket.set_nonblocking(true)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new();
    let mut buf = [0u8; 65536];

    loop {
        // Drain all pending datagrams.
        while let Ok(n) = recv_socket.recv(&mut buf) {
            if let Ok(snap) = serde_json::from_slice::<DiagSnapshot>(&buf[..n]) {
                app.push_snapshot(snap);
            }
        }

        terminal.draw(|f| ui(f, &app))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if handle_key(&mut app, key) {
                    break;
                }
            }
        }
    }

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

// ── Key handling ─────────────────────────────────────────────────────────

/// Returns `true` if the app should quit.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
        KeyCode::Char('p') => app.paused = !app.paused,

        KeyCode::Char('1') => app.active_tab = Tab::Overview,
        KeyCode::Char('2') => app.active_tab = Tab::Clusters,
        KeyCode::Char('3') => app.active_tab = Tab::Logs,

        KeyCode::Tab => {
            app.active_tab = if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_tab.prev()
            } else {
                app.active_tab.next()
            };
        }
        KeyCode::BackTab => app.active_tab = app.active_tab.prev(),

        // Logs tab keys.
        KeyCode::Char('l') if app.active_tab == Tab::Logs => {
            app.log_filter = app.log_filter.next();
        }
        KeyCode::Char('g') if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = !app.log_auto_scroll;
        }
        KeyCode::Char('t') if app.active_tab == Tab::Logs => {
            app.show_targets = !app.show_targets;
        }
        KeyCode::Up if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = false;
            app.log_scroll_offset = app.log_scroll_offset.saturating_sub(1);
        }
        KeyCode::Down if app.active_tab == Tab::Logs => {
            app.log_auto_scroll = false;
            app.log_scroll_offset += 1;
        }

        _ => {}
    }
    false
}

// ── Layout ───────────────────────────────────────────────────────────────

fn ui(f: &mut ratatui::Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Length(1), // tab bar
            Constraint::Min(6),    // tab content
            Constraint::Length(3), // stage timings
            Constraint::Length(1), // help bar
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_tab_bar(f, app, chunks[1]);

    match app.active_tab {
        Tab::Overview => draw_overview_tab(f, app, chunks[2]),
        Tab::Clusters => draw_clusters_tab(f, app, chunks[2]),
        Tab::Logs => draw_logs_tab(f, app, chunks[2]),
    }

    draw_stage_panel(f, app, chunks[3]);
    draw_help_bar(f, app, chunks[4]);
}

fn draw_header(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let s = &app.latest;
    let status = if app.paused {
        " PAUSED "
    } else if app.connected {
        " LIVE "
    } else {
        " WAITING "
    };
    let status_color = if app.paused {
        Color::Yellow
    } else if app.connected {
        Color::Green
    } else {
        Color::DarkGray
    };
    let (mode, mode_color) = if s.stats.clustered {
        ("clustered", Color::Green)
    } else if app.connected {
        ("brute force", Color::Yellow)
    } else {
        ("-", Color::DarkGray)
    };

    let text = Line::from(vec![
        Span::styled(
            format!(" {} ", status),
            Style::default().bg(status_color).fg(Color::Black),
        ),
        Span::raw("  "),
        Span::styled("FPS: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}", s.frames_per_sec),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::styled("Frame: ", Style::default().fg(Color::DarkGray)),
        Span::styled(format!("{}", s.stats.frame), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled("Mode: ", Style::default().fg(Color::DarkGray)),
        Span::styled(mode, Style::default().fg(mode_color)),
        Span::styled(
            format!(" ({})", if s.state.is_empty() { "?" } else { &s.state }),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  |  "),
        Span::styled("Lights: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} point + {} area", s.stats.point_lights, s.stats.area_lights),
            Style::default().fg(Color::White),
        ),
        Span::raw("  |  "),
        Span::styled("Up: ", Style::default().fg(Color::DarkGray)),
        Span::styled(format_uptime(s.elapsed_secs), Style::default().fg(Color::White)),
    ]);

    let block = Block::default()
        .title(" luster-telemetry ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_tab_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::raw(" ")];
    for (i, tab) in Tab::ALL.iter().enumerate() {
        let num = format!(" {} ", i + 1);
        let label = format!("{} ", tab.label());
        if *tab == app.active_tab {
            spans.push(Span::styled(
                num,
                Style::default().bg(Color::Cyan).fg(Color::Black).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled(
                label,
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
        } else {
            spans.push(Span::styled(num, Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(label, Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::raw("  "));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Overview Tab ─────────────────────────────────────────────────────────

fn draw_overview_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(4)])
        .split(area);

    let sparks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(30),
            Constraint::Percentage(30),
        ])
        .split(chunks[0]);

    let time: Vec<u64> = app.time_history.iter().copied().collect();
    let (t_min, t_avg, t_max) = stats(&time);
    draw_sparkline(
        f,
        sparks[0],
        " Pipeline Time ",
        &time,
        Color::Green,
        format!(
            "min: {:.2}ms  avg: {:.2}ms  max: {:.2}ms",
            t_min / 1000.0,
            t_avg / 1000.0,
            t_max / 1000.0
        ),
    );

    let overflow: Vec<u64> = app.overflow_history.iter().copied().collect();
    let (o_min, o_avg, o_max) = stats(&overflow);
    draw_sparkline(
        f,
        sparks[1],
        " Overflow ",
        &overflow,
        if o_max > 0.0 { Color::Red } else { Color::DarkGray },
        format!("min: {:.0}  avg: {:.0}  max: {:.0}", o_min, o_avg, o_max),
    );

    let occupancy: Vec<u64> = app.occupancy_history.iter().copied().collect();
    let (m_min, m_avg, m_max) = stats(&occupancy);
    draw_sparkline(
        f,
        sparks[2],
        " Mean Lights / Cluster ",
        &occupancy,
        Color::Yellow,
        format!(
            "min: {:.1}  avg: {:.1}  max: {:.1}",
            m_min / 100.0,
            m_avg / 100.0,
            m_max / 100.0
        ),
    );

    draw_counters_panel(f, app, chunks[1]);
}

/// Sparkline in a titled block with a stats line under it.
fn draw_sparkline(
    f: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    data: &[u64],
    color: Color,
    stats_line: String,
) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let spark_area = Rect { height: inner.height - 1, ..inner };
    let stats_area = Rect {
        y: inner.y + inner.height - 1,
        height: 1,
        ..inner
    };
    // Show the newest samples that fit.
    let visible = &data[data.len().saturating_sub(spark_area.width as usize)..];
    let sparkline = Sparkline::default()
        .data(visible)
        .style(Style::default().fg(color));
    f.render_widget(sparkline, spark_area);
    f.render_widget(
        Paragraph::new(Span::styled(stats_line, Style::default().fg(Color::DarkGray))),
        stats_area,
    );
}

fn draw_counters_panel(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Assignment ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let s = &app.latest.stats;
    if !s.clustered {
        let text = Span::styled(
            if app.connected {
                "  Clustering disabled: shading iterates every light"
            } else {
                "  Waiting for data..."
            },
            Style::default().fg(Color::DarkGray),
        );
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    let c = &s.counters;
    let pct = |part: u64, whole: u64| {
        if whole > 0 {
            part as f64 / whole as f64 * 100.0
        } else {
            0.0
        }
    };
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let value = |text: String| Span::styled(text, Style::default().fg(Color::White));

    let overflow_color = if c.overflow > 0 { Color::Red } else { Color::Green };
    let lines = vec![
        Line::from(vec![
            label("  Intersection tests: "),
            value(format!("{}", c.intersection_tests)),
            label("   Overflow: "),
            Span::styled(
                format!("{}", c.overflow),
                Style::default().fg(overflow_color).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(vec![
            label("  Point assignments:  "),
            value(format!("{}", c.point_assignments)),
            label("   Area assignments: "),
            value(format!("{}", c.area_assignments)),
            label(" ("),
            value(format!("{:.0}%", pct(c.partial_area_assignments, c.area_assignments))),
            label(" partial)"),
        ]),
        Line::from(vec![
            label("  Normal rejections:  "),
            value(format!("{}", c.normal_rejections)),
            label("   Grid rebuilds seen: "),
            value(format!("{}", app.rebuilds)),
        ]),
        Line::from(vec![
            label("  Clusters: "),
            value(format!("{}", s.clusters)),
            label("   Empty: "),
            value(format!("{} ({:.0}%)", s.empty_clusters, pct(s.empty_clusters as u64, s.clusters as u64))),
            label("   Max fill: "),
            value(format!("{}/{}", s.max_occupancy, app.latest.config.max_lights_per_cluster)),
            label("   Mean: "),
            value(format!("{:.2}", s.mean_occupancy)),
        ]),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Clusters Tab ─────────────────────────────────────────────────────────

fn draw_clusters_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[0]);

    let cap = app.latest.config.max_lights_per_cluster.max(1);
    let buckets = app.latest.occupancy_histogram.len().max(1) as u32;
    let hist_rows: Vec<(String, f64)> = app
        .latest
        .occupancy_histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| {
            let lo = i as u32 * cap / buckets;
            let hi = (i as u32 + 1) * cap / buckets;
            (format!("{lo:>4}-{hi:<4}"), count as f64)
        })
        .collect();
    draw_bars(
        f,
        left[0],
        " Occupancy (clusters per fill range) ",
        &hist_rows,
        |v| format!("{v:>6.0}"),
        |i, n| if i + 1 == n { Color::Red } else { Color::Green },
    );

    let depth_rows: Vec<(String, f64)> = app
        .latest
        .depth_profile
        .iter()
        .enumerate()
        .map(|(z, &mean)| (format!("slice {z:>2}"), mean as f64))
        .collect();
    draw_bars(
        f,
        left[1],
        " Mean Lights per Depth Slice (near \u{2192} far) ",
        &depth_rows,
        |v| format!("{v:>6.1}"),
        |_, _| Color::Yellow,
    );

    draw_config_panel(f, app, chunks[1]);
}

/// Horizontal bars scaled to the largest value.
fn draw_bars(
    f: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    rows: &[(String, f64)],
    fmt_value: impl Fn(f64) -> String,
    color: impl Fn(usize, usize) -> Color,
) {
    let block = Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if rows.is_empty() {
        let text = Span::styled(
            "  No cluster data (clustering disabled?)",
            Style::default().fg(Color::DarkGray),
        );
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    let max = rows.iter().map(|(_, v)| *v).fold(0.0, f64::max).max(1e-9);
    let label_width = rows.iter().map(|(l, _)| l.len()).max().unwrap_or(8);
    let bar_max_width = inner.width.saturating_sub(label_width as u16 + 12) as usize;

    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .take(inner.height as usize)
        .map(|(i, (label, v))| {
            let bar_len = ((v / max) * bar_max_width as f64).round() as usize;
            Line::from(vec![
                Span::styled(
                    format!("  {:width$}", label, width = label_width),
                    Style::default().fg(Color::White),
                ),
                Span::styled(
                    format!(" {} ", fmt_value(*v)),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled("\u{2588}".repeat(bar_len), Style::default().fg(color(i, rows.len()))),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_config_panel(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Config ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let c = &app.latest.config;
    let row = |name: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!("  {:<18}", name), Style::default().fg(Color::DarkGray)),
            Span::styled(value, Style::default().fg(Color::White)),
        ])
    };
    let lines = vec![
        row("Grid", format!("{} x {} x {}", c.grid[0], c.grid[1], c.grid[2])),
        row("Normal bins", format!("{}", c.normal_bins)),
        row("Max per cluster", format!("{}", c.max_lights_per_cluster)),
        row("Batch size", format!("{}", c.batch_size)),
        row("Depth slicing", c.depth_slicing.clone()),
        row("Min intensity", format!("{:.4}", c.min_perceivable_intensity)),
    ];
    f.render_widget(Paragraph::new(lines), inner);
}

// ── Logs Tab ─────────────────────────────────────────────────────────────

fn draw_logs_tab(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let (i, w, e) = app.log_counts();
    let scroll_label = if app.log_auto_scroll { "auto" } else { "manual" };

    let block = Block::default()
        .title(format!(
            " Logs [{}]  I:{} W:{} E:{}  scroll:{} ",
            app.log_filter.label(),
            i,
            w,
            e,
            scroll_label,
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let filtered = app.filtered_logs();
    if filtered.is_empty() {
        let text = Span::styled("  No log messages", Style::default().fg(Color::DarkGray));
        f.render_widget(Paragraph::new(text), inner);
        return;
    }

    let visible = inner.height as usize;
    let total = filtered.len();
    let offset = if app.log_auto_scroll {
        total.saturating_sub(visible)
    } else {
        app.log_scroll_offset.min(total.saturating_sub(visible))
    };

    let mut lines: Vec<Line> = Vec::with_capacity(visible);
    for entry in filtered.iter().skip(offset).take(visible) {
        let level_color = match entry.level.as_str() {
            "INFO" => Color::Cyan,
            "WARN" => Color::Yellow,
            "ERROR" => Color::Red,
            _ => Color::White,
        };

        let mut spans = vec![
            Span::styled(
                format!("  [{:>6.1}s] ", entry.timestamp_secs),
                Style::default().fg(Color::DarkGray),
            ),
            Span::styled(
                format!("{:<5} ", entry.level),
                Style::default().fg(level_color).add_modifier(Modifier::BOLD),
            ),
        ];
        if app.show_targets {
            spans.push(Span::styled(
                format!("{} ", entry.target),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.push(Span::styled(entry.message.clone(), Style::default().fg(Color::White)));
        lines.push(Line::from(spans));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

// ── Stage timings + help bar ─────────────────────────────────────────────

fn draw_stage_panel(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Stages ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let s = &app.latest.stats;
    let text = if app.connected {
        let build_color = if s.grid_rebuilt { Color::Yellow } else { Color::White };
        Line::from(vec![
            Span::styled("  Prepare: ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0}us", s.prepare_us), Style::default().fg(Color::White)),
            Span::raw("  |  "),
            Span::styled("Build: ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0}us", s.build_us), Style::default().fg(build_color)),
            Span::raw("  |  "),
            Span::styled("Assign: ", Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{:.0}us", s.assign_us), Style::default().fg(Color::White)),
        ])
    } else {
        Line::from(Span::styled(
            format!("  Listening on {LISTEN_ADDR}"),
            Style::default().fg(Color::DarkGray),
        ))
    };

    f.render_widget(Paragraph::new(text).block(block), area);
}

fn draw_help_bar(f: &mut ratatui::Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" [1-3]", Style::default().fg(Color::Cyan)),
        Span::raw(" tab  "),
        Span::styled("[Tab]", Style::default().fg(Color::Cyan)),
        Span::raw(" next  "),
    ];

    if app.active_tab == Tab::Logs {
        spans.push(Span::styled("[l]", Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" filter  "));
        spans.push(Span::styled("[g]", Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" auto-scroll  "));
        spans.push(Span::styled("[t]", Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" targets  "));
        spans.push(Span::styled("[\u{2191}\u{2193}]", Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" scroll  "));
    }

    spans.push(Span::styled("[p]", Style::default().fg(Color::Cyan)));
    spans.push(Span::raw(" pause  "));
    spans.push(Span::styled("[q]", Style::default().fg(Color::Cyan)));
    spans.push(Span::raw(" quit"));

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn stats(data: &[u64]) -> (f64, f64, f64) {
    if data.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = data.iter().copied().min().unwrap_or(0) as f64;
    let max = data.iter().copied().max().unwrap_or(0) as f64;
    let avg = data.iter().sum::<u64>() as f64 / data.len() as f64;
    (min, avg, max)
}

fn format_uptime(secs: f32) -> String {
    let total = secs as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{:.1}s", secs)
    }
}
