//! Diagnostics sender: ships per-frame pipeline metrics to `luster-telemetry`
//! over UDP.
//!
//! Enabled by the `diagnostics` feature flag. Create a [`DiagSender`] once and
//! call [`DiagSender::send`] after every frame; it throttles itself to 10 Hz,
//! serializes a JSON snapshot and fires it at `127.0.0.1:9200`. Nothing
//! listening is fine: sends are fire-and-forget.
//!
//! [`init_logger`] installs a logger that keeps writing to stderr through
//! env_logger and also captures records into a ring buffer, drained into the
//! snapshots so the dashboard can show them.

use std::net::UdpSocket;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::DepthSlicing;
use crate::pipeline::{ClusteredLighting, FrameStats, PipelineState};

/// Port `luster-telemetry` listens on.
pub const TELEMETRY_PORT: u16 = 9200;

const SEND_INTERVAL: Duration = Duration::from_millis(100);
const HISTOGRAM_BUCKETS: usize = 16;
const LOGS_PER_SNAPSHOT: usize = 50;
const LOG_RING_CAP: usize = 500;

// ── DiagSender ───────────────────────────────────────────────────────────

/// Owns the outbound UDP socket and throttling state.
pub struct DiagSender {
    socket: UdpSocket,
    /// Last time a datagram was sent (for the 10 Hz throttle).
    last_send: Instant,
    /// Frame counter at the last send, for the frame rate.
    last_frame: u64,
    started: Instant,
}

impl DiagSender {
    /// Bind an ephemeral port and connect it to the telemetry port. `None`
    /// when the socket cannot be set up.
    pub fn new() -> Option<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").ok()?;
        socket.connect(("127.0.0.1", TELEMETRY_PORT)).ok()?;
        socket.set_nonblocking(true).ok()?;

        let now = Instant::now();
        Some(Self {
            socket,
            // Send on the first frame.
            last_send: now - Duration::from_secs(1),
            last_frame: 0,
            started: now,
        })
    }

    /// Send a snapshot of `pipeline` unless one went out less than 100 ms ago.
    /// Returns whether a datagram was sent.
    pub fn send(&mut self, pipeline: &ClusteredLighting) -> bool {
        let now = Instant::now();
        let since = now.duration_since(self.last_send);
        if since < SEND_INTERVAL {
            return false;
        }

        let stats = *pipeline.stats();
        let frames = stats.frame.saturating_sub(self.last_frame);
        let frames_per_sec = frames as f32 / since.as_secs_f32().max(1e-3);
        self.last_send = now;
        self.last_frame = stats.frame;

        let snapshot = build_snapshot(
            pipeline,
            stats,
            frames_per_sec,
            now.duration_since(self.started).as_secs_f32(),
        );
        // Errors silently ignored: fire-and-forget.
        match serde_json::to_vec(&snapshot) {
            Ok(json) => self.socket.send(&json).is_ok(),
            Err(_) => false,
        }
    }
}

// ── Snapshot types (wire format) ────────────────────────────────────────

#[derive(Serialize)]
struct DiagSnapshot {
    elapsed_secs: f32,
    frames_per_sec: f32,
    state: PipelineState,
    stats: FrameStats,
    config: ConfigSnapshot,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    occupancy_histogram: Vec<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    depth_profile: Vec<f32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    logs: Vec<LogEntrySnapshot>,
}

#[derive(Serialize)]
struct ConfigSnapshot {
    grid: [u32; 3],
    normal_bins: u32,
    max_lights_per_cluster: u32,
    batch_size: u32,
    depth_slicing: DepthSlicing,
    min_perceivable_intensity: f32,
}

#[derive(Serialize)]
struct LogEntrySnapshot {
    level: String,
    target: String,
    message: String,
    timestamp_secs: f32,
}

fn build_snapshot(
    pipeline: &ClusteredLighting,
    stats: FrameStats,
    frames_per_sec: f32,
    elapsed_secs: f32,
) -> DiagSnapshot {
    let config = pipeline.config();
    let (occupancy_histogram, depth_profile) = match pipeline.grid() {
        Some(grid) => (
            grid.occupancy_histogram(HISTOGRAM_BUCKETS),
            grid.depth_profile(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    let logs = drain_captured_logs(LOGS_PER_SNAPSHOT)
        .into_iter()
        .map(|e| LogEntrySnapshot {
            level: e.level.to_string(),
            target: e.target,
            message: e.message,
            timestamp_secs: e.timestamp_secs,
        })
        .collect();

    DiagSnapshot {
        elapsed_secs,
        frames_per_sec,
        state: pipeline.state(),
        stats,
        config: ConfigSnapshot {
            grid: config.cluster.grid.to_array(),
            normal_bins: config.cluster.normal_bins,
            max_lights_per_cluster: config.cluster.max_lights_per_cluster,
            batch_size: config.cluster.batch_size,
            depth_slicing: config.cluster.depth_slicing,
            min_perceivable_intensity: config.lighting.min_perceivable_intensity,
        },
        occupancy_histogram,
        depth_profile,
        logs,
    }
}

// ── Log Capture ──────────────────────────────────────────────────────────

/// A captured log message.
struct CapturedLog {
    level: log::Level,
    target: String,
    message: String,
    timestamp_secs: f32,
}

/// Ring buffer for captured logs, oldest dropped first.
struct LogRing {
    entries: Vec<CapturedLog>,
}

impl LogRing {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn push(&mut self, entry: CapturedLog) {
        if self.entries.len() >= LOG_RING_CAP {
            self.entries.remove(0);
        }
        self.entries.push(entry);
    }

    fn drain(&mut self, max: usize) -> Vec<CapturedLog> {
        let n = self.entries.len().min(max);
        self.entries.drain(..n).collect()
    }
}

static LOG_RING: Mutex<Option<LogRing>> = Mutex::new(None);
static LOG_START: OnceLock<Instant> = OnceLock::new();

/// Captures records into the ring buffer and delegates to env_logger for
/// stderr output.
struct DiagLogger {
    inner: env_logger::Logger,
}

impl log::Log for DiagLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata) || metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        // The dashboard only wants info and above, whatever stderr shows.
        if record.level() > log::Level::Info {
            return;
        }

        let timestamp_secs = LOG_START
            .get()
            .map(|s| s.elapsed().as_secs_f32())
            .unwrap_or(0.0);
        let entry = CapturedLog {
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            timestamp_secs,
        };
        if let Ok(mut guard) = LOG_RING.lock() {
            if let Some(ring) = guard.as_mut() {
                ring.push(entry);
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

static DIAG_LOGGER: OnceLock<DiagLogger> = OnceLock::new();

/// Install the capturing logger. Filters come from `RUST_LOG` as with
/// `env_logger::init()`.
///
/// Call this early (before any log messages) to capture everything.
pub fn init_logger() {
    if let Ok(mut ring) = LOG_RING.lock() {
        *ring = Some(LogRing::new());
    }
    LOG_START.get_or_init(Instant::now);

    let inner = env_logger::Builder::new().parse_default_env().build();
    let max_level = inner.filter();
    let logger = DIAG_LOGGER.get_or_init(|| DiagLogger { inner });

    if log::set_logger(logger).is_err() {
        eprintln!("[luster] Warning: a logger is already set. Log capture disabled.");
        return;
    }
    log::set_max_level(max_level.max(log::LevelFilter::Info));
}

/// Drain up to `max` captured log entries.
fn drain_captured_logs(max: usize) -> Vec<CapturedLog> {
    let Ok(mut guard) = LOG_RING.lock() else {
        return Vec::new();
    };
    match guard.as_mut() {
        Some(ring) => ring.drain(max),
        None => Vec::new(),
    }
}
