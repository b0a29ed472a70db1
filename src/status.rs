//! # Feature: Status Rotation
//!
//! Samples process health on a fixed interval and cycles the bot's presence
//! text through four fixed formats. The displayed format is derived from wall
//! clock time (`floor(unix_time / interval) mod 4`), so it changes exactly once
//! per tick and repeats every four intervals.
//!
//! A failed tick is logged and skipped; the next tick fires on schedule.

use crate::gateway::Gateway;
use crate::state::BotState;
use anyhow::Result;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind, System};
use tokio::sync::RwLock;
use tokio::time::MissedTickBehavior;

/// Number of presence formats in the rotation
pub const STATUS_ROTATION_LEN: usize = 4;

/// Snapshot of bot health, computed fresh for every tick or report
#[derive(Debug, Clone, PartialEq)]
pub struct StatusSample {
    pub latency_ms: u64,
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub member_count: u64,
    pub uptime: Duration,
}

/// Resident memory and CPU share of this process
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProcessMetrics {
    pub memory_mb: f64,
    pub cpu_percent: f64,
}

/// Reads resident memory and CPU usage for the current process.
///
/// CPU usage is a delta between refreshes, so the sampler keeps its `System`
/// alive between calls; the first reading is always zero.
pub struct MetricsSampler {
    system: System,
    pid: Option<Pid>,
    logical_cores: usize,
}

impl MetricsSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(RefreshKind::new().with_cpu(CpuRefreshKind::new()));
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                warn!("Process metrics unavailable: {e}");
                None
            }
        };
        let logical_cores = system.cpus().len().max(1);

        MetricsSampler {
            system,
            pid,
            logical_cores,
        }
    }

    /// Sampler that has no process to read, as when the pid lookup fails
    #[cfg(test)]
    fn without_process() -> Self {
        MetricsSampler {
            system: System::new(),
            pid: None,
            logical_cores: 1,
        }
    }

    /// Sample this process, reporting zeros when the platform refuses
    pub fn sample(&mut self) -> ProcessMetrics {
        let Some(pid) = self.pid else {
            return ProcessMetrics::default();
        };

        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::new().with_cpu().with_memory(),
        );

        match self.system.process(pid) {
            Some(process) => ProcessMetrics {
                memory_mb: process.memory() as f64 / 1024.0 / 1024.0,
                cpu_percent: process.cpu_usage() as f64 / self.logical_cores as f64,
            },
            None => {
                debug!("Process {pid} not visible to sysinfo, reporting zero usage");
                ProcessMetrics::default()
            }
        }
    }
}

impl Default for MetricsSampler {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of the presence format shown at `unix_secs`
pub fn rotation_index(unix_secs: i64, interval: Duration) -> usize {
    let interval_secs = interval.as_secs().max(1) as i64;
    unix_secs
        .div_euclid(interval_secs)
        .rem_euclid(STATUS_ROTATION_LEN as i64) as usize
}

/// Presence text for a rotation slot
pub fn status_line(index: usize, sample: &StatusSample, banned_words: usize, community: &str) -> String {
    match index % STATUS_ROTATION_LEN {
        0 => format!("🛡️ Security Active | Banned: {banned_words} words"),
        1 => format!(
            "RAM: {:.1}MB | Ping: {}ms",
            sample.memory_mb, sample.latency_ms
        ),
        2 => format!("Serving {} Users", sample.member_count),
        _ => format!("Welcome to {community}!"),
    }
}

/// Render an uptime as `H:MM:SS`, prefixed with the day count once past a day
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let clock = format!("{hours}:{minutes:02}:{seconds:02}");
    match days {
        0 => clock,
        1 => format!("1 day, {clock}"),
        n => format!("{n} days, {clock}"),
    }
}

/// Recurring presence updater.
///
/// `start` is idempotent: Ready fires again on every reconnect, but only the
/// first call spawns the timer task. Later calls just swap in the fresh gateway
/// handle used by the next tick.
pub struct StatusScheduler {
    interval: Duration,
    started: AtomicBool,
    gateway: RwLock<Option<Arc<dyn Gateway>>>,
}

impl StatusScheduler {
    pub fn new(interval: Duration) -> Self {
        StatusScheduler {
            interval: interval.max(Duration::from_secs(1)),
            started: AtomicBool::new(false),
            gateway: RwLock::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Spawn the timer task. Returns `false` if it was already running.
    pub async fn start(self: &Arc<Self>, gateway: Arc<dyn Gateway>, state: Arc<BotState>) -> bool {
        *self.gateway.write().await = Some(gateway);

        if self.started.swap(true, Ordering::SeqCst) {
            debug!("Status scheduler already running, gateway handle refreshed");
            return false;
        }

        info!("Starting status rotation every {:?}", self.interval);
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            scheduler.run(state).await;
        });
        true
    }

    async fn run(&self, state: Arc<BotState>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(gateway) = self.gateway.read().await.clone() else {
                continue;
            };
            if let Err(e) = self.tick(gateway.as_ref(), &state).await {
                warn!("Status update skipped: {e}");
            }
        }
    }

    /// Sample, pick the current slot, and publish it. Returns the published text.
    pub async fn tick(&self, gateway: &dyn Gateway, state: &BotState) -> Result<String> {
        let sample = state.sample(gateway).await;
        let index = rotation_index(chrono::Utc::now().timestamp(), self.interval);
        state.set_rotation_index(index);

        let banned = state.banned_word_count().await;
        let line = status_line(index, &sample, banned, state.community_name());
        gateway.set_presence(&line).await?;
        debug!("Presence updated (slot {index}): {line}");
        Ok(line)
    }
}
