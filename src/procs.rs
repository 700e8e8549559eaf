use crate::rates::BYTES_PER_MB;
use crate::source::{MetricSource, RawProcess};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const NAME_MAX_CHARS: usize = 40;

/// Time source for cache freshness and row stamps, injectable so TTL
/// behavior is testable without real time passing.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    fn stamp(&self) -> String;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn stamp(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub cpu: f64,
    pub mem_mb: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessSnapshot {
    pub cpu_top: Vec<ProcessInfo>,
    pub mem_top: Vec<ProcessInfo>,
    pub ts: String,
    #[serde(skip_serializing)]
    captured_at: Instant,
}

/// TTL cache around the expensive "enumerate everything, rank top-N"
/// query. A fresh snapshot is returned as-is; concurrent misses serialize
/// behind the source lock and the losers reuse the winner's result, so at
/// most one enumeration runs per TTL window and a reader never sees a
/// partially built snapshot.
pub struct ProcessCache {
    ttl: Duration,
    top_n: usize,
    clock: Arc<dyn Clock>,
    last: RwLock<Option<Arc<ProcessSnapshot>>>,
    source: Arc<Mutex<Box<dyn MetricSource>>>,
}

impl ProcessCache {
    pub fn new(
        source: Arc<Mutex<Box<dyn MetricSource>>>,
        ttl: Duration,
        top_n: usize,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ttl,
            top_n,
            clock,
            last: RwLock::new(None),
            source,
        }
    }

    pub async fn top(&self) -> Arc<ProcessSnapshot> {
        if let Some(snapshot) = self.fresh().await {
            return snapshot;
        }

        let mut source = self.source.lock().await;
        // A concurrent miss may have recomputed while this caller waited.
        if let Some(snapshot) = self.fresh().await {
            return snapshot;
        }

        let procs = source.processes();
        let snapshot = Arc::new(build_snapshot(
            procs,
            self.top_n,
            self.clock.stamp(),
            self.clock.now(),
        ));
        *self.last.write().await = Some(snapshot.clone());
        snapshot
    }

    async fn fresh(&self) -> Option<Arc<ProcessSnapshot>> {
        let guard = self.last.read().await;
        guard
            .as_ref()
            .filter(|s| self.clock.now().duration_since(s.captured_at) < self.ttl)
            .cloned()
    }
}

/// Ranks the raw process table by CPU and by resident memory. Processes
/// that vanished mid-enumeration are already absent from the table; this
/// never fails the whole query for one missing row.
fn build_snapshot(
    procs: Vec<RawProcess>,
    top_n: usize,
    ts: String,
    captured_at: Instant,
) -> ProcessSnapshot {
    let entries: Vec<ProcessInfo> = procs
        .into_iter()
        .map(|p| ProcessInfo {
            pid: p.pid,
            name: display_name(&p.name),
            cpu: p.cpu_percent.max(0.0),
            mem_mb: p.memory_rss_bytes as f64 / BYTES_PER_MB,
        })
        .collect();

    let mut cpu_top = entries.clone();
    cpu_top.sort_by(|a, b| b.cpu.total_cmp(&a.cpu));
    cpu_top.truncate(top_n);

    let mut mem_top = entries;
    mem_top.sort_by(|a, b| b.mem_mb.total_cmp(&a.mem_mb));
    mem_top.truncate(top_n);

    ProcessSnapshot {
        cpu_top,
        mem_top,
        ts,
        captured_at,
    }
}

fn display_name(raw: &str) -> String {
    if raw.is_empty() {
        return "proc".to_string();
    }
    raw.chars().take(NAME_MAX_CHARS).collect()
}
