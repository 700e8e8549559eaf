use crate::metrics::Metrics;
use crate::rates::throughput_mb_s;
use crate::source::{DiskCounters, MetricSource, NetCounters};
use crate::store::TimeSeriesStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The background collection loop: one pass per interval, reading the
/// source, deriving rates from the previous pass's counters and appending
/// one row per stream group. Sole writer of the store.
pub struct Sampler<S: MetricSource> {
    source: S,
    store: Arc<TimeSeriesStore>,
    metrics: Arc<Metrics>,
    last_disk: Option<DiskCounters>,
    last_net: Option<NetCounters>,
}

impl<S: MetricSource> Sampler<S> {
    /// Primes the counter baselines (and the CPU usage delta) so the first
    /// real pass derives rates over a full interval.
    pub fn new(mut source: S, store: Arc<TimeSeriesStore>, metrics: Arc<Metrics>) -> Self {
        source.cpu_percent();
        let last_disk = source.disk_counters();
        let last_net = source.net_counters();
        Self {
            source,
            store,
            metrics,
            last_disk,
            last_net,
        }
    }

    pub async fn run(mut self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick of an interval fires immediately; consume it so the
        // first pass measures a full elapsed window.
        ticker.tick().await;
        let mut last_pass = Instant::now();

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("stop signal received, sampler exiting");
                    break;
                }
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let elapsed_secs = now.duration_since(last_pass).as_secs_f64();
                    last_pass = now;
                    let stamp = chrono::Local::now().format("%H:%M:%S").to_string();
                    self.pass(elapsed_secs, stamp).await;
                }
            }
        }
    }

    /// One sampling pass. Accessor failures are isolated: an unavailable
    /// counter source skips only its own stream group this tick.
    pub async fn pass(&mut self, elapsed_secs: f64, stamp: String) {
        let cpu = self.source.cpu_percent();
        let memory = self.source.memory_percent();
        self.store.push_usage(cpu, memory, stamp.clone()).await;
        self.metrics.set_usage(cpu, memory);

        match self.source.disk_counters() {
            Some(cur) => {
                if let Some(prev) = self.last_disk {
                    let read = throughput_mb_s(prev.read_bytes, cur.read_bytes, elapsed_secs);
                    let write = throughput_mb_s(prev.write_bytes, cur.write_bytes, elapsed_secs);
                    self.store.push_disk(read, write, stamp.clone()).await;
                    self.metrics.set_disk_rates(read, write);
                }
                self.last_disk = Some(cur);
            }
            None => {
                debug!("disk counters unavailable this pass");
                self.metrics.inc_collect_error("disk");
            }
        }

        match self.source.net_counters() {
            Some(cur) => {
                if let Some(prev) = self.last_net {
                    let rx = throughput_mb_s(prev.bytes_recv, cur.bytes_recv, elapsed_secs);
                    let tx = throughput_mb_s(prev.bytes_sent, cur.bytes_sent, elapsed_secs);
                    self.store.push_net(rx, tx, stamp).await;
                    self.metrics.set_net_rates(rx, tx);
                }
                self.last_net = Some(cur);
            }
            None => {
                debug!("network counters unavailable this pass");
                self.metrics.inc_collect_error("net");
            }
        }

        self.metrics.mark_pass_complete();
    }
}
