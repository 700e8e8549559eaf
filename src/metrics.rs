use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Prometheus registry exposing the latest sample of each stream plus
/// agent health counters.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    started_at_unix: i64,
    pub agent_cpu_percent: Gauge,
    pub agent_memory_percent: Gauge,
    pub agent_disk_read_mb_per_sec: Gauge,
    pub agent_disk_write_mb_per_sec: Gauge,
    pub agent_net_rx_mb_per_sec: Gauge,
    pub agent_net_tx_mb_per_sec: Gauge,
    pub agent_uptime_seconds: Gauge,
    pub agent_last_sample_timestamp_seconds: Gauge,
    pub agent_scrape_count_total: Counter,
    pub agent_collect_errors_total: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let agent_cpu_percent = Gauge::with_opts(opts!(
            "agent_cpu_percent",
            "Average CPU usage across cores in percent (0..100), latest sample"
        ))?;
        let agent_memory_percent = Gauge::with_opts(opts!(
            "agent_memory_percent",
            "Memory usage in percent, latest sample"
        ))?;
        let agent_disk_read_mb_per_sec = Gauge::with_opts(opts!(
            "agent_disk_read_mb_per_sec",
            "Disk read throughput in MB/s, latest sample"
        ))?;
        let agent_disk_write_mb_per_sec = Gauge::with_opts(opts!(
            "agent_disk_write_mb_per_sec",
            "Disk write throughput in MB/s, latest sample"
        ))?;
        let agent_net_rx_mb_per_sec = Gauge::with_opts(opts!(
            "agent_net_rx_mb_per_sec",
            "Network receive throughput in MB/s, latest sample"
        ))?;
        let agent_net_tx_mb_per_sec = Gauge::with_opts(opts!(
            "agent_net_tx_mb_per_sec",
            "Network transmit throughput in MB/s, latest sample"
        ))?;
        let agent_uptime_seconds = Gauge::with_opts(opts!(
            "agent_uptime_seconds",
            "Seconds since the agent started"
        ))?;
        let agent_last_sample_timestamp_seconds = Gauge::with_opts(opts!(
            "agent_last_sample_timestamp_seconds",
            "Unix timestamp of the last completed sampling pass"
        ))?;
        let agent_scrape_count_total = Counter::with_opts(opts!(
            "agent_scrape_count_total",
            "Number of /metrics scrapes"
        ))?;
        let agent_collect_errors_total = CounterVec::new(
            opts!(
                "agent_collect_errors_total",
                "Unavailable metric accessors by source"
            ),
            &["source"],
        )?;

        registry.register(Box::new(agent_cpu_percent.clone()))?;
        registry.register(Box::new(agent_memory_percent.clone()))?;
        registry.register(Box::new(agent_disk_read_mb_per_sec.clone()))?;
        registry.register(Box::new(agent_disk_write_mb_per_sec.clone()))?;
        registry.register(Box::new(agent_net_rx_mb_per_sec.clone()))?;
        registry.register(Box::new(agent_net_tx_mb_per_sec.clone()))?;
        registry.register(Box::new(agent_uptime_seconds.clone()))?;
        registry.register(Box::new(agent_last_sample_timestamp_seconds.clone()))?;
        registry.register(Box::new(agent_scrape_count_total.clone()))?;
        registry.register(Box::new(agent_collect_errors_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            started_at_unix: now_unix(),
            agent_cpu_percent,
            agent_memory_percent,
            agent_disk_read_mb_per_sec,
            agent_disk_write_mb_per_sec,
            agent_net_rx_mb_per_sec,
            agent_net_tx_mb_per_sec,
            agent_uptime_seconds,
            agent_last_sample_timestamp_seconds,
            agent_scrape_count_total,
            agent_collect_errors_total,
        }))
    }

    pub fn set_usage(&self, cpu_percent: f64, memory_percent: f64) {
        self.agent_cpu_percent.set(cpu_percent);
        self.agent_memory_percent.set(memory_percent);
    }

    pub fn set_disk_rates(&self, read_mb_s: f64, write_mb_s: f64) {
        self.agent_disk_read_mb_per_sec.set(read_mb_s);
        self.agent_disk_write_mb_per_sec.set(write_mb_s);
    }

    pub fn set_net_rates(&self, rx_mb_s: f64, tx_mb_s: f64) {
        self.agent_net_rx_mb_per_sec.set(rx_mb_s);
        self.agent_net_tx_mb_per_sec.set(tx_mb_s);
    }

    pub fn mark_pass_complete(&self) {
        let now = now_unix();
        self.agent_last_sample_timestamp_seconds.set(now as f64);
        self.agent_uptime_seconds
            .set(now.saturating_sub(self.started_at_unix) as f64);
    }

    pub fn inc_collect_error(&self, source: &str) {
        self.agent_collect_errors_total
            .with_label_values(&[source])
            .inc();
    }

    pub fn inc_scrape_count(&self) {
        self.agent_scrape_count_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_contains_registered_gauges() {
        let metrics = Metrics::new().expect("metrics init");
        metrics.set_usage(12.5, 40.0);
        metrics.set_disk_rates(1.0, 2.0);
        metrics.mark_pass_complete();

        let text = metrics.encode_metrics().expect("encode");
        assert!(text.contains("agent_cpu_percent 12.5"));
        assert!(text.contains("agent_disk_write_mb_per_sec 2"));
        assert!(text.contains("agent_uptime_seconds"));
    }

    #[test]
    fn collect_errors_grouped_by_source() {
        let metrics = Metrics::new().expect("metrics init");
        metrics.inc_collect_error("disk");
        metrics.inc_collect_error("disk");
        metrics.inc_collect_error("net");

        assert_eq!(
            metrics
                .agent_collect_errors_total
                .with_label_values(&["disk"])
                .get(),
            2.0
        );
        assert_eq!(
            metrics
                .agent_collect_errors_total
                .with_label_values(&["net"])
                .get(),
            1.0
        );
    }
}
