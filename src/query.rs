use crate::procs::{ProcessCache, ProcessSnapshot};
use crate::source::{GpuReport, MetricSource, TempReading};
use crate::store::TimeSeriesStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, serde::Serialize)]
pub struct UsageSeries {
    pub cpu: Vec<f64>,
    pub memory: Vec<f64>,
    pub timestamps: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DiskSeries {
    pub read: Vec<f64>,
    pub write: Vec<f64>,
    pub timestamps: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NetSeries {
    pub rx: Vec<f64>,
    pub tx: Vec<f64>,
    pub timestamps: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Temperatures {
    pub temps: Vec<TempReading>,
}

/// Read-only accessor layer over the store, the process cache and the
/// cheap passthrough metric reads. No mutation capability.
pub struct QueryService {
    store: Arc<TimeSeriesStore>,
    procs: Arc<ProcessCache>,
    source: Arc<Mutex<Box<dyn MetricSource>>>,
}

impl QueryService {
    pub fn new(
        store: Arc<TimeSeriesStore>,
        procs: Arc<ProcessCache>,
        source: Arc<Mutex<Box<dyn MetricSource>>>,
    ) -> Self {
        Self {
            store,
            procs,
            source,
        }
    }

    pub async fn usage(&self) -> UsageSeries {
        let (cpu, memory, timestamps) = self.store.snapshot_usage().await;
        UsageSeries {
            cpu,
            memory,
            timestamps,
        }
    }

    pub async fn disk(&self) -> DiskSeries {
        let (read, write, timestamps) = self.store.snapshot_disk().await;
        DiskSeries {
            read,
            write,
            timestamps,
        }
    }

    pub async fn net(&self) -> NetSeries {
        let (rx, tx, timestamps) = self.store.snapshot_net().await;
        NetSeries { rx, tx, timestamps }
    }

    pub async fn top_processes(&self) -> Arc<ProcessSnapshot> {
        self.procs.top().await
    }

    /// Direct passthrough; sensor reads are cheap enough to skip caching.
    pub async fn temperatures(&self) -> Temperatures {
        let temps = self.source.lock().await.temperatures();
        Temperatures { temps }
    }

    /// Direct passthrough; degrades to `{available: false, gpus: []}`.
    pub async fn gpus(&self) -> GpuReport {
        self.source.lock().await.gpus()
    }
}
