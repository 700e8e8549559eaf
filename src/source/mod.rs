pub mod gpu;
pub mod system;

/// Cumulative disk byte counters since boot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskCounters {
    pub read_bytes: u64,
    pub write_bytes: u64,
}

/// Cumulative network byte counters since boot, summed over interfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetCounters {
    pub bytes_recv: u64,
    pub bytes_sent: u64,
}

/// One row of the raw process table.
#[derive(Debug, Clone)]
pub struct RawProcess {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_rss_bytes: u64,
}

/// Hottest reading of one sensor group.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TempReading {
    pub label: String,
    pub current: f64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GpuReading {
    pub id: u32,
    pub name: String,
    pub load: f64,
    pub mem_used_mb: f64,
    pub mem_total_mb: f64,
    pub temp: f64,
}

/// The GPU subsystem as a whole degrades to `available: false` when no
/// backend is present or a read fails.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct GpuReport {
    pub available: bool,
    pub gpus: Vec<GpuReading>,
}

/// Read-only host metric accessors. Each is independently fallible:
/// a subsystem the host does not expose degrades to `None`/empty/default,
/// never an error that crosses this boundary.
pub trait MetricSource: Send {
    fn cpu_percent(&mut self) -> f64;
    fn memory_percent(&mut self) -> f64;
    fn disk_counters(&mut self) -> Option<DiskCounters>;
    fn net_counters(&mut self) -> Option<NetCounters>;
    fn processes(&mut self) -> Vec<RawProcess>;
    fn temperatures(&mut self) -> Vec<TempReading>;
    fn gpus(&mut self) -> GpuReport;
}
