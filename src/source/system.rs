use crate::source::gpu::GpuProbe;
use crate::source::{
    DiskCounters, GpuReport, MetricSource, NetCounters, RawProcess, TempReading,
};
#[cfg(target_os = "linux")]
use std::fs;
use sysinfo::{ComponentExt, CpuExt, NetworkExt, NetworksExt, PidExt, ProcessExt, System, SystemExt};

/// Production `MetricSource` over the sysinfo crate, plus raw procfs reads
/// for the counters sysinfo does not expose.
pub struct SysinfoSource {
    system: System,
    gpu_probe: Box<dyn GpuProbe>,
}

impl SysinfoSource {
    pub fn new(gpu_probe: Box<dyn GpuProbe>) -> Self {
        Self {
            system: System::new(),
            gpu_probe,
        }
    }
}

impl MetricSource for SysinfoSource {
    fn cpu_percent(&mut self) -> f64 {
        self.system.refresh_cpu();
        let cpus = self.system.cpus();
        if cpus.is_empty() {
            return 0.0;
        }
        let sum: f32 = cpus.iter().map(|c| c.cpu_usage()).sum();
        (sum / cpus.len() as f32) as f64
    }

    fn memory_percent(&mut self) -> f64 {
        self.system.refresh_memory();
        let total = self.system.total_memory();
        if total == 0 {
            return 0.0;
        }
        (self.system.used_memory() as f64 / total as f64) * 100.0
    }

    #[cfg(target_os = "linux")]
    fn disk_counters(&mut self) -> Option<DiskCounters> {
        let text = fs::read_to_string("/proc/diskstats").ok()?;
        Some(parse_diskstats(&text))
    }

    #[cfg(not(target_os = "linux"))]
    fn disk_counters(&mut self) -> Option<DiskCounters> {
        None
    }

    fn net_counters(&mut self) -> Option<NetCounters> {
        self.system.refresh_networks_list();
        self.system.refresh_networks();
        let mut counters = NetCounters {
            bytes_recv: 0,
            bytes_sent: 0,
        };
        for (_iface, data) in self.system.networks().iter() {
            counters.bytes_recv = counters.bytes_recv.saturating_add(data.total_received());
            counters.bytes_sent = counters.bytes_sent.saturating_add(data.total_transmitted());
        }
        Some(counters)
    }

    fn processes(&mut self) -> Vec<RawProcess> {
        self.system.refresh_processes();
        self.system
            .processes()
            .iter()
            .map(|(pid, process)| RawProcess {
                pid: pid.as_u32(),
                name: process.name().to_string(),
                cpu_percent: process.cpu_usage() as f64,
                memory_rss_bytes: process.memory(),
            })
            .collect()
    }

    fn temperatures(&mut self) -> Vec<TempReading> {
        self.system.refresh_components_list();
        self.system.refresh_components();
        let readings = self
            .system
            .components()
            .iter()
            .map(|c| (c.label().to_string(), c.temperature() as f64));
        group_temps(readings)
    }

    fn gpus(&mut self) -> GpuReport {
        self.gpu_probe.read()
    }
}

/// Collapses per-core/per-zone component readings into one entry per sensor
/// group (the label up to the first space), keeping the hottest reading.
fn group_temps(readings: impl Iterator<Item = (String, f64)>) -> Vec<TempReading> {
    let mut groups: Vec<TempReading> = Vec::new();
    for (label, current) in readings {
        if !current.is_finite() || current <= 0.0 {
            continue;
        }
        let group = label
            .split_whitespace()
            .next()
            .unwrap_or(label.as_str())
            .to_string();
        match groups.iter_mut().find(|t| t.label == group) {
            Some(existing) => existing.current = existing.current.max(current),
            None => groups.push(TempReading {
                label: group,
                current,
            }),
        }
    }
    groups.sort_by(|a, b| a.label.cmp(&b.label));
    groups
}

/// Sums the sector counters of physical block devices. `/proc/diskstats`
/// sector counts are always 512-byte units.
fn parse_diskstats(text: &str) -> DiskCounters {
    const SECTOR_BYTES: u64 = 512;
    let mut counters = DiskCounters {
        read_bytes: 0,
        write_bytes: 0,
    };

    for line in text.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let name = fields[2];
        if !is_physical_device(name) {
            continue;
        }
        let Ok(sectors_read) = fields[5].parse::<u64>() else {
            continue;
        };
        let Ok(sectors_written) = fields[9].parse::<u64>() else {
            continue;
        };
        counters.read_bytes = counters
            .read_bytes
            .saturating_add(sectors_read.saturating_mul(SECTOR_BYTES));
        counters.write_bytes = counters
            .write_bytes
            .saturating_add(sectors_written.saturating_mul(SECTOR_BYTES));
    }

    counters
}

/// Keeps whole physical disks and drops virtual devices and partitions so
/// bytes are not counted twice.
fn is_physical_device(name: &str) -> bool {
    const VIRTUAL_PREFIXES: [&str; 7] = ["loop", "ram", "zram", "dm-", "md", "sr", "fd"];
    if VIRTUAL_PREFIXES.iter().any(|p| name.starts_with(p)) {
        return false;
    }
    if let Some(rest) = name.strip_prefix("nvme") {
        return !rest.contains('p');
    }
    if let Some(rest) = name.strip_prefix("mmcblk") {
        return !rest.contains('p');
    }
    !name.ends_with(|c: char| c.is_ascii_digit())
}
