use crate::source::{GpuReading, GpuReport};
use std::process::Command;
use tracing::debug;

/// GPU telemetry capability. The concrete probe is picked once at startup;
/// hosts without a supported backend get the no-op probe and the degraded
/// `{available: false, gpus: []}` shape from then on.
pub trait GpuProbe: Send {
    fn read(&self) -> GpuReport;
}

pub struct NvidiaSmiProbe;

pub struct NoopGpuProbe;

impl GpuProbe for NvidiaSmiProbe {
    fn read(&self) -> GpuReport {
        let gpus = query_nvidia_smi();
        GpuReport {
            available: !gpus.is_empty(),
            gpus,
        }
    }
}

impl GpuProbe for NoopGpuProbe {
    fn read(&self) -> GpuReport {
        GpuReport::default()
    }
}

/// Probes for a working nvidia-smi once and fixes the choice for the
/// process lifetime.
pub fn detect() -> Box<dyn GpuProbe> {
    if query_nvidia_smi().is_empty() {
        debug!("nvidia-smi unavailable, GPU telemetry disabled");
        Box::new(NoopGpuProbe)
    } else {
        debug!("nvidia-smi detected, GPU telemetry enabled");
        Box::new(NvidiaSmiProbe)
    }
}

fn query_nvidia_smi() -> Vec<GpuReading> {
    let output = run_nvidia_smi(&[
        "--query-gpu=index,name,utilization.gpu,memory.used,memory.total,temperature.gpu",
        "--format=csv,noheader,nounits",
    ]);

    let Some(output) = output else {
        return Vec::new();
    };
    if !output.status.success() {
        return Vec::new();
    }

    let Ok(text) = String::from_utf8(output.stdout) else {
        return Vec::new();
    };

    text.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split(',').map(|v| v.trim()).collect();
            if parts.len() < 6 {
                return None;
            }

            Some(GpuReading {
                id: parts[0].parse::<u32>().ok()?,
                name: parts[1].to_string(),
                load: parse_field(parts[2]).unwrap_or(0.0),
                mem_used_mb: parse_field(parts[3]).unwrap_or(0.0),
                mem_total_mb: parse_field(parts[4]).unwrap_or(0.0),
                temp: parse_field(parts[5]).unwrap_or(0.0),
            })
        })
        .collect()
}

fn run_nvidia_smi(args: &[&str]) -> Option<std::process::Output> {
    if let Ok(output) = Command::new("nvidia-smi").args(args).output() {
        return Some(output);
    }

    #[cfg(target_os = "windows")]
    {
        if let Ok(output) = Command::new(r"C:\Windows\System32\nvidia-smi.exe")
            .args(args)
            .output()
        {
            return Some(output);
        }
    }

    None
}

/// With `nounits` the query emits plain numbers; sensors the driver cannot
/// read come back as `[N/A]` and degrade to `None`.
fn parse_field(input: &str) -> Option<f64> {
    input.trim().parse::<f64>().ok()
}
