/// Floor for the elapsed interval so a delayed or immediate pass never
/// divides by (near) zero.
const MIN_ELAPSED_SECS: f64 = 1e-6;

pub const BYTES_PER_MB: f64 = (1024 * 1024) as f64;

/// Converts two cumulative byte counters plus elapsed wall-clock time into a
/// throughput in MB/s. A counter that went backwards (reset or wraparound)
/// yields a zero delta rather than a negative rate.
pub fn throughput_mb_s(prev: u64, cur: u64, elapsed_secs: f64) -> f64 {
    cur.saturating_sub(prev) as f64 / BYTES_PER_MB / elapsed_secs.max(MIN_ELAPSED_SECS)
}
