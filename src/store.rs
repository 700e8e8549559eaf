use std::collections::VecDeque;
use tokio::sync::RwLock;

/// Two value streams sharing one timestamp stream, so index alignment is
/// structural: a row is appended or evicted as a whole.
#[derive(Debug)]
struct SeriesPair {
    a: VecDeque<f64>,
    b: VecDeque<f64>,
    ts: VecDeque<String>,
    capacity: usize,
}

impl SeriesPair {
    fn new(capacity: usize) -> Self {
        Self {
            a: VecDeque::with_capacity(capacity),
            b: VecDeque::with_capacity(capacity),
            ts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, a: f64, b: f64, stamp: String) {
        if self.ts.len() == self.capacity {
            self.a.pop_front();
            self.b.pop_front();
            self.ts.pop_front();
        }
        self.a.push_back(a);
        self.b.push_back(b);
        self.ts.push_back(stamp);
    }

    fn snapshot(&self) -> (Vec<f64>, Vec<f64>, Vec<String>) {
        (
            self.a.iter().copied().collect(),
            self.b.iter().copied().collect(),
            self.ts.iter().cloned().collect(),
        )
    }
}

/// Bounded recent history for the three sampled stream groups. The sampler
/// is the sole writer; queries take point-in-time copies, never live views.
#[derive(Debug)]
pub struct TimeSeriesStore {
    usage: RwLock<SeriesPair>,
    disk: RwLock<SeriesPair>,
    net: RwLock<SeriesPair>,
}

impl TimeSeriesStore {
    /// Creates the store pre-seeded with two placeholder rows per group so
    /// first queries never observe an empty series. `initial_memory_percent`
    /// is a cheap immediate read; everything else seeds at zero.
    pub fn seeded(capacity: usize, initial_memory_percent: f64, stamp: &str) -> Self {
        let mut usage = SeriesPair::new(capacity);
        let mut disk = SeriesPair::new(capacity);
        let mut net = SeriesPair::new(capacity);
        for _ in 0..2 {
            usage.push(0.0, initial_memory_percent, stamp.to_string());
            disk.push(0.0, 0.0, stamp.to_string());
            net.push(0.0, 0.0, stamp.to_string());
        }
        Self {
            usage: RwLock::new(usage),
            disk: RwLock::new(disk),
            net: RwLock::new(net),
        }
    }

    pub async fn push_usage(&self, cpu: f64, memory: f64, stamp: String) {
        self.usage.write().await.push(cpu, memory, stamp);
    }

    pub async fn push_disk(&self, read_mb_s: f64, write_mb_s: f64, stamp: String) {
        self.disk.write().await.push(read_mb_s, write_mb_s, stamp);
    }

    pub async fn push_net(&self, rx_mb_s: f64, tx_mb_s: f64, stamp: String) {
        self.net.write().await.push(rx_mb_s, tx_mb_s, stamp);
    }

    /// (cpu, memory, timestamps)
    pub async fn snapshot_usage(&self) -> (Vec<f64>, Vec<f64>, Vec<String>) {
        self.usage.read().await.snapshot()
    }

    /// (read, write, timestamps)
    pub async fn snapshot_disk(&self) -> (Vec<f64>, Vec<f64>, Vec<String>) {
        self.disk.read().await.snapshot()
    }

    /// (rx, tx, timestamps)
    pub async fn snapshot_net(&self) -> (Vec<f64>, Vec<f64>, Vec<String>) {
        self.net.read().await.snapshot()
    }
}
