mod config;
mod http;
mod metrics;
mod procs;
mod query;
mod rates;
mod sampler;
mod source;
mod store;

use axum::serve;
use clap::Parser;
use config::Config;
use metrics::Metrics;
use procs::{ProcessCache, SystemClock};
use query::QueryService;
use sampler::Sampler;
use source::gpu::{self, NoopGpuProbe};
use source::system::SysinfoSource;
use source::MetricSource;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use store::TimeSeriesStore;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hostpulse")]
#[command(version)]
struct Cli {
    /// Path to a YAML config; defaults apply when omitted.
    #[arg(long)]
    config: Option<String>,
    #[arg(long)]
    print_default_config: bool,
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();
    if cli.print_default_config {
        println!("{}", Config::example_yaml());
        return;
    }

    let cfg = match &cli.config {
        Some(path) => match Config::load_from_file(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                error!(error = %err, "failed to load config");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    info!(
        listen = %cfg.listen,
        interval_secs = cfg.interval_secs,
        history_samples = cfg.history_samples,
        "starting hostpulse"
    );

    let metrics = match Metrics::new() {
        Ok(m) => m,
        Err(err) => {
            error!(error = %err, "failed to initialize metrics");
            std::process::exit(1);
        }
    };

    // The sampler owns its source; on-demand queries (processes, temps,
    // GPU) share a second one behind a lock.
    let mut sampler_source = SysinfoSource::new(Box::new(NoopGpuProbe));
    let shared_source: Arc<Mutex<Box<dyn MetricSource>>> =
        Arc::new(Mutex::new(Box::new(SysinfoSource::new(gpu::detect()))));

    let initial_memory = sampler_source.memory_percent();
    let seed_stamp = chrono::Local::now().format("%H:%M:%S").to_string();
    let store = Arc::new(TimeSeriesStore::seeded(
        cfg.history_samples,
        initial_memory,
        &seed_stamp,
    ));
    let procs = Arc::new(ProcessCache::new(
        shared_source.clone(),
        Duration::from_secs_f64(cfg.procs_ttl_secs),
        cfg.top_n,
        Arc::new(SystemClock),
    ));
    let query = Arc::new(QueryService::new(store.clone(), procs, shared_source));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_task = {
        let cfg = cfg.clone();
        let metrics = metrics.clone();
        let mut shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            let app = http::build_router(query, metrics);
            let addr: SocketAddr = match cfg.listen.parse() {
                Ok(addr) => addr,
                Err(err) => {
                    error!(error = %err, listen = %cfg.listen, "invalid listen address");
                    return;
                }
            };

            let listener = match TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(err) => {
                    error!(error = %err, "failed to start HTTP server");
                    return;
                }
            };

            let server = serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });

            if let Err(err) = server.await {
                error!(error = %err, "HTTP server error");
            }
        })
    };

    let sampler_task = {
        let interval = Duration::from_secs(cfg.interval_secs);
        let sampler = Sampler::new(sampler_source, store, metrics);
        let shutdown_rx = shutdown_rx.clone();
        tokio::spawn(async move {
            sampler.run(interval, shutdown_rx).await;
        })
    };

    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to wait for Ctrl+C");
    }
    info!("received Ctrl+C, shutting down");

    let _ = shutdown_tx.send(true);

    let _ = sampler_task.await;
    let _ = http_task.await;
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
