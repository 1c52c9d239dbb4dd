//! hostwatch - Terminal dashboard for fleet resource metrics.
//!
//! Polls a metrics backend over HTTP and shows live host cards, disk usage
//! pies, history charts, per-user summaries and server diagnostics.
//!
//! Usage:
//!   hostwatch                                  # dashboard against http://127.0.0.1:8000
//!   hostwatch --api http://metrics:8000        # custom backend
//!   hostwatch --page history --host gpu01      # open the history page for a host
//!   RUST_LOG=hostwatch_core=debug hostwatch    # verbose log file

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod tui;

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use hostwatch_core::source::http::HttpSource;

use tui::{App, AppConfig, Page};

const DEFAULT_API: &str = "http://127.0.0.1:8000";

/// Terminal dashboard for fleet resource metrics.
#[derive(Parser)]
#[command(name = "hostwatch", about = "Fleet resource dashboard", version = hostwatch_core::VERSION)]
struct Args {
    /// Base URL of the metrics backend.
    #[arg(long, env = "HOSTWATCH_API", default_value = DEFAULT_API)]
    api: String,

    /// Refresh interval in seconds.
    #[arg(short, long, env = "HOSTWATCH_INTERVAL", default_value = "60")]
    interval: u64,

    /// Page shown at start.
    #[arg(short, long, value_enum, default_value = "dashboard")]
    page: Page,

    /// Host preselected on the history and server pages.
    #[arg(long)]
    host: Option<String>,

    /// File holding the saved card order.
    /// Default: <config dir>/hostwatch/state.json
    #[arg(long, env = "HOSTWATCH_STATE", value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Log file (the terminal is taken by the UI).
    /// Default: <cache dir>/hostwatch.log
    #[arg(long, env = "HOSTWATCH_LOG", value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// HTTP request timeout in seconds.
    #[arg(long, default_value = "10")]
    timeout: u64,
}

fn default_state_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("hostwatch")
        .join("state.json")
}

fn default_log_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("hostwatch.log")
}

/// Initializes the tracing subscriber writing to `path`.
/// `RUST_LOG` overrides the default `info` level for both crates.
fn init_logging(path: &Path) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("hostwatch=info,hostwatch_core=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}

fn main() {
    let args = Args::parse();

    let log_file = args.log_file.clone().unwrap_or_else(default_log_file);
    if let Err(e) = init_logging(&log_file) {
        eprintln!("Error: cannot open log file '{}': {}", log_file.display(), e);
        std::process::exit(1);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("hostwatch-fetch")
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: cannot start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let source = match HttpSource::new(&args.api, Duration::from_secs(args.timeout.max(1))) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let config = AppConfig {
        interval_secs: args.interval.max(1) as f64,
        page: args.page,
        host: args.host,
        state_file: args.state_file.unwrap_or_else(default_state_file),
    };

    tracing::info!(
        version = hostwatch_core::VERSION,
        api = %source.base_url(),
        interval = config.interval_secs,
        state_file = %config.state_file.display(),
        "hostwatch starting"
    );

    let result = App::new(Arc::new(source), runtime.handle().clone(), config)
        .and_then(|app| app.run(Duration::from_millis(250)));
    if let Err(e) = result {
        tracing::error!(error = %e, "hostwatch stopped");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    tracing::info!("hostwatch stopped");
}
