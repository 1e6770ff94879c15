/// Entry point for the habit activity MCP server
///
/// Parses the command line, installs logging on stderr and serves MCP over
/// stdin/stdout until the client disconnects.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use habit_activity::{normalize, DateKey, HabitActivityServer, ServiceConfig};

const DB_FILE: &str = "habits.db";

/// Command line arguments for the habit activity MCP server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    /// (defaults to a writable per-user location)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable verbose output (implies debug)
    #[arg(short, long)]
    verbose: bool,

    /// Upper bound on a single store call, in milliseconds
    #[arg(long, default_value_t = 10_000)]
    store_timeout_ms: u64,

    /// Pin "today" (YYYY-MM-DD) instead of following the local clock
    #[arg(long, value_parser = parse_date_key)]
    today: Option<DateKey>,
}

impl Args {
    fn log_filter(&self) -> String {
        let level = match (self.verbose, self.debug) {
            (true, _) => "debug",
            (false, true) => "info",
            (false, false) => "warn",
        };
        format!("habit_activity={}", level)
    }

    fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            today: self.today,
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }
}

fn parse_date_key(s: &str) -> Result<DateKey, String> {
    normalize(s).map_err(|e| e.to_string())
}

/// Whether files can be created in `dir`, creating it if needed
fn is_writable_dir(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".write_probe");
    let ok = std::fs::write(&probe, b"").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

/// Pick the database location: explicit path, else the first writable
/// per-user directory, else the temp directory
fn resolve_database_path(explicit: Option<PathBuf>) -> std::io::Result<PathBuf> {
    if let Some(path) = explicit {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        return Ok(path);
    }

    let candidates = [
        dirs::home_dir().map(|p| p.join(".habit_activity")),
        dirs::data_dir().map(|p| p.join("habit_activity")),
        dirs::config_dir().map(|p| p.join("habit_activity")),
        std::env::current_dir().ok().map(|p| p.join(".habit_activity")),
    ];
    if let Some(dir) = candidates.into_iter().flatten().find(|dir| is_writable_dir(dir)) {
        return Ok(dir.join(DB_FILE));
    }

    let fallback = std::env::temp_dir().join("habit_activity");
    std::fs::create_dir_all(&fallback)?;
    warn!("No writable user directory, using {}", fallback.display());
    Ok(fallback.join(DB_FILE))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // stdout carries JSON-RPC, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(args.log_filter())
        .with_writer(std::io::stderr)
        .init();

    let db_path = resolve_database_path(args.database.clone())?;
    info!("Using database at: {}", db_path.display());

    let server = HabitActivityServer::new(db_path, args.service_config()).await?;
    server.run().await?;

    info!("Habit activity MCP server shutdown complete");
    Ok(())
}
