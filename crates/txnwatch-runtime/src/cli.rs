//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "txnwatch", about = "SMS bank-transaction monitor")]
pub struct Cli {
    /// UDS socket path (default: $XDG_RUNTIME_DIR/txnwatch/txnwatchd.sock)
    #[arg(long, short = 's', global = true)]
    pub socket_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the monitoring daemon (pipeline + UDS server)
    Daemon(DaemonOpts),
    /// Show daemon status
    Status,
    /// Ask the daemon to start monitoring
    Start,
    /// Ask the daemon to stop monitoring
    Stop,
    /// Inject a raw SMS delivery into the running daemon
    Inject(InjectOpts),
    /// Subscribe to the daemon and print transaction events as JSON lines
    Events,
    /// Classify a sender/body pair without a daemon
    Classify(ClassifyOpts),
    /// Extract structured transaction detail from a message body
    Parse(ParseOpts),
}

#[derive(clap::Args)]
pub struct DaemonOpts {
    /// Classifier rules JSON file (defaults to the built-in lists)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Alert spool file (default: $XDG_RUNTIME_DIR/txnwatch/alerts.jsonl)
    #[arg(long)]
    pub spool_path: Option<PathBuf>,

    /// Boot with monitoring stopped; wait for start_monitoring
    #[arg(long)]
    pub no_auto_start: bool,
}

#[derive(clap::Args)]
pub struct InjectOpts {
    /// Sender field of the fragment
    #[arg(long)]
    pub sender: Option<String>,

    /// Body field of the fragment
    #[arg(long)]
    pub body: Option<String>,

    /// Receive time in epoch milliseconds
    #[arg(long)]
    pub timestamp_ms: Option<i64>,

    /// Encoding-format tag for the delivery
    #[arg(long)]
    pub format: Option<String>,

    /// Read a full delivery JSON object from stdin instead of flags
    #[arg(long)]
    pub stdin: bool,
}

#[derive(clap::Args)]
pub struct ClassifyOpts {
    pub sender: String,
    pub body: String,

    /// Classifier rules JSON file
    #[arg(long)]
    pub rules: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct ParseOpts {
    pub body: String,
}

/// Default socket path using $USER for per-user isolation.
pub fn default_socket_path() -> String {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return format!("{dir}/txnwatch/txnwatchd.sock");
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    format!("/tmp/txnwatch-{user}/txnwatchd.sock")
}

/// Default alert spool path, next to the socket.
pub fn default_spool_path() -> PathBuf {
    if let Ok(dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(format!("{dir}/txnwatch/alerts.jsonl"));
    }
    let user = std::env::var("USER").unwrap_or_else(|_| "unknown".to_string());
    PathBuf::from(format!("/tmp/txnwatch-{user}/alerts.jsonl"))
}
