use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::logging::LogDestination;

#[derive(Debug, Parser)]
#[command(
    name = "invoice-watch",
    version,
    about = "Watch invoices move through the processing pipeline"
)]
pub struct Cli {
    /// Backend base URL (overrides INVOICE_API_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// RON config file (defaults to ./invoice_watch.ron when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// How many processing log entries to show per invoice
    #[arg(long, global = true, value_name = "N")]
    pub log_entries: Option<usize>,

    #[arg(long = "log", global = true, value_enum)]
    pub log_destination: Option<LogDestination>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Poll invoices until each one completes or halts
    Watch(WatchArgs),
    /// Upload a PDF/PNG/JPEG invoice
    Upload(UploadArgs),
    /// List invoices known to the backend
    List,
    /// Show one invoice with its pipeline and recent log
    Show { invoice_id: String },
    /// Delete an invoice
    Delete { invoice_id: String },
    /// Send feedback telemetry
    Feedback {
        #[arg(value_enum)]
        kind: FeedbackTarget,
        /// JSON body, passed through as-is
        payload: String,
    },
}

#[derive(Debug, Clone, Parser)]
pub struct WatchArgs {
    #[arg(required = true, value_name = "INVOICE_ID")]
    pub invoice_ids: Vec<String>,

    /// Print only when a stage changes, not on every progress tick
    #[arg(long)]
    pub once_per_status: bool,

    /// Export each finished invoice record as JSON into this directory
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Parser)]
pub struct UploadArgs {
    pub file: PathBuf,

    /// Keep watching the uploaded invoice until it finishes
    #[arg(long)]
    pub watch: bool,

    #[arg(long, value_name = "DIR", requires = "watch")]
    pub save_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FeedbackTarget {
    Rl,
    Suggestion,
}
