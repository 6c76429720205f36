use clap::Parser;
use derive_setters::Setters;
use std::path::PathBuf;

use crate::domain::DashError;
use crate::export::EXPORT_FILE_NAME;

pub const DEFAULT_ENDPOINT: &str =
    "https://3trjcyhdla.execute-api.eu-north-1.amazonaws.com/Dev";

#[derive(Parser, Debug)]
#[command(
    name = "infradash",
    version,
    about = "Browse, search and export infrastructure inventory records"
)]
pub struct Args {
    /// Inventory endpoint answering with a JSON envelope `{"body": "<json array>"}`
    #[arg(long, env = "INFRADASH_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Directory the spreadsheet export is written to
    #[arg(long, default_value = ".")]
    pub export_dir: String,

    /// Log file, the terminal is owned by the ui
    #[arg(long, default_value = "infradash.log")]
    pub log_file: String,

    /// Event poll interval in milliseconds
    #[arg(long, default_value_t = 100)]
    pub poll_ms: u64,
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct DashConfig {
    #[setters(into)]
    pub endpoint_url: String,
    #[setters(into)]
    pub export_dir: PathBuf,
    #[setters(into)]
    pub log_file: PathBuf,
    pub event_poll_time: u64,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            export_dir: PathBuf::from("."),
            log_file: PathBuf::from("infradash.log"),
            event_poll_time: 100,
        }
    }
}

impl DashConfig {
    pub fn from_args(args: Args) -> Result<Self, DashError> {
        if args.endpoint.trim().is_empty() {
            return Err(DashError::Config("endpoint must not be empty".into()));
        }
        Ok(DashConfig::default()
            .with_endpoint_url(args.endpoint)
            .with_export_dir(expand(&args.export_dir)?)
            .with_log_file(expand(&args.log_file)?)
            .with_event_poll_time(args.poll_ms))
    }

    pub fn export_path(&self) -> PathBuf {
        self.export_dir.join(EXPORT_FILE_NAME)
    }
}

fn expand(path: &str) -> Result<PathBuf, DashError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| DashError::Config(format!("cannot expand {path:?}: {e}")))
}
