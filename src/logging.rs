// src/logging.rs

use color_eyre::eyre::Result;
use directories::ProjectDirs;
use lazy_static::lazy_static;
use std::fs::OpenOptions;
use std::path::PathBuf;
use time::macros::format_description;
use tracing_error::ErrorLayer;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    pub static ref LOG_ENV: String = format!("{}_LOGLEVEL", *PROJECT_NAME);
    pub static ref LOG_FILE: String = format!("{}.log", env!("CARGO_PKG_NAME"));
    /// Used when neither `RUST_LOG` nor the project variable is set. The resolver is
    /// chatty at info level, so it is held back to warnings.
    static ref DEFAULT_FILTER: String = format!("{}=info,hickory_resolver=warn,hickory_proto=warn", env!("CARGO_CRATE_NAME"));
}

pub fn project_directory() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "netspecter-rs", env!("CARGO_PKG_NAME"))
}

/// Where the log file and exported reports go.
pub fn get_data_dir() -> PathBuf {
    project_directory()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".data"))
}

/// Where `config.json` is looked up.
pub fn get_config_dir() -> PathBuf {
    project_directory()
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".").join(".config"))
}

/// Installs the file-based tracing subscriber and returns the log file path.
///
/// The terminal belongs to the UI (or to report output in headless mode), so
/// diagnostics only ever go to the log file. Runs append to the same file.
pub fn initialize_logging() -> Result<PathBuf> {
    let directory = get_data_dir();
    std::fs::create_dir_all(&directory)?;
    let log_path = directory.join(LOG_FILE.as_str());
    let log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    let filter = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var(LOG_ENV.as_str()))
        .unwrap_or_else(|_| DEFAULT_FILTER.clone());

    let timer = LocalTime::new(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"));

    let file_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(log_file)
        .with_timer(timer)
        .with_target(false)
        .with_ansi(false)
        .with_filter(EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(file_subscriber)
        .with(ErrorLayer::default())
        .init();

    Ok(log_path)
}
