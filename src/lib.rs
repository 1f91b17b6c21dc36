// src/lib.rs

pub mod config;
pub mod core;
pub mod logging;

pub use crate::config::ScannerConfig;
pub use crate::core::models::ScanReport;
pub use crate::core::scanner::Scanner;
