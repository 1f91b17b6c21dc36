// src/ui/widgets/mod.rs

pub mod analysis_view; // Vulnerability list with details.
pub mod disclaimer_popup;
pub mod footer;
pub mod input;
pub mod log_view; // Live scan progress.
pub mod summary;
