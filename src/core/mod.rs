// src/core/mod.rs

/// Report, finding and per-phase record types shared by every scanner.
pub mod models;

/// The scan pipeline and the individual phase scanners (DNS, ports, TLS, HTTP).
pub mod scanner;

/// Static security knowledge: header policies, remediation text and codename words.
pub mod knowledge_base;

pub mod target;

/// Threat scoring and codename generation.
pub mod scoring;

pub mod events;
pub mod metrics;
pub mod error;
pub mod collaborators;
