//! Constellation Tool
//!
//! Caller side of the orbital and cluster engines: loads run configuration,
//! writes per-step snapshot files, reads link logs and produces cluster
//! reports for the visualization scripts.
//!
//! # File formats
//!
//! ```text
//! snapshots/000      one "x y z" line (km) per satellite, ascending id
//! snapshots/001
//! ...
//! snapshots/manifest.json
//!
//! clusters/000       "a-b" links and "a->b" head designations, # comments
//! ```

use thiserror::Error;

pub mod config;
pub mod io;
pub mod report;

pub use config::{ClusterView, RunConfig, Schedule};
pub use report::ClusterReport;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Orbital(#[from] orbital_mechanics::OrbitalError),
    #[error(transparent)]
    Cluster(#[from] cluster_analysis::ClusterError),
    #[error("Malformed snapshot line {line}: {reason}")]
    MalformedSnapshot { line: usize, reason: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;
