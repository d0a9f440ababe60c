//! Run configuration
//!
//! One immutable value handed to every stage. Loaded from JSON when a file is
//! given, otherwise the defaults below (72x21 shell, 10 minute steps, 50
//! snapshots, cluster view over planes 1-5). CLI flags override either.

use crate::{Result, ToolError};
use cluster_analysis::IdRange;
use orbital_mechanics::WalkerDelta;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

pub const DEFAULT_STEP_SECONDS: f64 = 600.0;
pub const DEFAULT_STEPS: usize = 50;

/// Propagation schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schedule {
    pub step_seconds: f64,
    pub steps: usize,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            step_seconds: DEFAULT_STEP_SECONDS,
            steps: DEFAULT_STEPS,
        }
    }
}

/// 1-based plane window for cluster analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterView {
    pub plane_start: u32,
    pub plane_end: u32,
}

impl Default for ClusterView {
    fn default() -> Self {
        Self {
            plane_start: 1,
            plane_end: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub constellation: WalkerDelta,
    pub schedule: Schedule,
    pub clusters: ClusterView,
}

impl RunConfig {
    /// Parse a config file and check the sections every command relies on.
    /// The cluster view is checked by [`RunConfig::cluster_range`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading run configuration from {:?}", path);

        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: RunConfig = serde_json::from_reader(reader)?;
        config.validate_propagation()?;
        Ok(config)
    }

    /// Checks for snapshot generation: the shell and the schedule.
    pub fn validate_propagation(&self) -> Result<()> {
        self.constellation.validate()?;

        let step = self.schedule.step_seconds;
        if !(step.is_finite() && step > 0.0) {
            return Err(ToolError::Config(format!(
                "step_seconds must be positive, got {step}"
            )));
        }
        Ok(())
    }

    /// Satellite id window for the configured plane view.
    pub fn cluster_range(&self) -> Result<IdRange> {
        if self.clusters.plane_end > self.constellation.planes {
            return Err(ToolError::Config(format!(
                "cluster view ends at plane {} but the constellation has {}",
                self.clusters.plane_end, self.constellation.planes
            )));
        }
        Ok(IdRange::from_planes(
            self.clusters.plane_start,
            self.clusters.plane_end,
            self.constellation.sats_per_plane,
        )?)
    }
}
