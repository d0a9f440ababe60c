//! Cluster Analysis - per-timestep connectivity clusters
//!
//! Consumes the link/cluster log a clustering run writes for one timestep and
//! turns its designation edges into a partition of satellite ids:
//!
//! - `a-b`  inter-satellite link (kept for visualization, not clustered)
//! - `a->b` satellite `a` designates `b` as its cluster head
//! - `h->h` self-designation marking `h` as a head candidate
//!
//! Components are found over the undirected designation graph and numbered
//! by first appearance in the log. Headless components, components with
//! several heads, and members whose designation chain never reaches the head
//! are reported as findings next to the partition, never as errors.

use orbital_mechanics::SatelliteId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod partition;
pub mod records;

pub use partition::{
    build_cluster_partition, Cluster, ClusterAssignment, ClusterAssignmentBuilder, ClusterFinding,
};
pub use records::{parse_line, parse_log, IslLink, LinkRecord, ParsedLog, Record, RecordError, SkippedLine};

/// Cluster analysis errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Empty id range: {min} > {max}")]
    InvalidRange { min: u32, max: u32 },
    #[error("Invalid plane range: {0}")]
    InvalidPlaneRange(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

/// Inclusive satellite id window the analysis is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRange {
    pub min: SatelliteId,
    pub max: SatelliteId,
}

impl IdRange {
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min > max {
            return Err(ClusterError::InvalidRange { min, max });
        }
        Ok(Self {
            min: SatelliteId(min),
            max: SatelliteId(max),
        })
    }

    /// Id window covering 1-based planes `plane_start..=plane_end`.
    pub fn from_planes(plane_start: u32, plane_end: u32, sats_per_plane: u32) -> Result<Self> {
        if plane_start == 0 || plane_start > plane_end {
            return Err(ClusterError::InvalidPlaneRange(format!(
                "planes {plane_start}..={plane_end} (planes are 1-based)"
            )));
        }
        if sats_per_plane == 0 {
            return Err(ClusterError::InvalidPlaneRange(
                "satellites per plane must be positive".to_string(),
            ));
        }
        let max = plane_end.checked_mul(sats_per_plane).ok_or_else(|| {
            ClusterError::InvalidPlaneRange(format!("plane {plane_end} overflows the id space"))
        })?;
        let min = (plane_start - 1) * sats_per_plane + 1;
        Self::new(min, max)
    }

    pub fn contains(&self, id: SatelliteId) -> bool {
        self.min <= id && id <= self.max
    }

    /// Number of ids in the window.
    pub fn span(&self) -> usize {
        (self.max.0 - self.min.0) as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_range_from_planes() {
        // Planes 1-5 of a 21-per-plane shell
        let range = IdRange::from_planes(1, 5, 21).unwrap();
        assert_eq!(range.min, SatelliteId(1));
        assert_eq!(range.max, SatelliteId(105));
        assert_eq!(range.span(), 105);

        let range = IdRange::from_planes(3, 3, 21).unwrap();
        assert_eq!((range.min.0, range.max.0), (43, 63));
    }

    #[test]
    fn test_id_range_rejects_bad_input() {
        assert!(IdRange::new(5, 4).is_err());
        assert!(IdRange::from_planes(0, 3, 21).is_err());
        assert!(IdRange::from_planes(4, 3, 21).is_err());
        assert!(IdRange::from_planes(1, 3, 0).is_err());
    }

    #[test]
    fn test_id_range_contains() {
        let range = IdRange::new(10, 20).unwrap();
        assert!(range.contains(SatelliteId(10)));
        assert!(range.contains(SatelliteId(20)));
        assert!(!range.contains(SatelliteId(9)));
        assert!(!range.contains(SatelliteId(21)));
    }
}
