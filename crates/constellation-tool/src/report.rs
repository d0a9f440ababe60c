//! Cluster report for the visualization scripts

use crate::Result;
use cluster_analysis::{ClusterAssignment, ClusterFinding, IdRange, IslLink};
use orbital_mechanics::transforms::{equirectangular, MapPoint};
use orbital_mechanics::{SatelliteId, SatellitePosition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberEntry {
    pub id: SatelliteId,
    /// Flat-map coordinates, present when a snapshot was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<MapPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<SatelliteId>,
    pub headless: bool,
    pub head_candidates: Vec<SatelliteId>,
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterReport {
    pub id_range: IdRange,
    pub clusters: Vec<ClusterEntry>,
    pub heads: Vec<SatelliteId>,
    pub findings: Vec<ClusterFinding>,
    pub links: Vec<IslLink>,
    pub skipped_lines: usize,
    pub out_of_range: usize,
}

impl ClusterReport {
    /// `positions` must be sorted by id, as returned by [`crate::io::parse_snapshot`].
    pub fn new(
        id_range: IdRange,
        assignment: &ClusterAssignment,
        positions: Option<&[(SatelliteId, SatellitePosition)]>,
    ) -> Result<Self> {
        let locate = |id: SatelliteId| -> Result<Option<MapPoint>> {
            let Some(positions) = positions else {
                return Ok(None);
            };
            match positions.binary_search_by_key(&id, |(sid, _)| *sid) {
                Ok(idx) => Ok(Some(equirectangular(&positions[idx].1)?)),
                Err(_) => Ok(None),
            }
        };

        let mut clusters = Vec::with_capacity(assignment.clusters.len());
        for cluster in &assignment.clusters {
            let members = cluster
                .members
                .iter()
                .map(|id| {
                    Ok(MemberEntry {
                        id: *id,
                        map: locate(*id)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            clusters.push(ClusterEntry {
                index: cluster.index,
                head: cluster.head(),
                headless: cluster.headless,
                head_candidates: cluster.head_candidates.clone(),
                members,
            });
        }

        Ok(Self {
            id_range,
            clusters,
            heads: assignment.heads.iter().copied().collect(),
            findings: assignment.findings.clone(),
            links: assignment.links.clone(),
            skipped_lines: assignment.skipped_lines,
            out_of_range: assignment.out_of_range,
        })
    }
}
