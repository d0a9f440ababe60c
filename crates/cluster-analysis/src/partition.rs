//! Cluster assignment over designation edges
//!
//! 1. keep designations whose endpoints both fall in the id range
//! 2. build an undirected graph over them (node order = first appearance)
//! 3. connected components by BFS, indexed in discovery order
//! 4. attach self-designated heads and validate each component

use crate::records::{parse_log, IslLink, LinkRecord, ParsedLog};
use crate::IdRange;
use orbital_mechanics::SatelliteId;
use petgraph::graphmap::{DiGraphMap, UnGraphMap};
use petgraph::visit::{Bfs, Reversed};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

/// One connected component of the designation graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    pub index: usize,
    /// Ascending ids
    pub members: Vec<SatelliteId>,
    /// Every self-designated id in the component, ascending
    pub head_candidates: Vec<SatelliteId>,
    pub headless: bool,
}

impl Cluster {
    /// The validated head: present only when exactly one member self-designates.
    pub fn head(&self) -> Option<SatelliteId> {
        match self.head_candidates.as_slice() {
            [head] => Some(*head),
            _ => None,
        }
    }

    pub fn is_conflicted(&self) -> bool {
        self.head_candidates.len() > 1
    }

    pub fn contains(&self, id: SatelliteId) -> bool {
        self.members.binary_search(&id).is_ok()
    }
}

/// Data-quality findings. Expected in real logs, so returned rather than raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClusterFinding {
    /// No member self-designates
    Headless {
        cluster: usize,
        members: Vec<SatelliteId>,
    },
    /// More than one member self-designates
    Conflict {
        cluster: usize,
        candidates: Vec<SatelliteId>,
    },
    /// Members whose chain of designations never reaches the head
    UnreachableMembers {
        cluster: usize,
        head: SatelliteId,
        members: Vec<SatelliteId>,
    },
}

/// Partition of one timestep plus everything found while building it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    pub clusters: Vec<Cluster>,
    /// Satellite id -> cluster index. Ids with no in-range designation are absent.
    pub membership: BTreeMap<SatelliteId, usize>,
    /// Heads of clusters with exactly one self-designation
    pub heads: BTreeSet<SatelliteId>,
    pub findings: Vec<ClusterFinding>,
    /// In-range inter-satellite links, for visualization only
    pub links: Vec<IslLink>,
    /// Malformed log lines
    pub skipped_lines: usize,
    /// Well-formed records dropped for falling outside the id range
    pub out_of_range: usize,
}

impl ClusterAssignment {
    pub fn cluster_of(&self, id: SatelliteId) -> Option<&Cluster> {
        self.membership
            .get(&id)
            .and_then(|idx| self.clusters.get(*idx))
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.is_conflicted())
    }

    pub fn headless(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter().filter(|c| c.headless)
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Builds a [`ClusterAssignment`] for one timestep's log.
///
/// Holds no state between calls; one builder can serve many timesteps
/// concurrently.
#[derive(Debug, Clone, Copy)]
pub struct ClusterAssignmentBuilder {
    range: IdRange,
}

impl ClusterAssignmentBuilder {
    pub fn new(range: IdRange) -> Self {
        Self { range }
    }

    pub fn range(&self) -> IdRange {
        self.range
    }

    pub fn build_from_text(&self, text: &str) -> ClusterAssignment {
        self.build(&parse_log(text))
    }

    pub fn build(&self, log: &ParsedLog) -> ClusterAssignment {
        let in_range = |r: &LinkRecord| self.range.contains(r.from) && self.range.contains(r.to);

        let designations: Vec<LinkRecord> =
            log.designations.iter().copied().filter(in_range).collect();
        let links: Vec<IslLink> = log
            .links
            .iter()
            .copied()
            .filter(|l| self.range.contains(l.a) && self.range.contains(l.b))
            .collect();
        let out_of_range =
            (log.designations.len() - designations.len()) + (log.links.len() - links.len());

        let mut graph: UnGraphMap<SatelliteId, ()> = UnGraphMap::new();
        for record in &designations {
            graph.add_edge(record.from, record.to, ());
        }

        // Components in first-appearance order
        let mut membership = BTreeMap::new();
        let mut components: Vec<Vec<SatelliteId>> = Vec::new();
        for start in graph.nodes() {
            if membership.contains_key(&start) {
                continue;
            }
            let index = components.len();
            let mut members = Vec::new();
            let mut bfs = Bfs::new(&graph, start);
            while let Some(node) = bfs.next(&graph) {
                membership.insert(node, index);
                members.push(node);
            }
            members.sort_unstable();
            components.push(members);
        }

        let mut candidates: Vec<BTreeSet<SatelliteId>> = vec![BTreeSet::new(); components.len()];
        for record in designations.iter().filter(|r| r.is_self_designation()) {
            if let Some(idx) = membership.get(&record.from) {
                candidates[*idx].insert(record.from);
            }
        }

        let directed: DiGraphMap<SatelliteId, ()> =
            designations.iter().map(|r| (r.from, r.to)).collect();

        let mut clusters = Vec::with_capacity(components.len());
        let mut heads = BTreeSet::new();
        let mut findings = Vec::new();

        for (index, (members, heads_in)) in components.into_iter().zip(candidates).enumerate() {
            let cluster = Cluster {
                index,
                headless: heads_in.is_empty(),
                head_candidates: heads_in.into_iter().collect(),
                members,
            };

            if cluster.headless {
                warn!(cluster = index, size = cluster.members.len(), "Cluster has no head");
                findings.push(ClusterFinding::Headless {
                    cluster: index,
                    members: cluster.members.clone(),
                });
            } else if cluster.is_conflicted() {
                warn!(cluster = index, candidates = ?cluster.head_candidates, "Conflicting cluster heads");
                findings.push(ClusterFinding::Conflict {
                    cluster: index,
                    candidates: cluster.head_candidates.clone(),
                });
            } else if let Some(head) = cluster.head() {
                heads.insert(head);
                let unreachable = unreachable_from_head(&directed, head, &cluster.members);
                if !unreachable.is_empty() {
                    warn!(cluster = index, %head, stray = unreachable.len(), "Members do not reach their head");
                    findings.push(ClusterFinding::UnreachableMembers {
                        cluster: index,
                        head,
                        members: unreachable,
                    });
                }
            }

            clusters.push(cluster);
        }

        debug!(
            clusters = clusters.len(),
            heads = heads.len(),
            findings = findings.len(),
            skipped = log.skipped_count(),
            out_of_range,
            "Cluster assignment built"
        );

        ClusterAssignment {
            clusters,
            membership,
            heads,
            findings,
            links,
            skipped_lines: log.skipped_count(),
            out_of_range,
        }
    }
}

/// Members that cannot reach `head` by following `a->b` designations.
fn unreachable_from_head(
    directed: &DiGraphMap<SatelliteId, ()>,
    head: SatelliteId,
    members: &[SatelliteId],
) -> Vec<SatelliteId> {
    let reversed = Reversed(directed);
    let mut reached = HashSet::new();
    let mut bfs = Bfs::new(reversed, head);
    while let Some(node) = bfs.next(reversed) {
        reached.insert(node);
    }

    members
        .iter()
        .copied()
        .filter(|m| !reached.contains(m))
        .collect()
}

/// Parse `text` and build the cluster assignment restricted to `range`.
pub fn build_cluster_partition(text: &str, range: IdRange) -> ClusterAssignment {
    ClusterAssignmentBuilder::new(range).build_from_text(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn range(min: u32, max: u32) -> IdRange {
        IdRange::new(min, max).unwrap()
    }

    fn ids(raw: &[u32]) -> Vec<SatelliteId> {
        raw.iter().copied().map(SatelliteId).collect()
    }

    #[test]
    fn test_two_clean_clusters() {
        let result = build_cluster_partition("1->1\n2->1\n3->3\n", range(1, 3));

        assert_eq!(result.clusters.len(), 2);
        assert_eq!(result.clusters[0].members, ids(&[1, 2]));
        assert_eq!(result.clusters[0].head(), Some(SatelliteId(1)));
        assert_eq!(result.clusters[1].members, ids(&[3]));
        assert_eq!(result.clusters[1].head(), Some(SatelliteId(3)));
        assert_eq!(result.heads, ids(&[1, 3]).into_iter().collect());
        assert_eq!(result.conflicts().count(), 0);
        assert_eq!(result.headless().count(), 0);
        assert!(result.is_clean());
    }

    #[test]
    fn test_conflicting_heads_reported() {
        let text = "1->1\n1->1\n2->2\n2->1\n";
        let result = build_cluster_partition(text, range(1, 10));

        assert_eq!(result.clusters.len(), 1);
        let cluster = &result.clusters[0];
        assert!(cluster.is_conflicted());
        assert_eq!(cluster.head(), None);
        assert!(result.heads.is_empty());
        assert_eq!(
            result.findings,
            vec![ClusterFinding::Conflict {
                cluster: 0,
                candidates: ids(&[1, 2]),
            }]
        );
    }

    #[test]
    fn test_duplicate_self_designation_is_one_head() {
        let result = build_cluster_partition("5->5\n5->5\n6->5\n", range(1, 10));
        assert_eq!(result.clusters[0].head(), Some(SatelliteId(5)));
        assert!(result.is_clean());
    }

    #[test]
    fn test_headless_cluster_flagged() {
        let result = build_cluster_partition("1->2\n2->3\n", range(1, 10));

        assert_eq!(result.clusters.len(), 1);
        assert!(result.clusters[0].headless);
        assert_eq!(result.clusters[0].head(), None);
        assert_eq!(
            result.findings,
            vec![ClusterFinding::Headless {
                cluster: 0,
                members: ids(&[1, 2, 3]),
            }]
        );
    }

    #[test]
    fn test_out_of_range_records_filtered() {
        let result = build_cluster_partition("1->1\n2->1\n2->40\n40->40\n", range(1, 21));

        assert_eq!(result.out_of_range, 2);
        assert_eq!(result.skipped_lines, 0);
        assert!(result.cluster_of(SatelliteId(40)).is_none());
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].members, ids(&[1, 2]));
    }

    #[test]
    fn test_cluster_of_with_stale_membership() {
        let mut result = build_cluster_partition("1->1\n2->1\n", range(1, 10));
        result.membership.insert(SatelliteId(5), 7);

        assert!(result.cluster_of(SatelliteId(5)).is_none());
        assert_eq!(result.cluster_of(SatelliteId(2)).map(|c| c.index), Some(0));
    }

    #[test]
    fn test_isolated_ids_have_no_cluster() {
        let result = build_cluster_partition("1->1\n3-4\n", range(1, 10));

        // Links alone do not create clusters
        assert!(result.cluster_of(SatelliteId(3)).is_none());
        assert!(result.cluster_of(SatelliteId(4)).is_none());
        assert!(result.cluster_of(SatelliteId(7)).is_none());
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.membership.len(), 1);
    }

    #[test]
    fn test_malformed_lines_counted() {
        let result = build_cluster_partition("1->1\nnot a record\n2->?\n2->1\n", range(1, 10));
        assert_eq!(result.skipped_lines, 2);
        assert_eq!(result.clusters.len(), 1);
        assert_eq!(result.clusters[0].members, ids(&[1, 2]));
    }

    #[test]
    fn test_cluster_index_by_first_appearance() {
        let result = build_cluster_partition("9->9\n2->2\n8->9\n1->2\n", range(1, 10));

        assert_eq!(result.clusters[0].members, ids(&[8, 9]));
        assert_eq!(result.clusters[1].members, ids(&[1, 2]));
        assert_eq!(result.membership[&SatelliteId(8)], 0);
        assert_eq!(result.membership[&SatelliteId(1)], 1);
    }

    #[test]
    fn test_unreachable_member_reported() {
        // 3 is attached only by the head designating it
        let result = build_cluster_partition("1->1\n2->1\n1->3\n", range(1, 10));

        assert_eq!(result.clusters[0].head(), Some(SatelliteId(1)));
        assert_eq!(
            result.findings,
            vec![ClusterFinding::UnreachableMembers {
                cluster: 0,
                head: SatelliteId(1),
                members: ids(&[3]),
            }]
        );
    }

    #[test]
    fn test_multi_hop_chain_reaches_head() {
        let result = build_cluster_partition("7->7\n6->7\n5->6\n4->5\n", range(1, 10));
        assert_eq!(result.clusters[0].head(), Some(SatelliteId(7)));
        assert!(result.is_clean());
    }

    #[test]
    fn test_empty_log() {
        let result = build_cluster_partition("# nothing\n\n", range(1, 10));
        assert!(result.clusters.is_empty());
        assert!(result.membership.is_empty());
        assert!(result.is_clean());
    }

    fn records_strategy() -> impl Strategy<Value = Vec<(u32, u32)>> {
        prop::collection::vec((1u32..30, 1u32..30), 0..60)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        // Clusters form a partition of exactly the in-range endpoints
        #[test]
        fn fuzz_clusters_partition_endpoints(records in records_strategy(), lo in 1u32..10, hi in 10u32..30) {
            let text: String = records.iter().map(|(a, b)| format!("{a}->{b}\n")).collect();
            let result = build_cluster_partition(&text, range(lo, hi));

            let mut endpoints = BTreeSet::new();
            for (a, b) in &records {
                if (lo..=hi).contains(a) && (lo..=hi).contains(b) {
                    endpoints.insert(SatelliteId(*a));
                    endpoints.insert(SatelliteId(*b));
                }
            }

            let mut seen = BTreeSet::new();
            for (idx, cluster) in result.clusters.iter().enumerate() {
                prop_assert_eq!(cluster.index, idx);
                prop_assert!(!cluster.members.is_empty());
                for m in &cluster.members {
                    prop_assert!(seen.insert(*m), "{} in two clusters", m);
                    prop_assert_eq!(result.membership[m], idx);
                }
            }
            prop_assert_eq!(seen, endpoints);
        }

        // Every cluster is exactly one of: headed, headless, conflicted
        #[test]
        fn fuzz_head_classification(records in records_strategy()) {
            let text: String = records.iter().map(|(a, b)| format!("{a}->{b}\n")).collect();
            let result = build_cluster_partition(&text, range(1, 30));

            for cluster in &result.clusters {
                let states = [cluster.head().is_some(), cluster.headless, cluster.is_conflicted()];
                prop_assert_eq!(states.iter().filter(|s| **s).count(), 1);
                if let Some(head) = cluster.head() {
                    prop_assert!(result.heads.contains(&head));
                    prop_assert!(cluster.contains(head));
                }
            }
        }
    }
}
