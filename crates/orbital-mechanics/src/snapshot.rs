//! Time-stepped constellation snapshots
//!
//! [`SnapshotSequence`] owns a state buffer of satellites and advances it by
//! one fixed step per `next()`. Snapshot `k` is the state after `k + 1`
//! steps, so the first snapshot is already one step in. Each step is mapped
//! across satellites with rayon; steps are strictly sequential.

use crate::{
    OrbitalError, Result, Satellite, SatelliteId, SatellitePosition, TwoBodyPropagator,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Positions of every satellite at one step, in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Zero-based step index
    pub step: usize,
    /// Absolute elapsed time since the initial state
    pub elapsed_s: f64,
    pub positions: Vec<(SatelliteId, SatellitePosition)>,
}

impl Snapshot {
    /// Three-digit zero-padded step index used as the snapshot file name.
    pub fn file_name(&self) -> String {
        format!("{:03}", self.step)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position(&self, id: SatelliteId) -> Option<&SatellitePosition> {
        self.positions
            .binary_search_by_key(&id, |(sid, _)| *sid)
            .ok()
            .map(|idx| &self.positions[idx].1)
    }
}

/// Lazy, restartable sequence of snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotSequence {
    initial: Vec<Satellite>,
    state: Vec<Satellite>,
    propagator: TwoBodyPropagator,
    step_s: f64,
    steps: usize,
    next_step: usize,
    failed: bool,
}

impl SnapshotSequence {
    pub fn new(
        satellites: Vec<Satellite>,
        propagator: TwoBodyPropagator,
        step_s: f64,
        steps: usize,
    ) -> Result<Self> {
        if !(step_s.is_finite() && step_s > 0.0) {
            return Err(OrbitalError::InvalidConfiguration(format!(
                "time step must be positive, got {step_s} s"
            )));
        }

        let mut satellites = satellites;
        satellites.sort_by_key(|s| s.id);

        Ok(Self {
            state: satellites.clone(),
            initial: satellites,
            propagator,
            step_s,
            steps,
            next_step: 0,
            failed: false,
        })
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Current satellite state buffer (after the last emitted snapshot).
    pub fn state(&self) -> &[Satellite] {
        &self.state
    }

    /// Rewind to the initial state.
    pub fn restart(&mut self) {
        self.state.clone_from(&self.initial);
        self.next_step = 0;
        self.failed = false;
    }

    /// Propagate every satellite one step into a fresh buffer. The state is
    /// replaced only when the whole step succeeded.
    fn advance(&mut self) -> Result<Snapshot> {
        let step = self.next_step;
        let propagator = self.propagator;
        let dt = self.step_s;

        let results: Vec<std::result::Result<(Satellite, SatellitePosition), (SatelliteId, OrbitalError)>> =
            self.state
                .par_iter()
                .map(|sat| {
                    propagator
                        .propagate(&sat.elements, dt)
                        .and_then(|elements| {
                            let position = elements.position()?;
                            Ok((Satellite { elements, ..*sat }, position))
                        })
                        .map_err(|e| (sat.id, e))
                })
                .collect();

        let mut next = Vec::with_capacity(results.len());
        let mut positions = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok((sat, position)) => {
                    positions.push((sat.id, position));
                    next.push(sat);
                }
                Err((satellite, err)) => {
                    return Err(OrbitalError::NumericalDomain {
                        satellite,
                        step,
                        detail: err.to_string(),
                    })
                }
            }
        }
        self.state = next;

        Ok(Snapshot {
            step,
            elapsed_s: (step + 1) as f64 * dt,
            positions,
        })
    }
}

impl Iterator for SnapshotSequence {
    type Item = Result<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_step >= self.steps {
            return None;
        }

        let result = self.advance();
        match &result {
            Ok(snapshot) => {
                debug!(step = snapshot.step, satellites = snapshot.len(), "Snapshot captured");
                self.next_step += 1;
            }
            Err(err) => {
                warn!("Propagation aborted: {}", err);
                self.failed = true;
            }
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.failed {
            0
        } else {
            self.steps - self.next_step
        };
        (0, Some(remaining))
    }
}

/// Materialize `steps` snapshots of `satellites` advanced by `step_s` each.
pub fn build_snapshot_sequence(
    satellites: &[Satellite],
    propagator: &TwoBodyPropagator,
    step_s: f64,
    steps: usize,
) -> Result<Vec<Snapshot>> {
    SnapshotSequence::new(satellites.to_vec(), *propagator, step_s, steps)?.collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OrbitalElementSet, WalkerDelta};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn shell() -> Vec<Satellite> {
        WalkerDelta {
            planes: 4,
            sats_per_plane: 5,
            ..WalkerDelta::default()
        }
        .generate()
        .unwrap()
    }

    #[test]
    fn test_step_count_and_shape() {
        let sats = shell();
        let snaps = build_snapshot_sequence(&sats, &TwoBodyPropagator::earth(), 600.0, 7).unwrap();

        assert_eq!(snaps.len(), 7);
        for (k, snap) in snaps.iter().enumerate() {
            assert_eq!(snap.step, k);
            assert_eq!(snap.len(), sats.len());
            assert_relative_eq!(snap.elapsed_s, (k + 1) as f64 * 600.0);
        }
        assert_eq!(snaps[3].file_name(), "003");
    }

    #[test]
    fn test_first_snapshot_is_one_step_in() {
        let sats = shell();
        let prop = TwoBodyPropagator::earth();
        let snaps = build_snapshot_sequence(&sats, &prop, 600.0, 1).unwrap();

        let expected = prop
            .propagate(&sats[0].elements, 600.0)
            .unwrap()
            .position()
            .unwrap();
        assert_eq!(snaps[0].position(SatelliteId(1)), Some(&expected));
        assert_ne!(
            snaps[0].position(SatelliteId(1)),
            Some(&sats[0].elements.position().unwrap())
        );
    }

    #[test]
    fn test_zero_steps() {
        let snaps = build_snapshot_sequence(&shell(), &TwoBodyPropagator::earth(), 60.0, 0).unwrap();
        assert!(snaps.is_empty());
    }

    #[test]
    fn test_invalid_step_rejected() {
        for dt in [0.0, -5.0, f64::NAN] {
            let err = SnapshotSequence::new(shell(), TwoBodyPropagator::earth(), dt, 3).unwrap_err();
            assert!(matches!(err, OrbitalError::InvalidConfiguration(_)));
        }
    }

    #[test]
    fn test_restart_replays_sequence() {
        let mut seq = SnapshotSequence::new(shell(), TwoBodyPropagator::earth(), 300.0, 4).unwrap();
        let first: Vec<Snapshot> = seq.by_ref().collect::<Result<_>>().unwrap();
        assert!(seq.next().is_none());

        seq.restart();
        let second: Vec<Snapshot> = seq.collect::<Result<_>>().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_snapshots_are_independent_copies() {
        let mut seq = SnapshotSequence::new(shell(), TwoBodyPropagator::earth(), 600.0, 2).unwrap();
        let first = seq.next().unwrap().unwrap();
        let frozen = first.clone();
        let _second = seq.next().unwrap().unwrap();
        assert_eq!(first, frozen);
    }

    #[test]
    fn test_numerical_error_names_satellite_and_step() {
        let mut sats = shell();
        sats[2].elements = OrbitalElementSet {
            semi_major_axis_km: f64::INFINITY,
            ..sats[2].elements
        };

        let mut seq = SnapshotSequence::new(sats, TwoBodyPropagator::earth(), 60.0, 5).unwrap();
        match seq.next() {
            Some(Err(OrbitalError::NumericalDomain { satellite, step, .. })) => {
                assert_eq!(satellite, SatelliteId(3));
                assert_eq!(step, 0);
            }
            other => panic!("expected numerical domain error, got {:?}", other),
        }
        assert!(seq.next().is_none());
    }

    #[test]
    fn test_failed_step_leaves_state_untouched() {
        let mut sats = WalkerDelta {
            planes: 1,
            sats_per_plane: 3,
            ..WalkerDelta::default()
        }
        .generate()
        .unwrap();
        sats[1].elements.semi_major_axis_km = f64::INFINITY;

        let mut seq = SnapshotSequence::new(sats, TwoBodyPropagator::earth(), 600.0, 2).unwrap();
        let before = seq.state().to_vec();
        assert!(matches!(
            seq.next(),
            Some(Err(OrbitalError::NumericalDomain { satellite: SatelliteId(2), step: 0, .. }))
        ));
        assert_eq!(seq.state(), before.as_slice());
    }

    #[test]
    fn test_state_tracks_last_snapshot() {
        let mut seq = SnapshotSequence::new(shell(), TwoBodyPropagator::earth(), 600.0, 3).unwrap();
        let snap = seq.next().unwrap().unwrap();
        for sat in seq.state() {
            assert_eq!(snap.position(sat.id), Some(&sat.elements.position().unwrap()));
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        // The last snapshot equals k sequential single-step propagations
        #[test]
        fn fuzz_last_snapshot_matches_sequential_steps(k in 1usize..20, dt in 1.0f64..3600.0) {
            let sats = shell();
            let prop = TwoBodyPropagator::earth();
            let snaps = build_snapshot_sequence(&sats, &prop, dt, k).unwrap();
            prop_assert_eq!(snaps.len(), k);

            let last = &snaps[k - 1];
            for sat in &sats {
                let mut elements = sat.elements;
                for _ in 0..k {
                    elements = prop.propagate(&elements, dt).unwrap();
                }
                let expected = elements.position().unwrap();
                prop_assert_eq!(last.position(sat.id), Some(&expected));
            }
        }
    }
}
