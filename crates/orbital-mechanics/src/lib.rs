//! Orbital Mechanics Library
//!
//! Walker Delta constellation generation, two-body circular-orbit propagation
//! and time-stepped position snapshots for large LEO shells (72 planes x 21
//! satellites at 550 km by default).
//!
//! All angles inside the engine are radians, lengths kilometres and times
//! seconds. Degrees only appear on [`walker::WalkerDelta`], the configuration
//! boundary, and are converted once during generation.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod elements;
pub mod propagation;
pub mod snapshot;
pub mod walker;

pub use elements::{OrbitalElementSet, SatellitePosition};
pub use propagation::TwoBodyPropagator;
pub use snapshot::{build_snapshot_sequence, Snapshot, SnapshotSequence};
pub use walker::{generate_constellation, Satellite, WalkerDelta};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitalError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Non-finite orbital state: {0}")]
    NonFinite(String),
    #[error("Numerical domain error for satellite {satellite} at step {step}: {detail}")]
    NumericalDomain {
        satellite: SatelliteId,
        step: usize,
        detail: String,
    },
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// 1-based satellite id, assigned plane-major over the generation loop.
///
/// This is the join key between snapshot files and cluster logs.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SatelliteId(pub u32);

impl SatelliteId {
    /// Zero-based index into a snapshot's position list.
    pub fn index(self) -> usize {
        (self.0 as usize).saturating_sub(1)
    }
}

impl fmt::Display for SatelliteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Gravitating body the constellation orbits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralBody {
    pub radius_km: f64,
    /// Gravitational parameter in km^3/s^2
    pub mu_km3_s2: f64,
}

impl CentralBody {
    pub const EARTH: CentralBody = CentralBody {
        radius_km: 6378.137,
        mu_km3_s2: 398600.4418,
    };
}

impl Default for CentralBody {
    fn default() -> Self {
        Self::EARTH
    }
}

/// Wrap an angle into [0, 2π).
pub fn normalize_angle(rad: f64) -> f64 {
    let wrapped = rad.rem_euclid(std::f64::consts::TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= std::f64::consts::TAU {
        0.0
    } else {
        wrapped
    }
}

pub mod transforms {
    use super::*;

    const EARTH_RADIUS_KM: f64 = CentralBody::EARTH.radius_km;

    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub struct GeodeticPosition {
        pub latitude: f64,
        pub longitude: f64,
        pub altitude_km: f64,
    }

    /// Normalized flat-map coordinates, both axes in [0, 1].
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
    pub struct MapPoint {
        pub x: f64,
        pub y: f64,
    }

    /// Spherical-Earth geodetic position (degrees) of an inertial position.
    ///
    /// Earth rotation is ignored; longitude is measured in the inertial frame.
    pub fn eci_to_geodetic(position: &SatellitePosition) -> Result<GeodeticPosition> {
        let SatellitePosition { x, y, z } = *position;
        let radius = position.norm_km();
        if !radius.is_finite() || radius == 0.0 {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "position ({x}, {y}, {z}) has no direction"
            )));
        }

        let r = (x * x + y * y).sqrt();
        let longitude = y.atan2(x).to_degrees();
        let latitude = z.atan2(r).to_degrees();
        let altitude_km = radius - EARTH_RADIUS_KM;

        Ok(GeodeticPosition {
            latitude,
            longitude,
            altitude_km,
        })
    }

    /// Equirectangular projection onto the unit square.
    pub fn equirectangular(position: &SatellitePosition) -> Result<MapPoint> {
        let geo = eci_to_geodetic(position)?;
        let lon = geo.longitude.to_radians();
        let lat = geo.latitude.to_radians();

        Ok(MapPoint {
            x: (lon + std::f64::consts::PI) / std::f64::consts::TAU,
            y: (lat + std::f64::consts::FRAC_PI_2) / std::f64::consts::PI,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::transforms::*;
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(0.0), 0.0);
        assert!((normalize_angle(TAU + 1.0) - 1.0).abs() < 1e-12);
        assert!((normalize_angle(-1.0) - (TAU - 1.0)).abs() < 1e-12);
        assert!(normalize_angle(-1e-300) < TAU);
    }

    #[test]
    fn test_satellite_id_index() {
        assert_eq!(SatelliteId(1).index(), 0);
        assert_eq!(SatelliteId(42).index(), 41);
        assert_eq!(SatelliteId(7).to_string(), "7");
    }

    #[test]
    fn test_geodetic_equator() {
        let pos = SatellitePosition::new(6928.137, 0.0, 0.0);
        let geo = eci_to_geodetic(&pos).unwrap();
        assert!(geo.latitude.abs() < 1e-9);
        assert!(geo.longitude.abs() < 1e-9);
        assert!((geo.altitude_km - 550.0).abs() < 1e-6);
    }

    #[test]
    fn test_geodetic_rejects_origin() {
        let pos = SatellitePosition::new(0.0, 0.0, 0.0);
        assert!(matches!(
            eci_to_geodetic(&pos),
            Err(OrbitalError::InvalidCoordinates(_))
        ));
    }

    #[test]
    fn test_equirectangular_corners() {
        // Prime meridian on the equator lands in the middle of the map
        let center = equirectangular(&SatellitePosition::new(7000.0, 0.0, 0.0)).unwrap();
        assert!((center.x - 0.5).abs() < 1e-12);
        assert!((center.y - 0.5).abs() < 1e-12);

        // North pole
        let pole = equirectangular(&SatellitePosition::new(0.0, 0.0, 7000.0)).unwrap();
        assert!((pole.y - 1.0).abs() < 1e-12);
    }
}
