//! Classical orbital elements and the perifocal-to-inertial projection

use crate::{OrbitalError, Result};
use nalgebra::{Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// One satellite's orbit at an instant.
///
/// For the circular shells generated here `eccentricity` and
/// `arg_perigee_rad` are zero; both are kept so the propagator handles the
/// general elliptic case.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElementSet {
    pub semi_major_axis_km: f64,
    pub eccentricity: f64,
    pub inclination_rad: f64,
    pub raan_rad: f64,
    pub arg_perigee_rad: f64,
    /// The only element that advances under propagation
    pub true_anomaly_rad: f64,
}

/// Inertial-frame position in kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SatellitePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl SatellitePosition {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn norm_km(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vector3<f64>> for SatellitePosition {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl OrbitalElementSet {
    pub fn circular(
        semi_major_axis_km: f64,
        inclination_rad: f64,
        raan_rad: f64,
        true_anomaly_rad: f64,
    ) -> Self {
        Self {
            semi_major_axis_km,
            eccentricity: 0.0,
            inclination_rad,
            raan_rad,
            arg_perigee_rad: 0.0,
            true_anomaly_rad,
        }
    }

    /// Check the structural invariants: positive finite semi-major axis,
    /// bound orbit, finite angles.
    pub fn validate(&self) -> Result<()> {
        if !(self.semi_major_axis_km.is_finite() && self.semi_major_axis_km > 0.0) {
            return Err(OrbitalError::InvalidConfiguration(format!(
                "semi-major axis must be positive, got {}",
                self.semi_major_axis_km
            )));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(OrbitalError::InvalidConfiguration(format!(
                "eccentricity must be in [0, 1), got {}",
                self.eccentricity
            )));
        }
        let angles = [
            self.inclination_rad,
            self.raan_rad,
            self.arg_perigee_rad,
            self.true_anomaly_rad,
        ];
        if angles.iter().any(|a| !a.is_finite()) {
            return Err(OrbitalError::NonFinite(format!(
                "non-finite angle in {:?}",
                angles
            )));
        }
        Ok(())
    }

    pub fn is_circular(&self) -> bool {
        self.eccentricity == 0.0
    }

    /// p = a(1 - e²)
    pub fn semi_latus_rectum_km(&self) -> f64 {
        self.semi_major_axis_km * (1.0 - self.eccentricity * self.eccentricity)
    }

    /// Orbital radius at the current true anomaly.
    pub fn radius_km(&self) -> Result<f64> {
        let denom = 1.0 + self.eccentricity * self.true_anomaly_rad.cos();
        let r = self.semi_latus_rectum_km() / denom;
        if !r.is_finite() || r <= 0.0 {
            return Err(OrbitalError::NonFinite(format!(
                "radius {r} km at true anomaly {} rad",
                self.true_anomaly_rad
            )));
        }
        Ok(r)
    }

    /// Rotation from the perifocal frame into the inertial frame:
    /// R3(Ω) · R1(i) · R3(ω).
    ///
    /// Built from axis-angle rotations, so there is no division and polar
    /// inclinations need no special case.
    pub fn perifocal_to_inertial(&self) -> Rotation3<f64> {
        Rotation3::from_axis_angle(&Vector3::z_axis(), self.raan_rad)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.inclination_rad)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.arg_perigee_rad)
    }

    /// Cartesian position in the inertial frame.
    pub fn position(&self) -> Result<SatellitePosition> {
        let r = self.radius_km()?;
        let nu = self.true_anomaly_rad;
        let perifocal = Vector3::new(r * nu.cos(), r * nu.sin(), 0.0);
        let inertial = self.perifocal_to_inertial() * perifocal;

        let position = SatellitePosition::from(inertial);
        if !position.is_finite() {
            return Err(OrbitalError::NonFinite(format!(
                "position {:?} from elements {:?}",
                position, self
            )));
        }
        Ok(position)
    }
}
