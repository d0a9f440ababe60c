//! Walker Delta constellation generation
//!
//! Walker notation i:T/P/F. Planes are evenly spread over 360° of RAAN and
//! each plane's satellites are shifted along-track by F·(360°/S)/P relative
//! to the previous plane, where S is satellites per plane.

use crate::{normalize_angle, CentralBody, OrbitalElementSet, OrbitalError, Result, SatelliteId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Constellation shell parameters.
///
/// Angles are degrees here and nowhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkerDelta {
    pub planes: u32,
    pub sats_per_plane: u32,
    pub altitude_km: f64,
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub phasing: u32,
    pub body: CentralBody,
}

impl Default for WalkerDelta {
    fn default() -> Self {
        WalkerDelta {
            planes: 72,
            sats_per_plane: 21,
            altitude_km: 550.0,
            inclination_deg: 53.0,
            eccentricity: 0.0,
            arg_perigee_deg: 0.0,
            phasing: 1,
            body: CentralBody::EARTH,
        }
    }
}

/// A generated satellite: identity plus its evolving elements.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    pub id: SatelliteId,
    /// 0-based plane index
    pub plane: u32,
    /// 0-based slot within the plane
    pub slot: u32,
    pub elements: OrbitalElementSet,
}

impl WalkerDelta {
    pub fn total_satellites(&self) -> u32 {
        self.planes.saturating_mul(self.sats_per_plane)
    }

    pub fn semi_major_axis_km(&self) -> f64 {
        self.body.radius_km + self.altitude_km
    }

    pub fn plane_spacing_deg(&self) -> f64 {
        360.0 / self.planes as f64
    }

    pub fn in_plane_spacing_deg(&self) -> f64 {
        360.0 / self.sats_per_plane as f64
    }

    /// Id of `slot` in `plane`, both 0-based.
    pub fn satellite_id(&self, plane: u32, slot: u32) -> SatelliteId {
        SatelliteId(plane * self.sats_per_plane + slot + 1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.planes == 0 {
            return Err(invalid("plane count must be positive"));
        }
        if self.sats_per_plane == 0 {
            return Err(invalid("satellites per plane must be positive"));
        }
        if self.planes.checked_mul(self.sats_per_plane).is_none() {
            return Err(invalid("constellation size overflows the id space"));
        }
        if !(self.altitude_km.is_finite() && self.altitude_km >= 0.0) {
            return Err(invalid(format!(
                "altitude must be non-negative, got {} km",
                self.altitude_km
            )));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(invalid(format!(
                "inclination must be within [0, 180] degrees, got {}",
                self.inclination_deg
            )));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(invalid(format!(
                "eccentricity must be within [0, 1), got {}",
                self.eccentricity
            )));
        }
        if !self.arg_perigee_deg.is_finite() {
            return Err(invalid("argument of perigee must be finite"));
        }
        if !(self.body.radius_km.is_finite() && self.body.radius_km > 0.0) {
            return Err(invalid("central body radius must be positive"));
        }
        if !(self.body.mu_km3_s2.is_finite() && self.body.mu_km3_s2 > 0.0) {
            return Err(invalid("gravitational parameter must be positive"));
        }
        Ok(())
    }

    /// Build every satellite, plane-major, ids `1..=planes*sats_per_plane`.
    pub fn generate(&self) -> Result<Vec<Satellite>> {
        self.validate()?;

        let a = self.semi_major_axis_km();
        let inclination = self.inclination_deg.to_radians();
        let arg_perigee = normalize_angle(self.arg_perigee_deg.to_radians());
        let raan_spacing = self.plane_spacing_deg().to_radians();
        let ta_spacing = self.in_plane_spacing_deg().to_radians();
        let phase_step = self.phasing as f64 * ta_spacing / self.planes as f64;

        let mut satellites = Vec::with_capacity(self.total_satellites() as usize);
        for p in 0..self.planes {
            let raan = normalize_angle(p as f64 * raan_spacing);

            for s in 0..self.sats_per_plane {
                let true_anomaly = normalize_angle(s as f64 * ta_spacing + p as f64 * phase_step);

                satellites.push(Satellite {
                    id: self.satellite_id(p, s),
                    plane: p,
                    slot: s,
                    elements: OrbitalElementSet {
                        semi_major_axis_km: a,
                        eccentricity: self.eccentricity,
                        inclination_rad: inclination,
                        raan_rad: raan,
                        arg_perigee_rad: arg_perigee,
                        true_anomaly_rad: true_anomaly,
                    },
                });
            }
        }

        debug!(
            planes = self.planes,
            sats_per_plane = self.sats_per_plane,
            "Generated {} satellites at a = {:.3} km",
            satellites.len(),
            a
        );

        Ok(satellites)
    }
}

/// Generate the constellation described by `config`.
pub fn generate_constellation(config: &WalkerDelta) -> Result<Vec<Satellite>> {
    config.generate()
}

fn invalid(msg: impl Into<String>) -> OrbitalError {
    OrbitalError::InvalidConfiguration(msg.into())
}
