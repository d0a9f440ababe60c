//! Unperturbed two-body propagation
//!
//! Only the anomaly advances; RAAN, inclination and semi-major axis are left
//! untouched (no J2 or drag). Circular orbits take the direct path
//! ν' = ν + n·Δt. Elliptic orbits go through the mean anomaly and a
//! Newton-Raphson Kepler solve.

use crate::{normalize_angle, CentralBody, OrbitalElementSet, OrbitalError, Result};
use std::f64::consts::{PI, TAU};

const KEPLER_TOLERANCE: f64 = 1e-12;
const KEPLER_MAX_ITERATIONS: usize = 50;

/// Mean motion n = sqrt(μ / a³) in rad/s.
pub fn mean_motion(semi_major_axis_km: f64, mu_km3_s2: f64) -> f64 {
    (mu_km3_s2 / semi_major_axis_km.powi(3)).sqrt()
}

/// Orbital period T = 2π / n in seconds.
pub fn orbital_period_s(semi_major_axis_km: f64, mu_km3_s2: f64) -> f64 {
    TAU / mean_motion(semi_major_axis_km, mu_km3_s2)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBodyPropagator {
    mu_km3_s2: f64,
}

impl TwoBodyPropagator {
    pub fn new(mu_km3_s2: f64) -> Self {
        Self { mu_km3_s2 }
    }

    pub fn earth() -> Self {
        Self::new(CentralBody::EARTH.mu_km3_s2)
    }

    pub fn for_body(body: &CentralBody) -> Self {
        Self::new(body.mu_km3_s2)
    }

    pub fn mu(&self) -> f64 {
        self.mu_km3_s2
    }

    pub fn period_s(&self, elements: &OrbitalElementSet) -> f64 {
        orbital_period_s(elements.semi_major_axis_km, self.mu_km3_s2)
    }

    /// Return the elements after `dt_s` seconds of two-body motion.
    pub fn propagate(&self, elements: &OrbitalElementSet, dt_s: f64) -> Result<OrbitalElementSet> {
        let mut next = *elements;
        self.advance(&mut next, dt_s)?;
        Ok(next)
    }

    /// Advance the anomaly of `elements` in place.
    ///
    /// On error `elements` is left unchanged.
    pub fn advance(&self, elements: &mut OrbitalElementSet, dt_s: f64) -> Result<()> {
        if !dt_s.is_finite() {
            return Err(OrbitalError::NonFinite(format!("time delta {dt_s} s")));
        }
        elements.validate()?;

        let n = mean_motion(elements.semi_major_axis_km, self.mu_km3_s2);
        if !n.is_finite() {
            return Err(OrbitalError::NonFinite(format!(
                "mean motion {n} rad/s for a = {} km",
                elements.semi_major_axis_km
            )));
        }

        let nu = if elements.is_circular() {
            normalize_angle(elements.true_anomaly_rad + n * dt_s)
        } else {
            let e = elements.eccentricity;
            let m0 = true_to_mean_anomaly(elements.true_anomaly_rad, e);
            let m = normalize_angle(m0 + n * dt_s);
            let ea = solve_kepler(m, e)?;
            normalize_angle(eccentric_to_true_anomaly(ea, e))
        };

        let candidate = OrbitalElementSet {
            true_anomaly_rad: nu,
            ..*elements
        };
        candidate.radius_km()?;

        *elements = candidate;
        Ok(())
    }
}

impl Default for TwoBodyPropagator {
    fn default() -> Self {
        Self::earth()
    }
}

fn true_to_mean_anomaly(nu: f64, e: f64) -> f64 {
    let ea = 2.0 * ((1.0 - e).sqrt() * (nu / 2.0).sin()).atan2((1.0 + e).sqrt() * (nu / 2.0).cos());
    ea - e * ea.sin()
}

fn eccentric_to_true_anomaly(ea: f64, e: f64) -> f64 {
    2.0 * ((1.0 + e).sqrt() * (ea / 2.0).sin()).atan2((1.0 - e).sqrt() * (ea / 2.0).cos())
}

/// Solve M = E - e·sin(E) for the eccentric anomaly.
pub fn solve_kepler(mean_anomaly: f64, e: f64) -> Result<f64> {
    let mut ea = if e < 0.8 { mean_anomaly } else { PI };

    for _ in 0..KEPLER_MAX_ITERATIONS {
        let f = ea - e * ea.sin() - mean_anomaly;
        let fp = 1.0 - e * ea.cos();
        let delta = f / fp;
        ea -= delta;
        if !ea.is_finite() {
            break;
        }
        if delta.abs() < KEPLER_TOLERANCE {
            return Ok(ea);
        }
    }

    Err(OrbitalError::NonFinite(format!(
        "Kepler solve did not converge for M = {mean_anomaly}, e = {e}"
    )))
}
