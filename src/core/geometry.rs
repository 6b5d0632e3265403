//! Inter-station geometry on the WGS84 ellipsoid.
//!
//! Distances and azimuths use Vincenty's inverse formula. For nearly
//! antipodal pairs where the iteration does not converge the result falls
//! back to great-circle (spherical) values.
//!
//! Coincident stations resolve to `distance_km = 0` with both azimuths set
//! to `0.0`.

use serde::{Deserialize, Serialize};

/// WGS84 semi-major axis (m)
const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257_223_563;
/// Mean Earth radius for the spherical fallback (km)
const EARTH_RADIUS_KM: f64 = 6371.0088;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Distance and bearings between two stations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairGeometry {
    pub distance_km: f64,
    /// Bearing from the first point to the second, [0, 360)
    pub forward_azimuth: f64,
    /// Bearing from the second point back to the first, [0, 360)
    pub back_azimuth: f64,
}

/// Normalize an angle to the range [0, 360)
pub fn normalize_azimuth(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Resolve distance, forward azimuth and back azimuth between two points
/// given in decimal degrees.
pub fn resolve(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> PairGeometry {
    match vincenty_inverse(lat_a, lon_a, lat_b, lon_b) {
        Some(geometry) => geometry,
        None => {
            log::warn!(
                "Vincenty inverse did not converge for ({}, {}) -> ({}, {}); using spherical geometry",
                lat_a, lon_a, lat_b, lon_b
            );
            spherical(lat_a, lon_a, lat_b, lon_b)
        }
    }
}

fn vincenty_inverse(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> Option<PairGeometry> {
    let b_axis = (1.0 - WGS84_F) * WGS84_A;

    // Longitude difference wrapped to [-180, 180)
    let l = ((lon_b - lon_a + 540.0).rem_euclid(360.0) - 180.0).to_radians();
    let u1 = ((1.0 - WGS84_F) * lat_a.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * lat_b.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();

        if sin_sigma == 0.0 {
            return Some(PairGeometry {
                distance_km: 0.0,
                forward_azimuth: 0.0,
                back_azimuth: 0.0,
            });
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Equatorial line: cos_sq_alpha = 0
        let cos_2sigma_m = if cos_sq_alpha != 0.0 {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        } else {
            0.0
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))));

        if !lambda.is_finite() || lambda.abs() > std::f64::consts::PI {
            return None;
        }

        if (lambda - previous).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A.powi(2) - b_axis.powi(2)) / b_axis.powi(2);
            let a_coef =
                1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let b_coef = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = b_coef
                * sin_sigma
                * (cos_2sigma_m
                    + b_coef / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m.powi(2))
                            - b_coef / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma.powi(2))
                                * (-3.0 + 4.0 * cos_2sigma_m.powi(2))));
            let distance_m = b_axis * a_coef * (sigma - delta_sigma);
            if !distance_m.is_finite() {
                return None;
            }

            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let alpha1 = (cos_u2 * sin_lambda).atan2(cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda);
            // Azimuth of the geodesic at B, pointing away from A
            let alpha2 = (cos_u1 * sin_lambda).atan2(-sin_u1 * cos_u2 + cos_u1 * sin_u2 * cos_lambda);

            return Some(PairGeometry {
                distance_km: distance_m / 1000.0,
                forward_azimuth: normalize_azimuth(alpha1.to_degrees()),
                back_azimuth: normalize_azimuth(alpha2.to_degrees() + 180.0),
            });
        }
    }

    None
}

fn spherical(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> PairGeometry {
    let phi_a = lat_a.to_radians();
    let phi_b = lat_b.to_radians();
    let dphi = (lat_b - lat_a).to_radians();
    let dlon = (lon_b - lon_a).to_radians();

    let h = (dphi / 2.0).sin().powi(2) + phi_a.cos() * phi_b.cos() * (dlon / 2.0).sin().powi(2);
    let distance_km = 2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt());

    PairGeometry {
        distance_km,
        forward_azimuth: initial_bearing(phi_a, phi_b, dlon),
        back_azimuth: initial_bearing(phi_b, phi_a, -dlon),
    }
}

fn initial_bearing(phi_from: f64, phi_to: f64, dlon: f64) -> f64 {
    let x = dlon.sin() * phi_to.cos();
    let y = phi_from.cos() * phi_to.sin() - phi_from.sin() * phi_to.cos() * dlon.cos();
    normalize_azimuth(x.atan2(y).to_degrees())
}
