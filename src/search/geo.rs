//! Geodesic distance on the WGS-84 ellipsoid

use crate::places::Coordinates;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const WGS84_B: f64 = WGS84_A * (1.0 - WGS84_F);
const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;
const METERS_PER_MILE: f64 = 1_609.344;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;

/// Distance between two points in statute miles
pub fn distance_miles(a: Coordinates, b: Coordinates) -> f64 {
    distance_meters(a, b) / METERS_PER_MILE
}

pub fn distance_meters(a: Coordinates, b: Coordinates) -> f64 {
    vincenty_meters(a, b).unwrap_or_else(|| haversine_meters(a, b))
}

/// Vincenty's inverse formula; `None` when it fails to converge (near-antipodal points)
fn vincenty_meters(a: Coordinates, b: Coordinates) -> Option<f64> {
    if a == b {
        return Some(0.0);
    }

    let l = (b.lng - a.lng).to_radians();
    let u1 = ((1.0 - WGS84_F) * a.lat.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * b.lat.to_radians().tan()).atan();
    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    for _ in 0..MAX_ITERATIONS {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();
        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            return Some(0.0);
        }
        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);
        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
        // Both points on the equator
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };
        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));

        let previous = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - previous).abs() < CONVERGENCE {
            let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - WGS84_B * WGS84_B) / (WGS84_B * WGS84_B);
            let big_a = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
            let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
            let delta_sigma = big_b
                * sin_sigma
                * (cos_2sigma_m
                    + big_b / 4.0
                        * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                            - big_b / 6.0
                                * cos_2sigma_m
                                * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                                * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));
            return Some(WGS84_B * big_a * (sigma - delta_sigma));
        }
    }

    None
}

fn haversine_meters(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * MEAN_EARTH_RADIUS_M * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let p = Coordinates::new(27.7172, 85.3240);
        assert_eq!(distance_miles(p, p), 0.0);
    }

    #[test]
    fn matches_known_geodesic() {
        // Kathmandu to Pokhara
        let kathmandu = Coordinates::new(27.7172, 85.3240);
        let pokhara = Coordinates::new(28.2096, 83.9856);
        let miles = distance_miles(kathmandu, pokhara);
        assert!((miles - 88.58).abs() < 0.05, "got {}", miles);
    }

    #[test]
    fn one_degree_of_latitude_at_equator() {
        let meters = distance_meters(Coordinates::new(0.0, 0.0), Coordinates::new(1.0, 0.0));
        assert!((meters - 110_574.4).abs() < 1.0, "got {}", meters);
    }

    #[test]
    fn antipodal_points_fall_back_to_haversine() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(0.5, 179.7);
        assert!(vincenty_meters(a, b).is_none());
        let miles = distance_miles(a, b);
        assert!((miles - 12_396.5).abs() < 1.0, "got {}", miles);
    }
}
