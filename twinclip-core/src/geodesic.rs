//! 椭球面测地线距离（Vincenty 反解）。

use crate::geodesy::{Cartographic, Ellipsoid};
use crate::geometry::Point3;

const MAX_ITERATIONS: usize = 200;
const CONVERGENCE: f64 = 1e-12;
/// 近对跖点不收敛时使用的平均地球半径（IUGG）。
const MEAN_EARTH_RADIUS: f64 = 6_371_008.8;

/// 在指定椭球上求两点地表测地线距离，高度被忽略。
#[derive(Debug, Clone, Copy, Default)]
pub struct GeodesicSolver {
    ellipsoid: Ellipsoid,
}

impl GeodesicSolver {
    pub fn new(ellipsoid: Ellipsoid) -> Self {
        Self { ellipsoid }
    }

    #[inline]
    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    pub fn distance(&self, a: Point3, b: Point3) -> f64 {
        let from = self.ellipsoid.cartesian_to_cartographic(a);
        let to = self.ellipsoid.cartesian_to_cartographic(b);
        self.inverse(from, to)
            .unwrap_or_else(|| great_circle_distance(from, to, MEAN_EARTH_RADIUS))
    }

    /// Vincenty 反解。迭代不收敛（近对跖点）时返回 `None`。
    pub fn inverse(&self, from: Cartographic, to: Cartographic) -> Option<f64> {
        let a = self.ellipsoid.semi_major_axis;
        let f = self.ellipsoid.flattening;
        let b = self.ellipsoid.semi_minor_axis();

        let l = to.longitude - from.longitude;
        let u1 = ((1.0 - f) * from.latitude.tan()).atan();
        let u2 = ((1.0 - f) * to.latitude.tan()).atan();
        let (sin_u1, cos_u1) = u1.sin_cos();
        let (sin_u2, cos_u2) = u2.sin_cos();

        let mut lambda = l;
        let mut converged = false;
        let mut sin_sigma = 0.0;
        let mut cos_sigma = 0.0;
        let mut sigma = 0.0;
        let mut cos_sq_alpha = 0.0;
        let mut cos_2sigma_m = 0.0;

        for _ in 0..MAX_ITERATIONS {
            let (sin_lambda, cos_lambda) = lambda.sin_cos();
            let t1 = cos_u2 * sin_lambda;
            let t2 = cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda;
            sin_sigma = (t1 * t1 + t2 * t2).sqrt();
            if sin_sigma == 0.0 {
                return Some(0.0);
            }
            cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
            sigma = sin_sigma.atan2(cos_sigma);
            let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
            cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;
            // 赤道线上 cos²α = 0
            cos_2sigma_m = if cos_sq_alpha != 0.0 {
                cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
            } else {
                0.0
            };
            let c = f / 16.0 * cos_sq_alpha * (4.0 + f * (4.0 - 3.0 * cos_sq_alpha));
            let previous = lambda;
            lambda = l
                + (1.0 - c)
                    * f
                    * sin_alpha
                    * (sigma
                        + c * sin_sigma
                            * (cos_2sigma_m
                                + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));
            if (lambda - previous).abs() < CONVERGENCE {
                converged = true;
                break;
            }
        }

        if !converged {
            return None;
        }

        let u_sq = cos_sq_alpha * (a * a - b * b) / (b * b);
        let big_a =
            1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
        let big_b = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));
        let cos_2sigma_m_sq = cos_2sigma_m * cos_2sigma_m;
        let delta_sigma = big_b
            * sin_sigma
            * (cos_2sigma_m
                + big_b / 4.0
                    * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m_sq)
                        - big_b / 6.0
                            * cos_2sigma_m
                            * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                            * (-3.0 + 4.0 * cos_2sigma_m_sq)));

        Some(b * big_a * (sigma - delta_sigma))
    }
}

/// 球面大圆距离（haversine）。
pub fn great_circle_distance(from: Cartographic, to: Cartographic, radius: f64) -> f64 {
    let d_lat = to.latitude - from.latitude;
    let d_lon = to.longitude - from.longitude;
    let h = (d_lat / 2.0).sin().powi(2)
        + from.latitude.cos() * to.latitude.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * radius * h.sqrt().min(1.0).asin()
}

/// WGS84 上两点的测地线距离（米）。
pub fn geodesic_distance(a: Point3, b: Point3) -> f64 {
    GeodesicSolver::default().distance(a, b)
}
