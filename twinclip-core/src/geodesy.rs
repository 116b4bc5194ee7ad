//! 椭球体、大地坐标与局部东-北-天（ENU）切平面之间的换算。
//!
//! 所有平面几何（面积、裁剪平面、盒体足迹）都先投影到以某个拾取点为原点的 ENU
//! 坐标系中计算，再旋转回地心坐标系。

use glam::{DMat3, DVec3};
use serde::{Deserialize, Serialize};

use crate::geometry::{Point3, Vector3};

pub const WGS84_SEMI_MAJOR_AXIS: f64 = 6_378_137.0;
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

const MAX_LATITUDE_ITERATIONS: usize = 16;
const LATITUDE_TOLERANCE: f64 = 1e-14;

/// 旋转椭球参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    pub semi_major_axis: f64,
    pub flattening: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid {
        semi_major_axis: WGS84_SEMI_MAJOR_AXIS,
        flattening: WGS84_FLATTENING,
    };

    #[inline]
    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.flattening)
    }

    #[inline]
    pub fn eccentricity_squared(&self) -> f64 {
        self.flattening * (2.0 - self.flattening)
    }

    /// 卯酉圈曲率半径。
    #[inline]
    fn prime_vertical_radius(&self, sin_lat: f64) -> f64 {
        self.semi_major_axis / (1.0 - self.eccentricity_squared() * sin_lat * sin_lat).sqrt()
    }

    pub fn cartographic_to_cartesian(&self, position: Cartographic) -> Point3 {
        let (sin_lat, cos_lat) = position.latitude.sin_cos();
        let (sin_lon, cos_lon) = position.longitude.sin_cos();
        let n = self.prime_vertical_radius(sin_lat);
        let h = position.height;
        Point3::new(
            (n + h) * cos_lat * cos_lon,
            (n + h) * cos_lat * sin_lon,
            (n * (1.0 - self.eccentricity_squared()) + h) * sin_lat,
        )
    }

    /// 迭代求解大地纬度。极轴上的点直接返回 ±90°。
    pub fn cartesian_to_cartographic(&self, point: Point3) -> Cartographic {
        let v = point.as_vec3();
        let e2 = self.eccentricity_squared();
        let p = v.x.hypot(v.y);
        let longitude = v.y.atan2(v.x);

        if p < 1e-9 {
            let latitude = std::f64::consts::FRAC_PI_2.copysign(v.z);
            return Cartographic::new(longitude, latitude, v.z.abs() - self.semi_minor_axis());
        }

        let mut latitude = v.z.atan2(p * (1.0 - e2));
        for _ in 0..MAX_LATITUDE_ITERATIONS {
            let n = self.prime_vertical_radius(latitude.sin());
            let height = p / latitude.cos() - n;
            let next = v.z.atan2(p * (1.0 - e2 * n / (n + height)));
            let delta = (next - latitude).abs();
            latitude = next;
            if delta < LATITUDE_TOLERANCE {
                break;
            }
        }
        let n = self.prime_vertical_radius(latitude.sin());
        let height = p / latitude.cos() - n;
        Cartographic::new(longitude, latitude, height)
    }

    /// 大地法向（天向）单位向量。
    pub fn geodetic_surface_normal(&self, position: Cartographic) -> Vector3 {
        let (sin_lat, cos_lat) = position.latitude.sin_cos();
        let (sin_lon, cos_lon) = position.longitude.sin_cos();
        Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::WGS84
    }
}

/// 大地坐标：经纬度为弧度，高度为米。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cartographic {
    pub longitude: f64,
    pub latitude: f64,
    pub height: f64,
}

impl Cartographic {
    #[inline]
    pub fn new(longitude: f64, latitude: f64, height: f64) -> Self {
        Self {
            longitude,
            latitude,
            height,
        }
    }

    #[inline]
    pub fn from_degrees(longitude: f64, latitude: f64, height: f64) -> Self {
        Self::new(longitude.to_radians(), latitude.to_radians(), height)
    }

    #[inline]
    pub fn to_cartesian(self) -> Point3 {
        Ellipsoid::WGS84.cartographic_to_cartesian(self)
    }

    #[inline]
    pub fn from_cartesian(point: Point3) -> Self {
        Ellipsoid::WGS84.cartesian_to_cartographic(point)
    }
}

/// 局部东-北-天正交坐标系。`rotation` 的三列依次为东、北、天单位向量。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuFrame {
    origin: Point3,
    rotation: DMat3,
}

impl EnuFrame {
    /// 以 WGS84 椭球在 `origin` 处建立 ENU 坐标系。
    ///
    /// 原点恰好位于极点时东向退化，调用方只会传入拾取得到的地表点，不做额外处理。
    pub fn at(origin: Point3) -> Self {
        Self::with_ellipsoid(origin, &Ellipsoid::WGS84)
    }

    pub fn with_ellipsoid(origin: Point3, ellipsoid: &Ellipsoid) -> Self {
        let geodetic = ellipsoid.cartesian_to_cartographic(origin);
        let (sin_lat, cos_lat) = geodetic.latitude.sin_cos();
        let (sin_lon, cos_lon) = geodetic.longitude.sin_cos();

        let east = DVec3::new(-sin_lon, cos_lon, 0.0);
        let north = DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat);
        let up = DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat);

        Self {
            origin,
            rotation: DMat3::from_cols(east, north, up),
        }
    }

    #[inline]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    #[inline]
    pub fn rotation(&self) -> DMat3 {
        self.rotation
    }

    #[inline]
    pub fn east(&self) -> Vector3 {
        Vector3(self.rotation.x_axis)
    }

    #[inline]
    pub fn north(&self) -> Vector3 {
        Vector3(self.rotation.y_axis)
    }

    #[inline]
    pub fn up(&self) -> Vector3 {
        Vector3(self.rotation.z_axis)
    }

    /// 全局坐标 → 局部 (东, 北, 天)。
    #[inline]
    pub fn to_local(&self, point: Point3) -> DVec3 {
        self.rotation.transpose() * (point.as_vec3() - self.origin.as_vec3())
    }

    /// 局部 (东, 北, 天) → 全局坐标，与 [`EnuFrame::to_local`] 互逆。
    #[inline]
    pub fn to_global(&self, local: DVec3) -> Point3 {
        Point3(self.origin.as_vec3() + self.rotation * local)
    }

    /// 只旋转不平移，用于把局部法向转换到全局。
    #[inline]
    pub fn direction_to_global(&self, local: DVec3) -> Vector3 {
        Vector3(self.rotation * local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beijing() -> Point3 {
        Cartographic::from_degrees(116.391, 39.907, 45.0).to_cartesian()
    }

    #[test]
    fn cartographic_round_trip() {
        let source = Cartographic::from_degrees(-122.4194, 37.7749, 120.5);
        let back = Cartographic::from_cartesian(source.to_cartesian());
        assert!((back.longitude - source.longitude).abs() < 1e-12);
        assert!((back.latitude - source.latitude).abs() < 1e-12);
        assert!((back.height - source.height).abs() < 1e-6);
    }

    #[test]
    fn equator_prime_meridian_is_on_x_axis() {
        let p = Cartographic::from_degrees(0.0, 0.0, 0.0).to_cartesian();
        assert!((p.x() - WGS84_SEMI_MAJOR_AXIS).abs() < 1e-6);
        assert!(p.y().abs() < 1e-6);
        assert!(p.z().abs() < 1e-6);
    }

    #[test]
    fn enu_axes_are_orthonormal_and_up_matches_normal() {
        let origin = beijing();
        let frame = EnuFrame::at(origin);
        let (e, n, u) = (frame.east(), frame.north(), frame.up());
        assert!((e.length() - 1.0).abs() < 1e-12);
        assert!((n.length() - 1.0).abs() < 1e-12);
        assert!((u.length() - 1.0).abs() < 1e-12);
        assert!(e.dot(n).abs() < 1e-12);
        assert!(e.dot(u).abs() < 1e-12);
        assert!(n.dot(u).abs() < 1e-12);

        let normal = Ellipsoid::WGS84.geodetic_surface_normal(Cartographic::from_cartesian(origin));
        assert!((normal.dot(u) - 1.0).abs() < 1e-12);
        // 北向在北半球应有正的 z 分量
        assert!(n.z() > 0.0);
    }

    #[test]
    fn origin_maps_to_local_zero() {
        let origin = beijing();
        let frame = EnuFrame::at(origin);
        let local = frame.to_local(origin);
        assert!(local.length() < 1e-9);
    }

    #[test]
    fn local_global_round_trip() {
        let origin = beijing();
        let frame = EnuFrame::at(origin);
        let q = Point3::new(origin.x() + 1234.5, origin.y() - 987.25, origin.z() + 42.0);
        let back = frame.to_global(frame.to_local(q));
        assert!(back.approx_eq(q, 1e-6));

        let back_origin = frame.to_global(frame.to_local(origin));
        assert!(back_origin.approx_eq(origin, 1e-6));

        let local = DVec3::new(10.0, -3.0, 7.5);
        let round = frame.to_local(frame.to_global(local));
        assert!((round - local).length() < 1e-6);
    }

    #[test]
    fn east_offset_moves_along_longitude() {
        let origin = beijing();
        let frame = EnuFrame::at(origin);
        let east = Cartographic::from_cartesian(frame.to_global(DVec3::new(100.0, 0.0, 0.0)));
        let base = Cartographic::from_cartesian(origin);
        assert!(east.longitude > base.longitude);
        assert!((east.latitude - base.latitude).abs() < 1e-6);
    }
}
