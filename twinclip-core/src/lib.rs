pub mod clipping;
pub mod geodesic;
pub mod geodesy;
pub mod polygon;
pub mod volume;

pub mod geometry {
    use std::ops::Neg;

    use glam::DVec3;
    use serde::{Deserialize, Serialize};

    /// 地心地固坐标系（ECEF）下的三维点，单位为米。拾取结果与所有几何输出都以此表示。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn from_vec(vec: DVec3) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point3) -> Vector3 {
            Vector3(other.0 - self.0)
        }

        #[inline]
        pub fn distance(self, other: Point3) -> f64 {
            self.0.distance(other.0)
        }

        /// 两点间欧氏距离不超过 `epsilon` 时视为重合。
        #[inline]
        pub fn approx_eq(self, other: Point3, epsilon: f64) -> bool {
            self.0.distance_squared(other.0) <= epsilon * epsilon
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维向量，用于平面法向与射线方向。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn from_points(start: Point3, end: Point3) -> Self {
            Self(end.0 - start.0)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn length(self) -> f64 {
            self.0.length()
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON || !len.is_finite() {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }

        /// 与点的位置向量做点积，平面方程求值时使用。
        #[inline]
        pub fn dot_point(self, point: Point3) -> f64 {
            self.0.dot(point.0)
        }

        #[inline]
        pub fn cross(self, other: Vector3) -> Vector3 {
            Self(self.0.cross(other.0))
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Vector3 {
            Self(self.0 * factor)
        }
    }

    impl Neg for Vector3 {
        type Output = Vector3;

        fn neg(self) -> Self::Output {
            Self(-self.0)
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 三维线段，线框可视化使用。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Segment3 {
        pub start: Point3,
        pub end: Point3,
    }

    impl Segment3 {
        #[inline]
        pub fn new(start: Point3, end: Point3) -> Self {
            Self { start, end }
        }

        #[inline]
        pub fn length(&self) -> f64 {
            self.start.distance(self.end)
        }
    }

    /// 包围球，模型表面拾取失败时用于近似求交。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct BoundingSphere {
        pub center: Point3,
        pub radius: f64,
    }

    impl BoundingSphere {
        #[inline]
        pub fn new(center: Point3, radius: f64) -> Self {
            Self {
                center,
                radius: radius.abs(),
            }
        }
    }

    /// 屏幕拾取射线，方向始终为单位向量。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct Ray {
        origin: Point3,
        direction: Vector3,
    }

    impl Ray {
        /// 方向为零向量时返回 `None`。
        pub fn new(origin: Point3, direction: Vector3) -> Option<Self> {
            direction.normalize().map(|direction| Self { origin, direction })
        }

        #[inline]
        pub fn origin(&self) -> Point3 {
            self.origin
        }

        #[inline]
        pub fn direction(&self) -> Vector3 {
            self.direction
        }

        #[inline]
        pub fn at(&self, t: f64) -> Point3 {
            self.origin.translate(self.direction.scale(t))
        }

        /// 返回射线与球面的最近非负交点；射线起点在球内时返回出射点。
        pub fn intersect_sphere(&self, sphere: &BoundingSphere) -> Option<Point3> {
            let oc = Vector3::from_points(sphere.center, self.origin);
            let b = oc.dot(self.direction);
            let c = oc.length_squared() - sphere.radius * sphere.radius;
            let discriminant = b * b - c;
            if discriminant < 0.0 {
                return None;
            }
            let root = discriminant.sqrt();
            let near = -b - root;
            let far = -b + root;
            if near >= 0.0 {
                Some(self.at(near))
            } else if far >= 0.0 {
                Some(self.at(far))
            } else {
                None
            }
        }
    }

}

pub mod errors {
    use thiserror::Error;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum GeometryError {
        #[error("{name} 必须为正的有限值，当前为 {value}")]
        NonPositiveDimension { name: &'static str, value: f64 },
        #[error("旋转角必须为有限值，当前为 {0}")]
        NonFiniteAngle(f64),
        #[error("多边形至少需要 3 个不重合的顶点，当前 {found} 个")]
        TooFewVertices { found: usize },
    }
}

pub mod selection {
    use serde::{Deserialize, Serialize};

    use crate::geometry::Point3;
    use crate::polygon::{Polygon, area_and_winding_with};
    use crate::volume::BoxSelection;

    /// 交互工具完成后的不可变输出，供裁剪平面构建器或裁剪多边形适配器消费。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct SelectionResult {
        pub positions: Polygon,
        pub area_m2: f64,
        pub centroid: Point3,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub box_selection: Option<BoxSelection>,
    }

    impl SelectionResult {
        /// 由多边形计算面积与质心。
        pub fn from_polygon(polygon: Polygon, area_epsilon: f64) -> Self {
            let metrics = area_and_winding_with(polygon.positions(), area_epsilon);
            let centroid = metrics.centroid.unwrap_or_else(|| polygon.first());
            Self {
                positions: polygon,
                area_m2: metrics.area_m2,
                centroid,
                box_selection: None,
            }
        }

        #[inline]
        pub fn is_box(&self) -> bool {
            self.box_selection.is_some()
        }
    }
}
