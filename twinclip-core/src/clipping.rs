//! 由多边形足迹推导裁剪图元：模型使用半空间平面集，瓦片数据集使用原生裁剪多边形。

use glam::{DMat3, DMat4, DVec2};
use serde::{Deserialize, Serialize};

use crate::geodesy::EnuFrame;
use crate::geometry::{Point3, Vector3};
use crate::polygon::{DEFAULT_DEGENERATE_AREA_EPSILON, Polygon, shoelace};

/// 边长低于该值（米）的边不生成平面。
pub const DEFAULT_MIN_EDGE_LENGTH: f64 = 1e-6;

/// 裁剪模式：保留区域内部，或移除区域内部。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClipMode {
    KeepInside,
    RemoveInside,
}

impl ClipMode {
    /// 移除内部时平面法向需要整体取反。
    #[inline]
    pub fn inverts(self) -> bool {
        matches!(self, ClipMode::RemoveInside)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClipMode::KeepInside => "keepInside",
            ClipMode::RemoveInside => "removeInside",
        }
    }
}

/// 半空间平面：`dot(normal, p) + distance >= 0` 的一侧为外侧。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3,
    pub distance: f64,
}

impl Plane {
    #[inline]
    pub fn new(normal: Vector3, distance: f64) -> Self {
        Self { normal, distance }
    }

    /// 构造经过 `point` 的平面。
    #[inline]
    pub fn through_point(normal: Vector3, point: Point3) -> Self {
        Self {
            normal,
            distance: -normal.dot_point(point),
        }
    }

    #[inline]
    pub fn signed_distance(&self, point: Point3) -> f64 {
        self.normal.dot_point(point) + self.distance
    }

    #[inline]
    pub fn is_outside(&self, point: Point3) -> bool {
        self.signed_distance(point) >= 0.0
    }

    #[inline]
    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// 把世界坐标平面表达到模型局部坐标（`p_world = M * p_model`）。
    ///
    /// 线性部分不可逆或结果非有限值时返回 `None`。
    pub fn to_model_space(&self, transform: &ModelTransform) -> Option<Self> {
        let linear = DMat3::from_mat4(transform.matrix);
        if linear.determinant().abs() <= f64::EPSILON {
            return None;
        }
        let translation = transform.matrix.w_axis.truncate();
        let n = self.normal.as_vec3();
        let local_normal = linear.transpose() * n;
        let local_distance = n.dot(translation) + self.distance;
        let len = local_normal.length();
        if len <= f64::EPSILON || !len.is_finite() || !local_distance.is_finite() {
            return None;
        }
        Some(Self {
            normal: Vector3(local_normal / len),
            distance: local_distance / len,
        })
    }
}

/// 以交集语义组合的平面集合，近似多边形竖直棱柱。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaneSet {
    planes: Vec<Plane>,
}

impl PlaneSet {
    #[inline]
    pub fn new(planes: Vec<Plane>) -> Self {
        Self { planes }
    }

    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Plane> {
        self.planes.iter()
    }

    pub fn flipped(&self) -> Self {
        Self {
            planes: self.planes.iter().map(Plane::flipped).collect(),
        }
    }

    /// 判断点是否被裁掉。保留内部：位于任一平面外侧即裁掉；
    /// 移除内部（法向已取反）：位于所有平面外侧才裁掉。
    pub fn clips(&self, point: Point3, mode: ClipMode) -> bool {
        match mode {
            ClipMode::KeepInside => self.planes.iter().any(|plane| plane.is_outside(point)),
            ClipMode::RemoveInside => {
                !self.planes.is_empty() && self.planes.iter().all(|plane| plane.is_outside(point))
            }
        }
    }

    /// 任一平面无法换算时整体返回 `None`。
    pub fn to_model_space(&self, transform: &ModelTransform) -> Option<Self> {
        let planes = self
            .planes
            .iter()
            .map(|plane| plane.to_model_space(transform))
            .collect::<Option<Vec<_>>>()?;
        Some(Self { planes })
    }
}

impl From<Vec<Plane>> for PlaneSet {
    fn from(value: Vec<Plane>) -> Self {
        Self::new(value)
    }
}

/// 模型的局部→世界变换矩阵。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelTransform {
    pub matrix: DMat4,
}

impl ModelTransform {
    #[inline]
    pub fn new(matrix: DMat4) -> Self {
        Self { matrix }
    }

    #[inline]
    pub fn identity() -> Self {
        Self {
            matrix: DMat4::IDENTITY,
        }
    }

    #[inline]
    pub fn transform_point(&self, point: Point3) -> Point3 {
        Point3(self.matrix.transform_point3(point.as_vec3()))
    }
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneBuildOptions {
    pub min_edge_length: f64,
    pub degenerate_area_epsilon: f64,
}

impl Default for PlaneBuildOptions {
    fn default() -> Self {
        Self {
            min_edge_length: DEFAULT_MIN_EDGE_LENGTH,
            degenerate_area_epsilon: DEFAULT_DEGENERATE_AREA_EPSILON,
        }
    }
}

pub fn build_planes(polygon: &[Point3], invert: bool) -> Option<PlaneSet> {
    build_planes_with(polygon, invert, &PlaneBuildOptions::default())
}

/// 为多边形每条边生成一个竖直半空间平面，外侧背离多边形内部。
///
/// 环向由首点 ENU 平面上的有向面积判定，因此顺时针与逆时针绘制得到相同的裁剪区域。
/// `invert` 为真时所有法向取反（移除内部）。不生成顶/底平面，结果是无限高的竖直棱柱。
/// 可用边少于三条或面积退化时返回 `None`。
pub fn build_planes_with(
    polygon: &[Point3],
    invert: bool,
    options: &PlaneBuildOptions,
) -> Option<PlaneSet> {
    if polygon.len() < 3 {
        return None;
    }

    let frame = EnuFrame::at(polygon[0]);
    let local: Vec<DVec2> = polygon
        .iter()
        .map(|p| frame.to_local(*p).truncate())
        .collect();

    let signed_area = shoelace(&local);
    if signed_area.abs() < options.degenerate_area_epsilon {
        return None;
    }
    let is_ccw = signed_area > 0.0;

    let n = local.len();
    let mut planes = Vec::with_capacity(n);
    for i in 0..n {
        let a = local[i];
        let b = local[(i + 1) % n];
        let edge = b - a;
        if edge.length() < options.min_edge_length {
            continue;
        }
        let outward = if is_ccw {
            DVec2::new(edge.y, -edge.x)
        } else {
            DVec2::new(-edge.y, edge.x)
        };
        let oriented = if invert { -outward } else { outward };
        let Some(global) = frame
            .direction_to_global(oriented.normalize().extend(0.0))
            .normalize()
        else {
            continue;
        };
        planes.push(Plane::through_point(global, polygon[i]));
    }

    if planes.len() < 3 {
        None
    } else {
        Some(PlaneSet::new(planes))
    }
}

/// 直接交给场景引擎原生多边形裁剪的闭合环，环向由引擎自行处理。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipPolygon {
    positions: Vec<Point3>,
}

impl ClipPolygon {
    #[inline]
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }
}

pub fn as_clip_polygon(polygon: &Polygon) -> ClipPolygon {
    ClipPolygon {
        positions: polygon.positions().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::geodesy::Cartographic;

    fn frame() -> EnuFrame {
        EnuFrame::at(Cartographic::from_degrees(2.3522, 48.8566, 35.0).to_cartesian())
    }

    fn square(frame: &EnuFrame) -> Vec<Point3> {
        [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]
            .iter()
            .map(|(x, y)| frame.to_global(DVec3::new(*x, *y, 0.0)))
            .collect()
    }

    #[test]
    fn square_planes_keep_inside_and_clip_outside() {
        let frame = frame();
        let planes = build_planes(&square(&frame), false).expect("square yields planes");
        assert_eq!(planes.len(), 4);

        let inside = frame.to_global(DVec3::new(5.0, 5.0, 0.0));
        let outside = frame.to_global(DVec3::new(15.0, 5.0, 0.0));
        let below_inside = frame.to_global(DVec3::new(5.0, 5.0, -500.0));
        assert!(!planes.clips(inside, ClipMode::KeepInside));
        assert!(planes.clips(outside, ClipMode::KeepInside));
        // 无顶/底平面：正下方仍在棱柱内
        assert!(!planes.clips(below_inside, ClipMode::KeepInside));
        for plane in planes.iter() {
            assert!(plane.signed_distance(inside) < 0.0);
            assert!((plane.normal.length() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn winding_order_does_not_change_clipped_region() {
        let frame = frame();
        let ccw = square(&frame);
        let mut cw = ccw.clone();
        cw.reverse();
        let a = build_planes(&ccw, false).unwrap();
        let b = build_planes(&cw, false).unwrap();

        for plane in a.iter() {
            let matched = b.iter().any(|other| plane.normal.dot(other.normal) > 1.0 - 1e-9);
            assert!(matched, "each outward normal should appear in the reversed set");
        }

        let probes = [
            (5.0, 5.0),
            (-1.0, 5.0),
            (11.0, 5.0),
            (5.0, -1.0),
            (5.0, 11.0),
            (9.9, 0.1),
        ];
        for (x, y) in probes {
            let p = frame.to_global(DVec3::new(x, y, 0.0));
            assert_eq!(
                a.clips(p, ClipMode::KeepInside),
                b.clips(p, ClipMode::KeepInside),
                "probe ({x}, {y})"
            );
        }
    }

    #[test]
    fn invert_negates_normals_and_distances() {
        let frame = frame();
        let ring = square(&frame);
        let keep = build_planes(&ring, false).unwrap();
        let remove = build_planes(&ring, true).unwrap();
        assert_eq!(keep.len(), remove.len());
        for (k, r) in keep.iter().zip(remove.iter()) {
            assert!((k.normal.as_vec3() + r.normal.as_vec3()).length() < 1e-12);
            assert!((k.distance + r.distance).abs() < 1e-6);
        }

        let inside = frame.to_global(DVec3::new(5.0, 5.0, 0.0));
        let outside = frame.to_global(DVec3::new(25.0, 5.0, 0.0));
        assert!(remove.clips(inside, ClipMode::RemoveInside));
        assert!(!remove.clips(outside, ClipMode::RemoveInside));
    }

    #[test]
    fn collinear_points_produce_no_planes() {
        let frame = frame();
        let ring: Vec<Point3> = [(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]
            .iter()
            .map(|(x, y)| frame.to_global(DVec3::new(*x, *y, 0.0)))
            .collect();
        assert!(build_planes(&ring, false).is_none());
        assert!(build_planes(&ring[..2], false).is_none());
    }

    #[test]
    fn model_space_planes_follow_model_translation() {
        let frame = frame();
        let planes = build_planes(&square(&frame), false).unwrap();
        let offset = DVec3::new(120.0, -40.0, 8.0);
        let transform = ModelTransform::new(DMat4::from_translation(offset));
        let local_planes = planes.to_model_space(&transform).unwrap();

        let world_inside = frame.to_global(DVec3::new(5.0, 5.0, 0.0));
        let model_inside = Point3(world_inside.as_vec3() - offset);
        for (world, local) in planes.iter().zip(local_planes.iter()) {
            let expected = world.signed_distance(world_inside);
            assert!((local.signed_distance(model_inside) - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn singular_model_transform_is_rejected() {
        let frame = frame();
        let planes = build_planes(&square(&frame), false).unwrap();
        let flattened = ModelTransform::new(DMat4::from_scale(DVec3::new(1.0, 1.0, 0.0)));
        assert!(planes.to_model_space(&flattened).is_none());
        assert!(planes.planes()[0].to_model_space(&flattened).is_none());
        assert!(planes.to_model_space(&ModelTransform::identity()).is_some());
    }

    #[test]
    fn clip_polygon_keeps_ring_order() {
        let frame = frame();
        let polygon = Polygon::from_ring(square(&frame), 1e-6).unwrap();
        let clip = as_clip_polygon(&polygon);
        assert_eq!(clip.positions(), polygon.positions());
    }
}
