//! 闭合多边形环及其面积、环向与质心计算。

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::errors::GeometryError;
use crate::geodesy::EnuFrame;
use crate::geometry::Point3;

/// 判定首尾重合或相邻重复顶点的默认容差（米）。
pub const DEFAULT_CLOSURE_EPSILON: f64 = 1e-6;
/// 投影面积低于该值（平方米）视为退化多边形。
pub const DEFAULT_DEGENERATE_AREA_EPSILON: f64 = 1e-6;

/// 至少三个顶点、隐式闭合的多边形环。相邻顶点互不重合。
///
/// 反序列化同样经过闭合整理，顶点不足时报错。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point3>", into = "Vec<Point3>")]
pub struct Polygon {
    positions: Vec<Point3>,
}

impl TryFrom<Vec<Point3>> for Polygon {
    type Error = GeometryError;

    fn try_from(points: Vec<Point3>) -> Result<Self, Self::Error> {
        let found = points.len();
        Self::from_ring(points, DEFAULT_CLOSURE_EPSILON)
            .ok_or(GeometryError::TooFewVertices { found })
    }
}

impl From<Polygon> for Vec<Point3> {
    fn from(polygon: Polygon) -> Self {
        polygon.positions
    }
}

impl Polygon {
    /// 执行闭合整理后构建多边形，顶点不足三个时返回 `None`。
    pub fn from_ring(points: impl IntoIterator<Item = Point3>, epsilon: f64) -> Option<Self> {
        let positions = close_ring(points, epsilon);
        if positions.len() < 3 {
            None
        } else {
            Some(Self { positions })
        }
    }

    /// 调用方保证顶点数 ≥ 3 且无重复（例如盒体足迹）。
    pub(crate) fn from_vertices_unchecked(positions: Vec<Point3>) -> Self {
        debug_assert!(positions.len() >= 3);
        Self { positions }
    }

    #[inline]
    pub fn positions(&self) -> &[Point3] {
        &self.positions
    }

    #[inline]
    pub fn into_positions(self) -> Vec<Point3> {
        self.positions
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    #[inline]
    pub fn first(&self) -> Point3 {
        self.positions[0]
    }

    /// 逆序顶点，得到相反环向的同一多边形。
    pub fn reversed(&self) -> Self {
        let mut positions = self.positions.clone();
        positions.reverse();
        Self { positions }
    }

    /// 依次返回各条边（含最后一条回到起点的边）。
    pub fn edges(&self) -> impl Iterator<Item = (Point3, Point3)> + '_ {
        let n = self.positions.len();
        (0..n).map(move |i| (self.positions[i], self.positions[(i + 1) % n]))
    }

    #[inline]
    pub fn metrics(&self) -> PolygonMetrics {
        area_and_winding(&self.positions)
    }
}

/// 去掉与前一顶点重合的点，以及与首点重合的尾点。
pub fn close_ring(points: impl IntoIterator<Item = Point3>, epsilon: f64) -> Vec<Point3> {
    let mut ring: Vec<Point3> = Vec::new();
    for point in points {
        match ring.last() {
            Some(last) if last.approx_eq(point, epsilon) => continue,
            _ => ring.push(point),
        }
    }
    while ring.len() > 1 {
        let first = ring[0];
        match ring.last() {
            Some(last) if last.approx_eq(first, epsilon) => {
                ring.pop();
            }
            _ => break,
        }
    }
    ring
}

/// 多边形度量结果。`centroid` 仅在顶点数 ≥ 3 时存在。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolygonMetrics {
    pub area_m2: f64,
    pub signed_area: f64,
    pub is_ccw: bool,
    pub centroid: Option<Point3>,
}

impl PolygonMetrics {
    fn degenerate() -> Self {
        Self {
            area_m2: 0.0,
            signed_area: 0.0,
            is_ccw: false,
            centroid: None,
        }
    }
}

pub fn area_and_winding(points: &[Point3]) -> PolygonMetrics {
    area_and_winding_with(points, DEFAULT_DEGENERATE_AREA_EPSILON)
}

/// 在以首点为原点的 ENU 平面上用鞋带公式求面积与环向，质心投影回全局坐标。
///
/// 面积接近零（共线点）时质心退化为首点，避免除以近零分母。
pub fn area_and_winding_with(points: &[Point3], area_epsilon: f64) -> PolygonMetrics {
    if points.len() < 3 {
        return PolygonMetrics::degenerate();
    }

    let frame = EnuFrame::at(points[0]);
    let local: Vec<DVec3> = points.iter().map(|p| frame.to_local(*p)).collect();
    let planar: Vec<DVec2> = local.iter().map(|v| v.truncate()).collect();

    let signed_area = shoelace(&planar);
    let area_m2 = signed_area.abs();

    let centroid = if area_m2 < area_epsilon {
        points[0]
    } else {
        let n = planar.len();
        let mut cx = 0.0;
        let mut cy = 0.0;
        for i in 0..n {
            let a = planar[i];
            let b = planar[(i + 1) % n];
            let cross = a.perp_dot(b);
            cx += (a.x + b.x) * cross;
            cy += (a.y + b.y) * cross;
        }
        let factor = 1.0 / (6.0 * signed_area);
        let cz = local.iter().map(|v| v.z).sum::<f64>() / n as f64;
        frame.to_global(DVec3::new(cx * factor, cy * factor, cz))
    };

    PolygonMetrics {
        area_m2,
        signed_area,
        is_ccw: signed_area > 0.0,
        centroid: Some(centroid),
    }
}

/// 平面鞋带公式，逆时针为正。
pub fn shoelace(points: &[DVec2]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..n {
        sum += points[i].perp_dot(points[(i + 1) % n]);
    }
    sum * 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Cartographic;

    fn frame() -> EnuFrame {
        EnuFrame::at(Cartographic::from_degrees(121.47, 31.23, 10.0).to_cartesian())
    }

    fn ring(frame: &EnuFrame, offsets: &[(f64, f64)]) -> Vec<Point3> {
        offsets
            .iter()
            .map(|(x, y)| frame.to_global(DVec3::new(*x, *y, 0.0)))
            .collect()
    }

    const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];

    #[test]
    fn square_area_winding_and_centroid() {
        let frame = frame();
        let points = ring(&frame, &SQUARE);
        let metrics = area_and_winding(&points);
        assert!((metrics.area_m2 - 100.0).abs() < 1e-6);
        assert!(metrics.is_ccw);
        let centroid = frame.to_local(metrics.centroid.expect("centroid"));
        assert!((centroid.x - 5.0).abs() < 1e-6);
        assert!((centroid.y - 5.0).abs() < 1e-6);
        assert!(centroid.z.abs() < 1e-6);
    }

    #[test]
    fn reversed_square_is_clockwise_with_same_area() {
        let frame = frame();
        let mut points = ring(&frame, &SQUARE);
        points.reverse();
        let metrics = area_and_winding(&points);
        assert!((metrics.area_m2 - 100.0).abs() < 1e-6);
        assert!(!metrics.is_ccw);
        assert!(metrics.signed_area < 0.0);
        let centroid = frame.to_local(metrics.centroid.unwrap());
        assert!((centroid.x - 5.0).abs() < 1e-6);
        assert!((centroid.y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn collinear_points_are_degenerate_and_centroid_falls_back() {
        let frame = frame();
        let points = ring(&frame, &[(0.0, 0.0), (5.0, 0.0), (10.0, 0.0)]);
        let metrics = area_and_winding(&points);
        assert!(metrics.area_m2 < 1e-6);
        assert_eq!(metrics.centroid, Some(points[0]));
    }

    #[test]
    fn fewer_than_three_points_yield_empty_metrics() {
        let frame = frame();
        let points = ring(&frame, &[(0.0, 0.0), (5.0, 0.0)]);
        let metrics = area_and_winding(&points);
        assert_eq!(metrics.area_m2, 0.0);
        assert!(metrics.centroid.is_none());
    }

    #[test]
    fn non_convex_l_shape_area() {
        let frame = frame();
        let points = ring(
            &frame,
            &[
                (0.0, 0.0),
                (20.0, 0.0),
                (20.0, 10.0),
                (10.0, 10.0),
                (10.0, 20.0),
                (0.0, 20.0),
            ],
        );
        let metrics = area_and_winding(&points);
        assert!((metrics.area_m2 - 300.0).abs() < 1e-5);
        assert!(metrics.is_ccw);
    }

    #[test]
    fn closing_pass_drops_duplicate_closure_and_repeats() {
        let frame = frame();
        let mut points = ring(&frame, &SQUARE);
        points.insert(2, points[1]);
        points.push(points[0]);
        let polygon = Polygon::from_ring(points, DEFAULT_CLOSURE_EPSILON).expect("valid polygon");
        assert_eq!(polygon.len(), 4);
    }

    #[test]
    fn ring_collapsing_below_three_vertices_is_rejected() {
        let frame = frame();
        let points = ring(&frame, &[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        assert!(Polygon::from_ring(points, DEFAULT_CLOSURE_EPSILON).is_none());
    }

    #[test]
    fn edges_wrap_around() {
        let frame = frame();
        let polygon = Polygon::from_ring(ring(&frame, &SQUARE), DEFAULT_CLOSURE_EPSILON).unwrap();
        let edges: Vec<_> = polygon.edges().collect();
        assert_eq!(edges.len(), 4);
        assert_eq!(edges[3].1, polygon.first());
    }

    #[test]
    fn deserialization_enforces_ring_invariants() {
        let frame = frame();
        let polygon = Polygon::from_ring(ring(&frame, &SQUARE), DEFAULT_CLOSURE_EPSILON).unwrap();
        let json = serde_json::to_string(&polygon).unwrap();
        let restored: Polygon = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, polygon);

        let two = serde_json::to_string(&polygon.positions()[..2]).unwrap();
        assert!(serde_json::from_str::<Polygon>(&two).is_err());
        assert!(serde_json::from_str::<Polygon>("[]").is_err());

        let mut closed = polygon.positions().to_vec();
        closed.push(polygon.first());
        let restored: Polygon = serde_json::from_str(&serde_json::to_string(&closed).unwrap()).unwrap();
        assert_eq!(restored.len(), 4);
    }
}
