//! 有向盒体选区：中心、宽、深、高与绕竖直轴的偏航角。

use glam::{DVec2, DVec3};
use serde::{Deserialize, Serialize};

use crate::errors::GeometryError;
use crate::geodesy::EnuFrame;
use crate::geometry::{Point3, Segment3};
use crate::polygon::Polygon;
use crate::selection::SelectionResult;

/// 足迹角点在盒体局部轴上的符号，依次为 [-x,-y]、[x,-y]、[x,y]、[-x,y]（逆时针）。
const CORNER_SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

/// 盒体选区。宽沿旋转后的局部东向，深沿局部北向，高从足迹平面竖直向上拉伸。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoxSelectionFields", into = "BoxSelectionFields")]
pub struct BoxSelection {
    center: Point3,
    width: f64,
    depth: f64,
    height: f64,
    rotation_deg: f64,
    step: f64,
}

/// 序列化形态；反序列化后经构造函数校验。
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct BoxSelectionFields {
    center: Point3,
    width: f64,
    depth: f64,
    height: f64,
    rotation_deg: f64,
    step: f64,
}

impl TryFrom<BoxSelectionFields> for BoxSelection {
    type Error = GeometryError;

    fn try_from(fields: BoxSelectionFields) -> Result<Self, Self::Error> {
        BoxSelection::new(fields.center, fields.width, fields.depth, fields.height)?
            .with_rotation(fields.rotation_deg)?
            .with_step(fields.step)
    }
}

impl From<BoxSelection> for BoxSelectionFields {
    fn from(selection: BoxSelection) -> Self {
        Self {
            center: selection.center,
            width: selection.width,
            depth: selection.depth,
            height: selection.height,
            rotation_deg: selection.rotation_deg,
            step: selection.step,
        }
    }
}

fn positive(name: &'static str, value: f64) -> Result<f64, GeometryError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(GeometryError::NonPositiveDimension { name, value })
    }
}

fn normalize_degrees(value: f64) -> f64 {
    let wrapped = value.rem_euclid(360.0);
    // rem_euclid 可能因舍入返回 360.0
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

impl BoxSelection {
    pub fn new(center: Point3, width: f64, depth: f64, height: f64) -> Result<Self, GeometryError> {
        Ok(Self {
            center,
            width: positive("width", width)?,
            depth: positive("depth", depth)?,
            height: positive("height", height)?,
            rotation_deg: 0.0,
            step: 1.0,
        })
    }

    pub fn with_rotation(mut self, degrees: f64) -> Result<Self, GeometryError> {
        self.set_rotation_deg(degrees)?;
        Ok(self)
    }

    pub fn with_step(mut self, step: f64) -> Result<Self, GeometryError> {
        self.set_step(step)?;
        Ok(self)
    }

    #[inline]
    pub fn center(&self) -> Point3 {
        self.center
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    #[inline]
    pub fn depth(&self) -> f64 {
        self.depth
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn rotation_deg(&self) -> f64 {
        self.rotation_deg
    }

    #[inline]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[inline]
    pub fn set_center(&mut self, center: Point3) {
        self.center = center;
    }

    pub fn set_width(&mut self, width: f64) -> Result<(), GeometryError> {
        self.width = positive("width", width)?;
        Ok(())
    }

    pub fn set_depth(&mut self, depth: f64) -> Result<(), GeometryError> {
        self.depth = positive("depth", depth)?;
        Ok(())
    }

    pub fn set_height(&mut self, height: f64) -> Result<(), GeometryError> {
        self.height = positive("height", height)?;
        Ok(())
    }

    pub fn set_step(&mut self, step: f64) -> Result<(), GeometryError> {
        self.step = positive("step", step)?;
        Ok(())
    }

    pub fn set_rotation_deg(&mut self, degrees: f64) -> Result<(), GeometryError> {
        if !degrees.is_finite() {
            return Err(GeometryError::NonFiniteAngle(degrees));
        }
        self.rotation_deg = normalize_degrees(degrees);
        Ok(())
    }

    /// 在中心点的 ENU 平面内平移中心（米）。
    pub fn translate_local(&mut self, east: f64, north: f64) {
        let frame = self.frame();
        self.center = frame.to_global(DVec3::new(east, north, 0.0));
    }

    #[inline]
    pub fn frame(&self) -> EnuFrame {
        EnuFrame::at(self.center)
    }

    /// 旋转后的四个角点局部平面坐标。
    fn corner_offsets(&self) -> [DVec2; 4] {
        let (sin, cos) = self.rotation_deg.to_radians().sin_cos();
        let half_w = self.width * 0.5;
        let half_d = self.depth * 0.5;
        CORNER_SIGNS.map(|(sx, sy)| {
            let dx = sx * half_w;
            let dy = sy * half_d;
            DVec2::new(dx * cos - dy * sin, dx * sin + dy * cos)
        })
    }

    fn corners_at(&self, frame: &EnuFrame, up: f64) -> [Point3; 4] {
        self.corner_offsets()
            .map(|offset| frame.to_global(offset.extend(up)))
    }

    /// 地面高度上的四个角点。
    pub fn footprint(&self) -> Polygon {
        let frame = self.frame();
        Polygon::from_vertices_unchecked(self.corners_at(&frame, 0.0).to_vec())
    }

    /// 12 条棱：底面 4 条、顶面 4 条、竖直 4 条，仅用于可视化。
    pub fn wireframe(&self) -> [Segment3; 12] {
        let frame = self.frame();
        let bottom = self.corners_at(&frame, 0.0);
        let top = self.corners_at(&frame, self.height);
        std::array::from_fn(|i| {
            let k = i % 4;
            let next = (k + 1) % 4;
            match i / 4 {
                0 => Segment3::new(bottom[k], bottom[next]),
                1 => Segment3::new(top[k], top[next]),
                _ => Segment3::new(bottom[k], top[k]),
            }
        })
    }

    /// 面积由宽×深解析给出，不经鞋带公式重建。
    #[inline]
    pub fn area_m2(&self) -> f64 {
        self.width * self.depth
    }

    pub fn finalize(&self) -> SelectionResult {
        let footprint = self.footprint();
        let corners = footprint.positions();
        let sum = corners
            .iter()
            .fold(DVec3::ZERO, |acc, corner| acc + corner.as_vec3());
        let centroid = Point3(sum / corners.len() as f64);
        SelectionResult {
            positions: footprint,
            area_m2: self.area_m2(),
            centroid,
            box_selection: Some(*self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::Cartographic;
    use crate::polygon::area_and_winding;

    fn center() -> Point3 {
        Cartographic::from_degrees(139.6917, 35.6895, 40.0).to_cartesian()
    }

    #[test]
    fn rotated_footprint_is_congruent_to_swapped_dimensions() {
        let rotated = BoxSelection::new(center(), 10.0, 4.0, 3.0)
            .unwrap()
            .with_rotation(90.0)
            .unwrap();
        let swapped = BoxSelection::new(center(), 4.0, 10.0, 3.0).unwrap();

        let a = rotated.footprint();
        let b = swapped.footprint();
        for corner in a.positions() {
            let matched = b.positions().iter().any(|other| corner.approx_eq(*other, 1e-6));
            assert!(matched, "corner {corner:?} should exist in swapped footprint");
        }
    }

    #[test]
    fn footprint_is_counter_clockwise_with_expected_area() {
        let selection = BoxSelection::new(center(), 6.0, 8.0, 2.0)
            .unwrap()
            .with_rotation(33.0)
            .unwrap();
        let metrics = area_and_winding(selection.footprint().positions());
        assert!(metrics.is_ccw);
        assert!((metrics.area_m2 - 48.0).abs() < 1e-6);
    }

    #[test]
    fn wireframe_has_twelve_edges_with_vertical_connectors() {
        let selection = BoxSelection::new(center(), 6.0, 8.0, 5.0).unwrap();
        let edges = selection.wireframe();
        assert_eq!(edges.len(), 12);
        let frame = selection.frame();
        for edge in &edges[8..] {
            let start = frame.to_local(edge.start);
            let end = frame.to_local(edge.end);
            assert!((end.z - start.z - 5.0).abs() < 1e-6);
            assert!((end.truncate() - start.truncate()).length() < 1e-6);
        }
        for edge in &edges[..4] {
            assert!(frame.to_local(edge.start).z.abs() < 1e-6);
        }
        let lengths: Vec<f64> = edges[..4].iter().map(Segment3::length).collect();
        assert!((lengths[0] - 6.0).abs() < 1e-6);
        assert!((lengths[1] - 8.0).abs() < 1e-6);
    }

    #[test]
    fn finalize_uses_analytic_area_and_center_centroid() {
        let selection = BoxSelection::new(center(), 12.5, 4.0, 3.0)
            .unwrap()
            .with_rotation(-45.0)
            .unwrap();
        let result = selection.finalize();
        assert_eq!(result.area_m2, 50.0);
        assert!(result.centroid.approx_eq(selection.center(), 1e-6));
        assert_eq!(result.positions.len(), 4);
        assert_eq!(result.box_selection, Some(selection));
        assert!((selection.rotation_deg() - 315.0).abs() < 1e-9);
    }

    #[test]
    fn non_positive_dimensions_are_rejected() {
        assert!(matches!(
            BoxSelection::new(center(), 0.0, 1.0, 1.0),
            Err(GeometryError::NonPositiveDimension { name: "width", .. })
        ));
        let mut selection = BoxSelection::new(center(), 1.0, 1.0, 1.0).unwrap();
        assert!(selection.set_height(-2.0).is_err());
        assert!(selection.set_step(f64::NAN).is_err());
        assert!(selection.set_rotation_deg(f64::INFINITY).is_err());
        assert_eq!(selection.height(), 1.0);
    }

    #[test]
    fn translate_local_moves_center_by_offset() {
        let mut selection = BoxSelection::new(center(), 1.0, 1.0, 1.0).unwrap();
        let before = selection.center();
        let frame = selection.frame();
        selection.translate_local(3.0, -4.0);
        let local = frame.to_local(selection.center());
        assert!((local.x - 3.0).abs() < 1e-9);
        assert!((local.y + 4.0).abs() < 1e-9);
        assert!((selection.center().distance(before) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn deserialization_rejects_invalid_dimensions() {
        let selection = BoxSelection::new(center(), 8.0, 6.0, 4.0)
            .unwrap()
            .with_rotation(30.0)
            .unwrap()
            .with_step(0.5)
            .unwrap();
        let json = serde_json::to_string(&selection).unwrap();
        let restored: BoxSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, selection);

        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["height"] = serde_json::json!(0.0);
        assert!(serde_json::from_value::<BoxSelection>(value.clone()).is_err());
        value["height"] = serde_json::json!(4.0);
        value["step"] = serde_json::json!(-1.0);
        assert!(serde_json::from_value::<BoxSelection>(value).is_err());
    }
}
