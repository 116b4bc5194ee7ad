//! 裁剪状态的 JSON 形态：平面为 `{normal:{x,y,z}, distance}`，顶点为 `{x,y,z}`。
//!
//! 数值按最短往返表示写出，读回后逐位相同。

use serde::{Deserialize, Serialize};
use twinclip_core::clipping::{Plane, PlaneSet};
use twinclip_core::geometry::{Point3, Vector3};
use twinclip_core::polygon::Polygon;

use crate::IoError;

const NORMAL_LENGTH_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct XyzDto {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct PlaneDto {
    normal: XyzDto,
    distance: f64,
}

impl From<Point3> for XyzDto {
    fn from(point: Point3) -> Self {
        Self {
            x: point.x(),
            y: point.y(),
            z: point.z(),
        }
    }
}

impl From<&Plane> for PlaneDto {
    fn from(plane: &Plane) -> Self {
        Self {
            normal: XyzDto {
                x: plane.normal.x(),
                y: plane.normal.y(),
                z: plane.normal.z(),
            },
            distance: plane.distance,
        }
    }
}

impl TryFrom<PlaneDto> for Plane {
    type Error = IoError;

    fn try_from(dto: PlaneDto) -> Result<Self, Self::Error> {
        let PlaneDto { normal, distance } = dto;
        let normal = Vector3::new(normal.x, normal.y, normal.z);
        if !distance.is_finite() || !normal.as_vec3().is_finite() {
            return Err(IoError::InvalidClipState("平面包含非有限数值".to_string()));
        }
        let length = normal.length();
        if (length - 1.0).abs() > NORMAL_LENGTH_TOLERANCE {
            return Err(IoError::InvalidClipState(format!(
                "平面法向不是单位向量（长度 {length}）"
            )));
        }
        Ok(Plane::new(normal, distance))
    }
}

pub fn encode_plane_set(planes: &PlaneSet) -> Result<String, IoError> {
    let dtos: Vec<PlaneDto> = planes.iter().map(PlaneDto::from).collect();
    Ok(serde_json::to_string(&dtos)?)
}

pub fn decode_plane_set(json: &str) -> Result<PlaneSet, IoError> {
    decode_optional_plane_set(json)?
        .ok_or_else(|| IoError::InvalidClipState("平面集合为 null".to_string()))
}

/// `null` 表示当时没有裁剪。
pub fn decode_optional_plane_set(json: &str) -> Result<Option<PlaneSet>, IoError> {
    let dtos: Option<Vec<PlaneDto>> = serde_json::from_str(json)?;
    let Some(dtos) = dtos else {
        return Ok(None);
    };
    let planes = dtos
        .into_iter()
        .map(Plane::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(PlaneSet::new(planes)))
}

pub fn encode_polygon(polygon: &Polygon) -> Result<String, IoError> {
    let dtos: Vec<XyzDto> = polygon.positions().iter().copied().map(XyzDto::from).collect();
    Ok(serde_json::to_string(&dtos)?)
}

/// 读回顶点环并做闭合整理。
pub fn decode_polygon(json: &str, closure_epsilon: f64) -> Result<Polygon, IoError> {
    let dtos: Vec<XyzDto> = serde_json::from_str(json)?;
    let found = dtos.len();
    let points = dtos.into_iter().map(|dto| Point3::new(dto.x, dto.y, dto.z));
    Polygon::from_ring(points, closure_epsilon).ok_or_else(|| {
        IoError::InvalidClipState(format!("多边形顶点不足三个（原始 {found} 个）"))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use twinclip_core::clipping::build_planes;
    use twinclip_core::geodesy::Cartographic;

    use super::*;

    fn footprint() -> Vec<Point3> {
        [(30.0, -97.74), (30.0005, -97.74), (30.0005, -97.7395)]
            .iter()
            .map(|(lat, lon)| Cartographic::from_degrees(*lon, *lat, 150.0).to_cartesian())
            .collect()
    }

    #[test]
    fn plane_set_survives_json_bit_for_bit() {
        let planes = build_planes(&footprint(), false).unwrap();
        let json = encode_plane_set(&planes).unwrap();
        let decoded = decode_plane_set(&json).unwrap();
        assert_eq!(decoded.len(), planes.len());
        for (a, b) in decoded.iter().zip(planes.iter()) {
            assert_eq!(a.distance.to_bits(), b.distance.to_bits());
            assert_eq!(a.normal.x().to_bits(), b.normal.x().to_bits());
            assert_eq!(a.normal.y().to_bits(), b.normal.y().to_bits());
            assert_eq!(a.normal.z().to_bits(), b.normal.z().to_bits());
        }
    }

    #[test]
    fn plane_json_uses_plain_object_shape() {
        let planes = PlaneSet::new(vec![Plane::new(Vector3::new(0.0, 0.0, 1.0), -2.5)]);
        let value: Value = serde_json::from_str(&encode_plane_set(&planes).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!([{ "normal": { "x": 0.0, "y": 0.0, "z": 1.0 }, "distance": -2.5 }])
        );
    }

    #[test]
    fn null_and_invalid_plane_sets() {
        assert_eq!(decode_optional_plane_set("null").unwrap(), None);
        assert!(matches!(decode_plane_set("null"), Err(IoError::InvalidClipState(_))));
        assert!(matches!(
            decode_plane_set(r#"[{"normal":{"x":0,"y":0,"z":3},"distance":1}]"#),
            Err(IoError::InvalidClipState(_))
        ));
        assert!(matches!(decode_plane_set("{"), Err(IoError::Json(_))));
    }

    #[test]
    fn polygon_round_trip_drops_closing_vertex() {
        let mut ring = footprint();
        ring.push(ring[0]);
        let json = serde_json::to_string(
            &ring.iter().copied().map(XyzDto::from).collect::<Vec<_>>(),
        )
        .unwrap();
        let polygon = decode_polygon(&json, 1e-6).unwrap();
        assert_eq!(polygon.len(), 3);

        let encoded = encode_polygon(&polygon).unwrap();
        assert_eq!(decode_polygon(&encoded, 1e-6).unwrap(), polygon);
        assert!(decode_polygon(r#"[{"x":1,"y":2,"z":3}]"#, 1e-6).is_err());
    }
}
