//! 区域文件格式。
//!
//! 两种写法，按文档顺序抽取数值：
//! - 构造表达式：每个顶点一个 `<ctor>(x, y, z)`，坐标为地心直角坐标（米）；
//! - 带 `Degrees Array` 标签的段落：其后的 `lon, lat` 数值对（度），高度取 0。
//!
//! 出现 `Degrees Array` 标签时优先按经纬度解析，段落在下一个空行或文件末尾结束。

use once_cell::sync::Lazy;
use regex::Regex;
use twinclip_core::geodesy::Cartographic;
use twinclip_core::geometry::Point3;
use twinclip_core::polygon::Polygon;

use crate::IoError;

const NUMBER: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

/// 标签本身，连同可选的括号说明（须以字母开头，如 `(WGS84)`）与冒号、等号。
static DEGREES_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)degrees\s*array(?:\s*\(\s*[A-Za-z][^()\[\]]*\))?\s*[:=]?")
        .expect("标签正则为常量")
});

static CONSTRUCTOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"[A-Za-z_][\w.]*\s*\(\s*({NUMBER})\s*,\s*({NUMBER})\s*,\s*({NUMBER})\s*\)"
    ))
    .expect("构造表达式正则为常量")
});

static NUMBER_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(NUMBER).expect("数值正则为常量"));

static BLANK_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r]*\n").expect("空行正则为常量"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFormat {
    Constructors,
    DegreesArray,
}

impl RegionFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionFormat::Constructors => "constructors",
            RegionFormat::DegreesArray => "degrees_array",
        }
    }
}

/// 解析得到的原始顶点序列，尚未做闭合整理。
#[derive(Debug, Clone, PartialEq)]
pub struct RegionFile {
    pub format: RegionFormat,
    pub vertices: Vec<Point3>,
}

impl RegionFile {
    pub fn into_polygon(self, closure_epsilon: f64) -> Result<Polygon, IoError> {
        let found = self.vertices.len();
        Polygon::from_ring(self.vertices, closure_epsilon).ok_or_else(|| {
            IoError::InvalidRegion(format!("整理后顶点不足三个（原始 {found} 个）"))
        })
    }
}

pub fn parse_region(source: &str) -> Result<RegionFile, IoError> {
    if let Some(found) = DEGREES_LABEL.find(source) {
        let vertices = parse_degrees_section(&source[found.end()..])?;
        return Ok(RegionFile {
            format: RegionFormat::DegreesArray,
            vertices,
        });
    }

    let mut vertices = Vec::new();
    for captures in CONSTRUCTOR.captures_iter(source) {
        let x = parse_number(&captures[1])?;
        let y = parse_number(&captures[2])?;
        let z = parse_number(&captures[3])?;
        vertices.push(Point3::new(x, y, z));
    }
    if vertices.is_empty() {
        return Err(IoError::InvalidRegion(
            "未找到坐标构造表达式或 Degrees Array 段落".to_string(),
        ));
    }
    Ok(RegionFile {
        format: RegionFormat::Constructors,
        vertices,
    })
}

fn parse_degrees_section(section: &str) -> Result<Vec<Point3>, IoError> {
    let body = match BLANK_LINE.find(section) {
        Some(end) => &section[..end.start()],
        None => section,
    };

    let values = NUMBER_TOKEN
        .find_iter(body)
        .map(|m| parse_number(m.as_str()))
        .collect::<Result<Vec<_>, _>>()?;
    if values.is_empty() {
        return Err(IoError::InvalidRegion("Degrees Array 段落为空".to_string()));
    }
    if values.len() % 2 != 0 {
        return Err(IoError::InvalidRegion(format!(
            "Degrees Array 需要成对的经纬度，实际 {} 个数值",
            values.len()
        )));
    }

    values
        .chunks_exact(2)
        .map(|pair| {
            let (lon, lat) = (pair[0], pair[1]);
            if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
                return Err(IoError::InvalidRegion(format!(
                    "经纬度超出范围: ({lon}, {lat})"
                )));
            }
            Ok(Cartographic::from_degrees(lon, lat, 0.0).to_cartesian())
        })
        .collect()
}

fn parse_number(raw: &str) -> Result<f64, IoError> {
    raw.parse::<f64>()
        .map_err(|_| IoError::InvalidRegion(format!("无法解析数值: {raw}")))
}

/// 按构造表达式写法输出，每行一个顶点。
pub fn render_region(polygon: &Polygon) -> String {
    polygon
        .positions()
        .iter()
        .map(|point| format!("Cartesian3({:?}, {:?}, {:?})\n", point.x(), point.y(), point.z()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_triples_in_document_order() {
        let source = "var region = [\n  new Cesium.Cartesian3(-2694045.42, -4297224.56, 3854927.77),\n  new Cesium.Cartesian3(-2694050.1, -4297221.0, 3854927.5),\n  Cartesian3(1e3, -2.5E2, .5)\n];";
        let region = parse_region(source).unwrap();
        assert_eq!(region.format, RegionFormat::Constructors);
        assert_eq!(region.vertices.len(), 3);
        assert_eq!(region.vertices[0], Point3::new(-2694045.42, -4297224.56, 3854927.77));
        assert_eq!(region.vertices[2], Point3::new(1000.0, -250.0, 0.5));
    }

    #[test]
    fn degrees_array_pairs_become_surface_points() {
        let source = "name: plaza\nDegrees Array:\n116.39, 39.90, 116.40, 39.90\n116.40 39.91\n\ntrailing 1 2 3";
        let region = parse_region(source).unwrap();
        assert_eq!(region.format, RegionFormat::DegreesArray);
        assert_eq!(region.vertices.len(), 3);
        let first = Cartographic::from_cartesian(region.vertices[0]);
        assert!((first.longitude.to_degrees() - 116.39).abs() < 1e-9);
        assert!((first.latitude.to_degrees() - 39.90).abs() < 1e-9);
        assert!(first.height.abs() < 1e-3);
    }

    #[test]
    fn digits_in_label_qualifier_are_not_coordinates() {
        let source = "Degrees Array (WGS84):\n121.47, 31.23, 121.48, 31.23, 121.48, 31.24\n";
        let region = parse_region(source).unwrap();
        assert_eq!(region.format, RegionFormat::DegreesArray);
        assert_eq!(region.vertices.len(), 3);
        let first = Cartographic::from_cartesian(region.vertices[0]);
        assert!((first.longitude.to_degrees() - 121.47).abs() < 1e-9);

        let numeric_arguments = "fromDegreesArray(-75.0, 40.0, -75.1, 40.0, -75.1, 40.1)";
        assert_eq!(parse_region(numeric_arguments).unwrap().vertices.len(), 3);
    }

    #[test]
    fn inline_degrees_array_call_is_recognised() {
        let source = "Cartesian3.fromDegreesArray([-75.0, 40.0, -75.1, 40.0, -75.1, 40.1])";
        let region = parse_region(source).unwrap();
        assert_eq!(region.format, RegionFormat::DegreesArray);
        assert_eq!(region.vertices.len(), 3);
    }

    #[test]
    fn odd_or_out_of_range_degrees_are_rejected() {
        assert!(matches!(
            parse_region("Degrees Array: 10, 20, 30"),
            Err(IoError::InvalidRegion(_))
        ));
        assert!(matches!(
            parse_region("Degrees Array: 10, 95, 11, 20"),
            Err(IoError::InvalidRegion(_))
        ));
        assert!(matches!(parse_region("nothing here"), Err(IoError::InvalidRegion(_))));
    }

    #[test]
    fn closing_duplicate_is_dropped_when_building_polygon() {
        let source = "Degrees Array\n0.0, 0.0, 0.001, 0.0, 0.001, 0.001, 0.0, 0.0";
        let polygon = parse_region(source).unwrap().into_polygon(1e-6).unwrap();
        assert_eq!(polygon.len(), 3);

        let too_small = parse_region("Degrees Array 0 0 1 1 0 0").unwrap();
        assert!(too_small.into_polygon(1e-6).is_err());
    }

    #[test]
    fn rendered_region_parses_back_to_the_same_vertices() {
        let source = "P(1.5, 2.25, -3.125)\nP(6378137.000000001, 0.1, 0.2)\nP(4, 5, 6)";
        let polygon = parse_region(source).unwrap().into_polygon(1e-6).unwrap();
        let reparsed = parse_region(&render_region(&polygon)).unwrap();
        assert_eq!(reparsed.vertices, polygon.positions());
    }
}
