use std::path::PathBuf;

use twinclip_core::geodesy::EnuFrame;
use twinclip_io::{IoError, RegionFacade, RegionFormat, RegionLoader, RegionSaver};

fn fixture(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests/data");
    path.push(name);
    path
}

#[test]
fn constructor_fixture_loads_as_square() {
    let loader = RegionFacade::new();
    let region = loader.load(&fixture("ctor_region.txt")).expect("读取区域文件失败");
    assert_eq!(region.format, RegionFormat::Constructors);
    assert_eq!(region.vertices.len(), 5);

    let polygon = region.into_polygon(1e-6).expect("整理后应为四边形");
    assert_eq!(polygon.len(), 4);
    let metrics = polygon.metrics();
    assert!((metrics.area_m2 - 400.0).abs() < 1e-2);
    assert!(metrics.is_ccw);

    let frame = EnuFrame::at(polygon.first());
    let centroid = frame.to_local(metrics.centroid.expect("centroid"));
    assert!((centroid.x - 10.0).abs() < 1e-3);
    assert!((centroid.y - 10.0).abs() < 1e-3);
}

#[test]
fn degrees_fixture_ignores_trailing_notes() {
    let loader = RegionFacade::new();
    let polygon = loader
        .load_polygon(&fixture("degrees_region.txt"), 1e-6)
        .expect("读取经纬度区域失败");
    assert_eq!(polygon.len(), 4);
    let area = polygon.metrics().area_m2;
    assert!(area > 15_000.0 && area < 17_000.0, "area = {area}");
}

#[test]
fn missing_file_reports_path() {
    let loader = RegionFacade::new();
    let err = loader.load(&fixture("does_not_exist.txt")).unwrap_err();
    match err {
        IoError::ReadError { path, .. } => assert!(path.ends_with("does_not_exist.txt")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn saved_region_loads_back_unchanged() {
    let facade = RegionFacade::new();
    let polygon = facade
        .load_polygon(&fixture("ctor_region.txt"), 1e-6)
        .expect("fixture polygon");

    let dir = tempfile::tempdir().expect("临时目录");
    let path = dir.path().join("saved_region.txt");
    facade.save(&polygon, &path).expect("写出区域文件");

    let reloaded = facade.load_polygon(&path, 1e-6).expect("读回区域文件");
    assert_eq!(reloaded, polygon);
}

#[test]
fn too_few_vertices_is_invalid() {
    let dir = tempfile::tempdir().expect("临时目录");
    let path = dir.path().join("line.txt");
    std::fs::write(&path, "P(1, 2, 3)\nP(4, 5, 6)\nP(1, 2, 3)\n").expect("写入");
    let err = RegionFacade::new().load_polygon(&path, 1e-6).unwrap_err();
    assert!(matches!(err, IoError::InvalidRegion(_)));
}

#[test]
fn label_qualifier_digits_are_not_read_as_coordinates() {
    let loader = RegionFacade::new();
    let region = loader
        .load(&fixture("labelled_degrees_region.txt"))
        .expect("读取带说明标签的区域失败");
    assert_eq!(region.format, RegionFormat::DegreesArray);
    assert_eq!(region.vertices.len(), 4);

    let expected = loader
        .load_polygon(&fixture("degrees_region.txt"), 1e-6)
        .expect("读取经纬度区域失败");
    let polygon = region.into_polygon(1e-6).expect("整理后应为四边形");
    assert_eq!(polygon, expected);
}
