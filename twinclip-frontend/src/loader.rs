use std::env;
use std::path::{Path, PathBuf};

use glam::DVec3;
use tracing::{info, warn};
use twinclip_config::AppConfig;
use twinclip_core::geodesy::{Cartographic, EnuFrame};
use twinclip_core::polygon::Polygon;
use twinclip_engine::settings::{BoxDefaults, EngineSettings};
use twinclip_io::{IoError, RegionFacade};

/// 指定区域文件路径的环境变量。
pub const REGION_ENV_VAR: &str = "TWINCLIP_REGION_FILE";

/// 区域来源，便于前端呈现加载信息。
#[derive(Debug, Clone, PartialEq)]
pub enum RegionSource {
    File(PathBuf),
    Demo,
}

#[derive(Debug, Clone)]
pub struct LoadedRegion {
    pub polygon: Polygon,
    pub source: RegionSource,
}

/// 依次尝试显式路径、环境变量 `TWINCLIP_REGION_FILE`、配置中的 `region_file`，
/// 全部失败则回退到内置示例区域。
pub fn load_region_from_env_or_demo(
    config: &AppConfig,
    explicit: Option<&Path>,
) -> Result<LoadedRegion, IoError> {
    let closure_epsilon = config.tolerances.closure_epsilon;
    let candidates = explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(env::var_os(REGION_ENV_VAR).map(PathBuf::from))
        .chain(config.frontend.region_file.clone());

    let loader = RegionFacade::new();
    for path in candidates {
        match loader.load_polygon(&path, closure_epsilon) {
            Ok(polygon) => {
                info!(path = %path.display(), vertices = polygon.len(), "从区域文件加载成功");
                return Ok(LoadedRegion {
                    polygon,
                    source: RegionSource::File(path),
                });
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "加载区域文件失败，尝试下一个来源");
            }
        }
    }

    Ok(LoadedRegion {
        polygon: demo_region()?,
        source: RegionSource::Demo,
    })
}

/// 内置示例：以顺时针顺序绘制的 L 形地块（非凸），外接 40m x 30m。
pub fn demo_region() -> Result<Polygon, IoError> {
    let anchor = Cartographic::from_degrees(121.4737, 31.2304, 4.0).to_cartesian();
    let frame = EnuFrame::at(anchor);
    let ring = [
        (0.0, 0.0),
        (0.0, 30.0),
        (15.0, 30.0),
        (15.0, 12.0),
        (40.0, 12.0),
        (40.0, 0.0),
    ]
    .map(|(x, y)| frame.to_global(DVec3::new(x, y, 0.0)));
    Polygon::from_ring(ring, 1e-6)
        .ok_or_else(|| IoError::InvalidRegion("示例区域顶点不足".to_string()))
}

/// 把应用配置转换成引擎参数。
pub fn engine_settings(config: &AppConfig) -> EngineSettings {
    let tolerances = &config.tolerances;
    let boxes = &config.box_defaults;
    EngineSettings {
        closure_epsilon: tolerances.closure_epsilon,
        degenerate_area_epsilon: tolerances.degenerate_area_epsilon,
        min_edge_length: tolerances.min_edge_length,
        max_polygon_extent_m: tolerances.max_polygon_extent_m,
        box_defaults: BoxDefaults {
            width: boxes.width,
            depth: boxes.depth,
            height: boxes.height,
            step: boxes.step,
            rotation_step_deg: boxes.rotation_step_deg,
        },
    }
}
