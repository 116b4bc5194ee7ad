//! 持久化格式：区域文件读写与裁剪状态的 JSON 编解码。

pub mod codec;
pub mod region;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use twinclip_core::polygon::Polygon;

pub use codec::{
    decode_optional_plane_set, decode_plane_set, decode_polygon, encode_plane_set, encode_polygon,
};
pub use region::{RegionFile, RegionFormat, parse_region, render_region};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("failed to read file {path:?}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write file {path:?}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("区域文件无效: {0}")]
    InvalidRegion(String),
    #[error("裁剪状态无效: {0}")]
    InvalidClipState(String),
    #[error("JSON 编解码失败: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait RegionLoader {
    fn load(&self, path: &Path) -> Result<RegionFile, IoError>;
}

pub trait RegionSaver {
    fn save(&self, polygon: &Polygon, path: &Path) -> Result<(), IoError>;
}

/// 区域文件的读写入口。
#[derive(Debug, Clone, Copy, Default)]
pub struct RegionFacade;

impl RegionFacade {
    pub fn new() -> Self {
        Self
    }

    /// 读取并整理成多边形：去掉重复的闭合尾点，顶点不足三个时报错。
    pub fn load_polygon(&self, path: &Path, closure_epsilon: f64) -> Result<Polygon, IoError> {
        self.load(path)?.into_polygon(closure_epsilon)
    }
}

impl RegionLoader for RegionFacade {
    fn load(&self, path: &Path) -> Result<RegionFile, IoError> {
        let data = fs::read_to_string(path).map_err(|source| IoError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let region = parse_region(&data)?;
        debug!(
            path = %path.display(),
            format = region.format.as_str(),
            vertices = region.vertices.len(),
            "区域文件已读取"
        );
        Ok(region)
    }
}

impl RegionSaver for RegionFacade {
    fn save(&self, polygon: &Polygon, path: &Path) -> Result<(), IoError> {
        fs::write(path, render_region(polygon)).map_err(|source| IoError::WriteError {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), vertices = polygon.len(), "区域文件已写出");
        Ok(())
    }
}
