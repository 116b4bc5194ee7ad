use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// 指定配置文件路径的环境变量。
pub const CONFIG_ENV_VAR: &str = "TWINCLIP_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub tolerances: ToleranceConfig,
    #[serde(default)]
    pub box_defaults: BoxDefaultsConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 自动发现配置文件：优先读取环境变量 `TWINCLIP_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }

    /// 容差与盒体尺寸必须为正的有限值。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tolerances;
        let b = &self.box_defaults;
        let checks = [
            ("tolerances.closure_epsilon", t.closure_epsilon),
            ("tolerances.degenerate_area_epsilon", t.degenerate_area_epsilon),
            ("tolerances.min_edge_length", t.min_edge_length),
            ("box_defaults.width", b.width),
            ("box_defaults.depth", b.depth),
            ("box_defaults.height", b.height),
            ("box_defaults.step", b.step),
            ("box_defaults.rotation_step_deg", b.rotation_step_deg),
        ];
        for (key, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid {
                    key,
                    message: format!("必须为正数，当前为 {value}"),
                });
            }
        }
        if let Some(limit) = t.max_polygon_extent_m {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(ConfigError::Invalid {
                    key: "tolerances.max_polygon_extent_m",
                    message: format!("必须为正数，当前为 {limit}"),
                });
            }
        }
        Ok(())
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrontendMode {
    /// 跑一遍完整演示流程并打印报告。
    #[default]
    Cli,
    /// 从标准输入逐行读取命令。
    Repl,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub default_mode: FrontendMode,
    /// 报告中数值保留的小数位数。
    #[serde(default = "FrontendConfig::default_precision")]
    pub report_precision: usize,
    #[serde(default)]
    pub region_file: Option<PathBuf>,
}

impl FrontendConfig {
    fn default_precision() -> usize {
        3
    }
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            default_mode: FrontendMode::default(),
            report_precision: Self::default_precision(),
            region_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    #[serde(default = "ToleranceConfig::default_epsilon")]
    pub closure_epsilon: f64,
    #[serde(default = "ToleranceConfig::default_epsilon")]
    pub degenerate_area_epsilon: f64,
    #[serde(default = "ToleranceConfig::default_epsilon")]
    pub min_edge_length: f64,
    #[serde(default)]
    pub max_polygon_extent_m: Option<f64>,
}

impl ToleranceConfig {
    fn default_epsilon() -> f64 {
        1e-6
    }
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            closure_epsilon: Self::default_epsilon(),
            degenerate_area_epsilon: Self::default_epsilon(),
            min_edge_length: Self::default_epsilon(),
            max_polygon_extent_m: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoxDefaultsConfig {
    #[serde(default = "BoxDefaultsConfig::default_size")]
    pub width: f64,
    #[serde(default = "BoxDefaultsConfig::default_size")]
    pub depth: f64,
    #[serde(default = "BoxDefaultsConfig::default_size")]
    pub height: f64,
    #[serde(default = "BoxDefaultsConfig::default_step")]
    pub step: f64,
    #[serde(default = "BoxDefaultsConfig::default_rotation_step")]
    pub rotation_step_deg: f64,
}

impl BoxDefaultsConfig {
    fn default_size() -> f64 {
        10.0
    }

    fn default_step() -> f64 {
        1.0
    }

    fn default_rotation_step() -> f64 {
        5.0
    }
}

impl Default for BoxDefaultsConfig {
    fn default() -> Self {
        Self {
            width: Self::default_size(),
            depth: Self::default_size(),
            height: Self::default_size(),
            step: Self::default_step(),
            rotation_step_deg: Self::default_rotation_step(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("配置项 {key} 无效: {message}")]
    Invalid { key: &'static str, message: String },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
