pub mod command;
pub mod headless;
pub mod history;
pub mod scene;
pub mod tools;
pub mod workspace;

pub mod errors {
    use thiserror::Error;
    use twinclip_core::errors::GeometryError;

    #[derive(Debug, Clone, PartialEq, Error)]
    pub enum EngineError {
        #[error("顶点不足：当前 {found} 个，至少需要 {required} 个")]
        InsufficientVertices { found: usize, required: usize },
        #[error("多边形退化，没有可用的裁剪区域")]
        DegeneratePolygon,
        #[error("没有可撤销的裁剪")]
        NothingToUndo,
        #[error("多边形跨度 {extent_m:.1} 米超过上限 {limit_m:.1} 米")]
        PolygonTooLarge { extent_m: f64, limit_m: f64 },
        #[error("模型 {0} 的变换矩阵不可逆")]
        SingularTransform(String),
        #[error("未知的裁剪目标: {0}")]
        UnknownTarget(String),
        #[error("目标 {0} 不支持该裁剪方式")]
        TargetKindMismatch(String),
        #[error("当前没有激活的工具")]
        ToolInactive,
        #[error("当前没有可用的选区")]
        NoSelection,
        #[error("参数无效: {0}")]
        InvalidArgument(String),
        #[error(transparent)]
        Geometry(#[from] GeometryError),
    }
}

pub mod settings {
    use twinclip_core::clipping::{DEFAULT_MIN_EDGE_LENGTH, PlaneBuildOptions};
    use twinclip_core::polygon::{DEFAULT_CLOSURE_EPSILON, DEFAULT_DEGENERATE_AREA_EPSILON};

    /// 盒体选区的初始尺寸与键盘步进。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct BoxDefaults {
        pub width: f64,
        pub depth: f64,
        pub height: f64,
        pub step: f64,
        pub rotation_step_deg: f64,
    }

    impl Default for BoxDefaults {
        fn default() -> Self {
            Self {
                width: 10.0,
                depth: 10.0,
                height: 10.0,
                step: 1.0,
                rotation_step_deg: 5.0,
            }
        }
    }

    /// 引擎运行参数，由前端从应用配置转换而来。
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct EngineSettings {
        pub closure_epsilon: f64,
        pub degenerate_area_epsilon: f64,
        pub min_edge_length: f64,
        /// 未设置时不限制多边形跨度（ENU 平面近似在大范围内误差增大）。
        pub max_polygon_extent_m: Option<f64>,
        pub box_defaults: BoxDefaults,
    }

    impl EngineSettings {
        pub fn plane_options(&self) -> PlaneBuildOptions {
            PlaneBuildOptions {
                min_edge_length: self.min_edge_length,
                degenerate_area_epsilon: self.degenerate_area_epsilon,
            }
        }
    }

    impl Default for EngineSettings {
        fn default() -> Self {
            Self {
                closure_epsilon: DEFAULT_CLOSURE_EPSILON,
                degenerate_area_epsilon: DEFAULT_DEGENERATE_AREA_EPSILON,
                min_edge_length: DEFAULT_MIN_EDGE_LENGTH,
                max_polygon_extent_m: None,
                box_defaults: BoxDefaults::default(),
            }
        }
    }
}
