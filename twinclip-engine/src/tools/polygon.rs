use twinclip_core::geometry::Point3;
use twinclip_core::polygon::{Polygon, area_and_winding_with, close_ring};
use twinclip_core::selection::SelectionResult;

use crate::errors::EngineError;
use crate::scene::{SceneEngine, ScreenPoint, TargetId, pick_on_target};
use crate::settings::EngineSettings;
use crate::tools::{Feedback, ToolStrategy};

/// 闭合整理后生成选区，并按配置检查跨度。
fn finalize_polygon(
    points: &[Point3],
    settings: &EngineSettings,
) -> Result<SelectionResult, EngineError> {
    let polygon = Polygon::from_ring(points.iter().copied(), settings.closure_epsilon)
        .ok_or_else(|| EngineError::InsufficientVertices {
            found: close_ring(points.iter().copied(), settings.closure_epsilon).len(),
            required: 3,
        })?;

    if let Some(limit_m) = settings.max_polygon_extent_m {
        let extent_m = polygon_extent(polygon.positions());
        if extent_m > limit_m {
            return Err(EngineError::PolygonTooLarge { extent_m, limit_m });
        }
    }

    Ok(SelectionResult::from_polygon(
        polygon,
        settings.degenerate_area_epsilon,
    ))
}

/// 顶点两两之间的最大距离。
fn polygon_extent(points: &[Point3]) -> f64 {
    let mut extent: f64 = 0.0;
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            extent = extent.max(a.distance(*b));
        }
    }
    extent
}

fn polygon_feedback(points: &[Point3], settings: &EngineSettings) -> Feedback {
    let area_m2 = if points.len() >= 3 {
        Some(area_and_winding_with(points, settings.degenerate_area_epsilon).area_m2)
    } else {
        None
    };
    Feedback::Polygon {
        vertices: points.len(),
        area_m2,
    }
}

fn accepts(accepted: &[Point3], candidate: Point3, epsilon: f64) -> bool {
    accepted
        .last()
        .is_none_or(|last| !last.approx_eq(candidate, epsilon))
}

/// 在地表（瓦片数据集）上绘制多边形选区。
#[derive(Debug, Clone)]
pub struct PolygonSelectStrategy {
    settings: EngineSettings,
}

impl PolygonSelectStrategy {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }
}

impl ToolStrategy for PolygonSelectStrategy {
    type Output = SelectionResult;

    fn name(&self) -> &'static str {
        "polygon_select"
    }

    fn pick(&self, scene: &mut dyn SceneEngine, screen: ScreenPoint) -> Option<Point3> {
        scene.pick_surface_position(screen)
    }

    fn validate_pick(&self, accepted: &[Point3], candidate: Point3) -> bool {
        accepts(accepted, candidate, self.settings.closure_epsilon)
    }

    fn on_vertex(&mut self, points: &[Point3]) -> Feedback {
        polygon_feedback(points, &self.settings)
    }

    fn finalize(&self, points: &[Point3]) -> Result<Self::Output, EngineError> {
        finalize_polygon(points, &self.settings)
    }

    fn reset(&mut self) {}
}

/// 在单个模型表面绘制多边形选区，拾取落空时退化为包围球求交。
#[derive(Debug, Clone)]
pub struct ModelSurfaceStrategy {
    target: TargetId,
    settings: EngineSettings,
}

impl ModelSurfaceStrategy {
    pub fn new(target: TargetId, settings: EngineSettings) -> Self {
        Self { target, settings }
    }

    #[inline]
    pub fn target(&self) -> &TargetId {
        &self.target
    }
}

impl ToolStrategy for ModelSurfaceStrategy {
    type Output = SelectionResult;

    fn name(&self) -> &'static str {
        "model_surface_select"
    }

    fn pick(&self, scene: &mut dyn SceneEngine, screen: ScreenPoint) -> Option<Point3> {
        pick_on_target(scene, &self.target, screen)
    }

    fn validate_pick(&self, accepted: &[Point3], candidate: Point3) -> bool {
        accepts(accepted, candidate, self.settings.closure_epsilon)
    }

    fn on_vertex(&mut self, points: &[Point3]) -> Feedback {
        polygon_feedback(points, &self.settings)
    }

    fn finalize(&self, points: &[Point3]) -> Result<Self::Output, EngineError> {
        finalize_polygon(points, &self.settings)
    }

    fn reset(&mut self) {}
}
