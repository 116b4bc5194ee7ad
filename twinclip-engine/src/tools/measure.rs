use twinclip_core::geodesic::GeodesicSolver;
use twinclip_core::geometry::Point3;
use twinclip_core::polygon::area_and_winding_with;

use crate::errors::EngineError;
use crate::scene::{SceneEngine, ScreenPoint};
use crate::settings::EngineSettings;
use crate::tools::{Feedback, ToolStrategy};

/// 多段测量会话。每加一个点只计算最后一段的测地线距离，总长为各段之和。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeasurementSession {
    points: Vec<Point3>,
    segments: Vec<f64>,
    total_distance: f64,
    area_m2: Option<f64>,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加顶点并返回新增段长度（首点返回 `None`）。面积在 ≥3 点后按整环重算。
    pub fn add_point(
        &mut self,
        point: Point3,
        solver: &GeodesicSolver,
        area_epsilon: f64,
    ) -> Option<f64> {
        let segment = self.points.last().map(|previous| solver.distance(*previous, point));
        self.points.push(point);
        if let Some(distance) = segment {
            self.segments.push(distance);
            self.total_distance += distance;
        }
        self.area_m2 = if self.points.len() >= 3 {
            Some(area_and_winding_with(&self.points, area_epsilon).area_m2)
        } else {
            None
        };
        segment
    }

    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[inline]
    pub fn segments(&self) -> &[f64] {
        &self.segments
    }

    #[inline]
    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    #[inline]
    pub fn area_m2(&self) -> Option<f64> {
        self.area_m2
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.segments.clear();
        self.total_distance = 0.0;
        self.area_m2 = None;
    }
}

/// 地表距离/面积测量。两个点即可完成（仅有距离），三个点以上同时给出面积。
#[derive(Debug, Clone)]
pub struct MeasureStrategy {
    session: MeasurementSession,
    solver: GeodesicSolver,
    settings: EngineSettings,
}

impl MeasureStrategy {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            session: MeasurementSession::new(),
            solver: GeodesicSolver::default(),
            settings,
        }
    }

    #[inline]
    pub fn session(&self) -> &MeasurementSession {
        &self.session
    }
}

impl ToolStrategy for MeasureStrategy {
    type Output = MeasurementSession;

    fn name(&self) -> &'static str {
        "measure"
    }

    fn min_points(&self) -> usize {
        2
    }

    fn pick(&self, scene: &mut dyn SceneEngine, screen: ScreenPoint) -> Option<Point3> {
        scene.pick_surface_position(screen)
    }

    fn validate_pick(&self, accepted: &[Point3], candidate: Point3) -> bool {
        accepted
            .last()
            .is_none_or(|last| !last.approx_eq(candidate, self.settings.closure_epsilon))
    }

    fn on_vertex(&mut self, points: &[Point3]) -> Feedback {
        let last_segment = match points.last() {
            Some(point) => self.session.add_point(
                *point,
                &self.solver,
                self.settings.degenerate_area_epsilon,
            ),
            None => None,
        };
        Feedback::Measure {
            last_segment,
            total_distance: self.session.total_distance(),
            area_m2: self.session.area_m2(),
        }
    }

    fn finalize(&self, points: &[Point3]) -> Result<Self::Output, EngineError> {
        if points.len() < self.min_points() {
            return Err(EngineError::InsufficientVertices {
                found: points.len(),
                required: self.min_points(),
            });
        }
        Ok(self.session.clone())
    }

    fn reset(&mut self) {
        self.session.clear();
    }
}
