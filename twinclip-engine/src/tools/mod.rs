//! 交互工具：拾取事件 → 顶点累积 → 完成或取消。
//!
//! 所有多点工具共享 [`InteractionTool`] 状态机，具体工具只提供一个 [`ToolStrategy`]：
//! 如何拾取、是否接受顶点、如何实时反馈、如何完成。

pub mod box_select;
pub mod measure;
pub mod polygon;

use tracing::{debug, warn};
use twinclip_core::geometry::Point3;

use crate::errors::EngineError;
use crate::scene::{DrawPrimitive, DrawnSet, EntityHandle, SceneEngine, ScreenPoint};

pub use box_select::{BoxAdjustment, BoxSelectTool, BoxToolState};
pub use measure::{MeasureStrategy, MeasurementSession};
pub use polygon::{ModelSurfaceStrategy, PolygonSelectStrategy};

/// 多点工具状态。`Finalized` 不能直接回到 `Collecting`，新的选取必须重新激活。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolState {
    Inactive,
    Collecting,
    Finalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKey {
    Escape,
    Enter,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    PageUp,
    PageDown,
    RotateLeft,
    RotateRight,
}

/// 指针与键盘输入。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToolEvent {
    Click(ScreenPoint),
    DoubleClick(ScreenPoint),
    RightClick,
    Key(ToolKey),
}

/// 每次加点后的实时反馈。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feedback {
    Measure {
        last_segment: Option<f64>,
        total_distance: f64,
        area_m2: Option<f64>,
    },
    Polygon {
        vertices: usize,
        area_m2: Option<f64>,
    },
    Box {
        width: f64,
        depth: f64,
        height: f64,
        rotation_deg: f64,
        area_m2: f64,
    },
}

/// 事件处理结果。拾取落空（`Ignored`）与顶点不足（`Insufficient`）是两种不同的非错误结果：
/// 前者保持静默，后者需要向用户提示。
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome<O> {
    NotActive,
    Ignored,
    Unhandled,
    VertexAdded(Feedback),
    Adjusted(Feedback),
    Insufficient { found: usize, required: usize },
    Rejected(EngineError),
    Cancelled,
    Finalized(O),
}

impl<O> ToolOutcome<O> {
    pub fn map<P>(self, f: impl FnOnce(O) -> P) -> ToolOutcome<P> {
        match self {
            ToolOutcome::NotActive => ToolOutcome::NotActive,
            ToolOutcome::Ignored => ToolOutcome::Ignored,
            ToolOutcome::Unhandled => ToolOutcome::Unhandled,
            ToolOutcome::VertexAdded(feedback) => ToolOutcome::VertexAdded(feedback),
            ToolOutcome::Adjusted(feedback) => ToolOutcome::Adjusted(feedback),
            ToolOutcome::Insufficient { found, required } => {
                ToolOutcome::Insufficient { found, required }
            }
            ToolOutcome::Rejected(err) => ToolOutcome::Rejected(err),
            ToolOutcome::Cancelled => ToolOutcome::Cancelled,
            ToolOutcome::Finalized(output) => ToolOutcome::Finalized(f(output)),
        }
    }

    /// 需要以状态文字告知用户的结果。
    pub fn status_message(&self) -> Option<String> {
        match self {
            ToolOutcome::Insufficient { found, required } => Some(
                EngineError::InsufficientVertices {
                    found: *found,
                    required: *required,
                }
                .to_string(),
            ),
            ToolOutcome::Rejected(err) => Some(err.to_string()),
            _ => None,
        }
    }
}

/// 具体工具的策略：拾取方式、顶点校验、实时反馈与完成逻辑。
pub trait ToolStrategy {
    type Output;

    fn name(&self) -> &'static str;

    fn min_points(&self) -> usize {
        3
    }

    fn pick(&self, scene: &mut dyn SceneEngine, screen: ScreenPoint) -> Option<Point3>;

    /// 返回假时该点被静默丢弃。
    fn validate_pick(&self, accepted: &[Point3], candidate: Point3) -> bool;

    /// `points` 的最后一个元素是刚加入的顶点。
    fn on_vertex(&mut self, points: &[Point3]) -> Feedback;

    fn finalize(&self, points: &[Point3]) -> Result<Self::Output, EngineError>;

    fn reset(&mut self);
}

/// 通用多点交互状态机。
#[derive(Debug)]
pub struct InteractionTool<S: ToolStrategy> {
    strategy: S,
    state: ToolState,
    points: Vec<Point3>,
    drawn: DrawnSet,
    preview: Option<EntityHandle>,
}

impl<S: ToolStrategy> InteractionTool<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            state: ToolState::Inactive,
            points: Vec::new(),
            drawn: DrawnSet::new(),
            preview: None,
        }
    }

    #[inline]
    pub fn state(&self) -> ToolState {
        self.state
    }

    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[inline]
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    #[inline]
    pub fn drawn_len(&self) -> usize {
        self.drawn.len()
    }

    /// 清空上一轮的顶点与绘制内容后进入 `Collecting`。
    pub fn activate(&mut self, scene: &mut dyn SceneEngine) {
        self.reset(scene);
        self.state = ToolState::Collecting;
        debug!(tool = self.strategy.name(), "工具已激活");
    }

    pub fn deactivate(&mut self, scene: &mut dyn SceneEngine) {
        self.reset(scene);
        debug!(tool = self.strategy.name(), "工具已停用");
    }

    fn reset(&mut self, scene: &mut dyn SceneEngine) {
        self.drawn.clear_all(scene);
        self.preview = None;
        self.points.clear();
        self.strategy.reset();
        self.state = ToolState::Inactive;
    }

    pub fn handle_event(
        &mut self,
        scene: &mut dyn SceneEngine,
        event: ToolEvent,
    ) -> ToolOutcome<S::Output> {
        if self.state != ToolState::Collecting {
            return ToolOutcome::NotActive;
        }
        match event {
            ToolEvent::Click(screen) => match self.strategy.pick(scene, screen) {
                Some(point) => self.add_point(scene, point),
                None => {
                    debug!(tool = self.strategy.name(), x = screen.x, y = screen.y, "拾取落空，忽略");
                    ToolOutcome::Ignored
                }
            },
            ToolEvent::DoubleClick(_) | ToolEvent::Key(ToolKey::Enter) => self.finish(scene),
            ToolEvent::RightClick | ToolEvent::Key(ToolKey::Escape) => self.cancel(scene),
            ToolEvent::Key(_) => ToolOutcome::Unhandled,
        }
    }

    /// 追加一个已知的全局坐标点（拾取之外的顶点来源，如持久化区域回放）。
    pub fn add_point(&mut self, scene: &mut dyn SceneEngine, point: Point3) -> ToolOutcome<S::Output> {
        if self.state != ToolState::Collecting {
            return ToolOutcome::NotActive;
        }
        if !self.strategy.validate_pick(&self.points, point) {
            debug!(tool = self.strategy.name(), "顶点未通过校验，忽略");
            return ToolOutcome::Ignored;
        }
        self.points.push(point);
        let feedback = self.strategy.on_vertex(&self.points);
        self.drawn.draw(scene, DrawPrimitive::Marker(point));
        self.redraw_preview(scene, false);
        ToolOutcome::VertexAdded(feedback)
    }

    /// 顶点不足时保持 `Collecting` 并返回 `Insufficient`。
    pub fn finish(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<S::Output> {
        if self.state != ToolState::Collecting {
            return ToolOutcome::NotActive;
        }
        let required = self.strategy.min_points();
        if self.points.len() < required {
            warn!(tool = self.strategy.name(), found = self.points.len(), required, "顶点不足，无法完成");
            return ToolOutcome::Insufficient {
                found: self.points.len(),
                required,
            };
        }
        match self.strategy.finalize(&self.points) {
            Ok(output) => {
                self.state = ToolState::Finalized;
                self.redraw_preview(scene, required >= 3);
                debug!(tool = self.strategy.name(), points = self.points.len(), "工具已完成");
                ToolOutcome::Finalized(output)
            }
            Err(EngineError::InsufficientVertices { found, required }) => {
                warn!(tool = self.strategy.name(), found, required, "整理后顶点不足，无法完成");
                ToolOutcome::Insufficient { found, required }
            }
            Err(err) => {
                warn!(tool = self.strategy.name(), error = %err, "完成失败");
                ToolOutcome::Rejected(err)
            }
        }
    }

    /// 丢弃全部顶点与预览，回到 `Inactive`。
    pub fn cancel(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<S::Output> {
        if self.state != ToolState::Collecting {
            return ToolOutcome::NotActive;
        }
        self.reset(scene);
        debug!(tool = self.strategy.name(), "工具已取消");
        ToolOutcome::Cancelled
    }

    fn redraw_preview(&mut self, scene: &mut dyn SceneEngine, closed: bool) {
        if let Some(handle) = self.preview.take() {
            self.drawn.remove(scene, handle);
        }
        if self.points.len() >= 2 {
            let handle = self.drawn.draw(
                scene,
                DrawPrimitive::Polyline {
                    positions: self.points.clone(),
                    closed,
                },
            );
            self.preview = Some(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use twinclip_core::geodesy::Cartographic;

    use super::*;
    use crate::headless::HeadlessScene;
    use crate::settings::EngineSettings;

    fn scene() -> HeadlessScene {
        HeadlessScene::new(Cartographic::from_degrees(-0.1276, 51.5072, 11.0).to_cartesian(), 200.0)
    }

    fn click(x: f64, y: f64) -> ToolEvent {
        ToolEvent::Click(ScreenPoint::new(x, y))
    }

    #[test]
    fn inactive_tool_ignores_events() {
        let mut scene = scene();
        let mut tool = InteractionTool::new(PolygonSelectStrategy::new(EngineSettings::default()));
        assert_eq!(tool.handle_event(&mut scene, click(0.0, 0.0)), ToolOutcome::NotActive);
        assert!(tool.points().is_empty());
    }

    #[test]
    fn pick_miss_is_silent_and_appends_nothing() {
        let mut scene = scene();
        let mut tool = InteractionTool::new(PolygonSelectStrategy::new(EngineSettings::default()));
        tool.activate(&mut scene);
        let outcome = tool.handle_event(&mut scene, click(999.0, 0.0));
        assert_eq!(outcome, ToolOutcome::Ignored);
        assert!(outcome.status_message().is_none());
        assert!(tool.points().is_empty());
        assert_eq!(tool.state(), ToolState::Collecting);
    }

    #[test]
    fn finish_with_too_few_points_keeps_collecting() {
        let mut scene = scene();
        let mut tool = InteractionTool::new(PolygonSelectStrategy::new(EngineSettings::default()));
        tool.activate(&mut scene);
        tool.handle_event(&mut scene, click(0.0, 0.0));
        tool.handle_event(&mut scene, click(10.0, 0.0));
        let outcome = tool.handle_event(&mut scene, ToolEvent::Key(ToolKey::Enter));
        assert_eq!(
            outcome,
            ToolOutcome::Insufficient {
                found: 2,
                required: 3
            }
        );
        assert!(outcome.status_message().is_some());
        assert_eq!(tool.state(), ToolState::Collecting);
        assert_eq!(tool.points().len(), 2);
    }

    #[test]
    fn finalized_tool_does_not_resume_collecting() {
        let mut scene = scene();
        let mut tool = InteractionTool::new(PolygonSelectStrategy::new(EngineSettings::default()));
        tool.activate(&mut scene);
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)] {
            tool.handle_event(&mut scene, click(x, y));
        }
        let outcome = tool.handle_event(&mut scene, ToolEvent::DoubleClick(ScreenPoint::new(10.0, 10.0)));
        assert!(matches!(outcome, ToolOutcome::Finalized(_)));
        assert_eq!(tool.state(), ToolState::Finalized);
        assert_eq!(tool.handle_event(&mut scene, click(20.0, 20.0)), ToolOutcome::NotActive);
        assert_eq!(tool.points().len(), 3);
    }

    #[test]
    fn cancel_discards_points_and_drawn_entities() {
        let mut scene = scene();
        let mut tool = InteractionTool::new(PolygonSelectStrategy::new(EngineSettings::default()));
        tool.activate(&mut scene);
        tool.handle_event(&mut scene, click(0.0, 0.0));
        tool.handle_event(&mut scene, click(5.0, 0.0));
        assert!(scene.entity_count() > 0);
        assert_eq!(tool.handle_event(&mut scene, ToolEvent::RightClick), ToolOutcome::Cancelled);
        assert_eq!(tool.state(), ToolState::Inactive);
        assert!(tool.points().is_empty());
        assert_eq!(scene.entity_count(), 0);
    }

    #[test]
    fn preview_polyline_is_replaced_not_accumulated() {
        let mut scene = scene();
        let mut tool = InteractionTool::new(PolygonSelectStrategy::new(EngineSettings::default()));
        tool.activate(&mut scene);
        for (x, y) in [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)] {
            tool.handle_event(&mut scene, click(x, y));
        }
        // 4 个点标记 + 1 条预览折线
        assert_eq!(scene.entity_count(), 5);
        tool.deactivate(&mut scene);
        assert_eq!(scene.entity_count(), 0);
    }
}
