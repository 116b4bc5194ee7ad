//! 工具会话与裁剪目标的统一入口。
//!
//! 同一时刻只有一个工具处于激活状态；切换工具前先同步清除上一个工具绘制的全部实体。
//! 每个裁剪目标各自持有一个撤销栈。

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, info, warn};
use twinclip_core::clipping::{
    ClipMode, ClipPolygon, ModelTransform, PlaneSet, as_clip_polygon, build_planes_with,
};
use twinclip_core::geometry::Point3;
use twinclip_core::selection::SelectionResult;

use crate::errors::EngineError;
use crate::history::{ClipController, HistoryEntry};
use crate::scene::{SceneEngine, TargetId};
use crate::settings::EngineSettings;
use crate::tools::{
    BoxAdjustment, BoxSelectTool, InteractionTool, MeasureStrategy, MeasurementSession,
    ModelSurfaceStrategy, PolygonSelectStrategy, ToolEvent, ToolOutcome,
};

/// 可激活的工具种类。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolKind {
    Measure,
    PolygonSelect,
    SurfaceSelect(TargetId),
    BoxSelect,
}

impl ToolKind {
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::Measure => "measure",
            ToolKind::PolygonSelect => "polygon_select",
            ToolKind::SurfaceSelect(_) => "model_surface_select",
            ToolKind::BoxSelect => "box_select",
        }
    }
}

/// 工具完成后的产物。
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Measurement(MeasurementSession),
    Selection(SelectionResult),
}

#[derive(Debug)]
enum ActiveTool {
    Measure(InteractionTool<MeasureStrategy>),
    Polygon(InteractionTool<PolygonSelectStrategy>),
    Surface(InteractionTool<ModelSurfaceStrategy>),
    Box(BoxSelectTool),
}

impl ActiveTool {
    fn deactivate(&mut self, scene: &mut dyn SceneEngine) {
        match self {
            ActiveTool::Measure(tool) => tool.deactivate(scene),
            ActiveTool::Polygon(tool) => tool.deactivate(scene),
            ActiveTool::Surface(tool) => tool.deactivate(scene),
            ActiveTool::Box(tool) => tool.reset(scene),
        }
    }

    fn handle_event(&mut self, scene: &mut dyn SceneEngine, event: ToolEvent) -> ToolOutcome<ToolResult> {
        match self {
            ActiveTool::Measure(tool) => tool.handle_event(scene, event).map(ToolResult::Measurement),
            ActiveTool::Polygon(tool) => tool.handle_event(scene, event).map(ToolResult::Selection),
            ActiveTool::Surface(tool) => tool.handle_event(scene, event).map(ToolResult::Selection),
            ActiveTool::Box(tool) => tool.handle_event(scene, event).map(ToolResult::Selection),
        }
    }

    fn add_point(&mut self, scene: &mut dyn SceneEngine, point: Point3) -> ToolOutcome<ToolResult> {
        match self {
            ActiveTool::Measure(tool) => tool.add_point(scene, point).map(ToolResult::Measurement),
            ActiveTool::Polygon(tool) => tool.add_point(scene, point).map(ToolResult::Selection),
            ActiveTool::Surface(tool) => tool.add_point(scene, point).map(ToolResult::Selection),
            ActiveTool::Box(_) => ToolOutcome::Unhandled,
        }
    }

    fn finish(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<ToolResult> {
        match self {
            ActiveTool::Measure(tool) => tool.finish(scene).map(ToolResult::Measurement),
            ActiveTool::Polygon(tool) => tool.finish(scene).map(ToolResult::Selection),
            ActiveTool::Surface(tool) => tool.finish(scene).map(ToolResult::Selection),
            ActiveTool::Box(tool) => tool.finish(scene).map(ToolResult::Selection),
        }
    }

    fn cancel(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<ToolResult> {
        match self {
            ActiveTool::Measure(tool) => tool.cancel(scene).map(ToolResult::Measurement),
            ActiveTool::Polygon(tool) => tool.cancel(scene).map(ToolResult::Selection),
            ActiveTool::Surface(tool) => tool.cancel(scene).map(ToolResult::Selection),
            ActiveTool::Box(tool) => tool.cancel(scene).map(ToolResult::Selection),
        }
    }

    fn drawn_len(&self) -> usize {
        match self {
            ActiveTool::Measure(tool) => tool.drawn_len(),
            ActiveTool::Polygon(tool) => tool.drawn_len(),
            ActiveTool::Surface(tool) => tool.drawn_len(),
            ActiveTool::Box(tool) => tool.drawn_len(),
        }
    }
}

/// 裁剪目标种类：瓦片数据集走原生多边形裁剪，模型走平面集合裁剪。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Tileset,
    Model,
}

impl TargetKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetKind::Tileset => "tileset",
            TargetKind::Model => "model",
        }
    }
}

#[derive(Debug)]
enum ClipTarget {
    Tileset(ClipController<ClipPolygon>),
    Model {
        transform: ModelTransform,
        controller: ClipController<PlaneSet>,
    },
}

impl ClipTarget {
    fn kind(&self) -> TargetKind {
        match self {
            ClipTarget::Tileset(_) => TargetKind::Tileset,
            ClipTarget::Model { .. } => TargetKind::Model,
        }
    }

    fn status(&self, target: &TargetId) -> ClipStatus {
        let (clipped, mode, history_len) = match self {
            ClipTarget::Tileset(controller) => summarize(controller),
            ClipTarget::Model { controller, .. } => summarize(controller),
        };
        ClipStatus {
            target: target.clone(),
            kind: self.kind(),
            clipped,
            mode,
            history_len,
        }
    }

    /// 把当前条目同步到场景。
    fn push_to_scene(&self, scene: &mut dyn SceneEngine, target: &TargetId) {
        match self {
            ClipTarget::Tileset(controller) => {
                let HistoryEntry { clip, mode } = controller.current();
                scene.apply_clip_polygon(target, clip.as_ref(), *mode);
            }
            ClipTarget::Model { controller, .. } => {
                let HistoryEntry { clip, mode } = controller.current();
                scene.apply_clip_planes(target, clip.as_ref(), *mode);
            }
        }
    }
}

fn summarize<T>(controller: &ClipController<T>) -> (bool, Option<ClipMode>, usize) {
    let current = controller.current();
    (current.is_clipped(), current.mode, controller.history().len())
}

/// 目标当前的裁剪状态摘要。
#[derive(Debug, Clone, PartialEq)]
pub struct ClipStatus {
    pub target: TargetId,
    pub kind: TargetKind,
    pub clipped: bool,
    pub mode: Option<ClipMode>,
    pub history_len: usize,
}

impl fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(mode) if self.clipped => write!(
                f,
                "{} ({}) 已裁剪 [{}]，可撤销 {} 步",
                self.target,
                self.kind.as_str(),
                mode.as_str(),
                self.history_len
            ),
            _ => write!(
                f,
                "{} ({}) 未裁剪，可撤销 {} 步",
                self.target,
                self.kind.as_str(),
                self.history_len
            ),
        }
    }
}

#[derive(Debug)]
pub struct Workspace {
    settings: EngineSettings,
    active: Option<ActiveTool>,
    active_kind: Option<ToolKind>,
    targets: BTreeMap<TargetId, ClipTarget>,
    last_selection: Option<SelectionResult>,
    last_measurement: Option<MeasurementSession>,
}

impl Workspace {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            active: None,
            active_kind: None,
            targets: BTreeMap::new(),
            last_selection: None,
            last_measurement: None,
        }
    }

    #[inline]
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn register_tileset(&mut self, id: TargetId) {
        debug!(target = %id, "注册瓦片数据集");
        self.targets.insert(id, ClipTarget::Tileset(ClipController::new()));
    }

    pub fn register_model(&mut self, id: TargetId, transform: ModelTransform) {
        debug!(target = %id, "注册模型");
        self.targets.insert(
            id,
            ClipTarget::Model {
                transform,
                controller: ClipController::new(),
            },
        );
    }

    pub fn target_kind(&self, id: &TargetId) -> Option<TargetKind> {
        self.targets.get(id).map(ClipTarget::kind)
    }

    pub fn targets(&self) -> impl Iterator<Item = (&TargetId, TargetKind)> {
        self.targets.iter().map(|(id, target)| (id, target.kind()))
    }

    #[inline]
    pub fn active_tool(&self) -> Option<&ToolKind> {
        self.active_kind.as_ref()
    }

    /// 当前工具绘制的实体数量。
    pub fn drawn_len(&self) -> usize {
        self.active.as_ref().map(ActiveTool::drawn_len).unwrap_or(0)
    }

    #[inline]
    pub fn last_selection(&self) -> Option<&SelectionResult> {
        self.last_selection.as_ref()
    }

    #[inline]
    pub fn last_measurement(&self) -> Option<&MeasurementSession> {
        self.last_measurement.as_ref()
    }

    /// 激活工具。先停用并清理上一个工具，再从 `Inactive` 重新进入采集。
    pub fn activate_tool(
        &mut self,
        scene: &mut dyn SceneEngine,
        kind: ToolKind,
    ) -> Result<(), EngineError> {
        if let ToolKind::SurfaceSelect(target) = &kind {
            match self.target_kind(target) {
                Some(TargetKind::Model) => {}
                Some(TargetKind::Tileset) => {
                    return Err(EngineError::TargetKindMismatch(target.to_string()));
                }
                None => return Err(EngineError::UnknownTarget(target.to_string())),
            }
        }
        self.deactivate_tool(scene);

        let settings = self.settings;
        let tool = match &kind {
            ToolKind::Measure => {
                let mut tool = InteractionTool::new(MeasureStrategy::new(settings));
                tool.activate(scene);
                ActiveTool::Measure(tool)
            }
            ToolKind::PolygonSelect => {
                let mut tool = InteractionTool::new(PolygonSelectStrategy::new(settings));
                tool.activate(scene);
                ActiveTool::Polygon(tool)
            }
            ToolKind::SurfaceSelect(target) => {
                let mut tool =
                    InteractionTool::new(ModelSurfaceStrategy::new(target.clone(), settings));
                tool.activate(scene);
                ActiveTool::Surface(tool)
            }
            ToolKind::BoxSelect => ActiveTool::Box(BoxSelectTool::new(settings.box_defaults)),
        };
        info!(tool = kind.name(), "工具已切换");
        self.active = Some(tool);
        self.active_kind = Some(kind);
        Ok(())
    }

    /// 停用当前工具并同步移除它绘制的全部实体。没有激活工具时什么也不做。
    pub fn deactivate_tool(&mut self, scene: &mut dyn SceneEngine) {
        if let Some(mut tool) = self.active.take() {
            tool.deactivate(scene);
            if let Some(kind) = self.active_kind.take() {
                debug!(tool = kind.name(), "工具已停用");
            }
        }
    }

    pub fn handle_event(
        &mut self,
        scene: &mut dyn SceneEngine,
        event: ToolEvent,
    ) -> ToolOutcome<ToolResult> {
        let Some(tool) = self.active.as_mut() else {
            return ToolOutcome::NotActive;
        };
        let outcome = tool.handle_event(scene, event);
        self.record(&outcome);
        outcome
    }

    /// 直接追加一个全局坐标顶点（区域文件回放等非拾取来源）。
    pub fn feed_vertex(&mut self, scene: &mut dyn SceneEngine, point: Point3) -> ToolOutcome<ToolResult> {
        match self.active.as_mut() {
            Some(tool) => tool.add_point(scene, point),
            None => ToolOutcome::NotActive,
        }
    }

    pub fn finish_tool(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<ToolResult> {
        let Some(tool) = self.active.as_mut() else {
            return ToolOutcome::NotActive;
        };
        let outcome = tool.finish(scene);
        self.record(&outcome);
        outcome
    }

    pub fn cancel_tool(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<ToolResult> {
        match self.active.as_mut() {
            Some(tool) => tool.cancel(scene),
            None => ToolOutcome::NotActive,
        }
    }

    /// 调整盒体。当前工具不是盒体选择时返回 `NotActive`。
    pub fn adjust_box(
        &mut self,
        scene: &mut dyn SceneEngine,
        adjustment: BoxAdjustment,
    ) -> ToolOutcome<ToolResult> {
        match self.active.as_mut() {
            Some(ActiveTool::Box(tool)) => tool.adjust(scene, adjustment).map(ToolResult::Selection),
            _ => ToolOutcome::NotActive,
        }
    }

    /// 以持久化区域的顶点重建多边形选区：激活多边形工具、依次喂入顶点并完成。
    pub fn restore_region(
        &mut self,
        scene: &mut dyn SceneEngine,
        positions: &[Point3],
    ) -> Result<ToolOutcome<ToolResult>, EngineError> {
        self.activate_tool(scene, ToolKind::PolygonSelect)?;
        for point in positions {
            self.feed_vertex(scene, *point);
        }
        let outcome = self.finish_tool(scene);
        debug!(vertices = positions.len(), "区域已回放");
        Ok(outcome)
    }

    fn record(&mut self, outcome: &ToolOutcome<ToolResult>) {
        match outcome {
            ToolOutcome::Finalized(ToolResult::Selection(selection)) => {
                info!(
                    vertices = selection.positions.len(),
                    area_m2 = selection.area_m2,
                    "选区已完成"
                );
                self.last_selection = Some(selection.clone());
            }
            ToolOutcome::Finalized(ToolResult::Measurement(session)) => {
                info!(
                    points = session.points().len(),
                    total_m = session.total_distance(),
                    "测量已完成"
                );
                self.last_measurement = Some(session.clone());
            }
            _ => {}
        }
    }

    /// 用最近一次完成的选区裁剪目标。
    pub fn clip_last_selection(
        &mut self,
        scene: &mut dyn SceneEngine,
        target: &TargetId,
        mode: ClipMode,
    ) -> Result<ClipStatus, EngineError> {
        let selection = self.last_selection.clone().ok_or(EngineError::NoSelection)?;
        self.clip_selection(scene, target, &selection, mode)
    }

    /// 由选区生成裁剪图元并应用到目标；应用前的状态压入该目标的撤销栈。
    ///
    /// 模型目标生成平面集合，并换算到模型局部坐标。两类目标遇到退化选区都返回
    /// [`EngineError::DegeneratePolygon`]，不会应用空裁剪，也不会写入历史。
    pub fn clip_selection(
        &mut self,
        scene: &mut dyn SceneEngine,
        target: &TargetId,
        selection: &SelectionResult,
        mode: ClipMode,
    ) -> Result<ClipStatus, EngineError> {
        let options = self.settings.plane_options();
        let slot = self
            .targets
            .get_mut(target)
            .ok_or_else(|| EngineError::UnknownTarget(target.to_string()))?;

        match slot {
            ClipTarget::Tileset(controller) => {
                // 原生多边形裁剪不需要平面，但退化判定与模型一致
                if build_planes_with(selection.positions.positions(), false, &options).is_none() {
                    warn!(target = %target, "选区退化，没有可用的裁剪区域");
                    return Err(EngineError::DegeneratePolygon);
                }
                controller.apply(Some(as_clip_polygon(&selection.positions)), Some(mode));
            }
            ClipTarget::Model {
                transform,
                controller,
            } => {
                let Some(planes) =
                    build_planes_with(selection.positions.positions(), mode.inverts(), &options)
                else {
                    warn!(target = %target, "选区退化，没有可用的裁剪区域");
                    return Err(EngineError::DegeneratePolygon);
                };
                let Some(local) = planes.to_model_space(transform) else {
                    warn!(target = %target, "模型变换矩阵不可逆，无法换算裁剪平面");
                    return Err(EngineError::SingularTransform(target.to_string()));
                };
                controller.apply(Some(local), Some(mode));
            }
        }
        slot.push_to_scene(scene, target);
        let status = slot.status(target);
        info!(target = %target, mode = mode.as_str(), history = status.history_len, "裁剪已应用");
        Ok(status)
    }

    /// 清除目标的裁剪。清除同样会压栈，可以撤销。
    pub fn clear_clip(
        &mut self,
        scene: &mut dyn SceneEngine,
        target: &TargetId,
    ) -> Result<ClipStatus, EngineError> {
        let slot = self
            .targets
            .get_mut(target)
            .ok_or_else(|| EngineError::UnknownTarget(target.to_string()))?;
        match slot {
            ClipTarget::Tileset(controller) => {
                controller.apply(None, None);
            }
            ClipTarget::Model { controller, .. } => {
                controller.apply(None, None);
            }
        }
        slot.push_to_scene(scene, target);
        info!(target = %target, "裁剪已清除");
        Ok(slot.status(target))
    }

    /// 撤销目标最近一次裁剪操作。历史为空时返回 [`EngineError::NothingToUndo`]，不改变场景。
    pub fn undo_clip(
        &mut self,
        scene: &mut dyn SceneEngine,
        target: &TargetId,
    ) -> Result<ClipStatus, EngineError> {
        let slot = self
            .targets
            .get_mut(target)
            .ok_or_else(|| EngineError::UnknownTarget(target.to_string()))?;
        let undone = match slot {
            ClipTarget::Tileset(controller) => controller.undo().is_some(),
            ClipTarget::Model { controller, .. } => controller.undo().is_some(),
        };
        if !undone {
            warn!(target = %target, "没有可撤销的裁剪");
            return Err(EngineError::NothingToUndo);
        }
        slot.push_to_scene(scene, target);
        info!(target = %target, "裁剪已撤销");
        Ok(slot.status(target))
    }

    pub fn clip_status(&self, target: &TargetId) -> Result<ClipStatus, EngineError> {
        self.targets
            .get(target)
            .map(|slot| slot.status(target))
            .ok_or_else(|| EngineError::UnknownTarget(target.to_string()))
    }

    /// 模型目标当前生效的平面集合（模型局部坐标）。
    pub fn model_planes(&self, target: &TargetId) -> Option<&PlaneSet> {
        match self.targets.get(target)? {
            ClipTarget::Model { controller, .. } => controller.current().clip.as_ref(),
            ClipTarget::Tileset(_) => None,
        }
    }

    /// 瓦片数据集当前生效的裁剪多边形。
    pub fn tileset_polygon(&self, target: &TargetId) -> Option<&ClipPolygon> {
        match self.targets.get(target)? {
            ClipTarget::Tileset(controller) => controller.current().clip.as_ref(),
            ClipTarget::Model { .. } => None,
        }
    }
}
