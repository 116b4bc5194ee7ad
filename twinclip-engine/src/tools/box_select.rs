use tracing::{debug, warn};
use twinclip_core::geometry::Point3;
use twinclip_core::selection::SelectionResult;
use twinclip_core::volume::BoxSelection;

use crate::errors::EngineError;
use crate::scene::{DrawPrimitive, DrawnSet, SceneEngine};
use crate::settings::BoxDefaults;
use crate::tools::{Feedback, ToolEvent, ToolKey, ToolOutcome};

/// 盒体工具状态：首次有效拾取放置中心，之后只能通过显式调整改变盒体，直到调用方完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxToolState {
    Idle,
    CenterPlaced,
    Ready,
}

/// 显式调整盒体的控件输入。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxAdjustment {
    Width(f64),
    Depth(f64),
    Height(f64),
    RotationDeg(f64),
    Step(f64),
}

#[derive(Debug)]
pub struct BoxSelectTool {
    defaults: BoxDefaults,
    state: BoxToolState,
    selection: Option<BoxSelection>,
    drawn: DrawnSet,
}

impl BoxSelectTool {
    pub fn new(defaults: BoxDefaults) -> Self {
        Self {
            defaults,
            state: BoxToolState::Idle,
            selection: None,
            drawn: DrawnSet::new(),
        }
    }

    #[inline]
    pub fn state(&self) -> BoxToolState {
        self.state
    }

    #[inline]
    pub fn selection(&self) -> Option<&BoxSelection> {
        self.selection.as_ref()
    }

    #[inline]
    pub fn drawn_len(&self) -> usize {
        self.drawn.len()
    }

    /// 清除盒体与线框，回到 `Idle`。
    pub fn reset(&mut self, scene: &mut dyn SceneEngine) {
        self.drawn.clear_all(scene);
        self.selection = None;
        self.state = BoxToolState::Idle;
    }

    pub fn handle_event(
        &mut self,
        scene: &mut dyn SceneEngine,
        event: ToolEvent,
    ) -> ToolOutcome<SelectionResult> {
        if self.state == BoxToolState::Ready {
            return ToolOutcome::NotActive;
        }
        match event {
            ToolEvent::Click(screen) => {
                if self.state == BoxToolState::CenterPlaced {
                    // 中心已放置，后续点击不改变盒体
                    return ToolOutcome::Ignored;
                }
                let Some(center) = scene.pick_surface_position(screen) else {
                    debug!(x = screen.x, y = screen.y, "盒体中心拾取落空，忽略");
                    return ToolOutcome::Ignored;
                };
                match self.place_center(center) {
                    Ok(selection) => {
                        self.selection = Some(selection);
                        self.state = BoxToolState::CenterPlaced;
                        self.redraw(scene);
                        debug!("盒体中心已放置");
                        ToolOutcome::VertexAdded(feedback(&selection))
                    }
                    Err(err) => ToolOutcome::Rejected(err),
                }
            }
            ToolEvent::DoubleClick(_) | ToolEvent::Key(ToolKey::Enter) => self.finish(scene),
            ToolEvent::RightClick | ToolEvent::Key(ToolKey::Escape) => self.cancel(scene),
            ToolEvent::Key(key) => self.nudge(scene, key),
        }
    }

    fn place_center(&self, center: Point3) -> Result<BoxSelection, EngineError> {
        let defaults = &self.defaults;
        Ok(
            BoxSelection::new(center, defaults.width, defaults.depth, defaults.height)?
                .with_step(defaults.step)?,
        )
    }

    /// 应用一次显式调整。中心未放置或已完成时返回 `NotActive`。
    pub fn adjust(
        &mut self,
        scene: &mut dyn SceneEngine,
        adjustment: BoxAdjustment,
    ) -> ToolOutcome<SelectionResult> {
        if self.state != BoxToolState::CenterPlaced {
            return ToolOutcome::NotActive;
        }
        let Some(selection) = self.selection.as_mut() else {
            return ToolOutcome::NotActive;
        };
        let result = match adjustment {
            BoxAdjustment::Width(value) => selection.set_width(value),
            BoxAdjustment::Depth(value) => selection.set_depth(value),
            BoxAdjustment::Height(value) => selection.set_height(value),
            BoxAdjustment::RotationDeg(value) => selection.set_rotation_deg(value),
            BoxAdjustment::Step(value) => selection.set_step(value),
        };
        if let Err(err) = result {
            warn!(error = %err, "盒体调整被拒绝");
            return ToolOutcome::Rejected(err.into());
        }
        let snapshot = *selection;
        self.redraw(scene);
        ToolOutcome::Adjusted(feedback(&snapshot))
    }

    /// 键盘微调：方向键按步长平移中心，PageUp/PageDown 调整高度，旋转键按角度步长旋转。
    fn nudge(&mut self, scene: &mut dyn SceneEngine, key: ToolKey) -> ToolOutcome<SelectionResult> {
        let Some(selection) = self.selection else {
            return ToolOutcome::NotActive;
        };
        let step = selection.step();
        let rotation_step = self.defaults.rotation_step_deg;
        match key {
            ToolKey::ArrowLeft | ToolKey::ArrowRight | ToolKey::ArrowUp | ToolKey::ArrowDown => {
                let (east, north) = match key {
                    ToolKey::ArrowLeft => (-step, 0.0),
                    ToolKey::ArrowRight => (step, 0.0),
                    ToolKey::ArrowUp => (0.0, step),
                    _ => (0.0, -step),
                };
                let mut moved = selection;
                moved.translate_local(east, north);
                self.selection = Some(moved);
                self.redraw(scene);
                ToolOutcome::Adjusted(feedback(&moved))
            }
            ToolKey::PageUp => self.adjust(scene, BoxAdjustment::Height(selection.height() + step)),
            ToolKey::PageDown => {
                self.adjust(scene, BoxAdjustment::Height(selection.height() - step))
            }
            ToolKey::RotateLeft => self.adjust(
                scene,
                BoxAdjustment::RotationDeg(selection.rotation_deg() + rotation_step),
            ),
            ToolKey::RotateRight => self.adjust(
                scene,
                BoxAdjustment::RotationDeg(selection.rotation_deg() - rotation_step),
            ),
            ToolKey::Enter | ToolKey::Escape => ToolOutcome::Unhandled,
        }
    }

    pub fn finish(&mut self, _scene: &mut dyn SceneEngine) -> ToolOutcome<SelectionResult> {
        match (self.state, self.selection) {
            (BoxToolState::CenterPlaced, Some(selection)) => {
                self.state = BoxToolState::Ready;
                debug!(area_m2 = selection.area_m2(), "盒体选区已完成");
                ToolOutcome::Finalized(selection.finalize())
            }
            (BoxToolState::Idle, _) => {
                warn!("尚未放置盒体中心，无法完成");
                ToolOutcome::Insufficient {
                    found: 0,
                    required: 1,
                }
            }
            _ => ToolOutcome::NotActive,
        }
    }

    pub fn cancel(&mut self, scene: &mut dyn SceneEngine) -> ToolOutcome<SelectionResult> {
        if self.state == BoxToolState::Ready {
            return ToolOutcome::NotActive;
        }
        self.reset(scene);
        ToolOutcome::Cancelled
    }

    fn redraw(&mut self, scene: &mut dyn SceneEngine) {
        self.drawn.clear_all(scene);
        if let Some(selection) = &self.selection {
            self.drawn
                .draw(scene, DrawPrimitive::Segments(selection.wireframe().to_vec()));
            self.drawn.draw(scene, DrawPrimitive::Marker(selection.center()));
        }
    }
}

fn feedback(selection: &BoxSelection) -> Feedback {
    Feedback::Box {
        width: selection.width(),
        depth: selection.depth(),
        height: selection.height(),
        rotation_deg: selection.rotation_deg(),
        area_m2: selection.area_m2(),
    }
}
