use std::collections::HashMap;

use twinclip_core::clipping::ClipMode;

use crate::errors::EngineError;
use crate::scene::{SceneEngine, TargetId};
use crate::tools::{BoxAdjustment, ToolOutcome};
use crate::workspace::{ToolKind, ToolResult, Workspace};

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    /// 按空白拆分一行命令文本，首个词为命令名。
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let name = parts.next()?.to_string();
        Some(Self {
            name,
            args: parts.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }

    /// 把工具结果转成状态文字。拾取落空依旧算成功且不带提示。
    fn from_outcome(outcome: ToolOutcome<ToolResult>) -> Self {
        if let Some(message) = outcome.status_message() {
            return Self::err(message);
        }
        match outcome {
            ToolOutcome::NotActive => Self::err(EngineError::ToolInactive.to_string()),
            ToolOutcome::Finalized(ToolResult::Selection(selection)) => Self::ok(format!(
                "选区已完成：{} 个顶点，面积 {:.3} 平方米",
                selection.positions.len(),
                selection.area_m2
            )),
            ToolOutcome::Finalized(ToolResult::Measurement(session)) => Self::ok(format!(
                "测量已完成：总长 {:.3} 米",
                session.total_distance()
            )),
            ToolOutcome::Cancelled => Self::ok("工具已取消"),
            ToolOutcome::Adjusted(_) => Self::ok("盒体已调整"),
            _ => Self {
                success: true,
                message: None,
            },
        }
    }
}

impl From<EngineError> for CommandResponse {
    fn from(err: EngineError) -> Self {
        Self::err(err.to_string())
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub workspace: &'a mut Workspace,
    pub scene: &'a mut dyn SceneEngine,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ActivateToolCommand);
        bus.register(FinishToolCommand);
        bus.register(CancelToolCommand);
        bus.register(DeactivateToolCommand);
        bus.register(AdjustBoxCommand);
        bus.register(ClipSelectionCommand);
        bus.register(UndoClipCommand);
        bus.register(ClearClipCommand);
        bus.register(ClipStatusCommand);
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

fn target_arg(request: &CommandRequest, index: usize) -> Result<TargetId, EngineError> {
    request
        .args
        .get(index)
        .map(|raw| TargetId::new(raw.as_str()))
        .ok_or_else(|| EngineError::InvalidArgument(format!("{} 缺少目标参数", request.name)))
}

fn parse_mode(raw: Option<&String>) -> Result<ClipMode, EngineError> {
    match raw.map(String::as_str) {
        None | Some("keep") | Some("keepInside") => Ok(ClipMode::KeepInside),
        Some("remove") | Some("removeInside") => Ok(ClipMode::RemoveInside),
        Some(other) => Err(EngineError::InvalidArgument(format!("未知裁剪模式: {other}"))),
    }
}

struct ActivateToolCommand;

impl CommandHandler for ActivateToolCommand {
    fn name(&self) -> &'static str {
        "activate_tool"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let kind = match request.args.first().map(String::as_str) {
            Some("measure") => ToolKind::Measure,
            Some("polygon") => ToolKind::PolygonSelect,
            Some("box") => ToolKind::BoxSelect,
            Some("surface") => match target_arg(request, 1) {
                Ok(target) => ToolKind::SurfaceSelect(target),
                Err(err) => return err.into(),
            },
            Some(other) => return CommandResponse::err(format!("未知工具: {other}")),
            None => return CommandResponse::err("activate_tool 缺少工具名"),
        };
        let name = kind.name();
        match context.workspace.activate_tool(context.scene, kind) {
            Ok(()) => CommandResponse::ok(format!("已激活工具 {name}")),
            Err(err) => err.into(),
        }
    }
}

struct FinishToolCommand;

impl CommandHandler for FinishToolCommand {
    fn name(&self) -> &'static str {
        "finish_tool"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        CommandResponse::from_outcome(context.workspace.finish_tool(context.scene))
    }
}

struct CancelToolCommand;

impl CommandHandler for CancelToolCommand {
    fn name(&self) -> &'static str {
        "cancel_tool"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        CommandResponse::from_outcome(context.workspace.cancel_tool(context.scene))
    }
}

struct DeactivateToolCommand;

impl CommandHandler for DeactivateToolCommand {
    fn name(&self) -> &'static str {
        "deactivate_tool"
    }

    fn execute(
        &self,
        _request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        context.workspace.deactivate_tool(context.scene);
        CommandResponse::ok("工具已停用，绘制内容已清除")
    }
}

/// `box <width|depth|height|rotation|step> <value>`
struct AdjustBoxCommand;

impl CommandHandler for AdjustBoxCommand {
    fn name(&self) -> &'static str {
        "box"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let (Some(field), Some(raw)) = (request.args.first(), request.args.get(1)) else {
            return CommandResponse::err("用法: box <width|depth|height|rotation|step> <value>");
        };
        let Ok(value) = raw.parse::<f64>() else {
            return EngineError::InvalidArgument(format!("无法解析数值: {raw}")).into();
        };
        let adjustment = match field.as_str() {
            "width" => BoxAdjustment::Width(value),
            "depth" => BoxAdjustment::Depth(value),
            "height" => BoxAdjustment::Height(value),
            "rotation" => BoxAdjustment::RotationDeg(value),
            "step" => BoxAdjustment::Step(value),
            other => return CommandResponse::err(format!("未知盒体参数: {other}")),
        };
        CommandResponse::from_outcome(context.workspace.adjust_box(context.scene, adjustment))
    }
}

/// `clip_selection <target> [keep|remove]`
struct ClipSelectionCommand;

impl CommandHandler for ClipSelectionCommand {
    fn name(&self) -> &'static str {
        "clip_selection"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let result = target_arg(request, 0).and_then(|target| {
            let mode = parse_mode(request.args.get(1))?;
            context
                .workspace
                .clip_last_selection(context.scene, &target, mode)
        });
        match result {
            Ok(status) => CommandResponse::ok(status.to_string()),
            Err(err) => err.into(),
        }
    }
}

struct UndoClipCommand;

impl CommandHandler for UndoClipCommand {
    fn name(&self) -> &'static str {
        "undo_clip"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let result = target_arg(request, 0)
            .and_then(|target| context.workspace.undo_clip(context.scene, &target));
        match result {
            Ok(status) => CommandResponse::ok(status.to_string()),
            Err(err) => err.into(),
        }
    }
}

struct ClearClipCommand;

impl CommandHandler for ClearClipCommand {
    fn name(&self) -> &'static str {
        "clear_clip"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let result = target_arg(request, 0)
            .and_then(|target| context.workspace.clear_clip(context.scene, &target));
        match result {
            Ok(status) => CommandResponse::ok(status.to_string()),
            Err(err) => err.into(),
        }
    }
}

struct ClipStatusCommand;

impl CommandHandler for ClipStatusCommand {
    fn name(&self) -> &'static str {
        "clip_status"
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        match target_arg(request, 0).and_then(|target| context.workspace.clip_status(&target)) {
            Ok(status) => CommandResponse::ok(status.to_string()),
            Err(err) => err.into(),
        }
    }
}
