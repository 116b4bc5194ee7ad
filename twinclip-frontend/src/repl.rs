//! 行命令交互模式。除命令总线上的命令外，还接受模拟指针与键盘输入：
//!
//! ```text
//! click <x> <y>      dblclick <x> <y>      right
//! key <enter|escape|left|right|up|down|pageup|pagedown|[|]>
//! restore            help                  quit
//! ```

use std::io::{BufRead, Write};

use tracing::debug;
use twinclip_engine::scene::ScreenPoint;
use twinclip_engine::tools::{Feedback, ToolEvent, ToolKey, ToolOutcome};
use twinclip_engine::workspace::ToolResult;

use crate::cli::write_response;
use crate::errors::FrontendError;
use crate::session::DemoSession;

enum Input {
    Event(ToolEvent),
    Restore,
    Help,
    Quit,
    Command,
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        ["click", x, y] | ["dblclick", x, y] => match (x.parse::<f64>(), y.parse::<f64>()) {
            (Ok(x), Ok(y)) => {
                let screen = ScreenPoint::new(x, y);
                if parts[0] == "click" {
                    Input::Event(ToolEvent::Click(screen))
                } else {
                    Input::Event(ToolEvent::DoubleClick(screen))
                }
            }
            _ => Input::Invalid(format!("无法解析坐标: {line}")),
        },
        ["right"] => Input::Event(ToolEvent::RightClick),
        ["key", name] => match parse_key(name) {
            Some(key) => Input::Event(ToolEvent::Key(key)),
            None => Input::Invalid(format!("未知按键: {name}")),
        },
        ["restore"] => Input::Restore,
        ["help"] => Input::Help,
        ["quit"] | ["exit"] => Input::Quit,
        _ => Input::Command,
    }
}

fn parse_key(name: &str) -> Option<ToolKey> {
    Some(match name {
        "enter" => ToolKey::Enter,
        "escape" | "esc" => ToolKey::Escape,
        "left" => ToolKey::ArrowLeft,
        "right" => ToolKey::ArrowRight,
        "up" => ToolKey::ArrowUp,
        "down" => ToolKey::ArrowDown,
        "pageup" => ToolKey::PageUp,
        "pagedown" => ToolKey::PageDown,
        "[" => ToolKey::RotateLeft,
        "]" => ToolKey::RotateRight,
        _ => return None,
    })
}

fn describe_outcome(outcome: &ToolOutcome<ToolResult>, precision: usize) -> Option<String> {
    if let Some(message) = outcome.status_message() {
        return Some(message);
    }
    let fmt = |value: f64| format!("{value:.precision$}");
    match outcome {
        ToolOutcome::VertexAdded(feedback) | ToolOutcome::Adjusted(feedback) => Some(match feedback {
            Feedback::Measure {
                last_segment,
                total_distance,
                area_m2,
            } => {
                let mut text = format!("总长 {} 米", fmt(*total_distance));
                if let Some(segment) = last_segment {
                    text.push_str(&format!("，本段 {} 米", fmt(*segment)));
                }
                if let Some(area) = area_m2 {
                    text.push_str(&format!("，面积 {} 平方米", fmt(*area)));
                }
                text
            }
            Feedback::Polygon { vertices, area_m2 } => match area_m2 {
                Some(area) => format!("{vertices} 个顶点，面积 {} 平方米", fmt(*area)),
                None => format!("{vertices} 个顶点"),
            },
            Feedback::Box {
                width,
                depth,
                height,
                rotation_deg,
                area_m2,
            } => format!(
                "盒体 {} x {} x {} 米，旋转 {}°，底面积 {} 平方米",
                fmt(*width),
                fmt(*depth),
                fmt(*height),
                fmt(*rotation_deg),
                fmt(*area_m2)
            ),
        }),
        ToolOutcome::Finalized(ToolResult::Selection(selection)) => Some(format!(
            "选区已完成：{} 个顶点，面积 {} 平方米",
            selection.positions.len(),
            fmt(selection.area_m2)
        )),
        ToolOutcome::Finalized(ToolResult::Measurement(session)) => Some(format!(
            "测量已完成：总长 {} 米",
            fmt(session.total_distance())
        )),
        ToolOutcome::Cancelled => Some("已取消".to_string()),
        ToolOutcome::NotActive => Some("当前没有激活的工具".to_string()),
        ToolOutcome::Ignored | ToolOutcome::Unhandled => None,
        ToolOutcome::Insufficient { .. } | ToolOutcome::Rejected(_) => None,
    }
}

/// 逐行读取输入直到 `quit` 或输入结束。
pub fn run_repl(
    session: &mut DemoSession,
    precision: usize,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<(), FrontendError> {
    writeln!(out, "TwinClip 交互模式，输入 help 查看用法")?;
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        debug!(line = trimmed, "处理输入");
        match parse_input(trimmed) {
            Input::Event(event) => {
                let outcome = session.workspace.handle_event(&mut session.scene, event);
                if let Some(text) = describe_outcome(&outcome, precision) {
                    writeln!(out, "{text}")?;
                }
            }
            Input::Restore => {
                let positions = session.region.polygon.positions().to_vec();
                match session.workspace.restore_region(&mut session.scene, &positions) {
                    Ok(outcome) => {
                        if let Some(text) = describe_outcome(&outcome, precision) {
                            writeln!(out, "{text}")?;
                        }
                    }
                    Err(err) => writeln!(out, "区域回放失败: {err}")?,
                }
            }
            Input::Help => {
                let mut commands: Vec<&str> = session.bus.available_commands().copied().collect();
                commands.sort_unstable();
                writeln!(out, "输入: click/dblclick <x> <y>, right, key <name>, restore, quit")?;
                writeln!(out, "命令: {}", commands.join(", "))?;
            }
            Input::Quit => break,
            Input::Invalid(message) => writeln!(out, "{message}")?,
            Input::Command => {
                if let Some(response) = session.dispatch(trimmed) {
                    write_response(out, trimmed, &response)?;
                }
            }
        }
    }
    Ok(())
}
