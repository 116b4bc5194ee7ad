use std::io::Write;

use tracing::{info, warn};
use twinclip_config::AppConfig;
use twinclip_engine::command::CommandResponse;
use twinclip_engine::scene::{ScreenPoint, TargetId};
use twinclip_engine::tools::{ToolEvent, ToolKey};
use twinclip_io::encode_plane_set;

use crate::errors::FrontendError;
use crate::loader::RegionSource;
use crate::session::{DemoSession, MODEL_TARGET, TILESET_TARGET};

/// 简易 CLI 演示：加载区域（或内置示例），依次演示测量、区域回放、多边形与盒体裁剪、撤销，并打印报告。
pub fn run_demo(
    config: &AppConfig,
    session: &mut DemoSession,
    out: &mut dyn Write,
) -> Result<(), FrontendError> {
    let precision = config.frontend.report_precision;
    let fmt = |value: f64| format!("{value:.precision$}");

    writeln!(out, "TwinClip CLI 演示")?;
    match &session.region.source {
        RegionSource::File(path) => writeln!(out, "已从区域文件加载：{}", path.display())?,
        RegionSource::Demo => writeln!(out, "使用内置示例区域（L 形地块）")?,
    }
    writeln!(out, "区域顶点数：{}", session.region.polygon.len())?;

    // 测量
    run_command(session, out, "activate_tool measure")?;
    for (x, y) in [(0.0, 0.0), (120.0, 0.0), (120.0, 90.0)] {
        click(session, x, y);
    }
    run_command(session, out, "finish_tool")?;
    if let Some(measurement) = session.workspace.last_measurement() {
        let segments: Vec<String> = measurement.segments().iter().map(|d| fmt(*d)).collect();
        writeln!(out, "  分段距离(米)：{}", segments.join(", "))?;
        writeln!(out, "  总长(米)：{}", fmt(measurement.total_distance()))?;
        if let Some(area) = measurement.area_m2() {
            writeln!(out, "  围合面积(平方米)：{}", fmt(area))?;
        }
    }

    // 区域回放
    let positions = session.region.polygon.positions().to_vec();
    let outcome = session
        .workspace
        .restore_region(&mut session.scene, &positions)?;
    if let Some(message) = outcome.status_message() {
        warn!(message = %message, "区域回放未完成");
        writeln!(out, "区域回放失败：{message}")?;
    }
    if let Some(selection) = session.workspace.last_selection() {
        let metrics = selection.positions.metrics();
        let centroid = session.scene.frame().to_local(selection.centroid);
        writeln!(
            out,
            "区域选区：{} 个顶点，面积 {} 平方米，{}，质心 ({}, {})",
            selection.positions.len(),
            fmt(selection.area_m2),
            if metrics.is_ccw { "逆时针" } else { "顺时针" },
            fmt(centroid.x),
            fmt(centroid.y)
        )?;
    }
    run_command(session, out, &format!("clip_selection {TILESET_TARGET} keep"))?;
    run_command(session, out, &format!("clip_selection {MODEL_TARGET} remove"))?;

    // 盒体
    run_command(session, out, "activate_tool box")?;
    click(session, 80.0, 40.0);
    run_command(session, out, "box width 30")?;
    run_command(session, out, "box depth 20")?;
    key(session, ToolKey::RotateLeft);
    key(session, ToolKey::ArrowUp);
    run_command(session, out, "finish_tool")?;
    run_command(session, out, &format!("clip_selection {MODEL_TARGET} keep"))?;

    let model = TargetId::new(MODEL_TARGET);
    if let Some(planes) = session.workspace.model_planes(&model) {
        let json = encode_plane_set(planes)?;
        writeln!(out, "  模型裁剪平面 {} 个，持久化 JSON {} 字节", planes.len(), json.len())?;
    }

    // 模型表面选区（包围球退化拾取）
    run_command(session, out, &format!("activate_tool surface {MODEL_TARGET}"))?;
    for (x, y) in [(65.0, 65.0), (95.0, 65.0), (95.0, 85.0), (65.0, 85.0)] {
        click(session, x, y);
    }
    run_command(session, out, "finish_tool")?;
    run_command(session, out, "deactivate_tool")?;

    // 撤销
    for _ in 0..3 {
        run_command(session, out, &format!("undo_clip {MODEL_TARGET}"))?;
    }
    run_command(session, out, &format!("clip_status {TILESET_TARGET}"))?;

    let mut commands: Vec<&str> = session.bus.available_commands().copied().collect();
    commands.sort_unstable();
    writeln!(out, "支持的命令: {}", commands.join(", "))?;
    info!(entities = session.scene.entity_count(), clip_calls = session.scene.clip_calls(), "CLI 演示完成");
    Ok(())
}

fn click(session: &mut DemoSession, x: f64, y: f64) {
    session
        .workspace
        .handle_event(&mut session.scene, ToolEvent::Click(ScreenPoint::new(x, y)));
}

fn key(session: &mut DemoSession, key: ToolKey) {
    session
        .workspace
        .handle_event(&mut session.scene, ToolEvent::Key(key));
}

fn run_command(
    session: &mut DemoSession,
    out: &mut dyn Write,
    line: &str,
) -> Result<(), FrontendError> {
    if let Some(response) = session.dispatch(line) {
        write_response(out, line, &response)?;
    }
    Ok(())
}

pub(crate) fn write_response(
    out: &mut dyn Write,
    line: &str,
    response: &CommandResponse,
) -> std::io::Result<()> {
    match (&response.message, response.success) {
        (Some(message), true) => writeln!(out, "[命令] {line} -> {message}"),
        (Some(message), false) => writeln!(out, "[命令] {line} 失败: {message}"),
        (None, true) => Ok(()),
        (None, false) => writeln!(out, "[命令] {line} 失败"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{LoadedRegion, demo_region};

    #[test]
    fn demo_report_covers_full_workflow() {
        let config = AppConfig::default();
        let region = LoadedRegion {
            polygon: demo_region().unwrap(),
            source: RegionSource::Demo,
        };
        let mut session = DemoSession::new(&config, region);
        let mut out = Vec::new();
        run_demo(&config, &mut session, &mut out).expect("demo should run");
        let report = String::from_utf8(out).unwrap();

        assert!(report.contains("使用内置示例区域"));
        assert!(report.contains("总长(米)：210.000"));
        assert!(report.contains("面积 750.000 平方米，顺时针"));
        assert!(report.contains("已裁剪 [keepInside]"));
        assert!(report.contains("已裁剪 [removeInside]"));
        assert!(report.contains("undo_clip building 失败: 没有可撤销的裁剪"));
        assert!(!report.contains("activate_tool surface building 失败"));
        assert_eq!(session.scene.entity_count(), 0);
    }
}
