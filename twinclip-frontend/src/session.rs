use glam::DMat4;
use twinclip_config::AppConfig;
use twinclip_core::clipping::ModelTransform;
use twinclip_core::geodesy::EnuFrame;
use twinclip_engine::command::{CommandBus, CommandContext, CommandRequest, CommandResponse};
use twinclip_engine::headless::HeadlessScene;
use twinclip_engine::scene::TargetId;
use twinclip_engine::workspace::Workspace;

use crate::loader::{LoadedRegion, engine_settings};

pub const TILESET_TARGET: &str = "tileset";
pub const MODEL_TARGET: &str = "building";

/// 地面可拾取范围（米）。
const GROUND_EXTENT_M: f64 = 500.0;

/// 演示会话：以区域首点为锚点的无渲染场景，一个瓦片数据集和一个放置在锚点的建筑模型。
pub struct DemoSession {
    pub scene: HeadlessScene,
    pub workspace: Workspace,
    pub bus: CommandBus,
    pub region: LoadedRegion,
}

impl DemoSession {
    pub fn new(config: &AppConfig, region: LoadedRegion) -> Self {
        let anchor = region.polygon.first();
        let mut scene = HeadlessScene::new(anchor, GROUND_EXTENT_M);
        // 模型表面不可直接拾取，点击走包围球退化路径
        scene.add_model(TargetId::new(MODEL_TARGET), (60.0, 60.0), (100.0, 90.0), 24.0, false);

        let mut workspace = Workspace::new(engine_settings(config));
        workspace.register_tileset(TargetId::new(TILESET_TARGET));
        workspace.register_model(TargetId::new(MODEL_TARGET), enu_model_transform(scene.frame()));

        Self {
            scene,
            workspace,
            bus: CommandBus::new(),
            region,
        }
    }

    pub fn dispatch(&mut self, line: &str) -> Option<CommandResponse> {
        let request = CommandRequest::parse(line)?;
        let mut context = CommandContext {
            workspace: &mut self.workspace,
            scene: &mut self.scene,
        };
        Some(self.bus.dispatch(&request, &mut context))
    }
}

/// 模型局部坐标即锚点处的东-北-天坐标。
pub fn enu_model_transform(frame: &EnuFrame) -> ModelTransform {
    let origin = frame.origin().as_vec3();
    ModelTransform::new(DMat4::from_cols(
        frame.east().as_vec3().extend(0.0),
        frame.north().as_vec3().extend(0.0),
        frame.up().as_vec3().extend(0.0),
        origin.extend(1.0),
    ))
}

#[cfg(test)]
mod tests {
    use glam::DVec3;
    use twinclip_core::geometry::Point3;

    use super::*;
    use crate::loader::{RegionSource, demo_region};

    #[test]
    fn model_transform_maps_local_enu_to_global() {
        let region = LoadedRegion {
            polygon: demo_region().unwrap(),
            source: RegionSource::Demo,
        };
        let session = DemoSession::new(&AppConfig::default(), region);
        let frame = session.scene.frame();
        let transform = enu_model_transform(frame);
        let local = DVec3::new(12.0, -3.0, 7.5);
        let expected = frame.to_global(local);
        let actual = transform.transform_point(Point3(local));
        assert!(actual.distance(expected) < 1e-6);
    }
}
