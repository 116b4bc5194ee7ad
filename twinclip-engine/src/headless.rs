//! 无渲染的场景实现：屏幕坐标直接映射为锚点 ENU 平面上的米制偏移。
//! 供 CLI 演示与测试驱动完整的拾取 → 几何 → 裁剪流程。

use std::collections::{BTreeMap, HashMap};

use glam::DVec3;
use tracing::debug;
use twinclip_core::clipping::{ClipMode, ClipPolygon, PlaneSet};
use twinclip_core::geodesy::EnuFrame;
use twinclip_core::geometry::{BoundingSphere, Point3, Ray, Vector3};

use crate::scene::{DrawPrimitive, EntityHandle, SceneEngine, ScreenPoint, TargetId};

const CAMERA_HEIGHT: f64 = 1_000.0;

#[derive(Debug, Clone)]
struct HeadlessModel {
    min: (f64, f64),
    max: (f64, f64),
    height: f64,
    surface_pickable: bool,
}

impl HeadlessModel {
    fn contains(&self, screen: ScreenPoint) -> bool {
        screen.x >= self.min.0 && screen.x <= self.max.0 && screen.y >= self.min.1 && screen.y <= self.max.1
    }
}

/// 场景收到的最近一次裁剪调用。
#[derive(Debug, Clone, PartialEq)]
pub enum AppliedClip {
    Planes {
        planes: Option<PlaneSet>,
        mode: Option<ClipMode>,
    },
    Polygon {
        polygon: Option<ClipPolygon>,
        mode: Option<ClipMode>,
    },
}

#[derive(Debug)]
pub struct HeadlessScene {
    frame: EnuFrame,
    ground_extent: f64,
    models: BTreeMap<TargetId, HeadlessModel>,
    entities: BTreeMap<EntityHandle, DrawPrimitive>,
    next_handle: u64,
    clips: HashMap<TargetId, AppliedClip>,
    clip_calls: usize,
}

impl HeadlessScene {
    /// `ground_extent` 为地面可拾取范围（|x|、|y| 不超过该值，单位米）。
    pub fn new(anchor: Point3, ground_extent: f64) -> Self {
        Self {
            frame: EnuFrame::at(anchor),
            ground_extent,
            models: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_handle: 0,
            clips: HashMap::new(),
            clip_calls: 0,
        }
    }

    /// 添加一个轴对齐长方体模型。`surface_pickable` 为假时模拟表面拾取总是落空。
    pub fn add_model(
        &mut self,
        id: TargetId,
        min: (f64, f64),
        max: (f64, f64),
        height: f64,
        surface_pickable: bool,
    ) {
        self.models.insert(
            id,
            HeadlessModel {
                min,
                max,
                height,
                surface_pickable,
            },
        );
    }

    #[inline]
    pub fn frame(&self) -> &EnuFrame {
        &self.frame
    }

    /// 屏幕坐标对应的地面点（不检查范围）。
    pub fn ground_point(&self, screen: ScreenPoint) -> Point3 {
        self.frame.to_global(DVec3::new(screen.x, screen.y, 0.0))
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = (&EntityHandle, &DrawPrimitive)> {
        self.entities.iter()
    }

    pub fn applied_clip(&self, target: &TargetId) -> Option<&AppliedClip> {
        self.clips.get(target)
    }

    #[inline]
    pub fn clip_calls(&self) -> usize {
        self.clip_calls
    }

    fn model_under(&self, screen: ScreenPoint) -> Option<(&TargetId, &HeadlessModel)> {
        self.models.iter().find(|(_, model)| model.contains(screen))
    }
}

impl SceneEngine for HeadlessScene {
    fn pick_surface_position(&mut self, screen: ScreenPoint) -> Option<Point3> {
        if let Some((_, model)) = self.model_under(screen) {
            if !model.surface_pickable {
                return None;
            }
            return Some(self.frame.to_global(DVec3::new(screen.x, screen.y, model.height)));
        }
        if screen.x.abs() > self.ground_extent || screen.y.abs() > self.ground_extent {
            return None;
        }
        Some(self.ground_point(screen))
    }

    fn pick_entity(&mut self, screen: ScreenPoint) -> Option<TargetId> {
        self.model_under(screen).map(|(id, _)| id.clone())
    }

    fn pick_ray(&mut self, screen: ScreenPoint) -> Option<Ray> {
        let origin = self
            .frame
            .to_global(DVec3::new(screen.x, screen.y, CAMERA_HEIGHT));
        let down: Vector3 = -self.frame.up();
        Ray::new(origin, down)
    }

    fn target_bounding_sphere(&self, target: &TargetId) -> Option<BoundingSphere> {
        let model = self.models.get(target)?;
        let half_x = (model.max.0 - model.min.0) * 0.5;
        let half_y = (model.max.1 - model.min.1) * 0.5;
        let half_z = model.height * 0.5;
        let center = self.frame.to_global(DVec3::new(
            model.min.0 + half_x,
            model.min.1 + half_y,
            half_z,
        ));
        let radius = (half_x * half_x + half_y * half_y + half_z * half_z).sqrt();
        Some(BoundingSphere::new(center, radius))
    }

    fn apply_clip_polygon(
        &mut self,
        target: &TargetId,
        polygon: Option<&ClipPolygon>,
        mode: Option<ClipMode>,
    ) {
        debug!(target = %target, has_polygon = polygon.is_some(), "应用裁剪多边形");
        self.clip_calls += 1;
        self.clips.insert(
            target.clone(),
            AppliedClip::Polygon {
                polygon: polygon.cloned(),
                mode,
            },
        );
    }

    fn apply_clip_planes(
        &mut self,
        target: &TargetId,
        planes: Option<&PlaneSet>,
        mode: Option<ClipMode>,
    ) {
        debug!(
            target = %target,
            planes = planes.map(PlaneSet::len).unwrap_or(0),
            "应用裁剪平面"
        );
        self.clip_calls += 1;
        self.clips.insert(
            target.clone(),
            AppliedClip::Planes {
                planes: planes.cloned(),
                mode,
            },
        );
    }

    fn add_entity(&mut self, primitive: DrawPrimitive) -> EntityHandle {
        let handle = EntityHandle::new(self.next_handle);
        self.next_handle += 1;
        self.entities.insert(handle, primitive);
        handle
    }

    fn remove_entity(&mut self, handle: EntityHandle) {
        self.entities.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use twinclip_core::geodesy::Cartographic;

    use super::*;
    use crate::scene::{DrawnSet, pick_on_target};

    fn scene() -> HeadlessScene {
        let anchor = Cartographic::from_degrees(113.26, 23.13, 0.0).to_cartesian();
        let mut scene = HeadlessScene::new(anchor, 500.0);
        scene.add_model(TargetId::new("tower"), (20.0, 20.0), (40.0, 40.0), 60.0, true);
        scene.add_model(TargetId::new("shed"), (-40.0, -40.0), (-30.0, -30.0), 4.0, false);
        scene
    }

    #[test]
    fn ground_pick_respects_extent() {
        let mut scene = scene();
        assert!(scene.pick_surface_position(ScreenPoint::new(10.0, 10.0)).is_some());
        assert!(scene.pick_surface_position(ScreenPoint::new(600.0, 0.0)).is_none());
    }

    #[test]
    fn target_pick_prefers_surface_then_bounding_sphere() {
        let mut scene = scene();
        let tower = TargetId::new("tower");
        let hit = pick_on_target(&mut scene, &tower, ScreenPoint::new(30.0, 30.0)).unwrap();
        let local = scene.frame().to_local(hit);
        assert!((local.z - 60.0).abs() < 1e-6);

        let shed = TargetId::new("shed");
        let fallback = pick_on_target(&mut scene, &shed, ScreenPoint::new(-35.0, -35.0))
            .expect("bounding sphere fallback");
        let sphere = scene.target_bounding_sphere(&shed).unwrap();
        assert!((fallback.distance(sphere.center) - sphere.radius).abs() < 1e-6);

        assert!(pick_on_target(&mut scene, &tower, ScreenPoint::new(-200.0, 200.0)).is_none());
    }

    #[test]
    fn drawn_set_clears_everything_it_added() {
        let mut scene = scene();
        let mut drawn = DrawnSet::new();
        let p = scene.ground_point(ScreenPoint::new(0.0, 0.0));
        drawn.draw(&mut scene, DrawPrimitive::Marker(p));
        let h = drawn.draw(&mut scene, DrawPrimitive::Marker(p));
        drawn.draw(
            &mut scene,
            DrawPrimitive::Polyline {
                positions: vec![p, p],
                closed: false,
            },
        );
        assert_eq!(scene.entity_count(), 3);
        assert!(drawn.remove(&mut scene, h));
        assert!(!drawn.remove(&mut scene, h));
        assert_eq!(drawn.clear_all(&mut scene), 2);
        assert_eq!(scene.entity_count(), 0);
        assert!(drawn.is_empty());
    }
}
