use std::fmt;

use twinclip_core::clipping::{ClipMode, ClipPolygon, PlaneSet};
use twinclip_core::geometry::{BoundingSphere, Point3, Ray, Segment3};

/// 屏幕像素坐标。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 可被裁剪的场景目标（瓦片数据集或单个模型）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(String);

impl TargetId {
    #[inline]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// 场景中已绘制实体的不透明句柄。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle(u64);

impl EntityHandle {
    #[inline]
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

/// 工具交给场景绘制的可视化图元。
#[derive(Debug, Clone, PartialEq)]
pub enum DrawPrimitive {
    Marker(Point3),
    Polyline { positions: Vec<Point3>, closed: bool },
    Segments(Vec<Segment3>),
}

/// 场景引擎边界：拾取、裁剪应用与实体增删。核心逻辑从不直接渲染。
pub trait SceneEngine {
    fn pick_surface_position(&mut self, screen: ScreenPoint) -> Option<Point3>;
    fn pick_entity(&mut self, screen: ScreenPoint) -> Option<TargetId>;
    fn pick_ray(&mut self, screen: ScreenPoint) -> Option<Ray>;
    fn target_bounding_sphere(&self, target: &TargetId) -> Option<BoundingSphere>;
    fn apply_clip_polygon(
        &mut self,
        target: &TargetId,
        polygon: Option<&ClipPolygon>,
        mode: Option<ClipMode>,
    );
    fn apply_clip_planes(
        &mut self,
        target: &TargetId,
        planes: Option<&PlaneSet>,
        mode: Option<ClipMode>,
    );
    fn add_entity(&mut self, primitive: DrawPrimitive) -> EntityHandle;
    fn remove_entity(&mut self, handle: EntityHandle);
}

/// 在指定目标表面拾取：先直接拾取表面，失败后退化为射线与包围球求交；都失败则返回 `None`。
pub fn pick_on_target(
    scene: &mut dyn SceneEngine,
    target: &TargetId,
    screen: ScreenPoint,
) -> Option<Point3> {
    if scene.pick_entity(screen).as_ref() == Some(target) {
        if let Some(point) = scene.pick_surface_position(screen) {
            return Some(point);
        }
    }
    let sphere = scene.target_bounding_sphere(target)?;
    let ray = scene.pick_ray(screen)?;
    ray.intersect_sphere(&sphere)
}

/// 单个工具绘制的实体集合。工具在停用、重置、卸载时必须调用 [`DrawnSet::clear_all`]。
#[derive(Debug, Default)]
pub struct DrawnSet {
    handles: Vec<EntityHandle>,
}

impl DrawnSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draw(&mut self, scene: &mut dyn SceneEngine, primitive: DrawPrimitive) -> EntityHandle {
        let handle = scene.add_entity(primitive);
        self.handles.push(handle);
        handle
    }

    /// 移除单个实体，返回该句柄是否属于本集合。
    pub fn remove(&mut self, scene: &mut dyn SceneEngine, handle: EntityHandle) -> bool {
        let Some(index) = self.handles.iter().position(|h| *h == handle) else {
            return false;
        };
        self.handles.swap_remove(index);
        scene.remove_entity(handle);
        true
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// 同步移除全部实体，返回移除数量。
    pub fn clear_all(&mut self, scene: &mut dyn SceneEngine) -> usize {
        let count = self.handles.len();
        for handle in self.handles.drain(..) {
            scene.remove_entity(handle);
        }
        count
    }
}
