//! Collider provisioning
//!
//! Статика уровня (ground plane + trimesh из загруженной геометрии) и
//! капсулы персонажей. Trimesh строится один раз при загрузке уровня,
//! best-effort по каждому submesh:
//! - submesh не собрался в trimesh → AABB коллайдер этого submesh
//! - ни один submesh не собрался → один AABB на всю модель (никогда ноль)

use bevy::prelude::*;
use bevy_rapier3d::rapier::prelude::{ColliderBuilder, Point, Real};
use thiserror::Error;

use super::world::{ColliderHandle, CollisionWorld};
use crate::config::CharacterConfig;

/// Полутолщина ground plane (верхняя грань на y = 0)
pub const GROUND_HALF_THICKNESS: f32 = 0.1;

/// Минимальная полуширина fallback box (плоская геометрия даёт нулевую толщину)
pub const MIN_BOX_HALF_EXTENT: f32 = 0.01;

/// Геометрическая форма коллайдера
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Capsule { radius: f32, half_height: f32 },
    Cuboid { half_extents: Vec3 },
    TriMesh { vertices: Vec<Vec3>, indices: Vec<[u32; 3]> },
}

impl ColliderShape {
    /// Капсула персонажа (ось Y)
    pub fn character_capsule(config: &CharacterConfig) -> Self {
        Self::Capsule {
            radius: config.radius,
            half_height: config.capsule_half_height(),
        }
    }

    /// Box по AABB (центр задаётся transform'ом)
    pub fn bounding_box(bounds: &Aabb3) -> Self {
        Self::Cuboid {
            half_extents: bounds.half_extents().max(Vec3::splat(MIN_BOX_HALF_EXTENT)),
        }
    }

    pub(crate) fn to_builder(&self) -> Result<ColliderBuilder, ColliderBuildError> {
        match self {
            ColliderShape::Capsule { radius, half_height } => {
                if !(radius.is_finite()
                    && *radius > 0.0
                    && half_height.is_finite()
                    && *half_height >= 0.0)
                {
                    return Err(ColliderBuildError::InvalidDimensions);
                }
                Ok(ColliderBuilder::capsule_y(*half_height, *radius))
            }
            ColliderShape::Cuboid { half_extents } => {
                if !half_extents.is_finite() || half_extents.min_element() <= 0.0 {
                    return Err(ColliderBuildError::InvalidDimensions);
                }
                Ok(ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z))
            }
            ColliderShape::TriMesh { vertices, indices } => {
                validate_trimesh(vertices, indices)?;
                let points: Vec<Point<Real>> = vertices
                    .iter()
                    .map(|v| Point::new(v.x, v.y, v.z))
                    .collect();
                ColliderBuilder::trimesh(points, indices.clone())
                    .map_err(|err| ColliderBuildError::TriMesh(format!("{err:?}")))
            }
        }
    }
}

/// Ошибка построения коллайдера (recoverable: provisioning подставляет box)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ColliderBuildError {
    #[error("submesh has no vertices")]
    NoVertices,
    #[error("submesh has no triangles")]
    NoTriangles,
    #[error("non-indexed vertex count {0} is not a multiple of 3")]
    UnalignedVertexCount(usize),
    #[error("index count {0} is not a multiple of 3")]
    UnalignedIndexCount(usize),
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("vertex buffer contains non-finite coordinates")]
    NonFiniteVertex,
    #[error("shape dimensions must be positive and finite")]
    InvalidDimensions,
    #[error("trimesh construction failed: {0}")]
    TriMesh(String),
}

fn validate_trimesh(vertices: &[Vec3], indices: &[[u32; 3]]) -> Result<(), ColliderBuildError> {
    if vertices.is_empty() {
        return Err(ColliderBuildError::NoVertices);
    }
    if indices.is_empty() {
        return Err(ColliderBuildError::NoTriangles);
    }
    if vertices.iter().any(|v| !v.is_finite()) {
        return Err(ColliderBuildError::NonFiniteVertex);
    }
    let vertex_count = vertices.len();
    if let Some(&index) = indices
        .iter()
        .flatten()
        .find(|&&index| index as usize >= vertex_count)
    {
        return Err(ColliderBuildError::IndexOutOfRange { index, vertex_count });
    }
    Ok(())
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb3 {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb3 {
    /// AABB по точкам (non-finite игнорируются). None если точек нет.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<Self> {
        points
            .into_iter()
            .filter(|p| p.is_finite())
            .fold(None, |acc: Option<Self>, p| {
                Some(match acc {
                    Some(aabb) => Self {
                        min: aabb.min.min(*p),
                        max: aabb.max.max(*p),
                    },
                    None => Self { min: *p, max: *p },
                })
            })
    }

    pub fn merge(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Геометрия одного submesh от loader'а (world space)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmeshGeometry {
    pub name: String,
    pub vertices: Vec<Vec3>,
    /// None = non-indexed геометрия (каждые 3 вершины: треугольник)
    pub indices: Option<Vec<u32>>,
}

impl SubmeshGeometry {
    /// Треугольники submesh (non-indexed → последовательные индексы)
    pub fn triangles(&self) -> Result<Vec<[u32; 3]>, ColliderBuildError> {
        if self.vertices.is_empty() {
            return Err(ColliderBuildError::NoVertices);
        }
        match &self.indices {
            Some(indices) => {
                if indices.len() % 3 != 0 {
                    return Err(ColliderBuildError::UnalignedIndexCount(indices.len()));
                }
                Ok(indices.chunks_exact(3).map(|tri| [tri[0], tri[1], tri[2]]).collect())
            }
            None => {
                let count = self.vertices.len();
                if count % 3 != 0 {
                    return Err(ColliderBuildError::UnalignedVertexCount(count));
                }
                Ok((0..count as u32)
                    .step_by(3)
                    .map(|i| [i, i + 1, i + 2])
                    .collect())
            }
        }
    }

    pub fn bounds(&self) -> Option<Aabb3> {
        Aabb3::from_points(&self.vertices)
    }
}

/// Модель уровня (набор submesh)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelGeometry {
    pub name: String,
    pub submeshes: Vec<SubmeshGeometry>,
}

impl ModelGeometry {
    pub fn bounds(&self) -> Option<Aabb3> {
        self.submeshes
            .iter()
            .filter_map(SubmeshGeometry::bounds)
            .reduce(|acc, b| acc.merge(&b))
    }
}

/// Что получилось для одной модели
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelColliders {
    pub colliders: Vec<ColliderHandle>,
    /// Submesh'и, собранные в trimesh
    pub trimesh_count: usize,
    /// Submesh'и, заменённые своим AABB
    pub submesh_box_count: usize,
    /// Модель целиком заменена одним AABB
    pub whole_model_fallback: bool,
}

/// Итог provisioning всего уровня (Resource для диагностики)
#[derive(Resource, Debug, Clone, Default, PartialEq)]
pub struct ProvisionReport {
    pub ground: Option<ColliderHandle>,
    pub models: Vec<ModelColliders>,
}

impl ProvisionReport {
    pub fn total_colliders(&self) -> usize {
        self.ground.iter().count() + self.models.iter().map(|m| m.colliders.len()).sum::<usize>()
    }
}

/// Описание статики уровня (отдаёт geometry provider)
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct LevelGeometry {
    /// Полуразмер квадратного ground plane (0 = без пола)
    pub ground_half_size: f32,
    pub models: Vec<ModelGeometry>,
}

impl Default for LevelGeometry {
    fn default() -> Self {
        Self {
            ground_half_size: 100.0,
            models: Vec::new(),
        }
    }
}

/// Ground plane: тонкий cuboid с верхней гранью на y = 0
pub fn create_ground_plane(
    world: &mut CollisionWorld,
    half_size: f32,
) -> Result<ColliderHandle, ColliderBuildError> {
    let shape = ColliderShape::Cuboid {
        half_extents: Vec3::new(half_size, GROUND_HALF_THICKNESS, half_size),
    };
    world.create_static_collider(
        &shape,
        Transform::from_xyz(0.0, -GROUND_HALF_THICKNESS, 0.0),
    )
}

enum SubmeshPlan {
    TriMesh(ColliderBuilder),
    Fallback(ColliderBuildError),
}

/// Коллайдеры для модели с fallback'ами
///
/// Вершины уже в world space, поэтому trimesh ставится с identity transform.
pub fn provision_model(world: &mut CollisionWorld, model: &ModelGeometry) -> ModelColliders {
    let model_bounds = model.bounds();

    let plans: Vec<SubmeshPlan> = model
        .submeshes
        .iter()
        .map(|submesh| match submesh.triangles() {
            Ok(indices) => {
                let shape = ColliderShape::TriMesh {
                    vertices: submesh.vertices.clone(),
                    indices,
                };
                // Строим до вставки, чтобы fallback решался до мутации мира
                match shape.to_builder() {
                    Ok(builder) => SubmeshPlan::TriMesh(builder),
                    Err(err) => SubmeshPlan::Fallback(err),
                }
            }
            Err(err) => SubmeshPlan::Fallback(err),
        })
        .collect();

    let mut result = ModelColliders::default();
    let mut fallbacks = Vec::new();

    for (submesh, plan) in model.submeshes.iter().zip(plans) {
        match plan {
            SubmeshPlan::TriMesh(builder) => {
                result
                    .colliders
                    .push(world.insert_static(builder, Transform::IDENTITY));
                result.trimesh_count += 1;
            }
            SubmeshPlan::Fallback(err) => fallbacks.push((submesh, err)),
        }
    }

    if result.trimesh_count == 0 {
        // Ни одного trimesh → один box на всю модель.
        // Без единой finite вершины box поставить некуда: модель пропускаем.
        let Some(bounds) = model_bounds else {
            crate::log_error(&format!(
                "Collider provisioning: model '{}' has no usable vertices ({} submeshes), skipped",
                model.name,
                model.submeshes.len()
            ));
            return result;
        };
        crate::log_warning(&format!(
            "Collider provisioning: model '{}' produced no trimesh colliders ({} submeshes), using whole-model bounding box",
            model.name,
            model.submeshes.len()
        ));
        if let Some(handle) = insert_box(world, &bounds, &model.name) {
            result.colliders.push(handle);
        }
        result.whole_model_fallback = true;
        return result;
    }

    for (submesh, err) in fallbacks {
        crate::log_warning(&format!(
            "Collider provisioning: model '{}' submesh '{}' trimesh failed ({}), using bounding box",
            model.name, submesh.name, err
        ));
        // Пустой submesh не имеет своего AABB → берём AABB модели
        let Some(bounds) = submesh.bounds().or(model_bounds) else {
            continue;
        };
        if let Some(handle) = insert_box(world, &bounds, &submesh.name) {
            result.colliders.push(handle);
            result.submesh_box_count += 1;
        }
    }

    crate::log(&format!(
        "Collider provisioning: model '{}' → {} trimesh, {} box fallback",
        model.name, result.trimesh_count, result.submesh_box_count
    ));

    result
}

fn insert_box(world: &mut CollisionWorld, bounds: &Aabb3, label: &str) -> Option<ColliderHandle> {
    let shape = ColliderShape::bounding_box(bounds);
    match world.create_static_collider(&shape, Transform::from_translation(bounds.center())) {
        Ok(handle) => Some(handle),
        Err(err) => {
            crate::log_error(&format!(
                "Collider provisioning: bounding box for '{}' rejected: {}",
                label, err
            ));
            None
        }
    }
}

/// Вся статика уровня: ground + модели
pub fn provision_level(world: &mut CollisionWorld, level: &LevelGeometry) -> ProvisionReport {
    let ground = if level.ground_half_size > 0.0 {
        match create_ground_plane(world, level.ground_half_size) {
            Ok(handle) => Some(handle),
            Err(err) => {
                crate::log_error(&format!("Collider provisioning: ground plane rejected: {}", err));
                None
            }
        }
    } else {
        None
    };

    let models = level
        .models
        .iter()
        .map(|model| provision_model(world, model))
        .collect();

    let report = ProvisionReport { ground, models };
    crate::log_info(&format!(
        "Level provisioned: {} static colliders",
        report.total_colliders()
    ));
    report
}

/// Startup система: LevelGeometry → коллайдеры + ProvisionReport
pub fn provision_level_system(
    mut commands: Commands,
    level: Option<Res<LevelGeometry>>,
    mut world: ResMut<CollisionWorld>,
) {
    let Some(level) = level else {
        return;
    };
    let report = provision_level(&mut world, &level);
    commands.insert_resource(report);
}
