// crates/fv_models/src/field_ops.rs

//! 派生场构造
//!
//! 模型中的代数表达式（`Cmu*sqr(k)/epsilon` 之类）逐位置求值：
//! 每个单元一次，每个非空补丁的每个面一次。结果补丁为 calculated
//! （约束补丁保持约束类型）。

use fv_core::{FvMesh, GeometricField};
use fv_foundation::{DimensionSet, FieldValue, FvError, FvResult};
use std::sync::Arc;

/// 求值位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// 单元
    Cell(usize),
    /// 补丁 `patch` 上的第 `face` 个面
    Face { patch: usize, face: usize },
}

impl Site {
    /// 面所属单元；单元位置返回自身
    pub fn cell(self, mesh: &FvMesh) -> usize {
        match self {
            Site::Cell(c) => c,
            Site::Face { patch, face } => mesh.patch_face_cells(patch)[face],
        }
    }
}

/// 场在给定位置的值
#[inline]
pub fn at<T: FieldValue>(field: &GeometricField<T>, site: Site) -> T {
    match site {
        Site::Cell(c) => field.primitive_field()[c],
        Site::Face { patch, face } => field.patch_field(patch).values()[face],
    }
}

/// 逐位置构造场
pub fn derive<U, F>(
    name: impl Into<String>,
    mesh: &Arc<FvMesh>,
    dimensions: DimensionSet,
    f: F,
) -> FvResult<GeometricField<U>>
where
    U: FieldValue,
    F: Fn(Site) -> U,
{
    let internal = (0..mesh.n_cells()).map(|c| f(Site::Cell(c))).collect();
    let boundary = (0..mesh.n_patches())
        .map(|patch| {
            if mesh.is_empty_patch(patch) {
                return Vec::new();
            }
            (0..mesh.patch(patch).size())
                .map(|face| f(Site::Face { patch, face }))
                .collect()
        })
        .collect();
    GeometricField::calculated(name, Arc::clone(mesh), dimensions, internal, boundary)
}

/// 逐位置变换单个场
pub fn map<T, U, F>(
    name: impl Into<String>,
    field: &GeometricField<T>,
    dimensions: DimensionSet,
    f: F,
) -> FvResult<GeometricField<U>>
where
    T: FieldValue,
    U: FieldValue,
    F: Fn(T) -> U,
{
    derive(name, field.mesh(), dimensions, |s| f(at(field, s)))
}

/// 逐位置组合两个场
pub fn combine<A, B, U, F>(
    name: impl Into<String>,
    a: &GeometricField<A>,
    b: &GeometricField<B>,
    dimensions: DimensionSet,
    f: F,
) -> FvResult<GeometricField<U>>
where
    A: FieldValue,
    B: FieldValue,
    U: FieldValue,
    F: Fn(A, B) -> U,
{
    FvError::check_mesh(b.name(), a.mesh().id(), b.mesh().id())?;
    derive(name, a.mesh(), dimensions, |s| f(at(a, s), at(b, s)))
}
