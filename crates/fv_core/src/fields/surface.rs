// crates/fv_core/src/fields/surface.rs

//! 面场
//!
//! 内部面一个值，另按补丁分块保存边界面值。empty 补丁的块长度为 0。

use crate::fv_mesh::FvMesh;
use fv_foundation::{DimensionSet, Dimensioned, FieldValue, FvError, FvResult};
use std::sync::Arc;

/// 面场
#[derive(Debug, Clone)]
pub struct SurfaceField<T: FieldValue> {
    name: String,
    mesh: Arc<FvMesh>,
    dimensions: DimensionSet,
    internal: Vec<T>,
    boundary: Vec<Vec<T>>,
}

/// 面通量等标量面场
pub type SurfaceScalarField = SurfaceField<f64>;

/// 补丁块长度：empty 补丁为 0
pub(crate) fn patch_len(mesh: &FvMesh, patch: usize) -> usize {
    if mesh.is_empty_patch(patch) {
        0
    } else {
        mesh.patch(patch).size()
    }
}

impl<T: FieldValue> SurfaceField<T> {
    /// 由分块值构造
    pub fn new(
        name: impl Into<String>,
        mesh: Arc<FvMesh>,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary: Vec<Vec<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&name, mesh.n_internal_faces(), internal.len())?;
        FvError::check_size(&format!("{name} 补丁数"), mesh.n_patches(), boundary.len())?;
        for (p, values) in boundary.iter().enumerate() {
            FvError::check_size(
                &format!("{}.{}", name, mesh.patch(p).name()),
                patch_len(&mesh, p),
                values.len(),
            )?;
        }
        Ok(Self {
            name,
            mesh,
            dimensions,
            internal,
            boundary,
        })
    }

    /// 均匀面场
    pub fn uniform(name: impl Into<String>, mesh: Arc<FvMesh>, value: &Dimensioned<T>) -> Self {
        let internal = vec![value.value; mesh.n_internal_faces()];
        let boundary = (0..mesh.n_patches())
            .map(|p| vec![value.value; patch_len(&mesh, p)])
            .collect();
        Self {
            name: name.into(),
            mesh,
            dimensions: value.dimensions,
            internal,
            boundary,
        }
    }

    /// 由逐面函数构造，`f(face)` 对内部面与非 empty 的边界面调用
    pub fn from_fn(
        name: impl Into<String>,
        mesh: Arc<FvMesh>,
        dimensions: DimensionSet,
        mut f: impl FnMut(usize) -> T,
    ) -> Self {
        let internal = (0..mesh.n_internal_faces()).map(&mut f).collect();
        let boundary = (0..mesh.n_patches())
            .map(|p| {
                if mesh.is_empty_patch(p) {
                    Vec::new()
                } else {
                    mesh.patch_range(p).map(&mut f).collect()
                }
            })
            .collect();
        Self {
            name: name.into(),
            mesh,
            dimensions,
            internal,
            boundary,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    #[inline]
    pub fn mesh(&self) -> &Arc<FvMesh> {
        &self.mesh
    }

    #[inline]
    pub fn dimensions(&self) -> DimensionSet {
        self.dimensions
    }

    /// 内部面值
    #[inline]
    pub fn internal(&self) -> &[T] {
        &self.internal
    }

    #[inline]
    pub fn internal_mut(&mut self) -> &mut [T] {
        &mut self.internal
    }

    /// 各补丁的边界面值
    #[inline]
    pub fn boundary(&self) -> &[Vec<T>] {
        &self.boundary
    }

    #[inline]
    pub fn patch(&self, patch: usize) -> &[T] {
        &self.boundary[patch]
    }

    #[inline]
    pub fn patch_mut(&mut self, patch: usize) -> &mut [T] {
        &mut self.boundary[patch]
    }

    /// 检查是否属于给定网格
    pub fn check_mesh(&self, mesh: &FvMesh) -> FvResult<()> {
        FvError::check_mesh(&self.name, mesh.id(), self.mesh.id())
    }

    /// 乘以无量纲常数
    pub fn scale(&mut self, factor: f64) {
        for v in self.internal.iter_mut().chain(self.boundary.iter_mut().flatten()) {
            *v = *v * factor;
        }
    }

    /// 逐面乘以标量面场，量纲相乘
    pub fn mul_assign_scalar(&mut self, other: &SurfaceField<f64>) -> FvResult<()> {
        other.check_mesh(&self.mesh)?;
        for (a, &s) in self.internal.iter_mut().zip(other.internal()) {
            *a = *a * s;
        }
        for (pa, pb) in self.boundary.iter_mut().zip(other.boundary()) {
            for (a, &s) in pa.iter_mut().zip(pb) {
                *a = *a * s;
            }
        }
        self.dimensions = self.dimensions * other.dimensions();
        Ok(())
    }
}
