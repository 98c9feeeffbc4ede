// crates/fv_core/src/fields/dimensioned.rs

//! 带量纲的单元场
//!
//! 每个单元一个值，附带量纲与所属网格。所有二元运算先检查网格 id、
//! 长度与量纲。

use crate::fv_mesh::FvMesh;
use fv_foundation::{DimensionSet, Dimensioned, FieldValue, FvError, FvResult};
use std::sync::Arc;

/// 带量纲的单元场
#[derive(Debug, Clone)]
pub struct DimensionedField<T: FieldValue> {
    name: String,
    mesh: Arc<FvMesh>,
    dimensions: DimensionSet,
    values: Vec<T>,
}

impl<T: FieldValue> DimensionedField<T> {
    /// 由单元值构造，长度必须等于单元数
    pub fn new(
        name: impl Into<String>,
        mesh: Arc<FvMesh>,
        dimensions: DimensionSet,
        values: Vec<T>,
    ) -> FvResult<Self> {
        let name = name.into();
        FvError::check_size(&name, mesh.n_cells(), values.len())?;
        Ok(Self {
            name,
            mesh,
            dimensions,
            values,
        })
    }

    /// 均匀场
    pub fn uniform(name: impl Into<String>, mesh: Arc<FvMesh>, value: &Dimensioned<T>) -> Self {
        let values = vec![value.value; mesh.n_cells()];
        Self {
            name: name.into(),
            mesh,
            dimensions: value.dimensions,
            values,
        }
    }

    /// 零场
    pub fn zeros(name: impl Into<String>, mesh: Arc<FvMesh>, dimensions: DimensionSet) -> Self {
        let values = vec![T::zero(); mesh.n_cells()];
        Self {
            name: name.into(),
            mesh,
            dimensions,
            values,
        }
    }

    // =========================================================================
    // 访问
    // =========================================================================

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

    pub fn set_dimensions(&mut self, dimensions: DimensionSet) {
        self.dimensions = dimensions;
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<T> {
        self.values
    }

    /// 替换网格；调用方负责检查拓扑一致
    pub(crate) fn set_mesh(&mut self, mesh: Arc<FvMesh>) {
        self.mesh = mesh;
    }

    // =========================================================================
    // 检查
    // =========================================================================

    /// 检查是否属于同一网格
    pub fn check_mesh(&self, mesh: &FvMesh) -> FvResult<()> {
        FvError::check_mesh(&self.name, self.mesh.id(), mesh.id())
    }

    /// 检查网格与量纲都一致
    pub fn check_compatible<U: FieldValue>(&self, other: &DimensionedField<U>, op: &str) -> FvResult<()> {
        FvError::check_mesh(other.name(), self.mesh.id(), other.mesh.id())?;
        FvError::check_size(other.name(), self.len(), other.len())?;
        self.dimensions.check_same(&other.dimensions, op)
    }

    // =========================================================================
    // 运算
    // =========================================================================

    pub fn add_assign(&mut self, other: &DimensionedField<T>) -> FvResult<()> {
        self.check_compatible(other, "+=")?;
        for (a, &b) in self.values.iter_mut().zip(&other.values) {
            *a += b;
        }
        Ok(())
    }

    pub fn sub_assign(&mut self, other: &DimensionedField<T>) -> FvResult<()> {
        self.check_compatible(other, "-=")?;
        for (a, &b) in self.values.iter_mut().zip(&other.values) {
            *a -= b;
        }
        Ok(())
    }

    /// 乘以标量场，量纲相乘
    pub fn mul_assign_scalar(&mut self, other: &DimensionedField<f64>) -> FvResult<()> {
        FvError::check_mesh(other.name(), self.mesh.id(), other.mesh().id())?;
        for (a, &s) in self.values.iter_mut().zip(other.values()) {
            *a = *a * s;
        }
        self.dimensions = self.dimensions * other.dimensions();
        Ok(())
    }

    /// 乘以无量纲常数
    pub fn scale(&mut self, factor: f64) {
        for v in &mut self.values {
            *v = *v * factor;
        }
    }

    /// 体积加权平均
    pub fn weighted_average(&self) -> T {
        let volumes = self.mesh.volumes();
        let total: f64 = volumes.iter().sum();
        if total <= 0.0 {
            return T::zero();
        }
        let mut sum = T::zero();
        for (&v, &vol) in self.values.iter().zip(volumes) {
            sum += v * vol;
        }
        sum * (1.0 / total)
    }
}

impl DimensionedField<f64> {
    /// 单元体积场
    pub fn volumes(mesh: Arc<FvMesh>) -> Self {
        let values = mesh.volumes().to_vec();
        Self {
            name: "V".into(),
            mesh,
            dimensions: fv_foundation::dimension::DIM_VOLUME,
            values,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::dimension::{DIMLESS, DIM_LENGTH, DIM_VELOCITY};
    use fv_mesh::BoxMeshBuilder;

    fn mesh() -> Arc<FvMesh> {
        Arc::new(FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap())
    }

    #[test]
    fn test_size_checked() {
        let err = DimensionedField::new("p", mesh(), DIMLESS, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, FvError::SizeMismatch { .. }));
    }

    #[test]
    fn test_add_checks_dimensions() {
        let m = mesh();
        let mut a = DimensionedField::<f64>::zeros("a", Arc::clone(&m), DIM_LENGTH);
        let b = DimensionedField::<f64>::zeros("b", Arc::clone(&m), DIM_VELOCITY);
        assert!(matches!(a.add_assign(&b), Err(FvError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_add_checks_mesh() {
        let mut a = DimensionedField::<f64>::zeros("a", mesh(), DIMLESS);
        let b = DimensionedField::<f64>::zeros("b", mesh(), DIMLESS);
        assert!(matches!(a.add_assign(&b), Err(FvError::MeshMismatch { .. })));
    }

    #[test]
    fn test_weighted_average() {
        let m = mesh();
        let mut f = DimensionedField::<f64>::zeros("f", Arc::clone(&m), DIMLESS);
        for (i, v) in f.values_mut().iter_mut().enumerate() {
            *v = i as f64;
        }
        assert!((f.weighted_average() - 3.5).abs() < 1e-12);
    }
}
