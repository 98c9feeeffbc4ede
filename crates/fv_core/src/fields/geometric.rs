// crates/fv_core/src/fields/geometric.rs

//! 体积场
//!
//! 单元值（[`DimensionedField`]）加上每个网格补丁一个 [`PatchField`]。
//! 另外维护：
//!
//! - 旧时间层环形缓冲：每个时间步第一次修改前把当前值压入
//! - 前一次迭代的快照，供 `relax` 使用
//! - 事件计数，每次修改加一
//! - 可选的松弛因子覆盖
//!
//! 普通赋值与复合赋值不改变固定值类补丁；`force_assign` 覆盖全部补丁。

use super::dimensioned::DimensionedField;
use super::io::{self, FieldFormat, FieldRegistries};
use super::patch_field::PatchField;
use crate::config::SolutionControls;
use crate::fv_mesh::FvMesh;
use fv_foundation::{
    DimensionSet, Dimensioned, FieldValue, FvError, FvResult, SymmTensor, Tensor, Vector,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

/// 场值快照：单元值与各补丁面值
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSnapshot<T> {
    pub internal: Vec<T>,
    pub boundary: Vec<Vec<T>>,
}

/// 体积场
#[derive(Debug, Clone)]
pub struct GeometricField<T: FieldValue> {
    internal: DimensionedField<T>,
    boundary: Vec<PatchField<T>>,
    old_times: VecDeque<FieldSnapshot<T>>,
    n_old_levels: usize,
    time_index: usize,
    prev_iter: Option<FieldSnapshot<T>>,
    event_no: u64,
    relaxation_factor: Option<f64>,
}

pub type VolScalarField = GeometricField<f64>;
pub type VolVectorField = GeometricField<Vector>;
pub type VolSymmTensorField = GeometricField<SymmTensor>;
pub type VolTensorField = GeometricField<Tensor>;

/// 每个补丁的类型名：约束补丁用约束类型，其余用 `default`
pub fn patch_types(mesh: &FvMesh, default: &'static str) -> Vec<&'static str> {
    mesh.poly()
        .patches()
        .iter()
        .map(|p| super::patch_field::constraint_type(p.kind()).unwrap_or(default))
        .collect()
}

impl<T: FieldValue> GeometricField<T> {
    // =========================================================================
    // 构造
    // =========================================================================

    /// 零值场，补丁按类型名构造
    pub fn new(
        name: impl Into<String>,
        mesh: Arc<FvMesh>,
        dimensions: DimensionSet,
        patch_types: &[&str],
    ) -> FvResult<Self> {
        let internal = DimensionedField::zeros(name, mesh, dimensions);
        Self::with_patch_types(internal, patch_types)
    }

    /// 均匀场
    pub fn uniform(
        name: impl Into<String>,
        mesh: Arc<FvMesh>,
        value: &Dimensioned<T>,
        patch_types: &[&str],
    ) -> FvResult<Self> {
        let internal = DimensionedField::uniform(name, mesh, value);
        Self::with_patch_types(internal, patch_types)
    }

    fn with_patch_types(internal: DimensionedField<T>, patch_types: &[&str]) -> FvResult<Self> {
        let mesh = Arc::clone(internal.mesh());
        FvError::check_size(
            &format!("{} 补丁类型", internal.name()),
            mesh.n_patches(),
            patch_types.len(),
        )?;
        let boundary = patch_types
            .iter()
            .enumerate()
            .map(|(p, ty)| PatchField::of_type(ty, &mesh, p, internal.values()))
            .collect::<FvResult<Vec<_>>>()?;
        Self::from_components(internal.name().to_string(), internal, boundary)
    }

    /// 由单元场与补丁场组装
    pub fn from_components(
        name: impl Into<String>,
        mut internal: DimensionedField<T>,
        boundary: Vec<PatchField<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        let mesh = Arc::clone(internal.mesh());
        FvError::check_size(&format!("{name} 补丁数"), mesh.n_patches(), boundary.len())?;
        for (p, pf) in boundary.iter().enumerate() {
            if pf.patch() != p {
                return Err(FvError::invalid_entry(
                    &name,
                    "boundaryField",
                    pf.patch_name(),
                    format!("第 {p} 个补丁场属于补丁 {}", pf.patch()),
                ));
            }
        }
        internal.rename(name);
        Ok(Self {
            internal,
            boundary,
            old_times: VecDeque::new(),
            n_old_levels: 0,
            time_index: mesh.time_index(),
            prev_iter: None,
            event_no: 0,
            relaxation_factor: None,
        })
    }

    /// 运算结果：约束补丁保持约束类型，其余为 calculated
    pub fn calculated(
        name: impl Into<String>,
        mesh: Arc<FvMesh>,
        dimensions: DimensionSet,
        internal: Vec<T>,
        boundary_values: Vec<Vec<T>>,
    ) -> FvResult<Self> {
        let name = name.into();
        let internal = DimensionedField::new(name.clone(), Arc::clone(&mesh), dimensions, internal)?;
        FvError::check_size(&format!("{name} 补丁数"), mesh.n_patches(), boundary_values.len())?;
        let boundary = boundary_values
            .into_iter()
            .enumerate()
            .map(|(p, values)| match PatchField::<T>::calculated_type(mesh.patch(p).kind()) {
                "calculated" => PatchField::calculated(&mesh, p, values),
                ty => PatchField::of_type(ty, &mesh, p, internal.values()),
            })
            .collect::<FvResult<Vec<_>>>()?;
        Self::from_components(name, internal, boundary)
    }

    /// 复制并改名
    pub fn clone_named(&self, name: impl Into<String>) -> Self {
        let mut field = self.clone();
        field.rename(name);
        field
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.internal.rename(name);
    }

    /// 读取场文件（ASCII 或二进制）
    pub fn read(
        path: impl AsRef<Path>,
        mesh: Arc<FvMesh>,
        registries: &FieldRegistries<T>,
    ) -> FvResult<Self> {
        io::read_field(path, mesh, registries)
    }

    /// 写出场文件
    pub fn write(&self, path: impl AsRef<Path>, format: FieldFormat) -> FvResult<()> {
        io::write_field(self, path, format)
    }

    // =========================================================================
    // 访问
    // =========================================================================

    #[inline]
    pub fn name(&self) -> &str {
        self.internal.name()
    }

    #[inline]
    pub fn mesh(&self) -> &Arc<FvMesh> {
        self.internal.mesh()
    }

    #[inline]
    pub fn dimensions(&self) -> DimensionSet {
        self.internal.dimensions()
    }

    /// 单元值
    #[inline]
    pub fn primitive_field(&self) -> &[T] {
        self.internal.values()
    }

    /// 可写单元值；先保存旧时间层并增加事件计数
    pub fn primitive_field_mut(&mut self) -> &mut [T] {
        self.touch();
        self.internal.values_mut()
    }

    #[inline]
    pub fn internal_field(&self) -> &DimensionedField<T> {
        &self.internal
    }

    #[inline]
    pub fn boundary_field(&self) -> &[PatchField<T>] {
        &self.boundary
    }

    /// 可写补丁场；先保存旧时间层并增加事件计数
    pub fn boundary_field_mut(&mut self) -> &mut [PatchField<T>] {
        self.touch();
        &mut self.boundary
    }

    #[inline]
    pub fn patch_field(&self, patch: usize) -> &PatchField<T> {
        &self.boundary[patch]
    }

    /// 修改计数
    #[inline]
    pub fn event_no(&self) -> u64 {
        self.event_no
    }

    /// 当前值快照
    pub fn snapshot(&self) -> FieldSnapshot<T> {
        FieldSnapshot {
            internal: self.internal.values().to_vec(),
            boundary: self.boundary.iter().map(|pf| pf.values().to_vec()).collect(),
        }
    }

    fn touch(&mut self) {
        self.store_old_times();
        self.event_no += 1;
    }

    // =========================================================================
    // 旧时间层
    // =========================================================================

    /// 设置保留的旧时间层数
    pub fn with_old_time_levels(mut self, levels: usize) -> Self {
        self.set_old_time_levels(levels);
        self
    }

    pub fn set_old_time_levels(&mut self, levels: usize) {
        self.n_old_levels = self.n_old_levels.max(levels);
    }

    /// 进入新的时间步后第一次调用时，把当前值压入旧时间层
    pub fn store_old_times(&mut self) {
        let current = self.mesh().time_index();
        if current != self.time_index {
            if self.n_old_levels > 0 {
                let snapshot = self.snapshot();
                self.old_times.push_front(snapshot);
                self.old_times.truncate(self.n_old_levels);
            }
            self.time_index = current;
        }
    }

    /// 已保存的旧时间层数
    #[inline]
    pub fn n_old_times(&self) -> usize {
        self.old_times.len()
    }

    /// 第 `level` 层旧时间值（1 为上一步）；未保存时返回当前值
    pub fn old_time(&self, level: usize) -> FieldSnapshot<T> {
        match level.checked_sub(1).and_then(|i| self.old_times.get(i)) {
            Some(snapshot) => snapshot.clone(),
            None => self.snapshot(),
        }
    }

    /// 第 `level` 层旧时间的单元值
    pub fn old_time_internal(&self, level: usize) -> &[T] {
        match level.checked_sub(1).and_then(|i| self.old_times.get(i)) {
            Some(snapshot) => &snapshot.internal,
            None => self.internal.values(),
        }
    }

    // =========================================================================
    // 前次迭代与松弛
    // =========================================================================

    pub fn store_prev_iter(&mut self) {
        self.prev_iter = Some(self.snapshot());
    }

    #[inline]
    pub fn prev_iter(&self) -> Option<&FieldSnapshot<T>> {
        self.prev_iter.as_ref()
    }

    pub fn clear_prev_iter(&mut self) {
        self.prev_iter = None;
    }

    /// 覆盖控制文件中的场松弛因子
    pub fn set_relaxation_factor(&mut self, factor: Option<f64>) {
        self.relaxation_factor = factor;
    }

    #[inline]
    pub fn relaxation_factor(&self) -> Option<f64> {
        self.relaxation_factor
    }

    /// 与前次迭代值按 `alpha` 混合；alpha ≥ 1 或 ≤ 0 时不做任何事
    pub fn relax(&mut self, alpha: f64) -> FvResult<()> {
        if alpha >= 1.0 || alpha <= 0.0 {
            return Ok(());
        }
        let prev = self
            .prev_iter
            .take()
            .ok_or_else(|| FvError::not_stored(self.name(), "前次迭代值"))?;
        self.blend(&prev, alpha);
        self.prev_iter = Some(prev);
        Ok(())
    }

    /// 按控制文件选择松弛因子；未配置时不松弛
    pub fn relax_auto(&mut self, controls: &SolutionControls) -> FvResult<()> {
        let factor = self
            .relaxation_factor
            .or_else(|| controls.field_relaxation_factor(self.name()));
        match factor {
            Some(alpha) => self.relax(alpha),
            None => Ok(()),
        }
    }

    /// self = other + alpha·(self − other)，覆盖全部补丁
    pub fn relax_towards(&mut self, other: &GeometricField<T>, alpha: f64) -> FvResult<()> {
        self.check_compatible(other, "relax")?;
        let target = other.snapshot();
        self.blend(&target, alpha);
        Ok(())
    }

    fn blend(&mut self, base: &FieldSnapshot<T>, alpha: f64) {
        self.touch();
        for (v, &b) in self.internal.values_mut().iter_mut().zip(&base.internal) {
            *v = b + (*v - b) * alpha;
        }
        for (pf, pb) in self.boundary.iter_mut().zip(&base.boundary) {
            for (v, &b) in pf.values_mut().iter_mut().zip(pb) {
                *v = b + (*v - b) * alpha;
            }
        }
    }

    /// 最终迭代时返回 `<name>Final`
    pub fn select(&self, final_iteration: bool) -> String {
        if final_iteration {
            format!("{}Final", self.name())
        } else {
            self.name().to_string()
        }
    }

    // =========================================================================
    // 边界
    // =========================================================================

    /// 按补丁类型重新计算全部补丁值
    pub fn correct_boundary_conditions(&mut self) -> FvResult<()> {
        self.touch();
        let mesh = Arc::clone(self.internal.mesh());
        for pf in &mut self.boundary {
            pf.evaluate(&mesh, self.internal.values())?;
        }
        Ok(())
    }

    /// 换到移动后的网格；拓扑必须相同
    pub fn rebind_mesh(&mut self, mesh: Arc<FvMesh>) -> FvResult<()> {
        let old = Arc::clone(self.internal.mesh());
        if old.topology_id() != mesh.topology_id() {
            return Err(FvError::mesh_mismatch(
                self.name(),
                old.topology_id(),
                mesh.topology_id(),
            ));
        }
        for pf in &mut self.boundary {
            pf.rebind(&old, &mesh)?;
        }
        self.internal.set_mesh(mesh);
        Ok(())
    }

    /// 相邻单元值
    pub fn patch_internal_field(&self, patch: usize) -> Vec<T> {
        self.boundary[patch].patch_internal_field(self.mesh(), self.internal.values())
    }

    // =========================================================================
    // 运算
    // =========================================================================

    /// 检查网格与量纲一致
    pub fn check_compatible<U: FieldValue>(&self, other: &GeometricField<U>, op: &str) -> FvResult<()> {
        FvError::check_mesh(other.name(), self.mesh().id(), other.mesh().id())?;
        self.dimensions().check_same(&other.dimensions(), op)
    }

    fn check_dimensions(&self, dims: &DimensionSet, op: &str) -> FvResult<()> {
        self.dimensions().check_same(dims, op)
    }

    fn update_patches(&mut self, force: bool, mut f: impl FnMut(usize, &mut [T])) {
        for (p, pf) in self.boundary.iter_mut().enumerate() {
            if force || pf.assignable() {
                f(p, pf.values_mut());
            }
        }
    }

    fn combine(
        &mut self,
        other: &GeometricField<T>,
        op: &str,
        force: bool,
        f: impl Fn(&mut T, T),
    ) -> FvResult<()> {
        self.check_compatible(other, op)?;
        self.touch();
        for (a, &b) in self.internal.values_mut().iter_mut().zip(other.primitive_field()) {
            f(a, b);
        }
        self.update_patches(force, |p, values| {
            for (a, &b) in values.iter_mut().zip(other.boundary[p].values()) {
                f(a, b);
            }
        });
        Ok(())
    }

    fn apply(&mut self, force: bool, f: impl Fn(&mut T)) {
        self.touch();
        self.internal.values_mut().iter_mut().for_each(&f);
        self.update_patches(force, |_, values| values.iter_mut().for_each(&f));
    }

    pub fn add_assign(&mut self, other: &GeometricField<T>) -> FvResult<()> {
        self.combine(other, "+=", false, |a, b| *a += b)
    }

    pub fn sub_assign(&mut self, other: &GeometricField<T>) -> FvResult<()> {
        self.combine(other, "-=", false, |a, b| *a -= b)
    }

    /// 普通赋值：固定值类补丁保持不变
    pub fn assign(&mut self, other: &GeometricField<T>) -> FvResult<()> {
        self.combine(other, "=", false, |a, b| *a = b)
    }

    /// 强制赋值：覆盖全部补丁
    pub fn force_assign(&mut self, other: &GeometricField<T>) -> FvResult<()> {
        self.combine(other, "==", true, |a, b| *a = b)
    }

    pub fn add_assign_dimensioned(&mut self, value: &Dimensioned<T>) -> FvResult<()> {
        self.check_dimensions(&value.dimensions, "+=")?;
        let v = value.value;
        self.apply(false, |a| *a += v);
        Ok(())
    }

    pub fn sub_assign_dimensioned(&mut self, value: &Dimensioned<T>) -> FvResult<()> {
        self.check_dimensions(&value.dimensions, "-=")?;
        let v = value.value;
        self.apply(false, |a| *a -= v);
        Ok(())
    }

    pub fn assign_dimensioned(&mut self, value: &Dimensioned<T>) -> FvResult<()> {
        self.check_dimensions(&value.dimensions, "=")?;
        let v = value.value;
        self.apply(false, |a| *a = v);
        Ok(())
    }

    pub fn force_assign_dimensioned(&mut self, value: &Dimensioned<T>) -> FvResult<()> {
        self.check_dimensions(&value.dimensions, "==")?;
        let v = value.value;
        self.apply(true, |a| *a = v);
        Ok(())
    }

    /// 置零（可赋值补丁）
    pub fn assign_zero(&mut self) {
        self.apply(false, |a| *a = T::zero());
    }

    /// 乘以无量纲常数
    pub fn scale(&mut self, factor: f64) {
        self.apply(false, |a| *a = *a * factor);
    }

    pub fn negate(&mut self) {
        self.apply(true, |a| *a = -*a);
    }

    /// 乘以标量场，量纲相乘
    pub fn mul_assign_scalar(&mut self, other: &GeometricField<f64>) -> FvResult<()> {
        FvError::check_mesh(other.name(), self.mesh().id(), other.mesh().id())?;
        self.touch();
        for (a, &s) in self.internal.values_mut().iter_mut().zip(other.primitive_field()) {
            *a = *a * s;
        }
        self.update_patches(false, |p, values| {
            for (a, &s) in values.iter_mut().zip(other.boundary_field()[p].values()) {
                *a = *a * s;
            }
        });
        let dims = self.dimensions() * other.dimensions();
        self.internal.set_dimensions(dims);
        Ok(())
    }

    /// 除以标量场，量纲相除
    pub fn div_assign_scalar(&mut self, other: &GeometricField<f64>) -> FvResult<()> {
        FvError::check_mesh(other.name(), self.mesh().id(), other.mesh().id())?;
        self.touch();
        for (a, &s) in self.internal.values_mut().iter_mut().zip(other.primitive_field()) {
            *a = *a * (1.0 / s);
        }
        self.update_patches(false, |p, values| {
            for (a, &s) in values.iter_mut().zip(other.boundary_field()[p].values()) {
                *a = *a * (1.0 / s);
            }
        });
        let dims = self.dimensions() / other.dimensions();
        self.internal.set_dimensions(dims);
        Ok(())
    }

    /// 逐分量下界
    pub fn max(&mut self, lower: &Dimensioned<T>) -> FvResult<()> {
        self.check_dimensions(&lower.dimensions, "max")?;
        let b = lower.value;
        self.apply(true, |a| *a = a.max_cmpt(&b));
        Ok(())
    }

    /// 逐分量上界
    pub fn min(&mut self, upper: &Dimensioned<T>) -> FvResult<()> {
        self.check_dimensions(&upper.dimensions, "min")?;
        let b = upper.value;
        self.apply(true, |a| *a = a.min_cmpt(&b));
        Ok(())
    }

    /// 单元值与补丁值的逐分量最小、最大值
    pub fn min_max(&self) -> (T, T) {
        let mut values = self
            .primitive_field()
            .iter()
            .chain(self.boundary.iter().flat_map(|pf| pf.values().iter()));
        let Some(&first) = values.next() else {
            return (T::zero(), T::zero());
        };
        values.fold((first, first), |(lo, hi), v| (lo.min_cmpt(v), hi.max_cmpt(v)))
    }

    /// 以日志输出最小、最大值
    pub fn write_min_max(&self) {
        let (min, max) = self.min_max();
        tracing::info!(field = self.name(), min = ?min, max = ?max, "场值范围");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::dimension::{DIMLESS, DIM_LENGTH, DIM_TEMPERATURE};
    use fv_mesh::BoxMeshBuilder;

    fn mesh() -> Arc<FvMesh> {
        Arc::new(FvMesh::new(BoxMeshBuilder::new(3, 2, 1, 3.0, 2.0, 1.0).build().unwrap()).unwrap())
    }

    fn temperature(mesh: &Arc<FvMesh>) -> VolScalarField {
        let mut types = patch_types(mesh, "zeroGradient");
        types[0] = "fixedValue";
        let mut t = GeometricField::uniform(
            "T",
            Arc::clone(mesh),
            &Dimensioned::new("T", DIM_TEMPERATURE, 300.0),
            &types,
        )
        .unwrap();
        t.boundary_field_mut()[0].force_assign(&[400.0; 2]).unwrap();
        t
    }

    #[test]
    fn test_fixed_value_not_assignable() {
        let m = mesh();
        let mut t = temperature(&m);
        t.assign_dimensioned(&Dimensioned::new("T", DIM_TEMPERATURE, 10.0)).unwrap();
        assert_eq!(t.patch_field(0).values(), &[400.0, 400.0]);
        assert!(t.primitive_field().iter().all(|&v| v == 10.0));
        t.force_assign_dimensioned(&Dimensioned::new("T", DIM_TEMPERATURE, 10.0)).unwrap();
        assert_eq!(t.patch_field(0).values(), &[10.0, 10.0]);
    }

    #[test]
    fn test_dimension_and_mesh_checks() {
        let m = mesh();
        let mut t = temperature(&m);
        let l = GeometricField::<f64>::new("L", Arc::clone(&m), DIM_LENGTH, &patch_types(&m, "calculated")).unwrap();
        assert!(matches!(t.add_assign(&l), Err(FvError::DimensionMismatch { .. })));
        let other = temperature(&mesh());
        assert!(matches!(t.add_assign(&other), Err(FvError::MeshMismatch { .. })));
    }

    #[test]
    fn test_relax_without_prev_iter() {
        let m = mesh();
        let mut t = temperature(&m);
        assert!(t.relax(1.0).is_ok());
        assert!(t.relax(0.0).is_ok());
        assert!(matches!(t.relax(0.5), Err(FvError::NotStored { .. })));
        t.store_prev_iter();
        t.primitive_field_mut()[0] = 500.0;
        t.relax(0.5).unwrap();
        assert_eq!(t.primitive_field()[0], 400.0);
    }

    #[test]
    fn test_relax_auto_override_first() {
        let m = mesh();
        let mut t = temperature(&m);
        let mut controls = SolutionControls::default();
        controls.relaxation_factors.fields.insert("T".into(), 0.5);
        controls.relaxation_factors.fields.insert("TFinal".into(), 1.0);
        t.store_prev_iter();
        t.primitive_field_mut()[0] = 500.0;
        controls.set_final_iteration(true);
        t.relax_auto(&controls).unwrap();
        assert_eq!(t.primitive_field()[0], 500.0);
        controls.set_final_iteration(false);
        t.set_relaxation_factor(Some(0.25));
        t.relax_auto(&controls).unwrap();
        assert_eq!(t.primitive_field()[0], 350.0);
        assert_eq!(t.select(true), "TFinal");
    }

    #[test]
    fn test_old_times_stored_once_per_step() {
        let m = mesh();
        let mut t = temperature(&m).with_old_time_levels(2);
        m.time().write().advance();
        t.primitive_field_mut()[0] = 1.0;
        t.primitive_field_mut()[0] = 2.0;
        assert_eq!(t.n_old_times(), 1);
        assert_eq!(t.old_time_internal(1)[0], 300.0);
        m.time().write().advance();
        t.primitive_field_mut()[0] = 3.0;
        assert_eq!(t.n_old_times(), 2);
        assert_eq!(t.old_time_internal(1)[0], 2.0);
        assert_eq!(t.old_time_internal(2)[0], 300.0);
        m.time().write().advance();
        t.correct_boundary_conditions().unwrap();
        assert_eq!(t.n_old_times(), 2);
        assert_eq!(t.old_time(2).internal[0], 2.0);
    }

    #[test]
    fn test_min_max_and_bounding() {
        let m = mesh();
        let mut t = temperature(&m);
        t.primitive_field_mut()[1] = -5.0;
        let (lo, hi) = t.min_max();
        assert_eq!((lo, hi), (-5.0, 400.0));
        t.max(&Dimensioned::new("Tmin", DIM_TEMPERATURE, 0.0)).unwrap();
        assert_eq!(t.min_max().0, 0.0);
        assert!(t.min(&Dimensioned::new("bad", DIMLESS, 0.0)).is_err());
    }

    #[test]
    fn test_rebind_requires_same_topology() {
        let m = mesh();
        let mut t = temperature(&m);
        let moved = Arc::new(m.moved(m.poly().points().iter().map(|p| *p * 2.0).collect()).unwrap());
        t.rebind_mesh(Arc::clone(&moved)).unwrap();
        assert_eq!(t.mesh().id(), moved.id());
        assert!(t.rebind_mesh(mesh()).is_err());
    }
}
