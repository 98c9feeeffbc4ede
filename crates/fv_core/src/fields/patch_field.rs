// crates/fv_core/src/fields/patch_field.rs

//! 补丁场（边界条件）
//!
//! 每个网格补丁一个 [`PatchField`]，保存补丁面值与边界条件类型。
//! 离散算子通过两组系数把边界条件注入矩阵：
//!
//! | 类型 | valueInternal | valueBoundary | gradientInternal | gradientBoundary |
//! |------|---------------|---------------|------------------|------------------|
//! | fixedValue / mapped | 0 | value | −δ | δ·value |
//! | zeroGradient / fixedInternalValue | 1 | 0 | 0 | 0 |
//! | fixedGradient | 1 | g/δ | 0 | g |
//! | cyclic | w | 1−w | −δ | δ |
//!
//! δ 为补丁面差分系数，w 为插值权重。calculated 类型没有系数，
//! empty 类型长度为 0，不参与任何计算。
//!
//! `update_coeffs` 置位 `updated`；`evaluate` 在未更新时先调用
//! `update_coeffs`，求值后清除 `updated` 与 `manipulated_matrix`。

use super::io::{read_field_entry, write_field_entry};
use super::surface::patch_len;
use crate::coupling::{
    new_patch_to_patch_method, MappedPatchBase, PatchToPatch, PatchToPatchMethod,
    PatchToPatchRegistry,
};
use crate::fv_mesh::FvMesh;
use crate::matrix::FvMatrix;
use crate::parallel::SerialCommunicator;
use fv_foundation::{Dictionary, FieldValue, FvError, FvResult, OStream, Registry, Vector};
use fv_mesh::{PatchKind, PrimitivePatch};
use std::sync::Arc;

// ============================================================================
// 构造参数与注册表
// ============================================================================

/// 补丁场构造参数
#[derive(Clone, Copy)]
pub struct PatchFieldArgs<'a, T: FieldValue> {
    pub mesh: &'a FvMesh,
    pub patch: usize,
    /// 所属场的单元值
    pub internal: &'a [T],
    /// mapped 类型使用的耦合方法注册表
    pub methods: &'a PatchToPatchRegistry,
    /// 给出时代替字典中的 `value`
    pub values: Option<&'a [T]>,
}

impl<'a, T: FieldValue> PatchFieldArgs<'a, T> {
    pub fn new(
        mesh: &'a FvMesh,
        patch: usize,
        internal: &'a [T],
        methods: &'a PatchToPatchRegistry,
    ) -> Self {
        Self {
            mesh,
            patch,
            internal,
            methods,
            values: None,
        }
    }

    pub fn with_values(mut self, values: &'a [T]) -> Self {
        self.values = Some(values);
        self
    }

    fn size(&self) -> usize {
        patch_len(self.mesh, self.patch)
    }
}

/// 由字典构造补丁场
pub type PatchFieldConstructor<T> =
    fn(&PatchFieldArgs<'_, T>, &Dictionary) -> FvResult<PatchField<T>>;

/// 补丁场注册表
pub type PatchFieldRegistry<T> = Registry<PatchFieldConstructor<T>>;

/// 包含全部内置类型的注册表
pub fn patch_field_registry<T: FieldValue>() -> PatchFieldRegistry<T> {
    let mut registry = PatchFieldRegistry::<T>::new("patchField");
    registry
        .register("calculated", new_calculated::<T> as PatchFieldConstructor<T>)
        .register("fixedValue", new_fixed_value::<T> as PatchFieldConstructor<T>)
        .register("fixedGradient", new_fixed_gradient::<T> as PatchFieldConstructor<T>)
        .register("zeroGradient", new_zero_gradient::<T> as PatchFieldConstructor<T>)
        .register("cyclic", new_cyclic::<T> as PatchFieldConstructor<T>)
        .register("mapped", new_mapped::<T> as PatchFieldConstructor<T>)
        .register(
            "fixedInternalValue",
            new_fixed_internal_value::<T> as PatchFieldConstructor<T>,
        )
        .register("empty", new_empty::<T> as PatchFieldConstructor<T>);
    registry
}

/// 按字典中的 `type` 构造补丁场
pub fn new_patch_field<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
    registry: &PatchFieldRegistry<T>,
) -> FvResult<PatchField<T>> {
    let type_name: String = dict.lookup("type")?;
    check_constraint(args.mesh, args.patch, &type_name, dict.name())?;
    let ctor = registry.lookup(&type_name)?;
    ctor(args, dict)
}

/// 约束补丁必须使用的补丁场类型
pub fn constraint_type(kind: &PatchKind) -> Option<&'static str> {
    match kind {
        PatchKind::Cyclic { .. } => Some("cyclic"),
        PatchKind::Empty => Some("empty"),
        _ => None,
    }
}

fn check_constraint(mesh: &FvMesh, patch: usize, type_name: &str, scope: &str) -> FvResult<()> {
    let kind = mesh.patch(patch).kind();
    let required = constraint_type(kind);
    let is_constraint_type = matches!(type_name, "cyclic" | "empty");
    match required {
        Some(req) if req != type_name => Err(FvError::invalid_entry(
            scope,
            "type",
            type_name,
            format!("{} 补丁只能使用 {} 补丁场", kind.type_name(), req),
        )),
        None if is_constraint_type => Err(FvError::invalid_entry(
            scope,
            "type",
            type_name,
            format!("补丁类型为 {}", kind.type_name()),
        )),
        _ => Ok(()),
    }
}

fn read_value<T: FieldValue>(args: &PatchFieldArgs<'_, T>, dict: &Dictionary) -> FvResult<Vec<T>> {
    if let Some(values) = args.values {
        FvError::check_size(dict.name(), args.size(), values.len())?;
        return Ok(values.to_vec());
    }
    if !dict.found("value") {
        return Err(FvError::missing_entry(dict.name(), "value"));
    }
    read_field_entry(dict, "value", args.size())
}

/// 由单元值求出的补丁值被显式给出的存储值覆盖（二进制记录）
fn keep_stored_values<T: FieldValue>(
    mut field: PatchField<T>,
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    if let Some(values) = args.values {
        FvError::check_size(dict.name(), args.size(), values.len())?;
        field.values = values.to_vec();
    }
    Ok(field)
}

fn new_calculated<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    PatchField::calculated(args.mesh, args.patch, read_value(args, dict)?)
}

fn new_fixed_value<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    PatchField::fixed_value(args.mesh, args.patch, read_value(args, dict)?)
}

fn new_fixed_gradient<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    let gradient = read_field_entry(dict, "gradient", args.size())?;
    let mut field = PatchField::fixed_gradient(args.mesh, args.patch, args.internal, gradient)?;
    if args.values.is_some() || dict.found("value") {
        field.values = read_value(args, dict)?;
    }
    Ok(field)
}

fn new_zero_gradient<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    let field = PatchField::zero_gradient(args.mesh, args.patch, args.internal)?;
    keep_stored_values(field, args, dict)
}

fn new_cyclic<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    let field = PatchField::cyclic(args.mesh, args.patch, args.internal)?;
    keep_stored_values(field, args, dict)
}

fn new_mapped<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    let patch_name = args.mesh.patch(args.patch).name();
    let base = MappedPatchBase::from_dict(patch_name, dict, args.mesh)?;
    base.validate_for(args.mesh, false)?;
    let method = new_patch_to_patch_method(base.method(), dict, args.methods)?;
    let values = read_value(args, dict)?;
    PatchField::mapped(args.mesh, args.patch, MappedCoupling::new(base, method), values)
}

fn new_fixed_internal_value<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    let field = PatchField::fixed_internal_value(args.mesh, args.patch, args.internal)?;
    keep_stored_values(field, args, dict)
}

fn new_empty<T: FieldValue>(
    args: &PatchFieldArgs<'_, T>,
    _dict: &Dictionary,
) -> FvResult<PatchField<T>> {
    PatchField::empty(args.mesh, args.patch)
}

// ============================================================================
// mapped 耦合
// ============================================================================

/// mapped 补丁场的采样状态：配置、耦合方法和已建立的耦合
#[derive(Debug, Clone)]
pub struct MappedCoupling {
    base: MappedPatchBase,
    method: Arc<dyn PatchToPatchMethod>,
    coupling: Option<PatchToPatch>,
}

impl MappedCoupling {
    pub fn new(base: MappedPatchBase, method: Arc<dyn PatchToPatchMethod>) -> Self {
        Self {
            base,
            method,
            coupling: None,
        }
    }

    #[inline]
    pub fn base(&self) -> &MappedPatchBase {
        &self.base
    }

    /// 耦合是否已建立
    #[inline]
    pub fn is_coupled(&self) -> bool {
        self.coupling.is_some()
    }

    /// 建立本补丁（源）与对侧补丁（目标）的耦合
    fn couple(&mut self, mesh: &FvMesh, patch: usize) -> FvResult<&PatchToPatch> {
        if self.coupling.is_none() {
            let src = PrimitivePatch::from_patch(mesh.poly(), patch);
            let tgt = self.base.neighbour_faces(mesh)?;
            let reverse = average_normal(&src).dot(average_normal(&tgt)) < 0.0;
            let mut coupling = PatchToPatch::new(Arc::clone(&self.method), reverse);
            coupling.update(&src, &tgt, &SerialCommunicator)?;
            tracing::debug!(
                patch = self.base.patch_name(),
                neighbour = self.base.neighbour_patch(),
                reverse,
                "建立映射耦合"
            );
            self.coupling = Some(coupling);
        }
        self.coupling
            .as_ref()
            .ok_or_else(|| FvError::internal("映射耦合未建立"))
    }

    /// 采样对侧补丁相邻单元的值；未覆盖的面保留 `current`
    fn sample<T: FieldValue>(
        &mut self,
        mesh: &FvMesh,
        patch: usize,
        internal: &[T],
        current: &[T],
    ) -> FvResult<Vec<T>> {
        let nbr = self.base.validate_for(mesh, true)?;
        let nbr_values: Vec<T> = mesh
            .patch_face_cells(nbr)
            .iter()
            .map(|&c| internal[c])
            .collect();
        let coupling = self.couple(mesh, patch)?;
        coupling.tgt_to_src(&nbr_values, Some(current), &SerialCommunicator)
    }

    /// 网格移动后按策略作废耦合
    fn rebind(&mut self, old: &FvMesh, new: &FvMesh) -> FvResult<()> {
        if self.base.moving(old, new)? {
            self.coupling = None;
        }
        Ok(())
    }
}

fn average_normal(patch: &PrimitivePatch) -> Vector {
    patch
        .face_areas()
        .iter()
        .fold(Vector::ZERO, |acc, &s| acc + s)
        .normalize_or_zero()
}

// ============================================================================
// 补丁场
// ============================================================================

/// 边界条件类型
#[derive(Debug, Clone)]
pub enum PatchFieldKind<T: FieldValue> {
    /// 值由产生它的运算给定
    Calculated,
    FixedValue,
    FixedGradient { gradient: Vec<T> },
    ZeroGradient,
    /// 与对侧补丁逐面耦合
    Cyclic { neighbour_patch: usize },
    /// 固定值，由对侧补丁采样刷新
    Mapped(Box<MappedCoupling>),
    /// 零梯度，并把相邻单元固定在当前值
    FixedInternalValue,
    Empty,
}

/// 补丁场
#[derive(Debug, Clone)]
pub struct PatchField<T: FieldValue> {
    patch: usize,
    patch_name: String,
    values: Vec<T>,
    kind: PatchFieldKind<T>,
    updated: bool,
    manipulated_matrix: bool,
}

fn patch_internal<T: FieldValue>(mesh: &FvMesh, patch: usize, internal: &[T]) -> Vec<T> {
    mesh.patch_face_cells(patch)
        .iter()
        .map(|&c| internal[c])
        .collect()
}

impl<T: FieldValue> PatchField<T> {
    fn with_kind(
        mesh: &FvMesh,
        patch: usize,
        values: Vec<T>,
        kind: PatchFieldKind<T>,
    ) -> FvResult<Self> {
        let patch_name = mesh.patch(patch).name().to_string();
        FvError::check_size(&patch_name, patch_len(mesh, patch), values.len())?;
        Ok(Self {
            patch,
            patch_name,
            values,
            kind,
            updated: false,
            manipulated_matrix: false,
        })
    }

    pub fn calculated(mesh: &FvMesh, patch: usize, values: Vec<T>) -> FvResult<Self> {
        Self::with_kind(mesh, patch, values, PatchFieldKind::Calculated)
    }

    pub fn fixed_value(mesh: &FvMesh, patch: usize, values: Vec<T>) -> FvResult<Self> {
        Self::with_kind(mesh, patch, values, PatchFieldKind::FixedValue)
    }

    /// 固定梯度，面值由单元值外推
    pub fn fixed_gradient(
        mesh: &FvMesh,
        patch: usize,
        internal: &[T],
        gradient: Vec<T>,
    ) -> FvResult<Self> {
        let values = patch_internal(mesh, patch, internal);
        FvError::check_size("gradient", values.len(), gradient.len())?;
        let mut field = Self::with_kind(mesh, patch, values, PatchFieldKind::FixedGradient { gradient })?;
        field.evaluate(mesh, internal)?;
        Ok(field)
    }

    pub fn zero_gradient(mesh: &FvMesh, patch: usize, internal: &[T]) -> FvResult<Self> {
        let values = patch_internal(mesh, patch, internal);
        Self::with_kind(mesh, patch, values, PatchFieldKind::ZeroGradient)
    }

    pub fn fixed_internal_value(mesh: &FvMesh, patch: usize, internal: &[T]) -> FvResult<Self> {
        let values = patch_internal(mesh, patch, internal);
        Self::with_kind(mesh, patch, values, PatchFieldKind::FixedInternalValue)
    }

    /// 周期耦合，补丁必须为 cyclic
    pub fn cyclic(mesh: &FvMesh, patch: usize, internal: &[T]) -> FvResult<Self> {
        check_constraint(mesh, patch, "cyclic", mesh.patch(patch).name())?;
        let neighbour_patch = mesh.coupled_neighbour(patch).ok_or_else(|| {
            FvError::invalid_mesh(format!("cyclic 补丁 {} 没有对侧补丁", mesh.patch(patch).name()))
        })?;
        let mut field = Self::with_kind(
            mesh,
            patch,
            patch_internal(mesh, patch, internal),
            PatchFieldKind::Cyclic { neighbour_patch },
        )?;
        field.evaluate(mesh, internal)?;
        Ok(field)
    }

    /// empty 补丁场，补丁必须为 empty
    pub fn empty(mesh: &FvMesh, patch: usize) -> FvResult<Self> {
        check_constraint(mesh, patch, "empty", mesh.patch(patch).name())?;
        Self::with_kind(mesh, patch, Vec::new(), PatchFieldKind::Empty)
    }

    pub fn mapped(
        mesh: &FvMesh,
        patch: usize,
        coupling: MappedCoupling,
        values: Vec<T>,
    ) -> FvResult<Self> {
        Self::with_kind(mesh, patch, values, PatchFieldKind::Mapped(Box::new(coupling)))
    }

    /// 不读字典，按类型名构造；需要值的类型以相邻单元值初始化
    pub fn of_type(type_name: &str, mesh: &FvMesh, patch: usize, internal: &[T]) -> FvResult<Self> {
        let patch_name = mesh.patch(patch).name();
        check_constraint(mesh, patch, type_name, patch_name)?;
        let near = || patch_internal(mesh, patch, internal);
        match type_name {
            "calculated" => Self::calculated(mesh, patch, near()),
            "fixedValue" => Self::fixed_value(mesh, patch, near()),
            "fixedGradient" => Self::fixed_gradient(mesh, patch, internal, vec![T::zero(); near().len()]),
            "zeroGradient" => Self::zero_gradient(mesh, patch, internal),
            "fixedInternalValue" => Self::fixed_internal_value(mesh, patch, internal),
            "cyclic" => Self::cyclic(mesh, patch, internal),
            "empty" => Self::empty(mesh, patch),
            "mapped" => Err(FvError::missing_entry(patch_name, "neighbourPatch")),
            other => Err(FvError::unknown_type(
                "patchField",
                other,
                patch_field_registry::<T>()
                    .names()
                    .into_iter()
                    .map(String::from)
                    .collect(),
            )),
        }
    }

    /// 运算结果使用的类型：约束补丁保持约束类型，其余为 calculated
    pub fn calculated_type(kind: &PatchKind) -> &'static str {
        constraint_type(kind).unwrap_or("calculated")
    }

    // =========================================================================
    // 访问
    // =========================================================================

    pub fn type_name(&self) -> &'static str {
        match self.kind {
            PatchFieldKind::Calculated => "calculated",
            PatchFieldKind::FixedValue => "fixedValue",
            PatchFieldKind::FixedGradient { .. } => "fixedGradient",
            PatchFieldKind::ZeroGradient => "zeroGradient",
            PatchFieldKind::Cyclic { .. } => "cyclic",
            PatchFieldKind::Mapped(_) => "mapped",
            PatchFieldKind::FixedInternalValue => "fixedInternalValue",
            PatchFieldKind::Empty => "empty",
        }
    }

    #[inline]
    pub fn patch(&self) -> usize {
        self.patch
    }

    #[inline]
    pub fn patch_name(&self) -> &str {
        &self.patch_name
    }

    #[inline]
    pub fn kind(&self) -> &PatchFieldKind<T> {
        &self.kind
    }

    #[inline]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// 直接修改面值，不检查是否可赋值
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

    #[inline]
    pub fn updated(&self) -> bool {
        self.updated
    }

    #[inline]
    pub fn manipulated_matrix(&self) -> bool {
        self.manipulated_matrix
    }

    /// 普通赋值是否生效；固定值类不可赋值
    pub fn assignable(&self) -> bool {
        !matches!(self.kind, PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_))
    }

    /// 是否与对侧补丁耦合
    pub fn is_coupled(&self) -> bool {
        matches!(self.kind, PatchFieldKind::Cyclic { .. })
    }

    /// 是否固定面值
    pub fn fixes_value(&self) -> bool {
        matches!(self.kind, PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_))
    }

    /// 固定梯度类型的梯度
    pub fn gradient(&self) -> Option<&[T]> {
        match &self.kind {
            PatchFieldKind::FixedGradient { gradient } => Some(gradient),
            _ => None,
        }
    }

    pub fn gradient_mut(&mut self) -> Option<&mut Vec<T>> {
        match &mut self.kind {
            PatchFieldKind::FixedGradient { gradient } => Some(gradient),
            _ => None,
        }
    }

    /// 检查两个补丁场属于同一补丁
    pub fn check(&self, other: &PatchField<T>) -> FvResult<()> {
        if self.patch != other.patch || self.values.len() != other.values.len() {
            return Err(FvError::internal(format!(
                "补丁场不属于同一补丁: {} 与 {}",
                self.patch_name, other.patch_name
            )));
        }
        Ok(())
    }

    // =========================================================================
    // 赋值
    // =========================================================================

    /// 普通赋值；不可赋值的类型保持不变
    pub fn assign(&mut self, values: &[T]) -> FvResult<()> {
        FvError::check_size(&self.patch_name, self.values.len(), values.len())?;
        if self.assignable() {
            self.values.copy_from_slice(values);
        }
        Ok(())
    }

    /// 强制赋值，覆盖固定值
    pub fn force_assign(&mut self, values: &[T]) -> FvResult<()> {
        FvError::check_size(&self.patch_name, self.values.len(), values.len())?;
        self.values.copy_from_slice(values);
        Ok(())
    }

    // =========================================================================
    // 求值
    // =========================================================================

    /// 相邻单元值
    pub fn patch_internal_field(&self, mesh: &FvMesh, internal: &[T]) -> Vec<T> {
        if matches!(self.kind, PatchFieldKind::Empty) {
            return Vec::new();
        }
        patch_internal(mesh, self.patch, internal)
    }

    /// 对侧单元值（仅耦合类型）
    pub fn patch_neighbour_field(&self, mesh: &FvMesh, internal: &[T]) -> FvResult<Vec<T>> {
        match self.kind {
            PatchFieldKind::Cyclic { neighbour_patch } => {
                Ok(patch_internal(mesh, neighbour_patch, internal))
            }
            _ => Err(self.unsupported("patchNeighbourField")),
        }
    }

    /// 更新系数；mapped 在此从对侧采样
    pub fn update_coeffs(&mut self, mesh: &FvMesh, internal: &[T]) -> FvResult<()> {
        if self.updated {
            return Ok(());
        }
        if let PatchFieldKind::Mapped(coupling) = &mut self.kind {
            self.values = coupling.sample(mesh, self.patch, internal, &self.values)?;
        }
        self.updated = true;
        Ok(())
    }

    /// 按类型计算面值
    pub fn evaluate(&mut self, mesh: &FvMesh, internal: &[T]) -> FvResult<()> {
        if !self.updated {
            self.update_coeffs(mesh, internal)?;
        }
        match &self.kind {
            PatchFieldKind::ZeroGradient | PatchFieldKind::FixedInternalValue => {
                self.values = patch_internal(mesh, self.patch, internal);
            }
            PatchFieldKind::FixedGradient { gradient } => {
                let dc = mesh.patch_delta_coeffs(self.patch);
                let near = patch_internal(mesh, self.patch, internal);
                self.values = near
                    .iter()
                    .zip(gradient)
                    .zip(dc)
                    .map(|((&p, &g), &d)| p + g * (1.0 / d))
                    .collect();
            }
            PatchFieldKind::Cyclic { neighbour_patch } => {
                let w = mesh.patch_weights(self.patch);
                let own = patch_internal(mesh, self.patch, internal);
                let nbr = patch_internal(mesh, *neighbour_patch, internal);
                self.values = own
                    .iter()
                    .zip(&nbr)
                    .zip(w)
                    .map(|((&o, &n), &w)| o * w + n * (1.0 - w))
                    .collect();
            }
            PatchFieldKind::Calculated
            | PatchFieldKind::FixedValue
            | PatchFieldKind::Mapped(_)
            | PatchFieldKind::Empty => {}
        }
        self.updated = false;
        self.manipulated_matrix = false;
        Ok(())
    }

    /// 面法向梯度
    pub fn sn_grad(&self, mesh: &FvMesh, internal: &[T]) -> FvResult<Vec<T>> {
        let dc = mesh.patch_delta_coeffs(self.patch);
        Ok(match &self.kind {
            PatchFieldKind::Empty => Vec::new(),
            PatchFieldKind::ZeroGradient | PatchFieldKind::FixedInternalValue => {
                vec![T::zero(); self.values.len()]
            }
            PatchFieldKind::FixedGradient { gradient } => gradient.clone(),
            PatchFieldKind::Cyclic { neighbour_patch } => {
                let own = patch_internal(mesh, self.patch, internal);
                let nbr = patch_internal(mesh, *neighbour_patch, internal);
                own.iter()
                    .zip(&nbr)
                    .zip(dc)
                    .map(|((&o, &n), &d)| (n - o) * d)
                    .collect()
            }
            PatchFieldKind::Calculated | PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_) => {
                let own = patch_internal(mesh, self.patch, internal);
                self.values
                    .iter()
                    .zip(&own)
                    .zip(dc)
                    .map(|((&v, &o), &d)| (v - o) * d)
                    .collect()
            }
        })
    }

    // =========================================================================
    // 矩阵系数
    // =========================================================================

    fn unsupported(&self, operation: &str) -> FvError {
        FvError::invalid_patch_operation(&self.patch_name, self.type_name(), operation)
    }

    /// 对流项对角系数
    pub fn value_internal_coeffs(&self, weights: &[f64]) -> FvResult<Vec<T>> {
        let n = self.values.len();
        Ok(match &self.kind {
            PatchFieldKind::Calculated => return Err(self.unsupported("valueInternalCoeffs")),
            PatchFieldKind::Empty => Vec::new(),
            PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_) => vec![T::zero(); n],
            PatchFieldKind::ZeroGradient
            | PatchFieldKind::FixedInternalValue
            | PatchFieldKind::FixedGradient { .. } => vec![T::one(); n],
            PatchFieldKind::Cyclic { .. } => weights.iter().map(|&w| T::one() * w).collect(),
        })
    }

    /// 对流项源系数
    pub fn value_boundary_coeffs(&self, mesh: &FvMesh, weights: &[f64]) -> FvResult<Vec<T>> {
        let n = self.values.len();
        Ok(match &self.kind {
            PatchFieldKind::Calculated => return Err(self.unsupported("valueBoundaryCoeffs")),
            PatchFieldKind::Empty => Vec::new(),
            PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_) => self.values.clone(),
            PatchFieldKind::ZeroGradient | PatchFieldKind::FixedInternalValue => vec![T::zero(); n],
            PatchFieldKind::FixedGradient { gradient } => gradient
                .iter()
                .zip(mesh.patch_delta_coeffs(self.patch))
                .map(|(&g, &d)| g * (1.0 / d))
                .collect(),
            PatchFieldKind::Cyclic { .. } => weights.iter().map(|&w| T::one() * (1.0 - w)).collect(),
        })
    }

    /// 扩散项对角系数
    pub fn gradient_internal_coeffs(&self, mesh: &FvMesh) -> FvResult<Vec<T>> {
        let n = self.values.len();
        let dc = mesh.patch_delta_coeffs(self.patch);
        Ok(match &self.kind {
            PatchFieldKind::Calculated => return Err(self.unsupported("gradientInternalCoeffs")),
            PatchFieldKind::Empty => Vec::new(),
            PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_) | PatchFieldKind::Cyclic { .. } => {
                dc.iter().map(|&d| T::one() * -d).collect()
            }
            PatchFieldKind::ZeroGradient
            | PatchFieldKind::FixedInternalValue
            | PatchFieldKind::FixedGradient { .. } => vec![T::zero(); n],
        })
    }

    /// 扩散项源系数
    pub fn gradient_boundary_coeffs(&self, mesh: &FvMesh) -> FvResult<Vec<T>> {
        let n = self.values.len();
        let dc = mesh.patch_delta_coeffs(self.patch);
        Ok(match &self.kind {
            PatchFieldKind::Calculated => return Err(self.unsupported("gradientBoundaryCoeffs")),
            PatchFieldKind::Empty => Vec::new(),
            PatchFieldKind::FixedValue | PatchFieldKind::Mapped(_) => self
                .values
                .iter()
                .zip(dc)
                .map(|(&v, &d)| v * d)
                .collect(),
            PatchFieldKind::Cyclic { .. } => dc.iter().map(|&d| T::one() * d).collect(),
            PatchFieldKind::ZeroGradient | PatchFieldKind::FixedInternalValue => vec![T::zero(); n],
            PatchFieldKind::FixedGradient { gradient } => gradient.clone(),
        })
    }

    /// 修改矩阵；fixedInternalValue 把相邻单元固定在当前值
    pub fn manipulate_matrix(
        &mut self,
        matrix: &mut FvMatrix<T>,
        mesh: &FvMesh,
        internal: &[T],
    ) -> FvResult<()> {
        if let PatchFieldKind::FixedInternalValue = self.kind {
            let cells = mesh.patch_face_cells(self.patch);
            let values = patch_internal(mesh, self.patch, internal);
            matrix.set_values(cells, &values)?;
        }
        self.manipulated_matrix = true;
        Ok(())
    }

    /// 网格移动后更新
    pub fn rebind(&mut self, old: &FvMesh, new: &FvMesh) -> FvResult<()> {
        if let PatchFieldKind::Mapped(coupling) = &mut self.kind {
            coupling.rebind(old, new)?;
        }
        self.updated = false;
        Ok(())
    }

    // =========================================================================
    // 写出
    // =========================================================================

    /// 写出全部条目
    pub fn write(&self, os: &mut OStream) {
        self.write_entries(os, true);
    }

    /// 写出条目；`include_value` 为假时省略 `value`
    pub fn write_entries(&self, os: &mut OStream, include_value: bool) {
        os.write_entry("type", self.type_name());
        let writes_value = match &self.kind {
            PatchFieldKind::Calculated | PatchFieldKind::FixedValue => true,
            PatchFieldKind::FixedGradient { gradient } => {
                write_field_entry(os, "gradient", gradient);
                true
            }
            PatchFieldKind::Mapped(coupling) => {
                coupling.base().write(os);
                true
            }
            PatchFieldKind::ZeroGradient
            | PatchFieldKind::Cyclic { .. }
            | PatchFieldKind::FixedInternalValue
            | PatchFieldKind::Empty => false,
        };
        if include_value && writes_value {
            write_field_entry(os, "value", &self.values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coupling::patch_to_patch_registry;
    use fv_foundation::Precision;
    use fv_mesh::{BoxMeshBuilder, BoxSide};

    fn box_mesh() -> FvMesh {
        let poly = BoxMeshBuilder::new(3, 2, 1, 3.0, 2.0, 1.0)
            .with_patch(BoxSide::XMin, "inlet", PatchKind::Mapped)
            .with_patch(BoxSide::XMax, "outlet", PatchKind::Patch)
            .build()
            .unwrap();
        FvMesh::new(poly).unwrap()
    }

    fn cell_x(mesh: &FvMesh) -> Vec<f64> {
        mesh.cell_centres().iter().map(|c| c.x).collect()
    }

    #[test]
    fn test_missing_value_names_dictionary() {
        let mesh = box_mesh();
        let internal = vec![0.0; mesh.n_cells()];
        let methods = patch_to_patch_registry();
        let registry = patch_field_registry::<f64>();
        let root = Dictionary::parse("T", "boundaryField { outlet { type fixedValue; } }").unwrap();
        let dict = root.sub_dict("boundaryField").unwrap().sub_dict("outlet").unwrap();
        let patch = mesh.poly().patch_index("outlet").unwrap();
        let args = PatchFieldArgs::new(&mesh, patch, &internal, &methods);
        match new_patch_field(&args, dict, &registry) {
            Err(FvError::MissingEntry { dictionary, key }) => {
                assert_eq!(dictionary, "T.boundaryField.outlet");
                assert_eq!(key, "value");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_lists_registered_names() {
        let mesh = box_mesh();
        let internal = vec![0.0; mesh.n_cells()];
        let methods = patch_to_patch_registry();
        let registry = patch_field_registry::<f64>();
        let dict = Dictionary::parse("outlet", "type slip;").unwrap();
        let args = PatchFieldArgs::new(&mesh, 1, &internal, &methods);
        match new_patch_field(&args, &dict, &registry) {
            Err(FvError::UnknownType { valid, .. }) => {
                assert!(valid.contains(&"fixedValue".to_string()));
                assert_eq!(valid.len(), 8);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_coefficients_by_type() {
        let mesh = box_mesh();
        let outlet = mesh.poly().patch_index("outlet").unwrap();
        let internal = cell_x(&mesh);
        let n = mesh.patch(outlet).size();
        let w = vec![1.0; n];
        let dc = mesh.patch_delta_coeffs(outlet).to_vec();

        let fv = PatchField::fixed_value(&mesh, outlet, vec![4.0; n]).unwrap();
        assert_eq!(fv.value_internal_coeffs(&w).unwrap(), vec![0.0; n]);
        assert_eq!(fv.value_boundary_coeffs(&mesh, &w).unwrap(), vec![4.0; n]);
        assert_eq!(fv.gradient_internal_coeffs(&mesh).unwrap()[0], -dc[0]);
        assert_eq!(fv.gradient_boundary_coeffs(&mesh).unwrap()[0], 4.0 * dc[0]);
        assert!(!fv.assignable());

        let zg = PatchField::zero_gradient(&mesh, outlet, &internal).unwrap();
        assert_eq!(zg.value_internal_coeffs(&w).unwrap(), vec![1.0; n]);
        assert_eq!(zg.gradient_boundary_coeffs(&mesh).unwrap(), vec![0.0; n]);

        let calc = PatchField::calculated(&mesh, outlet, vec![0.0; n]).unwrap();
        assert!(matches!(
            calc.gradient_internal_coeffs(&mesh),
            Err(FvError::InvalidPatchOperation { .. })
        ));
    }

    #[test]
    fn test_fixed_gradient_extrapolates() {
        let mesh = box_mesh();
        let outlet = mesh.poly().patch_index("outlet").unwrap();
        let internal = cell_x(&mesh);
        let n = mesh.patch(outlet).size();
        let pf = PatchField::fixed_gradient(&mesh, outlet, &internal, vec![2.0; n]).unwrap();
        // 单元中心 x = 2.5，到面距离 0.5
        for &v in pf.values() {
            assert!((v - 3.5).abs() < 1e-12);
        }
        assert_eq!(pf.sn_grad(&mesh, &internal).unwrap(), vec![2.0; n]);
    }

    #[test]
    fn test_evaluate_clears_flags() {
        let mesh = box_mesh();
        let outlet = mesh.poly().patch_index("outlet").unwrap();
        let internal = cell_x(&mesh);
        let mut pf = PatchField::zero_gradient(&mesh, outlet, &internal).unwrap();
        pf.update_coeffs(&mesh, &internal).unwrap();
        assert!(pf.updated());
        pf.evaluate(&mesh, &internal).unwrap();
        assert!(!pf.updated() && !pf.manipulated_matrix());
        assert!(pf.values().iter().all(|&v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn test_cyclic_interpolates_between_sides() {
        let poly = BoxMeshBuilder::new(4, 1, 1, 4.0, 1.0, 1.0)
            .with_cyclic(BoxSide::XMin)
            .build()
            .unwrap();
        let mesh = FvMesh::new(poly).unwrap();
        let internal = cell_x(&mesh);
        let xmin = mesh.poly().patch_index("xmin").unwrap();
        let pf = PatchField::cyclic(&mesh, xmin, &internal).unwrap();
        // 两侧单元 0.5 与 3.5，等距
        assert!((pf.values()[0] - 2.0).abs() < 1e-12);
        assert_eq!(pf.patch_neighbour_field(&mesh, &internal).unwrap(), vec![3.5]);
        assert!(PatchField::<f64>::of_type("zeroGradient", &mesh, xmin, &internal).is_err());
    }

    #[test]
    fn test_mapped_samples_translated_neighbour() {
        let mesh = box_mesh();
        let internal = cell_x(&mesh);
        let methods = patch_to_patch_registry();
        let registry = patch_field_registry::<f64>();
        let inlet = mesh.poly().patch_index("inlet").unwrap();
        let dict = Dictionary::parse(
            "inlet",
            "type mapped; neighbourPatch outlet; transformType translational; \
             separation (3 0 0); value uniform 0;",
        )
        .unwrap();
        let args = PatchFieldArgs::new(&mesh, inlet, &internal, &methods);
        let mut pf = new_patch_field(&args, &dict, &registry).unwrap();
        assert_eq!(pf.type_name(), "mapped");
        pf.evaluate(&mesh, &internal).unwrap();
        for &v in pf.values() {
            assert!((v - 2.5).abs() < 1e-10, "v = {v}");
        }

        let mut os = OStream::new(Precision::Exact);
        pf.write(&mut os);
        let back = Dictionary::parse("inlet", os.as_str()).unwrap();
        assert!(new_patch_field(&args, &back, &registry).is_ok());
    }
}
