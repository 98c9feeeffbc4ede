// crates/fv_models/src/turbulence/mod.rs

//! # 动量输运（湍流）模型
//!
//! 按字典中的 `model` 选择：
//!
//! ```text
//! model       LRR;
//! turbulence  on;
//! LRRCoeffs
//! {
//!     Cmu     0.09;
//! }
//! ```
//!
//! | 模型 | 说明 |
//! |------|------|
//! | `laminar` | 无湍流，νt = 0 |
//! | `LRR` | Launder-Reece-Rodi 雷诺应力模型 |

mod laminar;
mod lrr;
pub mod wall_dist;

pub use laminar::Laminar;
pub use lrr::{Lrr, LrrCoeffs};
pub use wall_dist::WallDistance;

use fv_core::fields::VolSymmTensorField;
use fv_core::{FvMesh, SolutionControls, SurfaceScalarField, VolScalarField, VolVectorField};
use fv_foundation::{Dictionary, Dimensioned, FvError, FvResult, Registry, SymmTensor};
use std::fmt;
use std::sync::Arc;

// ============================================================================
// 接口
// ============================================================================

/// 动量输运模型
pub trait MomentumTransportModel: fmt::Debug + Send + Sync {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// 层流运动粘度
    fn nu(&self) -> &Dimensioned<f64>;

    /// 湍流粘度 νt
    fn nut(&self) -> &VolScalarField;

    /// 湍动能 k
    fn k(&self) -> &VolScalarField;

    /// 耗散率 ε
    fn epsilon(&self) -> &VolScalarField;

    /// 雷诺应力 R
    fn r(&self) -> &VolSymmTensorField;

    /// 有效粘度 ν + νt
    fn nu_eff(&self) -> FvResult<VolScalarField> {
        let nu = self.nu().value;
        crate::field_ops::map("nuEff", self.nut(), self.nut().dimensions(), |nut| nut + nu)
    }

    /// 以当前速度与通量推进湍流量
    fn correct(
        &mut self,
        u: &VolVectorField,
        phi: &SurfaceScalarField,
        controls: &SolutionControls,
    ) -> FvResult<()>;
}

/// 构造模型所需的场
#[derive(Debug, Clone)]
pub struct MomentumTransportInputs {
    pub mesh: Arc<FvMesh>,
    pub nu: Dimensioned<f64>,
    /// 雷诺应力初值，雷诺应力模型必需
    pub r: Option<VolSymmTensorField>,
    /// 耗散率初值，ε 类模型必需
    pub epsilon: Option<VolScalarField>,
}

impl MomentumTransportInputs {
    pub fn new(mesh: Arc<FvMesh>, nu: Dimensioned<f64>) -> Self {
        Self {
            mesh,
            nu,
            r: None,
            epsilon: None,
        }
    }

    pub fn with_r(mut self, r: VolSymmTensorField) -> Self {
        self.r = Some(r);
        self
    }

    pub fn with_epsilon(mut self, epsilon: VolScalarField) -> Self {
        self.epsilon = Some(epsilon);
        self
    }
}

// ============================================================================
// 注册表
// ============================================================================

/// 由模型字典与输入场构造
pub type MomentumTransportConstructor =
    fn(&Dictionary, MomentumTransportInputs) -> FvResult<Box<dyn MomentumTransportModel>>;

/// 动量输运模型注册表
pub type MomentumTransportRegistry = Registry<MomentumTransportConstructor>;

/// 内置模型注册表
pub fn momentum_transport_registry() -> MomentumTransportRegistry {
    let mut registry = MomentumTransportRegistry::new("momentumTransport");
    registry
        .register("laminar", Laminar::from_dict as MomentumTransportConstructor)
        .register("LRR", Lrr::from_dict as MomentumTransportConstructor);
    registry
}

/// 按字典中的 `model` 构造
pub fn new_momentum_transport(
    dict: &Dictionary,
    inputs: MomentumTransportInputs,
    registry: &MomentumTransportRegistry,
) -> FvResult<Box<dyn MomentumTransportModel>> {
    let model: String = dict.lookup("model")?;
    let ctor = registry.lookup(&model)?;
    tracing::info!(model = %model, "选择动量输运模型");
    ctor(dict, inputs)
}

/// 必需的输入场
pub(crate) fn require<T>(field: Option<T>, dict: &Dictionary, name: &str) -> FvResult<T> {
    field.ok_or_else(|| FvError::missing_entry(dict.name(), name))
}

/// 单位张量乘标量
#[inline]
pub(crate) fn isotropic(value: f64) -> SymmTensor {
    SymmTensor::IDENTITY * value
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::dimension::DIM_KINEMATIC_VISCOSITY;
    use fv_mesh::BoxMeshBuilder;

    #[test]
    fn test_unknown_model_lists_choices() {
        let registry = momentum_transport_registry();
        let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap());
        let inputs = MomentumTransportInputs::new(mesh, Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1e-5));
        let dict = Dictionary::parse("momentumTransport", "model kEpsilon;").unwrap();
        match new_momentum_transport(&dict, inputs, &registry) {
            Err(FvError::UnknownType { name, valid, .. }) => {
                assert_eq!(name, "kEpsilon");
                assert!(valid.iter().any(|v| v == "LRR"));
                assert!(valid.iter().any(|v| v == "laminar"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_lrr_requires_reynolds_stress() {
        let registry = momentum_transport_registry();
        let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap());
        let inputs = MomentumTransportInputs::new(mesh, Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1e-5));
        let dict = Dictionary::parse("momentumTransport", "model LRR;").unwrap();
        match new_momentum_transport(&dict, inputs, &registry) {
            Err(FvError::MissingEntry { key, .. }) => assert_eq!(key, "R"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
