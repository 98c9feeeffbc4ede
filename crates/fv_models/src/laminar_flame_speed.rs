// crates/fv_models/src/laminar_flame_speed.rs

//! 层流火焰速度
//!
//! ```text
//! laminarFlameSpeedCorrelation  constant;
//! constantCoeffs
//! {
//!     Su  [0 1 -1 0 0 0 0] 0.434;
//! }
//! ```

use fv_core::fields::patch_types;
use fv_core::{FvMesh, GeometricField, VolScalarField};
use fv_foundation::dimension::DIM_VELOCITY;
use fv_foundation::{Dictionary, Dimensioned, FvResult, Registry};
use std::fmt;
use std::sync::Arc;

/// 层流火焰速度模型
pub trait LaminarFlameSpeed: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    /// 单元与边界上的层流火焰速度 [m/s]
    fn su(&self) -> FvResult<VolScalarField>;
}

pub type LaminarFlameSpeedConstructor = fn(&Dictionary, &Arc<FvMesh>) -> FvResult<Box<dyn LaminarFlameSpeed>>;

pub type LaminarFlameSpeedRegistry = Registry<LaminarFlameSpeedConstructor>;

pub fn laminar_flame_speed_registry() -> LaminarFlameSpeedRegistry {
    let mut registry = LaminarFlameSpeedRegistry::new("laminarFlameSpeedCorrelation");
    registry.register("constant", Constant::from_dict as LaminarFlameSpeedConstructor);
    registry
}

/// 按 `laminarFlameSpeedCorrelation` 选择，系数在 `<type>Coeffs` 中
pub fn new_laminar_flame_speed(
    dict: &Dictionary,
    mesh: &Arc<FvMesh>,
    registry: &LaminarFlameSpeedRegistry,
) -> FvResult<Box<dyn LaminarFlameSpeed>> {
    let type_name: String = dict.lookup("laminarFlameSpeedCorrelation")?;
    let ctor = registry.lookup(&type_name)?;
    tracing::info!(model = %type_name, "选择层流火焰速度模型");
    ctor(dict.optional_sub_dict(&format!("{type_name}Coeffs")), mesh)
}

/// 常数火焰速度
#[derive(Debug, Clone)]
pub struct Constant {
    su: Dimensioned<f64>,
    mesh: Arc<FvMesh>,
}

impl Constant {
    pub fn new(su: Dimensioned<f64>, mesh: Arc<FvMesh>) -> FvResult<Self> {
        su.dimensions.check_same(&DIM_VELOCITY, "Su")?;
        Ok(Self { su, mesh })
    }

    pub fn from_dict(dict: &Dictionary, mesh: &Arc<FvMesh>) -> FvResult<Box<dyn LaminarFlameSpeed>> {
        let su = dict.lookup_dimensioned("Su", DIM_VELOCITY)?;
        tracing::debug!(su = su.value, "常数层流火焰速度");
        Ok(Box::new(Self::new(su, Arc::clone(mesh))?))
    }
}

impl LaminarFlameSpeed for Constant {
    fn type_name(&self) -> &'static str {
        "constant"
    }

    fn su(&self) -> FvResult<VolScalarField> {
        let types = patch_types(&self.mesh, "calculated");
        GeometricField::uniform("Su0", Arc::clone(&self.mesh), &self.su, &types)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::FvError;
    use fv_mesh::BoxMeshBuilder;

    fn mesh() -> Arc<FvMesh> {
        Arc::new(FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap())
    }

    #[test]
    fn test_constant_flame_speed() {
        let dict = Dictionary::parse(
            "combustionProperties",
            "laminarFlameSpeedCorrelation constant; constantCoeffs { Su [0 1 -1 0 0 0 0] 0.434; }",
        )
        .unwrap();
        let model = new_laminar_flame_speed(&dict, &mesh(), &laminar_flame_speed_registry()).unwrap();
        let su = model.su().unwrap();
        assert_eq!(su.dimensions(), DIM_VELOCITY);
        assert!(su.primitive_field().iter().all(|&v| v == 0.434));
        assert!(su.boundary_field().iter().all(|pf| pf.values().iter().all(|&v| v == 0.434)));
    }

    #[test]
    fn test_wrong_dimensions_rejected() {
        let dict = Dictionary::parse("c", "Su [0 1 0 0 0 0 0] 0.4;").unwrap();
        assert!(Constant::from_dict(&dict, &mesh()).is_err());
    }

    #[test]
    fn test_missing_su() {
        let dict = Dictionary::parse("c", "laminarFlameSpeedCorrelation constant;").unwrap();
        let err = new_laminar_flame_speed(&dict, &mesh(), &laminar_flame_speed_registry()).unwrap_err();
        assert!(matches!(err, FvError::MissingEntry { .. }));
    }
}
