// crates/fv_models/src/drift_flux/relative_velocity.rs

//! 相对速度系数模型
//!
//! 两个模型都以 (ρc/ρ)·Vc 为尺度，差别在浓度修正：
//!
//! - `simple`: 10^(−a·max(αd, 0))
//! - `MichaelsBolger`: a0 + max(1 − αd/αmax, 0)^a1

use super::{read_vc, DriftFluxMixture};
use crate::field_ops::combine;
use fv_core::VolScalarField;
use fv_foundation::dimension::DIM_TIME;
use fv_foundation::{Dictionary, Dimensioned, FvResult, Vector};
use std::fmt;

/// 相对速度系数 UdmCoeff [s]
pub trait RelativeVelocityModel: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    fn udm_coeff(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField>;
}

/// (ρc/ρ)·Vc·f(αd)
fn scaled_coeff(
    mixture: &DriftFluxMixture,
    vc: f64,
    hindrance: impl Fn(f64) -> f64,
) -> FvResult<VolScalarField> {
    let rho = mixture.rho()?;
    let rhoc = mixture.rhoc().value;
    combine("UdmCoeff", mixture.alphad(), &rho, DIM_TIME, |alpha, rho| {
        rhoc / rho * vc * hindrance(alpha)
    })
}

// ============================================================================
// simple
// ============================================================================

#[derive(Debug, Clone)]
pub struct Simple {
    vc: Dimensioned<f64>,
    a: f64,
}

impl Simple {
    pub fn new(vc: Dimensioned<f64>, a: f64) -> Self {
        Self { vc, a }
    }

    /// 系数 `a` 与 `Vc`（或 `V0`）
    pub fn from_dict(
        dict: &Dictionary,
        _mixture: &DriftFluxMixture,
        g: &Dimensioned<Vector>,
    ) -> FvResult<Box<dyn RelativeVelocityModel>> {
        let a = dict.lookup("a")?;
        Ok(Box::new(Self::new(read_vc(dict, g)?, a)))
    }
}

impl RelativeVelocityModel for Simple {
    fn type_name(&self) -> &'static str {
        "simple"
    }

    fn udm_coeff(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField> {
        let a = self.a;
        scaled_coeff(mixture, self.vc.value, |alpha| 10f64.powf(-a * alpha.max(0.0)))
    }
}

// ============================================================================
// MichaelsBolger
// ============================================================================

#[derive(Debug, Clone)]
pub struct MichaelsBolger {
    vc: Dimensioned<f64>,
    a0: f64,
    a1: f64,
}

impl MichaelsBolger {
    pub const DEFAULT_A0: f64 = 0.0;
    pub const DEFAULT_A1: f64 = 4.65;

    pub fn new(vc: Dimensioned<f64>, a0: f64, a1: f64) -> Self {
        Self { vc, a0, a1 }
    }

    pub fn from_dict(
        dict: &Dictionary,
        _mixture: &DriftFluxMixture,
        g: &Dimensioned<Vector>,
    ) -> FvResult<Box<dyn RelativeVelocityModel>> {
        let a0 = dict.lookup_or_default("a0", Self::DEFAULT_A0)?;
        let a1 = dict.lookup_or_default("a1", Self::DEFAULT_A1)?;
        Ok(Box::new(Self::new(read_vc(dict, g)?, a0, a1)))
    }
}

impl RelativeVelocityModel for MichaelsBolger {
    fn type_name(&self) -> &'static str {
        "MichaelsBolger"
    }

    fn udm_coeff(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField> {
        let (a0, a1) = (self.a0, self.a1);
        let alpha_max = mixture.alpha_max();
        scaled_coeff(mixture, self.vc.value, |alpha| {
            a0 + (1.0 - alpha / alpha_max).max(0.0).powf(a1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::fields::patch_types;
    use fv_core::{FvMesh, GeometricField};
    use fv_foundation::dimension::{DIMLESS, DIM_VELOCITY};
    use fv_mesh::BoxMeshBuilder;
    use std::sync::Arc;

    fn mixture(alpha: f64) -> DriftFluxMixture {
        let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap());
        let types = patch_types(&mesh, "zeroGradient");
        let alphad = GeometricField::uniform(
            "alpha.d",
            Arc::clone(&mesh),
            &Dimensioned::new("alpha", DIMLESS, alpha),
            &types,
        )
        .unwrap();
        let u = GeometricField::new("U", mesh, DIM_VELOCITY, &types).unwrap();
        let dict = Dictionary::parse("mixture", "rhoc 1000; rhod 1000; alphaMax 0.5;").unwrap();
        DriftFluxMixture::from_dict(&dict, alphad, u).unwrap()
    }

    fn vc(v: f64) -> Dimensioned<f64> {
        Dimensioned::new("Vc", DIM_TIME, v)
    }

    #[test]
    fn test_simple_hindrance() {
        let m = mixture(0.01);
        let coeff = Simple::new(vc(2.0), 100.0).udm_coeff(&m).unwrap();
        for &c in coeff.primitive_field() {
            assert!((c - 0.2).abs() < 1e-12);
        }
    }

    #[test]
    fn test_michaels_bolger_vanishes_at_packing_limit() {
        let model = MichaelsBolger::new(vc(1.0), MichaelsBolger::DEFAULT_A0, MichaelsBolger::DEFAULT_A1);
        let packed = model.udm_coeff(&mixture(0.6)).unwrap();
        assert!(packed.primitive_field().iter().all(|&c| c == 0.0));

        let dilute = model.udm_coeff(&mixture(0.25)).unwrap();
        let expected = 0.5f64.powf(4.65);
        assert!(dilute.primitive_field().iter().all(|&c| (c - expected).abs() < 1e-12));
    }
}
