// crates/fv_models/src/turbulence/laminar.rs

use super::{MomentumTransportInputs, MomentumTransportModel};
use fv_core::fields::{patch_types, VolSymmTensorField};
use fv_core::{GeometricField, SolutionControls, SurfaceScalarField, VolScalarField, VolVectorField};
use fv_foundation::dimension::{DIM_DISSIPATION, DIM_KINEMATIC_VISCOSITY, DIM_SPECIFIC_ENERGY};
use fv_foundation::{Dictionary, Dimensioned, FvResult};
use std::sync::Arc;

/// 层流：全部湍流量为零
#[derive(Debug, Clone)]
pub struct Laminar {
    nu: Dimensioned<f64>,
    nut: VolScalarField,
    k: VolScalarField,
    epsilon: VolScalarField,
    r: VolSymmTensorField,
}

impl Laminar {
    pub fn new(inputs: MomentumTransportInputs) -> FvResult<Self> {
        let mesh = inputs.mesh;
        let types = patch_types(&mesh, "calculated");
        Ok(Self {
            nu: inputs.nu,
            nut: GeometricField::new("nut", Arc::clone(&mesh), DIM_KINEMATIC_VISCOSITY, &types)?,
            k: GeometricField::new("k", Arc::clone(&mesh), DIM_SPECIFIC_ENERGY, &types)?,
            epsilon: GeometricField::new("epsilon", Arc::clone(&mesh), DIM_DISSIPATION, &types)?,
            r: GeometricField::new("R", mesh, DIM_SPECIFIC_ENERGY, &types)?,
        })
    }

    pub fn from_dict(
        _dict: &Dictionary,
        inputs: MomentumTransportInputs,
    ) -> FvResult<Box<dyn MomentumTransportModel>> {
        Ok(Box::new(Self::new(inputs)?))
    }
}

impl MomentumTransportModel for Laminar {
    fn type_name(&self) -> &'static str {
        "laminar"
    }

    fn nu(&self) -> &Dimensioned<f64> {
        &self.nu
    }

    fn nut(&self) -> &VolScalarField {
        &self.nut
    }

    fn k(&self) -> &VolScalarField {
        &self.k
    }

    fn epsilon(&self) -> &VolScalarField {
        &self.epsilon
    }

    fn r(&self) -> &VolSymmTensorField {
        &self.r
    }

    fn correct(
        &mut self,
        _u: &VolVectorField,
        _phi: &SurfaceScalarField,
        _controls: &SolutionControls,
    ) -> FvResult<()> {
        Ok(())
    }
}
