// crates/fv_models/src/drift_flux/packing_dispersion.rs

//! 堆积扩散模型
//!
//! 高浓度区颗粒间压缩应力 σ(αd) 产生附加扩散，扩散系数
//! `Dd = UdmCoeff · σ′ / ρd`，σ′ 为 σ 对 αd 的导数。

use super::{DriftFluxMixture, RelativeVelocity};
use crate::field_ops::{combine, map};
use fv_core::VolScalarField;
use fv_foundation::dimension::{DIM_KINEMATIC_VISCOSITY, DIM_PRESSURE};
use fv_foundation::{Dictionary, Dimensioned, FvError, FvResult};
use std::fmt;

pub trait PackingDispersionModel: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &'static str;

    /// 压缩应力对体积分数的导数 σ′ [Pa]
    fn sigma_prime(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField>;

    /// 堆积扩散系数 Dd
    fn dd(&self, mixture: &DriftFluxMixture, relative_velocity: &RelativeVelocity) -> FvResult<VolScalarField> {
        let coeff = relative_velocity.udm_coeff(mixture)?;
        let sigma_prime = self.sigma_prime(mixture)?;
        let rhod = mixture.rhod().value;
        combine("Dd", &coeff, &sigma_prime, DIM_KINEMATIC_VISCOSITY, |c, s| c * s / rhod)
    }
}

/// 无堆积扩散
#[derive(Debug, Clone, Default)]
pub struct NoPackingDispersion;

impl NoPackingDispersion {
    pub fn from_dict(_dict: &Dictionary, _mixture: &DriftFluxMixture) -> FvResult<Box<dyn PackingDispersionModel>> {
        Ok(Box::new(Self))
    }
}

impl PackingDispersionModel for NoPackingDispersion {
    fn type_name(&self) -> &'static str {
        "none"
    }

    fn sigma_prime(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField> {
        map("sigmaPrime", mixture.alphad(), DIM_PRESSURE, |_| 0.0)
    }
}

/// Green 絮凝悬浮液压缩屈服应力
///
/// σ(αd) = σ0 ((αd/αgel)^n − 1)，αd ≤ αgel 时 σ′ = 0。
///
/// ```text
/// GreenCoeffs
/// {
///     sigma0      2.11e-3;
///     n           9;
///     alphaGel    0.1;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Green {
    sigma0: Dimensioned<f64>,
    n: f64,
    alpha_gel: f64,
}

impl Green {
    pub const DEFAULT_SIGMA0: f64 = 2.11e-3;
    pub const DEFAULT_N: f64 = 9.0;
    pub const DEFAULT_ALPHA_GEL: f64 = 0.1;

    pub fn new(sigma0: Dimensioned<f64>, n: f64, alpha_gel: f64) -> FvResult<Self> {
        if !(alpha_gel > 0.0) {
            return Err(FvError::invalid_entry(
                "GreenCoeffs",
                "alphaGel",
                alpha_gel.to_string(),
                "必须为正",
            ));
        }
        Ok(Self { sigma0, n, alpha_gel })
    }

    pub fn from_dict(dict: &Dictionary, _mixture: &DriftFluxMixture) -> FvResult<Box<dyn PackingDispersionModel>> {
        let sigma0 = dict.lookup_dimensioned_or_default("sigma0", DIM_PRESSURE, Self::DEFAULT_SIGMA0)?;
        let n = dict.lookup_or_default("n", Self::DEFAULT_N)?;
        let alpha_gel = dict.lookup_or_default("alphaGel", Self::DEFAULT_ALPHA_GEL)?;
        Ok(Box::new(Self::new(sigma0, n, alpha_gel)?))
    }
}

impl PackingDispersionModel for Green {
    fn type_name(&self) -> &'static str {
        "Green"
    }

    fn sigma_prime(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField> {
        let (sigma0, n, alpha_gel) = (self.sigma0.value, self.n, self.alpha_gel);
        map("sigmaPrime", mixture.alphad(), DIM_PRESSURE, |alpha| {
            if alpha > alpha_gel {
                sigma0 * n / alpha_gel * (alpha / alpha_gel).powf(n - 1.0)
            } else {
                0.0
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::{new_packing_dispersion, packing_dispersion_registry, relative_velocity_registry};
    use super::*;
    use fv_core::fields::patch_types;
    use fv_core::{FvMesh, GeometricField};
    use fv_foundation::dimension::{DIMLESS, DIM_ACCELERATION, DIM_VELOCITY};
    use fv_foundation::Vector;
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
        let dict = Dictionary::parse("mixture", "rhoc 1000; rhod 2000; alphaMax 0.6;").unwrap();
        DriftFluxMixture::from_dict(&dict, alphad, u).unwrap()
    }

    #[test]
    fn test_green_below_gel_point() {
        let dict = Dictionary::parse("drift", "packingDispersionModel Green;").unwrap();
        let model = new_packing_dispersion(&dict, &mixture(0.05), &packing_dispersion_registry()).unwrap();
        assert_eq!(model.type_name(), "Green");
        let s = model.sigma_prime(&mixture(0.05)).unwrap();
        assert!(s.primitive_field().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_green_above_gel_point() {
        let green = Green::new(Dimensioned::new("sigma0", DIM_PRESSURE, 1.0), 3.0, 0.1).unwrap();
        let s = green.sigma_prime(&mixture(0.2)).unwrap();
        // 1·3/0.1·2²
        assert!(s.primitive_field().iter().all(|&v| (v - 120.0).abs() < 1e-9));
    }

    #[test]
    fn test_dispersion_coefficient() {
        let m = mixture(0.2);
        let rv_dict = Dictionary::parse("drift", "relativeVelocityModel simple; simpleCoeffs { Vc 1e-2; a 0; }").unwrap();
        let g = Dimensioned::new("g", DIM_ACCELERATION, Vector::new(0.0, 0.0, -9.81));
        let rv = RelativeVelocity::new(&rv_dict, &m, g, &relative_velocity_registry()).unwrap();
        let green = Green::new(Dimensioned::new("sigma0", DIM_PRESSURE, 1.0), 3.0, 0.1).unwrap();
        let dd = green.dd(&m, &rv).unwrap();
        assert_eq!(dd.dimensions(), DIM_KINEMATIC_VISCOSITY);

        // ρ = 1200, UdmCoeff = 1000/1200·1e-2
        let expected = 1000.0 / 1200.0 * 1e-2 * 120.0 / 2000.0;
        assert!(dd.primitive_field().iter().all(|&v| (v - expected).abs() < 1e-12));
    }

    #[test]
    fn test_default_is_none() {
        let dict = Dictionary::parse("drift", "").unwrap();
        let model = new_packing_dispersion(&dict, &mixture(0.3), &packing_dispersion_registry()).unwrap();
        assert_eq!(model.type_name(), "none");
    }
}
