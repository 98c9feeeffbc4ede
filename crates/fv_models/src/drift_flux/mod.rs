// crates/fv_models/src/drift_flux/mod.rs

//! # 漂移通量混合物闭合
//!
//! 连续相 c 与弥散相 d 的混合物，弥散相相对混合物的速度 `Udm`
//! 由相对速度模型给出：
//!
//! ```text
//! a   = g − (U·∇)U
//! Udm = UdmCoeff · a
//! τDm = βd Udm⊗Udm + βc Ucm⊗Ucm,   Ucm = βd Udm / βc,   β = α ρ
//! ```
//!
//! 堆积扩散模型给出高浓度区的附加扩散系数 `Dd = UdmCoeff σ′ / ρd`。
//!
//! 字典示例：
//!
//! ```text
//! rhoc        [1 -3 0 0 0 0 0] 996;
//! rhod        [1 -3 0 0 0 0 0] 1996;
//! alphaMax    0.62;
//! relativeVelocityModel   simple;
//! simpleCoeffs { Vc 2.86e-4; a 285.84; }
//! packingDispersionModel  Green;
//! ```

mod packing_dispersion;
mod relative_velocity;

pub use packing_dispersion::{Green, NoPackingDispersion, PackingDispersionModel};
pub use relative_velocity::{MichaelsBolger, RelativeVelocityModel, Simple};

use crate::field_ops::{at, combine, derive, map};
use fv_core::fields::{patch_types, VolSymmTensorField};
use fv_core::matrix::fvc;
use fv_core::{GeometricField, VolScalarField, VolVectorField};
use fv_foundation::dimension::{DIMLESS, DIM_ACCELERATION, DIM_DENSITY, DIM_TIME, DIM_VELOCITY};
use fv_foundation::value::VSMALL;
use fv_foundation::{Dictionary, Dimensioned, FvError, FvResult, Registry, SymmTensor, Vector};

// ============================================================================
// 混合物
// ============================================================================

/// 两相漂移通量混合物
#[derive(Debug, Clone)]
pub struct DriftFluxMixture {
    alphad: VolScalarField,
    rhoc: Dimensioned<f64>,
    rhod: Dimensioned<f64>,
    alpha_max: f64,
    u: VolVectorField,
}

impl DriftFluxMixture {
    pub fn new(
        alphad: VolScalarField,
        u: VolVectorField,
        rhoc: Dimensioned<f64>,
        rhod: Dimensioned<f64>,
        alpha_max: f64,
    ) -> FvResult<Self> {
        alphad.dimensions().check_same(&DIMLESS, "alphad")?;
        u.dimensions().check_same(&DIM_VELOCITY, "U")?;
        rhoc.dimensions.check_same(&DIM_DENSITY, "rhoc")?;
        rhod.dimensions.check_same(&DIM_DENSITY, "rhod")?;
        FvError::check_mesh(u.name(), alphad.mesh().id(), u.mesh().id())?;
        if !(alpha_max > 0.0 && alpha_max <= 1.0) {
            return Err(FvError::invalid_entry(
                "mixture",
                "alphaMax",
                alpha_max.to_string(),
                "必须在 (0, 1] 内",
            ));
        }
        Ok(Self {
            alphad,
            rhoc,
            rhod,
            alpha_max,
            u,
        })
    }

    /// 从字典读取密度与 `alphaMax`
    pub fn from_dict(dict: &Dictionary, alphad: VolScalarField, u: VolVectorField) -> FvResult<Self> {
        let rhoc = dict.lookup_dimensioned("rhoc", DIM_DENSITY)?;
        let rhod = dict.lookup_dimensioned("rhod", DIM_DENSITY)?;
        let alpha_max = dict.lookup("alphaMax")?;
        Self::new(alphad, u, rhoc, rhod, alpha_max)
    }

    #[inline]
    pub fn alphad(&self) -> &VolScalarField {
        &self.alphad
    }

    #[inline]
    pub fn alphad_mut(&mut self) -> &mut VolScalarField {
        &mut self.alphad
    }

    #[inline]
    pub fn u(&self) -> &VolVectorField {
        &self.u
    }

    #[inline]
    pub fn u_mut(&mut self) -> &mut VolVectorField {
        &mut self.u
    }

    #[inline]
    pub fn rhoc(&self) -> &Dimensioned<f64> {
        &self.rhoc
    }

    #[inline]
    pub fn rhod(&self) -> &Dimensioned<f64> {
        &self.rhod
    }

    #[inline]
    pub fn alpha_max(&self) -> f64 {
        self.alpha_max
    }

    /// 连续相体积分数 1 − αd
    pub fn alphac(&self) -> FvResult<VolScalarField> {
        map("alphac", &self.alphad, DIMLESS, |a| 1.0 - a)
    }

    /// 混合物密度 αd ρd + (1 − αd) ρc
    pub fn rho(&self) -> FvResult<VolScalarField> {
        let (rhoc, rhod) = (self.rhoc.value, self.rhod.value);
        map("rho", &self.alphad, DIM_DENSITY, |a| a * rhod + (1.0 - a) * rhoc)
    }
}

// ============================================================================
// 相对速度
// ============================================================================

/// 由系数字典、混合物与重力加速度构造相对速度模型
pub type RelativeVelocityConstructor =
    fn(&Dictionary, &DriftFluxMixture, &Dimensioned<Vector>) -> FvResult<Box<dyn RelativeVelocityModel>>;

pub type RelativeVelocityRegistry = Registry<RelativeVelocityConstructor>;

pub fn relative_velocity_registry() -> RelativeVelocityRegistry {
    let mut registry = RelativeVelocityRegistry::new("relativeVelocityModel");
    registry
        .register("simple", Simple::from_dict as RelativeVelocityConstructor)
        .register("MichaelsBolger", MichaelsBolger::from_dict as RelativeVelocityConstructor);
    registry
}

/// 相对速度 Udm 及其派生量
#[derive(Debug)]
pub struct RelativeVelocity {
    model: Box<dyn RelativeVelocityModel>,
    g: Dimensioned<Vector>,
    udm: VolVectorField,
}

impl RelativeVelocity {
    /// 按 `relativeVelocityModel` 选择模型，系数在 `<type>Coeffs` 中
    ///
    /// U 为固定值的补丁上 Udm 固定为零，其余补丁为 calculated。
    pub fn new(
        dict: &Dictionary,
        mixture: &DriftFluxMixture,
        g: Dimensioned<Vector>,
        registry: &RelativeVelocityRegistry,
    ) -> FvResult<Self> {
        g.dimensions.check_same(&DIM_ACCELERATION, "g")?;
        let type_name: String = dict.lookup("relativeVelocityModel")?;
        let ctor = registry.lookup(&type_name)?;
        let coeffs = dict.optional_sub_dict(&format!("{type_name}Coeffs"));
        let model = ctor(coeffs, mixture, &g)?;
        tracing::info!(model = %type_name, "选择相对速度模型");

        let u = mixture.u();
        let mesh = u.mesh();
        let mut types = patch_types(mesh, "calculated");
        for (ty, pf) in types.iter_mut().zip(u.boundary_field()) {
            if *ty == "calculated" && pf.fixes_value() {
                *ty = "fixedValue";
            }
        }
        let udm = GeometricField::new("Udm", std::sync::Arc::clone(mesh), DIM_VELOCITY, &types)?;
        Ok(Self { model, g, udm })
    }

    #[inline]
    pub fn model(&self) -> &dyn RelativeVelocityModel {
        self.model.as_ref()
    }

    #[inline]
    pub fn udm(&self) -> &VolVectorField {
        &self.udm
    }

    /// 相对速度系数 [s]
    pub fn udm_coeff(&self, mixture: &DriftFluxMixture) -> FvResult<VolScalarField> {
        self.model.udm_coeff(mixture)
    }

    /// 混合物加速度 g − (U·∇)U
    pub fn acceleration(&self, mixture: &DriftFluxMixture) -> FvResult<VolVectorField> {
        let u = mixture.u();
        let grad_u = fvc::grad(u)?;
        let g = self.g.value;
        combine("acceleration", u, &grad_u, DIM_ACCELERATION, |u, grad| g - grad.vec_dot(u))
    }

    /// Udm = UdmCoeff · a
    pub fn correct(&mut self, mixture: &DriftFluxMixture) -> FvResult<()> {
        let coeff = self.udm_coeff(mixture)?;
        let acc = self.acceleration(mixture)?;
        let udm = combine("Udm", &coeff, &acc, DIM_VELOCITY, |c, a| a * c)?;
        self.udm.assign(&udm)
    }

    /// 漂移应力 τDm
    pub fn tau_dm(&self, mixture: &DriftFluxMixture) -> FvResult<VolSymmTensorField> {
        let alphad = mixture.alphad();
        let (rhoc, rhod) = (mixture.rhoc().value, mixture.rhod().value);
        let dims = DIM_DENSITY * DIM_VELOCITY * DIM_VELOCITY;
        derive("tauDm", alphad.mesh(), dims, |s| {
            let a = at(alphad, s);
            let beta_d = a * rhod;
            let beta_c = ((1.0 - a) * rhoc).max(VSMALL);
            let udm = at(&self.udm, s);
            let ucm = udm * (beta_d / beta_c);
            SymmTensor::sqr(udm) * beta_d + SymmTensor::sqr(ucm) * beta_c
        })
    }

    /// ∇·τDm
    pub fn div_dev_tau(&self, mixture: &DriftFluxMixture) -> FvResult<VolVectorField> {
        let tau = self.tau_dm(mixture)?;
        let mut div = fvc::div(&tau)?;
        div.rename("divDevTau");
        Ok(div)
    }
}

/// 读取终端速度参数：`Vc` [s]，或 `V0` [m/s] 换算为 V0/|g|
pub(crate) fn read_vc(dict: &Dictionary, g: &Dimensioned<Vector>) -> FvResult<Dimensioned<f64>> {
    if dict.found("Vc") {
        return dict.lookup_dimensioned("Vc", DIM_TIME);
    }
    let v0: Dimensioned<f64> = dict.lookup_dimensioned("V0", DIM_VELOCITY)?;
    let mag_g = g.value.length();
    if mag_g <= 0.0 {
        return Err(FvError::invalid_entry(
            dict.name(),
            "V0",
            v0.value.to_string(),
            "|g| 为零, 无法换算 Vc",
        ));
    }
    Ok(Dimensioned::new("Vc", DIM_TIME, v0.value / mag_g))
}

// ============================================================================
// 堆积扩散
// ============================================================================

/// 由系数字典与混合物构造堆积扩散模型
pub type PackingDispersionConstructor =
    fn(&Dictionary, &DriftFluxMixture) -> FvResult<Box<dyn PackingDispersionModel>>;

pub type PackingDispersionRegistry = Registry<PackingDispersionConstructor>;

pub fn packing_dispersion_registry() -> PackingDispersionRegistry {
    let mut registry = PackingDispersionRegistry::new("packingDispersionModel");
    registry
        .register("none", NoPackingDispersion::from_dict as PackingDispersionConstructor)
        .register("Green", Green::from_dict as PackingDispersionConstructor);
    registry
}

/// 按 `packingDispersionModel` 选择，缺省为 `none`
pub fn new_packing_dispersion(
    dict: &Dictionary,
    mixture: &DriftFluxMixture,
    registry: &PackingDispersionRegistry,
) -> FvResult<Box<dyn PackingDispersionModel>> {
    let type_name: String = dict.lookup_or_default("packingDispersionModel", "none".to_string())?;
    let ctor = registry.lookup(&type_name)?;
    tracing::info!(model = %type_name, "选择堆积扩散模型");
    ctor(dict.optional_sub_dict(&format!("{type_name}Coeffs")), mixture)
}
