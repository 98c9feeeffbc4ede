// crates/fv_models/src/turbulence/lrr.rs

//! Launder-Reece-Rodi 雷诺应力模型
//!
//! # 控制方程
//!
//! ```text
//! ∂ε/∂t + ∇·(φε) − ∇·(Dε∇ε) = Cε1 G ε/k − Cε2 ε²/k
//! ∂R/∂t + ∇·(φR) − ∇·(DR∇R) + C1 ε/k R = P − 2/3 (1 − C1) I ε − C2 dev(P)
//! ```
//!
//! 其中 `P = −twoSymm(R·∇U)`，`G = ½|tr P|`，
//! `DR = Cs k/ε R + ν I`，`Dε = Cε k/ε R + ν I`。
//!
//! 可选的壁面反射项：
//!
//! ```text
//! (3 Cμ^0.75 / κ)(√k / y) dev(symm((n·reflect) ⊗ n))
//! reflect = Cref1 R − Cref2 C2 (k/ε) dev(P)
//! ```
//!
//! # 默认系数
//!
//! | 参数 | 值 |
//! |------|-----|
//! | Cmu | 0.09 |
//! | C1 | 1.8 |
//! | C2 | 0.6 |
//! | Ceps1 | 1.44 |
//! | Ceps2 | 1.92 |
//! | Cs | 0.25 |
//! | Ceps | 0.15 |
//! | wallReflection | on |
//! | kappa | 0.41 |
//! | Cref1 | 0.5 |
//! | Cref2 | 0.3 |
//! | nutMaxCoeff | 1e5 |

use super::wall_dist::WallDistance;
use super::{isotropic, require, MomentumTransportInputs, MomentumTransportModel};
use crate::field_ops::{at, combine, derive, map};
use fv_core::fields::VolSymmTensorField;
use fv_core::matrix::{fvc, fvm};
use fv_core::{FvMesh, SolutionControls, SurfaceScalarField, VolScalarField, VolVectorField};
use fv_foundation::dimension::{DIM_DISSIPATION, DIM_KINEMATIC_VISCOSITY, DIM_SPECIFIC_ENERGY, DIM_TIME};
use fv_foundation::value::SMALL;
use fv_foundation::{Dictionary, Dimensioned, FvError, FvResult, OStream, SymmTensor, Tensor};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// 系数
// ============================================================================

/// LRR 模型系数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LrrCoeffs {
    #[serde(rename = "Cmu")]
    pub cmu: f64,
    #[serde(rename = "C1")]
    pub c1: f64,
    #[serde(rename = "C2")]
    pub c2: f64,
    #[serde(rename = "Ceps1")]
    pub ceps1: f64,
    #[serde(rename = "Ceps2")]
    pub ceps2: f64,
    #[serde(rename = "Cs")]
    pub cs: f64,
    #[serde(rename = "Ceps")]
    pub ceps: f64,
    #[serde(rename = "wallReflection")]
    pub wall_reflection: bool,
    pub kappa: f64,
    #[serde(rename = "Cref1")]
    pub cref1: f64,
    #[serde(rename = "Cref2")]
    pub cref2: f64,
    /// νt 上限系数：νt ≤ nutMaxCoeff·ν
    #[serde(rename = "nutMaxCoeff")]
    pub nut_max_coeff: f64,
}

impl Default for LrrCoeffs {
    fn default() -> Self {
        Self {
            cmu: 0.09,
            c1: 1.8,
            c2: 0.6,
            ceps1: 1.44,
            ceps2: 1.92,
            cs: 0.25,
            ceps: 0.15,
            wall_reflection: true,
            kappa: 0.41,
            cref1: 0.5,
            cref2: 0.3,
            nut_max_coeff: 1e5,
        }
    }
}

impl LrrCoeffs {
    /// 读取系数字典，缺失的条目取默认值
    pub fn from_dict(dict: &Dictionary) -> FvResult<Self> {
        let d = Self::default();
        Ok(Self {
            cmu: dict.lookup_or_default("Cmu", d.cmu)?,
            c1: dict.lookup_or_default("C1", d.c1)?,
            c2: dict.lookup_or_default("C2", d.c2)?,
            ceps1: dict.lookup_or_default("Ceps1", d.ceps1)?,
            ceps2: dict.lookup_or_default("Ceps2", d.ceps2)?,
            cs: dict.lookup_or_default("Cs", d.cs)?,
            ceps: dict.lookup_or_default("Ceps", d.ceps)?,
            wall_reflection: dict.lookup_or_default("wallReflection", d.wall_reflection)?,
            kappa: dict.lookup_or_default("kappa", d.kappa)?,
            cref1: dict.lookup_or_default("Cref1", d.cref1)?,
            cref2: dict.lookup_or_default("Cref2", d.cref2)?,
            nut_max_coeff: dict.lookup_or_default("nutMaxCoeff", d.nut_max_coeff)?,
        })
    }

    pub fn write(&self, os: &mut OStream) {
        os.write_scalar_entry("Cmu", self.cmu);
        os.write_scalar_entry("C1", self.c1);
        os.write_scalar_entry("C2", self.c2);
        os.write_scalar_entry("Ceps1", self.ceps1);
        os.write_scalar_entry("Ceps2", self.ceps2);
        os.write_scalar_entry("Cs", self.cs);
        os.write_scalar_entry("Ceps", self.ceps);
        os.write_entry("wallReflection", if self.wall_reflection { "on" } else { "off" });
        os.write_scalar_entry("kappa", self.kappa);
        os.write_scalar_entry("Cref1", self.cref1);
        os.write_scalar_entry("Cref2", self.cref2);
        os.write_scalar_entry("nutMaxCoeff", self.nut_max_coeff);
    }
}

// ============================================================================
// 模型
// ============================================================================

/// LRR 雷诺应力模型
#[derive(Debug, Clone)]
pub struct Lrr {
    coeffs: LrrCoeffs,
    turbulence: bool,
    nu: Dimensioned<f64>,
    r: VolSymmTensorField,
    epsilon: VolScalarField,
    k: VolScalarField,
    nut: VolScalarField,
    wall_distance: Option<WallDistance>,
}

impl Lrr {
    /// 由初始 R 与 ε 构造；先限制 R 的法向分量与 ε，再计算 k 与 νt
    pub fn new(
        coeffs: LrrCoeffs,
        nu: Dimensioned<f64>,
        r: VolSymmTensorField,
        epsilon: VolScalarField,
    ) -> FvResult<Self> {
        nu.dimensions.check_same(&DIM_KINEMATIC_VISCOSITY, "LRR nu")?;
        r.dimensions().check_same(&DIM_SPECIFIC_ENERGY, "LRR R")?;
        epsilon.dimensions().check_same(&DIM_DISSIPATION, "LRR epsilon")?;
        FvError::check_mesh(epsilon.name(), r.mesh().id(), epsilon.mesh().id())?;

        let k = half_trace(&r)?;
        let nut = derive("nut", r.mesh(), DIM_KINEMATIC_VISCOSITY, |_| 0.0)?;
        let mut model = Self {
            coeffs,
            turbulence: true,
            nu,
            r,
            epsilon,
            k,
            nut,
            wall_distance: None,
        };
        model.bound_normal_stress()?;
        model.k.force_assign(&half_trace(&model.r)?)?;
        model.bound_epsilon()?;
        model.correct_nut()?;
        tracing::debug!(coeffs = ?model.coeffs, "LRR 系数");
        Ok(model)
    }

    pub fn from_dict(
        dict: &Dictionary,
        inputs: MomentumTransportInputs,
    ) -> FvResult<Box<dyn MomentumTransportModel>> {
        let coeffs = LrrCoeffs::from_dict(dict.optional_sub_dict("LRRCoeffs"))?;
        let r = require(inputs.r, dict, "R")?;
        let epsilon = require(inputs.epsilon, dict, "epsilon")?;
        let mut model = Self::new(coeffs, inputs.nu, r, epsilon)?;
        model.turbulence = dict.lookup_or_default("turbulence", true)?;
        Ok(Box::new(model))
    }

    #[inline]
    pub fn coeffs(&self) -> &LrrCoeffs {
        &self.coeffs
    }

    fn mesh(&self) -> Arc<FvMesh> {
        Arc::clone(self.r.mesh())
    }

    // ------------------------------------------------------------------------
    // 限制与派生量
    // ------------------------------------------------------------------------

    /// R 的法向分量不低于 kMin
    pub fn bound_normal_stress(&mut self) -> FvResult<()> {
        let k_min = SMALL;
        let bounded = map("R", &self.r, self.r.dimensions(), |r: SymmTensor| SymmTensor {
            xx: r.xx.max(k_min),
            yy: r.yy.max(k_min),
            zz: r.zz.max(k_min),
            ..r
        })?;
        self.r.assign(&bounded)
    }

    /// ε ≥ Cμ k² / (nutMaxCoeff·ν)，从而 νt ≤ nutMaxCoeff·ν
    pub fn bound_epsilon(&mut self) -> FvResult<()> {
        let floor_coeff = self.coeffs.cmu / (self.coeffs.nut_max_coeff * self.nu.value);
        let bounded = combine("epsilon", &self.epsilon, &self.k, DIM_DISSIPATION, |eps, k| {
            eps.max(floor_coeff * k * k).max(SMALL)
        })?;
        self.epsilon.assign(&bounded)
    }

    /// νt = Cμ k² / ε
    pub fn correct_nut(&mut self) -> FvResult<()> {
        let cmu = self.coeffs.cmu;
        let nut = combine("nut", &self.k, &self.epsilon, DIM_KINEMATIC_VISCOSITY, |k, eps| {
            cmu * k * k / eps
        })?;
        self.nut.force_assign(&nut)
    }

    /// R 的扩散张量 Cs k/ε R + ν I
    pub fn dr_eff(&self) -> FvResult<VolSymmTensorField> {
        self.diffusivity("DREff", self.coeffs.cs)
    }

    /// ε 的扩散张量 Cε k/ε R + ν I
    pub fn depsilon_eff(&self) -> FvResult<VolSymmTensorField> {
        self.diffusivity("DepsilonEff", self.coeffs.ceps)
    }

    fn diffusivity(&self, name: &str, c: f64) -> FvResult<VolSymmTensorField> {
        let nu = self.nu.value;
        derive(name, self.r.mesh(), DIM_KINEMATIC_VISCOSITY, |s| {
            let ratio = at(&self.k, s) / at(&self.epsilon, s);
            at(&self.r, s) * (c * ratio) + isotropic(nu)
        })
    }

    // ------------------------------------------------------------------------
    // 输运方程
    // ------------------------------------------------------------------------

    fn solve_epsilon(
        &mut self,
        phi: &SurfaceScalarField,
        g: &VolScalarField,
        controls: &SolutionControls,
    ) -> FvResult<()> {
        let c = self.coeffs;
        let depsilon_eff = self.depsilon_eff()?;
        let source = derive("epsilonSource", self.epsilon.mesh(), DIM_DISSIPATION / DIM_TIME, |s| {
            c.ceps1 * at(g, s) * at(&self.epsilon, s) / at(&self.k, s)
        })?;
        let sink = combine("epsilonSink", &self.epsilon, &self.k, DIM_TIME.inv(), |eps, k| {
            c.ceps2 * eps / k
        })?;

        let ddt_scheme = controls.schemes.ddt;
        let div_scheme = controls.schemes.div_scheme(self.epsilon.name());
        let mut eqn = fvm::ddt(&mut self.epsilon, ddt_scheme)?;
        eqn.add_assign(&fvm::div(phi, &self.epsilon, div_scheme)?)?;
        eqn.sub_assign(&fvm::laplacian_symm_tensor(&depsilon_eff, &self.epsilon)?)?;
        eqn.add_assign(&fvm::sp(&sink, &self.epsilon)?)?;
        eqn.add_source(&source)?;

        eqn.relax_auto(&self.epsilon, controls)?;
        eqn.boundary_manipulate(&mut self.epsilon)?;
        eqn.solve(&mut self.epsilon, controls)?;
        self.bound_epsilon()
    }

    /// 壁面相邻单元的产生项迹不超过 G
    fn correct_wall_production(&self, p: &mut VolSymmTensorField, g: &VolScalarField) {
        let mesh = self.mesh();
        let g = g.primitive_field();
        let production = p.primitive_field_mut();
        for patch in 0..mesh.n_patches() {
            if !mesh.patch(patch).kind().is_wall() {
                continue;
            }
            for &c in mesh.patch_face_cells(patch) {
                let factor = (g[c] / (0.5 * production[c].tr().abs() + SMALL)).min(1.0);
                production[c] *= factor;
            }
        }
    }

    fn wall_reflection(&mut self, p: &VolSymmTensorField) -> FvResult<VolSymmTensorField> {
        let c = self.coeffs;
        let mesh = self.mesh();
        let mut wd = self
            .wall_distance
            .take()
            .unwrap_or_else(|| WallDistance::new(&mesh));
        wd.update(&mesh);

        let scale = 3.0 * c.cmu.powf(0.75) / c.kappa;
        let reflection = derive("wallReflection", &mesh, self.r.dimensions() / DIM_TIME, |s| {
            let cell = s.cell(&mesh);
            let n = wd.n()[cell];
            let k = at(&self.k, s);
            let reflect =
                at(&self.r, s) * c.cref1 - at(p, s).dev() * (c.cref2 * c.c2 * k / at(&self.epsilon, s));
            let coeff = scale * k.sqrt() / wd.y()[cell];
            Tensor::outer(reflect.dot_vec(n), n).symm().dev() * coeff
        });
        self.wall_distance = Some(wd);
        reflection
    }

    fn solve_r(
        &mut self,
        phi: &SurfaceScalarField,
        p: &VolSymmTensorField,
        controls: &SolutionControls,
    ) -> FvResult<()> {
        let c = self.coeffs;
        let dr_eff = self.dr_eff()?;
        let sink = combine("RSink", &self.epsilon, &self.k, DIM_TIME.inv(), |eps, k| c.c1 * eps / k)?;
        let source = derive("RSource", p.mesh(), p.dimensions(), |s| {
            let prod = at(p, s);
            prod - isotropic(2.0 / 3.0 * (1.0 - c.c1) * at(&self.epsilon, s)) - prod.dev() * c.c2
        })?;
        let reflection = if c.wall_reflection {
            Some(self.wall_reflection(p)?)
        } else {
            None
        };

        let ddt_scheme = controls.schemes.ddt;
        let div_scheme = controls.schemes.div_scheme(self.r.name());
        let mut eqn = fvm::ddt(&mut self.r, ddt_scheme)?;
        eqn.add_assign(&fvm::div(phi, &self.r, div_scheme)?)?;
        eqn.sub_assign(&fvm::laplacian_symm_tensor(&dr_eff, &self.r)?)?;
        eqn.add_assign(&fvm::sp(&sink, &self.r)?)?;
        eqn.add_source(&source)?;
        if let Some(reflection) = &reflection {
            eqn.add_explicit(reflection)?;
        }

        eqn.relax_auto(&self.r, controls)?;
        eqn.solve(&mut self.r, controls)?;
        Ok(())
    }
}

/// k = ½ tr R
fn half_trace(r: &VolSymmTensorField) -> FvResult<VolScalarField> {
    map("k", r, r.dimensions(), |r: SymmTensor| 0.5 * r.tr())
}

impl MomentumTransportModel for Lrr {
    fn type_name(&self) -> &'static str {
        "LRR"
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
        u: &VolVectorField,
        phi: &SurfaceScalarField,
        controls: &SolutionControls,
    ) -> FvResult<()> {
        if !self.turbulence {
            return Ok(());
        }

        let grad_u = fvc::grad(u)?;
        let mut p = combine("P", &self.r, &grad_u, self.r.dimensions() * grad_u.dimensions(), |r, g| {
            -r.dot_tensor(&g).two_symm()
        })?;
        let g = map("G", &p, p.dimensions(), |p: SymmTensor| 0.5 * p.tr().abs())?;

        self.solve_epsilon(phi, &g, controls)?;
        self.correct_wall_production(&mut p, &g);
        self.solve_r(phi, &p, controls)?;

        self.bound_normal_stress()?;
        self.k.force_assign(&half_trace(&self.r)?)?;
        self.correct_nut()?;
        tracing::debug!(
            k = ?self.k.min_max(),
            epsilon = ?self.epsilon.min_max(),
            "LRR 修正完成"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_core::fields::patch_types;
    use fv_core::GeometricField;
    use fv_mesh::{BoxMeshBuilder, BoxSide, PatchKind};

    fn channel() -> Arc<FvMesh> {
        let poly = BoxMeshBuilder::new(4, 4, 1, 2.0, 1.0, 0.25)
            .with_patch(BoxSide::YMin, "bottom", PatchKind::Wall)
            .with_patch(BoxSide::YMax, "top", PatchKind::Wall)
            .with_empty(BoxSide::ZMin, "frontAndBack")
            .build()
            .unwrap();
        Arc::new(FvMesh::new(poly).unwrap())
    }

    fn model(mesh: &Arc<FvMesh>, r0: SymmTensor, eps0: f64) -> Lrr {
        let types = patch_types(mesh, "zeroGradient");
        let r = GeometricField::uniform(
            "R",
            Arc::clone(mesh),
            &Dimensioned::new("R", DIM_SPECIFIC_ENERGY, r0),
            &types,
        )
        .unwrap();
        let epsilon = GeometricField::uniform(
            "epsilon",
            Arc::clone(mesh),
            &Dimensioned::new("epsilon", DIM_DISSIPATION, eps0),
            &types,
        )
        .unwrap();
        let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1e-5);
        Lrr::new(LrrCoeffs::default(), nu, r, epsilon).unwrap()
    }

    #[test]
    fn test_coeff_defaults_and_overrides() {
        let dict = Dictionary::parse("LRRCoeffs", "C1 2.0; wallReflection off;").unwrap();
        let c = LrrCoeffs::from_dict(&dict).unwrap();
        assert_eq!(c.c1, 2.0);
        assert!(!c.wall_reflection);
        assert_eq!(c.cmu, 0.09);
        assert_eq!(c.nut_max_coeff, 1e5);

        let mut os = OStream::new(fv_foundation::Precision::Exact);
        c.write(&mut os);
        let back = LrrCoeffs::from_dict(&Dictionary::parse("LRRCoeffs", os.as_str()).unwrap()).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_k_is_half_trace_and_nut_follows() {
        let mesh = channel();
        let m = model(&mesh, SymmTensor::new(0.2, 0.01, 0.0, 0.1, 0.0, 0.3), 0.5);
        for &k in m.k().primitive_field() {
            assert!((k - 0.3).abs() < 1e-14);
        }
        for &nut in m.nut().primitive_field() {
            assert!((nut - 0.09 * 0.09 / 0.5).abs() < 1e-14);
        }
    }

    #[test]
    fn test_epsilon_is_bounded_by_nut_max() {
        let mesh = channel();
        let m = model(&mesh, SymmTensor::IDENTITY * 2.0, 1e-20);
        // k = 3，ε 下限 = Cmu k² / (nutMaxCoeff ν)
        let floor = 0.09 * 9.0 / (1e5 * 1e-5);
        for &eps in m.epsilon().primitive_field() {
            assert!((eps - floor).abs() < 1e-12 * floor);
        }
        for &nut in m.nut().primitive_field() {
            assert!((nut - 1e5 * 1e-5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_negative_normal_stress_is_clipped() {
        let mesh = channel();
        let m = model(&mesh, SymmTensor::new(-1.0, 0.2, 0.0, 0.5, 0.0, 0.5), 1.0);
        assert!(m.r().primitive_field().iter().all(|r| r.xx >= SMALL && r.xy == 0.2));
    }

    #[test]
    fn test_diffusivity_is_isotropic_for_isotropic_stress() {
        let mesh = channel();
        let m = model(&mesh, SymmTensor::IDENTITY * (2.0 / 3.0), 0.1);
        let d = m.dr_eff().unwrap();
        // k = 1, k/ε = 10
        let expected = 0.25 * 10.0 * (2.0 / 3.0) + 1e-5;
        for t in d.primitive_field() {
            assert!((t.xx - expected).abs() < 1e-12);
            assert_eq!(t.xy, 0.0);
        }
    }
}
