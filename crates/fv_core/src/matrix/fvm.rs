// crates/fv_core/src/matrix/fvm.rs

//! 隐式离散算子
//!
//! 每个函数返回一个 [`FvMatrix`]，量纲为被离散项乘以体积。
//! 扩散项只含正交部分。

use super::fv_matrix::FvMatrix;
use crate::config::{DdtScheme, DivScheme};
use crate::fields::{GeometricField, SurfaceScalarField};
use crate::fv_mesh::FvMesh;
use fv_foundation::dimension::{DIM_LENGTH, DIM_TIME, DIM_VOLUME};
use fv_foundation::{DimensionSet, Dimensioned, FieldValue, FvError, FvResult, SymmTensor};
use std::sync::Arc;

/// 标量扩散系数
#[derive(Debug, Clone, Copy)]
pub enum Diffusivity<'a> {
    /// 均匀值
    Uniform(&'a Dimensioned<f64>),
    /// 单元场，线性插值到面
    Cell(&'a GeometricField<f64>),
    /// 面场
    Face(&'a SurfaceScalarField),
}

/// 面上的系数：内部面与各补丁
pub(crate) struct FaceCoeffs {
    pub internal: Vec<f64>,
    pub patches: Vec<Vec<f64>>,
}

impl Diffusivity<'_> {
    pub fn dimensions(&self) -> DimensionSet {
        match self {
            Diffusivity::Uniform(d) => d.dimensions,
            Diffusivity::Cell(f) => f.dimensions(),
            Diffusivity::Face(f) => f.dimensions(),
        }
    }

    /// 面上的扩散系数
    pub(crate) fn face_values(&self, mesh: &FvMesh) -> FvResult<FaceCoeffs> {
        Ok(match self {
            Diffusivity::Uniform(d) => FaceCoeffs {
                internal: vec![d.value; mesh.n_internal_faces()],
                patches: (0..mesh.n_patches())
                    .map(|p| vec![d.value; patch_size(mesh, p)])
                    .collect(),
            },
            Diffusivity::Cell(field) => {
                FvError::check_mesh(field.name(), mesh.id(), field.mesh().id())?;
                let surface = super::fvc::interpolate(field)?;
                FaceCoeffs {
                    internal: surface.internal().to_vec(),
                    patches: surface.boundary().to_vec(),
                }
            }
            Diffusivity::Face(field) => {
                field.check_mesh(mesh)?;
                FaceCoeffs {
                    internal: field.internal().to_vec(),
                    patches: field.boundary().to_vec(),
                }
            }
        })
    }
}

fn patch_size(mesh: &FvMesh, patch: usize) -> usize {
    crate::fields::surface::patch_len(mesh, patch)
}

// ============================================================================
// 时间项
// ============================================================================

/// ∂ψ/∂t
///
/// backward 在旧时间层不足两层时退化为 Euler。
pub fn ddt<T: FieldValue>(psi: &mut GeometricField<T>, scheme: DdtScheme) -> FvResult<FvMatrix<T>> {
    let dims = psi.dimensions() * DIM_VOLUME / DIM_TIME;
    let levels = match scheme {
        DdtScheme::SteadyState => return Ok(FvMatrix::new(psi, dims)),
        DdtScheme::Euler => 1,
        DdtScheme::Backward => 2,
    };
    psi.set_old_time_levels(levels);
    psi.store_old_times();

    let mesh = Arc::clone(psi.mesh());
    let (dt, dt0) = mesh.delta_t_pair();
    let rdt = 1.0 / dt;
    let mut m = FvMatrix::new(psi, dims);
    let volumes = mesh.volumes();
    let old = psi.old_time_internal(1);

    if scheme == DdtScheme::Backward && psi.n_old_times() >= 2 {
        let old_old = psi.old_time_internal(2);
        let coefft = 1.0 + dt / (dt + dt0);
        let coefft00 = dt * dt / (dt0 * (dt + dt0));
        let coefft0 = coefft + coefft00;
        for c in 0..m.diag.len() {
            m.diag[c] = coefft * rdt * volumes[c];
            m.source[c] = (old[c] * coefft0 - old_old[c] * coefft00) * (rdt * volumes[c]);
        }
    } else {
        for c in 0..m.diag.len() {
            m.diag[c] = rdt * volumes[c];
            m.source[c] = old[c] * (rdt * volumes[c]);
        }
    }
    Ok(m)
}

// ============================================================================
// 对流项
// ============================================================================

/// ∇·(φ ψ)
pub fn div<T: FieldValue>(
    phi: &SurfaceScalarField,
    psi: &GeometricField<T>,
    scheme: DivScheme,
) -> FvResult<FvMatrix<T>> {
    let mesh = Arc::clone(psi.mesh());
    phi.check_mesh(&mesh)?;
    let mut m = FvMatrix::new(psi, phi.dimensions() * psi.dimensions());

    let weight = |flux: f64, linear: f64| match scheme {
        DivScheme::Upwind => {
            if flux >= 0.0 {
                1.0
            } else {
                0.0
            }
        }
        DivScheme::Linear => linear,
    };

    let faces = phi.internal();
    let mesh_weights = mesh.weights();
    for f in 0..faces.len() {
        let w = weight(faces[f], mesh_weights[f]);
        m.lower[f] = -w * faces[f];
        m.upper[f] = m.lower[f] + faces[f];
    }
    neg_sum_diag(&mut m);

    for (p, pf) in psi.boundary_field().iter().enumerate() {
        if pf.is_empty() {
            continue;
        }
        let flux = phi.patch(p);
        let weights: Vec<f64> = flux
            .iter()
            .zip(mesh.patch_weights(p))
            .map(|(&f, &w)| weight(f, w))
            .collect();
        let ic = pf.value_internal_coeffs(&weights)?;
        let bc = pf.value_boundary_coeffs(&mesh, &weights)?;
        m.internal_coeffs[p] = ic.iter().zip(flux).map(|(&c, &f)| c * f).collect();
        m.boundary_coeffs[p] = bc.iter().zip(flux).map(|(&c, &f)| c * -f).collect();
    }
    Ok(m)
}

/// diag −= Σ 非对角
fn neg_sum_diag<T: FieldValue>(m: &mut FvMatrix<T>) {
    let owner = m.mesh.owner();
    let neighbour = m.mesh.neighbour();
    for f in 0..m.upper.len() {
        m.diag[owner[f]] -= m.lower[f];
        m.diag[neighbour[f]] -= m.upper[f];
    }
}

// ============================================================================
// 扩散项
// ============================================================================

/// ∇·(Γ ∇ψ)
pub fn laplacian<T: FieldValue>(gamma: Diffusivity<'_>, psi: &GeometricField<T>) -> FvResult<FvMatrix<T>> {
    let mesh = Arc::clone(psi.mesh());
    let face = gamma.face_values(&mesh)?;
    let internal = face
        .internal
        .iter()
        .zip(mesh.mag_sf())
        .map(|(&g, &s)| g * s)
        .collect();
    let patches = face
        .patches
        .iter()
        .enumerate()
        .map(|(p, g)| g.iter().zip(mesh.patch_mag_sf(p)).map(|(&g, &s)| g * s).collect())
        .collect();
    laplacian_from_face(psi, internal, patches, gamma.dimensions())
}

/// 对称张量扩散系数 ∇·(Γ·∇ψ) 的正交部分
pub fn laplacian_symm_tensor<T: FieldValue>(
    gamma: &GeometricField<SymmTensor>,
    psi: &GeometricField<T>,
) -> FvResult<FvMatrix<T>> {
    let mesh = Arc::clone(psi.mesh());
    FvError::check_mesh(gamma.name(), mesh.id(), gamma.mesh().id())?;
    let face = super::fvc::interpolate(gamma)?;
    let effective = |sf: fv_foundation::Vector, mag: f64, g: &SymmTensor| {
        if mag > 0.0 {
            sf.dot(g.dot_vec(sf)) / mag
        } else {
            0.0
        }
    };
    let sf = mesh.sf();
    let mag_sf = mesh.mag_sf();
    let internal = face
        .internal()
        .iter()
        .enumerate()
        .map(|(f, g)| effective(sf[f], mag_sf[f], g))
        .collect();
    let patches = (0..mesh.n_patches())
        .map(|p| {
            let psf = mesh.patch_sf(p);
            let pmag = mesh.patch_mag_sf(p);
            face.patch(p)
                .iter()
                .enumerate()
                .map(|(i, g)| effective(psf[i], pmag[i], g))
                .collect()
        })
        .collect();
    laplacian_from_face(psi, internal, patches, gamma.dimensions())
}

/// 由面上的 Γ|Sf| 组装
fn laplacian_from_face<T: FieldValue>(
    psi: &GeometricField<T>,
    gamma_mag_sf: Vec<f64>,
    patch_gamma_mag_sf: Vec<Vec<f64>>,
    gamma_dims: DimensionSet,
) -> FvResult<FvMatrix<T>> {
    let mesh = Arc::clone(psi.mesh());
    let mut m = FvMatrix::new(psi, gamma_dims * psi.dimensions() * DIM_LENGTH);
    let dc = mesh.delta_coeffs();
    for f in 0..m.upper.len() {
        m.upper[f] = dc[f] * gamma_mag_sf[f];
        m.lower[f] = m.upper[f];
    }
    neg_sum_diag(&mut m);

    for (p, pf) in psi.boundary_field().iter().enumerate() {
        if pf.is_empty() {
            continue;
        }
        let pg = &patch_gamma_mag_sf[p];
        FvError::check_size(&format!("{} 扩散系数", pf.patch_name()), pf.len(), pg.len())?;
        let ic = pf.gradient_internal_coeffs(&mesh)?;
        let bc = pf.gradient_boundary_coeffs(&mesh)?;
        m.internal_coeffs[p] = ic.iter().zip(pg).map(|(&c, &g)| c * g).collect();
        m.boundary_coeffs[p] = bc.iter().zip(pg).map(|(&c, &g)| c * -g).collect();
    }
    Ok(m)
}

// ============================================================================
// 源项
// ============================================================================

/// 隐式线性源 sp·ψ
pub fn sp<T: FieldValue>(coeff: &GeometricField<f64>, psi: &GeometricField<T>) -> FvResult<FvMatrix<T>> {
    FvError::check_mesh(coeff.name(), psi.mesh().id(), coeff.mesh().id())?;
    let mut m = FvMatrix::new(psi, coeff.dimensions() * psi.dimensions() * DIM_VOLUME);
    let volumes = psi.mesh().volumes();
    for ((d, &s), &v) in m.diag.iter_mut().zip(coeff.primitive_field()).zip(volumes) {
        *d += s * v;
    }
    Ok(m)
}

/// 均匀系数的隐式线性源
pub fn sp_uniform<T: FieldValue>(coeff: &Dimensioned<f64>, psi: &GeometricField<T>) -> FvMatrix<T> {
    let mut m = FvMatrix::new(psi, coeff.dimensions * psi.dimensions() * DIM_VOLUME);
    for (d, &v) in m.diag.iter_mut().zip(psi.mesh().volumes()) {
        *d += coeff.value * v;
    }
    m
}

/// 显式源 su
pub fn su<T: FieldValue>(source: &GeometricField<T>, psi: &GeometricField<T>) -> FvResult<FvMatrix<T>> {
    FvError::check_mesh(source.name(), psi.mesh().id(), source.mesh().id())?;
    let mut m = FvMatrix::new(psi, source.dimensions() * DIM_VOLUME);
    let volumes = psi.mesh().volumes();
    for ((s, &f), &v) in m.source.iter_mut().zip(source.primitive_field()).zip(volumes) {
        *s -= f * v;
    }
    Ok(m)
}

/// 按符号选择隐式或显式：正系数进对角，负系数进源项
pub fn su_sp<T: FieldValue>(coeff: &GeometricField<f64>, psi: &GeometricField<T>) -> FvResult<FvMatrix<T>> {
    FvError::check_mesh(coeff.name(), psi.mesh().id(), coeff.mesh().id())?;
    let mut m = FvMatrix::new(psi, coeff.dimensions() * psi.dimensions() * DIM_VOLUME);
    let volumes = psi.mesh().volumes();
    for c in 0..m.diag.len() {
        let s = coeff.primitive_field()[c];
        let v = volumes[c];
        m.diag[c] += s.max(0.0) * v;
        m.source[c] -= psi.primitive_field()[c] * (s.min(0.0) * v);
    }
    Ok(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::{patch_types, SurfaceField};
    use fv_foundation::dimension::{DIMLESS, DIM_FLUX, DIM_KINEMATIC_VISCOSITY};
    use fv_mesh::BoxMeshBuilder;

    fn line(n: usize) -> Arc<FvMesh> {
        Arc::new(FvMesh::new(BoxMeshBuilder::new(n, 1, 1, n as f64, 1.0, 1.0).build().unwrap()).unwrap())
    }

    fn field(mesh: &Arc<FvMesh>) -> GeometricField<f64> {
        let mut types = patch_types(mesh, "zeroGradient");
        types[0] = "fixedValue";
        GeometricField::uniform("T", Arc::clone(mesh), &Dimensioned::new("T", DIMLESS, 1.0), &types).unwrap()
    }

    #[test]
    fn test_laplacian_row_sums() {
        let mesh = line(4);
        let t = field(&mesh);
        let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 2.0);
        let m = laplacian(Diffusivity::Uniform(&nu), &t).unwrap();
        assert!(m.is_symmetric());
        assert!((m.upper()[0] - 2.0).abs() < 1e-12);
        // 内部行和为零，边界单元由 fixedValue 贡献 −Γ|S|δ
        assert!((m.diag()[1] + 4.0).abs() < 1e-12);
        assert!((m.internal_coeffs()[0][0] + 4.0).abs() < 1e-12);
        assert!((m.boundary_coeffs()[0][0] + 4.0).abs() < 1e-12);
        assert!(m.dimensions().matches(&(DIM_FLUX * DIMLESS)));
    }

    #[test]
    fn test_upwind_uses_donor_cell() {
        let mesh = line(3);
        let t = field(&mesh);
        let phi = SurfaceField::uniform("phi", Arc::clone(&mesh), &Dimensioned::new("phi", DIM_FLUX, 1.0));
        let m = div(&phi, &t, DivScheme::Upwind).unwrap();
        assert_eq!(m.lower()[0], -1.0);
        assert_eq!(m.upper()[0], 0.0);
        assert!(!m.is_symmetric());
    }

    #[test]
    fn test_euler_ddt() {
        let mesh = line(2);
        let mut t = field(&mesh);
        mesh.time().write().set_delta_t(0.5).unwrap();
        let m = ddt(&mut t, DdtScheme::Euler).unwrap();
        assert!((m.diag()[0] - 2.0).abs() < 1e-12);
        assert!((m.source()[0] - 2.0).abs() < 1e-12);
        let steady = ddt(&mut t, DdtScheme::SteadyState).unwrap();
        assert!(steady.diag().iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_su_sp_split() {
        let mesh = line(2);
        let t = field(&mesh);
        let mut coeff = GeometricField::<f64>::new("c", Arc::clone(&mesh), DIMLESS, &patch_types(&mesh, "calculated")).unwrap();
        coeff.primitive_field_mut().copy_from_slice(&[2.0, -3.0]);
        let m = su_sp(&coeff, &t).unwrap();
        assert_eq!(m.diag(), &[2.0, 0.0]);
        assert_eq!(m.source(), &[0.0, 3.0]);
    }
}
