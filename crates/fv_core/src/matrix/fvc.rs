// crates/fv_core/src/matrix/fvc.rs

//! 显式离散算子
//!
//! 结果为新场：体积场的补丁按运算结果类型构造（约束补丁保持约束类型，
//! 其余为 calculated），边界值取相邻单元值或面值。

use super::fvm::Diffusivity;
use crate::fields::{GeometricField, SurfaceField, SurfaceScalarField};
use crate::fv_mesh::FvMesh;
use fv_foundation::dimension::{DIM_AREA, DIM_LENGTH, DIM_VOLUME};
use fv_foundation::{DimensionSet, Dimensioned, Divergence, FieldValue, FvResult, Gradient, Vector};
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// 线性插值到面
pub fn interpolate<T: FieldValue>(vf: &GeometricField<T>) -> FvResult<SurfaceField<T>> {
    let mesh = Arc::clone(vf.mesh());
    let x = vf.primitive_field();
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let w = mesh.weights();
    let internal = (0..mesh.n_internal_faces())
        .map(|f| x[owner[f]] * w[f] + x[neighbour[f]] * (1.0 - w[f]))
        .collect();
    let boundary = vf.boundary_field().iter().map(|pf| pf.values().to_vec()).collect();
    SurfaceField::new(format!("interpolate({})", vf.name()), mesh, vf.dimensions(), internal, boundary)
}

/// 面通量 Sf·U
pub fn flux(u: &GeometricField<Vector>) -> FvResult<SurfaceScalarField> {
    let mesh = Arc::clone(u.mesh());
    let uf = interpolate(u)?;
    let sf = mesh.sf();
    let internal = uf.internal().iter().zip(sf).map(|(v, s)| v.dot(*s)).collect();
    let boundary = (0..mesh.n_patches())
        .map(|p| {
            uf.patch(p)
                .iter()
                .zip(mesh.patch_sf(p))
                .map(|(v, s)| v.dot(*s))
                .collect()
        })
        .collect();
    SurfaceField::new(
        format!("phi({})", u.name()),
        mesh,
        u.dimensions() * DIM_AREA,
        internal,
        boundary,
    )
}

/// 面法向梯度
pub fn sn_grad<T: FieldValue>(vf: &GeometricField<T>) -> FvResult<SurfaceField<T>> {
    let mesh = Arc::clone(vf.mesh());
    let x = vf.primitive_field();
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    let dc = mesh.delta_coeffs();
    let internal = (0..mesh.n_internal_faces())
        .map(|f| (x[neighbour[f]] - x[owner[f]]) * dc[f])
        .collect();
    let boundary = vf
        .boundary_field()
        .iter()
        .map(|pf| pf.sn_grad(&mesh, x))
        .collect::<FvResult<Vec<_>>>()?;
    SurfaceField::new(
        format!("snGrad({})", vf.name()),
        mesh,
        vf.dimensions() / DIM_LENGTH,
        internal,
        boundary,
    )
}

/// 面值之和：内部面加到 owner、从 neighbour 减去；边界面加到相邻单元
pub fn surface_sum<T: FieldValue>(sf: &SurfaceField<T>) -> Vec<T> {
    let mesh = sf.mesh();
    let mut sum = vec![T::zero(); mesh.n_cells()];
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();
    for (f, &v) in sf.internal().iter().enumerate() {
        sum[owner[f]] += v;
        sum[neighbour[f]] -= v;
    }
    for (p, values) in sf.boundary().iter().enumerate() {
        for (&cell, &v) in mesh.patch_face_cells(p).iter().zip(values) {
            sum[cell] += v;
        }
    }
    sum
}

/// 除以单元体积
fn per_volume<T: FieldValue>(mesh: &FvMesh, mut values: Vec<T>) -> Vec<T> {
    let volumes = mesh.volumes();
    #[cfg(feature = "parallel")]
    values
        .par_iter_mut()
        .zip(volumes.par_iter())
        .for_each(|(x, &v)| *x = *x * (1.0 / v));
    #[cfg(not(feature = "parallel"))]
    for (x, &v) in values.iter_mut().zip(volumes) {
        *x = *x * (1.0 / v);
    }
    values
}

/// 由单元值构造结果场，边界值取相邻单元值
fn cell_result<T: FieldValue>(
    name: String,
    mesh: &Arc<FvMesh>,
    dimensions: DimensionSet,
    internal: Vec<T>,
) -> FvResult<GeometricField<T>> {
    let boundary = (0..mesh.n_patches())
        .map(|p| {
            if mesh.is_empty_patch(p) {
                Vec::new()
            } else {
                mesh.patch_face_cells(p).iter().map(|&c| internal[c]).collect()
            }
        })
        .collect();
    GeometricField::calculated(name, Arc::clone(mesh), dimensions, internal, boundary)
}

/// 面通量的散度 ∇·φ
pub fn div_flux(phi: &SurfaceScalarField) -> FvResult<GeometricField<f64>> {
    let mesh = Arc::clone(phi.mesh());
    let values = per_volume(&mesh, surface_sum(phi));
    cell_result(format!("div({})", phi.name()), &mesh, phi.dimensions() / DIM_VOLUME, values)
}

/// 体积场的散度 ∇·U
pub fn div<T: Divergence>(vf: &GeometricField<T>) -> FvResult<GeometricField<T::Div>> {
    let mesh = Arc::clone(vf.mesh());
    let face = interpolate(vf)?;
    let sf = mesh.sf();
    let internal = face.internal().iter().zip(sf).map(|(&v, &s)| T::inner(s, v)).collect();
    let boundary = (0..mesh.n_patches())
        .map(|p| {
            face.patch(p)
                .iter()
                .zip(mesh.patch_sf(p))
                .map(|(&v, &s)| T::inner(s, v))
                .collect()
        })
        .collect();
    let flux = SurfaceField::new("flux", Arc::clone(&mesh), vf.dimensions() * DIM_AREA, internal, boundary)?;
    let values = per_volume(&mesh, surface_sum(&flux));
    cell_result(format!("div({})", vf.name()), &mesh, vf.dimensions() / DIM_LENGTH, values)
}

/// Gauss 线性梯度，边界值做法向修正：g_b = g_c + n ⊗ (snGrad − n·g_c)
pub fn grad<T: Gradient>(vf: &GeometricField<T>) -> FvResult<GeometricField<T::Grad>> {
    let mesh = Arc::clone(vf.mesh());
    let face = interpolate(vf)?;
    let sf = mesh.sf();
    let owner = mesh.owner();
    let neighbour = mesh.neighbour();

    let mut sum = vec![<T::Grad as FieldValue>::zero(); mesh.n_cells()];
    for (f, &v) in face.internal().iter().enumerate() {
        let g = T::outer(sf[f], v);
        sum[owner[f]] += g;
        sum[neighbour[f]] -= g;
    }
    for p in 0..mesh.n_patches() {
        let psf = mesh.patch_sf(p);
        for ((&cell, &v), &s) in mesh.patch_face_cells(p).iter().zip(face.patch(p)).zip(psf) {
            sum[cell] += T::outer(s, v);
        }
    }
    let internal = per_volume(&mesh, sum);

    let x = vf.primitive_field();
    let boundary = vf
        .boundary_field()
        .iter()
        .enumerate()
        .map(|(p, pf)| {
            if pf.is_empty() {
                return Ok(Vec::new());
            }
            let sn = pf.sn_grad(&mesh, x)?;
            let normals = mesh.patch_normals(p);
            Ok(mesh
                .patch_face_cells(p)
                .iter()
                .zip(&sn)
                .zip(&normals)
                .map(|((&c, &s), &n)| {
                    let gc = internal[c];
                    gc + T::outer(n, s - T::normal_dot(n, &gc))
                })
                .collect())
        })
        .collect::<FvResult<Vec<Vec<T::Grad>>>>()?;

    GeometricField::calculated(
        format!("grad({})", vf.name()),
        Arc::clone(&mesh),
        vf.dimensions() / DIM_LENGTH,
        internal,
        boundary,
    )
}

/// ∇·(Γ∇ψ)
pub fn laplacian<T: FieldValue>(gamma: Diffusivity<'_>, vf: &GeometricField<T>) -> FvResult<GeometricField<T>> {
    let mesh = Arc::clone(vf.mesh());
    let coeffs = gamma.face_values(&mesh)?;
    let mut sn = sn_grad(vf)?;
    for ((v, &g), &s) in sn.internal_mut().iter_mut().zip(&coeffs.internal).zip(mesh.mag_sf()) {
        *v = *v * (g * s);
    }
    for p in 0..mesh.n_patches() {
        let pmag = mesh.patch_mag_sf(p);
        for ((v, &g), &s) in sn.patch_mut(p).iter_mut().zip(&coeffs.patches[p]).zip(pmag) {
            *v = *v * (g * s);
        }
    }
    let values = per_volume(&mesh, surface_sum(&sn));
    cell_result(
        format!("laplacian({})", vf.name()),
        &mesh,
        gamma.dimensions() * vf.dimensions() / DIM_AREA,
        values,
    )
}

/// 体积积分 Σ ψ·V
pub fn domain_integrate<T: FieldValue>(vf: &GeometricField<T>) -> Dimensioned<T> {
    let mut sum = T::zero();
    for (&x, &v) in vf.primitive_field().iter().zip(vf.mesh().volumes()) {
        sum += x * v;
    }
    Dimensioned::new(
        format!("domainIntegrate({})", vf.name()),
        vf.dimensions() * DIM_VOLUME,
        sum,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::patch_types;
    use fv_foundation::dimension::{DIMLESS, DIM_KINEMATIC_VISCOSITY};
    use fv_mesh::BoxMeshBuilder;

    fn mesh() -> Arc<FvMesh> {
        Arc::new(FvMesh::new(BoxMeshBuilder::new(4, 3, 2, 4.0, 3.0, 2.0).build().unwrap()).unwrap())
    }

    /// φ = x + 2y − z，所有补丁取精确面值
    fn linear_field(mesh: &Arc<FvMesh>) -> GeometricField<f64> {
        let f = |p: Vector| p.x + 2.0 * p.y - p.z;
        let mut vf = GeometricField::<f64>::new("phi", Arc::clone(mesh), DIMLESS, &patch_types(mesh, "fixedValue")).unwrap();
        for (v, &c) in vf.primitive_field_mut().iter_mut().zip(mesh.cell_centres()) {
            *v = f(c);
        }
        for (p, pf) in vf.boundary_field_mut().iter_mut().enumerate() {
            let exact: Vec<f64> = mesh.poly().face_centres()[mesh.patch_range(p)].iter().map(|&c| f(c)).collect();
            pf.force_assign(&exact).unwrap();
        }
        vf
    }

    #[test]
    fn test_grad_exact_for_linear() {
        let m = mesh();
        let g = grad(&linear_field(&m)).unwrap();
        for v in g.primitive_field() {
            assert!((*v - Vector::new(1.0, 2.0, -1.0)).length() < 1e-10);
        }
        for pf in g.boundary_field() {
            for v in pf.values() {
                assert!((*v - Vector::new(1.0, 2.0, -1.0)).length() < 1e-10);
            }
        }
    }

    #[test]
    fn test_div_of_uniform_flux_is_zero() {
        let m = mesh();
        let u = GeometricField::uniform(
            "U",
            Arc::clone(&m),
            &Dimensioned::new("U", DIMLESS, Vector::new(1.0, 0.5, 0.0)),
            &patch_types(&m, "fixedValue"),
        )
        .unwrap();
        let phi = flux(&u).unwrap();
        let d = div_flux(&phi).unwrap();
        assert!(d.primitive_field().iter().all(|v| v.abs() < 1e-12));
        let d2 = div(&u).unwrap();
        assert!(d2.primitive_field().iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_laplacian_of_linear_is_zero() {
        let m = mesh();
        let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 3.0);
        let l = laplacian(Diffusivity::Uniform(&nu), &linear_field(&m)).unwrap();
        assert!(l.primitive_field().iter().all(|v| v.abs() < 1e-10));
    }

    #[test]
    fn test_domain_integrate() {
        let m = mesh();
        let one = GeometricField::uniform("one", Arc::clone(&m), &Dimensioned::new("one", DIMLESS, 1.0), &patch_types(&m, "calculated")).unwrap();
        assert!((domain_integrate(&one).value - 24.0).abs() < 1e-12);
    }
}
