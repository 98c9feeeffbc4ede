// crates/fv_core/tests/matrix_tests.rs

//! 矩阵代数与松弛的集成测试

use fv_core::fields::patch_types;
use fv_core::matrix::{fvc, fvm, Diffusivity};
use fv_core::{DdtScheme, DivScheme, FvMatrix, FvMesh, GeometricField, SolutionControls, SolverSettings};
use fv_foundation::dimension::{DIMLESS, DIM_KINEMATIC_VISCOSITY, DIM_LENGTH, DIM_TIME};
use fv_foundation::{Dimensioned, Vector};
use fv_mesh::BoxMeshBuilder;
use std::sync::Arc;

fn channel() -> (Arc<FvMesh>, GeometricField<f64>) {
    let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::new(6, 3, 1, 3.0, 1.0, 0.5).build().unwrap()).unwrap());
    let mut types = patch_types(&mesh, "zeroGradient");
    types[0] = "fixedValue";
    let mut t = GeometricField::new("T", Arc::clone(&mesh), DIMLESS, &types).unwrap();
    t.boundary_field_mut()[0].force_assign(&[1.0; 3]).unwrap();
    for (v, c) in t.primitive_field_mut().iter_mut().zip(mesh.cell_centres()) {
        *v = 0.1 * c.x + 0.05 * c.y;
    }
    (mesh, t)
}

fn transport(t: &mut GeometricField<f64>) -> FvMatrix<f64> {
    let mesh = Arc::clone(t.mesh());
    let u = GeometricField::uniform(
        "U",
        Arc::clone(&mesh),
        &Dimensioned::new("U", DIM_LENGTH / DIM_TIME, Vector::new(1.0, 0.0, 0.0)),
        &patch_types(&mesh, "calculated"),
    )
    .unwrap();
    let phi = fvc::flux(&u).unwrap();
    let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 0.1);

    let mut eqn = fvm::ddt(t, DdtScheme::Euler).unwrap();
    eqn.add_assign(&fvm::div(&phi, t, DivScheme::Upwind).unwrap()).unwrap();
    eqn.sub_assign(&fvm::laplacian(Diffusivity::Uniform(&nu), t).unwrap()).unwrap();
    eqn
}

fn assert_close(a: &[f64], b: &[f64], tol: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.iter().zip(b) {
        assert!((x - y).abs() <= tol * (1.0 + y.abs()), "{x} != {y}");
    }
}

#[test]
fn test_add_then_subtract_restores_matrix() {
    let (_, mut t) = channel();
    let a = transport(&mut t);
    let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 2.5);
    let mut b = fvm::laplacian(Diffusivity::Uniform(&nu), &t).unwrap();
    b.scale(-1.0);
    let b = b.plus(&fvm::ddt(&mut t, DdtScheme::Euler).unwrap()).unwrap();

    let mut c = a.clone();
    c.add_assign(&b).unwrap();
    c.sub_assign(&b).unwrap();

    assert_close(c.diag(), a.diag(), 1e-12);
    assert_close(c.upper(), a.upper(), 1e-12);
    assert_close(c.lower(), a.lower(), 1e-12);
    assert_close(c.source(), a.source(), 1e-12);
    for (ci, ai) in c.internal_coeffs().iter().zip(a.internal_coeffs()) {
        assert_close(ci, ai, 1e-12);
    }
    for (cb, ab) in c.boundary_coeffs().iter().zip(a.boundary_coeffs()) {
        assert_close(cb, ab, 1e-12);
    }
}

#[test]
fn test_incompatible_matrices_are_rejected() {
    let (mesh, mut t) = channel();
    let a = transport(&mut t);
    let mut s = GeometricField::new("S", mesh, DIMLESS, &patch_types(t.mesh(), "zeroGradient")).unwrap();
    let b = fvm::ddt(&mut s, DdtScheme::Euler).unwrap();
    assert!(a.clone().plus(&b).is_err());

    let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1.0);
    let d = fvm::laplacian(Diffusivity::Uniform(&nu), &t).unwrap();
    let mut wrong_dims = fvm::sp_uniform(&Dimensioned::new("k", DIMLESS, 1.0), &t);
    assert!(wrong_dims.add_assign(&d).is_err());
}

#[test]
fn test_unit_relaxation_keeps_solution() {
    let (_, mut t) = channel();
    let mut controls = SolutionControls::default();
    controls.solvers.insert(
        "T".into(),
        SolverSettings {
            tolerance: 1e-13,
            ..Default::default()
        },
    );

    let eqn = transport(&mut t);
    let mut plain = t.clone();
    eqn.solve(&mut plain, &controls).unwrap();

    let mut relaxed_eqn = eqn.clone();
    relaxed_eqn.relax(&t, 1.0).unwrap();
    let mut relaxed = t.clone();
    relaxed_eqn.solve(&mut relaxed, &controls).unwrap();

    assert_close(relaxed.primitive_field(), plain.primitive_field(), 1e-10);
}

#[test]
fn test_under_relaxation_strengthens_diagonal() {
    let (_, mut t) = channel();
    let eqn = transport(&mut t);
    let mut relaxed = eqn.clone();
    relaxed.relax(&t, 0.5).unwrap();
    for (r, d) in relaxed.diag().iter().zip(eqn.diag()) {
        assert!(*r >= 2.0 * d.abs() - 1e-12);
    }
    // 松弛不改变当前迭代值处的残差
    let r0 = eqn.residual(&t).unwrap();
    let r1 = relaxed.residual(&t).unwrap();
    assert_close(&r1, &r0, 1e-9);
}

#[test]
fn test_set_reference_pins_cell() {
    let (mesh, _) = channel();
    let types = patch_types(&mesh, "zeroGradient");
    let mut p = GeometricField::new("p", Arc::clone(&mesh), DIMLESS, &types).unwrap();
    let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1.0);
    let mut eqn = fvm::laplacian(Diffusivity::Uniform(&nu), &p).unwrap();
    eqn.negate();
    eqn.set_reference(0, 3.0).unwrap();
    let mut controls = SolutionControls::default();
    controls.solvers.insert(
        "p".into(),
        SolverSettings {
            tolerance: 1e-12,
            ..Default::default()
        },
    );
    eqn.solve(&mut p, &controls).unwrap();
    for v in p.primitive_field() {
        assert!((v - 3.0).abs() < 1e-6);
    }
}
