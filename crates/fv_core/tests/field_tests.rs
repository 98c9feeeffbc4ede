// crates/fv_core/tests/field_tests.rs

//! 场松弛与场文件的集成测试

use fv_core::fields::{new_patch_field, patch_types, FieldRegistries, PatchFieldArgs};
use fv_core::{FieldFormat, FvMesh, GeometricField, SolutionControls};
use fv_foundation::dimension::{DIMLESS, DIM_LENGTH, DIM_TIME};
use fv_foundation::{Dictionary, Dimensioned, FvError, Precision, Vector};
use fv_mesh::BoxMeshBuilder;
use rand::Rng;
use std::path::PathBuf;
use std::sync::Arc;

fn box_mesh() -> Arc<FvMesh> {
    Arc::new(FvMesh::new(BoxMeshBuilder::new(5, 4, 2, 1.0, 0.8, 0.4).build().unwrap()).unwrap())
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fv_core_{}_{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn varying_velocity(mesh: &Arc<FvMesh>) -> GeometricField<Vector> {
    let mut types = patch_types(mesh, "zeroGradient");
    types[0] = "fixedValue";
    types[2] = "fixedGradient";
    let mut u = GeometricField::new("U", Arc::clone(mesh), DIM_LENGTH / DIM_TIME, &types).unwrap();
    for (v, c) in u.primitive_field_mut().iter_mut().zip(mesh.cell_centres()) {
        *v = Vector::new(c.x.sin() + 1.0 / 3.0, c.y * c.y - 0.1, c.z.exp() / 7.0);
    }
    let inlet: Vec<Vector> = mesh
        .patch_sf(0)
        .iter()
        .enumerate()
        .map(|(i, _)| Vector::new(1.0 + i as f64 / 9.0, 0.0, 0.0))
        .collect();
    u.boundary_field_mut()[0].force_assign(&inlet).unwrap();
    if let Some(g) = u.boundary_field_mut()[2].gradient_mut() {
        for (i, v) in g.iter_mut().enumerate() {
            *v = Vector::new(0.0, 2.0 / 3.0 + i as f64, 0.0);
        }
    }
    u.correct_boundary_conditions().unwrap();
    u
}

#[test]
fn test_field_relax_at_or_above_one_is_noop() {
    let mesh = box_mesh();
    let types = patch_types(&mesh, "zeroGradient");
    let mut t = GeometricField::uniform("T", mesh, &Dimensioned::new("T", DIMLESS, 2.0), &types).unwrap();
    t.store_prev_iter();
    t.primitive_field_mut()[3] = 7.0;
    t.correct_boundary_conditions().unwrap();
    let before = t.snapshot();

    t.relax(1.0).unwrap();
    assert_eq!(t.snapshot(), before);
    t.relax(1.5).unwrap();
    assert_eq!(t.snapshot(), before);

    // 控制文件没有给出因子时同样不变
    t.relax_auto(&SolutionControls::default()).unwrap();
    assert_eq!(t.snapshot(), before);

    t.relax(0.5).unwrap();
    assert!((t.primitive_field()[3] - 4.5).abs() < 1e-12);
}

#[test]
fn test_relax_without_previous_iteration_fails() {
    let mesh = box_mesh();
    let types = patch_types(&mesh, "zeroGradient");
    let mut t = GeometricField::<f64>::new("T", mesh, DIMLESS, &types).unwrap();
    assert!(matches!(t.relax(0.7), Err(FvError::NotStored { .. })));
}

#[test]
fn test_add_then_sub_restores_field() {
    let mesh = box_mesh();
    let mut u = varying_velocity(&mesh);
    let before = u.snapshot();
    let inlet = u.patch_field(0).values().to_vec();

    let mut du = GeometricField::new(
        "dU",
        Arc::clone(&mesh),
        DIM_LENGTH / DIM_TIME,
        &patch_types(&mesh, "zeroGradient"),
    )
    .unwrap();
    for (i, v) in du.primitive_field_mut().iter_mut().enumerate() {
        *v = Vector::new(0.3 * i as f64, -1.0 / 7.0, (i as f64).sqrt());
    }
    du.correct_boundary_conditions().unwrap();

    u.add_assign(&du).unwrap();
    // 固定值补丁不参与普通运算
    assert_eq!(u.patch_field(0).values(), &inlet[..]);
    assert_ne!(u.primitive_field(), &before.internal[..]);

    u.sub_assign(&du).unwrap();
    for (a, b) in u.primitive_field().iter().zip(&before.internal) {
        assert!((*a - *b).length() < 1e-12);
    }
    assert_eq!(u.patch_field(0).values(), &inlet[..]);
}

#[test]
fn test_missing_value_is_named() {
    let mesh = box_mesh();
    let registries = FieldRegistries::<f64>::new();
    let internal = vec![0.0; mesh.n_cells()];
    let dict = Dictionary::parse("T.boundaryField.xmin", "type fixedValue;").unwrap();
    let args = PatchFieldArgs::new(&mesh, 0, &internal, &registries.patch_to_patch);
    match new_patch_field(&args, &dict, &registries.patch_fields) {
        Err(FvError::MissingEntry { dictionary, key }) => {
            assert_eq!(key, "value");
            assert!(dictionary.contains("xmin"));
        }
        other => panic!("期望 MissingEntry, 实际 {other:?}"),
    }
}

#[test]
fn test_missing_value_in_field_file() {
    let mesh = box_mesh();
    let text = r#"
FoamFile
{
    format      ascii;
    class       volScalarField;
    object      T;
}
dimensions      [0 0 0 0 0 0 0];
internalField   uniform 1;
boundaryField
{
    xmin { type fixedValue; }
    xmax { type zeroGradient; }
    ymin { type zeroGradient; }
    ymax { type zeroGradient; }
    zmin { type zeroGradient; }
    zmax { type zeroGradient; }
}
"#;
    let err = fv_core::fields::io::read_ascii::<f64>("T", text, mesh, &FieldRegistries::new()).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("value"), "{message}");
    assert!(message.contains("xmin"), "{message}");
}

#[test]
fn test_binary_round_trip_is_exact() {
    let mesh = box_mesh();
    let u = varying_velocity(&mesh);
    let dir = scratch_dir("binary");
    let path = dir.join("U");
    u.write(&path, FieldFormat::Binary).unwrap();

    let back = GeometricField::<Vector>::read(&path, Arc::clone(&mesh), &FieldRegistries::new()).unwrap();
    assert_eq!(back.name(), "U");
    assert_eq!(back.dimensions(), u.dimensions());
    assert_eq!(back.primitive_field(), u.primitive_field());
    for (a, b) in back.boundary_field().iter().zip(u.boundary_field()) {
        assert_eq!(a.type_name(), b.type_name());
        assert_eq!(a.values(), b.values());
        assert_eq!(a.gradient(), b.gradient());
    }
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_random_scalars_binary_round_trip() {
    let mesh = box_mesh();
    let mut rng = rand::thread_rng();
    let mut types = patch_types(&mesh, "zeroGradient");
    types[1] = "fixedValue";
    let mut t = GeometricField::<f64>::new("T", Arc::clone(&mesh), DIMLESS, &types).unwrap();
    for v in t.primitive_field_mut() {
        *v = rng.gen_range(-1e6..1e6) * 10f64.powi(rng.gen_range(-30..30));
    }
    let outlet: Vec<f64> = (0..t.patch_field(1).len()).map(|_| rng.gen::<f64>()).collect();
    t.boundary_field_mut()[1].force_assign(&outlet).unwrap();

    let bytes = fv_core::fields::io::to_binary(&t).unwrap();
    let back = fv_core::fields::io::from_binary::<f64>(&bytes, mesh, &FieldRegistries::new()).unwrap();
    assert_eq!(back.primitive_field(), t.primitive_field());
    assert_eq!(back.patch_field(1).values(), &outlet[..]);
}

#[test]
fn test_binary_round_trip_keeps_unevaluated_boundary() {
    let mesh = box_mesh();
    let mut types = patch_types(&mesh, "zeroGradient");
    types[3] = "fixedInternalValue";
    let mut t = GeometricField::<f64>::new("T", Arc::clone(&mesh), DIMLESS, &types).unwrap();
    for (i, v) in t.primitive_field_mut().iter_mut().enumerate() {
        *v = 4.0 * i as f64;
    }
    // 未调用 correct_boundary_conditions，补丁值仍为 0
    let stale: Vec<Vec<f64>> = t.boundary_field().iter().map(|pf| pf.values().to_vec()).collect();
    assert!(stale[0].iter().all(|&v| v == 0.0));

    let bytes = fv_core::fields::io::to_binary(&t).unwrap();
    let back = fv_core::fields::io::from_binary::<f64>(&bytes, mesh, &FieldRegistries::new()).unwrap();
    assert_eq!(back.primitive_field(), t.primitive_field());
    for (p, pf) in back.boundary_field().iter().enumerate() {
        assert_eq!(pf.type_name(), types[p]);
        assert_eq!(pf.values(), &stale[p][..]);
    }
}

#[test]
fn test_ascii_round_trip_within_precision() {
    let mesh = box_mesh();
    let u = varying_velocity(&mesh);
    let dir = scratch_dir("ascii");
    let path = dir.join("U");
    u.write(&path, FieldFormat::Ascii(Precision::Significant(6))).unwrap();

    let back = GeometricField::<Vector>::read(&path, Arc::clone(&mesh), &FieldRegistries::new()).unwrap();
    let close = |a: &Vector, b: &Vector| (*a - *b).length() <= 1e-5 * (1.0 + b.length());
    for (a, b) in back.primitive_field().iter().zip(u.primitive_field()) {
        assert!(close(a, b), "{a:?} vs {b:?}");
    }
    for (pa, pb) in back.boundary_field().iter().zip(u.boundary_field()) {
        assert_eq!(pa.type_name(), pb.type_name());
        for (a, b) in pa.values().iter().zip(pb.values()) {
            assert!(close(a, b), "{a:?} vs {b:?}");
        }
    }

    let exact = dir.join("U.exact");
    u.write(&exact, FieldFormat::Ascii(Precision::Exact)).unwrap();
    let back = GeometricField::<Vector>::read(&exact, mesh, &FieldRegistries::new()).unwrap();
    assert_eq!(back.primitive_field(), u.primitive_field());
    std::fs::remove_dir_all(dir).ok();
}

#[test]
fn test_read_rejects_wrong_class() {
    let mesh = box_mesh();
    let u = varying_velocity(&mesh);
    let dir = scratch_dir("class");
    let path = dir.join("U");
    u.write(&path, FieldFormat::default()).unwrap();
    let err = GeometricField::<f64>::read(&path, mesh, &FieldRegistries::new()).unwrap_err();
    assert!(matches!(err, FvError::InvalidEntry { .. }));
    std::fs::remove_dir_all(dir).ok();
}
