// crates/fv_foundation/tests/dictionary_tests.rs

//! 字典与开关量的集成测试
//!
//! 覆盖真实配置文件中常见的写法：嵌套块、量纲前缀、注释、开关量别名。

use fv_foundation::dimension::{DIMLESS, DIM_KINEMATIC_VISCOSITY};
use fv_foundation::{Dictionary, FvError, Switch, Vector};
use rand::Rng;

const TRANSPORT: &str = r#"
/*--------------------------------*\
   transportProperties
\*--------------------------------*/
transportModel  Newtonian;

nu              [0 2 -1 0 0 0 0] 1e-05;

g               (0 0 -9.81);

momentumTransport
{
    model           LRR;
    printCoeffs     yes;
    LRRCoeffs
    {
        Cmu             0.09;
        wallReflection  off;
    }
}
"#;

#[test]
fn test_transport_properties() {
    let dict = Dictionary::parse("transportProperties", TRANSPORT).unwrap();
    let nu = dict
        .lookup_dimensioned::<f64>("nu", DIM_KINEMATIC_VISCOSITY)
        .unwrap();
    assert_eq!(nu.value, 1e-5);
    assert_eq!(dict.lookup::<Vector>("g").unwrap(), Vector::new(0.0, 0.0, -9.81));

    let mt = dict.sub_dict("momentumTransport").unwrap();
    assert!(mt.lookup::<bool>("printCoeffs").unwrap());
    let coeffs = mt.optional_sub_dict("LRRCoeffs");
    assert_eq!(coeffs.name(), "transportProperties/momentumTransport/LRRCoeffs");
    let wall = Switch::read_if_present("wallReflection", coeffs).unwrap();
    assert_eq!(wall, Some(Switch::Off));
}

#[test]
fn test_dimension_prefix_mismatch_is_fatal() {
    let dict = Dictionary::parse("transportProperties", TRANSPORT).unwrap();
    let err = dict.lookup_dimensioned::<f64>("nu", DIMLESS).unwrap_err();
    assert!(matches!(err, FvError::DimensionMismatch { .. }));
}

#[test]
fn test_missing_sub_dict() {
    let dict = Dictionary::parse("transportProperties", TRANSPORT).unwrap();
    let err = dict.sub_dict("thermo").unwrap_err();
    assert!(matches!(err, FvError::MissingEntry { ref key, .. } if key == "thermo"));
}

#[test]
fn test_random_scalars_survive_text_round_trip() {
    let mut rng = rand::thread_rng();
    let mut dict = Dictionary::new("random");
    let values: Vec<f64> = (0..50).map(|_| rng.gen_range(-1e6..1e6)).collect();
    for (i, v) in values.iter().enumerate() {
        dict.set_scalar(format!("v{i}"), *v);
    }
    let back = Dictionary::parse("random", &dict.to_text()).unwrap();
    for (i, v) in values.iter().enumerate() {
        assert_eq!(back.lookup::<f64>(&format!("v{i}")).unwrap(), *v);
    }
}
