// crates/fv_models/src/function1/mod.rs

//! # 一元函数
//!
//! 由字典按名称构造的标量函数 `f(x)`，用于随时间变化的边界值、物性
//! 多项式和剖面归一化。
//!
//! | 类型 | 系数 |
//! |------|------|
//! | `constant` | `value` |
//! | `table` | `values ((x y) ...)`，区间外取端点值 |
//! | `linearRamp` / `quadraticRamp` | `start`、`duration` |
//! | `normalise` | `bounds (a b)`、`value { ... }` |
//! | `NSRDS0` | `a` … `f` |
//!
//! 字典条目可以写成：
//!
//! ```text
//! f1  2.5;                          // 常数
//! f2  constant 2.5;                 // 行内
//! f3  table ((0 0) (1 2));          // 行内表格
//! f4  { type linearRamp; start 0; duration 2; }
//! f5  quadraticRamp;                // 系数在 f5Coeffs 中
//! f5Coeffs { start 1; duration 4; }
//! ```

mod constant;
mod normalise;
mod nsrds;
mod ramp;
mod table;

pub use constant::Constant;
pub use normalise::Normalise;
pub use nsrds::Nsrds0;
pub use ramp::{LinearRamp, QuadraticRamp, Ramp, RampShape};
pub use table::Table;

use fv_foundation::token::TokenKind;
use fv_foundation::{Dictionary, Entry, FvError, FvResult, OStream, Registry};
use std::fmt;

/// 标量一元函数
pub trait Function1: fmt::Debug + Send + Sync {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// f(x)
    fn value(&self, x: f64) -> f64;

    /// ∫ f dx，从 x1 到 x2
    fn integral(&self, x1: f64, x2: f64) -> f64;

    /// 写出系数，不含 `type`
    fn write_coeffs(&self, os: &mut OStream);

    /// 写出 `type` 与系数
    fn write(&self, os: &mut OStream) {
        os.write_entry("type", self.type_name());
        self.write_coeffs(os);
    }
}

/// 由系数字典构造；`normalise` 经注册表构造内层函数
#[derive(Clone, Copy, Debug)]
pub struct Function1Constructor(pub fn(&Dictionary, &Function1Registry) -> FvResult<Box<dyn Function1>>);

/// 一元函数注册表
pub type Function1Registry = Registry<Function1Constructor>;

/// 包含全部内置类型的注册表
pub fn function1_registry() -> Function1Registry {
    let mut registry = Function1Registry::new("Function1");
    registry
        .register("constant", Function1Constructor(Constant::from_dict))
        .register("table", Function1Constructor(Table::from_dict))
        .register("linearRamp", Function1Constructor(LinearRamp::from_dict))
        .register("quadraticRamp", Function1Constructor(QuadraticRamp::from_dict))
        .register("normalise", Function1Constructor(Normalise::from_dict))
        .register("NSRDS0", Function1Constructor(Nsrds0::from_dict));
    registry
}

/// 读取字典中名为 `name` 的函数
pub fn new_function1(
    name: &str,
    dict: &Dictionary,
    registry: &Function1Registry,
) -> FvResult<Box<dyn Function1>> {
    if dict.is_dict(name) {
        let coeffs = dict.sub_dict(name)?;
        let type_name: String = coeffs.lookup("type")?;
        tracing::debug!(function = name, type_name = %type_name, "选择一元函数");
        let ctor = registry.lookup(&type_name)?;
        return (ctor.0)(coeffs, registry);
    }

    let tokens = dict.tokens(name)?;
    let type_name = match tokens.first().map(|t| &t.kind) {
        Some(TokenKind::Number(_)) => "constant".to_string(),
        Some(TokenKind::Word(w)) => w.clone(),
        _ => {
            return Err(FvError::invalid_entry(
                dict.name(),
                name,
                fv_foundation::token::tokens_to_string(tokens),
                "期望函数类型或数值",
            ))
        }
    };
    let ctor = registry.lookup(&type_name)?;
    tracing::debug!(function = name, type_name = %type_name, "选择一元函数");

    let inline = if matches!(tokens[0].kind, TokenKind::Number(_)) {
        tokens
    } else {
        &tokens[1..]
    };
    if inline.is_empty() {
        let coeffs_key = format!("{name}Coeffs");
        return (ctor.0)(dict.optional_sub_dict(&coeffs_key), registry);
    }

    let key = if type_name == "table" { "values" } else { "value" };
    let mut coeffs = Dictionary::new(dict.scoped_name(name));
    coeffs.set(key, Entry::Stream(inline.to_vec()));
    (ctor.0)(&coeffs, registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Precision;

    #[test]
    fn test_entry_forms() {
        let registry = function1_registry();
        let dict = Dictionary::parse(
            "functions",
            r#"
            f1  2.5;
            f2  constant 3;
            f3  table ((0 0) (2 4));
            f4  { type linearRamp; start 1; duration 2; }
            f5  quadraticRamp;
            f5Coeffs { start 0; duration 4; }
            "#,
        )
        .unwrap();

        let f1 = new_function1("f1", &dict, &registry).unwrap();
        assert_eq!(f1.type_name(), "constant");
        assert_eq!(f1.value(10.0), 2.5);
        assert_eq!(new_function1("f2", &dict, &registry).unwrap().value(0.0), 3.0);
        assert_eq!(new_function1("f3", &dict, &registry).unwrap().value(1.0), 2.0);
        assert_eq!(new_function1("f4", &dict, &registry).unwrap().value(2.0), 0.5);
        assert_eq!(new_function1("f5", &dict, &registry).unwrap().value(2.0), 0.25);
    }

    #[test]
    fn test_added_type_reaches_nested_function() {
        let mut registry = function1_registry();
        registry.register("ramp", Function1Constructor(LinearRamp::from_dict));
        let dict = Dictionary::parse(
            "functions",
            "f { type normalise; bounds (0 2); value { type ramp; start 0; duration 2; } }",
        )
        .unwrap();
        let f = new_function1("f", &dict, &registry).unwrap();
        // ∫ 线性斜坡 = 1，归一化后不变
        assert!((f.integral(0.0, 2.0) - 1.0).abs() < 1e-12);
        assert!((f.value(1.0) - 0.5).abs() < 1e-12);
        assert!(new_function1("f", &dict, &function1_registry()).is_err());
    }

    #[test]
    fn test_unknown_type() {
        let registry = function1_registry();
        let dict = Dictionary::parse("functions", "f sine;").unwrap();
        match new_function1("f", &dict, &registry) {
            Err(FvError::UnknownType { name, valid, .. }) => {
                assert_eq!(name, "sine");
                assert_eq!(valid.len(), 6);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_write_then_read_back() {
        let registry = function1_registry();
        let dict = Dictionary::parse("f", "f { type NSRDS0; a 1; b 2; c 0; d 0; e 0; f 0.5; }").unwrap();
        let f = new_function1("f", &dict, &registry).unwrap();

        let mut os = OStream::new(Precision::Exact);
        os.begin_block("g");
        f.write(&mut os);
        os.end_block();
        let back = Dictionary::parse("written", os.as_str()).unwrap();
        let g = new_function1("g", &back, &registry).unwrap();
        for x in [0.0, 0.5, 3.0] {
            assert_eq!(g.value(x), f.value(x));
        }
    }
}
