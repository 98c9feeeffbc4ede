// crates/fv_models/src/function1/nsrds.rs

//! NSRDS 0 号物性多项式
//!
//! `f(T) = a + bT + cT² + dT³ + eT⁴ + fT⁵`

use super::{Function1, Function1Registry};
use fv_foundation::{Dictionary, FvResult, OStream};

const NAMES: [&str; 6] = ["a", "b", "c", "d", "e", "f"];

/// 五次多项式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nsrds0 {
    coeffs: [f64; 6],
}

impl Nsrds0 {
    /// 系数按 a … f 的顺序
    pub fn new(coeffs: [f64; 6]) -> Self {
        Self { coeffs }
    }

    pub fn from_dict(dict: &Dictionary, _registry: &Function1Registry) -> FvResult<Box<dyn Function1>> {
        let mut coeffs = [0.0; 6];
        for (c, name) in coeffs.iter_mut().zip(NAMES) {
            *c = dict.lookup(name)?;
        }
        Ok(Box::new(Self::new(coeffs)))
    }

    /// 原函数 `aT + bT²/2 + … + fT⁶/6`
    fn antiderivative(&self, t: f64) -> f64 {
        self.coeffs
            .iter()
            .enumerate()
            .rev()
            .fold(0.0, |acc, (i, &c)| acc * t + c / (i + 1) as f64)
            * t
    }
}

impl Function1 for Nsrds0 {
    fn type_name(&self) -> &'static str {
        "NSRDS0"
    }

    fn value(&self, t: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
    }

    fn integral(&self, x1: f64, x2: f64) -> f64 {
        self.antiderivative(x2) - self.antiderivative(x1)
    }

    fn write_coeffs(&self, os: &mut OStream) {
        for (&c, name) in self.coeffs.iter().zip(NAMES) {
            os.write_scalar_entry(name, c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horner_and_integral() {
        let p = Nsrds0::new([1.0, 2.0, 3.0, 0.0, 0.0, 1.0]);
        // 1 + 2·2 + 3·4 + 32
        assert_eq!(p.value(2.0), 49.0);
        // [T + T² + T³ + T⁶/6] 从 0 到 2
        let expected = 2.0 + 4.0 + 8.0 + 64.0 / 6.0;
        assert!((p.integral(0.0, 2.0) - expected).abs() < 1e-12);
        assert!((p.integral(2.0, 0.0) + expected).abs() < 1e-12);
    }
}
