// crates/fv_models/src/function1/ramp.rs

//! 从 0 到 1 的斜坡
//!
//! `r = clamp((x - start) / duration, 0, 1)`，线性斜坡取 `r`，二次斜坡取 `r²`。

use super::{Function1, Function1Registry};
use fv_foundation::{Dictionary, FvError, FvResult, OStream};

/// 斜坡形状
pub trait RampShape: std::fmt::Debug + Send + Sync + 'static {
    const NAME: &'static str;

    /// 形状 g(r)，r ∈ [0, 1]
    fn shape(r: f64) -> f64;

    /// ∫₀ʳ g(s) ds
    fn shape_integral(r: f64) -> f64;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Linear;

impl RampShape for Linear {
    const NAME: &'static str = "linearRamp";

    fn shape(r: f64) -> f64 {
        r
    }

    fn shape_integral(r: f64) -> f64 {
        0.5 * r * r
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadratic;

impl RampShape for Quadratic {
    const NAME: &'static str = "quadraticRamp";

    fn shape(r: f64) -> f64 {
        r * r
    }

    fn shape_integral(r: f64) -> f64 {
        r * r * r / 3.0
    }
}

/// 斜坡函数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ramp<S> {
    start: f64,
    duration: f64,
    shape: std::marker::PhantomData<S>,
}

pub type LinearRamp = Ramp<Linear>;
pub type QuadraticRamp = Ramp<Quadratic>;

impl<S: RampShape> Ramp<S> {
    pub fn new(start: f64, duration: f64) -> Result<Self, String> {
        if duration.is_nan() || duration <= 0.0 {
            return Err(format!("duration 必须为正, 实际 {duration}"));
        }
        Ok(Self {
            start,
            duration,
            shape: std::marker::PhantomData,
        })
    }

    pub fn from_dict(dict: &Dictionary, _registry: &Function1Registry) -> FvResult<Box<dyn Function1>> {
        let start = dict.lookup_or_default("start", 0.0)?;
        let duration: f64 = dict.lookup("duration")?;
        let ramp = Self::new(start, duration)
            .map_err(|reason| FvError::invalid_entry(dict.name(), "duration", duration.to_string(), reason))?;
        Ok(Box::new(ramp))
    }

    fn linear_ramp(&self, x: f64) -> f64 {
        ((x - self.start) / self.duration).clamp(0.0, 1.0)
    }

    /// 从 start 起的原函数
    fn antiderivative(&self, x: f64) -> f64 {
        let r = self.linear_ramp(x);
        let inside = self.duration * S::shape_integral(r);
        let after = (x - self.start - self.duration).max(0.0);
        inside + after
    }
}

impl<S: RampShape> Function1 for Ramp<S> {
    fn type_name(&self) -> &'static str {
        S::NAME
    }

    fn value(&self, x: f64) -> f64 {
        S::shape(self.linear_ramp(x))
    }

    fn integral(&self, x1: f64, x2: f64) -> f64 {
        self.antiderivative(x2) - self.antiderivative(x1)
    }

    fn write_coeffs(&self, os: &mut OStream) {
        os.write_scalar_entry("start", self.start);
        os.write_scalar_entry("duration", self.duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_ramp() {
        let f = LinearRamp::new(1.0, 2.0).unwrap();
        assert_eq!(f.value(0.0), 0.0);
        assert_eq!(f.value(2.0), 0.5);
        assert_eq!(f.value(5.0), 1.0);
        // 0.5·2 + 2
        assert!((f.integral(0.0, 5.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_quadratic_ramp() {
        let f = QuadraticRamp::new(0.0, 4.0).unwrap();
        assert_eq!(f.value(2.0), 0.25);
        assert!((f.integral(0.0, 4.0) - 4.0 / 3.0).abs() < 1e-12);
        assert!((f.integral(4.0, 6.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_duration_rejected() {
        assert!(LinearRamp::new(0.0, 0.0).is_err());
    }
}
