// crates/fv_models/src/function1/normalise.rs

//! 归一化包装：在 `bounds (a b)` 上积分为 1

use super::{new_function1, Function1, Function1Registry};
use fv_foundation::{Dictionary, FvError, FvResult, OStream};

#[derive(Debug)]
pub struct Normalise {
    bounds: (f64, f64),
    scale: f64,
    inner: Box<dyn Function1>,
}

impl Normalise {
    pub fn new(inner: Box<dyn Function1>, bounds: (f64, f64)) -> Result<Self, String> {
        let total = inner.integral(bounds.0, bounds.1);
        if total == 0.0 || !total.is_finite() {
            return Err(format!(
                "函数在 ({} {}) 上的积分为 {total}, 无法归一化",
                bounds.0, bounds.1
            ));
        }
        Ok(Self {
            bounds,
            scale: 1.0 / total,
            inner,
        })
    }

    pub fn from_dict(dict: &Dictionary, registry: &Function1Registry) -> FvResult<Box<dyn Function1>> {
        let bounds: (f64, f64) = dict.lookup("bounds")?;
        let inner = new_function1("value", dict, registry)?;
        let f = Self::new(inner, bounds).map_err(|reason| {
            FvError::invalid_entry(dict.name(), "bounds", format!("({} {})", bounds.0, bounds.1), reason)
        })?;
        Ok(Box::new(f))
    }
}

impl Function1 for Normalise {
    fn type_name(&self) -> &'static str {
        "normalise"
    }

    fn value(&self, x: f64) -> f64 {
        self.scale * self.inner.value(x)
    }

    fn integral(&self, x1: f64, x2: f64) -> f64 {
        self.scale * self.inner.integral(x1, x2)
    }

    fn write_coeffs(&self, os: &mut OStream) {
        let bounds = format!("({} {})", os.format_scalar(self.bounds.0), os.format_scalar(self.bounds.1));
        os.write_entry("bounds", &bounds);
        os.begin_block("value");
        self.inner.write(os);
        os.end_block();
    }
}

#[cfg(test)]
mod tests {
    use super::super::function1_registry;
    use super::*;

    #[test]
    fn test_normalised_profile_integrates_to_one() {
        let registry = function1_registry();
        let dict = Dictionary::parse(
            "profile",
            "f { type normalise; bounds (0 2); value table ((0 0) (1 3) (2 0)); }",
        )
        .unwrap();
        let f = new_function1("f", &dict, &registry).unwrap();
        assert!((f.integral(0.0, 2.0) - 1.0).abs() < 1e-12);
        assert!((f.value(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_integral_is_rejected() {
        let registry = function1_registry();
        let dict = Dictionary::parse("profile", "bounds (0 1); value 0;").unwrap();
        assert!(Normalise::from_dict(&dict, &registry).is_err());
    }
}
