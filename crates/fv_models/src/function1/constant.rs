// crates/fv_models/src/function1/constant.rs

use super::{Function1, Function1Registry};
use fv_foundation::{Dictionary, FvResult, OStream};

/// 常数 c
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constant {
    value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }

    pub fn from_dict(dict: &Dictionary, _registry: &Function1Registry) -> FvResult<Box<dyn Function1>> {
        Ok(Box::new(Self::new(dict.lookup("value")?)))
    }
}

impl Function1 for Constant {
    fn type_name(&self) -> &'static str {
        "constant"
    }

    fn value(&self, _x: f64) -> f64 {
        self.value
    }

    fn integral(&self, x1: f64, x2: f64) -> f64 {
        self.value * (x2 - x1)
    }

    fn write_coeffs(&self, os: &mut OStream) {
        os.write_scalar_entry("value", self.value);
    }
}
