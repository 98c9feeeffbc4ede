// crates/fv_models/src/function1/table.rs

//! 分段线性表格
//!
//! 区间内线性插值，区间外取端点值。

use super::{Function1, Function1Registry};
use fv_foundation::{Dictionary, FvError, FvResult, OStream};

/// 表格函数
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    xs: Vec<f64>,
    ys: Vec<f64>,
}

impl Table {
    /// 由 `(x, y)` 点列构造，x 必须严格递增
    pub fn new(points: &[(f64, f64)]) -> Result<Self, String> {
        if points.is_empty() {
            return Err("表格为空".into());
        }
        if let Some(w) = points.windows(2).find(|w| w[1].0 <= w[0].0) {
            return Err(format!("x 必须严格递增: {} 之后为 {}", w[0].0, w[1].0));
        }
        Ok(Self {
            xs: points.iter().map(|p| p.0).collect(),
            ys: points.iter().map(|p| p.1).collect(),
        })
    }

    pub fn from_dict(dict: &Dictionary, _registry: &Function1Registry) -> FvResult<Box<dyn Function1>> {
        let points: Vec<(f64, f64)> = dict.lookup("values")?;
        let table = Self::new(&points).map_err(|reason| {
            FvError::invalid_entry(dict.name(), "values", format!("{} 个点", points.len()), reason)
        })?;
        Ok(Box::new(table))
    }

    /// 区间下标 i，满足 xs[i] <= x < xs[i + 1]
    fn segment(&self, x: f64) -> usize {
        self.xs.partition_point(|&xi| xi <= x).saturating_sub(1)
    }

    /// 从 xs[0] 起的原函数
    fn antiderivative(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let x0 = self.xs[0];
        if x <= x0 {
            return (x - x0) * self.ys[0];
        }

        let i = self.segment(x).min(n - 1);
        let mut sum = 0.0;
        for k in 0..i {
            sum += 0.5 * (self.ys[k] + self.ys[k + 1]) * (self.xs[k + 1] - self.xs[k]);
        }
        if i == n - 1 {
            return sum + (x - self.xs[i]) * self.ys[i];
        }
        let y = self.value(x);
        sum + 0.5 * (self.ys[i] + y) * (x - self.xs[i])
    }
}

impl Function1 for Table {
    fn type_name(&self) -> &'static str {
        "table"
    }

    fn value(&self, x: f64) -> f64 {
        let n = self.xs.len();
        if x <= self.xs[0] {
            return self.ys[0];
        }
        if x >= self.xs[n - 1] {
            return self.ys[n - 1];
        }
        let i = self.segment(x);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        self.ys[i] + t * (self.ys[i + 1] - self.ys[i])
    }

    fn integral(&self, x1: f64, x2: f64) -> f64 {
        self.antiderivative(x2) - self.antiderivative(x1)
    }

    fn write_coeffs(&self, os: &mut OStream) {
        let points: Vec<String> = self
            .xs
            .iter()
            .zip(&self.ys)
            .map(|(&x, &y)| format!("({} {})", os.format_scalar(x), os.format_scalar(y)))
            .collect();
        os.write_entry("values", &format!("({})", points.join(" ")));
    }
}
