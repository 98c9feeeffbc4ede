// crates/fv_foundation/src/dimension.rs

//! 物理量纲
//!
//! [`DimensionSet`] 以 7 个 SI 基本量纲的指数表示一个物理量的量纲，
//! 所有场的二元运算都在此层检查量纲一致性。
//!
//! 文本格式为 `[质量 长度 时间 温度 物质的量 电流 发光强度]`，例如速度为
//! `[0 1 -1 0 0 0 0]`。
//!
//! [`Dimensioned`] 将名称、量纲与值捆绑在一起，对应字典中的
//! `nu [0 2 -1 0 0 0 0] 1e-5;` 写法。

use crate::error::{FvError, FvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Div, Mul};
use std::str::FromStr;

/// 基本量纲个数
pub const N_DIMENSIONS: usize = 7;

/// 量纲指数比较容差
const EXPONENT_TOLERANCE: f64 = 1e-10;

/// 基本量纲索引
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseDimension {
    Mass = 0,
    Length = 1,
    Time = 2,
    Temperature = 3,
    Moles = 4,
    Current = 5,
    LuminousIntensity = 6,
}

/// 量纲集合
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionSet {
    exponents: [f64; N_DIMENSIONS],
}

impl DimensionSet {
    /// 由 7 个指数构造
    pub const fn new(
        mass: f64,
        length: f64,
        time: f64,
        temperature: f64,
        moles: f64,
        current: f64,
        luminous_intensity: f64,
    ) -> Self {
        Self {
            exponents: [mass, length, time, temperature, moles, current, luminous_intensity],
        }
    }

    /// 由指数数组构造
    pub const fn from_exponents(exponents: [f64; N_DIMENSIONS]) -> Self {
        Self { exponents }
    }

    /// 指数数组
    #[inline]
    pub fn exponents(&self) -> &[f64; N_DIMENSIONS] {
        &self.exponents
    }

    /// 某一基本量纲的指数
    #[inline]
    pub fn exponent(&self, base: BaseDimension) -> f64 {
        self.exponents[base as usize]
    }

    /// 是否无量纲
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| e.abs() < EXPONENT_TOLERANCE)
    }

    /// 容差内相等
    pub fn matches(&self, other: &Self) -> bool {
        self.exponents
            .iter()
            .zip(other.exponents.iter())
            .all(|(a, b)| (a - b).abs() < EXPONENT_TOLERANCE)
    }

    /// 检查与另一量纲相同，否则返回 [`FvError::DimensionMismatch`]
    pub fn check_same(&self, other: &Self, operation: &str) -> FvResult<()> {
        if self.matches(other) {
            Ok(())
        } else {
            Err(FvError::dimension_mismatch(operation, self, other))
        }
    }

    /// 检查无量纲
    pub fn check_dimensionless(&self, operation: &str) -> FvResult<()> {
        self.check_same(&DIMLESS, operation)
    }

    /// 幂
    pub fn pow(&self, p: f64) -> Self {
        Self::from_exponents(self.exponents.map(|e| e * p))
    }

    /// 平方
    #[inline]
    pub fn sqr(&self) -> Self {
        self.pow(2.0)
    }

    /// 平方根
    #[inline]
    pub fn sqrt(&self) -> Self {
        self.pow(0.5)
    }

    /// 倒数
    #[inline]
    pub fn inv(&self) -> Self {
        self.pow(-1.0)
    }
}

impl Default for DimensionSet {
    fn default() -> Self {
        DIMLESS
    }
}

impl Mul for DimensionSet {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        let mut e = self.exponents;
        for (a, b) in e.iter_mut().zip(rhs.exponents.iter()) {
            *a += b;
        }
        Self::from_exponents(e)
    }
}

impl Div for DimensionSet {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        self * rhs.inv()
    }
}

impl fmt::Display for DimensionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, e) in self.exponents.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            // 整数指数不带小数点
            if e.fract() == 0.0 {
                write!(f, "{}", *e as i64)?;
            } else {
                write!(f, "{}", e)?;
            }
        }
        write!(f, "]")
    }
}

impl FromStr for DimensionSet {
    type Err = FvError;

    /// 解析 `[0 1 -1 0 0 0 0]`；只给出前 5 个指数时其余补零
    fn from_str(s: &str) -> FvResult<Self> {
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|t| t.strip_suffix(']'))
            .ok_or_else(|| FvError::parse("dimensions", 0, format!("量纲应以 [ ] 包围: {s}")))?;
        let values: Vec<f64> = inner
            .split_whitespace()
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| FvError::parse("dimensions", 0, format!("无效的量纲指数: {t}")))
            })
            .collect::<FvResult<_>>()?;
        Self::from_slice(&values)
    }
}

impl DimensionSet {
    /// 由 5 或 7 个指数构造
    pub fn from_slice(values: &[f64]) -> FvResult<Self> {
        if values.len() != 5 && values.len() != N_DIMENSIONS {
            return Err(FvError::parse(
                "dimensions",
                0,
                format!("量纲需要 5 或 7 个指数, 实际 {}", values.len()),
            ));
        }
        let mut exponents = [0.0; N_DIMENSIONS];
        exponents[..values.len()].copy_from_slice(values);
        Ok(Self::from_exponents(exponents))
    }
}

// ============================================================================
// 常用量纲
// ============================================================================

/// 无量纲
pub const DIMLESS: DimensionSet = DimensionSet::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
/// 质量
pub const DIM_MASS: DimensionSet = DimensionSet::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
/// 长度
pub const DIM_LENGTH: DimensionSet = DimensionSet::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0);
/// 时间
pub const DIM_TIME: DimensionSet = DimensionSet::new(0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
/// 温度
pub const DIM_TEMPERATURE: DimensionSet = DimensionSet::new(0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0);
/// 物质的量
pub const DIM_MOLES: DimensionSet = DimensionSet::new(0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0);
/// 面积
pub const DIM_AREA: DimensionSet = DimensionSet::new(0.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0);
/// 体积
pub const DIM_VOLUME: DimensionSet = DimensionSet::new(0.0, 3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
/// 速度
pub const DIM_VELOCITY: DimensionSet = DimensionSet::new(0.0, 1.0, -1.0, 0.0, 0.0, 0.0, 0.0);
/// 加速度
pub const DIM_ACCELERATION: DimensionSet = DimensionSet::new(0.0, 1.0, -2.0, 0.0, 0.0, 0.0, 0.0);
/// 密度
pub const DIM_DENSITY: DimensionSet = DimensionSet::new(1.0, -3.0, 0.0, 0.0, 0.0, 0.0, 0.0);
/// 压力
pub const DIM_PRESSURE: DimensionSet = DimensionSet::new(1.0, -1.0, -2.0, 0.0, 0.0, 0.0, 0.0);
/// 运动粘度 / 扩散系数
pub const DIM_KINEMATIC_VISCOSITY: DimensionSet =
    DimensionSet::new(0.0, 2.0, -1.0, 0.0, 0.0, 0.0, 0.0);
/// 体积通量
pub const DIM_FLUX: DimensionSet = DimensionSet::new(0.0, 3.0, -1.0, 0.0, 0.0, 0.0, 0.0);
/// 比能（湍动能、雷诺应力）
pub const DIM_SPECIFIC_ENERGY: DimensionSet =
    DimensionSet::new(0.0, 2.0, -2.0, 0.0, 0.0, 0.0, 0.0);
/// 耗散率
pub const DIM_DISSIPATION: DimensionSet = DimensionSet::new(0.0, 2.0, -3.0, 0.0, 0.0, 0.0, 0.0);

// ============================================================================
// 带量纲的值
// ============================================================================

/// 带名称和量纲的值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensioned<T> {
    /// 名称
    pub name: String,
    /// 量纲
    pub dimensions: DimensionSet,
    /// 数值
    pub value: T,
}

impl<T> Dimensioned<T> {
    /// 构造
    pub fn new(name: impl Into<String>, dimensions: DimensionSet, value: T) -> Self {
        Self {
            name: name.into(),
            dimensions,
            value,
        }
    }

    /// 无量纲值
    pub fn dimensionless(name: impl Into<String>, value: T) -> Self {
        Self::new(name, DIMLESS, value)
    }
}

impl Dimensioned<f64> {
    /// 与另一个标量相乘，量纲相乘
    pub fn mul(&self, other: &Dimensioned<f64>) -> Self {
        Self::new(
            format!("{}*{}", self.name, other.name),
            self.dimensions * other.dimensions,
            self.value * other.value,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_velocity_from_length_and_time() {
        assert!((DIM_LENGTH / DIM_TIME).matches(&DIM_VELOCITY));
        assert!((DIM_VELOCITY * DIM_AREA).matches(&DIM_FLUX));
    }

    #[test]
    fn test_display_and_parse() {
        let text = DIM_KINEMATIC_VISCOSITY.to_string();
        assert_eq!(text, "[0 2 -1 0 0 0 0]");
        let parsed: DimensionSet = text.parse().unwrap();
        assert!(parsed.matches(&DIM_KINEMATIC_VISCOSITY));
    }

    #[test]
    fn test_parse_five_exponents() {
        let parsed: DimensionSet = "[1 -1 -2 0 0]".parse().unwrap();
        assert!(parsed.matches(&DIM_PRESSURE));
    }

    #[test]
    fn test_fractional_exponent() {
        let d = DIM_AREA.sqrt();
        assert!(d.matches(&DIM_LENGTH));
        assert_eq!(DIM_LENGTH.pow(0.5).to_string(), "[0 0.5 0 0 0 0 0]");
    }

    #[test]
    fn test_check_same_reports_operation() {
        let err = DIM_LENGTH.check_same(&DIM_TIME, "T += U").unwrap_err();
        assert!(matches!(err, FvError::DimensionMismatch { .. }));
        assert!(err.to_string().contains("T += U"));
    }
}
