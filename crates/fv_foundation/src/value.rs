// crates/fv_foundation/src/value.rs

//! 场值类型抽象
//!
//! [`FieldValue`] 让同一套离散代码同时作用于标量、向量和张量：
//! 所有运算都可以拆成逐分量的标量运算，矩阵求解也按分量分离进行。
//!
//! 已实现的类型：
//!
//! | 类型 | 分量数 | 文本名 |
//! |------|--------|--------|
//! | `f64` | 1 | `scalar` |
//! | [`Vector`] | 3 | `vector` |
//! | [`SymmTensor`] | 6 | `symmTensor` |
//! | [`Tensor`] | 9 | `tensor` |
//!
//! 该 trait 通过 sealed 模式封闭，外部 crate 不能追加实现。

use crate::tensor::{SymmTensor, Tensor, Vector};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// ============================================================================
// 数值常量
// ============================================================================

/// 小量
pub const SMALL: f64 = 1.0e-15;
/// 极小量
pub const VSMALL: f64 = 1.0e-300;
/// 极小量的平方根
pub const ROOT_VSMALL: f64 = 1.0e-150;
/// 大量
pub const GREAT: f64 = 1.0e15;
/// 极大量
pub const VGREAT: f64 = 1.0e300;

mod private {
    pub trait Sealed {}
    impl Sealed for f64 {}
    impl Sealed for super::Vector {}
    impl Sealed for super::SymmTensor {}
    impl Sealed for super::Tensor {}
}

/// 场值类型
pub trait FieldValue:
    Copy
    + Debug
    + Default
    + PartialEq
    + Send
    + Sync
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + Mul<f64, Output = Self>
    + AddAssign
    + SubAssign
    + Serialize
    + DeserializeOwned
    + private::Sealed
{
    /// 分量数
    const N_COMPONENTS: usize;

    /// 文本格式中的类型名
    const TYPE_NAME: &'static str;

    /// 读取第 `i` 个分量
    fn component(&self, i: usize) -> f64;

    /// 设置第 `i` 个分量
    fn set_component(&mut self, i: usize, value: f64);

    /// 零值
    #[inline]
    fn zero() -> Self {
        Self::default()
    }

    /// 所有分量取同一值
    fn splat(value: f64) -> Self {
        let mut v = Self::zero();
        for i in 0..Self::N_COMPONENTS {
            v.set_component(i, value);
        }
        v
    }

    /// 所有分量为 1
    #[inline]
    fn one() -> Self {
        Self::splat(1.0)
    }

    /// 所有分量为 NaN
    #[inline]
    fn nan() -> Self {
        Self::splat(f64::NAN)
    }

    /// 由分量切片构造（长度不足的分量补零）
    fn from_components(components: &[f64]) -> Self {
        let mut v = Self::zero();
        for (i, c) in components.iter().take(Self::N_COMPONENTS).enumerate() {
            v.set_component(i, *c);
        }
        v
    }

    /// 分量列表
    fn components(&self) -> Vec<f64> {
        (0..Self::N_COMPONENTS).map(|i| self.component(i)).collect()
    }

    /// 模的平方（各分量平方和）
    fn mag_sqr(&self) -> f64 {
        (0..Self::N_COMPONENTS).map(|i| self.component(i).powi(2)).sum()
    }

    /// 模
    #[inline]
    fn mag(&self) -> f64 {
        self.mag_sqr().sqrt()
    }

    /// 逐分量乘法
    fn cmpt_multiply(&self, other: &Self) -> Self {
        let mut v = *self;
        for i in 0..Self::N_COMPONENTS {
            v.set_component(i, self.component(i) * other.component(i));
        }
        v
    }

    /// 逐分量取绝对值
    fn cmpt_mag(&self) -> Self {
        let mut v = *self;
        for i in 0..Self::N_COMPONENTS {
            v.set_component(i, self.component(i).abs());
        }
        v
    }

    /// 最大分量
    fn cmpt_max(&self) -> f64 {
        (0..Self::N_COMPONENTS)
            .map(|i| self.component(i))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// 最小分量
    fn cmpt_min(&self) -> f64 {
        (0..Self::N_COMPONENTS)
            .map(|i| self.component(i))
            .fold(f64::INFINITY, f64::min)
    }

    /// 逐分量取较大值
    fn max_cmpt(&self, other: &Self) -> Self {
        let mut v = *self;
        for i in 0..Self::N_COMPONENTS {
            v.set_component(i, self.component(i).max(other.component(i)));
        }
        v
    }

    /// 逐分量取较小值
    fn min_cmpt(&self, other: &Self) -> Self {
        let mut v = *self;
        for i in 0..Self::N_COMPONENTS {
            v.set_component(i, self.component(i).min(other.component(i)));
        }
        v
    }

    /// 是否含 NaN 分量
    fn has_nan(&self) -> bool {
        (0..Self::N_COMPONENTS).any(|i| self.component(i).is_nan())
    }
}

// ============================================================================
// 实现
// ============================================================================

impl FieldValue for f64 {
    const N_COMPONENTS: usize = 1;
    const TYPE_NAME: &'static str = "scalar";

    #[inline]
    fn component(&self, _i: usize) -> f64 {
        *self
    }

    #[inline]
    fn set_component(&mut self, _i: usize, value: f64) {
        *self = value;
    }

    #[inline]
    fn mag_sqr(&self) -> f64 {
        self * self
    }
}

impl FieldValue for Vector {
    const N_COMPONENTS: usize = 3;
    const TYPE_NAME: &'static str = "vector";

    #[inline]
    fn component(&self, i: usize) -> f64 {
        self[i]
    }

    #[inline]
    fn set_component(&mut self, i: usize, value: f64) {
        self[i] = value;
    }

    #[inline]
    fn mag_sqr(&self) -> f64 {
        self.length_squared()
    }
}

impl FieldValue for SymmTensor {
    const N_COMPONENTS: usize = 6;
    const TYPE_NAME: &'static str = "symmTensor";

    #[inline]
    fn component(&self, i: usize) -> f64 {
        bytemuck::cast_ref::<Self, [f64; 6]>(self)[i]
    }

    #[inline]
    fn set_component(&mut self, i: usize, value: f64) {
        bytemuck::cast_mut::<Self, [f64; 6]>(self)[i] = value;
    }

    /// 对称张量的模按完整张量计（非对角分量计两次）
    fn mag_sqr(&self) -> f64 {
        self.double_dot(self)
    }
}

impl FieldValue for Tensor {
    const N_COMPONENTS: usize = 9;
    const TYPE_NAME: &'static str = "tensor";

    #[inline]
    fn component(&self, i: usize) -> f64 {
        bytemuck::cast_ref::<Self, [f64; 9]>(self)[i]
    }

    #[inline]
    fn set_component(&mut self, i: usize, value: f64) {
        bytemuck::cast_mut::<Self, [f64; 9]>(self)[i] = value;
    }
}

// ============================================================================
// 梯度与散度的类型映射
// ============================================================================

/// 可求梯度的场值类型：`grad(T)` 的结果类型及面外积 `Sf ⊗ T`
pub trait Gradient: FieldValue {
    /// 梯度类型
    type Grad: FieldValue;

    /// 面法向量与值的外积
    fn outer(sf: Vector, value: Self) -> Self::Grad;

    /// `n · G`（用于边界法向修正）
    fn normal_dot(n: Vector, grad: &Self::Grad) -> Self;
}

impl Gradient for f64 {
    type Grad = Vector;

    #[inline]
    fn outer(sf: Vector, value: f64) -> Vector {
        sf * value
    }

    #[inline]
    fn normal_dot(n: Vector, grad: &Vector) -> f64 {
        n.dot(*grad)
    }
}

impl Gradient for Vector {
    type Grad = Tensor;

    #[inline]
    fn outer(sf: Vector, value: Vector) -> Tensor {
        Tensor::outer(sf, value)
    }

    #[inline]
    fn normal_dot(n: Vector, grad: &Tensor) -> Vector {
        grad.vec_dot(n)
    }
}

/// 可求散度的场值类型：`div(T) = Σ Sf · T_f`
pub trait Divergence: FieldValue {
    /// 散度类型
    type Div: FieldValue;

    /// 面法向量与值的内积
    fn inner(sf: Vector, value: Self) -> Self::Div;
}

impl Divergence for Vector {
    type Div = f64;

    #[inline]
    fn inner(sf: Vector, value: Vector) -> f64 {
        sf.dot(value)
    }
}

impl Divergence for SymmTensor {
    type Div = Vector;

    #[inline]
    fn inner(sf: Vector, value: SymmTensor) -> Vector {
        value.dot_vec(sf)
    }
}

impl Divergence for Tensor {
    type Div = Vector;

    #[inline]
    fn inner(sf: Vector, value: Tensor) -> Vector {
        value.vec_dot(sf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components_round_trip() {
        let s = SymmTensor::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let back = SymmTensor::from_components(&s.components());
        assert_eq!(s, back);
        assert_eq!(s.component(3), 4.0);
    }

    #[test]
    fn test_nan_and_one() {
        assert!(Vector::nan().has_nan());
        assert!(<f64 as FieldValue>::nan().is_nan());
        assert!(<SymmTensor as FieldValue>::nan().has_nan());
        assert_eq!(Vector::one(), Vector::new(1.0, 1.0, 1.0));
        assert_eq!(<f64 as FieldValue>::one(), 1.0);
    }

    #[test]
    fn test_cmpt_helpers() {
        let v = Vector::new(-2.0, 1.0, 3.0);
        assert_eq!(v.cmpt_max(), 3.0);
        assert_eq!(v.cmpt_min(), -2.0);
        assert_eq!(v.cmpt_mag(), Vector::new(2.0, 1.0, 3.0));
        assert_eq!(
            v.cmpt_multiply(&Vector::new(1.0, 2.0, 3.0)),
            Vector::new(-2.0, 2.0, 9.0)
        );
    }

    #[test]
    fn test_symm_mag_counts_off_diagonal_twice() {
        let s = SymmTensor::new(0.0, 1.0, 0.0, 0.0, 0.0, 0.0);
        assert!((s.mag_sqr() - 2.0).abs() < 1e-14);
    }

    #[test]
    fn test_gradient_type_mapping() {
        let sf = Vector::new(0.0, 0.0, 2.0);
        assert_eq!(<f64 as Gradient>::outer(sf, 3.0), Vector::new(0.0, 0.0, 6.0));
        let g = <Vector as Gradient>::outer(sf, Vector::new(1.0, 0.0, 0.0));
        assert_eq!(g.zx, 2.0);
        assert_eq!(<Vector as Divergence>::inner(sf, Vector::new(0.0, 0.0, 1.0)), 2.0);
    }
}
