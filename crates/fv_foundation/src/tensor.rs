// crates/fv_foundation/src/tensor.rs

//! 二阶张量类型
//!
//! 向量直接使用 `glam::DVec3`；本模块补充对称张量 [`SymmTensor`] 与一般张量 [`Tensor`]，
//! 分量命名与行主序一致（`xy` 表示第 x 行第 y 列）。

use bytemuck::{Pod, Zeroable};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub, SubAssign};

/// 三维向量
pub type Vector = DVec3;

// ============================================================================
// 对称张量
// ============================================================================

/// 对称二阶张量（6 个独立分量）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
pub struct SymmTensor {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yy: f64,
    pub yz: f64,
    pub zz: f64,
}

impl SymmTensor {
    /// 零张量
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    /// 单位张量
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 1.0);

    /// 由分量构造
    pub const fn new(xx: f64, xy: f64, xz: f64, yy: f64, yz: f64, zz: f64) -> Self {
        Self { xx, xy, xz, yy, yz, zz }
    }

    /// 迹
    #[inline]
    pub fn tr(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// 偏量部分 `T - tr(T)/3 I`
    pub fn dev(&self) -> Self {
        *self - Self::IDENTITY * (self.tr() / 3.0)
    }

    /// 向量的并矢平方 `v ⊗ v`
    pub fn sqr(v: Vector) -> Self {
        Self::new(
            v.x * v.x,
            v.x * v.y,
            v.x * v.z,
            v.y * v.y,
            v.y * v.z,
            v.z * v.z,
        )
    }

    /// 张量与向量的内积 `T · v`
    pub fn dot_vec(&self, v: Vector) -> Vector {
        Vector::new(
            self.xx * v.x + self.xy * v.y + self.xz * v.z,
            self.xy * v.x + self.yy * v.y + self.yz * v.z,
            self.xz * v.x + self.yz * v.y + self.zz * v.z,
        )
    }

    /// 与一般张量的内积 `S · T`
    pub fn dot_tensor(&self, t: &Tensor) -> Tensor {
        Tensor::from(*self).dot(t)
    }

    /// 双点积 `S : S'`
    pub fn double_dot(&self, other: &Self) -> f64 {
        self.xx * other.xx
            + self.yy * other.yy
            + self.zz * other.zz
            + 2.0 * (self.xy * other.xy + self.xz * other.xz + self.yz * other.yz)
    }
}

impl Add for SymmTensor {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        Self::new(
            self.xx + o.xx,
            self.xy + o.xy,
            self.xz + o.xz,
            self.yy + o.yy,
            self.yz + o.yz,
            self.zz + o.zz,
        )
    }
}

impl Sub for SymmTensor {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        Self::new(
            self.xx - o.xx,
            self.xy - o.xy,
            self.xz - o.xz,
            self.yy - o.yy,
            self.yz - o.yz,
            self.zz - o.zz,
        )
    }
}

impl Neg for SymmTensor {
    type Output = Self;
    fn neg(self) -> Self {
        self * -1.0
    }
}

impl Mul<f64> for SymmTensor {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        Self::new(
            self.xx * s,
            self.xy * s,
            self.xz * s,
            self.yy * s,
            self.yz * s,
            self.zz * s,
        )
    }
}

impl Div<f64> for SymmTensor {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        self * (1.0 / s)
    }
}

impl AddAssign for SymmTensor {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl SubAssign for SymmTensor {
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}

impl MulAssign<f64> for SymmTensor {
    fn mul_assign(&mut self, s: f64) {
        *self = *self * s;
    }
}

// ============================================================================
// 一般张量
// ============================================================================

/// 一般二阶张量（9 个分量，行主序）
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
pub struct Tensor {
    pub xx: f64,
    pub xy: f64,
    pub xz: f64,
    pub yx: f64,
    pub yy: f64,
    pub yz: f64,
    pub zx: f64,
    pub zy: f64,
    pub zz: f64,
}

impl Tensor {
    /// 零张量
    pub const ZERO: Self = Self::from_rows([0.0; 3], [0.0; 3], [0.0; 3]);
    /// 单位张量
    pub const IDENTITY: Self = Self::from_rows([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]);

    /// 按行构造
    pub const fn from_rows(x: [f64; 3], y: [f64; 3], z: [f64; 3]) -> Self {
        Self {
            xx: x[0],
            xy: x[1],
            xz: x[2],
            yx: y[0],
            yy: y[1],
            yz: y[2],
            zx: z[0],
            zy: z[1],
            zz: z[2],
        }
    }

    /// 外积 `a ⊗ b`
    pub fn outer(a: Vector, b: Vector) -> Self {
        Self::from_rows(
            [a.x * b.x, a.x * b.y, a.x * b.z],
            [a.y * b.x, a.y * b.y, a.y * b.z],
            [a.z * b.x, a.z * b.y, a.z * b.z],
        )
    }

    /// 转置
    pub fn transpose(&self) -> Self {
        Self::from_rows(
            [self.xx, self.yx, self.zx],
            [self.xy, self.yy, self.zy],
            [self.xz, self.yz, self.zz],
        )
    }

    /// 迹
    #[inline]
    pub fn tr(&self) -> f64 {
        self.xx + self.yy + self.zz
    }

    /// 对称部分 `(T + Tᵀ)/2`
    pub fn symm(&self) -> SymmTensor {
        SymmTensor::new(
            self.xx,
            0.5 * (self.xy + self.yx),
            0.5 * (self.xz + self.zx),
            self.yy,
            0.5 * (self.yz + self.zy),
            self.zz,
        )
    }

    /// `T + Tᵀ`
    pub fn two_symm(&self) -> SymmTensor {
        self.symm() * 2.0
    }

    /// `T · v`
    pub fn dot_vec(&self, v: Vector) -> Vector {
        Vector::new(
            self.xx * v.x + self.xy * v.y + self.xz * v.z,
            self.yx * v.x + self.yy * v.y + self.yz * v.z,
            self.zx * v.x + self.zy * v.y + self.zz * v.z,
        )
    }

    /// `v · T`
    pub fn vec_dot(&self, v: Vector) -> Vector {
        self.transpose().dot_vec(v)
    }

    /// 张量乘积 `A · B`
    pub fn dot(&self, b: &Tensor) -> Tensor {
        let r = |a: [f64; 3]| {
            [
                a[0] * b.xx + a[1] * b.yx + a[2] * b.zx,
                a[0] * b.xy + a[1] * b.yy + a[2] * b.zy,
                a[0] * b.xz + a[1] * b.yz + a[2] * b.zz,
            ]
        };
        Tensor::from_rows(
            r([self.xx, self.xy, self.xz]),
            r([self.yx, self.yy, self.yz]),
            r([self.zx, self.zy, self.zz]),
        )
    }
}

impl From<SymmTensor> for Tensor {
    fn from(s: SymmTensor) -> Self {
        Self::from_rows([s.xx, s.xy, s.xz], [s.xy, s.yy, s.yz], [s.xz, s.yz, s.zz])
    }
}

impl Add for Tensor {
    type Output = Self;
    fn add(self, o: Self) -> Self {
        let a: [f64; 9] = bytemuck::cast(self);
        let b: [f64; 9] = bytemuck::cast(o);
        bytemuck::cast(std::array::from_fn::<f64, 9, _>(|i| a[i] + b[i]))
    }
}

impl Sub for Tensor {
    type Output = Self;
    fn sub(self, o: Self) -> Self {
        let a: [f64; 9] = bytemuck::cast(self);
        let b: [f64; 9] = bytemuck::cast(o);
        bytemuck::cast(std::array::from_fn::<f64, 9, _>(|i| a[i] - b[i]))
    }
}

impl Neg for Tensor {
    type Output = Self;
    fn neg(self) -> Self {
        self * -1.0
    }
}

impl Mul<f64> for Tensor {
    type Output = Self;
    fn mul(self, s: f64) -> Self {
        let a: [f64; 9] = bytemuck::cast(self);
        bytemuck::cast(a.map(|v| v * s))
    }
}

impl Div<f64> for Tensor {
    type Output = Self;
    fn div(self, s: f64) -> Self {
        self * (1.0 / s)
    }
}

impl AddAssign for Tensor {
    fn add_assign(&mut self, o: Self) {
        *self = *self + o;
    }
}

impl SubAssign for Tensor {
    fn sub_assign(&mut self, o: Self) {
        *self = *self - o;
    }
}

impl MulAssign<f64> for Tensor {
    fn mul_assign(&mut self, s: f64) {
        *self = *self * s;
    }
}
