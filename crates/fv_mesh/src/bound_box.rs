// crates/fv_mesh/src/bound_box.rs

//! 轴对齐包围盒

use fv_foundation::Vector;
use serde::{Deserialize, Serialize};

/// 三维轴对齐包围盒
///
/// 空盒的 `min` 为 +∞、`max` 为 −∞，与任何盒都不相交。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundBox {
    /// 最小角点
    pub min: Vector,
    /// 最大角点
    pub max: Vector,
}

impl Default for BoundBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundBox {
    /// 空包围盒
    pub const fn empty() -> Self {
        Self {
            min: Vector::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Vector::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// 由角点构造
    pub fn new(min: Vector, max: Vector) -> Self {
        Self { min, max }
    }

    /// 包含全部点的最小包围盒
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vector>) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.add_point(*p);
        }
        bb
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// 扩展到包含点
    #[inline]
    pub fn add_point(&mut self, p: Vector) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// 扩展到包含另一个盒
    pub fn add_box(&mut self, other: &BoundBox) {
        if !other.is_empty() {
            self.min = self.min.min(other.min);
            self.max = self.max.max(other.max);
        }
    }

    /// 对角线矢量
    #[inline]
    pub fn span(&self) -> Vector {
        self.max - self.min
    }

    /// 对角线长度
    #[inline]
    pub fn mag(&self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            self.span().length()
        }
    }

    /// 中心
    #[inline]
    pub fn centre(&self) -> Vector {
        0.5 * (self.min + self.max)
    }

    /// 各方向按对角线长度的比例外扩
    pub fn inflate(&self, fraction: f64) -> Self {
        if self.is_empty() {
            return *self;
        }
        let d = Vector::splat(fraction * self.mag());
        Self {
            min: self.min - d,
            max: self.max + d,
        }
    }

    /// 两盒是否相交（闭区间）
    pub fn overlaps(&self, other: &BoundBox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// 点是否在盒内（闭区间）
    pub fn contains(&self, p: Vector) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// 转为 R-tree 坐标
    pub(crate) fn corners(&self) -> ([f64; 3], [f64; 3]) {
        (self.min.to_array(), self.max.to_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_never_overlaps() {
        let e = BoundBox::empty();
        let b = BoundBox::new(Vector::ZERO, Vector::ONE);
        assert!(e.is_empty());
        assert!(!e.overlaps(&b));
        assert!(!b.overlaps(&e));
        assert_eq!(e.mag(), 0.0);
    }

    #[test]
    fn test_touching_boxes_overlap() {
        let a = BoundBox::new(Vector::ZERO, Vector::ONE);
        let b = BoundBox::new(Vector::new(1.0, 0.0, 0.0), Vector::new(2.0, 1.0, 1.0));
        assert!(a.overlaps(&b));
        let c = BoundBox::new(Vector::new(1.5, 0.0, 0.0), Vector::new(2.0, 1.0, 1.0));
        assert!(!a.overlaps(&c));
        assert!(a.inflate(0.5).overlaps(&c));
    }

    #[test]
    fn test_from_points() {
        let pts = [Vector::new(1.0, -1.0, 0.0), Vector::new(-2.0, 3.0, 0.5)];
        let bb = BoundBox::from_points(&pts);
        assert_eq!(bb.min, Vector::new(-2.0, -1.0, 0.0));
        assert_eq!(bb.max, Vector::new(1.0, 3.0, 0.5));
        assert!(bb.contains(Vector::new(0.0, 0.0, 0.25)));
    }
}
