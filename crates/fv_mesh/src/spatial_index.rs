// crates/fv_mesh/src/spatial_index.rs

//! 面空间索引
//!
//! 基于 rstar R-Tree 的三维面包围盒索引，用于：
//!
//! - 包围盒相交查询：补丁耦合中寻找候选目标面
//! - 最近面查询：最近面映射、壁面距离
//!
//! R-Tree 本身不参与序列化，需要时由面包围盒重建。

use crate::bound_box::BoundBox;
use fv_foundation::Vector;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// 面包围盒
#[derive(Debug, Clone)]
pub struct FaceEnvelope {
    /// 面索引（索引构建时的局部编号）
    pub face: usize,
    /// 包围盒
    pub bounds: BoundBox,
}

impl RTreeObject for FaceEnvelope {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        let (lo, hi) = self.bounds.corners();
        AABB::from_corners(lo, hi)
    }
}

impl PointDistance for FaceEnvelope {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        // 点到 AABB 的最短距离平方
        let p = Vector::from_array(*point);
        let d = (self.bounds.min - p).max(Vector::ZERO).max(p - self.bounds.max);
        d.length_squared()
    }

    fn contains_point(&self, point: &[f64; 3]) -> bool {
        self.bounds.contains(Vector::from_array(*point))
    }
}

/// 面 R-Tree 索引
pub struct FaceSpatialIndex {
    tree: RTree<FaceEnvelope>,
    n_faces: usize,
}

impl FaceSpatialIndex {
    /// 由面包围盒构建；空盒不进入索引
    pub fn build(boxes: &[BoundBox]) -> Self {
        let envelopes: Vec<FaceEnvelope> = boxes
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty())
            .map(|(face, b)| FaceEnvelope { face, bounds: *b })
            .collect();
        Self {
            tree: RTree::bulk_load(envelopes),
            n_faces: boxes.len(),
        }
    }

    /// 构建时的面数量
    #[inline]
    pub fn n_faces(&self) -> usize {
        self.n_faces
    }

    /// 与给定包围盒相交的面，升序
    pub fn overlapping(&self, bounds: &BoundBox) -> Vec<usize> {
        if bounds.is_empty() {
            return Vec::new();
        }
        let (lo, hi) = bounds.corners();
        let envelope = AABB::from_corners(lo, hi);
        let mut faces: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.face)
            .collect();
        faces.sort_unstable();
        faces
    }

    /// 包围盒离点最近的面
    pub fn nearest(&self, point: Vector) -> Option<usize> {
        self.tree.nearest_neighbor(&point.to_array()).map(|e| e.face)
    }

    /// 包围盒离点最近的 k 个面，按距离升序
    pub fn k_nearest(&self, point: Vector, k: usize) -> Vec<usize> {
        self.tree
            .nearest_neighbor_iter(&point.to_array())
            .take(k)
            .map(|e| e.face)
            .collect()
    }
}
