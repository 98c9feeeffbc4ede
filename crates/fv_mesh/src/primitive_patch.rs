// crates/fv_mesh/src/primitive_patch.rs

//! 独立面集合
//!
//! 把补丁面从网格中拷贝出来，使用局部点编号，并计算面中心、面积矢量、
//! 面包围盒以及经公共边相邻的面。耦合层在进程间传递的正是这种结构，
//! 因此支持 serde 序列化。

use crate::bound_box::BoundBox;
use crate::geometry::face_centre_and_area;
use crate::poly_mesh::PolyMesh;
use crate::spatial_index::FaceSpatialIndex;
use fv_foundation::Vector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 独立面集合
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrimitivePatch {
    /// 局部点坐标
    points: Vec<Vector>,
    /// 面（局部点编号）
    faces: Vec<Vec<usize>>,
    /// 每个面在来源补丁中的编号
    face_labels: Vec<usize>,
    face_centres: Vec<Vector>,
    face_areas: Vec<Vector>,
}

impl PrimitivePatch {
    /// 由点和面直接构造；面引用 `points` 的编号
    pub fn new(points: Vec<Vector>, faces: Vec<Vec<usize>>) -> Self {
        let labels = (0..faces.len()).collect();
        Self::with_labels(points, faces, labels)
    }

    /// 构造并指定来源编号
    pub fn with_labels(points: Vec<Vector>, faces: Vec<Vec<usize>>, face_labels: Vec<usize>) -> Self {
        let (face_centres, face_areas) = faces
            .iter()
            .map(|f| face_centre_and_area(&points, f))
            .unzip();
        Self {
            points,
            faces,
            face_labels,
            face_centres,
            face_areas,
        }
    }

    /// 从网格补丁拷贝
    pub fn from_patch(mesh: &PolyMesh, patch: usize) -> Self {
        let range = mesh.patch(patch).range();
        let faces: Vec<&Vec<usize>> = mesh.faces()[range].iter().collect();
        Self::from_mesh_faces(mesh.points(), &faces)
    }

    /// 从全局点与面拷贝，重新编号点
    pub fn from_mesh_faces(mesh_points: &[Vector], faces: &[&Vec<usize>]) -> Self {
        let mut local_of: HashMap<usize, usize> = HashMap::new();
        let mut points = Vec::new();
        let local_faces: Vec<Vec<usize>> = faces
            .iter()
            .map(|face| {
                face.iter()
                    .map(|&p| {
                        *local_of.entry(p).or_insert_with(|| {
                            points.push(mesh_points[p]);
                            points.len() - 1
                        })
                    })
                    .collect::<Vec<usize>>()
            })
            .collect();
        Self::new(points, local_faces)
    }

    /// 选取部分面组成新的集合，来源编号沿用原值
    pub fn subset(&self, faces: &[usize]) -> Self {
        let selected: Vec<&Vec<usize>> = faces.iter().map(|&f| &self.faces[f]).collect();
        let mut sub = Self::from_mesh_faces(&self.points, &selected);
        sub.face_labels = faces.iter().map(|&f| self.face_labels[f]).collect();
        sub
    }

    /// 平移
    pub fn translated(&self, offset: Vector) -> Self {
        let points = self.points.iter().map(|p| *p + offset).collect();
        Self::with_labels(points, self.faces.clone(), self.face_labels.clone())
    }

    /// 翻转全部面的法向（反转点序）
    pub fn flipped(&self) -> Self {
        let faces = self
            .faces
            .iter()
            .map(|f| f.iter().rev().copied().collect())
            .collect();
        Self::with_labels(self.points.clone(), faces, self.face_labels.clone())
    }

    // =========================================================================
    // 访问
    // =========================================================================

    #[inline]
    pub fn len(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    #[inline]
    pub fn points(&self) -> &[Vector] {
        &self.points
    }

    #[inline]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    /// 面的点坐标
    pub fn face_points(&self, face: usize) -> Vec<Vector> {
        self.faces[face].iter().map(|&p| self.points[p]).collect()
    }

    #[inline]
    pub fn face_labels(&self) -> &[usize] {
        &self.face_labels
    }

    #[inline]
    pub fn face_centres(&self) -> &[Vector] {
        &self.face_centres
    }

    #[inline]
    pub fn face_areas(&self) -> &[Vector] {
        &self.face_areas
    }

    /// 单位法向
    pub fn face_normals(&self) -> Vec<Vector> {
        self.face_areas
            .iter()
            .map(|a| a.normalize_or_zero())
            .collect()
    }

    /// 面积大小
    pub fn mag_face_areas(&self) -> Vec<f64> {
        self.face_areas.iter().map(|a| a.length()).collect()
    }

    /// 每个面的包围盒
    pub fn face_bounds(&self) -> Vec<BoundBox> {
        self.faces
            .iter()
            .map(|f| BoundBox::from_points(f.iter().map(|&p| &self.points[p])))
            .collect()
    }

    /// 整体包围盒
    pub fn bounds(&self) -> BoundBox {
        let mut bb = BoundBox::empty();
        for f in &self.faces {
            for &p in f {
                bb.add_point(self.points[p]);
            }
        }
        bb
    }

    /// 面包围盒 R-Tree
    pub fn spatial_index(&self) -> FaceSpatialIndex {
        FaceSpatialIndex::build(&self.face_bounds())
    }

    /// 经公共边相邻的面，每行升序
    pub fn face_faces(&self) -> Vec<Vec<usize>> {
        let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (fi, f) in self.faces.iter().enumerate() {
            for i in 0..f.len() {
                let (a, b) = (f[i], f[(i + 1) % f.len()]);
                edge_faces.entry((a.min(b), a.max(b))).or_default().push(fi);
            }
        }
        let mut result = vec![Vec::new(); self.faces.len()];
        for faces in edge_faces.values() {
            for &a in faces {
                for &b in faces {
                    if a != b {
                        result[a].push(b);
                    }
                }
            }
        }
        for row in &mut result {
            row.sort_unstable();
            row.dedup();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::unit_square_patch;

    #[test]
    fn test_face_faces_of_grid() {
        let patch = unit_square_patch(3, 3);
        let ff = patch.face_faces();
        // 角上的面两个邻居，中心的面四个
        assert_eq!(ff[0], vec![1, 3]);
        assert_eq!(ff[4], vec![1, 3, 5, 7]);
    }

    #[test]
    fn test_subset_keeps_labels() {
        let patch = unit_square_patch(2, 2);
        let sub = patch.subset(&[3, 1]);
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.face_labels(), &[3, 1]);
        assert!((sub.face_centres()[0] - patch.face_centres()[3]).length() < 1e-14);
        // 两个面共享两个点
        assert_eq!(sub.points().len(), 6);
    }

    #[test]
    fn test_flipped_reverses_normals() {
        let p = unit_square_patch(2, 1);
        let q = p.flipped();
        for (a, b) in p.face_areas().iter().zip(q.face_areas()) {
            assert!((*a + *b).length() < 1e-14);
        }
        for (a, b) in p.face_centres().iter().zip(q.face_centres()) {
            assert!((*a - *b).length() < 1e-14);
        }
    }

    #[test]
    fn test_bounds_and_normals() {
        let patch = unit_square_patch(4, 4).translated(Vector::new(0.0, 0.0, 2.0));
        let bb = patch.bounds();
        assert_eq!(bb.min, Vector::new(0.0, 0.0, 2.0));
        assert_eq!(bb.max, Vector::new(1.0, 1.0, 2.0));
        let total: f64 = patch.mag_face_areas().iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        for n in patch.face_normals() {
            assert!((n - Vector::Z).length() < 1e-12);
        }
    }
}
