// crates/fv_models/src/turbulence/wall_dist.rs

//! 单元到最近壁面的距离与壁面法向
//!
//! 壁面面包围盒建 R-Tree，每个单元中心查最近包围盒。对于平面壁面，
//! 包围盒距离就是到面的距离。结果随网格几何版本缓存。

use fv_core::FvMesh;
use fv_foundation::value::GREAT;
use fv_foundation::Vector;
use fv_mesh::{BoundBox, FaceSpatialIndex, PrimitivePatch};

/// 壁面距离
#[derive(Debug, Clone)]
pub struct WallDistance {
    geometry_version: u64,
    y: Vec<f64>,
    n: Vec<Vector>,
}

impl WallDistance {
    /// 计算全部单元的壁面距离；没有壁面时距离为 GREAT、法向为零
    pub fn new(mesh: &FvMesh) -> Self {
        let mut bounds: Vec<BoundBox> = Vec::new();
        let mut normals: Vec<Vector> = Vec::new();
        for p in 0..mesh.n_patches() {
            if !mesh.patch(p).kind().is_wall() {
                continue;
            }
            let patch = PrimitivePatch::from_patch(mesh.poly(), p);
            bounds.extend(patch.face_bounds());
            normals.extend(patch.face_normals());
        }

        let n_cells = mesh.n_cells();
        if bounds.is_empty() {
            tracing::debug!("网格没有壁面, 壁面距离取 GREAT");
            return Self {
                geometry_version: mesh.geometry_version(),
                y: vec![GREAT; n_cells],
                n: vec![Vector::ZERO; n_cells],
            };
        }

        let index = FaceSpatialIndex::build(&bounds);
        let mut y = Vec::with_capacity(n_cells);
        let mut n = Vec::with_capacity(n_cells);
        for &c in mesh.cell_centres() {
            let (dist, normal) = match index.nearest(c) {
                Some(f) => (box_distance(&bounds[f], c), normals[f]),
                None => (GREAT, Vector::ZERO),
            };
            y.push(dist);
            n.push(normal);
        }
        tracing::debug!(
            wall_faces = bounds.len(),
            min = y.iter().copied().fold(GREAT, f64::min),
            "壁面距离"
        );
        Self {
            geometry_version: mesh.geometry_version(),
            y,
            n,
        }
    }

    /// 网格移动后重新计算
    pub fn update(&mut self, mesh: &FvMesh) {
        if self.geometry_version != mesh.geometry_version() {
            *self = Self::new(mesh);
        }
    }

    /// 单元到最近壁面的距离
    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// 最近壁面面的单位法向
    pub fn n(&self) -> &[Vector] {
        &self.n
    }
}

fn box_distance(bounds: &BoundBox, p: Vector) -> f64 {
    (p - p.clamp(bounds.min, bounds.max)).length()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::{BoxMeshBuilder, BoxSide, PatchKind};

    #[test]
    fn test_channel_wall_distance() {
        let poly = BoxMeshBuilder::new(2, 4, 1, 1.0, 2.0, 0.5)
            .with_patch(BoxSide::YMin, "bottom", PatchKind::Wall)
            .with_patch(BoxSide::YMax, "top", PatchKind::Wall)
            .build()
            .unwrap();
        let mesh = FvMesh::new(poly).unwrap();
        let wd = WallDistance::new(&mesh);
        for (c, (&y, n)) in mesh.cell_centres().iter().zip(wd.y().iter().zip(wd.n())) {
            let expected = c.y.min(2.0 - c.y);
            assert!((y - expected).abs() < 1e-12, "{y} vs {expected}");
            assert!((n.y.abs() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_no_walls() {
        let mesh = FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap();
        let wd = WallDistance::new(&mesh);
        assert!(wd.y().iter().all(|&y| y == GREAT));
    }
}
