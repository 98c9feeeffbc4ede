// crates/fv_core/src/fv_mesh.rs

//! 有限体积网格
//!
//! 在 [`PolyMesh`] 之上补充离散所需的几何量：
//!
//! - `delta`：所有者单元中心到相邻单元中心（边界面为面中心）的矢量；
//!   cyclic 面取经平移后对侧单元中心
//! - `weights`：线性插值权重 w，面值 = w·ψ_P + (1−w)·ψ_N，边界面为 1
//! - `delta_coeffs`：1 / max(n·d, 0.05|d|)
//!
//! 网格与运行时钟共享；场通过 `Arc<FvMesh>` 持有网格。

use crate::time::{RunTime, SharedRunTime};
use fv_foundation::{FvError, FvResult, Vector};
use fv_mesh::{PatchKind, PolyMesh, PolyPatch};
use std::ops::Range;
use std::sync::Arc;

/// 非正交情况下法向距离的下限（相对 |d|）
const MIN_NORMAL_DISTANCE_FRACTION: f64 = 0.05;

/// 有限体积网格
#[derive(Debug)]
pub struct FvMesh {
    poly: PolyMesh,
    time: SharedRunTime,
    delta: Vec<Vector>,
    weights: Vec<f64>,
    delta_coeffs: Vec<f64>,
    /// cyclic 补丁的对侧补丁索引
    coupled_neighbour: Vec<Option<usize>>,
}

impl FvMesh {
    /// 以新时钟（起点 0，步长 1）创建
    pub fn new(poly: PolyMesh) -> FvResult<Self> {
        Self::with_time(poly, RunTime::default().shared())
    }

    /// 与给定时钟共享创建
    pub fn with_time(poly: PolyMesh, time: SharedRunTime) -> FvResult<Self> {
        let coupled_neighbour = resolve_coupling(&poly)?;
        let mut mesh = Self {
            poly,
            time,
            delta: Vec::new(),
            weights: Vec::new(),
            delta_coeffs: Vec::new(),
            coupled_neighbour,
        };
        mesh.compute_geometry();
        Ok(mesh)
    }

    /// 移动网格点，得到共享同一时钟的新网格
    pub fn moved(&self, points: Vec<Vector>) -> FvResult<FvMesh> {
        let poly = self.poly.moved(points)?;
        Self::with_time(poly, Arc::clone(&self.time))
    }

    fn compute_geometry(&mut self) {
        let poly = &self.poly;
        let n_faces = poly.n_faces();
        let n_internal = poly.n_internal_faces();
        let cc = poly.cell_centres();
        let cf = poly.face_centres();
        let sf = poly.face_areas();
        let owner = poly.owner();
        let neighbour = poly.neighbour();

        let mut delta = vec![Vector::ZERO; n_faces];
        let mut weights = vec![1.0; n_faces];

        for f in 0..n_internal {
            let (o, n) = (owner[f], neighbour[f]);
            delta[f] = cc[n] - cc[o];
            let d_own = sf[f].dot(cf[f] - cc[o]).abs();
            let d_nei = sf[f].dot(cc[n] - cf[f]).abs();
            weights[f] = linear_weight(d_own, d_nei);
        }

        for (i, patch) in poly.patches().iter().enumerate() {
            let cells = poly.patch_face_cells(i);
            match self.coupled_neighbour[i] {
                Some(nbr) => {
                    let nbr_patch = poly.patch(nbr);
                    let nbr_cells = poly.patch_face_cells(nbr);
                    for (local, face) in patch.range().enumerate() {
                        let nbr_face = nbr_patch.start() + local;
                        let own_side = cf[face] - cc[cells[local]];
                        let nbr_side = cc[nbr_cells[local]] - cf[nbr_face];
                        delta[face] = own_side + nbr_side;
                        let n = sf[face].normalize_or_zero();
                        weights[face] =
                            linear_weight(n.dot(own_side).abs(), n.dot(nbr_side).abs());
                    }
                }
                None => {
                    for (local, face) in patch.range().enumerate() {
                        delta[face] = cf[face] - cc[cells[local]];
                    }
                }
            }
        }

        let delta_coeffs = (0..n_faces)
            .map(|f| {
                let d = delta[f];
                let n = sf[f].normalize_or_zero();
                let normal = n.dot(d).max(MIN_NORMAL_DISTANCE_FRACTION * d.length());
                if normal > 0.0 {
                    1.0 / normal
                } else {
                    0.0
                }
            })
            .collect();

        self.delta = delta;
        self.weights = weights;
        self.delta_coeffs = delta_coeffs;
    }

    // =========================================================================
    // 标识与时钟
    // =========================================================================

    /// 网格实例 id
    #[inline]
    pub fn id(&self) -> u64 {
        self.poly.id()
    }

    /// 拓扑 id，移动网格后保持不变
    #[inline]
    pub fn topology_id(&self) -> u64 {
        self.poly.topology_id()
    }

    /// 几何版本号
    #[inline]
    pub fn geometry_version(&self) -> u64 {
        self.poly.geometry_version()
    }

    /// 底层多面体网格
    #[inline]
    pub fn poly(&self) -> &PolyMesh {
        &self.poly
    }

    /// 共享时钟
    #[inline]
    pub fn time(&self) -> &SharedRunTime {
        &self.time
    }

    /// 当前时间索引
    pub fn time_index(&self) -> usize {
        self.time.read().index()
    }

    /// (Δt, Δt₀)
    pub fn delta_t_pair(&self) -> (f64, f64) {
        let t = self.time.read();
        (t.delta_t(), t.delta_t0())
    }

    // =========================================================================
    // 尺寸与几何
    // =========================================================================

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.poly.n_cells()
    }

    #[inline]
    pub fn n_faces(&self) -> usize {
        self.poly.n_faces()
    }

    #[inline]
    pub fn n_internal_faces(&self) -> usize {
        self.poly.n_internal_faces()
    }

    #[inline]
    pub fn n_patches(&self) -> usize {
        self.poly.n_patches()
    }

    #[inline]
    pub fn owner(&self) -> &[usize] {
        self.poly.owner()
    }

    #[inline]
    pub fn neighbour(&self) -> &[usize] {
        self.poly.neighbour()
    }

    /// 单元体积 V
    #[inline]
    pub fn volumes(&self) -> &[f64] {
        self.poly.cell_volumes()
    }

    /// 单元中心 C
    #[inline]
    pub fn cell_centres(&self) -> &[Vector] {
        self.poly.cell_centres()
    }

    /// 面面积矢量 Sf
    #[inline]
    pub fn sf(&self) -> &[Vector] {
        self.poly.face_areas()
    }

    /// 面面积 |Sf|
    #[inline]
    pub fn mag_sf(&self) -> &[f64] {
        self.poly.mag_face_areas()
    }

    /// 面中心 Cf
    #[inline]
    pub fn cf(&self) -> &[Vector] {
        self.poly.face_centres()
    }

    /// 面插值权重
    #[inline]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// 面法向差分系数
    #[inline]
    pub fn delta_coeffs(&self) -> &[f64] {
        &self.delta_coeffs
    }

    /// 单元中心差矢量
    #[inline]
    pub fn delta(&self) -> &[Vector] {
        &self.delta
    }

    // =========================================================================
    // 补丁
    // =========================================================================

    #[inline]
    pub fn patch(&self, index: usize) -> &PolyPatch {
        self.poly.patch(index)
    }

    /// 补丁的网格面区间
    #[inline]
    pub fn patch_range(&self, index: usize) -> Range<usize> {
        self.poly.patch(index).range()
    }

    /// 补丁面的所有者单元
    #[inline]
    pub fn patch_face_cells(&self, index: usize) -> &[usize] {
        self.poly.patch_face_cells(index)
    }

    /// 补丁权重
    pub fn patch_weights(&self, index: usize) -> &[f64] {
        &self.weights[self.patch_range(index)]
    }

    /// 补丁差分系数
    pub fn patch_delta_coeffs(&self, index: usize) -> &[f64] {
        &self.delta_coeffs[self.patch_range(index)]
    }

    /// 补丁面面积矢量
    pub fn patch_sf(&self, index: usize) -> &[Vector] {
        self.poly.patch_face_areas(index)
    }

    /// 补丁面面积
    pub fn patch_mag_sf(&self, index: usize) -> &[f64] {
        self.poly.patch_mag_face_areas(index)
    }

    /// 补丁面单位法向
    pub fn patch_normals(&self, index: usize) -> Vec<Vector> {
        self.patch_sf(index)
            .iter()
            .map(|s| s.normalize_or_zero())
            .collect()
    }

    /// cyclic 补丁的对侧补丁
    #[inline]
    pub fn coupled_neighbour(&self, index: usize) -> Option<usize> {
        self.coupled_neighbour[index]
    }

    /// 是否为 empty 补丁
    #[inline]
    pub fn is_empty_patch(&self, index: usize) -> bool {
        matches!(self.poly.patch(index).kind(), PatchKind::Empty)
    }

    /// 对侧单元：cyclic 补丁第 k 个面对应对侧补丁第 k 个面的所有者
    pub fn patch_neighbour_cells(&self, index: usize) -> Option<&[usize]> {
        self.coupled_neighbour[index].map(|nbr| self.patch_face_cells(nbr))
    }
}

fn linear_weight(d_own: f64, d_nei: f64) -> f64 {
    let total = d_own + d_nei;
    if total > 0.0 {
        d_nei / total
    } else {
        0.5
    }
}

/// 解析 cyclic 补丁对，检查面数一致
fn resolve_coupling(poly: &PolyMesh) -> FvResult<Vec<Option<usize>>> {
    poly.patches()
        .iter()
        .map(|patch| match patch.kind() {
            PatchKind::Cyclic { neighbour_patch } => {
                let nbr = poly.patch_index(neighbour_patch)?;
                let nbr_size = poly.patch(nbr).size();
                if nbr_size != patch.size() {
                    return Err(FvError::invalid_mesh(format!(
                        "cyclic 补丁 {} 与 {} 面数不一致: {} vs {}",
                        patch.name(),
                        neighbour_patch,
                        patch.size(),
                        nbr_size
                    )));
                }
                Ok(Some(nbr))
            }
            _ => Ok(None),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_mesh::{BoxMeshBuilder, BoxSide};

    #[test]
    fn test_uniform_box_geometry() {
        let mesh = FvMesh::new(BoxMeshBuilder::new(4, 2, 1, 4.0, 2.0, 1.0).build().unwrap()).unwrap();
        for f in 0..mesh.n_internal_faces() {
            assert!((mesh.weights()[f] - 0.5).abs() < 1e-12);
            assert!((mesh.delta_coeffs()[f] - 1.0).abs() < 1e-12);
        }
        // 边界面：到面中心距离为半个单元
        let xmin = mesh.poly().patch_index("xmin").unwrap();
        for &dc in mesh.patch_delta_coeffs(xmin) {
            assert!((dc - 2.0).abs() < 1e-12);
        }
        assert!(mesh.patch_weights(xmin).iter().all(|&w| w == 1.0));
    }

    #[test]
    fn test_cyclic_weights_and_neighbours() {
        let poly = BoxMeshBuilder::new(4, 1, 1, 4.0, 1.0, 1.0)
            .with_cyclic(BoxSide::XMin)
            .build()
            .unwrap();
        let mesh = FvMesh::new(poly).unwrap();
        let xmin = mesh.poly().patch_index("xmin").unwrap();
        let xmax = mesh.poly().patch_index("xmax").unwrap();
        assert_eq!(mesh.coupled_neighbour(xmin), Some(xmax));
        assert_eq!(mesh.patch_neighbour_cells(xmin), Some(&[3usize][..]));
        assert!((mesh.patch_weights(xmin)[0] - 0.5).abs() < 1e-12);
        assert!((mesh.patch_delta_coeffs(xmin)[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_moved_shares_clock_and_topology() {
        let mesh = FvMesh::new(BoxMeshBuilder::cube(2, 1.0).build().unwrap()).unwrap();
        let points: Vec<Vector> = mesh.poly().points().iter().map(|p| *p * 2.0).collect();
        let moved = mesh.moved(points).unwrap();
        assert_eq!(moved.topology_id(), mesh.topology_id());
        assert_ne!(moved.id(), mesh.id());
        mesh.time().write().advance();
        assert_eq!(moved.time_index(), 1);
        assert!((moved.volumes()[0] - 1.0).abs() < 1e-12);
    }
}
