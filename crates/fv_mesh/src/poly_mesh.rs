// crates/fv_mesh/src/poly_mesh.rs

//! 多面体网格
//!
//! 面列表按“内部面在前、边界补丁依次在后”排列：
//!
//! - `owner[f]`：每个面的所有者单元（面积矢量指向其外侧）
//! - `neighbour[f]`：仅内部面，且 `owner < neighbour`
//! - 补丁占据 `n_internal_faces..n_faces` 的连续区间
//!
//! 网格在一个时间步内不可变。每个网格实例持有唯一 id；移动网格
//! ([`PolyMesh::moved`]) 得到新实例，保留拓扑 id 并递增几何版本号。

use crate::bound_box::BoundBox;
use crate::geometry::MeshGeometry;
use crate::patch::{PatchKind, PolyPatch};
use crate::topology::{self, CsrConnectivity};
use fv_foundation::{FvError, FvResult, Vector};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_MESH_ID: AtomicU64 = AtomicU64::new(1);

fn next_mesh_id() -> u64 {
    NEXT_MESH_ID.fetch_add(1, Ordering::Relaxed)
}

/// 多面体网格
#[derive(Debug, Clone)]
pub struct PolyMesh {
    id: u64,
    topology_id: u64,
    geometry_version: u64,

    points: Vec<Vector>,
    faces: Vec<Vec<usize>>,
    owner: Vec<usize>,
    neighbour: Vec<usize>,
    patches: Vec<PolyPatch>,
    n_cells: usize,

    geometry: MeshGeometry,
    cell_faces: CsrConnectivity,
    cell_cells: CsrConnectivity,
}

impl PolyMesh {
    /// 由原始数据组装网格并检查一致性
    ///
    /// 补丁的 `start` 必须从 `neighbour.len()` 开始首尾相接并覆盖全部边界面。
    pub fn new(
        points: Vec<Vector>,
        faces: Vec<Vec<usize>>,
        owner: Vec<usize>,
        neighbour: Vec<usize>,
        mut patches: Vec<PolyPatch>,
    ) -> FvResult<Self> {
        FvError::check_size("owner", faces.len(), owner.len())?;
        let n_internal = neighbour.len();
        if n_internal > faces.len() {
            return Err(FvError::invalid_mesh(format!(
                "内部面数 {} 超过总面数 {}",
                n_internal,
                faces.len()
            )));
        }

        for (f, face) in faces.iter().enumerate() {
            if face.len() < 3 {
                return Err(FvError::invalid_mesh(format!("面 {} 只有 {} 个点", f, face.len())));
            }
            if let Some(&p) = face.iter().find(|&&p| p >= points.len()) {
                return Err(FvError::invalid_mesh(format!(
                    "面 {} 引用了不存在的点 {} (共 {} 个点)",
                    f,
                    p,
                    points.len()
                )));
            }
        }

        let n_cells = owner
            .iter()
            .chain(neighbour.iter())
            .max()
            .map(|&c| c + 1)
            .unwrap_or(0);
        for (f, (&o, &n)) in owner.iter().zip(&neighbour).enumerate() {
            if o >= n {
                return Err(FvError::invalid_mesh(format!(
                    "内部面 {} 的 owner {} 不小于 neighbour {}",
                    f, o, n
                )));
            }
        }

        let mut next = n_internal;
        for (i, patch) in patches.iter_mut().enumerate() {
            if patch.start() != next {
                return Err(FvError::invalid_mesh(format!(
                    "补丁 {} 起始面 {} 与期望 {} 不符",
                    patch.name(),
                    patch.start(),
                    next
                )));
            }
            patch.set_index(i);
            next += patch.size();
        }
        if next != faces.len() {
            return Err(FvError::invalid_mesh(format!(
                "补丁覆盖到面 {}，但网格共有 {} 个面",
                next,
                faces.len()
            )));
        }

        for patch in &patches {
            if let PatchKind::Cyclic { neighbour_patch } = patch.kind() {
                let nbr = patches
                    .iter()
                    .find(|p| p.name() == neighbour_patch)
                    .ok_or_else(|| {
                        FvError::invalid_mesh(format!(
                            "周期补丁 {} 的对侧补丁 {} 不存在",
                            patch.name(),
                            neighbour_patch
                        ))
                    })?;
                if nbr.size() != patch.size() {
                    return Err(FvError::invalid_mesh(format!(
                        "周期补丁 {} 与 {} 面数不同 ({} / {})",
                        patch.name(),
                        nbr.name(),
                        patch.size(),
                        nbr.size()
                    )));
                }
            }
        }

        let geometry = MeshGeometry::compute(&points, &faces, &owner, &neighbour, n_cells);
        let cell_faces = topology::cell_faces(n_cells, &owner, &neighbour);
        let cell_cells = topology::cell_cells(n_cells, &owner, &neighbour);

        tracing::debug!(
            n_points = points.len(),
            n_faces = faces.len(),
            n_internal_faces = n_internal,
            n_cells,
            n_patches = patches.len(),
            "网格已组装"
        );

        Ok(Self {
            id: next_mesh_id(),
            topology_id: next_mesh_id(),
            geometry_version: 0,
            points,
            faces,
            owner,
            neighbour,
            patches,
            n_cells,
            geometry,
            cell_faces,
            cell_cells,
        })
    }

    // =========================================================================
    // 标识
    // =========================================================================

    /// 实例唯一 id
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 拓扑 id，网格移动后保持不变
    #[inline]
    pub fn topology_id(&self) -> u64 {
        self.topology_id
    }

    /// 几何版本号，每次移动加一
    #[inline]
    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }

    // =========================================================================
    // 尺寸
    // =========================================================================

    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn n_faces(&self) -> usize {
        self.faces.len()
    }

    #[inline]
    pub fn n_internal_faces(&self) -> usize {
        self.neighbour.len()
    }

    #[inline]
    pub fn n_boundary_faces(&self) -> usize {
        self.faces.len() - self.neighbour.len()
    }

    #[inline]
    pub fn n_cells(&self) -> usize {
        self.n_cells
    }

    // =========================================================================
    // 原始数据
    // =========================================================================

    #[inline]
    pub fn points(&self) -> &[Vector] {
        &self.points
    }

    #[inline]
    pub fn faces(&self) -> &[Vec<usize>] {
        &self.faces
    }

    #[inline]
    pub fn owner(&self) -> &[usize] {
        &self.owner
    }

    #[inline]
    pub fn neighbour(&self) -> &[usize] {
        &self.neighbour
    }

    #[inline]
    pub fn is_internal_face(&self, face: usize) -> bool {
        face < self.neighbour.len()
    }

    // =========================================================================
    // 几何
    // =========================================================================

    #[inline]
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    #[inline]
    pub fn face_centres(&self) -> &[Vector] {
        &self.geometry.face_centres
    }

    /// 面积矢量
    #[inline]
    pub fn face_areas(&self) -> &[Vector] {
        &self.geometry.face_areas
    }

    #[inline]
    pub fn mag_face_areas(&self) -> &[f64] {
        &self.geometry.mag_face_areas
    }

    #[inline]
    pub fn cell_centres(&self) -> &[Vector] {
        &self.geometry.cell_centres
    }

    #[inline]
    pub fn cell_volumes(&self) -> &[f64] {
        &self.geometry.cell_volumes
    }

    /// 全部点的包围盒
    pub fn bounds(&self) -> BoundBox {
        BoundBox::from_points(&self.points)
    }

    // =========================================================================
    // 连接性
    // =========================================================================

    #[inline]
    pub fn cell_faces(&self) -> &CsrConnectivity {
        &self.cell_faces
    }

    /// 经内部面相邻的单元
    #[inline]
    pub fn cell_cells(&self) -> &CsrConnectivity {
        &self.cell_cells
    }

    // =========================================================================
    // 补丁
    // =========================================================================

    #[inline]
    pub fn patches(&self) -> &[PolyPatch] {
        &self.patches
    }

    #[inline]
    pub fn n_patches(&self) -> usize {
        self.patches.len()
    }

    #[inline]
    pub fn patch(&self, index: usize) -> &PolyPatch {
        &self.patches[index]
    }

    /// 按名称查找补丁索引
    pub fn find_patch(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name() == name)
    }

    /// 按名称查找补丁索引，不存在时报错
    pub fn patch_index(&self, name: &str) -> FvResult<usize> {
        self.find_patch(name).ok_or_else(|| {
            FvError::unknown_type(
                "patch",
                name,
                self.patches.iter().map(|p| p.name().to_string()).collect(),
            )
        })
    }

    /// 属于某组的全部补丁
    pub fn patches_in_group(&self, group: &str) -> Vec<usize> {
        self.patches
            .iter()
            .filter(|p| p.in_group(group))
            .map(|p| p.index())
            .collect()
    }

    /// 面所在补丁；内部面返回 `None`
    pub fn which_patch(&self, face: usize) -> Option<usize> {
        if self.is_internal_face(face) {
            return None;
        }
        self.patches.iter().position(|p| p.range().contains(&face))
    }

    /// 补丁面的相邻单元
    #[inline]
    pub fn patch_face_cells(&self, patch: usize) -> &[usize] {
        &self.owner[self.patches[patch].range()]
    }

    /// 补丁面中心
    #[inline]
    pub fn patch_face_centres(&self, patch: usize) -> &[Vector] {
        &self.geometry.face_centres[self.patches[patch].range()]
    }

    /// 补丁面积矢量
    #[inline]
    pub fn patch_face_areas(&self, patch: usize) -> &[Vector] {
        &self.geometry.face_areas[self.patches[patch].range()]
    }

    /// 补丁面积大小
    #[inline]
    pub fn patch_mag_face_areas(&self, patch: usize) -> &[f64] {
        &self.geometry.mag_face_areas[self.patches[patch].range()]
    }

    // =========================================================================
    // 变换
    // =========================================================================

    /// 移动网格点，保留拓扑 id 并递增几何版本号
    pub fn moved(&self, points: Vec<Vector>) -> FvResult<PolyMesh> {
        FvError::check_size("points", self.points.len(), points.len())?;
        let geometry = MeshGeometry::compute(
            &points,
            &self.faces,
            &self.owner,
            &self.neighbour,
            self.n_cells,
        );
        tracing::debug!(
            topology_id = self.topology_id,
            geometry_version = self.geometry_version + 1,
            "网格点已移动"
        );
        Ok(PolyMesh {
            id: next_mesh_id(),
            topology_id: self.topology_id,
            geometry_version: self.geometry_version + 1,
            points,
            faces: self.faces.clone(),
            owner: self.owner.clone(),
            neighbour: self.neighbour.clone(),
            patches: self.patches.clone(),
            n_cells: self.n_cells,
            geometry,
            cell_faces: self.cell_faces.clone(),
            cell_cells: self.cell_cells.clone(),
        })
    }

    /// 按 `cell_order`（新编号到旧编号）重排单元，得到新拓扑
    ///
    /// 内部面按 (owner, neighbour) 重新排序以保持上三角顺序，
    /// 需要交换 owner/neighbour 的面同时翻转点序。边界面顺序不变。
    pub fn reorder_cells(&self, cell_order: &[usize]) -> FvResult<PolyMesh> {
        FvError::check_size("cellOrder", self.n_cells, cell_order.len())?;
        let mut new_of_old = vec![usize::MAX; self.n_cells];
        for (new, &old) in cell_order.iter().enumerate() {
            if old >= self.n_cells || new_of_old[old] != usize::MAX {
                return Err(FvError::invalid_mesh(format!(
                    "单元重排列表不是排列: 位置 {} 的旧单元 {}",
                    new, old
                )));
            }
            new_of_old[old] = new;
        }

        let n_internal = self.n_internal_faces();
        let mut internal: Vec<(usize, usize, Vec<usize>)> = (0..n_internal)
            .map(|f| {
                let o = new_of_old[self.owner[f]];
                let n = new_of_old[self.neighbour[f]];
                if o < n {
                    (o, n, self.faces[f].clone())
                } else {
                    let mut flipped = self.faces[f].clone();
                    flipped.reverse();
                    (n, o, flipped)
                }
            })
            .collect();
        internal.sort_by_key(|(o, n, _)| (*o, *n));

        let mut faces = Vec::with_capacity(self.n_faces());
        let mut owner = Vec::with_capacity(self.n_faces());
        let mut neighbour = Vec::with_capacity(n_internal);
        for (o, n, face) in internal {
            faces.push(face);
            owner.push(o);
            neighbour.push(n);
        }
        for f in n_internal..self.n_faces() {
            faces.push(self.faces[f].clone());
            owner.push(new_of_old[self.owner[f]]);
        }

        PolyMesh::new(
            self.points.clone(),
            faces,
            owner,
            neighbour,
            self.patches.clone(),
        )
    }
}
