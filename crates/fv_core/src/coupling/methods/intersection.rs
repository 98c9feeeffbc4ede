// crates/fv_core/src/coupling/methods/intersection.rs

use super::{orientation_ok, LocalCoupling, PatchToPatchMethod};
use crate::coupling::polygon::overlap_area;
use fv_foundation::{Dictionary, FvResult, Vector};
use fv_mesh::PrimitivePatch;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

/// 默认投影容差（相对源面特征长度）
const DEFAULT_PROJECTION_TOLERANCE: f64 = 0.1;
/// 小于该比例的重叠忽略
const AREA_TOLERANCE: f64 = 1e-10;

/// 面积重叠耦合
///
/// 每个连通区域的第一个源面用 R-Tree 找候选目标面；之后沿源面邻接
/// 推进，邻面的候选取自已命中的目标面及其邻面，在目标侧沿命中面继续
/// 扩展。推进找不到重叠时退回 R-Tree 查询。
#[derive(Debug, Clone, Copy)]
pub struct IntersectionMethod {
    projection_tolerance: f64,
}

impl Default for IntersectionMethod {
    fn default() -> Self {
        Self {
            projection_tolerance: DEFAULT_PROJECTION_TOLERANCE,
        }
    }
}

impl IntersectionMethod {
    pub fn new(projection_tolerance: f64) -> Self {
        Self {
            projection_tolerance,
        }
    }

    pub fn from_dict(dict: &Dictionary) -> FvResult<Arc<dyn PatchToPatchMethod>> {
        let tol = dict.lookup_or_default("projectionTolerance", DEFAULT_PROJECTION_TOLERANCE)?;
        Ok(Arc::new(Self::new(tol)))
    }
}

/// 单个源面的求交上下文
struct Geometry<'a> {
    src: &'a PrimitivePatch,
    tgt: &'a PrimitivePatch,
    src_normals: Vec<Vector>,
    tgt_normals: Vec<Vector>,
    src_mag: Vec<f64>,
    tgt_mag: Vec<f64>,
    reverse: bool,
    tolerance: f64,
}

impl Geometry<'_> {
    /// 源面 i 与目标面 j 的重叠面积
    fn overlap(&self, i: usize, j: usize) -> f64 {
        if !orientation_ok(self.src_normals[i], self.tgt_normals[j], self.reverse) {
            return 0.0;
        }
        let gap = (self.tgt.face_centres()[j] - self.src.face_centres()[i]).dot(self.src_normals[i]);
        if gap.abs() > self.tolerance * self.src_mag[i].sqrt() {
            return 0.0;
        }
        let area = overlap_area(
            &self.src.face_points(i),
            self.src_normals[i],
            &self.tgt.face_points(j),
        );
        if area > AREA_TOLERANCE * self.src_mag[i].min(self.tgt_mag[j]) {
            area
        } else {
            0.0
        }
    }
}

impl PatchToPatchMethod for IntersectionMethod {
    fn type_name(&self) -> &'static str {
        "intersection"
    }

    fn intersect(
        &self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        reverse: bool,
    ) -> FvResult<LocalCoupling> {
        let mut coupling = LocalCoupling::empty(src.len(), tgt.len());
        if src.is_empty() || tgt.is_empty() {
            return Ok(coupling);
        }

        let geom = Geometry {
            src,
            tgt,
            src_normals: src.face_normals(),
            tgt_normals: tgt.face_normals(),
            src_mag: src.mag_face_areas(),
            tgt_mag: tgt.mag_face_areas(),
            reverse,
            tolerance: self.projection_tolerance,
        };
        let tgt_index = tgt.spatial_index();
        let src_bounds = src.face_bounds();
        let src_faces = src.face_faces();
        let tgt_faces = tgt.face_faces();

        let tree_hits = |i: usize| -> Vec<(usize, f64)> {
            tgt_index
                .overlapping(&src_bounds[i].inflate(self.projection_tolerance))
                .into_iter()
                .map(|j| (j, geom.overlap(i, j)))
                .filter(|&(_, a)| a > 0.0)
                .collect()
        };

        let front_hits = |i: usize, seeds: &[usize]| -> Vec<(usize, f64)> {
            let mut tested: HashSet<usize> = HashSet::new();
            let mut queue: VecDeque<usize> = VecDeque::new();
            for &s in seeds {
                for &j in std::iter::once(&s).chain(tgt_faces[s].iter()) {
                    if tested.insert(j) {
                        queue.push_back(j);
                    }
                }
            }
            let mut hits = Vec::new();
            while let Some(j) = queue.pop_front() {
                let area = geom.overlap(i, j);
                if area > 0.0 {
                    hits.push((j, area));
                    for &k in &tgt_faces[j] {
                        if tested.insert(k) {
                            queue.push_back(k);
                        }
                    }
                }
            }
            hits.sort_unstable_by_key(|&(j, _)| j);
            hits
        };

        let mut visited = vec![false; src.len()];
        let mut seeds: Vec<Vec<usize>> = vec![Vec::new(); src.len()];
        let mut n_tree_queries = 0usize;

        for start in 0..src.len() {
            if visited[start] {
                continue;
            }
            visited[start] = true;
            let mut queue = VecDeque::from([start]);

            while let Some(i) = queue.pop_front() {
                let mut hits = if seeds[i].is_empty() {
                    Vec::new()
                } else {
                    front_hits(i, &seeds[i])
                };
                if hits.is_empty() {
                    n_tree_queries += 1;
                    hits = tree_hits(i);
                }

                let hit_faces: Vec<usize> = hits.iter().map(|&(j, _)| j).collect();
                for (j, area) in hits {
                    coupling.src_tgt[i].push((j, area / geom.src_mag[i]));
                    coupling.tgt_src[j].push((i, area / geom.tgt_mag[j]));
                }
                for &nb in &src_faces[i] {
                    if !visited[nb] {
                        visited[nb] = true;
                        seeds[nb] = hit_faces.clone();
                        queue.push_back(nb);
                    }
                }
            }
        }

        for list in &mut coupling.tgt_src {
            list.sort_unstable_by_key(|&(i, _)| i);
        }
        tracing::trace!(
            n_src = src.len(),
            n_tgt = tgt.len(),
            n_tree_queries,
            "面积重叠耦合完成"
        );
        Ok(coupling)
    }
}
