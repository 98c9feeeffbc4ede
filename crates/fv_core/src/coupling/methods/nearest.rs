// crates/fv_core/src/coupling/methods/nearest.rs

use super::{nearest_face, orientation_ok, LocalCoupling, PatchToPatchMethod};
use fv_foundation::{Dictionary, FvResult};
use fv_mesh::PrimitivePatch;
use std::sync::Arc;

/// 最近面耦合
#[derive(Debug, Clone, Copy, Default)]
pub struct NearestMethod;

impl NearestMethod {
    pub fn from_dict(_dict: &Dictionary) -> FvResult<Arc<dyn PatchToPatchMethod>> {
        Ok(Arc::new(NearestMethod))
    }
}

/// 每个源面耦合到朝向相符的最近目标面，反之亦然
pub(super) fn nearest_coupling(src: &PrimitivePatch, tgt: &PrimitivePatch, reverse: bool) -> LocalCoupling {
    let mut coupling = LocalCoupling::empty(src.len(), tgt.len());
    if src.is_empty() || tgt.is_empty() {
        return coupling;
    }
    let src_normals = src.face_normals();
    let tgt_normals = tgt.face_normals();
    let src_index = src.spatial_index();
    let tgt_index = tgt.spatial_index();
    for (i, &c) in src.face_centres().iter().enumerate() {
        let accept = |j: usize| orientation_ok(src_normals[i], tgt_normals[j], reverse);
        if let Some(j) = nearest_face(&tgt_index, tgt.face_centres(), c, accept) {
            coupling.src_tgt[i].push((j, 1.0));
        }
    }
    for (j, &c) in tgt.face_centres().iter().enumerate() {
        let accept = |i: usize| orientation_ok(src_normals[i], tgt_normals[j], reverse);
        if let Some(i) = nearest_face(&src_index, src.face_centres(), c, accept) {
            coupling.tgt_src[j].push((i, 1.0));
        }
    }
    coupling
}

impl PatchToPatchMethod for NearestMethod {
    fn type_name(&self) -> &'static str {
        "nearest"
    }

    fn intersect(
        &self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        reverse: bool,
    ) -> FvResult<LocalCoupling> {
        Ok(nearest_coupling(src, tgt, reverse))
    }
}
