// crates/fv_core/src/coupling/methods/matching.rs

use super::nearest::nearest_coupling;
use super::{LocalCoupling, PatchToPatchMethod};
use fv_foundation::{Dictionary, FvError, FvResult};
use fv_mesh::PrimitivePatch;
use std::sync::Arc;

/// 默认相对容差（相对面的特征长度）
const DEFAULT_TOLERANCE: f64 = 1e-4;

/// 一一对应的重合面耦合
#[derive(Debug, Clone, Copy)]
pub struct MatchingMethod {
    tolerance: f64,
}

impl Default for MatchingMethod {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl MatchingMethod {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn from_dict(dict: &Dictionary) -> FvResult<Arc<dyn PatchToPatchMethod>> {
        let tolerance = dict.lookup_or_default("tolerance", DEFAULT_TOLERANCE)?;
        Ok(Arc::new(Self::new(tolerance)))
    }
}

impl PatchToPatchMethod for MatchingMethod {
    fn type_name(&self) -> &'static str {
        "matching"
    }

    fn intersect(
        &self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        reverse: bool,
    ) -> FvResult<LocalCoupling> {
        if src.len() != tgt.len() {
            return Err(FvError::size_mismatch("matching patch faces", src.len(), tgt.len()));
        }
        let coupling = nearest_coupling(src, tgt, reverse);
        let src_mag = src.mag_face_areas();
        for (i, list) in coupling.src_tgt.iter().enumerate() {
            let Some(&(j, _)) = list.first() else {
                return Err(FvError::invalid_mesh(format!(
                    "源面 {i} 没有朝向相符的目标面 (reverse = {reverse})"
                )));
            };
            let length = src_mag[i].sqrt();
            let distance = src.face_centres()[i].distance(tgt.face_centres()[j]);
            let back = coupling.tgt_src[j].first().map(|&(k, _)| k);
            if distance > self.tolerance * length || back != Some(i) {
                return Err(FvError::invalid_mesh(format!(
                    "源面 {} 与目标面 {} 不重合 (距离 {:e})",
                    i, j, distance
                )));
            }
        }
        Ok(coupling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fv_foundation::Vector;
    use fv_mesh::generation::unit_square_patch;

    #[test]
    fn test_identical_patches_match() {
        let p = unit_square_patch(3, 2);
        let c = MatchingMethod::default().intersect(&p, &p, false).unwrap();
        for (i, l) in c.src_tgt.iter().enumerate() {
            assert_eq!(l, &vec![(i, 1.0)]);
        }
    }

    #[test]
    fn test_reverse_requires_opposed_normals() {
        let p = unit_square_patch(3, 2);
        let flipped = p.flipped();
        assert!(MatchingMethod::default().intersect(&p, &flipped, true).is_ok());
        assert!(MatchingMethod::default().intersect(&p, &flipped, false).is_err());
        assert!(MatchingMethod::default().intersect(&p, &p, true).is_err());
    }

    #[test]
    fn test_shifted_patches_rejected() {
        let p = unit_square_patch(2, 2);
        let q = p.translated(Vector::new(0.1, 0.0, 0.0));
        assert!(MatchingMethod::default().intersect(&p, &q, false).is_err());
        assert!(MatchingMethod::default()
            .intersect(&p, &unit_square_patch(1, 1), false)
            .is_err());
    }
}
