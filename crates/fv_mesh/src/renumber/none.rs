// crates/fv_mesh/src/renumber/none.rs

use super::{RenumberMethod, RenumberRegistry};
use fv_foundation::{Dictionary, FvResult, Vector};

/// 保持原顺序
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenumber;

impl NoRenumber {
    pub fn from_dict(_dict: &Dictionary, _registry: &RenumberRegistry) -> FvResult<Box<dyn RenumberMethod>> {
        Ok(Box::new(NoRenumber))
    }
}

impl RenumberMethod for NoRenumber {
    fn type_name(&self) -> &'static str {
        "none"
    }

    fn renumber_points(&self, points: &[Vector]) -> FvResult<Vec<usize>> {
        Ok((0..points.len()).collect())
    }

    fn renumber_cell_cells(&self, cell_cells: &[Vec<usize>], _cell_centres: &[Vector]) -> FvResult<Vec<usize>> {
        Ok((0..cell_cells.len()).collect())
    }
}
