// crates/fv_mesh/src/renumber/cuthill_mckee.rs

//! Cuthill-McKee 带宽压缩
//!
//! 每个连通分量从度数最小的未访问单元出发做广度优先遍历，
//! 邻居按度数升序入队。`reverse` 为真时整体反转得到 RCM 顺序。

use super::{RenumberMethod, RenumberRegistry};
use fv_foundation::{Dictionary, FvError, FvResult, Switch, Vector};
use std::collections::VecDeque;

/// Cuthill-McKee 重编号
#[derive(Debug, Clone, Copy, Default)]
pub struct CuthillMcKee {
    reverse: bool,
}

impl CuthillMcKee {
    pub fn new(reverse: bool) -> Self {
        Self { reverse }
    }

    /// 读取 `CuthillMcKeeCoeffs { reverse ...; }`（无子字典时读取顶层）
    pub fn from_dict(dict: &Dictionary, _registry: &RenumberRegistry) -> FvResult<Box<dyn RenumberMethod>> {
        let coeffs = dict.optional_sub_dict("CuthillMcKeeCoeffs");
        let reverse = coeffs.lookup_or_default("reverse", Switch::False)?;
        Ok(Box::new(Self::new(reverse.as_bool())))
    }

    #[inline]
    pub fn reverse(&self) -> bool {
        self.reverse
    }

    /// 带宽压缩顺序
    pub fn band_compression(cell_cells: &[Vec<usize>]) -> Vec<usize> {
        let n = cell_cells.len();
        let mut visited = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();
        let mut neighbours: Vec<usize> = Vec::new();

        while order.len() < n {
            // 度数最小的未访问单元作为新分量的起点
            let start = (0..n)
                .filter(|&c| !visited[c])
                .min_by_key(|&c| cell_cells[c].len());
            let Some(start) = start else { break };
            queue.push_back(start);

            while let Some(cell) = queue.pop_front() {
                if visited[cell] {
                    continue;
                }
                visited[cell] = true;
                order.push(cell);

                neighbours.clear();
                neighbours.extend(cell_cells[cell].iter().copied().filter(|&nb| !visited[nb]));
                neighbours.sort_by_key(|&nb| cell_cells[nb].len());
                queue.extend(neighbours.iter().copied());
            }
        }
        order
    }
}

impl RenumberMethod for CuthillMcKee {
    fn type_name(&self) -> &'static str {
        "CuthillMcKee"
    }

    fn renumber_points(&self, _points: &[Vector]) -> FvResult<Vec<usize>> {
        Err(FvError::not_implemented("CuthillMcKee 重编号需要连接性，不能只用点"))
    }

    fn renumber_cell_cells(&self, cell_cells: &[Vec<usize>], _cell_centres: &[Vector]) -> FvResult<Vec<usize>> {
        let mut order = Self::band_compression(cell_cells);
        if self.reverse {
            order.reverse();
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::BoxMeshBuilder;
    use crate::renumber::{bandwidth, inverse_order};
    use rand::seq::SliceRandom;

    #[test]
    fn test_order_is_permutation() {
        let mesh = BoxMeshBuilder::new(5, 4, 3, 1.0, 1.0, 1.0).build().unwrap();
        let cm = CuthillMcKee::new(false);
        let order = cm.renumber_mesh(&mesh, mesh.cell_centres()).unwrap();
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..mesh.n_cells()).collect::<Vec<_>>());
    }

    #[test]
    fn test_reduces_bandwidth_of_shuffled_mesh() {
        let mesh = BoxMeshBuilder::new(8, 8, 1, 1.0, 1.0, 1.0).build().unwrap();
        let mut shuffle: Vec<usize> = (0..mesh.n_cells()).collect();
        shuffle.shuffle(&mut rand::thread_rng());
        let shuffled = mesh.reorder_cells(&shuffle).unwrap();
        let cc = shuffled.cell_cells().to_lists();

        let identity: Vec<usize> = (0..cc.len()).collect();
        let order = CuthillMcKee::band_compression(&cc);
        assert!(bandwidth(&cc, &order) <= bandwidth(&cc, &identity));
        assert_eq!(inverse_order(&order).len(), cc.len());
    }

    #[test]
    fn test_reverse_and_disconnected() {
        // 两个分量: 0-1-2 与 3-4
        let cc = vec![vec![1], vec![0, 2], vec![1], vec![4], vec![3]];
        let forward = CuthillMcKee::new(false).renumber_cell_cells(&cc, &[]).unwrap();
        assert_eq!(forward, vec![0, 1, 2, 3, 4]);
        let backward = CuthillMcKee::new(true).renumber_cell_cells(&cc, &[]).unwrap();
        assert_eq!(backward, vec![4, 3, 2, 1, 0]);
        assert!(CuthillMcKee::new(false).renumber_points(&[]).is_err());
    }
}
