// crates/fv_mesh/src/renumber/structured.rs

//! 按挤出层重编号
//!
//! 适用于由补丁挤出得到的网格：
//!
//! 1. 与所选补丁相邻的单元组成底层，每个底层单元开启一列
//! 2. 底层单元用嵌套方法（`method`）排序，得到列的顺序
//! 3. 从底层出发逐层广度优先传播，每个单元继承到达它的列与层号
//! 4. `depthFirst` 为真时按 (列, 层) 排序：第一列占编号 `0..nLayers`；
//!    为假时按 (层, 列) 排序：第一层先编号
//!
//! 仅由点或显式单元图无法确定层结构，这两种入口返回未实现错误。

use super::{new_renumber_method, RenumberMethod, RenumberRegistry};
use crate::poly_mesh::PolyMesh;
use fv_foundation::{Dictionary, FvError, FvResult, Switch, Vector};
use std::cmp::Ordering;

/// 单元所在的列与层
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct LayerData {
    column: usize,
    layer: usize,
}

/// 按挤出层重编号
pub struct StructuredRenumber {
    patches: Vec<String>,
    n_layers: usize,
    depth_first: bool,
    method: Box<dyn RenumberMethod>,
    reverse: bool,
}

impl StructuredRenumber {
    pub fn new(
        patches: Vec<String>,
        n_layers: usize,
        depth_first: bool,
        method: Box<dyn RenumberMethod>,
        reverse: bool,
    ) -> Self {
        Self {
            patches,
            n_layers,
            depth_first,
            method,
            reverse,
        }
    }

    /// 读取 `structuredCoeffs`（无子字典时读取顶层）
    pub fn from_dict(dict: &Dictionary, registry: &RenumberRegistry) -> FvResult<Box<dyn RenumberMethod>> {
        let coeffs = dict.optional_sub_dict("structuredCoeffs");
        let patches: Vec<String> = coeffs.lookup("patches")?;
        let n_layers: usize = coeffs.lookup("nLayers")?;
        let depth_first: Switch = coeffs.lookup("depthFirst")?;
        let reverse: Switch = coeffs.lookup_or_default("reverse", Switch::False)?;
        let inner: String = coeffs.lookup("method")?;
        if inner == "structured" {
            return Err(FvError::invalid_entry(
                coeffs.name(),
                "method",
                inner,
                "底层排序方法不能再是 structured",
            ));
        }
        let method = new_renumber_method(coeffs, registry)?;
        Ok(Box::new(Self::new(
            patches,
            n_layers,
            depth_first.as_bool(),
            method,
            reverse.as_bool(),
        )))
    }

    /// 所选补丁（按名称或组名匹配）
    fn selected_patches(&self, mesh: &PolyMesh) -> FvResult<Vec<usize>> {
        let mut selected = Vec::new();
        for name in &self.patches {
            let matches: Vec<usize> = mesh
                .patches()
                .iter()
                .filter(|p| p.name() == name || p.in_group(name))
                .map(|p| p.index())
                .collect();
            if matches.is_empty() {
                return Err(FvError::unknown_type(
                    "patch",
                    name,
                    mesh.patches().iter().map(|p| p.name().to_string()).collect(),
                ));
            }
            for m in matches {
                if !selected.contains(&m) {
                    selected.push(m);
                }
            }
        }
        Ok(selected)
    }

    /// 按列与层比较两个单元
    fn layer_cmp(&self, column_order: &[usize], a: &LayerData, b: &LayerData) -> Ordering {
        let col = column_order[a.column].cmp(&column_order[b.column]);
        let lay = a.layer.cmp(&b.layer);
        if self.depth_first {
            col.then(lay)
        } else {
            lay.then(col)
        }
    }
}

impl RenumberMethod for StructuredRenumber {
    fn type_name(&self) -> &'static str {
        "structured"
    }

    fn renumber_points(&self, _points: &[Vector]) -> FvResult<Vec<usize>> {
        Err(FvError::not_implemented("structured 重编号需要网格层结构，不能只用点"))
    }

    fn renumber_mesh(&self, mesh: &PolyMesh, cell_centres: &[Vector]) -> FvResult<Vec<usize>> {
        let n_cells = mesh.n_cells();
        let mut data: Vec<Option<LayerData>> = vec![None; n_cells];

        // 底层单元，按补丁面顺序首次出现
        let mut bottom = Vec::new();
        for patch in self.selected_patches(mesh)? {
            for &cell in mesh.patch_face_cells(patch) {
                if data[cell].is_none() {
                    data[cell] = Some(LayerData {
                        column: bottom.len(),
                        layer: 0,
                    });
                    bottom.push(cell);
                }
            }
        }

        // 底层子图交给嵌套方法排序
        let mut sub_index = vec![usize::MAX; n_cells];
        for (i, &cell) in bottom.iter().enumerate() {
            sub_index[cell] = i;
        }
        let sub_cell_cells: Vec<Vec<usize>> = bottom
            .iter()
            .map(|&cell| {
                mesh.cell_cells()
                    .row(cell)
                    .iter()
                    .filter(|&&nb| sub_index[nb] != usize::MAX)
                    .map(|&nb| sub_index[nb])
                    .collect()
            })
            .collect();
        let sub_centres: Vec<Vector> = bottom.iter().map(|&c| cell_centres[c]).collect();
        let bottom_order = self.method.renumber_cell_cells(&sub_cell_cells, &sub_centres)?;
        let mut column_order = vec![0; bottom.len()];
        for (position, &column) in bottom_order.iter().enumerate() {
            column_order[column] = position;
        }

        // 逐层传播
        let mut front = bottom.clone();
        let mut layer = 0;
        while !front.is_empty() && layer + 1 < self.n_layers {
            let mut next = Vec::new();
            for &cell in &front {
                let column = data[cell].map(|d| d.column).unwrap_or(0);
                for &nb in mesh.cell_cells().row(cell) {
                    if data[nb].is_none() {
                        data[nb] = Some(LayerData {
                            column,
                            layer: layer + 1,
                        });
                        next.push(nb);
                    }
                }
            }
            front = next;
            layer += 1;
        }

        let mut resolved = Vec::with_capacity(n_cells);
        for (cell, d) in data.iter().enumerate() {
            match d {
                Some(d) => resolved.push(*d),
                None => {
                    return Err(FvError::invalid_mesh(format!(
                        "单元 {} (位于 {:?}) 未能从补丁 {:?} 在 {} 层内到达",
                        cell, cell_centres[cell], self.patches, self.n_layers
                    )))
                }
            }
        }

        let mut order: Vec<usize> = (0..n_cells).collect();
        order.sort_by(|&a, &b| self.layer_cmp(&column_order, &resolved[a], &resolved[b]));
        if self.reverse {
            order.reverse();
        }

        tracing::info!(
            columns = bottom.len(),
            layers = layer + 1,
            depth_first = self.depth_first,
            "structured 重编号完成"
        );
        Ok(order)
    }

    fn renumber_cell_cells(&self, _cell_cells: &[Vec<usize>], _cell_centres: &[Vector]) -> FvResult<Vec<usize>> {
        Err(FvError::not_implemented("structured 重编号需要网格补丁，不能只用单元连接图"))
    }
}
