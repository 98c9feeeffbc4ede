// crates/fv_mesh/src/renumber/mod.rs

//! # 单元重编号
//!
//! 为提升缓存局部性给出单元的访问顺序。所有方法返回 `cell_order`：
//! 新编号到旧编号的映射（`cell_order[new] = old`），可直接交给
//! [`PolyMesh::reorder_cells`](crate::PolyMesh::reorder_cells)。
//!
//! - `none` - 保持原顺序
//! - `CuthillMcKee` - 带宽压缩，可选反向
//! - `structured` - 按挤出层/列排序，底层由另一方法排序
//!
//! ## 字典写法
//!
//! ```text
//! method          structured;
//! structuredCoeffs
//! {
//!     patches     (zmin);
//!     nLayers     10;
//!     depthFirst  true;
//!     method      CuthillMcKee;
//!     reverse     false;
//! }
//! ```

mod cuthill_mckee;
mod none;
mod structured;

pub use cuthill_mckee::CuthillMcKee;
pub use none::NoRenumber;
pub use structured::StructuredRenumber;

use crate::poly_mesh::PolyMesh;
use fv_foundation::{Dictionary, FvResult, Registry, Vector};

/// 重编号方法
pub trait RenumberMethod: Send + Sync {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// 仅由几何点（通常为单元中心）给出顺序
    fn renumber_points(&self, points: &[Vector]) -> FvResult<Vec<usize>>;

    /// 使用网格连接性给出顺序
    fn renumber_mesh(&self, mesh: &PolyMesh, cell_centres: &[Vector]) -> FvResult<Vec<usize>> {
        self.renumber_cell_cells(&mesh.cell_cells().to_lists(), cell_centres)
    }

    /// 使用显式的单元-单元连接给出顺序
    fn renumber_cell_cells(
        &self,
        cell_cells: &[Vec<usize>],
        cell_centres: &[Vector],
    ) -> FvResult<Vec<usize>>;
}

/// 构造器：方法系数字典 + 注册表（供嵌套方法使用）
///
/// 构造器签名引用注册表本身，因此包一层新类型。
#[derive(Clone, Copy, Debug)]
pub struct RenumberConstructor(
    pub fn(&Dictionary, &RenumberRegistry) -> FvResult<Box<dyn RenumberMethod>>,
);

/// 重编号方法注册表
pub type RenumberRegistry = Registry<RenumberConstructor>;

/// 包含全部内置方法的注册表
pub fn renumber_registry() -> RenumberRegistry {
    let mut registry = RenumberRegistry::new("renumberMethod");
    registry
        .register("none", RenumberConstructor(NoRenumber::from_dict))
        .register("CuthillMcKee", RenumberConstructor(CuthillMcKee::from_dict))
        .register("structured", RenumberConstructor(StructuredRenumber::from_dict));
    registry
}

/// 按字典中的 `method` 关键字选择并构造
pub fn new_renumber_method(
    dict: &Dictionary,
    registry: &RenumberRegistry,
) -> FvResult<Box<dyn RenumberMethod>> {
    let method: String = dict.lookup("method")?;
    let ctor = registry.lookup(&method)?;
    tracing::debug!(method = %method, "选择重编号方法");
    (ctor.0)(dict, registry)
}

/// `cell_order` 的逆映射
pub fn inverse_order(cell_order: &[usize]) -> Vec<usize> {
    let mut inverse = vec![0; cell_order.len()];
    for (new, &old) in cell_order.iter().enumerate() {
        inverse[old] = new;
    }
    inverse
}

/// 连接图的带宽：所有边上 |new(a) − new(b)| 的最大值
pub fn bandwidth(cell_cells: &[Vec<usize>], cell_order: &[usize]) -> usize {
    let new_of_old = inverse_order(cell_order);
    cell_cells
        .iter()
        .enumerate()
        .flat_map(|(c, nbrs)| nbrs.iter().map(move |&n| (c, n)))
        .map(|(a, b)| new_of_old[a].abs_diff(new_of_old[b]))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::BoxMeshBuilder;
    use fv_foundation::FvError;

    #[test]
    fn test_registry_names() {
        let reg = renumber_registry();
        assert_eq!(reg.names(), vec!["CuthillMcKee", "none", "structured"]);
    }

    #[test]
    fn test_unknown_method() {
        let reg = renumber_registry();
        let dict = Dictionary::parse("renumberMeshDict", "method random;").unwrap();
        match new_renumber_method(&dict, &reg) {
            Err(FvError::UnknownType { name, valid, .. }) => {
                assert_eq!(name, "random");
                assert_eq!(valid.len(), 3);
            }
            Err(e) => panic!("unexpected error {e}"),
            Ok(m) => panic!("unexpected method {}", m.type_name()),
        }
    }

    #[test]
    fn test_none_is_identity() {
        let mesh = BoxMeshBuilder::new(3, 3, 1, 1.0, 1.0, 1.0).build().unwrap();
        let reg = renumber_registry();
        let dict = Dictionary::parse("d", "method none;").unwrap();
        let method = new_renumber_method(&dict, &reg).unwrap();
        let order = method.renumber_mesh(&mesh, mesh.cell_centres()).unwrap();
        assert_eq!(order, (0..9).collect::<Vec<_>>());
        assert_eq!(inverse_order(&order), order);
    }
}
