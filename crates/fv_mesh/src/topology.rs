// crates/fv_mesh/src/topology.rs

//! 网格拓扑连接性
//!
//! 以 CSR (Compressed Sparse Row) 格式存储由 owner/neighbour 导出的
//! 单元-面、单元-单元连接：
//! - `offsets[i]` 和 `offsets[i+1]` 之间的元素是第 i 行
//! - 只读迭代，构建后不再修改

use serde::{Deserialize, Serialize};

/// CSR 格式连接性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsrConnectivity {
    /// 行偏移数组，长度 = n_rows + 1
    offsets: Vec<usize>,
    /// 列索引数组
    indices: Vec<usize>,
}

impl Default for CsrConnectivity {
    fn default() -> Self {
        Self::empty()
    }
}

impl CsrConnectivity {
    /// 由偏移与索引构造
    pub fn new(offsets: Vec<usize>, indices: Vec<usize>) -> Self {
        debug_assert!(!offsets.is_empty(), "offsets 至少包含一个元素");
        debug_assert_eq!(offsets.last().copied().unwrap_or(0), indices.len());
        Self { offsets, indices }
    }

    /// 0 行
    pub fn empty() -> Self {
        Self {
            offsets: vec![0],
            indices: Vec::new(),
        }
    }

    /// 从行列表构建
    pub fn from_rows<R: AsRef<[usize]>>(rows: &[R]) -> Self {
        let mut offsets = Vec::with_capacity(rows.len() + 1);
        let mut indices = Vec::new();
        offsets.push(0);
        for row in rows {
            indices.extend_from_slice(row.as_ref());
            offsets.push(indices.len());
        }
        Self { offsets, indices }
    }

    /// 第 row 行
    #[inline]
    pub fn row(&self, row: usize) -> &[usize] {
        &self.indices[self.offsets[row]..self.offsets[row + 1]]
    }

    /// 行数
    #[inline]
    pub fn n_rows(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    /// 元素总数
    #[inline]
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    /// 第 row 行的元素个数
    #[inline]
    pub fn row_len(&self, row: usize) -> usize {
        self.offsets[row + 1] - self.offsets[row]
    }

    /// 迭代所有行
    pub fn iter_rows(&self) -> impl Iterator<Item = &[usize]> {
        (0..self.n_rows()).map(move |i| self.row(i))
    }

    /// 转为嵌套列表
    pub fn to_lists(&self) -> Vec<Vec<usize>> {
        self.iter_rows().map(|r| r.to_vec()).collect()
    }
}

// ============================================================================
// 由 owner/neighbour 导出
// ============================================================================

/// 单元-面连接：每个单元按面编号升序列出其全部面
pub fn cell_faces(n_cells: usize, owner: &[usize], neighbour: &[usize]) -> CsrConnectivity {
    let mut counts = vec![0usize; n_cells];
    for &o in owner {
        counts[o] += 1;
    }
    for &n in neighbour {
        counts[n] += 1;
    }
    let mut offsets = Vec::with_capacity(n_cells + 1);
    offsets.push(0);
    for c in &counts {
        let last = *offsets.last().unwrap_or(&0);
        offsets.push(last + c);
    }
    let mut fill = offsets[..n_cells].to_vec();
    let mut indices = vec![0usize; *offsets.last().unwrap_or(&0)];
    for face in 0..owner.len() {
        let o = owner[face];
        indices[fill[o]] = face;
        fill[o] += 1;
        if face < neighbour.len() {
            let n = neighbour[face];
            indices[fill[n]] = face;
            fill[n] += 1;
        }
    }
    // 面按编号遍历，每行已有序
    CsrConnectivity::new(offsets, indices)
}

/// 单元-单元连接（只经过内部面），每行升序
pub fn cell_cells(n_cells: usize, owner: &[usize], neighbour: &[usize]) -> CsrConnectivity {
    let mut rows: Vec<Vec<usize>> = vec![Vec::new(); n_cells];
    for (face, &n) in neighbour.iter().enumerate() {
        let o = owner[face];
        rows[o].push(n);
        rows[n].push(o);
    }
    for row in &mut rows {
        row.sort_unstable();
        row.dedup();
    }
    CsrConnectivity::from_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csr_basic() {
        let csr = CsrConnectivity::new(vec![0, 3, 7, 9], vec![0, 1, 2, 1, 2, 3, 4, 2, 3]);
        assert_eq!(csr.n_rows(), 3);
        assert_eq!(csr.nnz(), 9);
        assert_eq!(csr.row(1), &[1, 2, 3, 4]);
        assert_eq!(csr.row_len(2), 2);
    }

    #[test]
    fn test_csr_empty() {
        let csr = CsrConnectivity::empty();
        assert_eq!(csr.n_rows(), 0);
        assert!(csr.is_empty());
    }

    #[test]
    fn test_cell_connectivity_of_three_cell_row() {
        // 0 | 1 | 2，两个内部面，四个边界面
        let owner = vec![0, 1, 0, 2, 0, 2];
        let neighbour = vec![1, 2];
        let cf = cell_faces(3, &owner, &neighbour);
        assert_eq!(cf.row(0), &[0, 2, 4]);
        assert_eq!(cf.row(1), &[0, 1]);
        assert_eq!(cf.row(2), &[1, 3, 5]);

        let cc = cell_cells(3, &owner, &neighbour);
        assert_eq!(cc.row(0), &[1]);
        assert_eq!(cc.row(1), &[0, 2]);
        assert_eq!(cc.row(2), &[1]);
    }
}
