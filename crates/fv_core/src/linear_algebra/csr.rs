// crates/fv_core/src/linear_algebra/csr.rs

//! 压缩稀疏行（CSR）矩阵
//!
//! 有限体积矩阵以 LDU 形式组装，求解前按分量转换为 CSR：
//! 对角元来自 `diag`，内部面给出一对非对角元 `(owner, neighbour)` 与
//! `(neighbour, owner)`，周期耦合面追加跨补丁的非对角元。
//!
//! # 特性开关
//!
//! - `parallel`: 启用基于 `rayon` 的并行矩阵-向量乘法
//!
//! # 使用示例
//!
//! ```
//! use fv_core::linear_algebra::{CsrMatrix, CsrPattern};
//!
//! let mut matrix = CsrMatrix::zeros(CsrPattern::from_pairs(3, [(0, 1)]));
//! for (r, c, v) in [(0, 0, 4.0), (0, 1, -1.0), (1, 0, -1.0), (1, 1, 4.0), (2, 2, 4.0)] {
//!     matrix.add(r, c, v);
//! }
//!
//! let mut y = vec![0.0; 3];
//! matrix.mul_vec(&[1.0, 2.0, 3.0], &mut y);
//! assert_eq!(y, vec![2.0, 7.0, 12.0]);
//! ```

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// 行数超过该值时矩阵-向量乘法走并行路径
#[cfg(feature = "parallel")]
const PARALLEL_THRESHOLD: usize = 4096;

// =============================================================================
// 稀疏模式
// =============================================================================

/// CSR 矩阵的稀疏模式，与值分离以便复用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrPattern {
    n_rows: usize,
    n_cols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
}

impl CsrPattern {
    /// 由单元数与耦合对构造方阵模式；每个单元都有对角元
    ///
    /// `pairs` 中每个 `(a, b)` 产生 `(a, b)` 与 `(b, a)` 两个位置，重复对合并。
    pub fn from_pairs(n: usize, pairs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut rows: Vec<Vec<usize>> = (0..n).map(|i| vec![i]).collect();
        for (a, b) in pairs {
            rows[a].push(b);
            rows[b].push(a);
        }
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_idx = Vec::new();
        row_ptr.push(0);
        for mut row in rows {
            row.sort_unstable();
            row.dedup();
            col_idx.extend(row);
            row_ptr.push(col_idx.len());
        }
        Self {
            n_rows: n,
            n_cols: n,
            row_ptr,
            col_idx,
        }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// 非零元数量
    #[inline]
    pub fn nnz(&self) -> usize {
        self.col_idx.len()
    }

    #[inline]
    pub fn row_ptr(&self) -> &[usize] {
        &self.row_ptr
    }

    #[inline]
    pub fn col_idx(&self) -> &[usize] {
        &self.col_idx
    }

    /// 第 `row` 行的列索引
    #[inline]
    pub fn row_indices(&self, row: usize) -> &[usize] {
        &self.col_idx[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    /// 查找 (row, col) 对应的值索引（列索引有序，二分查找）
    pub fn find_index(&self, row: usize, col: usize) -> Option<usize> {
        let start = self.row_ptr[row];
        self.row_indices(row)
            .binary_search(&col)
            .ok()
            .map(|local| start + local)
    }
}

// =============================================================================
// CSR 矩阵
// =============================================================================

/// CSR 格式稀疏矩阵
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    pattern: CsrPattern,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// 由模式创建零矩阵
    pub fn zeros(pattern: CsrPattern) -> Self {
        let values = vec![0.0; pattern.nnz()];
        Self { pattern, values }
    }

    #[inline]
    pub fn n_rows(&self) -> usize {
        self.pattern.n_rows()
    }

    #[inline]
    pub fn n_cols(&self) -> usize {
        self.pattern.n_cols()
    }

    #[inline]
    pub fn pattern(&self) -> &CsrPattern {
        &self.pattern
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// (row, col) 的值，不在模式中时为 0
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.pattern
            .find_index(row, col)
            .map(|idx| self.values[idx])
            .unwrap_or(0.0)
    }

    /// 累加到 (row, col)，位置不在模式中时返回 false
    pub fn add(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.pattern.find_index(row, col) {
            Some(idx) => {
                self.values[idx] += value;
                true
            }
            None => false,
        }
    }

    /// 行视图
    pub fn row(&self, row: usize) -> RowView<'_> {
        let range = self.pattern.row_ptr[row]..self.pattern.row_ptr[row + 1];
        RowView {
            col_idx: &self.pattern.col_idx[range.clone()],
            values: &self.values[range],
        }
    }

    /// 对角元
    #[inline]
    pub fn diagonal_value(&self, row: usize) -> Option<f64> {
        self.pattern.find_index(row, row).map(|idx| self.values[idx])
    }

    /// y = A x
    pub fn mul_vec(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");

        #[cfg(feature = "parallel")]
        if self.n_rows() > PARALLEL_THRESHOLD {
            self.mul_vec_parallel(x, y);
            return;
        }

        for (row, out) in y.iter_mut().enumerate() {
            *out = self.row_dot(row, x);
        }
    }

    /// 基于 `rayon` 的并行 y = A x
    #[cfg(feature = "parallel")]
    pub fn mul_vec_parallel(&self, x: &[f64], y: &mut [f64]) {
        assert_eq!(x.len(), self.n_cols(), "x 长度必须等于矩阵列数");
        assert_eq!(y.len(), self.n_rows(), "y 长度必须等于矩阵行数");
        y.par_iter_mut()
            .enumerate()
            .for_each(|(row, out)| *out = self.row_dot(row, x));
    }

    #[inline]
    fn row_dot(&self, row: usize, x: &[f64]) -> f64 {
        let start = self.pattern.row_ptr[row];
        let end = self.pattern.row_ptr[row + 1];
        let mut sum = 0.0;
        for idx in start..end {
            sum += self.values[idx] * x[self.pattern.col_idx[idx]];
        }
        sum
    }

    /// 在容差内是否对称
    pub fn is_symmetric(&self, tol: f64) -> bool {
        for i in 0..self.n_rows() {
            for (j, a_ij) in self.row(i).iter() {
                if j > i && (a_ij - self.get(j, i)).abs() > tol {
                    return false;
                }
            }
        }
        true
    }
}

// =============================================================================
// 行视图
// =============================================================================

/// 矩阵某一行非零元的只读视图
pub struct RowView<'a> {
    col_idx: &'a [usize],
    values: &'a [f64],
}

impl<'a> RowView<'a> {
    /// 迭代 (列索引, 值)
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.col_idx.iter().copied().zip(self.values.iter().copied())
    }
}
