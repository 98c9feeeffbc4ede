// crates/fv_core/src/linear_algebra/preconditioner.rs

//! 预条件器
//!
//! 把 Ax = b 转换为条件数更好的 M⁻¹Ax = M⁻¹b。
//!
//! - [`IdentityPreconditioner`]: M = I
//! - [`JacobiPreconditioner`]: M = diag(A)
//! - [`Ilu0Preconditioner`]: 保持稀疏模式的不完全 LU 分解

use super::csr::CsrMatrix;

/// 对角元绝对值低于该阈值时不做缩放
const ZERO_PIVOT: f64 = 1e-14;

/// 预条件器：z = M⁻¹ r
pub trait Preconditioner: Send + Sync {
    /// 应用预条件器
    fn apply(&self, r: &[f64], z: &mut [f64]);

    /// 名称
    fn name(&self) -> &'static str;

    /// 矩阵值变化但结构不变时更新
    fn update(&mut self, matrix: &CsrMatrix);
}

/// 恒等预条件器
#[derive(Debug, Clone, Default)]
pub struct IdentityPreconditioner;

impl Preconditioner for IdentityPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        z.copy_from_slice(r);
    }

    fn name(&self) -> &'static str {
        "none"
    }

    fn update(&mut self, _matrix: &CsrMatrix) {}
}

/// Jacobi 预条件器，z_i = r_i / A_ii
#[derive(Debug, Clone)]
pub struct JacobiPreconditioner {
    inv_diag: Vec<f64>,
}

impl JacobiPreconditioner {
    pub fn from_matrix(matrix: &CsrMatrix) -> Self {
        let mut p = Self {
            inv_diag: vec![1.0; matrix.n_rows()],
        };
        p.update(matrix);
        p
    }
}

impl Preconditioner for JacobiPreconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        debug_assert_eq!(r.len(), self.inv_diag.len());
        for ((zi, &ri), &inv_d) in z.iter_mut().zip(r.iter()).zip(self.inv_diag.iter()) {
            *zi = ri * inv_d;
        }
    }

    fn name(&self) -> &'static str {
        "diagonal"
    }

    fn update(&mut self, matrix: &CsrMatrix) {
        self.inv_diag.resize(matrix.n_rows(), 1.0);
        for (i, inv) in self.inv_diag.iter_mut().enumerate() {
            *inv = match matrix.diagonal_value(i) {
                Some(d) if d.abs() > ZERO_PIVOT => 1.0 / d,
                _ => 1.0,
            };
        }
    }
}

/// ILU(0) 预条件器
///
/// L 的严格下三角与 U 的上三角（含对角）共用一个值数组。
#[derive(Debug, Clone)]
pub struct Ilu0Preconditioner {
    n: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    lu_values: Vec<f64>,
    diag_ptr: Vec<usize>,
}

impl Ilu0Preconditioner {
    pub fn new(matrix: &CsrMatrix) -> Self {
        let n = matrix.n_rows();
        let row_ptr = matrix.pattern().row_ptr().to_vec();
        let col_idx = matrix.pattern().col_idx().to_vec();
        let diag_ptr = (0..n)
            .map(|i| matrix.pattern().find_index(i, i).unwrap_or(row_ptr[i]))
            .collect();
        let mut p = Self {
            n,
            row_ptr,
            col_idx,
            lu_values: matrix.values().to_vec(),
            diag_ptr,
        };
        p.factorize();
        p
    }

    fn factorize(&mut self) {
        let (row_ptr, col_idx, diag_ptr) = (&self.row_ptr, &self.col_idx, &self.diag_ptr);
        let lu = &mut self.lu_values;
        for i in 1..self.n {
            for k_idx in row_ptr[i]..row_ptr[i + 1] {
                let k = col_idx[k_idx];
                if k >= i {
                    break;
                }
                let mut diag_k = lu[diag_ptr[k]];
                if diag_k.abs() < ZERO_PIVOT {
                    diag_k = ZERO_PIVOT.copysign(diag_k);
                    lu[diag_ptr[k]] = diag_k;
                }
                let factor = lu[k_idx] / diag_k;
                lu[k_idx] = factor;

                for j_idx in (k_idx + 1)..row_ptr[i + 1] {
                    let j = col_idx[j_idx];
                    let row_k = &col_idx[row_ptr[k]..row_ptr[k + 1]];
                    if let Ok(local) = row_k.binary_search(&j) {
                        let m_idx = row_ptr[k] + local;
                        lu[j_idx] -= factor * lu[m_idx];
                    }
                }
            }
        }
    }
}

impl Preconditioner for Ilu0Preconditioner {
    fn apply(&self, r: &[f64], z: &mut [f64]) {
        // L y = r
        let mut y = r.to_vec();
        for i in 0..self.n {
            for k_idx in self.row_ptr[i]..self.diag_ptr[i] {
                y[i] -= self.lu_values[k_idx] * y[self.col_idx[k_idx]];
            }
        }
        // U z = y
        z.copy_from_slice(&y);
        for i in (0..self.n).rev() {
            for k_idx in (self.diag_ptr[i] + 1)..self.row_ptr[i + 1] {
                z[i] -= self.lu_values[k_idx] * z[self.col_idx[k_idx]];
            }
            let d = self.lu_values[self.diag_ptr[i]];
            if d.abs() > ZERO_PIVOT {
                z[i] /= d;
            }
        }
    }

    fn name(&self) -> &'static str {
        "DILU"
    }

    fn update(&mut self, matrix: &CsrMatrix) {
        self.lu_values.copy_from_slice(matrix.values());
        self.factorize();
    }
}

/// 按名称创建预条件器
///
/// 接受 `none`、`diagonal`/`Jacobi`、`DIC`/`DILU`/`ILU0`，未知名称返回 `None`。
pub fn create_preconditioner(name: &str, matrix: &CsrMatrix) -> Option<Box<dyn Preconditioner>> {
    match name {
        "none" => Some(Box::new(IdentityPreconditioner)),
        "diagonal" | "Jacobi" => Some(Box::new(JacobiPreconditioner::from_matrix(matrix))),
        "DIC" | "DILU" | "ILU0" => Some(Box::new(Ilu0Preconditioner::new(matrix))),
        _ => None,
    }
}

/// 可用的预条件器名称
pub const PRECONDITIONER_NAMES: &[&str] = &["DIC", "DILU", "ILU0", "Jacobi", "diagonal", "none"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linear_algebra::CsrPattern;

    fn tridiag(n: usize) -> CsrMatrix {
        let mut m = CsrMatrix::zeros(CsrPattern::from_pairs(n, (1..n).map(|i| (i - 1, i))));
        for i in 0..n {
            m.add(i, i, 4.0);
            if i > 0 {
                m.add(i, i - 1, -1.0);
            }
            if i + 1 < n {
                m.add(i, i + 1, -1.0);
            }
        }
        m
    }

    #[test]
    fn test_jacobi() {
        let m = tridiag(3);
        let p = JacobiPreconditioner::from_matrix(&m);
        let mut z = vec![0.0; 3];
        p.apply(&[4.0, 8.0, 2.0], &mut z);
        assert_eq!(z, vec![1.0, 2.0, 0.5]);
    }

    #[test]
    fn test_ilu0_exact_for_tridiagonal() {
        // 三对角矩阵的 ILU(0) 即完全 LU，应用后等于精确求解
        let m = tridiag(5);
        let p = Ilu0Preconditioner::new(&m);
        let x = vec![1.0, -2.0, 0.5, 3.0, 1.0];
        let mut b = vec![0.0; 5];
        m.mul_vec(&x, &mut b);
        let mut z = vec![0.0; 5];
        p.apply(&b, &mut z);
        for (zi, xi) in z.iter().zip(x.iter()) {
            assert!((zi - xi).abs() < 1e-12);
        }
    }

    #[test]
    fn test_create_by_name() {
        let m = tridiag(2);
        assert_eq!(create_preconditioner("DIC", &m).map(|p| p.name()), Some("DILU"));
        assert!(create_preconditioner("GAMG", &m).is_none());
    }
}
