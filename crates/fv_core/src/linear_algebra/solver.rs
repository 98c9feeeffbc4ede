// crates/fv_core/src/linear_algebra/solver.rs

//! 迭代求解器
//!
//! - [`PcgSolver`]: 预条件共轭梯度，适用于对称正定矩阵
//! - [`BiCgStabSolver`]: 双共轭梯度稳定法，适用于非对称矩阵
//!
//! 收敛判据：残差二范数低于 `atol`，或相对初始残差低于 `rtol`。

use super::csr::CsrMatrix;
use super::preconditioner::Preconditioner;
use super::vector_ops::{axpy, copy, dot, norm2};

/// 内积低于该值视为停滞
const STAGNATION_TOL: f64 = 1e-30;
/// 残差超过初始残差的该倍数视为发散
const DIVERGENCE_FACTOR: f64 = 1e6;

/// 求解器配置
#[derive(Debug, Clone, Copy)]
pub struct SolverConfig {
    /// 相对容差
    pub rtol: f64,
    /// 绝对容差
    pub atol: f64,
    /// 最大迭代次数
    pub max_iter: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: 1e-8,
            atol: 1e-14,
            max_iter: 1000,
        }
    }
}

impl SolverConfig {
    pub fn new(rtol: f64, max_iter: usize) -> Self {
        Self {
            rtol,
            max_iter,
            ..Default::default()
        }
    }

    pub fn with_atol(mut self, atol: f64) -> Self {
        self.atol = atol;
        self
    }
}

/// 求解状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    Converged,
    MaxIterationsReached,
    Diverged,
    Stagnated,
}

/// 求解结果
#[derive(Debug, Clone, Copy)]
pub struct SolverResult {
    pub status: SolverStatus,
    pub iterations: usize,
    pub residual_norm: f64,
    pub initial_residual_norm: f64,
    pub relative_residual: f64,
}

impl SolverResult {
    fn new(status: SolverStatus, iterations: usize, residual_norm: f64, initial: f64) -> Self {
        Self {
            status,
            iterations,
            residual_norm,
            initial_residual_norm: initial,
            relative_residual: if initial > 0.0 { residual_norm / initial } else { 0.0 },
        }
    }
}

/// 迭代求解器
pub trait IterativeSolver: Send {
    /// 求解 Ax = b，`x` 为初值并写回解
    fn solve(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &dyn Preconditioner,
    ) -> SolverResult;

    /// 名称
    fn name(&self) -> &'static str;
}

/// r = b - A x，返回 ||r||
fn initial_residual(matrix: &CsrMatrix, b: &[f64], x: &[f64], r: &mut [f64]) -> f64 {
    matrix.mul_vec(x, r);
    for (ri, &bi) in r.iter_mut().zip(b.iter()) {
        *ri = bi - *ri;
    }
    norm2(r)
}

// =============================================================================
// PCG
// =============================================================================

/// 预条件共轭梯度法
pub struct PcgSolver {
    config: SolverConfig,
    r: Vec<f64>,
    z: Vec<f64>,
    p: Vec<f64>,
    ap: Vec<f64>,
}

impl PcgSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            z: Vec::new(),
            p: Vec::new(),
            ap: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.r.len() != n {
            self.r = vec![0.0; n];
            self.z = vec![0.0; n];
            self.p = vec![0.0; n];
            self.ap = vec![0.0; n];
        }
    }
}

impl IterativeSolver for PcgSolver {
    fn solve(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &dyn Preconditioner,
    ) -> SolverResult {
        self.ensure_workspace(b.len());
        let SolverConfig {
            rtol,
            atol,
            max_iter,
        } = self.config;

        let initial_norm = initial_residual(matrix, b, x, &mut self.r);
        if initial_norm < atol {
            return SolverResult::new(SolverStatus::Converged, 0, initial_norm, initial_norm);
        }

        precond.apply(&self.r, &mut self.z);
        copy(&self.z, &mut self.p);
        let mut rz = dot(&self.r, &self.z);

        for iter in 0..max_iter {
            matrix.mul_vec(&self.p, &mut self.ap);
            let pap = dot(&self.p, &self.ap);
            if pap.abs() < STAGNATION_TOL {
                return SolverResult::new(SolverStatus::Stagnated, iter, norm2(&self.r), initial_norm);
            }

            let alpha = rz / pap;
            axpy(alpha, &self.p, x);
            axpy(-alpha, &self.ap, &mut self.r);

            let res_norm = norm2(&self.r);
            tracing::trace!(iter = iter + 1, residual = res_norm, "PCG");
            if res_norm < atol || res_norm / initial_norm < rtol {
                return SolverResult::new(SolverStatus::Converged, iter + 1, res_norm, initial_norm);
            }

            precond.apply(&self.r, &mut self.z);
            let rz_new = dot(&self.r, &self.z);
            let beta = rz_new / rz;
            rz = rz_new;
            for (pi, &zi) in self.p.iter_mut().zip(self.z.iter()) {
                *pi = zi + beta * *pi;
            }
        }

        SolverResult::new(
            SolverStatus::MaxIterationsReached,
            max_iter,
            norm2(&self.r),
            initial_norm,
        )
    }

    fn name(&self) -> &'static str {
        "PCG"
    }
}

// =============================================================================
// BiCGStab
// =============================================================================

/// 预条件双共轭梯度稳定法
pub struct BiCgStabSolver {
    config: SolverConfig,
    r: Vec<f64>,
    r0: Vec<f64>,
    p: Vec<f64>,
    v: Vec<f64>,
    s: Vec<f64>,
    t: Vec<f64>,
    z: Vec<f64>,
}

impl BiCgStabSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            r: Vec::new(),
            r0: Vec::new(),
            p: Vec::new(),
            v: Vec::new(),
            s: Vec::new(),
            t: Vec::new(),
            z: Vec::new(),
        }
    }

    fn ensure_workspace(&mut self, n: usize) {
        if self.r.len() != n {
            for w in [
                &mut self.r,
                &mut self.r0,
                &mut self.p,
                &mut self.v,
                &mut self.s,
                &mut self.t,
                &mut self.z,
            ] {
                *w = vec![0.0; n];
            }
        }
    }
}

impl IterativeSolver for BiCgStabSolver {
    fn solve(
        &mut self,
        matrix: &CsrMatrix,
        b: &[f64],
        x: &mut [f64],
        precond: &dyn Preconditioner,
    ) -> SolverResult {
        let n = b.len();
        self.ensure_workspace(n);
        let SolverConfig {
            rtol,
            atol,
            max_iter,
        } = self.config;

        let initial_norm = initial_residual(matrix, b, x, &mut self.r);
        if initial_norm < atol {
            return SolverResult::new(SolverStatus::Converged, 0, initial_norm, initial_norm);
        }

        // 影子残差固定为初始残差
        copy(&self.r, &mut self.r0);
        let mut rho_old = 1.0;
        let mut alpha = 1.0;
        let mut omega = 1.0;
        self.v.fill(0.0);
        self.p.fill(0.0);

        for iter in 0..max_iter {
            let rho = dot(&self.r0, &self.r);
            if rho.abs() < STAGNATION_TOL {
                return SolverResult::new(SolverStatus::Stagnated, iter, norm2(&self.r), initial_norm);
            }
            let beta = if iter == 0 {
                0.0
            } else {
                (rho / rho_old) * (alpha / omega)
            };
            rho_old = rho;

            for i in 0..n {
                self.p[i] = self.r[i] + beta * (self.p[i] - omega * self.v[i]);
            }
            precond.apply(&self.p, &mut self.z);
            matrix.mul_vec(&self.z, &mut self.v);

            let r0v = dot(&self.r0, &self.v);
            if r0v.abs() < STAGNATION_TOL {
                return SolverResult::new(SolverStatus::Stagnated, iter, norm2(&self.r), initial_norm);
            }
            alpha = rho / r0v;

            for i in 0..n {
                self.s[i] = self.r[i] - alpha * self.v[i];
            }
            // x += alpha * M⁻¹p（z 仍为 M⁻¹p）
            axpy(alpha, &self.z, x);

            let s_norm = norm2(&self.s);
            if s_norm < atol || s_norm / initial_norm < rtol {
                return SolverResult::new(SolverStatus::Converged, iter + 1, s_norm, initial_norm);
            }

            precond.apply(&self.s, &mut self.z);
            matrix.mul_vec(&self.z, &mut self.t);
            let tt = dot(&self.t, &self.t);
            omega = if tt.abs() < STAGNATION_TOL {
                1.0
            } else {
                dot(&self.t, &self.s) / tt
            };
            if omega.abs() < STAGNATION_TOL {
                return SolverResult::new(SolverStatus::Stagnated, iter + 1, s_norm, initial_norm);
            }
            axpy(omega, &self.z, x);

            for i in 0..n {
                self.r[i] = self.s[i] - omega * self.t[i];
            }
            let res_norm = norm2(&self.r);
            tracing::trace!(iter = iter + 1, residual = res_norm, "BiCGStab");
            if res_norm < atol || res_norm / initial_norm < rtol {
                return SolverResult::new(SolverStatus::Converged, iter + 1, res_norm, initial_norm);
            }
            if res_norm > initial_norm * DIVERGENCE_FACTOR {
                return SolverResult::new(SolverStatus::Diverged, iter + 1, res_norm, initial_norm);
            }
        }

        SolverResult::new(
            SolverStatus::MaxIterationsReached,
            max_iter,
            norm2(&self.r),
            initial_norm,
        )
    }

    fn name(&self) -> &'static str {
        "PBiCGStab"
    }
}

/// 按名称创建求解器
///
/// `PCG` 用于对称矩阵，`PBiCGStab`/`PBiCG` 用于一般矩阵；未知名称返回 `None`。
pub fn create_solver(name: &str, config: SolverConfig) -> Option<Box<dyn IterativeSolver>> {
    match name {
        "PCG" => Some(Box::new(PcgSolver::new(config))),
        "PBiCGStab" | "PBiCG" | "BiCGStab" => Some(Box::new(BiCgStabSolver::new(config))),
        _ => None,
    }
}

/// 可用的求解器名称
pub const SOLVER_NAMES: &[&str] = &["PBiCG", "PBiCGStab", "PCG"];
