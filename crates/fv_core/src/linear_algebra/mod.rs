// crates/fv_core/src/linear_algebra/mod.rs

//! 稀疏线性代数
//!
//! 矩阵方程按分量分离求解时使用的 CSR 矩阵、预条件器与 Krylov 求解器。
//! 只保留让 `solve` 端到端可用的标准方法。

pub mod csr;
pub mod preconditioner;
pub mod solver;
pub mod vector_ops;

pub use csr::{CsrMatrix, CsrPattern, RowView};
pub use preconditioner::{
    create_preconditioner, IdentityPreconditioner, Ilu0Preconditioner, JacobiPreconditioner,
    Preconditioner, PRECONDITIONER_NAMES,
};
pub use solver::{
    create_solver, BiCgStabSolver, IterativeSolver, PcgSolver, SolverConfig, SolverResult,
    SolverStatus, SOLVER_NAMES,
};
pub use vector_ops::{axpy, copy, dot, norm2};
