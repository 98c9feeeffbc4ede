// crates/fv_core/src/matrix/mod.rs

//! # 矩阵方程
//!
//! - [`fv_matrix`] - LDU 形式的有限体积矩阵及代数、松弛、约束
//! - [`fvm`] - 隐式算子：时间、对流、扩散、源项
//! - [`fvc`] - 显式算子：插值、梯度、散度、拉普拉斯
//! - [`solve`] - 分量分离求解

pub mod fv_matrix;
pub mod fvc;
pub mod fvm;
pub mod solve;

pub use fv_matrix::FvMatrix;
pub use fvm::Diffusivity;
pub use solve::SolverPerformance;
