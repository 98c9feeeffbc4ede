// crates/fv_core/src/lib.rs

//! 有限体积核心
//!
//! 场、边界条件、矩阵组装与求解、补丁耦合。
//!
//! # 核心类型
//!
//! - [`FvMesh`]: 带差分系数与插值权重的有限体积网格，共享运行时钟
//! - [`GeometricField`]: 单元值、补丁场、旧时间层
//! - [`PatchField`]: 边界条件及其矩阵系数
//! - [`FvMatrix`]: LDU 形式的矩阵方程
//! - [`PatchToPatch`]: 补丁间的面重叠耦合
//!
//! # 模块结构
//!
//! - [`config`]: JSON 求解控制
//! - [`time`]: 运行时钟
//! - [`fields`]: 场与场文件
//! - [`matrix`]: `fvm`/`fvc` 算子与求解
//! - [`linear_algebra`]: CSR 矩阵与 Krylov 求解器
//! - [`coupling`]: 补丁耦合与映射补丁
//! - [`parallel`]: 通信器与分布映射
//!
//! # 示例
//!
//! ```rust
//! use std::sync::Arc;
//! use fv_core::fields::{patch_types, GeometricField};
//! use fv_core::matrix::{fvm, Diffusivity};
//! use fv_core::{FvMesh, SolutionControls};
//! use fv_foundation::dimension::{DIMLESS, DIM_KINEMATIC_VISCOSITY};
//! use fv_foundation::Dimensioned;
//! use fv_mesh::BoxMeshBuilder;
//!
//! let mesh = Arc::new(FvMesh::new(BoxMeshBuilder::new(4, 1, 1, 1.0, 0.25, 0.25).build().unwrap()).unwrap());
//! let mut types = patch_types(&mesh, "zeroGradient");
//! types[0] = "fixedValue";
//! let mut t = GeometricField::<f64>::new("T", Arc::clone(&mesh), DIMLESS, &types).unwrap();
//! let nu = Dimensioned::new("nu", DIM_KINEMATIC_VISCOSITY, 1.0);
//! let mut eqn = fvm::laplacian(Diffusivity::Uniform(&nu), &t).unwrap();
//! eqn.negate();
//! eqn.solve(&mut t, &SolutionControls::default()).unwrap();
//! assert!(t.primitive_field().iter().all(|v| v.abs() < 1e-8));
//! ```

pub mod config;
pub mod coupling;
pub mod fields;
pub mod fv_mesh;
pub mod linear_algebra;
pub mod matrix;
pub mod parallel;
pub mod time;

pub use config::{DdtScheme, DivScheme, RelaxationFactors, SchemeSettings, SolutionControls, SolverSettings};
pub use coupling::{MappedPatchBase, PatchToPatch};
pub use fields::{
    DimensionedField, FieldFormat, FieldRegistries, GeometricField, PatchField, SurfaceField,
    SurfaceScalarField, VolScalarField, VolVectorField,
};
pub use fv_mesh::FvMesh;
pub use matrix::{FvMatrix, SolverPerformance};
pub use parallel::{Communicator, DistributionMap, SerialCommunicator};
pub use time::{RunTime, SharedRunTime};
