// crates/fv_mesh/src/lib.rs

//! 多面体网格
//!
//! 面-单元表示的非结构多面体网格及其周边工具。
//!
//! # 核心类型
//!
//! - [`PolyMesh`]: 点、面、owner/neighbour、边界补丁与几何量
//! - [`PolyPatch`] / [`PatchKind`]: 边界补丁
//! - [`PrimitivePatch`]: 独立的面集合，耦合层使用
//!
//! # 模块结构
//!
//! - [`geometry`]: 面中心/面积矢量、单元中心/体积
//! - [`topology`]: CSR 连接性
//! - [`bound_box`] / [`spatial_index`]: 包围盒与 R-Tree 面索引
//! - [`generation`]: 测试与演示用的结构化网格
//! - [`renumber`]: 单元重编号方法
//!
//! # 示例
//!
//! ```rust
//! use fv_mesh::generation::BoxMeshBuilder;
//!
//! let mesh = BoxMeshBuilder::cube(2, 1.0).build().unwrap();
//! assert_eq!(mesh.n_cells(), 8);
//! assert_eq!(mesh.n_internal_faces(), 12);
//! ```

pub mod bound_box;
pub mod generation;
pub mod geometry;
pub mod patch;
pub mod poly_mesh;
pub mod primitive_patch;
pub mod renumber;
pub mod spatial_index;
pub mod topology;

pub use bound_box::BoundBox;
pub use generation::{BoxMeshBuilder, BoxSide};
pub use geometry::MeshGeometry;
pub use patch::{PatchKind, PolyPatch};
pub use poly_mesh::PolyMesh;
pub use primitive_patch::PrimitivePatch;
pub use renumber::{new_renumber_method, renumber_registry, RenumberMethod, RenumberRegistry};
pub use spatial_index::FaceSpatialIndex;
pub use topology::CsrConnectivity;
