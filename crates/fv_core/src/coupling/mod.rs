// crates/fv_core/src/coupling/mod.rs

//! # 补丁耦合
//!
//! - [`polygon`] - 平面多边形裁剪与重叠面积
//! - [`methods`] - 本地面耦合方法及注册表
//! - [`patch_to_patch`] - 跨进程的补丁间耦合与插值
//! - [`mapped_patch_base`] - 映射补丁的采样配置

pub mod mapped_patch_base;
pub mod methods;
pub mod patch_to_patch;
pub mod polygon;

pub use mapped_patch_base::{MappedPatchBase, MappedTransform, MoveUpdate};
pub use methods::{
    new_patch_to_patch_method, patch_to_patch_registry, LocalCoupling, PatchToPatchMethod,
    PatchToPatchRegistry,
};
pub use patch_to_patch::PatchToPatch;
