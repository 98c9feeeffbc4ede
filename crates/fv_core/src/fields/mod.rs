// crates/fv_core/src/fields/mod.rs

//! # 场
//!
//! - [`dimensioned`] - 带量纲的单元场
//! - [`surface`] - 面场
//! - [`patch_field`] - 补丁场（边界条件）及注册表
//! - [`geometric`] - 体积场：单元场、补丁场、旧时间层
//! - [`io`] - ASCII / 二进制场文件

pub mod dimensioned;
pub mod geometric;
pub mod io;
pub mod patch_field;
pub mod surface;

pub use dimensioned::DimensionedField;
pub use geometric::{
    patch_types, FieldSnapshot, GeometricField, VolScalarField, VolSymmTensorField,
    VolTensorField, VolVectorField,
};
pub use io::{FieldFormat, FieldRegistries};
pub use patch_field::{
    constraint_type, new_patch_field, patch_field_registry, MappedCoupling, PatchField,
    PatchFieldArgs, PatchFieldKind, PatchFieldRegistry,
};
pub use surface::{SurfaceField, SurfaceScalarField};
