// crates/fv_foundation/src/lib.rs

//! 基础层
//!
//! 整个工作区共享的基础设施，不依赖网格或场：
//!
//! - [`error`]: 统一错误类型 `FvError`
//! - [`dimension`]: 物理量纲与带量纲的值
//! - [`tensor`] / [`value`]: 标量、向量、张量以及统一的场值抽象 `FieldValue`
//! - [`token`] / [`dictionary`] / [`ostream`]: 结构化文本的读写
//! - [`switch`]: 开关量解析
//! - [`registry`]: 按名称选择构造器的注册表

pub mod dictionary;
pub mod dimension;
pub mod error;
pub mod ostream;
pub mod registry;
pub mod switch;
pub mod tensor;
pub mod token;
pub mod value;

pub use dictionary::{Dictionary, Entry, FromTokens};
pub use dimension::{DimensionSet, Dimensioned};
pub use error::{FvError, FvResult};
pub use ostream::{OStream, Precision};
pub use registry::Registry;
pub use switch::Switch;
pub use tensor::{SymmTensor, Tensor, Vector};
pub use value::{Divergence, FieldValue, Gradient};
