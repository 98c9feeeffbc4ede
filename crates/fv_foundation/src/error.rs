// crates/fv_foundation/src/error.rs

//! 错误处理模块，定义统一错误类型
//!
//! 提供 `FvError` 枚举和 `FvResult` 类型别名，用于整个工作区的错误处理。
//!
//! # 设计原则
//!
//! 1. **致命即返回**: 配置错误、量纲不一致、网格寻址不匹配均以 `Err` 立即向上传播，
//!    不在本层重试或降级为警告
//! 2. **带上下文**: 每个错误携带字典名、键名、场名或 patch 名，便于用户修正输入
//! 3. **易用性**: 提供便捷的构造方法
//!
//! # 示例
//!
//! ```
//! use fv_foundation::error::{FvError, FvResult};
//!
//! fn read_value() -> FvResult<f64> {
//!     Err(FvError::missing_entry("T.boundaryField.inlet", "value"))
//! }
//! assert!(read_value().is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// 统一结果类型
pub type FvResult<T> = Result<T, FvError>;

/// 工作区错误类型
#[derive(Error, Debug)]
pub enum FvError {
    // ========================================================================
    // IO 相关错误
    // ========================================================================
    /// IO 错误
    #[error("IO错误: {message}")]
    Io {
        /// 描述性错误信息
        message: String,
        #[source]
        /// 可选的底层 IO 错误
        source: Option<std::io::Error>,
    },

    /// 文件不存在
    #[error("文件不存在: {path}")]
    FileNotFound {
        /// 未找到的路径
        path: PathBuf,
    },

    /// 文本解析错误
    #[error("解析错误: {context} 第{line}行: {message}")]
    Parse {
        /// 正在解析的对象（文件名或字典名）
        context: String,
        /// 行号
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        /// 序列化失败原因
        message: String,
    },

    // ========================================================================
    // 配置错误
    // ========================================================================
    /// 字典缺少必需条目
    #[error("字典 {dictionary} 中缺少必需条目 '{key}'")]
    MissingEntry {
        /// 字典的作用域名称
        dictionary: String,
        /// 缺失的键
        key: String,
    },

    /// 字典条目无效
    #[error("字典 {dictionary} 中条目 {key}={value} 无效: {reason}")]
    InvalidEntry {
        /// 字典的作用域名称
        dictionary: String,
        /// 键
        key: String,
        /// 原始文本
        value: String,
        /// 无效原因
        reason: String,
    },

    /// 注册表中不存在的类型名
    #[error("未知的{family}类型 '{name}'，可选类型: {valid:?}")]
    UnknownType {
        /// 模型族名称
        family: String,
        /// 请求的类型名
        name: String,
        /// 已注册的类型名
        valid: Vec<String>,
    },

    // ========================================================================
    // 场与网格一致性错误
    // ========================================================================
    /// 量纲不一致
    #[error("量纲不一致: {operation} 的操作数量纲分别为 {lhs} 与 {rhs}")]
    DimensionMismatch {
        /// 运算名称
        operation: String,
        /// 左操作数量纲
        lhs: String,
        /// 右操作数量纲
        rhs: String,
    },

    /// 数组大小不匹配
    #[error("数组大小不匹配: {name} 期望{expected}, 实际{actual}")]
    SizeMismatch {
        /// 数据名称
        name: String,
        /// 期望大小
        expected: usize,
        /// 实际大小
        actual: usize,
    },

    /// 场与矩阵或另一场不属于同一网格
    #[error("网格不匹配: {field} 属于网格 #{actual}, 期望网格 #{expected}")]
    MeshMismatch {
        /// 场名称
        field: String,
        /// 期望的网格编号
        expected: u64,
        /// 实际的网格编号
        actual: u64,
    },

    /// 矩阵方程与求解变量不一致
    #[error("矩阵方程为场 {expected} 组装, 却用于场 {actual}")]
    FieldMismatch {
        /// 组装时的场名
        expected: String,
        /// 实际传入的场名
        actual: String,
    },

    /// 边界条件不支持的操作
    #[error("patch {patch} 上的 {patch_type} 边界条件不支持操作 {operation}")]
    InvalidPatchOperation {
        /// patch 名称
        patch: String,
        /// 边界条件类型
        patch_type: String,
        /// 操作名
        operation: String,
    },

    /// 请求的快照尚未存储
    #[error("场 {field} 尚未存储 {what}")]
    NotStored {
        /// 场名称
        field: String,
        /// 缺失的快照描述
        what: String,
    },

    /// 无效网格拓扑
    #[error("无效的网格拓扑: {message}")]
    InvalidMesh {
        /// 具体错误信息
        message: String,
    },

    // ========================================================================
    // 运行时错误
    // ========================================================================
    /// 进程间通信失败
    #[error("通信错误: {message}")]
    Communication {
        /// 具体错误信息
        message: String,
    },

    /// 功能未实现
    #[error("功能未实现: {feature}")]
    NotImplemented {
        /// 未实现的功能描述
        feature: String,
    },

    /// 内部错误
    #[error("内部错误: {message}")]
    Internal {
        /// 内部错误描述
        message: String,
    },
}

// ========================================================================
// 便捷构造方法
// ========================================================================

impl FvError {
    /// IO 错误
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
            source: None,
        }
    }

    /// IO 错误（带源）
    pub fn io_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(source),
        }
    }

    /// 文件不存在
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// 解析错误
    pub fn parse(context: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            line,
            message: message.into(),
        }
    }

    /// 序列化错误
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// 缺少必需条目
    pub fn missing_entry(dictionary: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingEntry {
            dictionary: dictionary.into(),
            key: key.into(),
        }
    }

    /// 条目无效
    pub fn invalid_entry(
        dictionary: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidEntry {
            dictionary: dictionary.into(),
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// 未知类型
    pub fn unknown_type(family: impl Into<String>, name: impl Into<String>, valid: Vec<String>) -> Self {
        Self::UnknownType {
            family: family.into(),
            name: name.into(),
            valid,
        }
    }

    /// 量纲不一致
    pub fn dimension_mismatch(
        operation: impl Into<String>,
        lhs: impl ToString,
        rhs: impl ToString,
    ) -> Self {
        Self::DimensionMismatch {
            operation: operation.into(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }

    /// 数组大小不匹配
    pub fn size_mismatch(name: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::SizeMismatch {
            name: name.into(),
            expected,
            actual,
        }
    }

    /// 网格不匹配
    pub fn mesh_mismatch(field: impl Into<String>, expected: u64, actual: u64) -> Self {
        Self::MeshMismatch {
            field: field.into(),
            expected,
            actual,
        }
    }

    /// 矩阵与场不一致
    pub fn field_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::FieldMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// 边界条件不支持的操作
    pub fn invalid_patch_operation(
        patch: impl Into<String>,
        patch_type: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self::InvalidPatchOperation {
            patch: patch.into(),
            patch_type: patch_type.into(),
            operation: operation.into(),
        }
    }

    /// 快照未存储
    pub fn not_stored(field: impl Into<String>, what: impl Into<String>) -> Self {
        Self::NotStored {
            field: field.into(),
            what: what.into(),
        }
    }

    /// 无效网格
    pub fn invalid_mesh(message: impl Into<String>) -> Self {
        Self::InvalidMesh {
            message: message.into(),
        }
    }

    /// 通信错误
    pub fn communication(message: impl Into<String>) -> Self {
        Self::Communication {
            message: message.into(),
        }
    }

    /// 功能未实现
    pub fn not_implemented(feature: impl Into<String>) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// 内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// 是否为配置类错误（缺失条目、无效条目或未知类型）
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::MissingEntry { .. } | Self::InvalidEntry { .. } | Self::UnknownType { .. }
        )
    }
}

// ========================================================================
// 验证辅助方法
// ========================================================================

impl FvError {
    /// 检查数组大小是否匹配
    #[inline]
    pub fn check_size(name: &str, expected: usize, actual: usize) -> FvResult<()> {
        if expected != actual {
            Err(Self::size_mismatch(name, expected, actual))
        } else {
            Ok(())
        }
    }

    /// 检查两个网格编号是否一致
    #[inline]
    pub fn check_mesh(field: &str, expected: u64, actual: u64) -> FvResult<()> {
        if expected != actual {
            Err(Self::mesh_mismatch(field, expected, actual))
        } else {
            Ok(())
        }
    }
}

// ========================================================================
// 标准库与第三方错误转换
// ========================================================================

impl From<std::io::Error> for FvError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for FvError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<bincode::Error> for FvError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

// ========================================================================
// 测试
// ========================================================================
