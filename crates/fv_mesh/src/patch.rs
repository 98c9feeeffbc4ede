// crates/fv_mesh/src/patch.rs

//! 边界补丁
//!
//! 补丁是内部面之后的一段连续面。类型决定补丁是否为约束类型
//! （cyclic/empty/symmetryPlane 只能配合同名的补丁场类型）以及是否耦合。

use fv_foundation::{FvError, FvResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// 补丁类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatchKind {
    /// 一般补丁
    Patch,
    /// 壁面
    Wall,
    /// 空（二维算例的前后面）
    Empty,
    /// 对称面
    SymmetryPlane,
    /// 周期耦合；面按序号与对侧补丁一一对应
    Cyclic {
        /// 对侧补丁名称
        neighbour_patch: String,
    },
    /// 映射补丁（值由耦合层从另一补丁采样）
    Mapped,
}

impl PatchKind {
    /// 类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            PatchKind::Patch => "patch",
            PatchKind::Wall => "wall",
            PatchKind::Empty => "empty",
            PatchKind::SymmetryPlane => "symmetryPlane",
            PatchKind::Cyclic { .. } => "cyclic",
            PatchKind::Mapped => "mapped",
        }
    }

    /// 由名称构造；cyclic 需另外给出对侧补丁
    pub fn from_name(name: &str, neighbour_patch: Option<&str>) -> FvResult<Self> {
        Ok(match name {
            "patch" => PatchKind::Patch,
            "wall" => PatchKind::Wall,
            "empty" => PatchKind::Empty,
            "symmetryPlane" => PatchKind::SymmetryPlane,
            "mapped" => PatchKind::Mapped,
            "cyclic" => PatchKind::Cyclic {
                neighbour_patch: neighbour_patch
                    .ok_or_else(|| FvError::missing_entry("cyclic", "neighbourPatch"))?
                    .to_string(),
            },
            other => {
                return Err(FvError::unknown_type(
                    "polyPatch",
                    other,
                    ["cyclic", "empty", "mapped", "patch", "symmetryPlane", "wall"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                ))
            }
        })
    }

    /// 是否为约束类型
    #[inline]
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            PatchKind::Empty | PatchKind::SymmetryPlane | PatchKind::Cyclic { .. }
        )
    }

    /// 是否为耦合补丁
    #[inline]
    pub fn is_coupled(&self) -> bool {
        matches!(self, PatchKind::Cyclic { .. })
    }

    /// 是否为壁面
    #[inline]
    pub fn is_wall(&self) -> bool {
        matches!(self, PatchKind::Wall)
    }
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// 边界补丁
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyPatch {
    name: String,
    kind: PatchKind,
    start: usize,
    size: usize,
    index: usize,
    groups: Vec<String>,
}

impl PolyPatch {
    /// 创建补丁；索引由网格在组装时分配
    pub fn new(name: impl Into<String>, kind: PatchKind, start: usize, size: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            start,
            size,
            index: 0,
            groups: Vec::new(),
        }
    }

    /// 追加所属组
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &PatchKind {
        &self.kind
    }

    /// 第一个面的全局编号
    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// 面数
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 在网格补丁列表中的位置
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    #[inline]
    pub(crate) fn set_range(&mut self, start: usize, size: usize) {
        self.start = start;
        self.size = size;
    }

    /// 全局面编号范围
    #[inline]
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.size
    }

    /// 全局面编号转局部编号
    #[inline]
    pub fn local_face(&self, face: usize) -> Option<usize> {
        self.range().contains(&face).then(|| face - self.start)
    }

    /// 所属组
    #[inline]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }
}
