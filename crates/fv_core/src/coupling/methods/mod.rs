// crates/fv_core/src/coupling/methods/mod.rs

//! # 面耦合方法
//!
//! 给定本地的源面集合与目标面集合，求出每个面耦合的对侧面及权重。
//! 源面权重以源面面积归一，目标面权重以目标面面积归一。
//!
//! - `nearest` - 每个面耦合面中心最近的对侧面，权重 1
//! - `matching` - 同 `nearest`，但要求两侧面一一重合
//! - `intersection` - 按投影重叠面积加权，R-Tree 播种加邻接推进
//!
//! ## 字典写法
//!
//! ```text
//! method      intersection;
//! tolerance   1e-4;   // matching 使用
//! ```

mod intersection;
mod matching;
mod nearest;

pub use intersection::IntersectionMethod;
pub use matching::MatchingMethod;
pub use nearest::NearestMethod;

use fv_foundation::{Dictionary, FvResult, Registry, Vector};
use fv_mesh::PrimitivePatch;
use std::fmt::Debug;
use std::sync::Arc;

/// 本地耦合结果：每个面的 (对侧面, 权重) 列表
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalCoupling {
    pub src_tgt: Vec<Vec<(usize, f64)>>,
    pub tgt_src: Vec<Vec<(usize, f64)>>,
}

impl LocalCoupling {
    /// 空耦合
    pub fn empty(n_src: usize, n_tgt: usize) -> Self {
        Self {
            src_tgt: vec![Vec::new(); n_src],
            tgt_src: vec![Vec::new(); n_tgt],
        }
    }
}

/// 耦合方法
pub trait PatchToPatchMethod: Send + Sync + Debug {
    /// 类型名
    fn type_name(&self) -> &'static str;

    /// 计算本地耦合
    ///
    /// `reverse` 为真时只耦合法向相反的面对，否则只耦合法向同向的面对。
    fn intersect(
        &self,
        src: &PrimitivePatch,
        tgt: &PrimitivePatch,
        reverse: bool,
    ) -> FvResult<LocalCoupling>;
}

/// 构造器
pub type PatchToPatchConstructor = fn(&Dictionary) -> FvResult<Arc<dyn PatchToPatchMethod>>;

/// 耦合方法注册表
pub type PatchToPatchRegistry = Registry<PatchToPatchConstructor>;

/// 包含全部内置方法的注册表
pub fn patch_to_patch_registry() -> PatchToPatchRegistry {
    let mut registry = PatchToPatchRegistry::new("patchToPatch");
    registry
        .register("nearest", NearestMethod::from_dict as PatchToPatchConstructor)
        .register("matching", MatchingMethod::from_dict as PatchToPatchConstructor)
        .register("intersection", IntersectionMethod::from_dict as PatchToPatchConstructor);
    registry
}

/// 按名称构造
pub fn new_patch_to_patch_method(
    name: &str,
    dict: &Dictionary,
    registry: &PatchToPatchRegistry,
) -> FvResult<Arc<dyn PatchToPatchMethod>> {
    let ctor = registry.lookup(name)?;
    tracing::debug!(method = name, "选择面耦合方法");
    ctor(dict)
}

/// 面中心最近且被 `accept` 接受的对侧面：先按包围盒取候选，再比较中心距离
pub(crate) fn nearest_face(
    index: &fv_mesh::FaceSpatialIndex,
    centres: &[Vector],
    point: Vector,
    accept: impl Fn(usize) -> bool,
) -> Option<usize> {
    const CANDIDATES: usize = 8;
    index
        .k_nearest(point, CANDIDATES)
        .into_iter()
        .filter(|&f| accept(f))
        .min_by(|&a, &b| {
            let da = centres[a].distance_squared(point);
            let db = centres[b].distance_squared(point);
            da.total_cmp(&db)
        })
}

/// 两侧法向是否与 `reverse` 一致
#[inline]
pub(crate) fn orientation_ok(n_src: Vector, n_tgt: Vector, reverse: bool) -> bool {
    let d = n_src.dot(n_tgt);
    if reverse {
        d < 0.0
    } else {
        d > 0.0
    }
}
