// crates/fv_core/src/time.rs

//! 运行时钟
//!
//! 时间索引在每次 [`RunTime::advance`] 时递增。场在首次被修改时
//! 比较自身记录的索引与时钟索引，以决定是否存储旧时间层。
//! 时钟由网格共享，内部用读写锁保护。

use fv_foundation::{FvError, FvResult};
use parking_lot::RwLock;
use std::sync::Arc;

/// 共享时钟
pub type SharedRunTime = Arc<RwLock<RunTime>>;

/// 运行时钟
#[derive(Debug, Clone, PartialEq)]
pub struct RunTime {
    index: usize,
    value: f64,
    delta_t: f64,
    delta_t0: f64,
    last_step: f64,
}

impl Default for RunTime {
    fn default() -> Self {
        Self {
            index: 0,
            value: 0.0,
            delta_t: 1.0,
            delta_t0: 1.0,
            last_step: 1.0,
        }
    }
}

impl RunTime {
    /// 创建时钟；时间步必须为正
    pub fn new(start: f64, delta_t: f64) -> FvResult<Self> {
        check_delta_t(delta_t)?;
        Ok(Self {
            index: 0,
            value: start,
            delta_t,
            delta_t0: delta_t,
            last_step: delta_t,
        })
    }

    /// 包装为共享时钟
    pub fn shared(self) -> SharedRunTime {
        Arc::new(RwLock::new(self))
    }

    /// 时间索引
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// 当前时间
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// 当前时间步
    #[inline]
    pub fn delta_t(&self) -> f64 {
        self.delta_t
    }

    /// 上一时间步
    #[inline]
    pub fn delta_t0(&self) -> f64 {
        self.delta_t0
    }

    /// 修改后续时间步
    pub fn set_delta_t(&mut self, delta_t: f64) -> FvResult<()> {
        check_delta_t(delta_t)?;
        self.delta_t = delta_t;
        Ok(())
    }

    /// 推进一个时间步
    pub fn advance(&mut self) {
        self.delta_t0 = self.last_step;
        self.last_step = self.delta_t;
        self.index += 1;
        self.value += self.delta_t;
        tracing::debug!(index = self.index, time = self.value, "时间推进");
    }

    /// 时间目录名
    pub fn time_name(&self) -> String {
        let rounded = (self.value * 1e12).round() / 1e12;
        format!("{rounded}")
    }
}

fn check_delta_t(delta_t: f64) -> FvResult<()> {
    if delta_t > 0.0 && delta_t.is_finite() {
        Ok(())
    } else {
        Err(FvError::invalid_entry(
            "controlDict",
            "deltaT",
            delta_t.to_string(),
            "时间步必须为正",
        ))
    }
}
