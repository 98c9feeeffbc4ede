// crates/fv_core/src/parallel/distribution_map.rs

//! 分布映射
//!
//! 描述一次“按索引取值、跨进程发送、按位置装配”的数据移动：
//!
//! - `sub_map[p]`：本进程要发给 rank p 的本地元素索引
//! - `construct_map[p]`：从 rank p 收到的元素在装配结果中的位置
//!
//! 正向分布得到长度为 `construct_size` 的数组；反向分布把装配数组中
//! 的元素送回原位置，同一原位置收到多个值时用合并函数累积。

use super::communicator::{Communicator, CommunicatorExt};
use fv_foundation::{FvError, FvResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// 分布映射
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionMap {
    construct_size: usize,
    sub_map: Vec<Vec<usize>>,
    construct_map: Vec<Vec<usize>>,
}

impl DistributionMap {
    /// 由发送与装配表构造
    pub fn new(
        construct_size: usize,
        sub_map: Vec<Vec<usize>>,
        construct_map: Vec<Vec<usize>>,
    ) -> FvResult<Self> {
        FvError::check_size("construct_map", sub_map.len(), construct_map.len())?;
        if let Some(&bad) = construct_map.iter().flatten().find(|&&i| i >= construct_size) {
            return Err(FvError::internal(format!(
                "装配位置 {bad} 超出装配大小 {construct_size}"
            )));
        }
        Ok(Self {
            construct_size,
            sub_map,
            construct_map,
        })
    }

    /// 单进程恒等映射
    pub fn identity(size: usize) -> Self {
        let all: Vec<usize> = (0..size).collect();
        Self {
            construct_size: size,
            sub_map: vec![all.clone()],
            construct_map: vec![all],
        }
    }

    /// 由每个 rank 需要的发送索引建立映射
    ///
    /// 各进程交换发送数目，来自 rank p 的元素在装配结果中按 rank 顺序
    /// 依次排列。
    pub fn from_send_lists(comm: &dyn Communicator, sub_map: Vec<Vec<usize>>) -> FvResult<Self> {
        FvError::check_size("sub_map", comm.size(), sub_map.len())?;
        let send_counts: Vec<usize> = sub_map.iter().map(Vec::len).collect();
        let recv_counts: Vec<usize> = comm.all_to_all(&send_counts[..])?;
        let mut construct_map = Vec::with_capacity(recv_counts.len());
        let mut next = 0;
        for count in recv_counts {
            construct_map.push((next..next + count).collect());
            next += count;
        }
        Self::new(next, sub_map, construct_map)
    }

    /// 装配结果大小
    #[inline]
    pub fn construct_size(&self) -> usize {
        self.construct_size
    }

    #[inline]
    pub fn sub_map(&self) -> &[Vec<usize>] {
        &self.sub_map
    }

    #[inline]
    pub fn construct_map(&self) -> &[Vec<usize>] {
        &self.construct_map
    }

    /// 正向分布
    pub fn distribute<T>(&self, comm: &dyn Communicator, data: &[T]) -> FvResult<Vec<T>>
    where
        T: Clone + Default + Serialize + DeserializeOwned,
    {
        let send: Vec<Vec<T>> = self
            .sub_map
            .iter()
            .map(|indices| indices.iter().map(|&i| data[i].clone()).collect())
            .collect();
        let received = exchange(comm, send)?;

        let mut result = vec![T::default(); self.construct_size];
        for (from, values) in received.into_iter().enumerate() {
            let slots = &self.construct_map[from];
            FvError::check_size("distributed values", slots.len(), values.len())?;
            for (&slot, v) in slots.iter().zip(values) {
                result[slot] = v;
            }
        }
        Ok(result)
    }

    /// 反向分布：把装配数组送回 `original_size` 长的原数组并用 `combine` 累积
    pub fn reverse_distribute<T, F>(
        &self,
        comm: &dyn Communicator,
        constructed: &[T],
        original_size: usize,
        init: T,
        mut combine: F,
    ) -> FvResult<Vec<T>>
    where
        T: Clone + Serialize + DeserializeOwned,
        F: FnMut(&mut T, T),
    {
        FvError::check_size("constructed values", self.construct_size, constructed.len())?;
        let send: Vec<Vec<T>> = self
            .construct_map
            .iter()
            .map(|slots| slots.iter().map(|&s| constructed[s].clone()).collect())
            .collect();
        let received = exchange(comm, send)?;

        let mut result = vec![init; original_size];
        for (from, values) in received.into_iter().enumerate() {
            let indices = &self.sub_map[from];
            FvError::check_size("returned values", indices.len(), values.len())?;
            for (&i, v) in indices.iter().zip(values) {
                combine(&mut result[i], v);
            }
        }
        Ok(result)
    }
}

fn exchange<T>(comm: &dyn Communicator, send: Vec<Vec<T>>) -> FvResult<Vec<Vec<T>>>
where
    T: Serialize + DeserializeOwned,
{
    if comm.is_serial() {
        return Ok(send);
    }
    comm.all_to_all(&send[..])
}
