// crates/fv_core/src/parallel/communicator.rs

//! 进程间通信
//!
//! 集合操作以字节为单位；类型化的收集/交换通过 [`CommunicatorExt`]
//! 用 bincode 编解码。
//!
//! - [`SerialCommunicator`]: 单进程，所有操作就地返回
//! - [`ThreadCommunicator`]: 同一进程内的多个线程各扮演一个 rank，
//!   通过 mpsc 通道交换消息。每次集合操作有递增的轮次号，
//!   先到的下一轮消息会暂存。

use fv_foundation::{FvError, FvResult};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

/// 等待对端消息的超时
const RECEIVE_TIMEOUT: Duration = Duration::from_secs(60);

/// 通信器
pub trait Communicator: Send + Sync {
    /// 本进程编号
    fn rank(&self) -> usize;

    /// 进程数
    fn size(&self) -> usize;

    /// 收集所有进程的数据，按 rank 排列
    fn all_gather_bytes(&self, data: Vec<u8>) -> FvResult<Vec<Vec<u8>>>;

    /// 全交换：`data[p]` 发给 rank p，返回从每个 rank 收到的数据
    fn all_to_all_bytes(&self, data: Vec<Vec<u8>>) -> FvResult<Vec<Vec<u8>>>;

    /// 同步点
    fn barrier(&self) -> FvResult<()> {
        self.all_gather_bytes(Vec::new()).map(|_| ())
    }

    /// 是否为单进程
    fn is_serial(&self) -> bool {
        self.size() == 1
    }
}

/// 类型化集合操作
pub trait CommunicatorExt {
    /// 收集每个进程的一个值
    fn all_gather<T: Serialize + DeserializeOwned>(&self, value: &T) -> FvResult<Vec<T>>;

    /// 全交换，`send.len()` 必须等于进程数
    fn all_to_all<T: Serialize + DeserializeOwned>(&self, send: &[T]) -> FvResult<Vec<T>>;

    /// 全局求和
    fn sum(&self, value: f64) -> FvResult<f64> {
        Ok(self.all_gather(&value)?.into_iter().sum())
    }
}

impl<C: Communicator + ?Sized> CommunicatorExt for C {
    fn all_gather<T: Serialize + DeserializeOwned>(&self, value: &T) -> FvResult<Vec<T>> {
        let bytes = bincode::serialize(value)?;
        self.all_gather_bytes(bytes)?
            .iter()
            .map(|b| Ok(bincode::deserialize(b)?))
            .collect()
    }

    fn all_to_all<T: Serialize + DeserializeOwned>(&self, send: &[T]) -> FvResult<Vec<T>> {
        FvError::check_size("all_to_all send buffers", self.size(), send.len())?;
        let bytes = send
            .iter()
            .map(|v| Ok(bincode::serialize(v)?))
            .collect::<FvResult<Vec<_>>>()?;
        self.all_to_all_bytes(bytes)?
            .iter()
            .map(|b| Ok(bincode::deserialize(b)?))
            .collect()
    }
}

// ============================================================================
// 单进程
// ============================================================================

/// 单进程通信器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialCommunicator;

impl Communicator for SerialCommunicator {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn all_gather_bytes(&self, data: Vec<u8>) -> FvResult<Vec<Vec<u8>>> {
        Ok(vec![data])
    }

    fn all_to_all_bytes(&self, data: Vec<Vec<u8>>) -> FvResult<Vec<Vec<u8>>> {
        FvError::check_size("all_to_all send buffers", 1, data.len())?;
        Ok(data)
    }
}

// ============================================================================
// 线程
// ============================================================================

#[derive(Debug)]
struct Message {
    round: u64,
    from: usize,
    payload: Vec<u8>,
}

/// 线程通信器，每个 rank 一个实例
#[derive(Debug)]
pub struct ThreadCommunicator {
    rank: usize,
    senders: Vec<Sender<Message>>,
    receiver: Mutex<Receiver<Message>>,
    pending: Mutex<Vec<Message>>,
    round: AtomicU64,
}

impl ThreadCommunicator {
    /// 创建 `size` 个互联的通信器，第 i 个的 rank 为 i
    pub fn create(size: usize) -> Vec<ThreadCommunicator> {
        let (senders, receivers): (Vec<_>, Vec<_>) = (0..size).map(|_| channel()).unzip();
        receivers
            .into_iter()
            .enumerate()
            .map(|(rank, receiver)| ThreadCommunicator {
                rank,
                senders: senders.clone(),
                receiver: Mutex::new(receiver),
                pending: Mutex::new(Vec::new()),
                round: AtomicU64::new(0),
            })
            .collect()
    }

    fn send(&self, to: usize, round: u64, payload: Vec<u8>) -> FvResult<()> {
        self.senders[to]
            .send(Message {
                round,
                from: self.rank,
                payload,
            })
            .map_err(|_| FvError::communication(format!("rank {} 已断开", to)))
    }

    /// 收齐本轮来自所有 rank 的消息
    fn collect_round(&self, round: u64) -> FvResult<Vec<Vec<u8>>> {
        let size = self.size();
        let mut slots: Vec<Option<Vec<u8>>> = vec![None; size];
        let mut received = 0;

        {
            let mut pending = self.pending.lock();
            let mut i = 0;
            while i < pending.len() {
                if pending[i].round == round {
                    let msg = pending.swap_remove(i);
                    slots[msg.from] = Some(msg.payload);
                    received += 1;
                } else {
                    i += 1;
                }
            }
        }

        let receiver = self.receiver.lock();
        while received < size {
            let msg = receiver.recv_timeout(RECEIVE_TIMEOUT).map_err(|e| {
                FvError::communication(format!(
                    "rank {} 第 {} 轮接收失败: {}",
                    self.rank, round, e
                ))
            })?;
            if msg.round == round {
                if slots[msg.from].is_some() {
                    return Err(FvError::communication(format!(
                        "rank {} 第 {} 轮收到 rank {} 的重复消息",
                        self.rank, round, msg.from
                    )));
                }
                slots[msg.from] = Some(msg.payload);
                received += 1;
            } else {
                self.pending.lock().push(msg);
            }
        }

        slots
            .into_iter()
            .map(|s| s.ok_or_else(|| FvError::internal("通信轮次不完整")))
            .collect()
    }
}

impl Communicator for ThreadCommunicator {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.senders.len()
    }

    fn all_gather_bytes(&self, data: Vec<u8>) -> FvResult<Vec<Vec<u8>>> {
        let round = self.round.fetch_add(1, Ordering::SeqCst);
        for to in 0..self.size() {
            self.send(to, round, data.clone())?;
        }
        self.collect_round(round)
    }

    fn all_to_all_bytes(&self, data: Vec<Vec<u8>>) -> FvResult<Vec<Vec<u8>>> {
        FvError::check_size("all_to_all send buffers", self.size(), data.len())?;
        let round = self.round.fetch_add(1, Ordering::SeqCst);
        for (to, payload) in data.into_iter().enumerate() {
            self.send(to, round, payload)?;
        }
        self.collect_round(round)
    }
}

/// 以 `size` 个线程运行 `f`，按 rank 返回结果
pub fn run_threaded<R, F>(size: usize, f: F) -> Vec<FvResult<R>>
where
    R: Send,
    F: Fn(&ThreadCommunicator) -> FvResult<R> + Sync,
{
    let comms = ThreadCommunicator::create(size);
    std::thread::scope(|scope| {
        let handles: Vec<_> = comms
            .iter()
            .map(|comm| {
                let f = &f;
                scope.spawn(move || f(comm))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join()
                    .unwrap_or_else(|_| Err(FvError::communication("工作线程异常退出")))
            })
            .collect()
    })
}
