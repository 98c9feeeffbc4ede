// crates/fv_core/src/parallel/mod.rs

//! 并行通信
//!
//! 单进程时所有操作退化为本地拷贝。多 rank 的实现以线程模拟进程，
//! 消息用 bincode 编码。

pub mod communicator;
pub mod distribution_map;

pub use communicator::{
    run_threaded, Communicator, CommunicatorExt, SerialCommunicator, ThreadCommunicator,
};
pub use distribution_map::DistributionMap;
