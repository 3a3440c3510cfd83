//! 传输层/协议模块
//!
//! 主机侧的流状态：DCTCP 发送端窗口、接收端交付游标与乱序跟踪。

pub mod dctcp;
pub mod receiver;

pub use dctcp::{AckOutOfWindow, AckOutcome, SendFlowState};
pub use receiver::{RecvFlowState, ReorderTracker};
