//! 错误类型
//!
//! 仿真中所有致命错误的统一出口。缓冲区溢出不是错误（由丢包记录表达），
//! 主机上的路由错误也只记日志不中断仿真。

use std::io;

use thiserror::Error;

use crate::net::FlowKey;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid topology descriptor: {0}")]
    Json(#[from] serde_json::Error),

    /// 流量 trace 的某一行格式不对（字段数 != 7、整数解析失败等）
    #[error("wrong flowtrace file format at line {line}: {reason}")]
    Trace { line: usize, reason: String },

    #[error("invalid topology: {0}")]
    Topology(String),

    #[error("unknown host `{0}`")]
    UnknownHost(String),

    #[error("flow {flow} is already active at host {host}")]
    DuplicateFlow { host: String, flow: FlowKey },

    /// ACK 号只允许等于累计确认号或累计确认号 + 1
    #[error("ack {ack} for flow {flow} at host {host} is outside [{last_acked}, {last_acked}+1]")]
    AckOutOfWindow {
        host: String,
        flow: FlowKey,
        ack: u64,
        last_acked: u64,
    },

    /// 交换机占用计数不守恒
    #[error("buffer accounting broken at switch {switch}: {detail}")]
    Accounting { switch: String, detail: String },

    #[error("node {node} is not an endpoint of link {link}")]
    NotAnEndpoint { node: String, link: usize },
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
