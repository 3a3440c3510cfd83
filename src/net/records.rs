//! 日志记录
//!
//! 流完成、交换机丢包与乱序事件三类记录；`Display` 即各自日志文件里的行格式。

use std::fmt;

use super::id::{HostAddr, SwitchId};
use super::packet::{Packet, PriorityClass};
use crate::proto::RecvFlowState;
use crate::queue::DropReason;
use crate::sim::{HostConfig, Timeslot};

/// 一条流在接收端交付完最后一个包
#[derive(Debug, Clone, PartialEq)]
pub struct FlowRecord {
    pub id: u64,
    pub src: HostAddr,
    pub dst: HostAddr,
    pub sport: u32,
    pub dport: u32,
    pub size: u64,
    pub start: Timeslot,
    pub finish: Timeslot,
    /// 最后一个包离开源主机的时隙
    pub last_sent: Timeslot,
    pub recv_gbps: f64,
    pub send_gbps: f64,
}

impl FlowRecord {
    /// 由接收端流状态和刚交付的最后一个包生成完成记录
    pub fn completed(
        flow: &RecvFlowState,
        last: &Packet,
        finish: Timeslot,
        cfg: &HostConfig,
    ) -> Self {
        let fct = finish.since(flow.start);
        let send_slots = flow.last_pkt_sent.since(flow.start) + 1;
        Self {
            id: flow.id,
            src: last.src,
            dst: last.dst,
            sport: last.sport,
            dport: last.dport,
            size: flow.size,
            start: flow.start,
            finish,
            last_sent: flow.last_pkt_sent,
            recv_gbps: cfg.gbps(flow.size, fct),
            send_gbps: cfg.gbps(flow.size, send_slots),
        }
    }

    /// 流完成时间（时隙）
    pub fn fct(&self) -> u64 {
        self.finish.since(self.start)
    }
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, src: {}, dst: {}, sport: {}, dport: {}, flowsize: {}, starttime: {}, finishtime: {}, fct: {}, recvtput: {:.2} Gbps, sendtput: {:.2} Gbps",
            self.id,
            self.src,
            self.dst,
            self.sport,
            self.dport,
            self.size,
            self.start,
            self.finish,
            self.fct(),
            self.recv_gbps,
            self.send_gbps,
        )
    }
}

/// 交换机丢包/驱逐记录，`count` 为该交换机的累计丢包数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropRecord {
    pub switch: SwitchId,
    pub reason: DropReason,
    pub count: u64,
}

impl fmt::Display for DropRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "switch {} - {} - {}", self.switch, self.reason, self.count)
    }
}

/// 接收端观察到的一次乱序到达
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderEvent {
    pub host: HostAddr,
    pub src: HostAddr,
    pub dst: HostAddr,
    pub sport: u32,
    pub dport: u32,
    pub next_expected: u64,
    pub seq: u64,
    pub priority: PriorityClass,
}

impl fmt::Display for ReorderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{},{}",
            self.host,
            self.src,
            self.dst,
            self.sport,
            self.dport,
            self.next_expected,
            self.seq,
            self.priority
        )
    }
}
