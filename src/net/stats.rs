//! 统计信息
//!
//! `Stats` 是整次仿真的累计计数；`StepReport` 收集一个实体单步产生的记录，
//! 由 `Network` 统一分发到 ACK 信箱和日志。

use std::fmt;

use super::packet::Packet;
use super::records::{DropRecord, FlowRecord, ReorderEvent};
use crate::sim::Timeslot;

/// 网络统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub packets_sent: u64,
    /// 按序交付的数据包
    pub packets_received: u64,
    /// 发送端完全确认的 bulk 流
    pub flows_finished_bulk: u64,
    /// 发送端完全确认的最高优先级流
    pub flows_finished_latency: u64,
    /// 接收端交付完成的流（任意优先级）
    pub flows_completed: u64,
    pub drops: u64,
    pub reorder_events: u64,
    pub routing_errors: u64,
}

/// 单个主机或交换机在一个时隙内产出的记录
#[derive(Debug, Default)]
pub struct StepReport {
    pub acks: Vec<Packet>,
    pub completions: Vec<FlowRecord>,
    pub reorders: Vec<ReorderEvent>,
    pub drops: Vec<DropRecord>,
}

impl StepReport {
    pub fn is_empty(&self) -> bool {
        self.acks.is_empty()
            && self.completions.is_empty()
            && self.reorders.is_empty()
            && self.drops.is_empty()
    }
}

/// 仿真结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// trace 读完且所有接收端流都已完成
    AllFlowsFinished,
    /// 到达结束时隙
    EndReached,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::AllFlowsFinished => f.write_str("all flows have finished"),
            Termination::EndReached => f.write_str("end timeslot reached"),
        }
    }
}

/// 一次运行的汇总
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub timeslots: Timeslot,
    pub reason: Termination,
    pub stats: Stats,
    /// 按交付包数折算的网络吞吐率
    pub throughput_gbps: f64,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ending simulation as {}.", self.reason)?;
        writeln!(
            f,
            "current timeslot: {} total packets sent: {} total packets received: {} total flows finished: {}",
            self.timeslots,
            self.stats.packets_sent,
            self.stats.packets_received,
            self.stats.flows_finished_bulk,
        )?;
        writeln!(
            f,
            "latency-class flows finished: {} flows completed: {} drops: {} reorder events: {} routing errors: {}",
            self.stats.flows_finished_latency,
            self.stats.flows_completed,
            self.stats.drops,
            self.stats.reorder_events,
            self.stats.routing_errors,
        )?;
        write!(f, "Network throughput: {:.3} Gbps", self.throughput_gbps)
    }
}
