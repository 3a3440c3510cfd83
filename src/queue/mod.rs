//! 交换机缓冲管理
//!
//! `VoqTable` 保存每端口每优先级的虚拟输出队列与占用计数；
//! `BufferPolicy` 是可替换的准入策略（DT / ABM / OBM / LQD）。
//! 出队调度（严格优先级）与 ECN 标记对所有策略相同，不属于策略的一部分。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::net::{Packet, PriorityClass};
use crate::sim::{SwitchConfig, Timeslot};

mod abm;
mod dt;
mod obm;
mod voq;

pub use abm::Abm;
pub use dt::DynamicThreshold;
pub use obm::{Eviction, Obm};
pub use voq::{Queued, VoqTable};

/// 缓冲管理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Dt,
    Abm,
    Obm,
    Lqd,
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyKind::Dt => "dt",
            PolicyKind::Abm => "abm",
            PolicyKind::Obm => "obm",
            PolicyKind::Lqd => "lqd",
        })
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dt" => Ok(PolicyKind::Dt),
            "abm" => Ok(PolicyKind::Abm),
            "obm" => Ok(PolicyKind::Obm),
            "lqd" => Ok(PolicyKind::Lqd),
            other => Err(format!("unknown buffer policy `{other}`")),
        }
    }
}

/// 丢包原因（写入丢包日志）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 超过策略阈值
    Threshold(PolicyKind),
    /// 总缓冲已满
    BufferFull,
    /// OBM：缓冲满且不满足暂存条件
    Overflow,
    /// OBM：暂存槽被占用且新包不更紧急
    StagingBusy,
    /// OBM：被更紧急的包挤出暂存槽
    Displaced,
    /// OBM/LQD：为暂存包腾空间而被驱逐
    Evicted,
    /// 计算出的出端口不存在或未连线
    NoRoute,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::Threshold(kind) => write!(f, "{kind} drop"),
            DropReason::BufferFull => f.write_str("space constrain drop"),
            DropReason::Overflow => f.write_str("overflow drop"),
            DropReason::StagingBusy => f.write_str("staging busy drop"),
            DropReason::Displaced => f.write_str("staging displaced drop"),
            DropReason::Evicted => f.write_str("evicted"),
            DropReason::NoRoute => f.write_str("no route drop"),
        }
    }
}

/// 一个到达交换机的包（端口下标从 0 开始）
#[derive(Debug)]
pub struct Arrival {
    pub in_port: usize,
    pub out_port: usize,
    pub pkt: Packet,
}

/// 准入判定结果
#[derive(Debug)]
pub enum Verdict {
    Admitted,
    Dropped { pkt: Packet, reason: DropReason },
    /// 进入暂存槽；若挤出了原暂存包则一并交还
    Staged { displaced: Option<Packet> },
}

/// 时隙末尾驱逐-准入一轮的结果
#[derive(Debug, Default)]
pub struct EvictionPass {
    pub evicted: Vec<Packet>,
    /// 直接放入空闲空间的暂存包数
    pub refilled: usize,
    /// 借助驱逐放入的暂存包数（== evicted.len()）
    pub readmitted: usize,
    pub still_staged: usize,
}

/// 准入策略
pub trait BufferPolicy: fmt::Debug + Send {
    fn kind(&self) -> PolicyKind;

    /// 每时隙出队之后、处理到达之前调用
    fn begin_slot(&mut self, _voqs: &VoqTable) {}

    /// 每出队一个包调用一次
    fn on_departure(&mut self, _port: usize, _class: PriorityClass) {}

    /// 对到达包做准入判定；准入时由策略负责入队
    fn on_arrival(&mut self, arrival: Arrival, voqs: &mut VoqTable, now: Timeslot) -> Verdict;

    fn recompute_thresholds(&mut self, voqs: &VoqTable);

    /// 每时隙到达处理完之后调用
    fn end_slot(&mut self, _voqs: &mut VoqTable, _now: Timeslot) -> EvictionPass {
        EvictionPass::default()
    }

    /// 当前阈值；没有按端口/优先级阈值的策略返回 None
    fn threshold(&self, _port: usize, _class: PriorityClass) -> Option<f64> {
        None
    }
}

/// 按策略种类构造准入策略
pub fn build_policy(
    kind: PolicyKind,
    ports: usize,
    capacity: usize,
    cfg: &SwitchConfig,
) -> Box<dyn BufferPolicy> {
    match kind {
        PolicyKind::Dt => Box::new(DynamicThreshold::new(ports, capacity, cfg.dt_weights)),
        PolicyKind::Abm => Box::new(Abm::new(ports, capacity, cfg)),
        PolicyKind::Obm => Box::new(Obm::new(ports, Eviction::LowestClass)),
        PolicyKind::Lqd => Box::new(Obm::new(ports, Eviction::Newest)),
    }
}
