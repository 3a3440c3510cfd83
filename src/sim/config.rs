//! 仿真参数
//!
//! 所有原本散落在各组件里的常量（RTO、ECN 阈值、缓冲区权重……）集中在这里，
//! 由 `Network` 在构建主机/交换机时传入。支持从 JSON 部分覆盖。

use serde::{Deserialize, Serialize};

use crate::queue::PolicyKind;

/// 主机（传输层）参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// 超时重传阈值（时隙）
    pub rto: u64,
    /// 初始拥塞窗口（包）
    pub init_cwnd: u64,
    /// 初始 DCTCP alpha
    pub init_alpha: f64,
    /// 流大小 < 该值 => 最高优先级
    pub short_flow_max: u64,
    /// 流大小 > 该值 => bulk 优先级
    pub long_flow_min: u64,
    /// 乱序到达时是否回一个重复 ACK（每个空洞只回一次）
    pub dup_ack_on_gap: bool,
    /// 以下两项只用于吞吐率换算
    pub packet_bytes: u64,
    pub timeslot_ns: f64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            rto: 1000,
            init_cwnd: 20,
            init_alpha: 0.0,
            short_flow_max: 100,
            long_flow_min: 1000,
            dup_ack_on_gap: false,
            packet_bytes: 1500,
            // 1500B @ 100Gbps
            timeslot_ns: 120.0,
        }
    }
}

impl HostConfig {
    /// `packets` 个包在 `slots` 个时隙内传完，换算成 Gbps
    pub fn gbps(&self, packets: u64, slots: u64) -> f64 {
        let bits = packets as f64 * self.packet_bytes as f64 * 8.0;
        bits / (slots.max(1) as f64 * self.timeslot_ns)
    }
}

/// 交换机缓冲管理参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchConfig {
    /// 每端口分摊的缓冲（包）；总缓冲 = per_port_buffer * 端口数
    pub per_port_buffer: usize,
    /// ECN 标记阈值 K；None 时使用策略默认值
    pub ecn_threshold: Option<usize>,
    pub dt_weights: [f64; 3],
    pub abm_weights: [f64; 3],
    /// 端口累计出队达到该数量后重算带宽份额
    pub abm_batch: u64,
    /// 某优先级在一个批次中出队少于该值时份额取下限
    pub abm_min_class_departures: u64,
    pub abm_floor_share: f64,
    /// 占用 >= 比例 * 阈值 视为拥塞端口
    pub abm_congested_fraction: f64,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            per_port_buffer: 5,
            ecn_threshold: None,
            dt_weights: [8.0, 6.0, 4.0],
            abm_weights: [2.0, 1.0, 0.5],
            abm_batch: 100,
            abm_min_class_departures: 30,
            abm_floor_share: 1.0 / 3.0,
            abm_congested_fraction: 0.9,
        }
    }
}

impl SwitchConfig {
    pub fn ecn_threshold_for(&self, policy: PolicyKind) -> usize {
        self.ecn_threshold.unwrap_or(match policy {
            PolicyKind::Abm | PolicyKind::Lqd => 25,
            PolicyKind::Dt | PolicyKind::Obm => 30,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub host: HostConfig,
    pub switch: SwitchConfig,
    /// 链路单向传播时延（时隙）
    pub link_delay: u64,
    /// 每隔多少时隙打印一次进度
    pub progress_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            host: HostConfig::default(),
            switch: SwitchConfig::default(),
            link_delay: 1,
            progress_interval: 100,
        }
    }
}
