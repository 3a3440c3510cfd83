//! 数据包类型
//!
//! 定义网络数据包、优先级类别以及路径记录。

use std::fmt;

use super::id::{FlowKey, HostAddr, NodeId};
use crate::sim::{HostConfig, Timeslot};

/// 流量优先级类别。数值越小越紧急。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PriorityClass {
    /// 短流（时延敏感）
    Latency = 1,
    Middle = 2,
    /// 长流（bulk）
    Bulk = 3,
}

impl PriorityClass {
    pub const COUNT: usize = 3;
    pub const ALL: [PriorityClass; 3] = [Self::Latency, Self::Middle, Self::Bulk];

    /// VOQ 下标（0 为最高优先级）
    pub fn index(self) -> usize {
        self as usize - 1
    }

    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    /// 按流大小划分静态优先级
    pub fn for_flow_size(size: u64, cfg: &HostConfig) -> Self {
        if size < cfg.short_flow_max {
            Self::Latency
        } else if size > cfg.long_flow_min {
            Self::Bulk
        } else {
            Self::Middle
        }
    }

    /// `self` 是否比 `other` 更紧急
    pub fn more_urgent_than(self, other: Self) -> bool {
        self < other
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// 路径上的一跳：经过的节点及其发出时刻
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteHop {
    pub node: NodeId,
    pub at: Timeslot,
}

/// 网络数据包
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub src: HostAddr,
    pub dst: HostAddr,
    pub sport: u32,
    pub dport: u32,
    pub seq: u64,
    pub ack: u64,
    pub ack_flag: bool,
    pub ecn: bool,
    pub priority: PriorityClass,
    /// 诊断用路径记录
    pub route: Vec<RouteHop>,
    /// 已被逻辑驱逐，不得再转发
    pub tombstone: bool,
}

impl Packet {
    /// 构造数据包
    pub fn data(
        src: HostAddr,
        dst: HostAddr,
        sport: u32,
        dport: u32,
        seq: u64,
        priority: PriorityClass,
    ) -> Self {
        Self {
            src,
            dst,
            sport,
            dport,
            seq,
            ack: 0,
            ack_flag: false,
            ecn: false,
            priority,
            route: Vec::new(),
            tombstone: false,
        }
    }

    /// 为收到的数据包构造 ACK：地址/端口对调，回显 ECN。
    pub fn ack_for(data: &Packet, ack: u64) -> Self {
        Self {
            src: data.dst,
            dst: data.src,
            sport: data.dport,
            dport: data.sport,
            seq: 0,
            ack,
            ack_flag: true,
            ecn: data.ecn,
            priority: data.priority,
            route: Vec::new(),
            tombstone: false,
        }
    }

    /// 数据包在接收端的流键
    pub fn receiver_key(&self) -> FlowKey {
        FlowKey::new(self.src, self.sport, self.dport)
    }

    /// ACK 在原发送端的流键
    pub fn ack_key(&self) -> FlowKey {
        FlowKey::new(self.src, self.dport, self.sport)
    }

    /// 源主机发出该包的时隙
    pub fn first_sent(&self) -> Option<Timeslot> {
        self.route.first().map(|hop| hop.at)
    }

    pub(crate) fn record_hop(&mut self, node: NodeId, at: Timeslot) {
        self.route.push(RouteHop { node, at });
    }
}

/// 主机收包日志的行格式
impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "src: {}, dst: {}, sport: {}, dport: {}, seqNum: {}, ackNum: {}, ackFlag: {}, ecnFlag: {}, route: ",
            self.src,
            self.dst,
            self.sport,
            self.dport,
            self.seq,
            self.ack,
            u8::from(self.ack_flag),
            u8::from(self.ecn),
        )?;
        for (i, hop) in self.route.iter().enumerate() {
            if i > 0 {
                f.write_str("->")?;
            }
            write!(f, "({},{})", hop.node, hop.at)?;
        }
        Ok(())
    }
}
