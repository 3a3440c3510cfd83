//! 标识符类型
//!
//! 主机地址、交换机标识、链路标识以及流键。

use std::fmt;
use std::str::FromStr;

/// 主机地址，文本形式为 `h<N>`（N 从 1 开始）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostAddr(pub u32);

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

impl FromStr for HostAddr {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix('h').unwrap_or(s);
        digits
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 0)
            .map(HostAddr)
            .ok_or_else(|| ParseIdError(s.to_string()))
    }
}

/// 交换机层级
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// 机架顶交换机（`t` 前缀）
    Tor,
    /// 汇聚交换机（`a` 前缀）
    Agg,
}

/// 交换机标识，文本形式为 `t<N>` 或 `a<N>`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwitchId {
    pub tier: Tier,
    pub index: u32,
}

impl SwitchId {
    pub fn tor(index: u32) -> Self {
        Self {
            tier: Tier::Tor,
            index,
        }
    }

    pub fn agg(index: u32) -> Self {
        Self {
            tier: Tier::Agg,
            index,
        }
    }
}

impl fmt::Display for SwitchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.tier {
            Tier::Tor => 't',
            Tier::Agg => 'a',
        };
        write!(f, "{prefix}{}", self.index)
    }
}

impl FromStr for SwitchId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseIdError(s.to_string());
        let (tier, digits) = if let Some(rest) = s.strip_prefix('t') {
            (Tier::Tor, rest)
        } else if let Some(rest) = s.strip_prefix('a') {
            (Tier::Agg, rest)
        } else {
            return Err(err());
        };
        let index = digits.parse::<u32>().map_err(|_| err())?;
        if index == 0 {
            return Err(err());
        }
        Ok(Self { tier, index })
    }
}

/// 网络节点标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NodeId {
    Host(HostAddr),
    Switch(SwitchId),
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeId::Host(h) => h.fmt(f),
            NodeId::Switch(s) => s.fmt(f),
        }
    }
}

impl FromStr for NodeId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.starts_with('h') {
            s.parse().map(NodeId::Host)
        } else {
            s.parse().map(NodeId::Switch)
        }
    }
}

impl From<HostAddr> for NodeId {
    fn from(h: HostAddr) -> Self {
        NodeId::Host(h)
    }
}

impl From<SwitchId> for NodeId {
    fn from(s: SwitchId) -> Self {
        NodeId::Switch(s)
    }
}

/// 链路标识（`Network` 内链路数组下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub usize);

/// 流键：`(对端地址, 源端口, 目的端口)`。
///
/// 同一条流在发送端以目的地址为对端，在接收端以源地址为对端。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowKey {
    pub peer: HostAddr,
    pub sport: u32,
    pub dport: u32,
}

impl FlowKey {
    pub fn new(peer: HostAddr, sport: u32, dport: u32) -> Self {
        Self { peer, sport, dport }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.peer, self.sport, self.dport)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed node identifier `{0}`")]
pub struct ParseIdError(pub String);
