//! 出端口选择（含 ECMP）
//!
//! 两层拓扑下的路由完全由地址结构决定，不需要路由表：
//!
//! - ToR `t<i>` 直连主机 `h((i-1)·hpr + 1) ..= h(i·hpr)`，目的主机在本机架时
//!   直接走对应的下行端口 `dst − (i−1)·hpr`；
//! - 否则对流四元组做 sha256，按上行端口数取模，落在 `hpr+1 ..= num_tor_ports`；
//! - Agg `a<j>` 的端口 `r` 连到 `t<r>`，因此出端口是 `(dst − 1) / hpr + 1`。
//!
//! 端口号从 1 开始。哈希是确定性的，同一条流总是走同一个上行端口。

use sha2::{Digest, Sha256};

use super::id::{SwitchId, Tier};
use super::packet::Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
    switch: SwitchId,
    hosts_per_rack: u32,
    num_tor_ports: u32,
}

impl Router {
    pub fn new(switch: SwitchId, hosts_per_rack: u32, num_tor_ports: u32) -> Self {
        Self {
            switch,
            hosts_per_rack,
            num_tor_ports,
        }
    }

    /// 计算 `pkt` 的出端口；拓扑参数无法给出端口时返回 None。
    pub fn out_port(&self, pkt: &Packet) -> Option<usize> {
        let hpr = self.hosts_per_rack;
        if hpr == 0 {
            return None;
        }
        let dst = pkt.dst.0;
        match self.switch.tier {
            Tier::Tor => {
                let base = self.switch.index.checked_sub(1)? * hpr;
                if dst > base && dst <= base + hpr {
                    Some((dst - base) as usize)
                } else {
                    self.ecmp(pkt)
                }
            }
            Tier::Agg => Some((dst.saturating_sub(1) / hpr + 1) as usize),
        }
    }

    /// 在上行端口之间做等价多路径选择
    pub fn ecmp(&self, pkt: &Packet) -> Option<usize> {
        let uplinks = self.num_tor_ports.checked_sub(self.hosts_per_rack)?;
        if uplinks == 0 {
            return None;
        }
        let offset = flow_hash_mod(pkt, uplinks as u128);
        Some(offset as usize + self.hosts_per_rack as usize + 1)
    }
}

/// `sha256("<src><dst><sport><dport>")` 视为大端大整数后对 `m` 取模
pub fn flow_hash_mod(pkt: &Packet, m: u128) -> u128 {
    let flow_id = format!("{}{}{}{}", pkt.src, pkt.dst, pkt.sport, pkt.dport);
    let digest = Sha256::digest(flow_id.as_bytes());
    digest
        .iter()
        .fold(0u128, |acc, &byte| (acc * 256 + byte as u128) % m)
}
