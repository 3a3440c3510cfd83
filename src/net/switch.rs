//! 交换机：缓冲管理引擎
//!
//! 每个时隙：
//! 1. 每个端口按严格优先级出队至多一个包并发上链路；
//! 2. 通知策略新时隙开始（OBM 在这里确定最拥塞端口）；
//! 3. 每个端口从链路收至多一个包，选出端口后交给准入策略；
//! 4. 通知策略时隙结束（OBM/LQD 的驱逐-准入）；
//! 5. 校验占用计数守恒，不守恒即致命错误。
//!
//! 端口号对外从 1 开始，`VoqTable` 内部从 0 开始。

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::id::{LinkId, NodeId, SwitchId};
use super::link::Link;
use super::records::DropRecord;
use super::routing::Router;
use super::stats::{Stats, StepReport};
use crate::error::{Result, SimError};
use crate::queue::{Arrival, BufferPolicy, DropReason, PolicyKind, Verdict, VoqTable, build_policy};
use crate::sim::{SwitchConfig, Timeslot};

#[derive(Debug)]
pub struct Switch {
    id: SwitchId,
    /// 端口号（从 1 开始）→ 链路
    ports: BTreeMap<usize, LinkId>,
    voqs: VoqTable,
    policy: Box<dyn BufferPolicy>,
    router: Router,
    dropped: u64,
    forwarded: u64,
}

impl Switch {
    pub fn new(
        id: SwitchId,
        num_ports: usize,
        router: Router,
        policy: PolicyKind,
        cfg: &SwitchConfig,
    ) -> Self {
        let capacity = cfg.per_port_buffer * num_ports;
        let ecn = cfg.ecn_threshold_for(policy);
        Self {
            id,
            ports: BTreeMap::new(),
            voqs: VoqTable::new(num_ports, capacity, ecn),
            policy: build_policy(policy, num_ports, capacity, cfg),
            router,
            dropped: 0,
            forwarded: 0,
        }
    }

    pub fn id(&self) -> SwitchId {
        self.id
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::Switch(self.id)
    }

    pub fn num_ports(&self) -> usize {
        self.voqs.ports()
    }

    /// 把链路接到 `port`（从 1 开始）
    pub fn attach(&mut self, port: usize, link: LinkId) -> Result<()> {
        if port == 0 || port > self.voqs.ports() {
            return Err(SimError::Topology(format!(
                "port {port} out of range 1..={} on switch {}",
                self.voqs.ports(),
                self.id
            )));
        }
        if let Some(prev) = self.ports.insert(port, link) {
            return Err(SimError::Topology(format!(
                "port {port} on switch {} already linked ({prev:?})",
                self.id
            )));
        }
        Ok(())
    }

    pub fn voqs(&self) -> &VoqTable {
        &self.voqs
    }

    pub fn policy(&self) -> &dyn BufferPolicy {
        self.policy.as_ref()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// 推进一个时隙：出队 → 准入 → 时隙末处理 → 计数校验
    #[tracing::instrument(skip(self, links, report, stats), fields(switch = %self.id, now = now.0))]
    pub fn step(
        &mut self,
        now: Timeslot,
        links: &mut [Link],
        report: &mut StepReport,
        stats: &mut Stats,
    ) -> Result<()> {
        let me = self.node_id();

        for (&port, &link) in &self.ports {
            if let Some(pkt) = self.voqs.dequeue(port - 1) {
                self.policy.on_departure(port - 1, pkt.priority);
                trace!(port, dst = %pkt.dst, seq = pkt.seq, "出队");
                links[link.0].send(pkt, me, now)?;
                self.forwarded += 1;
            }
        }

        self.policy.begin_slot(&self.voqs);

        let inputs: Vec<(usize, LinkId)> = self.ports.iter().map(|(&p, &l)| (p, l)).collect();
        for (port, link) in inputs {
            let Some(pkt) = links[link.0].recv(me, now) else {
                continue;
            };
            let out = self
                .router
                .out_port(&pkt)
                .filter(|p| self.ports.contains_key(p));
            let Some(out) = out else {
                debug!(dst = %pkt.dst, "没有可用出端口");
                self.record_drop(DropReason::NoRoute, report, stats);
                continue;
            };

            let arrival = Arrival {
                in_port: port - 1,
                out_port: out - 1,
                pkt,
            };
            match self.policy.on_arrival(arrival, &mut self.voqs, now) {
                Verdict::Admitted => {}
                Verdict::Staged { displaced } => {
                    trace!(in_port = port, out_port = out, "暂存");
                    if displaced.is_some() {
                        self.record_drop(DropReason::Displaced, report, stats);
                    }
                }
                Verdict::Dropped { pkt, reason } => {
                    trace!(%reason, dst = %pkt.dst, seq = pkt.seq, "丢包");
                    self.record_drop(reason, report, stats);
                }
            }
        }

        let pass = self.policy.end_slot(&mut self.voqs, now);
        if !pass.evicted.is_empty() {
            debug!(
                evicted = pass.evicted.len(),
                refilled = pass.refilled,
                readmitted = pass.readmitted,
                still_staged = pass.still_staged,
                "驱逐-准入"
            );
        }
        for _ in &pass.evicted {
            self.record_drop(DropReason::Evicted, report, stats);
        }

        self.voqs.check().map_err(|detail| SimError::Accounting {
            switch: self.id.to_string(),
            detail,
        })
    }

    fn record_drop(&mut self, reason: DropReason, report: &mut StepReport, stats: &mut Stats) {
        self.dropped += 1;
        stats.drops += 1;
        report.drops.push(DropRecord {
            switch: self.id,
            reason,
            count: self.dropped,
        });
    }
}
