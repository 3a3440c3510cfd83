//! 主机：传输层引擎
//!
//! 每个时隙按固定顺序执行三步：
//!
//! 1. **发送**：在轮询列表上从持久指针开始找第一个可发送的流，至多发一个包。
//!    遇到 RTO 已到期的流先做 go-back-N 再重新检查同一条流。
//! 2. **处理 ACK**：取空本主机的 ACK 信箱，推进累计确认号与 DCTCP 窗口；
//!    流被完全确认后释放发送端状态并从轮询列表移除。
//! 3. **接收**：从链路取至多一个包，按序交付并回 ACK；乱序到达只记录乱序事件。
//!
//! 目的地址不是本机的包视为路由错误：记日志、计数，本时隙剩余处理跳过。

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::Write;

use tracing::{debug, trace, warn};

use super::id::{FlowKey, HostAddr, LinkId, NodeId};
use super::link::Link;
use super::packet::{Packet, PriorityClass};
use super::records::{FlowRecord, ReorderEvent};
use super::stats::{Stats, StepReport};
use crate::error::{Result, SimError};
use crate::proto::{AckOutOfWindow, AckOutcome, RecvFlowState, ReorderTracker, SendFlowState};
use crate::sim::{HostConfig, Timeslot};

pub struct Host {
    addr: HostAddr,
    link: Option<LinkId>,
    cfg: HostConfig,
    send_flows: HashMap<FlowKey, SendFlowState>,
    /// 轮询顺序（按注入顺序）
    rr: Vec<FlowKey>,
    rr_ptr: usize,
    recv_flows: HashMap<FlowKey, RecvFlowState>,
    reorder: HashMap<FlowKey, ReorderTracker>,
    packet_log: Option<Box<dyn Write + Send>>,
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("addr", &self.addr)
            .field("link", &self.link)
            .field("send_flows", &self.send_flows.len())
            .field("recv_flows", &self.recv_flows.len())
            .field("rr_ptr", &self.rr_ptr)
            .finish()
    }
}

impl Host {
    pub fn new(addr: HostAddr, cfg: HostConfig) -> Self {
        Self {
            addr,
            link: None,
            cfg,
            send_flows: HashMap::new(),
            rr: Vec::new(),
            rr_ptr: 0,
            recv_flows: HashMap::new(),
            reorder: HashMap::new(),
            packet_log: None,
        }
    }

    pub fn addr(&self) -> HostAddr {
        self.addr
    }

    pub fn node_id(&self) -> NodeId {
        NodeId::Host(self.addr)
    }

    pub fn link(&self) -> Option<LinkId> {
        self.link
    }

    /// 接到链路上（主机只有一个端口）
    pub fn attach(&mut self, link: LinkId) {
        self.link = Some(link);
    }

    /// 收到的每个包（含 ACK）写一行到这里
    pub fn set_packet_log(&mut self, sink: Box<dyn Write + Send>) {
        self.packet_log = Some(sink);
    }

    /// 注册一条从本机发出的流
    pub fn start_send_flow(&mut self, key: FlowKey, size: u64) -> Result<PriorityClass> {
        if self.send_flows.contains_key(&key) {
            return Err(SimError::DuplicateFlow {
                host: self.addr.to_string(),
                flow: key,
            });
        }
        let priority = PriorityClass::for_flow_size(size, &self.cfg);
        self.send_flows
            .insert(key, SendFlowState::new(size, priority, &self.cfg));
        self.rr.push(key);
        debug!(host = %self.addr, flow = %key, size, %priority, "新发送流");
        Ok(priority)
    }

    /// 注册一条发往本机的流
    pub fn expect_recv_flow(&mut self, key: FlowKey, id: u64, size: u64, start: Timeslot) -> Result<()> {
        if self.recv_flows.contains_key(&key) {
            return Err(SimError::DuplicateFlow {
                host: self.addr.to_string(),
                flow: key,
            });
        }
        self.recv_flows
            .insert(key, RecvFlowState::new(id, size, start));
        self.reorder.insert(key, ReorderTracker::default());
        Ok(())
    }

    /// 没有尚未交付完的接收流
    pub fn is_idle(&self) -> bool {
        self.recv_flows.is_empty()
    }

    pub fn send_flow(&self, key: &FlowKey) -> Option<&SendFlowState> {
        self.send_flows.get(key)
    }

    pub fn recv_flow(&self, key: &FlowKey) -> Option<&RecvFlowState> {
        self.recv_flows.get(key)
    }

    pub fn reorder_tracker(&self, key: &FlowKey) -> Option<&ReorderTracker> {
        self.reorder.get(key)
    }

    pub fn active_send_flows(&self) -> usize {
        self.rr.len()
    }

    pub fn flush_log(&mut self) -> Result<()> {
        if let Some(log) = self.packet_log.as_mut() {
            log.flush()?;
        }
        Ok(())
    }

    /// 推进一个时隙：发送 → 处理 ACK → 接收
    #[tracing::instrument(skip(self, links, mailbox, report, stats), fields(host = %self.addr, now = now.0))]
    pub fn step(
        &mut self,
        now: Timeslot,
        links: &mut [Link],
        mailbox: &mut VecDeque<Packet>,
        report: &mut StepReport,
        stats: &mut Stats,
    ) -> Result<()> {
        self.send(now, links, stats)?;
        self.handle_acks(mailbox, stats)?;
        self.receive(now, links, report, stats)
    }

    fn send(&mut self, now: Timeslot, links: &mut [Link], stats: &mut Stats) -> Result<()> {
        let Some(link) = self.link else {
            return Ok(());
        };
        if self.rr.is_empty() {
            return Ok(());
        }

        let mut chosen = None;
        for _ in 0..self.rr.len() {
            let key = self.rr[self.rr_ptr];
            let Some(flow) = self.send_flows.get_mut(&key) else {
                self.rr_ptr = (self.rr_ptr + 1) % self.rr.len();
                continue;
            };
            if !flow.can_send() && flow.rto_expired(now, self.cfg.rto) {
                flow.go_back_n();
                debug!(flow = %key, from = flow.next_seq, "⏰ RTO 到期，go-back-N");
            }
            if flow.can_send() {
                chosen = Some(key);
                break;
            }
            self.rr_ptr = (self.rr_ptr + 1) % self.rr.len();
        }

        let Some(key) = chosen else {
            return Ok(());
        };
        let Some(flow) = self.send_flows.get_mut(&key) else {
            return Ok(());
        };
        let seq = flow.on_sent(now);
        let pkt = Packet::data(self.addr, key.peer, key.sport, key.dport, seq, flow.priority);
        trace!(flow = %key, seq, cwnd = flow.cwnd, in_flight = flow.in_flight, "📤 发送");
        links[link.0].send(pkt, NodeId::Host(self.addr), now)?;
        stats.packets_sent += 1;
        self.rr_ptr = (self.rr_ptr + 1) % self.rr.len();
        Ok(())
    }

    fn handle_acks(&mut self, mailbox: &mut VecDeque<Packet>, stats: &mut Stats) -> Result<()> {
        while let Some(ack) = mailbox.pop_front() {
            self.log_packet(&ack)?;

            let key = ack.ack_key();
            let Some(flow) = self.send_flows.get_mut(&key) else {
                trace!(flow = %key, ack = ack.ack, "已结束流的 ACK，忽略");
                continue;
            };
            match flow.on_ack(ack.ack, ack.ecn) {
                Ok(AckOutcome::Advanced { window_closed }) => {
                    if window_closed {
                        trace!(flow = %key, cwnd = flow.cwnd, alpha = flow.alpha, "窗口更新");
                    }
                }
                Ok(AckOutcome::Duplicate) => {
                    debug!(flow = %key, ack = ack.ack, "重复 ACK，go-back-N");
                }
                Err(AckOutOfWindow { ack, last_acked }) => {
                    return Err(SimError::AckOutOfWindow {
                        host: self.addr.to_string(),
                        flow: key,
                        ack,
                        last_acked,
                    });
                }
            }

            if flow.is_complete() {
                let priority = flow.priority;
                self.finish_send_flow(key);
                match priority {
                    PriorityClass::Bulk => stats.flows_finished_bulk += 1,
                    PriorityClass::Latency => stats.flows_finished_latency += 1,
                    PriorityClass::Middle => {}
                }
                debug!(flow = %key, %priority, "✅ 发送流完成");
            }
        }
        Ok(())
    }

    fn finish_send_flow(&mut self, key: FlowKey) {
        self.send_flows.remove(&key);
        if let Some(pos) = self.rr.iter().position(|k| *k == key) {
            self.rr.remove(pos);
        }
        if self.rr_ptr >= self.rr.len() {
            self.rr_ptr = 0;
        }
    }

    fn receive(
        &mut self,
        now: Timeslot,
        links: &mut [Link],
        report: &mut StepReport,
        stats: &mut Stats,
    ) -> Result<()> {
        let Some(link) = self.link else {
            return Ok(());
        };
        let Some(pkt) = links[link.0].recv(NodeId::Host(self.addr), now) else {
            return Ok(());
        };
        if pkt.dst != self.addr {
            warn!(dst = %pkt.dst, src = %pkt.src, seq = pkt.seq, "路由错误：包送错了主机");
            stats.routing_errors += 1;
            return Ok(());
        }
        self.log_packet(&pkt)?;

        if pkt.ack_flag {
            // ACK 走信箱，不应出现在链路上
            trace!(src = %pkt.src, "链路上收到 ACK，忽略");
            return Ok(());
        }

        let key = pkt.receiver_key();
        let Some(flow) = self.recv_flows.get_mut(&key) else {
            trace!(flow = %key, seq = pkt.seq, "未知或已完成的流，忽略");
            return Ok(());
        };

        if pkt.seq < flow.next_expected {
            trace!(flow = %key, seq = pkt.seq, "过期的重复包");
            return Ok(());
        }

        if pkt.seq > flow.next_expected {
            if self.cfg.dup_ack_on_gap && !flow.dup_ack_sent {
                flow.dup_ack_sent = true;
                report.acks.push(Packet::ack_for(&pkt, flow.next_expected));
            }
            if let Some(tracker) = self.reorder.get_mut(&key)
                && let Some(next_expected) = tracker.observe(pkt.seq)
            {
                report.reorders.push(ReorderEvent {
                    host: self.addr,
                    src: pkt.src,
                    dst: pkt.dst,
                    sport: pkt.sport,
                    dport: pkt.dport,
                    next_expected,
                    seq: pkt.seq,
                    priority: pkt.priority,
                });
                stats.reorder_events += 1;
                trace!(flow = %key, next_expected, seq = pkt.seq, "🔀 乱序到达");
            }
            return Ok(());
        }

        // 按序到达
        if flow.is_last(pkt.seq)
            && let Some(sent) = pkt.first_sent()
        {
            flow.last_pkt_sent = sent;
        }
        report.acks.push(Packet::ack_for(&pkt, pkt.seq + 1));
        if let Some(tracker) = self.reorder.get_mut(&key) {
            tracker.observe(pkt.seq);
        }
        flow.deliver();
        stats.packets_received += 1;

        if flow.is_complete() {
            let record = FlowRecord::completed(flow, &pkt, now, &self.cfg);
            debug!(flow = %key, fct = record.fct(), "✅ 流交付完成");
            self.recv_flows.remove(&key);
            self.reorder.remove(&key);
            stats.flows_completed += 1;
            report.completions.push(record);
        }
        Ok(())
    }

    fn log_packet(&mut self, pkt: &Packet) -> Result<()> {
        if let Some(log) = self.packet_log.as_mut() {
            writeln!(log, "{pkt}\n")?;
        }
        Ok(())
    }
}
