//! 链路类型
//!
//! 一条链路连接两个端点，每个方向各是一个固定传播时延的 FIFO 通道。
//! 链路内部不丢包也不乱序。

use std::collections::VecDeque;

use super::id::{LinkId, NodeId};
use super::packet::Packet;
use crate::error::{Result, SimError};
use crate::sim::Timeslot;

#[derive(Debug)]
struct InFlight {
    ready_at: Timeslot,
    pkt: Packet,
}

/// 双向链路
#[derive(Debug)]
pub struct Link {
    pub id: LinkId,
    pub a: NodeId,
    pub b: NodeId,
    pub delay: u64,
    a_to_b: VecDeque<InFlight>,
    b_to_a: VecDeque<InFlight>,
}

impl Link {
    /// 创建新链路
    pub fn new(id: LinkId, a: NodeId, b: NodeId, delay: u64) -> Self {
        Self {
            id,
            a,
            b,
            delay,
            a_to_b: VecDeque::new(),
            b_to_a: VecDeque::new(),
        }
    }

    /// `from` 在 `now` 时隙把包发上链路，另一端在 `now + delay` 起可取走。
    pub fn send(&mut self, mut pkt: Packet, from: NodeId, now: Timeslot) -> Result<()> {
        pkt.record_hop(from, now);
        let entry = InFlight {
            ready_at: now.after(self.delay),
            pkt,
        };
        if from == self.a {
            self.a_to_b.push_back(entry);
        } else if from == self.b {
            self.b_to_a.push_back(entry);
        } else {
            return Err(self.not_an_endpoint(from));
        }
        Ok(())
    }

    /// `at` 在 `now` 时隙从链路上取一个已到达的包（每方向每时隙至多一个）。
    pub fn recv(&mut self, at: NodeId, now: Timeslot) -> Option<Packet> {
        let chan = if at == self.b {
            &mut self.a_to_b
        } else if at == self.a {
            &mut self.b_to_a
        } else {
            return None;
        };
        if chan.front()?.ready_at > now {
            return None;
        }
        chan.pop_front().map(|e| e.pkt)
    }

    /// 另一端
    pub fn peer_of(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    /// 两个方向上尚未取走的包数
    pub fn in_flight(&self) -> usize {
        self.a_to_b.len() + self.b_to_a.len()
    }

    fn not_an_endpoint(&self, node: NodeId) -> SimError {
        SimError::NotAnEndpoint {
            node: node.to_string(),
            link: self.id.0,
        }
    }
}
