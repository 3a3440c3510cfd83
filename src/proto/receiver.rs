//! 接收端流状态与乱序跟踪

use std::collections::BTreeSet;

use crate::sim::Timeslot;

/// 接收端每条流的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecvFlowState {
    pub id: u64,
    pub size: u64,
    /// 按序交付游标：每交付一个包加一，决定 ACK 号
    pub next_expected: u64,
    pub start: Timeslot,
    /// 最后一个包离开源主机的时刻
    pub last_pkt_sent: Timeslot,
    /// 当前空洞是否已经回过重复 ACK
    pub dup_ack_sent: bool,
}

impl RecvFlowState {
    pub fn new(id: u64, size: u64, start: Timeslot) -> Self {
        Self {
            id,
            size,
            next_expected: 0,
            start,
            last_pkt_sent: start,
            dup_ack_sent: false,
        }
    }

    pub fn is_last(&self, seq: u64) -> bool {
        seq + 1 == self.size
    }

    /// 按序交付一个包
    pub fn deliver(&mut self) {
        self.next_expected += 1;
        self.dup_ack_sent = false;
    }

    pub fn is_complete(&self) -> bool {
        self.next_expected == self.size
    }
}

/// 乱序到达跟踪。
///
/// 与交付游标独立：提前到达的序号先记下来，等缺口补上后游标一次跳过它们。
/// 同一个提前到达的序号只计一次乱序事件。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderTracker {
    next_expected: u64,
    early: BTreeSet<u64>,
    events: u64,
}

impl ReorderTracker {
    pub fn next_expected(&self) -> u64 {
        self.next_expected
    }

    /// 累计乱序事件数
    pub fn events(&self) -> u64 {
        self.events
    }

    /// 观察到序号 `seq`。若构成新的乱序事件，返回当时的 `next_expected`。
    pub fn observe(&mut self, seq: u64) -> Option<u64> {
        if seq == self.next_expected {
            self.next_expected += 1;
            while self.early.remove(&self.next_expected) {
                self.next_expected += 1;
            }
            return None;
        }
        if seq < self.next_expected || !self.early.insert(seq) {
            return None;
        }
        self.events += 1;
        Some(self.next_expected)
    }

    pub fn early_arrivals(&self) -> impl Iterator<Item = u64> + '_ {
        self.early.iter().copied()
    }
}
