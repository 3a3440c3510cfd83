//! 虚拟输出队列（VOQ）表
//!
//! 每个输出端口每个优先级一条 FIFO，外加占用计数：
//! `occupancy[port][class]`、`port_len[port]` 与 `total_usage`。
//! 出队按严格优先级；驱逐总是从某条队列的尾部摘掉最新到达的包。
//!
//! 端口下标从 0 开始。

use std::collections::VecDeque;

use crate::net::{Packet, PriorityClass};
use crate::sim::Timeslot;

/// 排队中的包及其进入本交换机的时隙
#[derive(Debug, Clone)]
pub struct Queued {
    pub pkt: Packet,
    pub arrival: Timeslot,
}

#[derive(Debug)]
pub struct VoqTable {
    queues: Vec<[VecDeque<Queued>; PriorityClass::COUNT]>,
    occupancy: Vec<[usize; PriorityClass::COUNT]>,
    port_len: Vec<usize>,
    total_usage: usize,
    capacity: usize,
    ecn_threshold: usize,
}

impl VoqTable {
    pub fn new(ports: usize, capacity: usize, ecn_threshold: usize) -> Self {
        Self {
            queues: (0..ports).map(|_| Default::default()).collect(),
            occupancy: vec![[0; PriorityClass::COUNT]; ports],
            port_len: vec![0; ports],
            total_usage: 0,
            capacity,
            ecn_threshold,
        }
    }

    pub fn ports(&self) -> usize {
        self.port_len.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn total_usage(&self) -> usize {
        self.total_usage
    }

    /// 剩余空间（包）
    pub fn free(&self) -> usize {
        self.capacity.saturating_sub(self.total_usage)
    }

    pub fn is_full(&self) -> bool {
        self.total_usage >= self.capacity
    }

    pub fn occupancy(&self, port: usize, class: PriorityClass) -> usize {
        self.occupancy[port][class.index()]
    }

    pub fn port_len(&self, port: usize) -> usize {
        self.port_len[port]
    }

    /// 入队并在端口排队数超过 K 时打 ECN 标记。
    ///
    /// 是否有空间由调用方（缓冲策略）判断。
    pub fn enqueue(&mut self, port: usize, mut pkt: Packet, now: Timeslot) {
        let class = pkt.priority.index();
        self.total_usage += 1;
        self.port_len[port] += 1;
        self.occupancy[port][class] += 1;
        if self.port_len[port] > self.ecn_threshold {
            pkt.ecn = true;
        }
        self.queues[port][class].push_back(Queued { pkt, arrival: now });
    }

    /// 严格优先级出队：取最高优先级非空队列的队头
    pub fn dequeue(&mut self, port: usize) -> Option<Packet> {
        let class = (0..PriorityClass::COUNT).find(|&c| !self.queues[port][c].is_empty())?;
        let q = self.queues[port][class].pop_front()?;
        self.release(port, class);
        Some(q.pkt)
    }

    /// 驱逐 `port` 上 `class` 队列的队尾包，标记为 tombstone 后交还调用方计数。
    pub fn evict_tail(&mut self, port: usize, class: PriorityClass) -> Option<Packet> {
        let mut q = self.queues[port][class.index()].pop_back()?;
        self.release(port, class.index());
        q.pkt.tombstone = true;
        Some(q.pkt)
    }

    /// 队尾（最新到达）包的到达时隙
    pub fn tail_arrival(&self, port: usize, class: PriorityClass) -> Option<Timeslot> {
        self.queues[port][class.index()].back().map(|q| q.arrival)
    }

    /// 在 `port` 上是否存在比 `class` 更不紧急且非空的队列
    pub fn has_less_urgent(&self, port: usize, class: PriorityClass) -> bool {
        self.occupancy[port][class.index() + 1..]
            .iter()
            .any(|&n| n > 0)
    }

    /// 排队最多的端口（并列取下标最小者）
    pub fn largest_port(&self) -> usize {
        let mut best = 0;
        for (port, &len) in self.port_len.iter().enumerate() {
            if len > self.port_len[best] {
                best = port;
            }
        }
        best
    }

    /// 检查计数守恒：total_usage == Σ port_len == Σ occupancy == Σ 队列长度
    pub fn check(&self) -> Result<(), String> {
        let mut sum = 0;
        for port in 0..self.ports() {
            let mut port_sum = 0;
            for class in 0..PriorityClass::COUNT {
                let n = self.occupancy[port][class];
                let actual = self.queues[port][class].len();
                if n != actual {
                    return Err(format!(
                        "occupancy[{port}][{class}] = {n} but queue holds {actual}"
                    ));
                }
                port_sum += n;
            }
            if port_sum != self.port_len[port] {
                return Err(format!(
                    "port {port} length {} != per-class sum {port_sum}",
                    self.port_len[port]
                ));
            }
            sum += port_sum;
        }
        if sum != self.total_usage {
            return Err(format!("total_usage {} != occupancy sum {sum}", self.total_usage));
        }
        Ok(())
    }

    fn release(&mut self, port: usize, class: usize) {
        // 计数与队列同步增减，这里不会下溢；check() 负责兜底
        self.total_usage = self.total_usage.saturating_sub(1);
        self.port_len[port] = self.port_len[port].saturating_sub(1);
        self.occupancy[port][class] = self.occupancy[port][class].saturating_sub(1);
    }
}
