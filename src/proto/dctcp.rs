//! DCTCP（简化版）发送端状态
//!
//! 以包为单位的窗口拥塞控制：
//! - 每收齐一个窗口的 ACK，按 ECN 标记比例 F 更新窗口：
//!   F = 0 时窗口 +1；否则 alpha = 0.25·alpha + 0.75·F，cwnd = ceil(cwnd·(1 − alpha/2))
//! - 超时或重复 ACK 触发 go-back-N：发送指针回退到累计确认号
//!
//! 注意：没有慢启动/快速恢复，窗口增长是每窗口 +1。

use crate::net::PriorityClass;
use crate::sim::{HostConfig, Timeslot};

/// 处理一个 ACK 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// 累计确认号前进了一格；`window_closed` 表示本 ACK 收齐了一个窗口
    Advanced { window_closed: bool },
    /// 重复 ACK，已执行 go-back-N
    Duplicate,
}

/// ACK 号既不是累计确认号也不是累计确认号 + 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckOutOfWindow {
    pub ack: u64,
    pub last_acked: u64,
}

/// 发送端每条流的状态
#[derive(Debug, Clone, PartialEq)]
pub struct SendFlowState {
    /// 流大小（包）
    pub size: u64,
    pub next_seq: u64,
    /// 累计确认号
    pub last_acked: u64,
    /// 上次发送时刻（RTO 计时起点）
    pub last_send: Timeslot,
    pub cwnd: u64,
    pub alpha: f64,
    pub in_flight: u64,
    pub acks_in_window: u64,
    pub ecn_acks_in_window: u64,
    pub priority: PriorityClass,
}

impl SendFlowState {
    pub fn new(size: u64, priority: PriorityClass, cfg: &HostConfig) -> Self {
        Self {
            size,
            next_seq: 0,
            last_acked: 0,
            last_send: Timeslot::ZERO,
            cwnd: cfg.init_cwnd.max(1),
            alpha: cfg.init_alpha.clamp(0.0, 1.0),
            in_flight: 0,
            acks_in_window: 0,
            ecn_acks_in_window: 0,
            priority,
        }
    }

    /// 窗口未满且还有数据没发
    pub fn can_send(&self) -> bool {
        self.in_flight < self.cwnd && self.next_seq < self.size
    }

    pub fn rto_expired(&self, now: Timeslot, rto: u64) -> bool {
        now.since(self.last_send) >= rto
    }

    /// go-back-N：从累计确认号开始重发
    pub fn go_back_n(&mut self) {
        self.next_seq = self.last_acked;
        self.in_flight = self.acks_in_window;
    }

    /// 记录发出一个包，返回其序号
    pub fn on_sent(&mut self, now: Timeslot) -> u64 {
        if self.in_flight == 0 {
            self.acks_in_window = 0;
            self.ecn_acks_in_window = 0;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.last_send = now;
        self.in_flight += 1;
        seq
    }

    pub fn on_ack(&mut self, ack: u64, ecn: bool) -> Result<AckOutcome, AckOutOfWindow> {
        if ack == self.last_acked {
            self.go_back_n();
            return Ok(AckOutcome::Duplicate);
        }
        if ack != self.last_acked + 1 {
            return Err(AckOutOfWindow {
                ack,
                last_acked: self.last_acked,
            });
        }

        self.last_acked = ack;
        // go-back-N 之后迟到的 ACK 可能让计数归零，不允许变成负数
        self.in_flight = self.in_flight.saturating_sub(1);
        self.acks_in_window += 1;
        if ecn {
            self.ecn_acks_in_window += 1;
        }

        let window_closed = self.acks_in_window >= self.cwnd;
        if window_closed {
            self.close_window();
        }
        Ok(AckOutcome::Advanced { window_closed })
    }

    /// 收齐一个窗口后按 DCTCP 规则更新 cwnd/alpha 并清零窗口计数
    pub fn close_window(&mut self) {
        let frac = if self.acks_in_window == 0 {
            0.0
        } else {
            self.ecn_acks_in_window as f64 / self.acks_in_window as f64
        };
        if frac == 0.0 {
            self.cwnd += 1;
        } else {
            self.alpha = (0.25 * self.alpha + 0.75 * frac).clamp(0.0, 1.0);
            let shrunk = (self.cwnd as f64 * (1.0 - self.alpha / 2.0)).ceil() as u64;
            self.cwnd = shrunk.max(1);
        }
        self.acks_in_window = 0;
        self.ecn_acks_in_window = 0;
    }

    pub fn is_complete(&self) -> bool {
        self.last_acked == self.size
    }
}
