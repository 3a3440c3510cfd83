//! ABM（Adaptive Buffer Management）
//!
//! 阈值按端口 × 优先级计算：
//!
//! `T[n][c] = w[c] · (B − usage) · share[n][c] / max(1, active[c])`
//!
//! - `active[c]`：优先级 c 中占用 ≥ 0.9·T 的（拥塞）端口数
//! - `share[n][c]`：端口 n 最近一批出队中优先级 c 的占比；端口累计出队满一批
//!   （默认 100 个）后重算，出队过少的优先级取下限份额
//!
//! 每次准入判定之后重算 active 与全部阈值。

use crate::net::PriorityClass;
use crate::sim::{SwitchConfig, Timeslot};

use super::voq::VoqTable;
use super::{Arrival, BufferPolicy, DropReason, PolicyKind, Verdict};

const C: usize = PriorityClass::COUNT;

#[derive(Debug)]
pub struct Abm {
    weights: [f64; C],
    batch: u64,
    min_class_departures: u64,
    floor_share: f64,
    congested_fraction: f64,
    thresholds: Vec<[f64; C]>,
    departures: Vec<[u64; C]>,
    share: Vec<[f64; C]>,
    active: [usize; C],
}

impl Abm {
    pub fn new(ports: usize, capacity: usize, cfg: &SwitchConfig) -> Self {
        let init = capacity as f64 / (ports.max(1) * C) as f64;
        Self {
            weights: cfg.abm_weights,
            batch: cfg.abm_batch,
            min_class_departures: cfg.abm_min_class_departures,
            floor_share: cfg.abm_floor_share,
            congested_fraction: cfg.abm_congested_fraction,
            thresholds: vec![[init; C]; ports],
            departures: vec![[0; C]; ports],
            share: vec![[1.0; C]; ports],
            active: [0; C],
        }
    }

    pub fn share(&self, port: usize, class: PriorityClass) -> f64 {
        self.share[port][class.index()]
    }

    /// 优先级 `class` 当前的拥塞端口数
    pub fn active_count(&self, class: PriorityClass) -> usize {
        self.active[class.index()]
    }

    fn refresh_share(&mut self, port: usize) {
        let deps = self.departures[port];
        let total: u64 = deps.iter().sum();
        if total < self.batch {
            return;
        }
        for c in 0..C {
            self.share[port][c] = if deps[c] < self.min_class_departures {
                self.floor_share
            } else {
                deps[c] as f64 / total as f64
            };
        }
        self.departures[port] = [0; C];
    }
}

impl BufferPolicy for Abm {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Abm
    }

    fn on_departure(&mut self, port: usize, class: PriorityClass) {
        self.departures[port][class.index()] += 1;
    }

    fn on_arrival(&mut self, arrival: Arrival, voqs: &mut VoqTable, now: Timeslot) -> Verdict {
        let Arrival { out_port, pkt, .. } = arrival;
        let class = pkt.priority;
        let verdict = if voqs.is_full() {
            Verdict::Dropped {
                pkt,
                reason: DropReason::BufferFull,
            }
        } else if (voqs.occupancy(out_port, class) as f64) < self.thresholds[out_port][class.index()]
        {
            voqs.enqueue(out_port, pkt, now);
            Verdict::Admitted
        } else {
            Verdict::Dropped {
                pkt,
                reason: DropReason::Threshold(PolicyKind::Abm),
            }
        };

        self.recompute_thresholds(voqs);
        verdict
    }

    fn recompute_thresholds(&mut self, voqs: &VoqTable) {
        for (c, class) in PriorityClass::ALL.into_iter().enumerate() {
            self.active[c] = (0..voqs.ports())
                .filter(|&n| {
                    voqs.occupancy(n, class) as f64
                        >= self.congested_fraction * self.thresholds[n][c]
                })
                .count();
        }

        let free = voqs.free() as f64;
        for n in 0..voqs.ports() {
            self.refresh_share(n);
            for c in 0..C {
                let contenders = self.active[c].max(1) as f64;
                self.thresholds[n][c] = self.weights[c] * free * self.share[n][c] / contenders;
            }
        }
    }

    fn threshold(&self, port: usize, class: PriorityClass) -> Option<f64> {
        Some(self.thresholds[port][class.index()])
    }
}
