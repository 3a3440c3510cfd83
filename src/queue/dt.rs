//! DT（Dynamic Threshold）
//!
//! 每个优先级一个阈值 `T[c] = w[c] · (B − usage)`，所有端口共享。

use crate::net::PriorityClass;
use crate::sim::Timeslot;

use super::voq::VoqTable;
use super::{Arrival, BufferPolicy, DropReason, PolicyKind, Verdict};

#[derive(Debug)]
pub struct DynamicThreshold {
    weights: [f64; PriorityClass::COUNT],
    thresholds: [f64; PriorityClass::COUNT],
}

impl DynamicThreshold {
    pub fn new(ports: usize, capacity: usize, weights: [f64; PriorityClass::COUNT]) -> Self {
        let init = capacity as f64 / (ports.max(1) * PriorityClass::COUNT) as f64;
        Self {
            weights,
            thresholds: [init; PriorityClass::COUNT],
        }
    }
}

impl BufferPolicy for DynamicThreshold {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Dt
    }

    fn on_arrival(&mut self, arrival: Arrival, voqs: &mut VoqTable, now: Timeslot) -> Verdict {
        self.recompute_thresholds(voqs);

        let Arrival { out_port, pkt, .. } = arrival;
        let class = pkt.priority;
        let verdict = if voqs.is_full() {
            Verdict::Dropped {
                pkt,
                reason: DropReason::BufferFull,
            }
        } else if (voqs.occupancy(out_port, class) as f64) < self.thresholds[class.index()] {
            voqs.enqueue(out_port, pkt, now);
            Verdict::Admitted
        } else {
            Verdict::Dropped {
                pkt,
                reason: DropReason::Threshold(PolicyKind::Dt),
            }
        };

        self.recompute_thresholds(voqs);
        verdict
    }

    fn recompute_thresholds(&mut self, voqs: &VoqTable) {
        let free = voqs.free() as f64;
        for (t, w) in self.thresholds.iter_mut().zip(self.weights) {
            *t = w * free;
        }
    }

    fn threshold(&self, _port: usize, class: PriorityClass) -> Option<f64> {
        Some(self.thresholds[class.index()])
    }
}
