//! OBM（Overflow Buffer Management）及其 LQD 驱逐变体
//!
//! 缓冲区满时不立即丢弃到达包，而是放进所在输入端口的单槽暂存区，
//! 时隙末尾从当前最拥塞的端口驱逐同等数量的包，再把暂存包放入各自的 VOQ。
//!
//! 两种驱逐方式：
//! - `LowestClass`（OBM）：从最拥塞端口上最不紧急的非空优先级队列队尾驱逐
//! - `Newest`（LQD）：在各优先级队列的队尾中挑到达时隙最大的驱逐，并列取优先级下标小者
//!
//! 被驱逐的包直接从队尾摘除并标记为 tombstone，计数立即扣减。

use crate::net::{Packet, PriorityClass};
use crate::sim::Timeslot;

use super::voq::VoqTable;
use super::{Arrival, BufferPolicy, DropReason, EvictionPass, PolicyKind, Verdict};

/// 驱逐时挑选受害者的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    LowestClass,
    Newest,
}

#[derive(Debug)]
struct Staged {
    pkt: Packet,
    out_port: usize,
}

#[derive(Debug)]
pub struct Obm {
    eviction: Eviction,
    /// 每个输入端口一个暂存槽
    staging: Vec<Option<Staged>>,
    /// 本时隙的最拥塞端口（到达处理前确定）
    congested: usize,
}

impl Obm {
    pub fn new(ports: usize, eviction: Eviction) -> Self {
        Self {
            eviction,
            staging: (0..ports).map(|_| None).collect(),
            congested: 0,
        }
    }

    pub fn congested_port(&self) -> usize {
        self.congested
    }

    /// 暂存槽中的包数
    pub fn staged(&self) -> usize {
        self.staging.iter().filter(|s| s.is_some()).count()
    }

    fn pick_victim(&self, voqs: &VoqTable) -> Option<PriorityClass> {
        let port = self.congested;
        let candidates = PriorityClass::ALL
            .into_iter()
            .filter(|&c| voqs.occupancy(port, c) > 0);
        match self.eviction {
            Eviction::LowestClass => candidates.last(),
            Eviction::Newest => {
                let mut best: Option<(PriorityClass, Timeslot)> = None;
                for class in candidates {
                    let Some(at) = voqs.tail_arrival(port, class) else {
                        continue;
                    };
                    if best.is_none_or(|(_, best_at)| at > best_at) {
                        best = Some((class, at));
                    }
                }
                best.map(|(class, _)| class)
            }
        }
    }

    fn admit_staged(&mut self, slot: usize, voqs: &mut VoqTable, now: Timeslot) -> bool {
        match self.staging[slot].take() {
            Some(Staged { pkt, out_port }) => {
                voqs.enqueue(out_port, pkt, now);
                true
            }
            None => false,
        }
    }
}

impl BufferPolicy for Obm {
    fn kind(&self) -> PolicyKind {
        match self.eviction {
            Eviction::LowestClass => PolicyKind::Obm,
            Eviction::Newest => PolicyKind::Lqd,
        }
    }

    fn begin_slot(&mut self, voqs: &VoqTable) {
        self.congested = voqs.largest_port();
    }

    fn on_arrival(&mut self, arrival: Arrival, voqs: &mut VoqTable, now: Timeslot) -> Verdict {
        let Arrival {
            in_port,
            out_port,
            pkt,
        } = arrival;

        if !voqs.is_full() {
            voqs.enqueue(out_port, pkt, now);
            return Verdict::Admitted;
        }

        // 发往最拥塞端口的包只有在该端口还有更不紧急的包可驱逐时才暂存
        let class = pkt.priority;
        let stageable = out_port != self.congested || voqs.has_less_urgent(out_port, class);
        if !stageable {
            return Verdict::Dropped {
                pkt,
                reason: DropReason::Overflow,
            };
        }

        let occupant = self.staging[in_port]
            .as_ref()
            .map(|staged| staged.pkt.priority);
        match occupant {
            None => {
                self.staging[in_port] = Some(Staged { pkt, out_port });
                Verdict::Staged { displaced: None }
            }
            Some(staged_class) if class.more_urgent_than(staged_class) => {
                let old = self.staging[in_port].replace(Staged { pkt, out_port });
                Verdict::Staged {
                    displaced: old.map(|s| s.pkt),
                }
            }
            Some(_) => Verdict::Dropped {
                pkt,
                reason: DropReason::StagingBusy,
            },
        }
    }

    fn recompute_thresholds(&mut self, _voqs: &VoqTable) {
        // 只有一个全局阈值：总缓冲大小
    }

    fn end_slot(&mut self, voqs: &mut VoqTable, now: Timeslot) -> EvictionPass {
        let mut pass = EvictionPass::default();
        let pending: Vec<usize> = (0..self.staging.len())
            .filter(|&i| self.staging[i].is_some())
            .collect();
        if pending.is_empty() {
            return pass;
        }

        // 出队后可能已有空位，先直接放入
        let mut rest = pending.into_iter();
        while !voqs.is_full() {
            let Some(slot) = rest.next() else {
                break;
            };
            if self.admit_staged(slot, voqs, now) {
                pass.refilled += 1;
            }
        }
        let rest: Vec<usize> = rest.collect();

        // 先驱逐，再放入：避免刚放入的暂存包被当作最新到达者驱逐
        for _ in 0..rest.len() {
            let Some(class) = self.pick_victim(voqs) else {
                break;
            };
            let Some(victim) = voqs.evict_tail(self.congested, class) else {
                break;
            };
            pass.evicted.push(victim);
        }
        for &slot in rest.iter().take(pass.evicted.len()) {
            if self.admit_staged(slot, voqs, now) {
                pass.readmitted += 1;
            }
        }

        pass.still_staged = self.staged();
        pass
    }
}
