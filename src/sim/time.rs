//! 仿真时间类型
//!
//! 仿真以离散时隙推进，时间就是一个单调递增的整数计数器。

use std::fmt;

/// 仿真时隙。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timeslot(pub u64);

impl Timeslot {
    pub const ZERO: Timeslot = Timeslot(0);

    /// 下一个时隙
    pub fn next(self) -> Timeslot {
        Timeslot(self.0.saturating_add(1))
    }

    /// 向后偏移若干时隙
    pub fn after(self, slots: u64) -> Timeslot {
        Timeslot(self.0.saturating_add(slots))
    }

    /// 距离 `earlier` 经过的时隙数（`earlier` 在未来时返回 0）
    pub fn since(self, earlier: Timeslot) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
