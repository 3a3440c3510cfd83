//! 仿真核心模块
//!
//! 时隙时钟、仿真参数与流量 trace 读取。驱动循环本身在 `net::Network`。

// 子模块声明
mod config;
mod time;
mod trace;

// 重新导出公共接口
pub use config::{HostConfig, SimConfig, SwitchConfig};
pub use time::Timeslot;
pub use trace::{FlowRow, FlowTrace, parse_row};
