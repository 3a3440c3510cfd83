//! 网络模拟模块
//!
//! 此模块包含网络模拟的核心组件：标识符、数据包、链路、主机、交换机、
//! 路由以及按时隙推进的 `Network` 驱动器。

// 子模块声明
mod host;
mod id;
mod link;
mod network;
mod packet;
mod records;
mod routing;
mod stats;
mod switch;

// 重新导出公共接口
pub use host::Host;
pub use id::{FlowKey, HostAddr, LinkId, NodeId, ParseIdError, SwitchId, Tier};
pub use link::Link;
pub use network::{FabricParams, LogSinks, Network, REORDER_SEPARATOR, RunState};
pub use packet::{Packet, PriorityClass, RouteHop};
pub use records::{DropRecord, FlowRecord, ReorderEvent};
pub use routing::{Router, flow_hash_mod};
pub use stats::{RunSummary, Stats, StepReport, Termination};
pub use switch::Switch;
