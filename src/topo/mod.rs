//! 拓扑描述与构建
//!
//! 拓扑文件是一个 JSON 对象：
//!
//! ```json
//! {
//!   "num_tor_ports": 4, "num_agg_ports": 2, "hosts_per_rack": 2,
//!   "switches": ["t1", "t2", "a1", "a2"],
//!   "hosts": ["h1", "h2", "h3", "h4"],
//!   "links": [["h1", "t1", 1, 1], ["t1", "a1", 3, 1]],
//!   "policy": "obm",
//!   "config": { "link_delay": 1 }
//! }
//! ```
//!
//! `switches`/`hosts` 也可以写成以名字为键的对象（值被忽略）。
//! `policy` 缺省为 `dt`，`config` 缺省为 `SimConfig::default()`，可只写需要覆盖的字段。

mod two_tier;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use tracing::info;

use crate::error::{Result, SimError};
use crate::net::{FabricParams, HostAddr, Network, NodeId, SwitchId};
use crate::queue::PolicyKind;
use crate::sim::SimConfig;

pub use two_tier::two_tier;

/// 一条链路：`(端点1, 端点2, 端口1, 端口2)`
pub type LinkSpec = (String, String, usize, usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    pub num_tor_ports: u32,
    pub num_agg_ports: u32,
    pub hosts_per_rack: u32,
    #[serde(deserialize_with = "names")]
    pub switches: Vec<String>,
    #[serde(deserialize_with = "names")]
    pub hosts: Vec<String>,
    pub links: Vec<LinkSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<PolicyKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<SimConfig>,
}

/// 节点集合既可以是数组也可以是对象
fn names<'de, D>(de: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Names {
        List(Vec<String>),
        Map(BTreeMap<String, serde_json::Value>),
    }
    Ok(match Names::deserialize(de)? {
        Names::List(v) => v,
        Names::Map(m) => m.into_keys().collect(),
    })
}

impl TopologySpec {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn fabric(&self) -> FabricParams {
        FabricParams {
            num_tor_ports: self.num_tor_ports,
            num_agg_ports: self.num_agg_ports,
            hosts_per_rack: self.hosts_per_rack,
        }
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy.unwrap_or(PolicyKind::Dt)
    }

    pub fn sim_config(&self) -> SimConfig {
        self.config.clone().unwrap_or_default()
    }

    /// 按描述里的策略与参数构建网络
    pub fn build(&self) -> Result<Network> {
        self.build_with(self.policy(), self.sim_config())
    }

    /// 用指定策略与参数构建网络
    pub fn build_with(&self, policy: PolicyKind, cfg: SimConfig) -> Result<Network> {
        self.validate()?;
        let mut net = Network::new(self.fabric(), policy, cfg);
        for name in &self.switches {
            let id: SwitchId = name
                .parse()
                .map_err(|e| SimError::Topology(format!("{e}")))?;
            net.add_switch(id)?;
        }
        for name in &self.hosts {
            let addr: HostAddr = name
                .parse()
                .map_err(|e| SimError::Topology(format!("{e}")))?;
            net.add_host(addr)?;
        }
        for (a, b, pa, pb) in &self.links {
            let na: NodeId = a.parse().map_err(|e| SimError::Topology(format!("{e}")))?;
            let nb: NodeId = b.parse().map_err(|e| SimError::Topology(format!("{e}")))?;
            net.connect(na, nb, *pa, *pb)?;
        }
        info!(
            switches = self.switches.len(),
            hosts = self.hosts.len(),
            links = self.links.len(),
            %policy,
            "🏗️  拓扑构建完成"
        );
        Ok(net)
    }

    fn validate(&self) -> Result<()> {
        if self.hosts_per_rack == 0 {
            return Err(SimError::Topology("hosts_per_rack must be positive".into()));
        }
        if self.num_tor_ports < self.hosts_per_rack {
            return Err(SimError::Topology(format!(
                "num_tor_ports {} is smaller than hosts_per_rack {}",
                self.num_tor_ports, self.hosts_per_rack
            )));
        }
        Ok(())
    }
}
