//! 两层 ToR/Agg 拓扑构建

use super::{LinkSpec, TopologySpec};

/// 构建 `racks` 个机架、每机架 `hosts_per_rack` 台主机、`aggs` 台汇聚交换机的两层拓扑。
///
/// 端口编号：
/// - ToR `t<r>` 的端口 `1..=hosts_per_rack` 接本机架主机，端口 `hosts_per_rack + j` 接 `a<j>`；
/// - Agg `a<j>` 的端口 `r` 接 `t<r>`；
/// - 主机只有端口 1。
pub fn two_tier(racks: u32, hosts_per_rack: u32, aggs: u32) -> TopologySpec {
    let mut switches = Vec::new();
    let mut hosts = Vec::new();
    let mut links: Vec<LinkSpec> = Vec::new();

    for r in 1..=racks {
        switches.push(format!("t{r}"));
    }
    for j in 1..=aggs {
        switches.push(format!("a{j}"));
    }

    for r in 1..=racks {
        for local in 1..=hosts_per_rack {
            let h = (r - 1) * hosts_per_rack + local;
            hosts.push(format!("h{h}"));
            links.push((format!("h{h}"), format!("t{r}"), 1, local as usize));
        }
        for j in 1..=aggs {
            links.push((
                format!("t{r}"),
                format!("a{j}"),
                (hosts_per_rack + j) as usize,
                r as usize,
            ));
        }
    }

    TopologySpec {
        num_tor_ports: hosts_per_rack + aggs,
        num_agg_ports: racks,
        hosts_per_rack,
        switches,
        hosts,
        links,
        policy: None,
        config: None,
    }
}
