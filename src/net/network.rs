//! 网络：时隙驱动器
//!
//! 持有全部主机、交换机和链路，按全局时隙推进：
//!
//! 1. 注入所有开始时隙已到的 trace 行；
//! 2. 按加入顺序逐个推进主机（发送 → ACK → 接收），主机产生的 ACK 立即投递到目的主机信箱；
//! 3. 按加入顺序逐个推进交换机；
//! 4. 时隙加一，判断是否终止。
//!
//! 终止条件：trace 读完且所有主机都没有未完成的接收流，或到达结束时隙，先到者为准。
//! 终止时写出乱序事件并刷新所有日志。

use std::collections::{HashMap, VecDeque};
use std::io::Write;

use tracing::{debug, info, warn};

use super::host::Host;
use super::id::{FlowKey, HostAddr, LinkId, NodeId, SwitchId, Tier};
use super::link::Link;
use super::packet::Packet;
use super::records::{FlowRecord, ReorderEvent};
use super::routing::Router;
use super::stats::{RunSummary, Stats, StepReport, Termination};
use super::switch::Switch;
use crate::error::{Result, SimError};
use crate::queue::PolicyKind;
use crate::sim::{FlowRow, SimConfig, Timeslot};

/// 乱序日志中每次运行结束时的分隔行
pub const REORDER_SEPARATOR: &str = "@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@";

/// 两层拓扑的结构参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FabricParams {
    pub num_tor_ports: u32,
    pub num_agg_ports: u32,
    pub hosts_per_rack: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Terminated(Termination),
}

/// 可选的文本日志输出
#[derive(Default)]
pub struct LogSinks {
    pub flows: Option<Box<dyn Write + Send>>,
    pub drops: Option<Box<dyn Write + Send>>,
    pub reorders: Option<Box<dyn Write + Send>>,
}

type TraceRows = Box<dyn Iterator<Item = Result<FlowRow>> + Send>;

/// 网络仿真器
pub struct Network {
    cfg: SimConfig,
    policy: PolicyKind,
    fabric: FabricParams,
    hosts: Vec<Host>,
    host_index: HashMap<HostAddr, usize>,
    switches: Vec<Switch>,
    switch_index: HashMap<SwitchId, usize>,
    links: Vec<Link>,
    /// 每个主机一个 ACK 信箱，下标与 `hosts` 对应
    mailboxes: Vec<VecDeque<Packet>>,
    trace: Option<TraceRows>,
    next_row: Option<FlowRow>,
    now: Timeslot,
    state: RunState,
    stats: Stats,
    sinks: LogSinks,
    completed: Vec<FlowRecord>,
    reorders: Vec<ReorderEvent>,
}

impl Network {
    pub fn new(fabric: FabricParams, policy: PolicyKind, cfg: SimConfig) -> Self {
        Self {
            cfg,
            policy,
            fabric,
            hosts: Vec::new(),
            host_index: HashMap::new(),
            switches: Vec::new(),
            switch_index: HashMap::new(),
            links: Vec::new(),
            mailboxes: Vec::new(),
            trace: None,
            next_row: None,
            now: Timeslot::ZERO,
            state: RunState::Idle,
            stats: Stats::default(),
            sinks: LogSinks::default(),
            completed: Vec::new(),
            reorders: Vec::new(),
        }
    }

    pub fn with_sinks(mut self, sinks: LogSinks) -> Self {
        self.sinks = sinks;
        self
    }

    /// 添加主机
    pub fn add_host(&mut self, addr: HostAddr) -> Result<()> {
        if self.host_index.contains_key(&addr) {
            return Err(SimError::Topology(format!("host {addr} declared twice")));
        }
        self.host_index.insert(addr, self.hosts.len());
        self.hosts.push(Host::new(addr, self.cfg.host.clone()));
        self.mailboxes.push(VecDeque::new());
        Ok(())
    }

    /// 添加交换机；端口数由层级决定
    pub fn add_switch(&mut self, id: SwitchId) -> Result<()> {
        if self.switch_index.contains_key(&id) {
            return Err(SimError::Topology(format!("switch {id} declared twice")));
        }
        let ports = match id.tier {
            Tier::Tor => self.fabric.num_tor_ports,
            Tier::Agg => self.fabric.num_agg_ports,
        };
        let router = Router::new(id, self.fabric.hosts_per_rack, self.fabric.num_tor_ports);
        self.switch_index.insert(id, self.switches.len());
        self.switches.push(Switch::new(
            id,
            ports as usize,
            router,
            self.policy,
            &self.cfg.switch,
        ));
        Ok(())
    }

    /// 用一条链路连接两个节点；交换机一端按端口号接入，主机一端忽略端口号
    pub fn connect(&mut self, a: NodeId, b: NodeId, port_a: usize, port_b: usize) -> Result<LinkId> {
        let id = LinkId(self.links.len());
        self.attach(a, port_a, id)?;
        self.attach(b, port_b, id)?;
        self.links.push(Link::new(id, a, b, self.cfg.link_delay));
        debug!(link = id.0, %a, %b, port_a, port_b, "连接链路");
        Ok(id)
    }

    fn attach(&mut self, node: NodeId, port: usize, link: LinkId) -> Result<()> {
        match node {
            NodeId::Host(addr) => {
                let host = self.host_mut(addr)?;
                if host.link().is_some() {
                    return Err(SimError::Topology(format!("host {addr} already has a link")));
                }
                host.attach(link);
                Ok(())
            }
            NodeId::Switch(id) => {
                let idx = *self
                    .switch_index
                    .get(&id)
                    .ok_or_else(|| SimError::Topology(format!("unknown switch {id}")))?;
                self.switches[idx].attach(port, link)
            }
        }
    }

    /// 给某个主机设置收包日志
    pub fn set_packet_log(&mut self, addr: HostAddr, sink: Box<dyn Write + Send>) -> Result<()> {
        self.host_mut(addr)?.set_packet_log(sink);
        Ok(())
    }

    /// 设置流量 trace；行按开始时隙依次注入
    pub fn load_trace<I>(&mut self, rows: I)
    where
        I: IntoIterator<Item = Result<FlowRow>>,
        I::IntoIter: Send + 'static,
    {
        self.trace = Some(Box::new(rows.into_iter()));
        self.next_row = None;
    }

    /// 立即注入一条流：发送端建发送状态，接收端建接收状态
    pub fn inject(&mut self, row: FlowRow) -> Result<()> {
        let send_key = FlowKey::new(row.dst, row.sport, row.dport);
        let recv_key = FlowKey::new(row.src, row.sport, row.dport);
        let dst = self.host_slot(row.dst)?;
        let priority = self.host_mut(row.src)?.start_send_flow(send_key, row.size)?;
        self.hosts[dst].expect_recv_flow(recv_key, row.id, row.size, row.start)?;
        debug!(
            id = row.id,
            src = %row.src,
            dst = %row.dst,
            size = row.size,
            %priority,
            "注入流"
        );
        Ok(())
    }

    fn inject_due(&mut self) -> Result<()> {
        loop {
            if self.next_row.is_none() {
                let Some(trace) = self.trace.as_mut() else {
                    return Ok(());
                };
                match trace.next() {
                    Some(row) => self.next_row = Some(row?),
                    None => {
                        self.trace = None;
                        return Ok(());
                    }
                }
            }
            let Some(row) = self.next_row.take_if(|row| row.start <= self.now) else {
                return Ok(());
            };
            if row.start < self.now {
                warn!(id = row.id, start = %row.start, now = %self.now, "trace 行开始时隙已过，立即注入");
            }
            self.inject(row)?;
        }
    }

    /// trace 已全部注入
    pub fn trace_exhausted(&self) -> bool {
        self.trace.is_none() && self.next_row.is_none()
    }

    /// 推进一个时隙；已终止时不做任何事
    pub fn step(&mut self, end: Timeslot) -> Result<RunState> {
        match self.state {
            RunState::Terminated(_) => return Ok(self.state),
            RunState::Idle => {
                info!(
                    hosts = self.hosts.len(),
                    switches = self.switches.len(),
                    links = self.links.len(),
                    policy = %self.policy,
                    "▶️  开始运行仿真"
                );
                self.state = RunState::Running;
                if self.now >= end {
                    return self.terminate(Termination::EndReached);
                }
            }
            RunState::Running => {}
        }

        let now = self.now;
        let every = self.cfg.progress_interval;
        if every > 0 && now.0 % every == 0 {
            self.log_progress();
        }

        self.inject_due()?;

        for i in 0..self.hosts.len() {
            let mut report = StepReport::default();
            self.hosts[i].step(
                now,
                &mut self.links,
                &mut self.mailboxes[i],
                &mut report,
                &mut self.stats,
            )?;
            self.dispatch(report)?;
        }
        for i in 0..self.switches.len() {
            let mut report = StepReport::default();
            self.switches[i].step(now, &mut self.links, &mut report, &mut self.stats)?;
            self.dispatch(report)?;
        }

        self.now = now.next();

        if self.trace_exhausted() && self.hosts.iter().all(Host::is_idle) {
            self.terminate(Termination::AllFlowsFinished)
        } else if self.now >= end {
            self.terminate(Termination::EndReached)
        } else {
            Ok(self.state)
        }
    }

    /// 一直运行到终止
    pub fn run(&mut self, end: Timeslot) -> Result<RunSummary> {
        loop {
            if let RunState::Terminated(reason) = self.step(end)? {
                return Ok(self.summarize(reason));
            }
        }
    }

    /// 终止后的汇总
    pub fn summary(&self) -> Option<RunSummary> {
        match self.state {
            RunState::Terminated(reason) => Some(self.summarize(reason)),
            _ => None,
        }
    }

    fn summarize(&self, reason: Termination) -> RunSummary {
        RunSummary {
            timeslots: self.now,
            reason,
            stats: self.stats.clone(),
            throughput_gbps: self.cfg.host.gbps(self.stats.packets_received, self.now.0),
        }
    }

    fn dispatch(&mut self, report: StepReport) -> Result<()> {
        if report.is_empty() {
            return Ok(());
        }
        for ack in report.acks {
            let slot = self.host_slot(ack.dst)?;
            self.mailboxes[slot].push_back(ack);
        }
        for record in report.completions {
            if let Some(sink) = self.sinks.flows.as_mut() {
                writeln!(sink, "{record}\n")?;
            }
            self.completed.push(record);
        }
        if let Some(sink) = self.sinks.drops.as_mut() {
            for drop in &report.drops {
                writeln!(sink, "{drop}")?;
            }
        }
        self.reorders.extend(report.reorders);
        Ok(())
    }

    fn terminate(&mut self, reason: Termination) -> Result<RunState> {
        self.state = RunState::Terminated(reason);
        self.log_progress();
        info!(%reason, now = %self.now, "✅ 仿真结束");

        if let Some(sink) = self.sinks.reorders.as_mut() {
            for event in &self.reorders {
                writeln!(sink, "{event}")?;
            }
            writeln!(sink, "{REORDER_SEPARATOR}")?;
        }
        for sink in [
            &mut self.sinks.flows,
            &mut self.sinks.drops,
            &mut self.sinks.reorders,
        ]
        .into_iter()
        .flatten()
        {
            sink.flush()?;
        }
        for host in &mut self.hosts {
            host.flush_log()?;
        }
        Ok(self.state)
    }

    fn log_progress(&self) {
        info!(
            now = %self.now,
            sent = self.stats.packets_sent,
            received = self.stats.packets_received,
            finished = self.stats.flows_finished_bulk,
            "⏱  进度"
        );
    }

    fn host_slot(&self, addr: HostAddr) -> Result<usize> {
        self.host_index
            .get(&addr)
            .copied()
            .ok_or_else(|| SimError::UnknownHost(addr.to_string()))
    }

    fn host_mut(&mut self, addr: HostAddr) -> Result<&mut Host> {
        let idx = self.host_slot(addr)?;
        Ok(&mut self.hosts[idx])
    }

    pub fn now(&self) -> Timeslot {
        self.now
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn policy(&self) -> PolicyKind {
        self.policy
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn host(&self, addr: HostAddr) -> Option<&Host> {
        self.host_index.get(&addr).map(|&i| &self.hosts[i])
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.iter()
    }

    pub fn switch(&self, id: SwitchId) -> Option<&Switch> {
        self.switch_index.get(&id).map(|&i| &self.switches[i])
    }

    pub fn switches(&self) -> impl Iterator<Item = &Switch> {
        self.switches.iter()
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// 已交付完成的流（按完成顺序）
    pub fn completed_flows(&self) -> &[FlowRecord] {
        &self.completed
    }

    pub fn reorder_events(&self) -> &[ReorderEvent] {
        &self.reorders
    }
}
