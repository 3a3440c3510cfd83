use std::io::{self, Cursor, Write};
use std::sync::{Arc, Mutex};

use crate::error::SimError;
use crate::net::{
    HostAddr, LogSinks, Network, REORDER_SEPARATOR, RunState, SwitchId, Termination,
};
use crate::queue::PolicyKind;
use crate::sim::{FlowRow, FlowTrace, SimConfig, Timeslot};
use crate::topo::two_tier;

/// 测试里抓取日志输出
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8(self.0.lock().expect("buffer lock").clone()).expect("utf-8 log")
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn row(id: u64, src: u32, dst: u32, size: u64, start: u64) -> FlowRow {
    FlowRow {
        id,
        src: HostAddr(src),
        dst: HostAddr(dst),
        sport: 10 + id as u32,
        dport: 20 + id as u32,
        size,
        start: Timeslot(start),
    }
}

fn network(racks: u32, hpr: u32, aggs: u32, policy: PolicyKind, cfg: SimConfig) -> Network {
    two_tier(racks, hpr, aggs)
        .build_with(policy, cfg)
        .expect("topology builds")
}

#[test]
fn single_packet_flow_completes_and_stops_early() {
    let mut net = network(1, 2, 1, PolicyKind::Dt, SimConfig::default());
    net.load_trace(vec![Ok(row(0, 1, 2, 1, 0))]);
    let summary = net.run(Timeslot(1000)).expect("run");

    // t0 发出，t1 进入 t1 的 VOQ，t2 出队，t3 到达 h2
    assert_eq!(summary.reason, Termination::AllFlowsFinished);
    assert_eq!(summary.timeslots, Timeslot(4));
    assert_eq!(net.state(), RunState::Terminated(Termination::AllFlowsFinished));
    let flows = net.completed_flows();
    assert_eq!(flows.len(), 1);
    assert_eq!(flows[0].finish, Timeslot(3));
    assert_eq!(flows[0].fct(), 3);
    assert_eq!(flows[0].last_sent, Timeslot(0));
    assert_eq!(summary.stats.packets_sent, 1);
    assert_eq!(summary.stats.packets_received, 1);
    assert_eq!(summary.stats.flows_completed, 1);
    assert_eq!(summary.stats.drops, 0);
    assert_eq!(net.summary(), Some(summary));

    // 已终止后再推进不改变状态
    assert_eq!(
        net.step(Timeslot(1000)).expect("step"),
        RunState::Terminated(Termination::AllFlowsFinished)
    );
    assert_eq!(net.now(), Timeslot(4));
}

#[test]
fn trace_file_drives_cross_rack_flows_and_logs() {
    let text = String::from(
        "id,src,dst,sport,dport,size,start\n\
         0,h1,h3,1,2,30,0\n\
         1,h4,h2,3,4,5,10\n",
    );
    let flows = SharedBuf::default();
    let reorders = SharedBuf::default();
    let mut net = network(2, 2, 2, PolicyKind::Abm, SimConfig::default()).with_sinks(LogSinks {
        flows: Some(Box::new(flows.clone())),
        drops: None,
        reorders: Some(Box::new(reorders.clone())),
    });
    let h3_log = SharedBuf::default();
    net.set_packet_log(HostAddr(3), Box::new(h3_log.clone()))
        .expect("h3 exists");
    net.load_trace(FlowTrace::new(Cursor::new(text)));

    let summary = net.run(Timeslot(10_000)).expect("run");
    assert_eq!(summary.reason, Termination::AllFlowsFinished);
    assert_eq!(summary.stats.flows_completed, 2);
    assert_eq!(summary.stats.packets_received, 35);
    assert!(summary.throughput_gbps > 0.0);

    let log = flows.text();
    assert!(log.contains("0, src: h1, dst: h3, sport: 1, dport: 2, flowsize: 30, starttime: 0,"));
    assert!(log.contains("1, src: h4, dst: h2, sport: 3, dport: 4, flowsize: 5, starttime: 10,"));
    assert!(reorders.text().ends_with(&format!("{REORDER_SEPARATOR}\n")));
    assert_eq!(
        reorders.text().lines().count(),
        net.reorder_events().len() + 1
    );
    // 只有数据包经过链路到达 h3
    let packets = h3_log.text();
    assert_eq!(packets.lines().filter(|l| l.starts_with("src: h1")).count(), 30);
}

#[test]
fn run_stops_at_end_timeslot() {
    let mut net = network(1, 2, 1, PolicyKind::Dt, SimConfig::default());
    net.load_trace(vec![Ok(row(0, 1, 2, 100, 0))]);
    let summary = net.run(Timeslot(10)).expect("run");
    assert_eq!(summary.reason, Termination::EndReached);
    assert_eq!(summary.timeslots, Timeslot(10));
    assert_eq!(net.completed_flows().len(), 0);
    assert!(!net.host(HostAddr(2)).expect("h2").is_idle());

    let mut idle = network(1, 2, 1, PolicyKind::Dt, SimConfig::default());
    assert_eq!(
        idle.step(Timeslot(0)).expect("step"),
        RunState::Terminated(Termination::EndReached)
    );
    assert_eq!(idle.now(), Timeslot(0));
}

#[test]
fn future_rows_wait_for_their_start_slot() {
    let mut net = network(1, 2, 1, PolicyKind::Dt, SimConfig::default());
    net.load_trace(vec![Ok(row(0, 1, 2, 1, 5))]);
    for _ in 0..5 {
        net.step(Timeslot(100)).expect("step");
    }
    assert_eq!(net.stats().packets_sent, 0);
    assert!(!net.trace_exhausted());
    net.step(Timeslot(100)).expect("step");
    assert_eq!(net.stats().packets_sent, 1);
    assert!(net.trace_exhausted());

    let summary = net.run(Timeslot(100)).expect("run");
    assert_eq!(net.completed_flows()[0].fct(), 3);
    assert_eq!(summary.timeslots, Timeslot(9));
}

#[test]
fn injecting_conflicting_or_unknown_flows_fails() {
    let mut net = network(1, 2, 1, PolicyKind::Dt, SimConfig::default());
    net.inject(row(0, 1, 2, 10, 0)).expect("first flow");
    assert!(matches!(
        net.inject(row(0, 1, 2, 10, 0)),
        Err(SimError::DuplicateFlow { .. })
    ));
    assert!(matches!(
        net.inject(row(1, 1, 9, 10, 0)),
        Err(SimError::UnknownHost(_))
    ));

    let mut net = network(1, 2, 1, PolicyKind::Dt, SimConfig::default());
    net.load_trace(vec![
        Ok(row(0, 1, 2, 1, 0)),
        Err(SimError::Trace {
            line: 3,
            reason: "bad flow size `x`".into(),
        }),
    ]);
    assert!(matches!(
        net.run(Timeslot(100)),
        Err(SimError::Trace { line: 3, .. })
    ));
}

fn incast_config() -> SimConfig {
    let mut cfg = SimConfig::default();
    cfg.host.rto = 50;
    cfg
}

/// h1 的长流与 h2 在 t100 开始的短流同时发往 h3
fn run_incast(policy: PolicyKind) -> (Network, String) {
    let drops = SharedBuf::default();
    let mut net = network(1, 3, 1, policy, incast_config()).with_sinks(LogSinks {
        flows: None,
        drops: Some(Box::new(drops.clone())),
        reorders: None,
    });
    net.load_trace(vec![Ok(row(0, 1, 3, 1500, 0)), Ok(row(1, 2, 3, 50, 100))]);
    net.run(Timeslot(200_000)).expect("incast run");
    (net, drops.text())
}

#[test]
fn incast_drops_packets_under_every_policy() {
    for policy in [PolicyKind::Dt, PolicyKind::Abm, PolicyKind::Obm, PolicyKind::Lqd] {
        let (net, drops) = run_incast(policy);
        assert!(matches!(net.state(), RunState::Terminated(_)));
        assert!(net.stats().drops > 0, "{policy}: no drops");
        assert_eq!(drops.lines().count() as u64, net.stats().drops);
        assert!(drops.starts_with("switch t1 - "), "{policy}: {drops}");
        assert_eq!(
            net.reorder_events().len() as u64,
            net.stats().reorder_events
        );

        // 短流优先级最高，总能完成
        assert!(
            net.completed_flows().iter().any(|r| r.size == 50),
            "{policy}: latency flow did not finish"
        );

        let t1 = net.switch(SwitchId::tor(1)).expect("t1");
        assert_eq!(t1.dropped(), net.stats().drops);
        assert!(t1.voqs().check().is_ok());
        assert!(t1.voqs().total_usage() <= t1.voqs().capacity());
    }
}

#[test]
fn incast_overflow_policies_evict_instead_of_dropping_urgent_packets() {
    for policy in [PolicyKind::Obm, PolicyKind::Lqd] {
        let (net, drops) = run_incast(policy);
        assert!(drops.contains(" - evicted - "), "{policy}: {drops}");
        let kind = net.switch(SwitchId::tor(1)).map(|s| s.policy().kind());
        assert_eq!(kind, Some(policy));
    }
    let (_, drops) = run_incast(PolicyKind::Dt);
    assert!(drops.contains(" - dt drop - "));
    assert!(!drops.contains("evicted"));
}

#[test]
fn identical_runs_produce_identical_results() {
    let (a, log_a) = run_incast(PolicyKind::Lqd);
    let (b, log_b) = run_incast(PolicyKind::Lqd);
    assert_eq!(a.stats(), b.stats());
    assert_eq!(a.completed_flows(), b.completed_flows());
    assert_eq!(a.now(), b.now());
    assert_eq!(log_a, log_b);
}
