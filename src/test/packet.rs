use crate::net::{FlowKey, HostAddr, NodeId, Packet, PriorityClass, SwitchId};
use crate::sim::{HostConfig, Timeslot};

#[test]
fn priority_class_follows_flow_size_thresholds() {
    let cfg = HostConfig::default();
    assert_eq!(PriorityClass::for_flow_size(1, &cfg), PriorityClass::Latency);
    assert_eq!(PriorityClass::for_flow_size(99, &cfg), PriorityClass::Latency);
    assert_eq!(PriorityClass::for_flow_size(100, &cfg), PriorityClass::Middle);
    assert_eq!(PriorityClass::for_flow_size(1000, &cfg), PriorityClass::Middle);
    assert_eq!(PriorityClass::for_flow_size(1001, &cfg), PriorityClass::Bulk);
}

#[test]
fn priority_class_urgency_and_indices() {
    assert!(PriorityClass::Latency.more_urgent_than(PriorityClass::Bulk));
    assert!(!PriorityClass::Bulk.more_urgent_than(PriorityClass::Bulk));
    assert_eq!(PriorityClass::Latency.index(), 0);
    assert_eq!(PriorityClass::Bulk.index(), 2);
    assert_eq!(PriorityClass::from_index(1), Some(PriorityClass::Middle));
    assert_eq!(PriorityClass::from_index(3), None);
    assert_eq!(PriorityClass::Middle.to_string(), "2");
}

#[test]
fn ack_swaps_endpoints_and_echoes_ecn() {
    let mut data = Packet::data(HostAddr(1), HostAddr(2), 10, 20, 4, PriorityClass::Middle);
    data.ecn = true;

    let ack = Packet::ack_for(&data, 5);
    assert_eq!(ack.src, HostAddr(2));
    assert_eq!(ack.dst, HostAddr(1));
    assert_eq!((ack.sport, ack.dport), (20, 10));
    assert!(ack.ack_flag);
    assert!(ack.ecn);
    assert_eq!(ack.ack, 5);
    assert_eq!(ack.priority, PriorityClass::Middle);

    // 接收端以源地址为对端，发送端以目的地址为对端
    assert_eq!(data.receiver_key(), FlowKey::new(HostAddr(1), 10, 20));
    assert_eq!(ack.ack_key(), FlowKey::new(HostAddr(2), 10, 20));
}

#[test]
fn packet_log_line_lists_route() {
    let mut pkt = Packet::data(HostAddr(1), HostAddr(3), 10, 20, 7, PriorityClass::Latency);
    pkt.record_hop(NodeId::Host(HostAddr(1)), Timeslot(3));
    pkt.record_hop(NodeId::Switch(SwitchId::tor(1)), Timeslot(5));
    assert_eq!(pkt.first_sent(), Some(Timeslot(3)));
    assert_eq!(
        pkt.to_string(),
        "src: h1, dst: h3, sport: 10, dport: 20, seqNum: 7, ackNum: 0, ackFlag: 0, ecnFlag: 0, route: (h1,3)->(t1,5)"
    );
}

#[test]
fn node_ids_parse_and_display() {
    assert_eq!("h12".parse::<HostAddr>().expect("host"), HostAddr(12));
    assert_eq!("12".parse::<HostAddr>().expect("bare host"), HostAddr(12));
    assert!("h0".parse::<HostAddr>().is_err());
    assert_eq!("a3".parse::<SwitchId>().expect("agg"), SwitchId::agg(3));
    assert!("x1".parse::<SwitchId>().is_err());
    assert_eq!(
        "t2".parse::<NodeId>().expect("tor"),
        NodeId::Switch(SwitchId::tor(2))
    );
    assert_eq!(NodeId::from(HostAddr(4)).to_string(), "h4");
}
