use crate::net::{HostAddr, Packet, PriorityClass};
use crate::queue::VoqTable;
use crate::sim::Timeslot;

fn pkt(seq: u64, class: PriorityClass) -> Packet {
    Packet::data(HostAddr(1), HostAddr(2), 10, 20, seq, class)
}

#[test]
fn voq_counters_track_enqueue_and_dequeue() {
    let mut voqs = VoqTable::new(2, 4, 30);
    assert_eq!(voqs.capacity(), 4);
    assert_eq!(voqs.free(), 4);

    voqs.enqueue(0, pkt(0, PriorityClass::Bulk), Timeslot(0));
    voqs.enqueue(0, pkt(1, PriorityClass::Latency), Timeslot(0));
    voqs.enqueue(1, pkt(2, PriorityClass::Middle), Timeslot(1));
    assert_eq!(voqs.total_usage(), 3);
    assert_eq!(voqs.port_len(0), 2);
    assert_eq!(voqs.occupancy(0, PriorityClass::Bulk), 1);
    assert_eq!(voqs.occupancy(1, PriorityClass::Middle), 1);
    assert_eq!(voqs.free(), 1);
    assert!(voqs.check().is_ok());

    voqs.enqueue(1, pkt(3, PriorityClass::Middle), Timeslot(1));
    assert!(voqs.is_full());

    assert_eq!(voqs.dequeue(1).expect("pkt").seq, 2);
    assert_eq!(voqs.total_usage(), 3);
    assert!(voqs.check().is_ok());
}

#[test]
fn voq_dequeue_is_strict_priority() {
    let mut voqs = VoqTable::new(1, 10, 30);
    voqs.enqueue(0, pkt(0, PriorityClass::Bulk), Timeslot(0));
    voqs.enqueue(0, pkt(1, PriorityClass::Middle), Timeslot(0));
    voqs.enqueue(0, pkt(2, PriorityClass::Latency), Timeslot(1));

    let order: Vec<u64> = std::iter::from_fn(|| voqs.dequeue(0)).map(|p| p.seq).collect();
    assert_eq!(order, vec![2, 1, 0]);
    assert_eq!(voqs.total_usage(), 0);
    assert!(voqs.dequeue(0).is_none());
}

#[test]
fn voq_marks_ecn_above_threshold() {
    let mut voqs = VoqTable::new(2, 10, 1);
    voqs.enqueue(0, pkt(0, PriorityClass::Bulk), Timeslot(0));
    voqs.enqueue(0, pkt(1, PriorityClass::Bulk), Timeslot(0));
    // 另一个端口的排队数不影响本端口
    voqs.enqueue(1, pkt(2, PriorityClass::Bulk), Timeslot(0));

    assert!(!voqs.dequeue(0).expect("first").ecn);
    assert!(voqs.dequeue(0).expect("second").ecn);
    assert!(!voqs.dequeue(1).expect("other port").ecn);
}

#[test]
fn voq_evict_tail_removes_newest_and_tombstones_it() {
    let mut voqs = VoqTable::new(1, 10, 30);
    voqs.enqueue(0, pkt(0, PriorityClass::Bulk), Timeslot(0));
    voqs.enqueue(0, pkt(1, PriorityClass::Bulk), Timeslot(4));
    assert_eq!(voqs.tail_arrival(0, PriorityClass::Bulk), Some(Timeslot(4)));

    let victim = voqs.evict_tail(0, PriorityClass::Bulk).expect("victim");
    assert_eq!(victim.seq, 1);
    assert!(victim.tombstone);
    assert_eq!(voqs.total_usage(), 1);
    assert_eq!(voqs.occupancy(0, PriorityClass::Bulk), 1);
    assert!(voqs.check().is_ok());

    assert!(voqs.evict_tail(0, PriorityClass::Latency).is_none());
    assert_eq!(voqs.dequeue(0).expect("survivor").seq, 0);
}

#[test]
fn voq_largest_port_prefers_lowest_index_on_tie() {
    let mut voqs = VoqTable::new(3, 10, 30);
    assert_eq!(voqs.largest_port(), 0);
    voqs.enqueue(1, pkt(0, PriorityClass::Bulk), Timeslot(0));
    voqs.enqueue(2, pkt(1, PriorityClass::Bulk), Timeslot(0));
    assert_eq!(voqs.largest_port(), 1);
    voqs.enqueue(2, pkt(2, PriorityClass::Bulk), Timeslot(0));
    assert_eq!(voqs.largest_port(), 2);
}

#[test]
fn voq_has_less_urgent_looks_only_at_lower_classes() {
    let mut voqs = VoqTable::new(1, 10, 30);
    voqs.enqueue(0, pkt(0, PriorityClass::Middle), Timeslot(0));
    assert!(voqs.has_less_urgent(0, PriorityClass::Latency));
    assert!(!voqs.has_less_urgent(0, PriorityClass::Middle));
    assert!(!voqs.has_less_urgent(0, PriorityClass::Bulk));
}
