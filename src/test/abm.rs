use crate::net::{HostAddr, Packet, PriorityClass};
use crate::queue::{Abm, Arrival, BufferPolicy, DropReason, PolicyKind, Verdict, VoqTable};
use crate::sim::{SwitchConfig, Timeslot};

fn pkt(class: PriorityClass) -> Packet {
    Packet::data(HostAddr(1), HostAddr(2), 10, 20, 0, class)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn abm_starts_from_even_split_and_recomputes_after_each_decision() {
    let cfg = SwitchConfig::default();
    let mut voqs = VoqTable::new(2, 30, 25);
    let mut abm = Abm::new(2, 30, &cfg);
    assert_eq!(abm.threshold(1, PriorityClass::Middle), Some(5.0));

    let v = abm.on_arrival(
        Arrival {
            in_port: 1,
            out_port: 0,
            pkt: pkt(PriorityClass::Latency),
        },
        &mut voqs,
        Timeslot(0),
    );
    assert!(matches!(v, Verdict::Admitted));
    // 没有拥塞端口：T = w × free
    assert_eq!(abm.active_count(PriorityClass::Latency), 0);
    assert_eq!(abm.threshold(0, PriorityClass::Latency), Some(58.0));
    assert_eq!(abm.threshold(0, PriorityClass::Bulk), Some(14.5));
}

#[test]
fn abm_congested_ports_split_the_class_share() {
    let cfg = SwitchConfig::default();
    let mut voqs = VoqTable::new(2, 30, 25);
    let mut abm = Abm::new(2, 30, &cfg);
    for port in 0..2 {
        for _ in 0..5 {
            voqs.enqueue(port, pkt(PriorityClass::Bulk), Timeslot(0));
        }
    }

    abm.recompute_thresholds(&voqs);
    assert_eq!(abm.active_count(PriorityClass::Bulk), 2);
    assert_eq!(abm.active_count(PriorityClass::Latency), 0);
    // 0.5 × 20 × 1.0 / 2
    assert_eq!(abm.threshold(0, PriorityClass::Bulk), Some(5.0));
    assert_eq!(abm.threshold(0, PriorityClass::Latency), Some(40.0));

    let v = abm.on_arrival(
        Arrival {
            in_port: 1,
            out_port: 0,
            pkt: pkt(PriorityClass::Bulk),
        },
        &mut voqs,
        Timeslot(1),
    );
    assert!(matches!(
        v,
        Verdict::Dropped {
            reason: DropReason::Threshold(PolicyKind::Abm),
            ..
        }
    ));
}

#[test]
fn abm_share_follows_departure_mix_with_floor() {
    let cfg = SwitchConfig::default();
    let voqs = VoqTable::new(2, 30, 25);
    let mut abm = Abm::new(2, 30, &cfg);

    for _ in 0..80 {
        abm.on_departure(0, PriorityClass::Bulk);
    }
    for _ in 0..19 {
        abm.on_departure(0, PriorityClass::Latency);
    }
    // 批次未满，份额不变
    abm.recompute_thresholds(&voqs);
    assert!(close(abm.share(0, PriorityClass::Bulk), 1.0));

    abm.on_departure(0, PriorityClass::Latency);
    abm.recompute_thresholds(&voqs);
    assert!(close(abm.share(0, PriorityClass::Bulk), 0.8));
    assert!(close(abm.share(0, PriorityClass::Latency), 1.0 / 3.0));
    assert!(close(abm.share(0, PriorityClass::Middle), 1.0 / 3.0));
    assert!(close(abm.share(1, PriorityClass::Bulk), 1.0));
    // 0.5 × 30 × 0.8
    let t = abm.threshold(0, PriorityClass::Bulk).expect("abm threshold");
    assert!(close(t, 12.0));
}

#[test]
fn abm_admitted_occupancy_stays_within_threshold() {
    let cfg = SwitchConfig::default();
    let mut voqs = VoqTable::new(2, 30, 25);
    let mut abm = Abm::new(2, 30, &cfg);

    let mut admitted = 0;
    let mut contended = false;
    for i in 0..40 {
        let port = i % 2;
        let before = abm.threshold(port, PriorityClass::Bulk).expect("abm threshold");
        let v = abm.on_arrival(
            Arrival {
                in_port: 1 - port,
                out_port: port,
                pkt: pkt(PriorityClass::Bulk),
            },
            &mut voqs,
            Timeslot(i as u64),
        );
        match v {
            Verdict::Admitted => {
                admitted += 1;
                assert!(voqs.occupancy(port, PriorityClass::Bulk) as f64 <= before.ceil());
            }
            Verdict::Dropped { reason, .. } => {
                assert_eq!(reason, DropReason::Threshold(PolicyKind::Abm));
            }
            Verdict::Staged { .. } => panic!("abm never stages"),
        }
        contended |= abm.active_count(PriorityClass::Bulk) > 1;
    }

    // 两个端口都拥塞后份额减半：0.5 × 14 / 2
    assert!(contended);
    assert_eq!(admitted, 16);
    assert_eq!(abm.active_count(PriorityClass::Bulk), 2);
    assert!(close(abm.threshold(0, PriorityClass::Bulk).expect("abm threshold"), 3.5));
    assert_eq!(voqs.occupancy(0, PriorityClass::Bulk), 8);
    assert_eq!(voqs.occupancy(1, PriorityClass::Bulk), 8);
    assert!(voqs.check().is_ok());
}
