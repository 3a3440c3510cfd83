use crate::net::{HostAddr, Packet, PriorityClass, Router, SwitchId, flow_hash_mod};

fn pkt(src: u32, dst: u32, sport: u32, dport: u32) -> Packet {
    Packet::data(HostAddr(src), HostAddr(dst), sport, dport, 0, PriorityClass::Bulk)
}

#[test]
fn tor_routes_local_hosts_to_downlinks() {
    let t2 = Router::new(SwitchId::tor(2), 2, 4);
    assert_eq!(t2.out_port(&pkt(1, 3, 1, 1)), Some(1));
    assert_eq!(t2.out_port(&pkt(1, 4, 1, 1)), Some(2));

    let t1 = Router::new(SwitchId::tor(1), 2, 4);
    assert_eq!(t1.out_port(&pkt(3, 1, 1, 1)), Some(1));
    assert_eq!(t1.out_port(&pkt(3, 2, 1, 1)), Some(2));
}

#[test]
fn tor_hashes_remote_traffic_onto_uplinks() {
    let p = pkt(1, 4, 10, 20);
    // sha256("h1h41020") mod 2 = 1, mod 3 = 0, mod 5 = 4
    assert_eq!(Router::new(SwitchId::tor(1), 2, 4).out_port(&p), Some(4));
    assert_eq!(Router::new(SwitchId::tor(1), 2, 5).out_port(&p), Some(3));
    assert_eq!(Router::new(SwitchId::tor(1), 2, 7).out_port(&p), Some(7));

    // sha256("h1h41121") mod 3 = 1
    let q = pkt(1, 4, 11, 21);
    assert_eq!(Router::new(SwitchId::tor(1), 2, 5).out_port(&q), Some(4));
}

#[test]
fn ecmp_is_stable_for_a_flow() {
    let r = Router::new(SwitchId::tor(1), 4, 8);
    let mut p = pkt(2, 3, 5, 10);
    p.dst = HostAddr(9);
    let first = r.out_port(&p);
    p.seq = 42;
    p.ecn = true;
    assert_eq!(r.out_port(&p), first);
    let port = first.expect("uplink");
    assert!((5..=8).contains(&port));
}

#[test]
fn flow_hash_matches_big_endian_digest_value() {
    assert_eq!(flow_hash_mod(&pkt(2, 3, 5, 10), 3), 2);
    assert_eq!(flow_hash_mod(&pkt(2, 3, 5, 10), 7), 2);
    assert_eq!(flow_hash_mod(&pkt(1, 3, 10, 20), 5), 3);
    assert_eq!(flow_hash_mod(&pkt(2, 3, 10, 20), 4), 2);
    assert_eq!(flow_hash_mod(&pkt(1, 4, 10, 20), 1), 0);
}

#[test]
fn agg_routes_by_rack() {
    let a1 = Router::new(SwitchId::agg(1), 2, 4);
    assert_eq!(a1.out_port(&pkt(9, 1, 1, 1)), Some(1));
    assert_eq!(a1.out_port(&pkt(9, 2, 1, 1)), Some(1));
    assert_eq!(a1.out_port(&pkt(9, 3, 1, 1)), Some(2));
    assert_eq!(a1.out_port(&pkt(9, 4, 1, 1)), Some(2));
    assert_eq!(a1.out_port(&pkt(9, 5, 1, 1)), Some(3));
}

#[test]
fn tor_without_uplinks_has_no_remote_route() {
    let t1 = Router::new(SwitchId::tor(1), 2, 2);
    assert_eq!(t1.out_port(&pkt(1, 2, 1, 1)), Some(2));
    assert_eq!(t1.out_port(&pkt(1, 3, 1, 1)), None);

    let broken = Router::new(SwitchId::tor(1), 0, 4);
    assert_eq!(broken.out_port(&pkt(1, 2, 1, 1)), None);
}
