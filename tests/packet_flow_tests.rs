//! Public-API tests for the frame reordering stage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use termlink::core::transport::{
    OutOfOrderListener, Packet, PacketOrderer, DEFAULT_ORDERING_TIMEOUT, SYNCHRONIZATION_STARTED,
};

#[derive(Default)]
struct CountingListener {
    alerts: Mutex<usize>,
}

#[async_trait]
impl OutOfOrderListener for CountingListener {
    async fn on_out_of_order_packet(
        &self,
        _account_id: &str,
        _instance_index: u32,
        _expected_sequence_number: u64,
        _actual_sequence_number: u64,
        _packet: Packet,
        _received_at: DateTime<Utc>,
    ) {
        *self.alerts.lock() += 1;
    }
}

fn orderer() -> PacketOrderer {
    PacketOrderer::new(Arc::new(CountingListener::default()), DEFAULT_ORDERING_TIMEOUT)
}

fn session_start(sequence_number: u64, sequence_timestamp: i64) -> Packet {
    let mut packet = Packet::new("account-1", SYNCHRONIZATION_STARTED);
    packet.sequence_number = Some(sequence_number);
    packet.sequence_timestamp = Some(sequence_timestamp);
    packet.synchronization_id = Some("sync-1".to_string());
    packet
}

fn frame(sequence_number: u64, sequence_timestamp: i64) -> Packet {
    let mut packet = Packet::new("account-1", "prices");
    packet.sequence_number = Some(sequence_number);
    packet.sequence_timestamp = Some(sequence_timestamp);
    packet
}

fn sequence_numbers(packets: &[Packet]) -> Vec<u64> {
    packets
        .iter()
        .map(|packet| packet.sequence_number.unwrap())
        .collect()
}

#[test]
fn delivers_buffered_frames_once_the_gap_closes() {
    let orderer = orderer();
    assert_eq!(
        sequence_numbers(&orderer.restore_order(session_start(5, 100))),
        vec![5]
    );
    assert!(orderer.restore_order(frame(7, 101)).is_empty());
    assert_eq!(
        sequence_numbers(&orderer.restore_order(frame(6, 101))),
        vec![6, 7]
    );
}

#[test]
fn frames_from_an_earlier_session_are_dropped() {
    let orderer = orderer();
    orderer.restore_order(session_start(5, 100));
    orderer.restore_order(frame(7, 101));
    orderer.restore_order(frame(6, 101));
    assert!(orderer.restore_order(frame(4, 99)).is_empty());
}

#[test]
fn frames_without_sequence_numbers_bypass_ordering() {
    let orderer = orderer();
    let response = Packet::new("account-1", "response");
    assert_eq!(orderer.restore_order(response.clone()), vec![response]);
}

#[test]
fn deliveries_within_a_session_are_monotonic() {
    let orderer = orderer();
    let mut delivered = Vec::new();
    delivered.extend(orderer.restore_order(session_start(1, 100)));
    for sequence in [4u64, 2, 6, 3, 5, 7] {
        delivered.extend(orderer.restore_order(frame(sequence, 101)));
    }
    assert_eq!(sequence_numbers(&delivered), vec![1, 2, 3, 4, 5, 6, 7]);
}
