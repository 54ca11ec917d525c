//! Sequence-number reordering stage for streamed frames.
//!
//! The transport can deliver frames of one synchronization session out of
//! order. The orderer buffers early arrivals per `(account, replica)` key and
//! releases them strictly by sequence number, restarting its expectations
//! whenever a new session begins. A frame that waits too long at the head of
//! a buffer triggers a single out-of-order alert for that session.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::transport::Packet;

/// Maximum number of buffered future frames per key. Overflow evicts from
/// the low end.
const WAIT_LIST_CAPACITY: usize = 100;

/// How often buffers are checked for frames stuck at the head.
const GAP_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Default patience before a stuck buffer head is reported.
pub const DEFAULT_ORDERING_TIMEOUT: Duration = Duration::from_secs(60);

/// Notified when a sequence gap has persisted past the ordering timeout.
#[async_trait]
pub trait OutOfOrderListener: Send + Sync {
    async fn on_out_of_order_packet(
        &self,
        account_id: &str,
        instance_index: u32,
        expected_sequence_number: u64,
        actual_sequence_number: u64,
        packet: Packet,
        received_at: DateTime<Utc>,
    );
}

struct WaitListEntry {
    packet: Packet,
    received_at: DateTime<Utc>,
}

#[derive(Default)]
struct InstanceSequence {
    /// Last delivered sequence number; `None` until a session start is seen.
    expected: Option<u64>,
    /// `sequenceTimestamp` of the most recent session start, epoch ms.
    last_session_start: i64,
    out_of_order_emitted: bool,
    wait_list: Vec<WaitListEntry>,
}

struct GapAlert {
    account_id: String,
    instance_index: u32,
    expected_sequence_number: u64,
    actual_sequence_number: u64,
    packet: Packet,
    received_at: DateTime<Utc>,
}

struct OrdererShared {
    instances: Mutex<HashMap<(String, u32), InstanceSequence>>,
    listener: Arc<dyn OutOfOrderListener>,
    ordering_timeout: chrono::Duration,
}

/// Per-transport reordering buffer.
pub struct PacketOrderer {
    shared: Arc<OrdererShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PacketOrderer {
    /// Create an orderer reporting gaps to `listener` after `ordering_timeout`.
    #[must_use]
    pub fn new(listener: Arc<dyn OutOfOrderListener>, ordering_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(OrdererShared {
                instances: Mutex::new(HashMap::new()),
                listener,
                ordering_timeout: chrono::Duration::from_std(ordering_timeout)
                    .unwrap_or_else(|_| chrono::Duration::seconds(60)),
            }),
            task: Mutex::new(None),
        }
    }

    /// Start the periodic gap-alert task. Restarting an already running
    /// orderer resets its buffers.
    pub fn start(&self) {
        self.shared.instances.lock().clear();
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(GAP_CHECK_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                for alert in shared.collect_gap_alerts(Utc::now()) {
                    shared
                        .listener
                        .on_out_of_order_packet(
                            &alert.account_id,
                            alert.instance_index,
                            alert.expected_sequence_number,
                            alert.actual_sequence_number,
                            alert.packet,
                            alert.received_at,
                        )
                        .await;
                }
            }
        }));
    }

    /// Cancel the periodic gap-alert task.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Consume one frame and return every frame now ready for dispatch, in
    /// sequence order.
    ///
    /// Frames without a sequence number pass through untouched. Frames from
    /// before the current session are dropped. The orderer never fails; at
    /// worst a frame is buffered and later evicted, and the transport
    /// recovers by starting a new session.
    pub fn restore_order(&self, packet: Packet) -> Vec<Packet> {
        let Some(sequence_number) = packet.sequence_number else {
            return vec![packet];
        };
        let key = (packet.account_id.clone(), packet.instance_index);
        let mut instances = self.shared.instances.lock();
        let state = instances.entry(key).or_default();

        if packet.starts_session() {
            let session_start = packet.sequence_timestamp.unwrap_or_default();
            state.expected = Some(sequence_number);
            state.last_session_start = session_start;
            state.out_of_order_emitted = false;
            state
                .wait_list
                .retain(|entry| entry.packet.sequence_timestamp.unwrap_or_default() >= session_start);
            let mut ready = vec![packet];
            ready.extend(drain_consecutive(state));
            ready
        } else if packet.sequence_timestamp.unwrap_or_default() < state.last_session_start {
            // Leftover from a previous session.
            vec![]
        } else if state.expected == Some(sequence_number) {
            // Duplicate of the last delivered frame.
            vec![packet]
        } else if state.expected.map(|expected| expected + 1) == Some(sequence_number) {
            state.expected = Some(sequence_number);
            let mut ready = vec![packet];
            ready.extend(drain_consecutive(state));
            ready
        } else {
            debug!(
                account_id = %packet.account_id,
                instance_index = packet.instance_index,
                sequence_number,
                "buffering out-of-sequence packet"
            );
            let position = state
                .wait_list
                .partition_point(|entry| entry.packet.sequence_number < Some(sequence_number));
            state.wait_list.insert(
                position,
                WaitListEntry {
                    packet,
                    received_at: Utc::now(),
                },
            );
            while state.wait_list.len() > WAIT_LIST_CAPACITY {
                state.wait_list.remove(0);
            }
            vec![]
        }
    }
}

impl OrdererShared {
    /// Find buffers whose head has waited past the ordering timeout. Each
    /// session reports at most once, and only keys that have seen a session
    /// start can report at all.
    fn collect_gap_alerts(&self, now: DateTime<Utc>) -> Vec<GapAlert> {
        let threshold = now - self.ordering_timeout;
        let mut alerts = Vec::new();
        let mut instances = self.instances.lock();
        for ((account_id, instance_index), state) in instances.iter_mut() {
            if state.out_of_order_emitted {
                continue;
            }
            let Some(expected) = state.expected else {
                continue;
            };
            let Some(head) = state.wait_list.first() else {
                continue;
            };
            if head.received_at <= threshold {
                state.out_of_order_emitted = true;
                alerts.push(GapAlert {
                    account_id: account_id.clone(),
                    instance_index: *instance_index,
                    expected_sequence_number: expected + 1,
                    actual_sequence_number: head.packet.sequence_number.unwrap_or_default(),
                    packet: head.packet.clone(),
                    received_at: head.received_at,
                });
            }
        }
        alerts
    }
}

/// Pop buffered frames while they continue the sequence: a duplicate of the
/// last delivered frame is released without advancing, the next frame
/// advances the expectation.
fn drain_consecutive(state: &mut InstanceSequence) -> Vec<Packet> {
    let mut ready = Vec::new();
    loop {
        let Some(expected) = state.expected else {
            break;
        };
        let Some(head_sequence) = state
            .wait_list
            .first()
            .and_then(|entry| entry.packet.sequence_number)
        else {
            break;
        };
        if head_sequence == expected {
            ready.push(state.wait_list.remove(0).packet);
        } else if head_sequence == expected + 1 {
            state.expected = Some(head_sequence);
            ready.push(state.wait_list.remove(0).packet);
        } else {
            break;
        }
    }
    ready
}
