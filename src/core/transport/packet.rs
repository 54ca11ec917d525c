//! Streaming frame type shared between the transport and the packet orderer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Frame type marking the start of a synchronization session.
pub const SYNCHRONIZATION_STARTED: &str = "synchronizationStarted";

/// One frame received from the streaming transport.
///
/// Only the envelope fields the ordering stage needs are modeled; the rest of
/// the payload rides along untouched in `fields` and is interpreted by the
/// dispatch layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packet {
    pub account_id: String,
    #[serde(default)]
    pub instance_index: u32,
    #[serde(rename = "type")]
    pub packet_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
    /// Server-side ordering timestamp, epoch milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synchronization_id: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Packet {
    /// Build a bare packet with the given envelope, no extra payload.
    #[must_use]
    pub fn new(account_id: impl Into<String>, packet_type: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            instance_index: 0,
            packet_type: packet_type.into(),
            sequence_number: None,
            sequence_timestamp: None,
            synchronization_id: None,
            fields: Map::new(),
        }
    }

    /// True for frames that begin a new synchronization session.
    #[must_use]
    pub fn starts_session(&self) -> bool {
        self.packet_type == SYNCHRONIZATION_STARTED && self.synchronization_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_envelope_and_keeps_payload() {
        let packet: Packet = serde_json::from_value(serde_json::json!({
            "accountId": "account-1",
            "type": "prices",
            "sequenceNumber": 7,
            "sequenceTimestamp": 1000,
            "prices": [{"symbol": "EURUSD"}],
        }))
        .unwrap();

        assert_eq!(packet.account_id, "account-1");
        assert_eq!(packet.instance_index, 0);
        assert_eq!(packet.sequence_number, Some(7));
        assert!(packet.fields.contains_key("prices"));
        assert!(!packet.starts_session());
    }

    #[test]
    fn session_start_requires_synchronization_id() {
        let mut packet = Packet::new("account-1", SYNCHRONIZATION_STARTED);
        assert!(!packet.starts_session());

        packet.synchronization_id = Some("ABCD".to_string());
        assert!(packet.starts_session());
    }
}
