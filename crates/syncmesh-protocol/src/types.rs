use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants::{BROADCAST, MISSING_RECEIVER};
use crate::error::ProtocolError;

/// A mesh node as published in the registry.
///
/// Nodes are read-only snapshots; the server owns their lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl Node {
    pub fn new(id: Option<&str>, host: &str, port: u16) -> Self {
        Self {
            id: id.map(str::to_string),
            host: host.to_string(),
            port: Some(port),
        }
    }

    /// The explicit id, if the registry entry carries a non-empty one.
    pub fn explicit_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }

    /// `host:port`, with an empty port when the registry omitted it.
    pub fn address(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => format!("{}:", self.host),
        }
    }

    /// Logical id: the explicit id, or `host:port` when absent.
    pub fn node_id(&self) -> String {
        self.explicit_id()
            .map(str::to_string)
            .unwrap_or_else(|| self.address())
    }
}

/// Message timestamp as served: ISO-8601 text or a numeric epoch value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageTimestamp {
    Text(String),
    Epoch(serde_json::Number),
}

impl fmt::Display for MessageTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageTimestamp::Text(s) => f.write_str(s),
            MessageTimestamp::Epoch(n) => write!(f, "{}", n),
        }
    }
}

/// A message from the mesh-wide message log.
///
/// `origin_node_id` names the node that created the message; `sender`
/// and `receiver` are logical endpoints and may differ from it when a
/// broadcast is relayed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Option<String>,
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub origin_node_id: Option<String>,
    pub payload: Option<String>,
    pub lamport: Option<u64>,
    pub timestamp: Option<MessageTimestamp>,
    /// Ticks per node; a `null` tick is kept as `None`.
    pub vector_clock: Option<BTreeMap<String, Option<u64>>>,
}

impl Message {
    /// Receiver as used for classification; a missing receiver reads as `all`.
    pub fn effective_receiver(&self) -> &str {
        self.receiver
            .as_deref()
            .filter(|r| !r.is_empty())
            .unwrap_or(MISSING_RECEIVER)
    }

    pub fn is_broadcast(&self) -> bool {
        self.effective_receiver() == BROADCAST
    }
}

/// Body of `POST /api/messages/send`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub sender: String,
    pub receiver: String,
    pub payload: String,
}

/// Decode a JSON array body; `null` decodes as an empty list.
pub fn decode_list<T: DeserializeOwned>(body: &[u8]) -> Result<Vec<T>, ProtocolError> {
    let items: Option<Vec<T>> = serde_json::from_slice(body)?;
    Ok(items.unwrap_or_default())
}

/// Decode the heartbeat list body. Items that are not strings are kept
/// as their JSON text, so one odd entry does not hide the others.
pub fn decode_heartbeats(body: &[u8]) -> Result<Vec<String>, ProtocolError> {
    let items: Option<Vec<serde_json::Value>> = serde_json::from_slice(body)?;
    Ok(items
        .unwrap_or_default()
        .into_iter()
        .map(|item| match item {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Decode the replica list body.
///
/// Any well-formed JSON that is not an array yields `Ok(None)`; array
/// items that are not strings are rendered with their JSON text.
pub fn decode_replicas(body: &[u8]) -> Result<Option<Vec<String>>, ProtocolError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    match value {
        serde_json::Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Null => String::new(),
                    other => other.to_string(),
                })
                .collect(),
        )),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_without_id_synthesizes_address() {
        let node: Node = serde_json::from_str(r#"{"host":"10.0.0.2","port":9090}"#).unwrap();
        assert_eq!(node.explicit_id(), None);
        assert_eq!(node.node_id(), "10.0.0.2:9090");
    }

    #[test]
    fn empty_id_counts_as_absent() {
        let node: Node =
            serde_json::from_str(r#"{"id":"","host":"localhost","port":8081}"#).unwrap();
        assert_eq!(node.explicit_id(), None);
        assert_eq!(node.node_id(), "localhost:8081");
    }

    #[test]
    fn null_host_reads_as_empty() {
        let node: Node = serde_json::from_str(r#"{"id":"n","host":null,"port":1}"#).unwrap();
        assert_eq!(node.host, "");
        assert_eq!(node.address(), ":1");
    }

    #[test]
    fn missing_port_leaves_trailing_colon() {
        let node: Node = serde_json::from_str(r#"{"host":"localhost"}"#).unwrap();
        assert_eq!(node.address(), "localhost:");
    }

    #[test]
    fn message_parses_camel_case_and_numeric_timestamp() {
        let body = r#"{
            "id": "m1",
            "sender": "server-8081",
            "receiver": "BROADCAST",
            "originNodeId": "server-8081",
            "payload": "hi",
            "lamport": 7,
            "timestamp": 1700000000.5,
            "vectorClock": {"server-8081": 3}
        }"#;
        let msg: Message = serde_json::from_str(body).unwrap();
        assert_eq!(msg.origin_node_id.as_deref(), Some("server-8081"));
        assert!(msg.is_broadcast());
        assert_eq!(msg.lamport, Some(7));
        assert_eq!(msg.timestamp.unwrap().to_string(), "1700000000.5");
        assert_eq!(msg.vector_clock.unwrap().get("server-8081"), Some(&Some(3)));
    }

    #[test]
    fn missing_receiver_reads_as_all() {
        let msg = Message::default();
        assert_eq!(msg.effective_receiver(), "all");
        assert!(!msg.is_broadcast());
    }

    #[test]
    fn null_list_decodes_empty() {
        let nodes: Vec<Node> = decode_list(b"null").unwrap();
        assert!(nodes.is_empty());
    }

    #[test]
    fn heartbeats_keep_non_string_items() {
        assert_eq!(
            decode_heartbeats(br#"["server-1 ok", 42, null]"#).unwrap(),
            vec!["server-1 ok", "42", "null"]
        );
        assert!(decode_heartbeats(b"null").unwrap().is_empty());
        assert!(decode_heartbeats(br#"{"a":1}"#).is_err());
    }

    #[test]
    fn replicas_non_array_is_none() {
        assert_eq!(decode_replicas(br#"{"a":1}"#).unwrap(), None);
        assert_eq!(
            decode_replicas(br#"["http://a:1", 2]"#).unwrap(),
            Some(vec!["http://a:1".to_string(), "2".to_string()])
        );
        assert!(decode_replicas(b"not json").is_err());
    }
}
