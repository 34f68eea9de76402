//! Message feed: the mesh message log seen from this console's node.

use syncmesh_protocol::{Message, BROADCAST};

use crate::error::ConsoleError;
use crate::identity::Identity;

pub const ALL_SERVERS_LABEL: &str = "ALL SERVERS";
pub const NO_MESSAGES_LINE: &str = "No messages yet";
pub const MESSAGES_ERROR_LINE: &str = "Error loading messages";

/// How a visible message relates to the current node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    SentAndReceived,
    Sent,
    Received,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::SentAndReceived => "SENT & RECEIVED",
            Direction::Sent => "SENT",
            Direction::Received => "RECEIVED",
        }
    }
}

/// Classify a message against the current node id.
///
/// Sent means this node originated it; received means it was a
/// broadcast or addressed to this node. Messages that are neither are
/// not relevant here and yield `None`.
pub fn classify(message: &Message, current_server_id: &str) -> Option<Direction> {
    let is_sent = message.origin_node_id.as_deref() == Some(current_server_id);
    let receiver = message.effective_receiver();
    let is_received = receiver == BROADCAST || receiver == current_server_id;
    match (is_sent, is_received) {
        (true, true) => Some(Direction::SentAndReceived),
        (true, false) => Some(Direction::Sent),
        (false, true) => Some(Direction::Received),
        (false, false) => None,
    }
}

/// Escape `&`, `<`, `>` and `"` for markup output. Apostrophes pass
/// through unchanged.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub direction: Direction,
    pub sender: String,
    pub receiver: String,
    pub origin: String,
    pub lamport: String,
    pub vector_clock: String,
    /// Payload after markup escaping.
    pub payload: String,
    pub timestamp: String,
}

impl FeedEntry {
    fn from_message(message: &Message, direction: Direction) -> Self {
        let receiver = message.effective_receiver();
        let receiver = if receiver == BROADCAST {
            ALL_SERVERS_LABEL.to_string()
        } else {
            receiver.to_string()
        };
        Self {
            id: message.id.clone().unwrap_or_default(),
            direction,
            sender: non_empty_or(message.sender.as_deref(), "unknown"),
            receiver,
            origin: non_empty_or(message.origin_node_id.as_deref(), "unknown"),
            lamport: match message.lamport {
                Some(l) if l != 0 => l.to_string(),
                _ => "N/A".to_string(),
            },
            vector_clock: message
                .vector_clock
                .as_ref()
                .filter(|vc| !vc.is_empty())
                .map(|vc| {
                    vc.iter()
                        .map(|(node, tick)| match tick {
                            Some(tick) => format!("{}={}", node, tick),
                            None => format!("{}=?", node),
                        })
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default(),
            payload: escape_html(message.payload.as_deref().unwrap_or("")),
            timestamp: message
                .timestamp
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            self.direction.label().to_string(),
            format!("From: {} -> To: {}", self.sender, self.receiver),
            format!("Origin Node: {}", self.origin),
            format!("Lamport Clock: {}", self.lamport),
        ];
        if !self.vector_clock.is_empty() {
            lines.push(format!("Vector Clock: {}", self.vector_clock));
        }
        lines.push(self.payload.clone());
        lines.push(self.timestamp.clone());
        lines
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    NotLoaded,
    Empty,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct MessageFeedView {
    state: FeedState,
    entries: Vec<FeedEntry>,
    fetched: usize,
}

impl Default for MessageFeedView {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageFeedView {
    pub fn new() -> Self {
        Self {
            state: FeedState::NotLoaded,
            entries: Vec::new(),
            fetched: 0,
        }
    }

    /// Replace the feed with the relevant subset of `messages`.
    pub fn apply(&mut self, messages: &[Message], identity: &Identity) {
        self.fetched = messages.len();
        if messages.is_empty() {
            self.entries.clear();
            self.state = FeedState::Empty;
            return;
        }

        let current = identity.current_server_id();
        self.entries = messages
            .iter()
            .filter_map(|m| {
                let direction = classify(m, current);
                if direction.is_none() {
                    tracing::trace!(
                        id = m.id.as_deref().unwrap_or(""),
                        origin = m.origin_node_id.as_deref().unwrap_or(""),
                        receiver = m.effective_receiver(),
                        current,
                        "Message not relevant to this node"
                    );
                }
                direction.map(|d| FeedEntry::from_message(m, d))
            })
            .collect();
        self.state = FeedState::Loaded;
    }

    pub fn apply_error(&mut self, error: &ConsoleError) {
        tracing::warn!(error = %error, "Message feed refresh failed");
        self.entries.clear();
        self.fetched = 0;
        self.state = FeedState::Failed;
    }

    pub fn state(&self) -> FeedState {
        self.state
    }

    pub fn entries(&self) -> &[FeedEntry] {
        &self.entries
    }

    /// Messages in the last fetched snapshot, relevant or not.
    pub fn fetched(&self) -> usize {
        self.fetched
    }

    pub fn lines(&self) -> Vec<String> {
        match self.state {
            FeedState::NotLoaded => Vec::new(),
            FeedState::Empty => vec![NO_MESSAGES_LINE.to_string()],
            FeedState::Failed => vec![MESSAGES_ERROR_LINE.to_string()],
            FeedState::Loaded => self.entries.iter().flat_map(FeedEntry::lines).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(origin: &str, sender: &str, receiver: &str) -> Message {
        Message {
            id: Some("m".into()),
            sender: Some(sender.into()),
            receiver: Some(receiver.into()),
            origin_node_id: Some(origin.into()),
            payload: Some("p".into()),
            ..Default::default()
        }
    }

    #[test]
    fn broadcast_from_self_is_sent_and_received() {
        let m = msg("server-8081", "server-8081", BROADCAST);
        assert_eq!(classify(&m, "server-8081"), Some(Direction::SentAndReceived));
        let entry = FeedEntry::from_message(&m, Direction::SentAndReceived);
        assert_eq!(entry.receiver, ALL_SERVERS_LABEL);
        assert_eq!(entry.direction.label(), "SENT & RECEIVED");
    }

    #[test]
    fn unrelated_unicast_is_dropped() {
        let m = msg("server-9090", "server-9090", "server-7070");
        assert_eq!(classify(&m, "server-8081"), None);
    }

    #[test]
    fn unicast_to_self_is_received() {
        let m = msg("server-9090", "server-9090", "server-8081");
        assert_eq!(classify(&m, "server-8081"), Some(Direction::Received));
    }

    #[test]
    fn sent_uses_origin_not_sender() {
        let relayed = msg("server-8081", "server-9090", "server-7070");
        assert_eq!(classify(&relayed, "server-8081"), Some(Direction::Sent));
        let spoofed = msg("server-9090", "server-8081", "server-7070");
        assert_eq!(classify(&spoofed, "server-8081"), None);
    }

    #[test]
    fn visibility_matches_rule_for_all_combinations() {
        let ids = ["server-8081", "server-9090", BROADCAST, ""];
        for origin in ids {
            for receiver in ids {
                let m = msg(origin, "s", receiver);
                let expected = origin == "server-8081"
                    || m.effective_receiver() == BROADCAST
                    || m.effective_receiver() == "server-8081";
                assert_eq!(classify(&m, "server-8081").is_some(), expected);
            }
        }
    }

    #[test]
    fn escaping_leaves_apostrophe() {
        assert_eq!(
            escape_html(r#"<b>"Tom & Jerry's"</b>"#),
            "&lt;b&gt;&quot;Tom &amp; Jerry's&quot;&lt;/b&gt;"
        );
    }

    #[test]
    fn missing_fields_render_fallbacks() {
        let m = Message {
            receiver: Some("server-8081".into()),
            lamport: Some(0),
            ..Default::default()
        };
        let entry = FeedEntry::from_message(&m, Direction::Received);
        assert_eq!(entry.sender, "unknown");
        assert_eq!(entry.origin, "unknown");
        assert_eq!(entry.lamport, "N/A");
        assert_eq!(entry.timestamp, "");
    }

    #[test]
    fn null_vector_clock_tick_renders_placeholder() {
        let mut m = msg("server-8081", "server-8081", BROADCAST);
        m.vector_clock = Some(
            [("a".to_string(), Some(2)), ("b".to_string(), None)]
                .into_iter()
                .collect(),
        );
        let entry = FeedEntry::from_message(&m, Direction::SentAndReceived);
        assert_eq!(entry.vector_clock, "a=2, b=?");
    }

    #[test]
    fn empty_snapshot_shows_placeholder_but_filtered_snapshot_does_not() {
        let id = Identity::from_base_url("http://localhost:8081").unwrap();
        let mut view = MessageFeedView::new();
        view.apply(&[], &id);
        assert_eq!(view.lines(), vec![NO_MESSAGES_LINE.to_string()]);

        view.apply(&[msg("a", "a", "b")], &id);
        assert_eq!(view.state(), FeedState::Loaded);
        assert!(view.lines().is_empty());
        assert_eq!(view.fetched(), 1);
    }

    #[test]
    fn failure_renders_single_line() {
        let id = Identity::from_base_url("http://localhost:8081").unwrap();
        let mut view = MessageFeedView::new();
        view.apply(&[msg("server-8081", "x", "y")], &id);
        view.apply_error(&ConsoleError::Config("x".into()));
        assert_eq!(view.lines(), vec![MESSAGES_ERROR_LINE.to_string()]);
        assert!(view.entries().is_empty());
    }
}
