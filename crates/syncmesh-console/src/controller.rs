//! Console controller: owns every view plus the identity, and applies
//! request completions in arrival order.
//!
//! Requests run as tokio tasks and report back over an mpsc channel.
//! The nodes and messages views keep only the newest request's result;
//! the shared status region uses [`LogTicket`]s for the same purpose.

use std::collections::HashMap;
use std::time::Duration;

use syncmesh_protocol::{Message, Node, SendMessageRequest};
use tokio::sync::mpsc;

use crate::admin::{AdminAction, AdminOutcome};
use crate::api::MeshApi;
use crate::error::Result;
use crate::feed::MessageFeedView;
use crate::generation::RequestTracker;
use crate::identity::Identity;
use crate::registry::RegistryView;
use crate::send::{self, SendForm};
use crate::status_log::{LogLevel, LogTicket, StatusLog};

pub const DEFAULT_ELECTION_RECHECK_DELAY: Duration = Duration::from_millis(500);

/// Operator controls. Each is disabled while one of its requests is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    Nodes,
    Messages,
    Heartbeats,
    Leader,
    Replicas,
    RefreshReplicas,
    Election,
    Partition,
    Replay,
    Unicast,
    Send,
}

impl Trigger {
    pub fn for_action(action: &AdminAction) -> Self {
        match action {
            AdminAction::Heartbeats => Trigger::Heartbeats,
            AdminAction::Leader => Trigger::Leader,
            AdminAction::Replicas => Trigger::Replicas,
            AdminAction::RefreshReplicas => Trigger::RefreshReplicas,
            AdminAction::TriggerElection => Trigger::Election,
            AdminAction::Partition { .. } => Trigger::Partition,
            AdminAction::Replay => Trigger::Replay,
            AdminAction::Unicast { .. } => Trigger::Unicast,
        }
    }
}

/// In-flight request counts per trigger.
#[derive(Debug, Default)]
pub struct TriggerSet {
    in_flight: HashMap<Trigger, usize>,
}

impl TriggerSet {
    pub fn acquire(&mut self, trigger: Trigger) {
        *self.in_flight.entry(trigger).or_insert(0) += 1;
    }

    pub fn release(&mut self, trigger: Trigger) {
        if let Some(count) = self.in_flight.get_mut(&trigger) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.in_flight.remove(&trigger);
            }
        }
    }

    pub fn is_enabled(&self, trigger: Trigger) -> bool {
        !self.in_flight.contains_key(&trigger)
    }

    pub fn busy(&self) -> Vec<Trigger> {
        self.in_flight.keys().copied().collect()
    }
}

/// A finished request, delivered back to the controller.
#[derive(Debug)]
pub enum Completion {
    Nodes {
        generation: u64,
        result: Result<Vec<Node>>,
    },
    Messages {
        generation: u64,
        result: Result<Vec<Message>>,
    },
    Admin {
        action: AdminAction,
        ticket: LogTicket,
        result: Result<AdminOutcome>,
    },
    Send {
        request: SendMessageRequest,
        result: Result<()>,
    },
    ElectionRecheck {
        ticket: LogTicket,
    },
}

pub struct Controller {
    api: MeshApi,
    identity: Identity,
    registry: RegistryView,
    feed: MessageFeedView,
    status: StatusLog,
    payload: String,
    triggers: TriggerSet,
    node_requests: RequestTracker,
    message_requests: RequestTracker,
    election_recheck_delay: Duration,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    pending: usize,
}

impl Controller {
    pub fn new(api: MeshApi, identity: Identity) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            identity,
            registry: RegistryView::new(),
            feed: MessageFeedView::new(),
            status: StatusLog::new(),
            payload: String::new(),
            triggers: TriggerSet::default(),
            node_requests: RequestTracker::new(),
            message_requests: RequestTracker::new(),
            election_recheck_delay: DEFAULT_ELECTION_RECHECK_DELAY,
            tx,
            rx,
            pending: 0,
        }
    }

    pub fn with_election_recheck_delay(mut self, delay: Duration) -> Self {
        self.election_recheck_delay = delay;
        self
    }

    pub fn with_status_log(mut self, status: StatusLog) -> Self {
        self.status = status;
        self
    }

    // ── Operator triggers ──────────────────────────────────────────

    /// Refresh the node registry. Returns `false` if a refresh is
    /// already in flight.
    pub fn refresh_nodes(&mut self) -> bool {
        if !self.triggers.is_enabled(Trigger::Nodes) {
            return false;
        }
        self.request_nodes();
        true
    }

    pub fn refresh_messages(&mut self) -> bool {
        if !self.triggers.is_enabled(Trigger::Messages) {
            return false;
        }
        self.request_messages();
        true
    }

    pub fn run_admin(&mut self, action: AdminAction) -> bool {
        if !self.triggers.is_enabled(Trigger::for_action(&action)) {
            return false;
        }
        let ticket = self.status.open(action.log_mode());
        self.spawn_admin(action, ticket);
        true
    }

    /// Validate and submit a message. Validation failures are logged and
    /// never reach the network.
    pub fn submit(&mut self, form: &SendForm) -> bool {
        if !self.triggers.is_enabled(Trigger::Send) {
            return false;
        }
        let request = match form.validate() {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!(error = %e, "Send rejected");
                self.status.push(LogLevel::Error, e.to_string());
                return false;
            }
        };
        self.status.push(LogLevel::Info, send::pending_line(&request));
        self.triggers.acquire(Trigger::Send);
        self.pending += 1;

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.send(&request).await;
            let _ = tx.send(Completion::Send { request, result });
        });
        true
    }

    /// Submit the form as currently filled in on screen.
    pub fn submit_current(&mut self) -> bool {
        let form = self.current_form();
        self.submit(&form)
    }

    pub fn current_form(&self) -> SendForm {
        SendForm::new(
            self.registry.sender().selected_value(),
            self.registry.receiver().selected_value(),
            &self.payload,
        )
    }

    pub fn cycle_sender(&mut self, forward: bool) {
        self.registry.sender_mut().cycle(forward);
    }

    pub fn cycle_receiver(&mut self, forward: bool) {
        self.registry.receiver_mut().cycle(forward);
    }

    /// Append an operator-facing line that belongs to no request.
    pub fn note(&mut self, level: LogLevel, text: impl Into<String>) {
        self.status.push(level, text);
    }

    pub fn select_sender(&mut self, value: &str) {
        self.registry.sender_mut().select_value(value);
    }

    pub fn select_receiver(&mut self, value: &str) {
        self.registry.receiver_mut().select_value(value);
    }

    // ── Request plumbing ───────────────────────────────────────────

    fn request_nodes(&mut self) {
        let generation = self.node_requests.issue();
        self.triggers.acquire(Trigger::Nodes);
        self.pending += 1;

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.nodes().await;
            let _ = tx.send(Completion::Nodes { generation, result });
        });
    }

    fn request_messages(&mut self) {
        let generation = self.message_requests.issue();
        self.triggers.acquire(Trigger::Messages);
        self.pending += 1;

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.messages().await;
            let _ = tx.send(Completion::Messages { generation, result });
        });
    }

    fn spawn_admin(&mut self, action: AdminAction, ticket: LogTicket) {
        self.triggers.acquire(Trigger::for_action(&action));
        self.pending += 1;

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = action.execute(&api).await;
            let _ = tx.send(Completion::Admin {
                action,
                ticket,
                result,
            });
        });
    }

    fn schedule_election_recheck(&mut self, ticket: LogTicket) {
        self.pending += 1;
        let delay = self.election_recheck_delay;
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(Completion::ElectionRecheck { ticket });
        });
    }

    // ── Completion handling ────────────────────────────────────────

    pub fn apply(&mut self, completion: Completion) {
        self.pending = self.pending.saturating_sub(1);
        match completion {
            Completion::Nodes { generation, result } => {
                self.triggers.release(Trigger::Nodes);
                if self.node_requests.is_current(generation) {
                    match result {
                        Ok(nodes) => {
                            self.registry.apply(&nodes, &mut self.identity);
                        }
                        Err(e) => self.registry.apply_error(&e),
                    }
                } else {
                    tracing::debug!(generation, "Dropping superseded node registry result");
                }
                // Identity may have moved; the feed is re-derived either way.
                self.request_messages();
            }
            Completion::Messages { generation, result } => {
                self.triggers.release(Trigger::Messages);
                if !self.message_requests.is_current(generation) {
                    tracing::debug!(generation, "Dropping superseded message feed result");
                    return;
                }
                match result {
                    Ok(messages) => self.feed.apply(&messages, &self.identity),
                    Err(e) => self.feed.apply_error(&e),
                }
            }
            Completion::Admin {
                action,
                ticket,
                result,
            } => {
                self.triggers.release(Trigger::for_action(&action));
                if let Err(e) = &result {
                    tracing::warn!(action = action.name(), error = %e, "Admin action failed");
                }
                for (level, line) in action.render(&result) {
                    self.status.write(&ticket, level, line);
                }
                if action == AdminAction::TriggerElection
                    && result.is_ok()
                    && self.status.is_live(&ticket)
                {
                    self.schedule_election_recheck(ticket);
                }
            }
            Completion::Send { request, result } => {
                self.triggers.release(Trigger::Send);
                match result {
                    Ok(()) => {
                        tracing::info!(
                            sender = %request.sender,
                            receiver = %request.receiver,
                            "Message sent"
                        );
                        self.payload.clear();
                        self.status
                            .push(LogLevel::Success, send::success_line(&request));
                        self.request_messages();
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Send failed");
                        self.status.push(LogLevel::Error, send::failure_line(&e));
                    }
                }
            }
            Completion::ElectionRecheck { ticket } => {
                if self.status.is_live(&ticket) {
                    self.spawn_admin(AdminAction::Leader, ticket);
                } else {
                    tracing::debug!("Election view was replaced; skipping leader re-check");
                }
            }
        }
    }

    /// Apply every completion that has already arrived.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for and apply the next completion.
    pub async fn next_completion(&mut self) {
        if let Some(completion) = self.rx.recv().await {
            self.apply(completion);
        }
    }

    /// Apply completions until nothing is in flight, including follow-ups
    /// such as the post-send feed refresh and the election re-check.
    pub async fn settle(&mut self) {
        while self.pending > 0 {
            self.next_completion().await;
        }
    }

    // ── Read access ────────────────────────────────────────────────

    pub fn api(&self) -> &MeshApi {
        &self.api
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn registry(&self) -> &RegistryView {
        &self.registry
    }

    pub fn feed(&self) -> &MessageFeedView {
        &self.feed
    }

    pub fn status(&self) -> &StatusLog {
        &self.status
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut String {
        &mut self.payload
    }

    pub fn is_enabled(&self, trigger: Trigger) -> bool {
        self.triggers.is_enabled(trigger)
    }

    pub fn busy(&self) -> Vec<Trigger> {
        self.triggers.busy()
    }

    pub fn pending(&self) -> usize {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_log::LogMode;

    #[test]
    fn trigger_set_counts_overlapping_requests() {
        let mut set = TriggerSet::default();
        assert!(set.is_enabled(Trigger::Leader));
        set.acquire(Trigger::Leader);
        set.acquire(Trigger::Leader);
        set.release(Trigger::Leader);
        assert!(!set.is_enabled(Trigger::Leader));
        set.release(Trigger::Leader);
        assert!(set.is_enabled(Trigger::Leader));
        set.release(Trigger::Leader);
        assert!(set.is_enabled(Trigger::Leader));
    }

    fn controller() -> Controller {
        let api = MeshApi::new("http://127.0.0.1:9", None).unwrap();
        let identity = Identity::from_base_url("http://127.0.0.1:9").unwrap();
        Controller::new(api, identity)
    }

    #[tokio::test]
    async fn stale_messages_result_is_dropped() {
        let mut c = controller();
        let old = c.message_requests.issue();
        let new = c.message_requests.issue();
        c.pending = 2;

        let fresh = vec![Message {
            receiver: Some(syncmesh_protocol::BROADCAST.into()),
            ..Default::default()
        }];
        c.apply(Completion::Messages {
            generation: new,
            result: Ok(fresh),
        });
        c.apply(Completion::Messages {
            generation: old,
            result: Ok(vec![]),
        });
        assert_eq!(c.feed().entries().len(), 1);
        assert_eq!(c.pending(), 0);
    }

    #[tokio::test]
    async fn invalid_send_logs_and_skips_network() {
        let mut c = controller();
        let form = SendForm::new(Some("server-9"), Some("server-9"), "hi");
        assert!(!c.submit(&form));
        assert_eq!(c.pending(), 0);
        assert_eq!(
            c.status().texts(),
            vec!["Sender and receiver cannot be the same server"]
        );
    }

    #[tokio::test]
    async fn stale_admin_result_does_not_land_in_replaced_view() {
        let mut c = controller();
        let heartbeats = c.status.open(LogMode::Clear);
        let leader = c.status.open(LogMode::Clear);
        c.pending = 2;
        c.apply(Completion::Admin {
            action: AdminAction::Leader,
            ticket: leader,
            result: Ok(AdminOutcome::Leader("server-1".into())),
        });
        c.apply(Completion::Admin {
            action: AdminAction::Heartbeats,
            ticket: heartbeats,
            result: Ok(AdminOutcome::Heartbeats(vec!["late".into()])),
        });
        assert_eq!(c.status().texts(), vec!["Leader: server-1"]);
    }

    #[tokio::test]
    async fn failed_election_skips_leader_recheck() {
        let mut c = controller();
        let ticket = c.status.open(LogMode::Clear);
        c.pending = 1;
        c.apply(Completion::Admin {
            action: AdminAction::TriggerElection,
            ticket,
            result: Err(crate::error::ConsoleError::Response {
                status: 500,
                body: "no quorum".into(),
            }),
        });
        assert_eq!(c.pending(), 0);
        assert_eq!(
            c.status().texts(),
            vec!["Election trigger failed: HTTP 500: no quorum"]
        );
    }

    #[tokio::test]
    async fn successful_election_schedules_leader_recheck() {
        let mut c = controller().with_election_recheck_delay(Duration::from_secs(60));
        let ticket = c.status.open(LogMode::Clear);
        c.pending = 1;
        c.apply(Completion::Admin {
            action: AdminAction::TriggerElection,
            ticket,
            result: Ok(AdminOutcome::Text("Election triggered".into())),
        });
        assert_eq!(c.pending(), 1);
    }

    #[tokio::test]
    async fn superseded_registry_result_still_refreshes_feed() {
        let mut c = controller();
        let old = c.node_requests.issue();
        c.node_requests.issue();
        c.pending = 2;
        c.apply(Completion::Nodes {
            generation: old,
            result: Ok(vec![Node::new(Some("server-9"), "127.0.0.1", 9)]),
        });
        assert_eq!(
            c.registry().state(),
            crate::registry::RegistryState::NotLoaded
        );
        assert!(!c.is_enabled(Trigger::Messages));
        assert!(c.message_requests.is_current(1));
        assert_eq!(c.pending(), 2);
    }
}
