//! Admin action panel: single-request operations whose results land in
//! the shared status region.

use crate::api::MeshApi;
use crate::error::{ConsoleError, Result};
use crate::status_log::{LogLevel, LogMode};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AdminAction {
    Heartbeats,
    Leader,
    Replicas,
    RefreshReplicas,
    TriggerElection,
    Partition { enable: bool },
    Replay,
    Unicast { target: String },
}

/// What an action's request produced, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminOutcome {
    Heartbeats(Vec<String>),
    Leader(String),
    Replicas(Option<Vec<String>>),
    Text(String),
}

impl AdminAction {
    pub fn name(&self) -> &'static str {
        match self {
            AdminAction::Heartbeats => "heartbeats",
            AdminAction::Leader => "leader",
            AdminAction::Replicas => "replicas",
            AdminAction::RefreshReplicas => "refresh-replicas",
            AdminAction::TriggerElection => "trigger-election",
            AdminAction::Partition { enable: true } => "partition-enable",
            AdminAction::Partition { enable: false } => "partition-disable",
            AdminAction::Replay => "replay",
            AdminAction::Unicast { .. } => "unicast",
        }
    }

    /// Status views replace each other; partition toggles and
    /// diagnostics accumulate.
    pub fn log_mode(&self) -> LogMode {
        match self {
            AdminAction::Heartbeats
            | AdminAction::Leader
            | AdminAction::Replicas
            | AdminAction::RefreshReplicas
            | AdminAction::TriggerElection
            | AdminAction::Replay => LogMode::Clear,
            AdminAction::Partition { .. } | AdminAction::Unicast { .. } => LogMode::Append,
        }
    }

    pub async fn execute(&self, api: &MeshApi) -> Result<AdminOutcome> {
        match self {
            AdminAction::Heartbeats => api.heartbeats().await.map(AdminOutcome::Heartbeats),
            AdminAction::Leader => api.leader().await.map(AdminOutcome::Leader),
            AdminAction::Replicas => api.replicas().await.map(AdminOutcome::Replicas),
            AdminAction::RefreshReplicas => api.refresh_replicas().await.map(AdminOutcome::Text),
            AdminAction::TriggerElection => api.trigger_election().await.map(AdminOutcome::Text),
            AdminAction::Partition { enable } => {
                api.set_partition(*enable).await.map(AdminOutcome::Text)
            }
            AdminAction::Replay => api.replay().await.map(AdminOutcome::Text),
            AdminAction::Unicast { target } => {
                api.test_unicast(target).await.map(AdminOutcome::Text)
            }
        }
    }

    /// Render a result as status lines. A failure is always exactly one
    /// error line naming the action.
    pub fn render(&self, result: &Result<AdminOutcome>) -> Vec<(LogLevel, String)> {
        match result {
            Ok(outcome) => self.render_outcome(outcome),
            Err(e) => vec![(LogLevel::Error, self.failure_line(e))],
        }
    }

    fn render_outcome(&self, outcome: &AdminOutcome) -> Vec<(LogLevel, String)> {
        let info = |s: String| vec![(LogLevel::Info, s)];
        match outcome {
            AdminOutcome::Heartbeats(beats) if beats.is_empty() => {
                info("No heartbeats".to_string())
            }
            AdminOutcome::Heartbeats(beats) => beats
                .iter()
                .map(|b| (LogLevel::Info, format!("Heartbeat: {}", b)))
                .collect(),
            AdminOutcome::Leader(leader) => info(format!(
                "Leader: {}",
                if leader.is_empty() { "unknown" } else { leader }
            )),
            AdminOutcome::Replicas(Some(list)) => info(format!("Replicas: {}", list.join(", "))),
            AdminOutcome::Replicas(None) => info("Replicas: unknown".to_string()),
            AdminOutcome::Text(text) => {
                let level = match self {
                    AdminAction::Partition { .. } | AdminAction::Unicast { .. } => {
                        LogLevel::Success
                    }
                    _ => LogLevel::Info,
                };
                let prefix = match self {
                    AdminAction::RefreshReplicas => "Replica refresh",
                    AdminAction::TriggerElection => "Election",
                    AdminAction::Partition { .. } => "Partition",
                    AdminAction::Replay => "Replay",
                    AdminAction::Unicast { .. } => "Unicast",
                    _ => self.name(),
                };
                vec![(level, format!("{}: {}", prefix, text))]
            }
        }
    }

    fn failure_line(&self, error: &ConsoleError) -> String {
        match self {
            AdminAction::Heartbeats => "Error loading heartbeats".to_string(),
            AdminAction::Leader => "Error loading leader".to_string(),
            AdminAction::Replicas => "Error loading replicas".to_string(),
            AdminAction::RefreshReplicas => "Error refreshing replicas".to_string(),
            AdminAction::TriggerElection => format!("Election trigger failed: {}", error),
            AdminAction::Partition { .. } => "Error toggling partition mode".to_string(),
            AdminAction::Replay => "Error triggering replay".to_string(),
            AdminAction::Unicast { target } => format!("Unicast to {} failed: {}", target, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(lines: Vec<(LogLevel, String)>) -> Vec<String> {
        lines.into_iter().map(|(_, t)| t).collect()
    }

    #[test]
    fn heartbeats_render_one_line_each_or_placeholder() {
        let a = AdminAction::Heartbeats;
        assert_eq!(
            texts(a.render(&Ok(AdminOutcome::Heartbeats(vec![]))),),
            vec!["No heartbeats"]
        );
        assert_eq!(
            texts(a.render(&Ok(AdminOutcome::Heartbeats(vec![
                "server-1:1700".into(),
                "server-2:1701".into()
            ])))),
            vec!["Heartbeat: server-1:1700", "Heartbeat: server-2:1701"]
        );
    }

    #[test]
    fn empty_leader_is_unknown() {
        let a = AdminAction::Leader;
        assert_eq!(
            texts(a.render(&Ok(AdminOutcome::Leader(String::new())))),
            vec!["Leader: unknown"]
        );
        assert_eq!(
            texts(a.render(&Ok(AdminOutcome::Leader("server-8082".into())))),
            vec!["Leader: server-8082"]
        );
    }

    #[test]
    fn replicas_join_or_unknown() {
        let a = AdminAction::Replicas;
        assert_eq!(
            texts(a.render(&Ok(AdminOutcome::Replicas(Some(vec![
                "http://a:1".into(),
                "http://b:2".into()
            ]))))),
            vec!["Replicas: http://a:1, http://b:2"]
        );
        assert_eq!(
            texts(a.render(&Ok(AdminOutcome::Replicas(None)))),
            vec!["Replicas: unknown"]
        );
    }

    #[test]
    fn failures_are_single_named_line() {
        let err = ConsoleError::Response {
            status: 500,
            body: "boom".into(),
        };
        let lines = AdminAction::Partition { enable: true }.render(&Err(err));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].0, LogLevel::Error);
        assert_eq!(lines[0].1, "Error toggling partition mode");

        let err = ConsoleError::Config("down".into());
        let lines = AdminAction::TriggerElection.render(&Err(err));
        assert_eq!(lines[0].1, "Election trigger failed: config error: down");
    }

    #[test]
    fn log_modes() {
        assert_eq!(AdminAction::Heartbeats.log_mode(), LogMode::Clear);
        assert_eq!(AdminAction::TriggerElection.log_mode(), LogMode::Clear);
        assert_eq!(
            AdminAction::Partition { enable: false }.log_mode(),
            LogMode::Append
        );
    }
}
