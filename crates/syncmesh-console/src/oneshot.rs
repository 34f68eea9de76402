//! Scriptable one-shot commands: run one view or action, print its lines.
//!
//! Each command drives the same [`Controller`] as the interactive console
//! and waits for it to settle, so follow-ups (the feed refresh after a
//! registry pass, the leader re-check after an election) run too.

use clap::Subcommand;

use crate::admin::AdminAction;
use crate::controller::Controller;
use crate::feed::FeedState;
use crate::registry::RegistryState;
use crate::send::SendForm;
use crate::status_log::LogLevel;

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List active nodes and resolve this console's identity.
    Nodes,
    /// Show messages sent or received by this node.
    Messages,
    /// Show heartbeats.
    Heartbeats,
    /// Show the current leader.
    Leader,
    /// Show replica URLs.
    Replicas,
    /// Ask the node to refresh its replica list.
    RefreshReplicas,
    /// Trigger a leader election, then re-check the leader.
    Elect,
    /// Toggle simulated partition mode.
    Partition {
        #[arg(value_enum)]
        mode: PartitionMode,
    },
    /// Ask the node to replay its message log.
    Replay,
    /// Send a diagnostic unicast to a target node.
    Unicast { target: String },
    /// Send a message through the mesh.
    Send {
        /// Sender node id.
        #[arg(long)]
        from: String,
        /// Receiver node id, or BROADCAST.
        #[arg(long)]
        to: String,
        payload: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PartitionMode {
    Enable,
    Disable,
}

/// Printed output of a one-shot command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub lines: Vec<String>,
    pub failed: bool,
}

impl Command {
    fn admin_action(&self) -> Option<AdminAction> {
        Some(match self {
            Command::Heartbeats => AdminAction::Heartbeats,
            Command::Leader => AdminAction::Leader,
            Command::Replicas => AdminAction::Replicas,
            Command::RefreshReplicas => AdminAction::RefreshReplicas,
            Command::Elect => AdminAction::TriggerElection,
            Command::Partition { mode } => AdminAction::Partition {
                enable: *mode == PartitionMode::Enable,
            },
            Command::Replay => AdminAction::Replay,
            Command::Unicast { target } => AdminAction::Unicast {
                target: target.clone(),
            },
            _ => return None,
        })
    }
}

pub async fn run(controller: &mut Controller, command: &Command) -> Report {
    tracing::debug!(?command, "Running one-shot command");
    if let Some(action) = command.admin_action() {
        controller.run_admin(action);
        controller.settle().await;
        return status_report(controller);
    }

    match command {
        Command::Nodes => {
            controller.refresh_nodes();
            controller.settle().await;
            let mut lines = vec![identity_line(controller)];
            lines.extend(controller.registry().lines());
            Report {
                lines,
                failed: controller.registry().state() == RegistryState::Failed,
            }
        }
        Command::Messages => {
            // The registry pass resolves identity before classification.
            controller.refresh_nodes();
            controller.settle().await;
            let mut lines = vec![identity_line(controller)];
            lines.extend(controller.feed().lines());
            Report {
                lines,
                failed: controller.feed().state() == FeedState::Failed,
            }
        }
        Command::Send { from, to, payload } => {
            controller.submit(&SendForm::new(Some(from), Some(to), payload));
            controller.settle().await;
            status_report(controller)
        }
        _ => Report::default(),
    }
}

fn identity_line(controller: &Controller) -> String {
    let identity = controller.identity();
    format!(
        "Current Server: {} ({})",
        identity.current_server_id(),
        identity.current_server()
    )
}

fn status_report(controller: &Controller) -> Report {
    let entries = controller.status().entries();
    Report {
        lines: entries.iter().map(|e| e.text.clone()).collect(),
        failed: entries.iter().any(|e| e.level == LogLevel::Error),
    }
}
