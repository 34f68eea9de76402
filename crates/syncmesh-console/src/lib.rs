//! SyncMesh Console - operator console for a SyncMesh node mesh
//!
//! Talks to one node's admin HTTP API: resolves which node it speaks
//! for, shows the node registry and the message feed seen from that
//! node, runs admin actions, and sends messages. Runs as an interactive
//! TUI or as one-shot subcommands.

pub mod admin;
pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod feed;
pub mod generation;
pub mod identity;
pub mod oneshot;
pub mod operator_console;
pub mod registry;
pub mod send;
pub mod status_log;

pub use admin::{AdminAction, AdminOutcome};
pub use api::MeshApi;
pub use config::ConsoleConfig;
pub use controller::{Completion, Controller, Trigger};
pub use error::{ConsoleError, Result, ValidationError};
pub use identity::Identity;
pub use send::SendForm;
pub use status_log::{LogLevel, LogMode, StatusLog};

/// Build a controller for the node named in `config`.
pub fn controller_from_config(config: &ConsoleConfig) -> Result<Controller> {
    let api = MeshApi::new(&config.base_url, config.request_timeout())?;
    let mut identity = Identity::from_base_url(&config.base_url)?;
    if let Some(node_id) = config.node_id.as_deref().filter(|id| !id.is_empty()) {
        identity = identity.with_guess(node_id);
    }
    let status = match config.status_log_capacity {
        Some(cap) => StatusLog::with_capacity_limit(cap),
        None => StatusLog::new(),
    };
    Ok(Controller::new(api, identity)
        .with_election_recheck_delay(config.election_recheck_delay())
        .with_status_log(status))
}
