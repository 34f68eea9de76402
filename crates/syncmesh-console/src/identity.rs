//! Which mesh node this console speaks for.
//!
//! The console starts from a guess derived from its own connection
//! (`server-<port>`) and corrects it once the node registry shows an
//! entry that matches either the guess or the console's own address.

use reqwest::Url;
use syncmesh_protocol::Node;

use crate::error::{ConsoleError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Logical node id; refined by [`Identity::resolve`].
    current_server_id: String,
    /// `host:port` of the console's own connection. Never changes.
    current_server: String,
}

impl Identity {
    pub fn new(current_server: impl Into<String>, initial_guess: impl Into<String>) -> Self {
        Self {
            current_server_id: initial_guess.into(),
            current_server: current_server.into(),
        }
    }

    /// Derive the identity from the admin API base URL.
    ///
    /// The port is the explicit one or the scheme default.
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url).map_err(|e| ConsoleError::BaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        let host = url.host_str().ok_or_else(|| ConsoleError::BaseUrl {
            url: base_url.to_string(),
            reason: "missing host".to_string(),
        })?;
        let port = url
            .port_or_known_default()
            .map(|p| p.to_string())
            .unwrap_or_default();
        Ok(Self::new(format!("{}:{}", host, port), format!("server-{}", port)))
    }

    /// Replace the initial guess (for example from `--node-id`).
    pub fn with_guess(mut self, guess: impl Into<String>) -> Self {
        self.current_server_id = guess.into();
        self
    }

    pub fn current_server_id(&self) -> &str {
        &self.current_server_id
    }

    pub fn current_server(&self) -> &str {
        &self.current_server
    }

    /// A node is current if its id matches the present belief or its
    /// address matches the console's own connection.
    pub fn is_current(&self, node: &Node) -> bool {
        node.node_id() == self.current_server_id || node.address() == self.current_server
    }

    /// Run one full pass over a registry snapshot, adopting the explicit
    /// id of every matching node in order. Returns `true` if the id
    /// changed. No match leaves the previous belief in place.
    pub fn resolve(&mut self, nodes: &[Node]) -> bool {
        let before = self.current_server_id.clone();
        for node in nodes {
            if !self.is_current(node) {
                continue;
            }
            if let Some(id) = node.explicit_id() {
                if id != self.current_server_id {
                    self.current_server_id = id.to_string();
                }
            }
        }
        let changed = before != self.current_server_id;
        if changed {
            tracing::info!(
                from = %before,
                to = %self.current_server_id,
                server = %self.current_server,
                "Resolved console identity"
            );
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_comes_from_base_url_port() {
        let id = Identity::from_base_url("http://localhost:8081").unwrap();
        assert_eq!(id.current_server_id(), "server-8081");
        assert_eq!(id.current_server(), "localhost:8081");
    }

    #[test]
    fn default_port_is_used_when_url_has_none() {
        let id = Identity::from_base_url("https://mesh.example.com/").unwrap();
        assert_eq!(id.current_server(), "mesh.example.com:443");
        assert_eq!(id.current_server_id(), "server-443");
    }

    #[test]
    fn bad_url_is_rejected() {
        assert!(matches!(
            Identity::from_base_url("not a url"),
            Err(ConsoleError::BaseUrl { .. })
        ));
    }

    #[test]
    fn address_match_adopts_explicit_id() {
        let mut id = Identity::from_base_url("http://localhost:8081").unwrap();
        let nodes = vec![
            Node::new(Some("alpha"), "localhost", 8081),
            Node::new(Some("beta"), "localhost", 8082),
        ];
        assert!(id.resolve(&nodes));
        assert_eq!(id.current_server_id(), "alpha");
    }

    #[test]
    fn match_without_explicit_id_keeps_guess() {
        let mut id = Identity::from_base_url("http://localhost:8081").unwrap();
        let nodes = vec![Node::new(None, "localhost", 8081)];
        assert!(!id.resolve(&nodes));
        assert_eq!(id.current_server_id(), "server-8081");
    }

    #[test]
    fn no_match_keeps_previous_guess() {
        let mut id = Identity::from_base_url("http://localhost:8081").unwrap();
        let nodes = vec![Node::new(Some("gamma"), "10.0.0.9", 7000)];
        assert!(!id.resolve(&nodes));
        assert_eq!(id.current_server_id(), "server-8081");
    }

    #[test]
    fn resolution_is_idempotent() {
        let snapshots = vec![
            vec![
                Node::new(Some("server-8081"), "10.0.0.1", 9000),
                Node::new(Some("b"), "localhost", 8081),
            ],
            vec![
                Node::new(Some("a"), "localhost", 8081),
                Node::new(Some("server-8081"), "10.0.0.1", 9000),
            ],
            vec![Node::new(None, "localhost", 8081), Node::new(Some("x"), "h", 1)],
            vec![],
        ];
        for nodes in snapshots {
            let mut id = Identity::from_base_url("http://localhost:8081").unwrap();
            id.resolve(&nodes);
            let first = id.current_server_id().to_string();
            assert!(!id.resolve(&nodes), "second pass must not change {}", first);
            assert_eq!(id.current_server_id(), first);
        }
    }

    #[test]
    fn explicit_guess_is_refined_by_registry() {
        let mut id = Identity::from_base_url("http://127.0.0.1:9000")
            .unwrap()
            .with_guess("custom");
        let nodes = vec![Node::new(Some("custom"), "10.0.0.5", 9000)];
        assert!(!id.resolve(&nodes));
        assert!(id.is_current(&nodes[0]));
    }
}
