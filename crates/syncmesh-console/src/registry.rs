//! Node registry view: the node list plus the sender/receiver selectors.

use syncmesh_protocol::{Node, BROADCAST};

use crate::error::ConsoleError;
use crate::identity::Identity;

pub const SENDER_PLACEHOLDER: &str = "Select sender server...";
pub const RECEIVER_PLACEHOLDER: &str = "Select receiver server...";
pub const BROADCAST_OPTION_LABEL: &str = "Broadcast to All Servers";
pub const NO_NODES_LINE: &str = "No active nodes";
pub const NODES_ERROR_LINE: &str = "Error loading nodes";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// A drop-down: a placeholder followed by options. `None` selects the
/// placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    placeholder: &'static str,
    options: Vec<SelectOption>,
    selected: Option<usize>,
}

impl Selector {
    pub fn new(placeholder: &'static str) -> Self {
        Self {
            placeholder,
            options: Vec::new(),
            selected: None,
        }
    }

    /// Drop every option and select the placeholder.
    pub fn reset(&mut self) {
        self.options.clear();
        self.selected = None;
    }

    pub fn push(&mut self, value: impl Into<String>, label: impl Into<String>) {
        self.options.push(SelectOption {
            value: value.into(),
            label: label.into(),
        });
    }

    /// Select the option carrying `value`; unknown values select the placeholder.
    pub fn select_value(&mut self, value: &str) {
        self.selected = self.options.iter().position(|o| o.value == value);
    }

    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn options(&self) -> &[SelectOption] {
        &self.options
    }

    pub fn selected_value(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(|o| o.value.as_str())
    }

    pub fn selected_label(&self) -> &str {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(|o| o.label.as_str())
            .unwrap_or(self.placeholder)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.options.iter().any(|o| o.value == value)
    }

    /// Step through placeholder and options, wrapping around.
    pub fn cycle(&mut self, forward: bool) {
        let slots = self.options.len() + 1;
        let current = self.selected.map(|i| i + 1).unwrap_or(0);
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        self.selected = next.checked_sub(1);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub node_id: String,
    pub address: String,
    pub is_current: bool,
}

impl NodeEntry {
    pub fn line(&self) -> String {
        format!(
            "{} - {}{}",
            self.node_id,
            self.address,
            if self.is_current { " (THIS SERVER)" } else { "" }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryState {
    NotLoaded,
    Empty,
    Loaded,
    Failed,
}

#[derive(Debug, Clone)]
pub struct RegistryView {
    state: RegistryState,
    entries: Vec<NodeEntry>,
    sender: Selector,
    receiver: Selector,
}

impl Default for RegistryView {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryView {
    pub fn new() -> Self {
        Self {
            state: RegistryState::NotLoaded,
            entries: Vec::new(),
            sender: Selector::new(SENDER_PLACEHOLDER),
            receiver: Selector::new(RECEIVER_PLACEHOLDER),
        }
    }

    /// Rebuild the view from a registry snapshot.
    ///
    /// Identity resolution runs over the whole snapshot first so that
    /// every entry and selector is built against the corrected id.
    /// An empty snapshot leaves both selectors with only their
    /// placeholders: no broadcast option is offered in that case.
    pub fn apply(&mut self, nodes: &[Node], identity: &mut Identity) -> bool {
        let changed = identity.resolve(nodes);

        self.entries.clear();
        self.sender.reset();
        self.receiver.reset();

        if nodes.is_empty() {
            self.state = RegistryState::Empty;
            return changed;
        }

        let mut current_sender = None;
        for node in nodes {
            let node_id = node.node_id();
            let address = node.address();
            let is_current = identity.is_current(node);
            let option_label = format!("{} ({})", node_id, address);

            self.sender.push(node_id.clone(), option_label.clone());
            if is_current {
                current_sender = Some(node_id.clone());
            } else {
                self.receiver.push(node_id.clone(), option_label);
            }
            self.entries.push(NodeEntry {
                node_id,
                address,
                is_current,
            });
        }

        if let Some(id) = current_sender {
            self.sender.select_value(&id);
        }
        self.receiver.push(BROADCAST, BROADCAST_OPTION_LABEL);
        self.state = RegistryState::Loaded;
        changed
    }

    /// A failed fetch replaces the list with an error line; the selectors
    /// keep whatever the last successful pass produced.
    pub fn apply_error(&mut self, error: &ConsoleError) {
        tracing::warn!(error = %error, "Node registry refresh failed");
        self.entries.clear();
        self.state = RegistryState::Failed;
    }

    pub fn state(&self) -> RegistryState {
        self.state
    }

    pub fn entries(&self) -> &[NodeEntry] {
        &self.entries
    }

    pub fn sender(&self) -> &Selector {
        &self.sender
    }

    pub fn sender_mut(&mut self) -> &mut Selector {
        &mut self.sender
    }

    pub fn receiver(&self) -> &Selector {
        &self.receiver
    }

    pub fn receiver_mut(&mut self) -> &mut Selector {
        &mut self.receiver
    }

    /// The node list as display lines.
    pub fn lines(&self) -> Vec<String> {
        match self.state {
            RegistryState::NotLoaded => Vec::new(),
            RegistryState::Empty => vec![NO_NODES_LINE.to_string()],
            RegistryState::Failed => vec![NODES_ERROR_LINE.to_string()],
            RegistryState::Loaded => self.entries.iter().map(NodeEntry::line).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::from_base_url("http://localhost:8081").unwrap()
    }

    #[test]
    fn single_current_node_leaves_only_broadcast_receiver() {
        let mut id = identity();
        let mut view = RegistryView::new();
        view.apply(&[Node::new(Some("server-8081"), "localhost", 8081)], &mut id);

        assert_eq!(id.current_server_id(), "server-8081");
        assert_eq!(view.state(), RegistryState::Loaded);
        assert!(view.entries()[0].is_current);
        assert_eq!(view.sender().selected_value(), Some("server-8081"));
        let receivers: Vec<&str> = view
            .receiver()
            .options()
            .iter()
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(receivers, vec![BROADCAST]);
        assert_eq!(view.receiver().selected_value(), None);
    }

    #[test]
    fn receivers_exclude_resolved_identity() {
        let mut id = identity();
        let mut view = RegistryView::new();
        let nodes = vec![
            Node::new(Some("n2"), "10.0.0.2", 8082),
            Node::new(Some("n1"), "localhost", 8081),
            Node::new(None, "10.0.0.3", 8083),
        ];
        view.apply(&nodes, &mut id);

        assert_eq!(id.current_server_id(), "n1");
        assert!(!view.receiver().contains("n1"));
        assert!(view.receiver().contains("n2"));
        assert!(view.receiver().contains("10.0.0.3:8083"));
        let broadcasts = view
            .receiver()
            .options()
            .iter()
            .filter(|o| o.value == BROADCAST)
            .count();
        assert_eq!(broadcasts, 1);
        assert_eq!(view.sender().options().len(), 3);
        assert_eq!(view.sender().selected_value(), Some("n1"));
        assert_eq!(view.lines()[1], "n1 - localhost:8081 (THIS SERVER)");
    }

    #[test]
    fn empty_registry_resets_selectors_without_broadcast() {
        let mut id = identity();
        let mut view = RegistryView::new();
        view.apply(&[Node::new(Some("n2"), "10.0.0.2", 8082)], &mut id);
        assert!(view.receiver().contains(BROADCAST));

        view.apply(&[], &mut id);
        assert_eq!(view.state(), RegistryState::Empty);
        assert_eq!(view.lines(), vec![NO_NODES_LINE.to_string()]);
        assert!(view.sender().options().is_empty());
        assert!(view.receiver().options().is_empty());
        assert_eq!(view.receiver().selected_label(), RECEIVER_PLACEHOLDER);
    }

    #[test]
    fn failure_keeps_previous_selectors() {
        let mut id = identity();
        let mut view = RegistryView::new();
        view.apply(&[Node::new(Some("n2"), "10.0.0.2", 8082)], &mut id);
        view.apply_error(&ConsoleError::Config("boom".into()));
        assert_eq!(view.lines(), vec![NODES_ERROR_LINE.to_string()]);
        assert!(view.receiver().contains("n2"));
    }

    #[test]
    fn selector_cycles_through_placeholder() {
        let mut sel = Selector::new(SENDER_PLACEHOLDER);
        sel.push("a", "a");
        sel.push("b", "b");
        sel.cycle(true);
        assert_eq!(sel.selected_value(), Some("a"));
        sel.cycle(true);
        sel.cycle(true);
        assert_eq!(sel.selected_value(), None);
        sel.cycle(false);
        assert_eq!(sel.selected_value(), Some("b"));
    }
}
