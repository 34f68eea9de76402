//! Send command: validate an operator's message and describe the result.

use syncmesh_protocol::{SendMessageRequest, BROADCAST};

use crate::error::{ConsoleError, ValidationError};
use crate::feed::ALL_SERVERS_LABEL;

/// What the operator filled in. Selector values are `None` while the
/// placeholder is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendForm {
    pub sender: Option<String>,
    pub receiver: Option<String>,
    pub payload: String,
}

impl SendForm {
    pub fn new(sender: Option<&str>, receiver: Option<&str>, payload: &str) -> Self {
        Self {
            sender: sender.map(str::to_string),
            receiver: receiver.map(str::to_string),
            payload: payload.to_string(),
        }
    }

    /// Check the form and build the request body. Self-addressed unicast
    /// is rejected; a broadcast may name any sender.
    pub fn validate(&self) -> Result<SendMessageRequest, ValidationError> {
        let sender = self.sender.as_deref().filter(|s| !s.is_empty());
        let receiver = self.receiver.as_deref().filter(|r| !r.is_empty());
        let payload = Some(self.payload.trim()).filter(|p| !p.is_empty());
        let (sender, receiver, payload) = match (sender, receiver, payload) {
            (Some(s), Some(r), Some(p)) => (s, r, p),
            _ => return Err(ValidationError::MissingFields),
        };
        if sender == receiver && receiver != BROADCAST {
            return Err(ValidationError::SelfAddressed);
        }
        Ok(SendMessageRequest {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            payload: payload.to_string(),
        })
    }
}

pub fn display_receiver(receiver: &str) -> &str {
    if receiver == BROADCAST {
        ALL_SERVERS_LABEL
    } else {
        receiver
    }
}

pub fn pending_line(request: &SendMessageRequest) -> String {
    format!(
        "Sending message from {} to {}...",
        request.sender,
        display_receiver(&request.receiver)
    )
}

pub fn success_line(request: &SendMessageRequest) -> String {
    format!(
        "Message sent from {} to {}",
        request.sender,
        display_receiver(&request.receiver)
    )
}

/// A rejected send includes the server's body text when it sent one.
pub fn failure_line(error: &ConsoleError) -> String {
    let detail = match error {
        ConsoleError::Response { body, .. } => format!("Failed: {}", body),
        other => other.to_string(),
    };
    format!("Error sending message between servers: {}", detail)
}
