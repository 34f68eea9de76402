//! HTTP client for a mesh node's admin API.

use std::time::Duration;

use syncmesh_protocol::{
    decode_heartbeats, decode_list, decode_replicas, endpoints, Message, Node, SendMessageRequest,
};

use crate::error::{ConsoleError, Result};

/// Typed access to one node's `/admin` and `/api/messages` endpoints.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct MeshApi {
    base_url: String,
    client: reqwest::Client,
}

impl MeshApi {
    /// Build a client. With no timeout a hung request stays pending until
    /// the transport gives up.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        tracing::debug!(path, "GET");
        Ok(self.client.get(self.url(path)).send().await?)
    }

    /// Body bytes regardless of status; the caller's parse decides.
    async fn get_bytes(&self, path: &str) -> Result<Vec<u8>> {
        let resp = self.get(path).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Body text regardless of status.
    async fn get_text(&self, path: &str) -> Result<String> {
        Ok(self.get(path).await?.text().await?)
    }

    /// Body text, with any non-2xx status turned into a response failure.
    async fn get_text_checked(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        tracing::debug!(path, "GET");
        let resp = self.client.get(self.url(path)).query(query).send().await?;
        checked_text(resp).await
    }

    pub async fn nodes(&self) -> Result<Vec<Node>> {
        Ok(decode_list(&self.get_bytes(endpoints::NODES).await?)?)
    }

    pub async fn messages(&self) -> Result<Vec<Message>> {
        Ok(decode_list(&self.get_bytes(endpoints::MESSAGES).await?)?)
    }

    pub async fn heartbeats(&self) -> Result<Vec<String>> {
        Ok(decode_heartbeats(&self.get_bytes(endpoints::HEARTBEATS).await?)?)
    }

    pub async fn leader(&self) -> Result<String> {
        self.get_text(endpoints::LEADER).await
    }

    /// `None` when the body is valid JSON but not an array.
    pub async fn replicas(&self) -> Result<Option<Vec<String>>> {
        Ok(decode_replicas(&self.get_bytes(endpoints::REPLICAS).await?)?)
    }

    pub async fn refresh_replicas(&self) -> Result<String> {
        self.get_text(endpoints::REFRESH_REPLICAS).await
    }

    pub async fn trigger_election(&self) -> Result<String> {
        self.get_text(endpoints::TRIGGER_ELECTION).await
    }

    pub async fn set_partition(&self, enable: bool) -> Result<String> {
        self.get_text_checked(endpoints::partition(enable), &[]).await
    }

    pub async fn replay(&self) -> Result<String> {
        self.get_text(endpoints::REPLAY).await
    }

    pub async fn test_unicast(&self, target: &str) -> Result<String> {
        self.get_text_checked(endpoints::TEST_UNICAST, &[("target", target)])
            .await
    }

    pub async fn send(&self, request: &SendMessageRequest) -> Result<()> {
        tracing::debug!(
            sender = %request.sender,
            receiver = %request.receiver,
            "POST send"
        );
        let resp = self
            .client
            .post(self.url(endpoints::SEND_MESSAGE))
            .json(request)
            .send()
            .await?;
        checked_text(resp).await.map(|_| ())
    }
}

async fn checked_text(resp: reqwest::Response) -> Result<String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.text().await?);
    }
    // A body that cannot be read still counts as a response failure.
    let body = resp.text().await.unwrap_or_default();
    Err(ConsoleError::Response {
        status: status.as_u16(),
        body,
    })
}
