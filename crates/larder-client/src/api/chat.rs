//! Chat API.

use crate::client::LarderClient;
use crate::error::Result;
use crate::types::{ChatMessage, SendMessageRequest};

/// Chat API client.
pub struct ChatApi {
    client: LarderClient,
}

impl ChatApi {
    pub(crate) fn new(client: LarderClient) -> Self {
        Self { client }
    }

    /// Fetch the chat history for a user.
    pub async fn history(&self, username: &str) -> Result<Vec<ChatMessage>> {
        self.client.get(&format!("chat/{}/history", username)).await
    }

    /// Send a chat message and get the assistant's reply.
    pub async fn send(&self, request: &SendMessageRequest) -> Result<ChatMessage> {
        self.client.post("chat", request).await
    }

    /// Send a message with just text (convenience method).
    pub async fn message(&self, text: impl Into<String>) -> Result<ChatMessage> {
        self.send(&SendMessageRequest::new(text)).await
    }
}
