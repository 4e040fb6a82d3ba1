use std::sync::Arc;

use anyhow::{anyhow, Result};

use crate::traits::{ChatClient, ChatOptions, ChatRequest};
use crate::types::Message;

/// Live multi-turn conversation on top of a stateless [`ChatClient`]
///
/// The session keeps the turn history and replays it on every request.
/// A turn is recorded only once the provider answered, so a failed call
/// leaves the history exactly as it was.
pub struct ChatSession {
    client: Arc<dyn ChatClient>,
    model: String,
    system_prompt: Option<String>,
    options: ChatOptions,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(client: Arc<dyn ChatClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            system_prompt: None,
            options: ChatOptions::default(),
            history: Vec::new(),
        }
    }

    /// Open a session with an optional system instruction and fixed options
    pub fn start(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        system_prompt: Option<String>,
        options: ChatOptions,
    ) -> Self {
        Self {
            system_prompt,
            options,
            ..Self::new(client, model)
        }
    }

    /// Provider-level system instruction sent ahead of the history
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: ChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Seed prior turns, e.g. when resuming a stored thread
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &ChatOptions {
        &self.options
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// Send one user turn and return the assistant's reply text
    pub async fn send(&mut self, text: &str) -> Result<String> {
        let user_turn = Message::human(text);

        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if let Some(prompt) = &self.system_prompt {
            messages.push(Message::system(prompt.as_str()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(user_turn.clone());

        let request = ChatRequest::new(self.model.clone(), messages)
            .with_options(self.options.clone());

        tracing::debug!(
            model = %self.model,
            turns = self.history.len(),
            "Sending chat turn"
        );

        let response = self.client.chat(request).await?;
        let reply = response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| anyhow!(
                "Empty response from model (finish reason: {})",
                response.finish_reason.as_deref().unwrap_or("unknown")
            ))?;

        self.history.push(user_turn);
        self.history.push(Message::ai(reply.clone()));

        Ok(reply)
    }
}
