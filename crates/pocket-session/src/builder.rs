use std::sync::Arc;

use pocket_llm::ChatClient;
use pocket_persist::ThreadRepository;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::store::SessionStore;

/// Builder for constructing a [`SessionStore`]
pub struct SessionStoreBuilder {
    chat_client: Option<Arc<dyn ChatClient>>,
    repository: Option<ThreadRepository>,
    config: SessionConfig,
}

impl SessionStoreBuilder {
    pub fn new() -> Self {
        Self {
            chat_client: None,
            repository: None,
            config: SessionConfig::default(),
        }
    }

    /// Set the chat client
    pub fn chat_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.chat_client = Some(client);
        self
    }

    /// Set or clear the chat client; `None` builds an unconfigured store
    pub fn maybe_chat_client(mut self, client: Option<Arc<dyn ChatClient>>) -> Self {
        self.chat_client = client;
        self
    }

    /// Set the thread repository
    pub fn repository(mut self, repository: ThreadRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the session configuration
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the store
    ///
    /// A missing chat client is not an error here: the store reports it
    /// when the first thread is requested.
    pub fn build(self) -> Result<SessionStore> {
        let repository = self
            .repository
            .ok_or(SessionError::MissingComponent("repository"))?;

        Ok(SessionStore::new(self.chat_client, repository, self.config))
    }
}

impl Default for SessionStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}
