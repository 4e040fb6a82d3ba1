use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use chrono::Utc;
use tokio::sync::watch;

use pocket_llm::{ChatClient, ChatOptions, ChatSession, Message};
use pocket_persist::{ChatMessage, Sender, Thread, ThreadRepository, DEFAULT_THREAD_TITLE};

use crate::config::{ResumePolicy, SessionConfig};
use crate::error::{Result, SessionError};
use crate::prompts::{thread_title, MISSING_API_KEY_MESSAGE};
use crate::state::{Banner, StorePhase};

/// Live session and the thread it talks for
struct BoundSession {
    thread_id: String,
    session: ChatSession,
}

/// Owner of the thread list, the active thread and its live session
///
/// Every mutating operation takes `&mut self`, so at most one of them is in
/// flight at a time; the snapshot is rewritten before the operation returns.
pub struct SessionStore {
    client: Option<Arc<dyn ChatClient>>,
    repository: ThreadRepository,
    config: SessionConfig,
    threads: Vec<Thread>,
    active_thread_id: Option<String>,
    live_session: Option<BoundSession>,
    phase: watch::Sender<StorePhase>,
    banner: Option<Banner>,
}

impl SessionStore {
    /// `client` is `None` when no credential is configured
    pub fn new(
        client: Option<Arc<dyn ChatClient>>,
        repository: ThreadRepository,
        config: SessionConfig,
    ) -> Self {
        let (phase, _) = watch::channel(StorePhase::Uninitialized);
        Self {
            client,
            repository,
            config,
            threads: Vec::new(),
            active_thread_id: None,
            live_session: None,
            phase,
            banner: None,
        }
    }

    /// Create a builder for fluent construction
    pub fn builder() -> crate::builder::SessionStoreBuilder {
        crate::builder::SessionStoreBuilder::new()
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Load the stored threads; never creates one
    pub async fn initialize(&mut self) {
        self.set_phase(StorePhase::Loading);
        self.threads = self.repository.load().await;
        self.active_thread_id = None;
        self.live_session = None;
        self.set_phase(StorePhase::Ready);
        tracing::info!(threads = self.threads.len(), "Session store initialized");
    }

    /// Open a session, greet, and make the result the active thread
    pub async fn start_new_thread(&mut self) -> Result<&Thread> {
        let Some(client) = self.client.clone() else {
            tracing::warn!("Cannot start a thread: no chat client configured");
            self.set_phase(StorePhase::ConfigurationError);
            self.banner = Some(Banner::configuration(MISSING_API_KEY_MESSAGE));
            return Err(SessionError::Configuration(MISSING_API_KEY_MESSAGE.to_string()));
        };

        self.set_phase(StorePhase::AwaitingReply);
        let mut session = self.open_session(client, Vec::new());
        let intro = self.config.intro_prompt.clone();
        let result = with_timeout(self.config.request_timeout, session.send(&intro)).await;
        self.set_phase(StorePhase::Ready);

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize chat");
                self.banner = Some(Banner::service(format!(
                    "Failed to initialize chat: {}. Please check your API key and try again.",
                    e
                )));
                return Err(SessionError::Service(e.to_string()));
            }
        };

        let id = self.next_thread_id();
        let thread = Thread::new(id.clone(), Utc::now(), ChatMessage::assistant(reply));
        self.threads.insert(0, thread);
        self.active_thread_id = Some(id.clone());
        self.live_session = Some(BoundSession {
            thread_id: id.clone(),
            session,
        });
        if self.banner.as_ref().is_some_and(Banner::is_dismissible) {
            self.banner = None;
        }
        self.persist().await;

        tracing::info!(thread_id = %id, "Started new thread");
        Ok(&self.threads[0])
    }

    /// Append a user turn and its reply to the active thread
    ///
    /// Does nothing for blank text, without an active thread, without a chat
    /// client, or while input is not accepted. A failed call is answered with
    /// the fallback reply instead of an error.
    pub async fn send_user_message(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() || !self.can_send() {
            return;
        }
        let Some(thread_id) = self.active_thread_id.clone() else {
            return;
        };
        let Some(client) = self.client.clone() else {
            return;
        };

        let bound_elsewhere = self
            .live_session
            .as_ref()
            .map_or(true, |bound| bound.thread_id != thread_id);
        if bound_elsewhere {
            let history = self.resume_history(&thread_id);
            tracing::debug!(
                thread_id = %thread_id,
                replayed = history.len(),
                "Rebuilding session for thread"
            );
            self.live_session = Some(BoundSession {
                thread_id: thread_id.clone(),
                session: self.open_session(client, history),
            });
        }

        let Some(thread) = self.thread_mut(&thread_id) else {
            return;
        };
        thread.push(ChatMessage::user(text));

        self.set_phase(StorePhase::AwaitingReply);
        let timeout = self.config.request_timeout;
        let result = match self.live_session.as_mut() {
            Some(bound) => with_timeout(timeout, bound.session.send(text)).await,
            None => Err(anyhow!("no live session")),
        };

        let reply = match result {
            Ok(reply) => {
                if !self.config.reply_delay.is_zero() {
                    tokio::time::sleep(self.config.reply_delay).await;
                }
                Some(reply)
            }
            Err(e) => {
                tracing::warn!(thread_id = %thread_id, error = %e, "Chat turn failed, using fallback reply");
                None
            }
        };

        let title_policy = self.config.title_policy;
        let fallback = self.config.fallback_reply.clone();
        if let Some(thread) = self.thread_mut(&thread_id) {
            match reply {
                Some(reply) => {
                    // A turn answered by the fallback never names the thread
                    let untitled = thread.title == DEFAULT_THREAD_TITLE;
                    thread.push(ChatMessage::assistant(reply));
                    if title_policy.should_retitle(untitled) {
                        thread.title = thread_title(text);
                    }
                }
                None => thread.push(ChatMessage::assistant(fallback)),
            }
        }

        self.set_phase(StorePhase::Ready);
        self.persist().await;
    }

    /// Remove a thread; deleting the active one starts a fresh thread
    pub async fn delete_thread(&mut self, id: &str) -> Result<()> {
        let Some(index) = self.threads.iter().position(|t| t.id == id) else {
            tracing::debug!(thread_id = %id, "Delete ignored: unknown thread");
            return Ok(());
        };

        self.threads.remove(index);
        if self.live_session.as_ref().is_some_and(|b| b.thread_id == id) {
            self.live_session = None;
        }
        self.persist().await;
        tracing::info!(thread_id = %id, "Deleted thread");

        if self.active_thread_id.as_deref() == Some(id) {
            self.active_thread_id = None;
            self.start_new_thread().await?;
        }
        Ok(())
    }

    /// Make `id` the active thread and return its log
    pub fn select_thread(&mut self, id: &str) -> Result<&[ChatMessage]> {
        if !self.threads.iter().any(|t| t.id == id) {
            return Err(SessionError::ThreadNotFound(id.to_string()));
        }

        if self.live_session.as_ref().is_some_and(|b| b.thread_id != id) {
            self.live_session = None;
        }
        self.active_thread_id = Some(id.to_string());
        Ok(self.messages())
    }

    /// Clear a dismissible banner
    pub fn dismiss_banner(&mut self) {
        if self.banner.as_ref().is_some_and(Banner::is_dismissible) {
            self.banner = None;
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Threads, most recent first
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn active_thread_id(&self) -> Option<&str> {
        self.active_thread_id.as_deref()
    }

    pub fn active_thread(&self) -> Option<&Thread> {
        let id = self.active_thread_id.as_deref()?;
        self.threads.iter().find(|t| t.id == id)
    }

    /// Log of the active thread, empty without one
    pub fn messages(&self) -> &[ChatMessage] {
        self.active_thread()
            .map(|t| t.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn phase(&self) -> StorePhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions, e.g. to show a typing indicator
    pub fn subscribe_phase(&self) -> watch::Receiver<StorePhase> {
        self.phase.subscribe()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn can_send(&self) -> bool {
        self.phase().accepts_input() && self.client.is_some()
    }

    pub fn has_live_session(&self) -> bool {
        self.live_session.is_some()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn set_phase(&self, phase: StorePhase) {
        let previous = self.phase.send_replace(phase);
        if previous != phase {
            tracing::trace!(?previous, ?phase, "Store phase changed");
        }
    }

    fn open_session(&self, client: Arc<dyn ChatClient>, history: Vec<Message>) -> ChatSession {
        ChatSession::start(
            client,
            self.config.model.clone(),
            self.config.system_instruction.clone(),
            ChatOptions::from(&self.config.generation),
        )
        .with_history(history)
    }

    /// Prior turns for a session rebuilt on an existing thread
    fn resume_history(&self, thread_id: &str) -> Vec<Message> {
        let mut history = vec![Message::human(self.config.intro_prompt.as_str())];
        let Some(thread) = self.threads.iter().find(|t| t.id == thread_id) else {
            return history;
        };

        match self.config.resume_policy {
            ResumePolicy::ReplayHistory => {
                history.extend(thread.messages.iter().map(to_turn));
            }
            ResumePolicy::SystemPromptOnly => {
                history.extend(thread.messages.first().map(to_turn));
            }
        }
        history
    }

    fn thread_mut(&mut self, id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == id)
    }

    /// Millisecond timestamp, bumped until unused
    fn next_thread_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.threads.iter().any(|t| t.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }

    async fn persist(&self) {
        if let Err(e) = self.repository.save(&self.threads).await {
            tracing::error!(error = %e, "Failed to persist threads");
        }
    }
}

fn to_turn(message: &ChatMessage) -> Message {
    match message.sender {
        Sender::User => Message::human(message.content.as_str()),
        Sender::Assistant => Message::ai(message.content.as_str()),
    }
}

async fn with_timeout<T>(
    limit: Option<Duration>,
    call: impl Future<Output = anyhow::Result<T>>,
) -> anyhow::Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| anyhow!("request timed out after {}s", limit.as_secs_f32()))?,
        None => call.await,
    }
}
