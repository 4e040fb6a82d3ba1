use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use pocket_llm::{ChatClient, ChatRequest, ChatResponse, Message};
use pocket_persist::{
    ChatMessage, MemoryStorage, Sender, StorageBackend, Thread, ThreadRepository,
    DEFAULT_HISTORY_KEY, DEFAULT_THREAD_TITLE,
};
use pocket_session::{
    BannerKind, ResumePolicy, SessionConfig, SessionError, SessionStore, StorePhase,
    TitlePolicy, FALLBACK_REPLY, INTRO_PROMPT, MISSING_API_KEY_MESSAGE,
};
use tokio::sync::watch;

enum Reply {
    Text(&'static str),
    Fail(&'static str),
    Hang,
}

/// Plays back scripted replies and records every request; echoes once the script runs out
#[derive(Default)]
struct ScriptedClient {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ChatRequest>>,
    phases_seen: Mutex<Vec<StorePhase>>,
    phase_rx: Mutex<Option<watch::Receiver<StorePhase>>>,
}

impl ScriptedClient {
    fn new(script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn watch_phase(&self, rx: watch::Receiver<StorePhase>) {
        *self.phase_rx.lock().unwrap() = Some(rx);
    }
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        if let Some(rx) = self.phase_rx.lock().unwrap().as_ref() {
            self.phases_seen.lock().unwrap().push(*rx.borrow());
        }
        let last = request
            .messages
            .last()
            .map(|m| m.content().to_plain_text())
            .unwrap_or_default();
        self.requests.lock().unwrap().push(request);

        let next = self.script.lock().unwrap().pop_front();
        let content = match next {
            Some(Reply::Text(text)) => text.to_string(),
            Some(Reply::Fail(reason)) => anyhow::bail!("{}", reason),
            Some(Reply::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late".to_string()
            }
            None => format!("echo: {}", last),
        };

        Ok(ChatResponse {
            content: Some(content),
            usage: None,
            finish_reason: Some("STOP".to_string()),
            raw: serde_json::Value::Null,
        })
    }
}

fn store_with(
    client: Option<Arc<ScriptedClient>>,
    backend: Arc<MemoryStorage>,
    config: SessionConfig,
) -> SessionStore {
    SessionStore::builder()
        .maybe_chat_client(client.map(|c| c as Arc<dyn ChatClient>))
        .repository(ThreadRepository::new(backend))
        .config(config)
        .build()
        .unwrap()
}

async fn ready_store(client: Arc<ScriptedClient>) -> (SessionStore, Arc<MemoryStorage>) {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = store_with(Some(client), backend.clone(), SessionConfig::default());
    store.initialize().await;
    (store, backend)
}

async fn stored_threads(backend: &Arc<MemoryStorage>) -> Vec<Thread> {
    let raw = backend.get(DEFAULT_HISTORY_KEY).await.unwrap().unwrap();
    serde_json::from_str(&raw).unwrap()
}

#[tokio::test]
async fn test_initialize_does_not_create_a_thread() {
    let (store, _) = ready_store(ScriptedClient::new(vec![])).await;

    assert_eq!(store.phase(), StorePhase::Ready);
    assert!(store.threads().is_empty());
    assert!(store.active_thread_id().is_none());
    assert!(store.messages().is_empty());
}

#[tokio::test]
async fn test_start_new_thread_greets_and_goes_first() {
    let client = ScriptedClient::new(vec![Reply::Text("Hi! I'm Doraemon!")]);
    let (mut store, backend) = ready_store(client.clone()).await;

    let thread = store.start_new_thread().await.unwrap().clone();

    assert_eq!(thread.title, DEFAULT_THREAD_TITLE);
    assert_eq!(thread.messages, vec![ChatMessage::assistant("Hi! I'm Doraemon!")]);
    assert_eq!(store.threads()[0].id, thread.id);
    assert_eq!(store.active_thread_id(), Some(thread.id.as_str()));
    assert!(store.has_live_session());

    let request = &client.requests()[0];
    assert_eq!(request.model, "gemini-1.5-pro");
    assert_eq!(request.messages, vec![Message::human(INTRO_PROMPT)]);
    assert_eq!(request.options.max_tokens, Some(100));
    assert_eq!(request.options.top_k, Some(40));

    assert_eq!(stored_threads(&backend).await, store.threads());

    let second = store.start_new_thread().await.unwrap().id.clone();
    assert_eq!(store.threads().len(), 2);
    assert_eq!(store.threads()[0].id, second);
    assert_eq!(store.threads()[1].id, thread.id);
}

#[tokio::test]
async fn test_sends_alternate_user_and_assistant() {
    let (mut store, backend) = ready_store(ScriptedClient::new(vec![])).await;
    store.start_new_thread().await.unwrap();

    for text in ["one", "two", "three"] {
        store.send_user_message(text).await;
    }

    let messages = store.messages();
    assert_eq!(messages.len(), 1 + 2 * 3);
    for (i, pair) in messages[1..].chunks(2).enumerate() {
        assert_eq!(pair[0].sender, Sender::User);
        assert_eq!(pair[1].sender, Sender::Assistant);
        assert_eq!(pair[1].content, format!("echo: {}", pair[0].content), "turn {i}");
    }
    assert_eq!(store.phase(), StorePhase::Ready);
    assert_eq!(stored_threads(&backend).await, store.threads());
}

#[tokio::test]
async fn test_title_follows_latest_message_by_default() {
    let (mut store, _) = ready_store(ScriptedClient::new(vec![])).await;
    store.start_new_thread().await.unwrap();

    store.send_user_message("What is in your four-dimensional pocket?").await;
    assert_eq!(
        store.active_thread().unwrap().title,
        "What is in your four-dimension..."
    );

    store.send_user_message("dorayaki").await;
    assert_eq!(store.active_thread().unwrap().title, "dorayaki...");
}

#[tokio::test]
async fn test_first_turn_only_title_policy() {
    let backend = Arc::new(MemoryStorage::new());
    let config = SessionConfig::new().with_title_policy(TitlePolicy::FirstTurnOnly);
    let mut store = store_with(Some(ScriptedClient::new(vec![])), backend, config);
    store.initialize().await;
    store.start_new_thread().await.unwrap();

    store.send_user_message("first question").await;
    store.send_user_message("second question").await;

    assert_eq!(store.active_thread().unwrap().title, "first question...");
}

#[tokio::test]
async fn test_first_turn_only_waits_for_an_answered_turn() {
    let backend = Arc::new(MemoryStorage::new());
    let client = ScriptedClient::new(vec![Reply::Text("Hi!"), Reply::Fail("boom")]);
    let config = SessionConfig::new().with_title_policy(TitlePolicy::FirstTurnOnly);
    let mut store = store_with(Some(client), backend.clone(), config);
    store.initialize().await;
    store.start_new_thread().await.unwrap();

    store.send_user_message("first try").await;
    assert_eq!(store.active_thread().unwrap().title, DEFAULT_THREAD_TITLE);

    store.send_user_message("second try works").await;
    store.send_user_message("third turn").await;

    let thread = store.active_thread().unwrap();
    assert_eq!(thread.messages.len(), 7);
    assert_eq!(thread.title, "second try works...");
    assert_eq!(stored_threads(&backend).await[0].title, "second try works...");
}

#[tokio::test]
async fn test_failed_turn_appends_fallback() {
    let client = ScriptedClient::new(vec![Reply::Text("Hi!"), Reply::Fail("quota exceeded")]);
    let (mut store, backend) = ready_store(client).await;
    store.start_new_thread().await.unwrap();

    store.send_user_message("hello").await;

    let messages = store.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1], ChatMessage::user("hello"));
    assert_eq!(messages[2], ChatMessage::assistant(FALLBACK_REPLY));
    assert_eq!(store.active_thread().unwrap().title, DEFAULT_THREAD_TITLE);
    assert_eq!(store.phase(), StorePhase::Ready);
    assert!(store.banner().is_none());
    assert_eq!(stored_threads(&backend).await[0].messages.len(), 3);
}

#[tokio::test]
async fn test_blank_message_is_ignored() {
    let client = ScriptedClient::new(vec![]);
    let (mut store, _) = ready_store(client.clone()).await;
    store.start_new_thread().await.unwrap();

    store.send_user_message("   \n").await;

    assert_eq!(store.messages().len(), 1);
    assert_eq!(client.requests().len(), 1);
}

#[tokio::test]
async fn test_send_without_active_thread_is_ignored() {
    let client = ScriptedClient::new(vec![]);
    let (mut store, _) = ready_store(client.clone()).await;

    store.send_user_message("anyone there?").await;

    assert!(store.threads().is_empty());
    assert!(client.requests().is_empty());
}

#[tokio::test]
async fn test_phase_is_awaiting_reply_during_call() {
    let client = ScriptedClient::new(vec![]);
    let (mut store, _) = ready_store(client.clone()).await;
    client.watch_phase(store.subscribe_phase());

    store.start_new_thread().await.unwrap();
    store.send_user_message("hi").await;

    let seen = client.phases_seen.lock().unwrap().clone();
    assert_eq!(seen, vec![StorePhase::AwaitingReply, StorePhase::AwaitingReply]);
    assert_eq!(store.phase(), StorePhase::Ready);
}

#[tokio::test]
async fn test_missing_client_blocks_everything() {
    let backend = Arc::new(MemoryStorage::new());
    let mut store = store_with(None, backend.clone(), SessionConfig::default());
    store.initialize().await;

    let err = store.start_new_thread().await.unwrap_err();
    assert!(matches!(err, SessionError::Configuration(_)));
    assert!(err.is_user_visible());
    assert_eq!(store.phase(), StorePhase::ConfigurationError);

    let banner = store.banner().unwrap().clone();
    assert_eq!(banner.kind, BannerKind::Configuration);
    assert_eq!(banner.message, MISSING_API_KEY_MESSAGE);

    store.dismiss_banner();
    assert!(store.banner().is_some());

    store.send_user_message("hello?").await;
    assert!(store.threads().is_empty());
    assert!(!store.can_send());
    assert!(backend.get(DEFAULT_HISTORY_KEY).await.unwrap().is_none());
}

#[tokio::test]
async fn test_failed_greeting_sets_dismissible_banner() {
    let client = ScriptedClient::new(vec![Reply::Fail("API key not valid")]);
    let (mut store, _) = ready_store(client).await;

    let err = store.start_new_thread().await.unwrap_err();

    assert!(matches!(err, SessionError::Service(_)));
    assert!(store.threads().is_empty());
    assert_eq!(store.phase(), StorePhase::Ready);
    let banner = store.banner().unwrap();
    assert_eq!(banner.kind, BannerKind::Service);
    assert_eq!(
        banner.message,
        "Failed to initialize chat: API key not valid. Please check your API key and try again."
    );

    store.dismiss_banner();
    assert!(store.banner().is_none());
}

#[tokio::test]
async fn test_failed_new_thread_keeps_active_thread() {
    let client = ScriptedClient::new(vec![Reply::Text("Hi!"), Reply::Fail("503 unavailable")]);
    let (mut store, backend) = ready_store(client).await;
    let active = store.start_new_thread().await.unwrap().id.clone();
    let before = store.threads().to_vec();

    let err = store.start_new_thread().await.unwrap_err();

    assert!(matches!(err, SessionError::Service(_)));
    assert_eq!(store.active_thread_id(), Some(active.as_str()));
    assert_eq!(store.threads(), before.as_slice());
    assert!(store.has_live_session());
    assert_eq!(stored_threads(&backend).await, before);
    assert_eq!(store.banner().unwrap().kind, BannerKind::Service);
    assert!(store.can_send());
}

#[tokio::test]
async fn test_delete_active_thread_stands_when_replacement_fails() {
    let client = ScriptedClient::new(vec![Reply::Text("Hi!"), Reply::Fail("API key not valid")]);
    let (mut store, backend) = ready_store(client).await;
    let doomed = store.start_new_thread().await.unwrap().id.clone();

    let err = store.delete_thread(&doomed).await.unwrap_err();

    assert!(matches!(err, SessionError::Service(_)));
    assert!(store.threads().is_empty());
    assert!(store.active_thread_id().is_none());
    assert!(!store.has_live_session());
    assert!(stored_threads(&backend).await.is_empty());
    let banner = store.banner().unwrap();
    assert_eq!(banner.kind, BannerKind::Service);
    assert!(banner.message.contains("API key not valid"));
}

#[tokio::test]
async fn test_successful_thread_clears_service_banner() {
    let client = ScriptedClient::new(vec![Reply::Fail("503"), Reply::Text("Hi!")]);
    let (mut store, _) = ready_store(client).await;

    assert!(store.start_new_thread().await.is_err());
    assert!(store.banner().is_some());

    store.start_new_thread().await.unwrap();
    assert!(store.banner().is_none());
}

#[tokio::test]
async fn test_slow_reply_times_out_to_fallback() {
    let backend = Arc::new(MemoryStorage::new());
    let client = ScriptedClient::new(vec![Reply::Text("Hi!"), Reply::Hang]);
    let config = SessionConfig::new().with_request_timeout(Some(Duration::from_millis(50)));
    let mut store = store_with(Some(client), backend, config);
    store.initialize().await;
    store.start_new_thread().await.unwrap();

    store.send_user_message("are you there?").await;

    assert_eq!(store.messages().last().unwrap().content, FALLBACK_REPLY);
    assert_eq!(store.phase(), StorePhase::Ready);
}

#[tokio::test]
async fn test_delete_active_thread_starts_fresh_one() {
    let (mut store, backend) = ready_store(ScriptedClient::new(vec![])).await;
    let first = store.start_new_thread().await.unwrap().id.clone();
    let doomed = store.start_new_thread().await.unwrap().id.clone();

    store.delete_thread(&doomed).await.unwrap();

    let ids: Vec<_> = store.threads().iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first));

    let active = store.active_thread().unwrap();
    assert_ne!(active.id, first);
    assert_eq!(active.messages.len(), 1);
    assert_eq!(stored_threads(&backend).await, store.threads());
}

#[tokio::test]
async fn test_delete_inactive_thread_keeps_selection() {
    let (mut store, _) = ready_store(ScriptedClient::new(vec![])).await;
    let older = store.start_new_thread().await.unwrap().id.clone();
    let active = store.start_new_thread().await.unwrap().id.clone();

    store.delete_thread(&older).await.unwrap();

    assert_eq!(store.threads().len(), 1);
    assert_eq!(store.active_thread_id(), Some(active.as_str()));
    assert!(store.has_live_session());
}

#[tokio::test]
async fn test_delete_unknown_thread_is_noop() {
    let (mut store, _) = ready_store(ScriptedClient::new(vec![])).await;
    store.start_new_thread().await.unwrap();
    let before = store.threads().to_vec();

    store.delete_thread("does-not-exist").await.unwrap();

    assert_eq!(store.threads(), before.as_slice());
}

#[tokio::test]
async fn test_select_unknown_thread_fails() {
    let (mut store, _) = ready_store(ScriptedClient::new(vec![])).await;
    let id = store.start_new_thread().await.unwrap().id.clone();

    let err = store.select_thread("nope").unwrap_err();
    assert!(matches!(err, SessionError::ThreadNotFound(ref missing) if missing == "nope"));
    assert_eq!(store.active_thread_id(), Some(id.as_str()));
}

#[tokio::test]
async fn test_selecting_other_thread_replays_its_history() {
    let client = ScriptedClient::new(vec![]);
    let (mut store, _) = ready_store(client.clone()).await;

    let first = store.start_new_thread().await.unwrap().id.clone();
    store.send_user_message("remember the bamboo copter").await;
    store.start_new_thread().await.unwrap();

    let log = store.select_thread(&first).unwrap().to_vec();
    assert_eq!(log.len(), 3);
    assert!(!store.has_live_session());

    store.send_user_message("what did I mention?").await;

    let last_request = client.requests().pop().unwrap();
    let expected = vec![
        Message::human(INTRO_PROMPT),
        Message::ai(log[0].content.as_str()),
        Message::human("remember the bamboo copter"),
        Message::ai(log[2].content.as_str()),
        Message::human("what did I mention?"),
    ];
    assert_eq!(last_request.messages, expected);
    assert_eq!(store.messages().len(), 5);
}

#[tokio::test]
async fn test_system_prompt_only_resume_forgets_turns() {
    let backend = Arc::new(MemoryStorage::new());
    let client = ScriptedClient::new(vec![]);

    {
        let mut store = store_with(Some(client.clone()), backend.clone(), SessionConfig::default());
        store.initialize().await;
        store.start_new_thread().await.unwrap();
        store.send_user_message("old question").await;
    }

    // Restart: the thread comes back from storage without a live session
    let config = SessionConfig::new().with_resume_policy(ResumePolicy::SystemPromptOnly);
    let mut store = store_with(Some(client.clone()), backend, config);
    store.initialize().await;
    assert_eq!(store.threads().len(), 1);

    let id = store.threads()[0].id.clone();
    store.select_thread(&id).unwrap();
    store.send_user_message("new question").await;

    let last_request = client.requests().pop().unwrap();
    assert_eq!(last_request.messages.len(), 3);
    assert_eq!(last_request.messages[0], Message::human(INTRO_PROMPT));
    assert_eq!(last_request.messages[2], Message::human("new question"));
    assert_eq!(store.messages().len(), 5);
}

#[tokio::test]
async fn test_restart_restores_threads_in_order() {
    let backend = Arc::new(MemoryStorage::new());
    let client = ScriptedClient::new(vec![]);

    let saved = {
        let mut store = store_with(Some(client.clone()), backend.clone(), SessionConfig::default());
        store.initialize().await;
        store.start_new_thread().await.unwrap();
        store.send_user_message("hello").await;
        store.start_new_thread().await.unwrap();
        store.threads().to_vec()
    };

    let mut store = store_with(Some(client), backend, SessionConfig::default());
    store.initialize().await;

    assert_eq!(store.threads(), saved.as_slice());
    assert!(store.active_thread_id().is_none());
}

#[tokio::test]
async fn test_malformed_snapshot_starts_empty() {
    let backend = Arc::new(MemoryStorage::with_entry(DEFAULT_HISTORY_KEY, "{oops"));
    let mut store = store_with(
        Some(ScriptedClient::new(vec![])),
        backend,
        SessionConfig::default(),
    );

    store.initialize().await;

    assert_eq!(store.phase(), StorePhase::Ready);
    assert!(store.threads().is_empty());
}

#[tokio::test]
async fn test_thread_ids_stay_unique() {
    let (mut store, _) = ready_store(ScriptedClient::new(vec![])).await;

    for _ in 0..20 {
        store.start_new_thread().await.unwrap();
    }

    let ids: HashSet<_> = store.threads().iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids.len(), 20);
    assert!(ids.iter().all(|id| id.parse::<i64>().is_ok()));
}
