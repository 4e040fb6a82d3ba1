//! # Pocket
//!
//! Chat client for a single persona with persistent, switchable conversation threads.
//!
//! ## Overview
//!
//! - **Talk to a model** through a provider-agnostic [`ChatClient`] (Gemini by default, OpenAI optional)
//! - **Keep threads** of messages that survive restarts in a JSON snapshot
//! - **Resume** a stored thread by replaying its history into a fresh session
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pocket::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ClientFactory::create_chat_client(ProviderConfig::gemini(
//!         std::env::var("GEMINI_API_KEY")?,
//!     ))?;
//!
//!     let repository = ThreadRepositoryBuilder::new()
//!         .storage_dir(".pocket")
//!         .build()?;
//!
//!     let mut store = SessionStore::builder()
//!         .chat_client(client)
//!         .repository(repository)
//!         .config(SessionConfig::default())
//!         .build()?;
//!
//!     store.initialize().await;
//!     store.start_new_thread().await?;
//!     store.send_user_message("What's in your pocket today?").await;
//!
//!     for message in store.messages() {
//!         println!("{:?}: {}", message.sender, message.content);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`pocket-llm`**: chat clients, provider config and the stateful `ChatSession`
//! - **`pocket-persist`**: thread records, storage backends and the snapshot repository
//! - **`pocket-session`**: `SessionStore`, the thread lifecycle on top of both
//! - **`pocket-cli`**: the `pocket` terminal client
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use pocket_llm::{
    ChatClient, ChatOptions, ChatRequest, ChatResponse, ChatSession, ClientFactory,
    GeminiClient, Message, OpenAIClient, ProviderConfig, ProviderType,
};

pub use pocket_persist::{
    ChatMessage, FileStorage, MemoryStorage, PersistError, Sender, StorageBackend, Thread,
    ThreadRepository, ThreadRepositoryBuilder,
};

pub use pocket_session::{
    Banner, BannerKind, GenerationConfig, ResumePolicy, SessionConfig, SessionError,
    SessionStore, SessionStoreBuilder, StorePhase, TitlePolicy,
};
