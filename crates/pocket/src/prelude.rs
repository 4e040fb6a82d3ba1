//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use pocket::prelude::*;
//! ```

pub use crate::{
    ChatClient, ChatOptions, ChatSession, ClientFactory, GeminiClient, Message, OpenAIClient,
    ProviderConfig, ProviderType,
    ChatMessage, Sender, Thread, ThreadRepository, ThreadRepositoryBuilder,
    SessionConfig, SessionError, SessionStore, StorePhase, TitlePolicy, ResumePolicy,
};
