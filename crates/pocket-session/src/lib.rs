pub mod builder;
pub mod config;
pub mod error;
pub mod prompts;
pub mod state;
pub mod store;

pub use builder::SessionStoreBuilder;
pub use config::{GenerationConfig, ResumePolicy, SessionConfig, TitlePolicy};
pub use error::SessionError;
pub use prompts::{thread_title, FALLBACK_REPLY, INTRO_PROMPT, MISSING_API_KEY_MESSAGE};
pub use state::{Banner, BannerKind, StorePhase};
pub use store::SessionStore;
