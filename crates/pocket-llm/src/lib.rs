pub mod types;
pub mod traits;
pub mod session;
pub mod config;
pub mod gemini;
pub mod openai;

pub use traits::{ChatClient, ChatRequest, ChatResponse, ChatOptions, TokenUsage};
pub use session::ChatSession;
pub use config::{ClientFactory, GeminiConfig, OpenAIConfig, ProviderConfig, ProviderDetails, ProviderType};
pub use gemini::GeminiClient;
pub use openai::OpenAIClient;
pub use types::{Message, Content, ContentPart};
