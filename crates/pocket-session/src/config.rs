use serde::{Deserialize, Serialize};
use std::time::Duration;

use pocket_llm::ChatOptions;

use crate::prompts::{FALLBACK_REPLY, INTRO_PROMPT};

/// When a successful user turn rewrites the thread title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitlePolicy {
    /// Every turn overwrites the title with the latest message
    #[default]
    EveryTurn,
    /// Only the first answered user turn names the thread
    FirstTurnOnly,
}

impl TitlePolicy {
    /// `untitled` is true while the thread still has its default title
    pub fn should_retitle(&self, untitled: bool) -> bool {
        match self {
            TitlePolicy::EveryTurn => true,
            TitlePolicy::FirstTurnOnly => untitled,
        }
    }
}

/// Context given to a session rebuilt for a thread that has no live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Intro prompt followed by the thread's whole message log
    #[default]
    ReplayHistory,
    /// Intro prompt and the opening reply only; earlier turns are forgotten
    SystemPromptOnly,
}

/// Sampling parameters for every session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_output_tokens: 100,
            temperature: 0.9,
            top_p: 0.8,
            top_k: 40,
        }
    }
}

impl From<&GenerationConfig> for ChatOptions {
    fn from(config: &GenerationConfig) -> Self {
        ChatOptions::new()
            .max_tokens(config.max_output_tokens)
            .temperature(config.temperature)
            .top_p(config.top_p)
            .top_k(config.top_k)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub model: String,
    /// Sent as the first user turn of every new session
    pub intro_prompt: String,
    /// Provider-level system instruction, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    pub fallback_reply: String,
    pub generation: GenerationConfig,
    pub title_policy: TitlePolicy,
    pub resume_policy: ResumePolicy,
    /// Pause before an assistant reply is appended
    pub reply_delay: Duration,
    /// Upper bound for each remote call; `None` waits forever
    pub request_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-pro".to_string(),
            intro_prompt: INTRO_PROMPT.to_string(),
            system_instruction: None,
            fallback_reply: FALLBACK_REPLY.to_string(),
            generation: GenerationConfig::default(),
            title_policy: TitlePolicy::default(),
            resume_policy: ResumePolicy::default(),
            reply_delay: Duration::ZERO,
            request_timeout: Some(Duration::from_secs(60)),
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_intro_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.intro_prompt = prompt.into();
        self
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_fallback_reply(mut self, reply: impl Into<String>) -> Self {
        self.fallback_reply = reply.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_title_policy(mut self, policy: TitlePolicy) -> Self {
        self.title_policy = policy;
        self
    }

    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}
