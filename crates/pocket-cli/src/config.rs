use config::{
    Config as ConfigLoader, ConfigError, Environment, File, FileFormat, FileSourceFile, Map,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use pocket_llm::ProviderType;
use pocket_session::{GenerationConfig, ResumePolicy, SessionConfig, TitlePolicy};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub session: SessionSettings,
    pub storage: StorageConfig,
    pub log: LogConfig,

    // Secret (from ENV only)
    #[serde(skip)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: ProviderType,
    pub model: String,
    /// Custom endpoint, e.g. a proxy or a local mock
    #[serde(default)]
    pub base_url: Option<String>,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    /// 0 disables the timeout
    #[serde(default)]
    pub request_timeout_secs: u64,
}

impl From<&LlmConfig> for GenerationConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub title_policy: TitlePolicy,
    #[serde(default)]
    pub resume_policy: ResumePolicy,
    #[serde(default)]
    pub reply_delay_ms: u64,
    #[serde(default)]
    pub system_instruction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

fn default_storage_key() -> String {
    pocket_persist::DEFAULT_HISTORY_KEY.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables (LLM__MODEL, LOG__LEVEL, STORAGE__DIR, SESSION__TITLE_POLICY, ...)
    ///
    /// The API key is read from the provider's variable (`GEMINI_API_KEY` or
    /// `OPENAI_API_KEY`). A missing key is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let files = vec![
            // 1. Load default config
            File::with_name("config/default").required(false),
            // 2. Load environment-specific config
            File::with_name(&format!("config/{}", env)).required(false),
        ];
        // 3. Environment variables override everything
        let mut cfg = Self::layered(files, None)?;
        cfg.api_key = read_api_key(cfg.llm.provider);

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load `path` overridden by `vars` instead of the process environment
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
        vars: Map<String, String>,
    ) -> Result<Self, ConfigError> {
        Self::layered(vec![File::from(path.as_ref())], Some(vars))
    }

    fn layered(
        files: Vec<File<FileSourceFile, FileFormat>>,
        vars: Option<Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigLoader::builder();
        for file in files {
            builder = builder.add_source(file);
        }
        for prefix in ENV_SECTIONS {
            builder = builder.add_source(section_env(prefix, vars.clone()));
        }

        builder.build()?.try_deserialize()
    }

    /// Store configuration derived from the `llm` and `session` sections
    pub fn session_config(&self) -> SessionConfig {
        let timeout = match self.llm.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let mut config = SessionConfig::new()
            .with_model(self.llm.model.clone())
            .with_generation(GenerationConfig::from(&self.llm))
            .with_title_policy(self.session.title_policy)
            .with_resume_policy(self.session.resume_policy)
            .with_reply_delay(Duration::from_millis(self.session.reply_delay_ms))
            .with_request_timeout(timeout);
        if let Some(instruction) = &self.session.system_instruction {
            config = config.with_system_instruction(instruction.clone());
        }
        config
    }
}

/// Sections that can be overridden from the environment
const ENV_SECTIONS: [&str; 4] = ["LLM", "LOG", "STORAGE", "SESSION"];

/// `PREFIX__FIELD` variables mapped onto the `prefix` section
fn section_env(prefix: &str, vars: Option<Map<String, String>>) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("__")
        .separator("__")
        .keep_prefix(true)
        .try_parsing(true)
        .source(vars)
}

fn read_api_key(provider: ProviderType) -> Option<String> {
    std::env::var(provider.api_key_env())
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}
