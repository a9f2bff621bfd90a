use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment};
use leadbot::agent::{AgentConfig, DEFAULT_MAX_ITERATIONS};
use leadbot::knowledge::KnowledgeConfig;
use leadbot::providers::configs::{
    OpenAiProviderConfig, ProviderConfig, GEMINI_COMPLETIONS_PATH, GEMINI_DEFAULT_MODEL,
    GEMINI_HOST, OPENAI_COMPLETIONS_PATH, OPENAI_DEFAULT_MODEL, OPENAI_HOST,
};
use leadbot::providers::factory::ProviderType;
use leadbot::tools::registry::DEFAULT_TOOL_TIMEOUT;
use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerSettings {
    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_openai_path")]
        completions_path: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Gemini {
        #[serde(default = "default_gemini_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_gemini_model")]
        model: String,
        #[serde(default = "default_gemini_path")]
        completions_path: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Gemini { .. } => ProviderType::Gemini,
        }
    }

    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                completions_path,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                completions_path,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Gemini {
                host,
                api_key,
                model,
                completions_path,
                temperature,
                max_tokens,
            } => ProviderConfig::Gemini(OpenAiProviderConfig {
                host,
                api_key,
                model,
                completions_path,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AgentSettings {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    #[serde(default = "default_oracle_timeout_secs")]
    pub oracle_timeout_secs: u64,
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_slot_guard")]
    pub slot_guard: bool,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub policy_path: Option<PathBuf>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            oracle_timeout_secs: default_oracle_timeout_secs(),
            tool_timeout_secs: default_tool_timeout_secs(),
            slot_guard: default_slot_guard(),
            company: None,
            product: None,
            policy_path: None,
        }
    }
}

impl AgentSettings {
    /// Reject limits that would fail every turn or every tool call
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("agent.max_iterations", self.max_iterations as u64),
            ("agent.oracle_timeout_secs", self.oracle_timeout_secs),
            ("agent.tool_timeout_secs", self.tool_timeout_secs),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    env_var: to_env_var(field),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn into_config(self) -> AgentConfig {
        let defaults = AgentConfig::default();
        AgentConfig {
            max_iterations: self.max_iterations,
            oracle_timeout: Duration::from_secs(self.oracle_timeout_secs),
            slot_guard: self.slot_guard,
            company: self.company.unwrap_or(defaults.company),
            product: self.product.unwrap_or(defaults.product),
            policy_path: self.policy_path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadsSettings {
    /// JSONL file receiving captured leads; they are only logged when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub provider: ProviderSettings,
    #[serde(default)]
    pub agent: AgentSettings,
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub leads: LeadsSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::load_and_validate()
    }

    fn load_and_validate() -> Result<Self, ConfigError> {
        // Start with default configuration
        let config = Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("knowledge.path", default_knowledge_path())?
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix("LEADBOT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => {
                settings.agent.validate()?;
                Ok(settings)
            }
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                if let config::ConfigError::NotFound(field) = &err {
                    return Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    });
                }
                match missing_field(&err.to_string()) {
                    Some(field) => Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&qualify(field)),
                    }),
                    None => Err(ConfigError::Other(err)),
                }
            }
        }
    }
}

/// The field name out of a "missing field `name`" message
fn missing_field(message: &str) -> Option<&str> {
    let rest = &message[message.find("missing field `")? + "missing field `".len()..];
    Some(&rest[..rest.find('`')?])
}

/// Serde reports missing fields without their section; the required ones are all provider fields
fn qualify(field: &str) -> String {
    match field {
        "provider" => "provider.type".to_string(),
        "type" | "api_key" => format!("provider.{}", field),
        other => other.to_string(),
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_knowledge_path() -> String {
    "data/knowledge.json".to_string()
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    OPENAI_DEFAULT_MODEL.to_string()
}

fn default_openai_path() -> String {
    OPENAI_COMPLETIONS_PATH.to_string()
}

fn default_gemini_host() -> String {
    GEMINI_HOST.to_string()
}

fn default_gemini_model() -> String {
    GEMINI_DEFAULT_MODEL.to_string()
}

fn default_gemini_path() -> String {
    GEMINI_COMPLETIONS_PATH.to_string()
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

fn default_oracle_timeout_secs() -> u64 {
    60
}

fn default_tool_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT.as_secs()
}

fn default_slot_guard() -> bool {
    true
}
