use super::{
    base::Provider,
    configs::{OpenAiProviderConfig, ProviderConfig},
    openai::OpenAiProvider,
};
use anyhow::Result;
use strum_macros::{Display, EnumIter, EnumString};

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Gemini,
}

impl ProviderType {
    /// The environment variable holding this provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            ProviderType::OpenAi => "OPENAI_API_KEY",
            ProviderType::Gemini => "GOOGLE_API_KEY",
        }
    }

    /// The default configuration for this provider, optionally with another model
    pub fn config(&self, api_key: impl Into<String>, model: Option<&str>) -> ProviderConfig {
        let config = match self {
            ProviderType::OpenAi => OpenAiProviderConfig::openai(api_key),
            ProviderType::Gemini => OpenAiProviderConfig::gemini(api_key),
        };
        let config = match model {
            Some(model) => config.with_model(model),
            None => config,
        };
        match self {
            ProviderType::OpenAi => ProviderConfig::OpenAi(config),
            ProviderType::Gemini => ProviderConfig::Gemini(config),
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Box<dyn Provider + Send + Sync>> {
    match config {
        ProviderConfig::OpenAi(openai_config) => Ok(Box::new(OpenAiProvider::new(openai_config)?)),
        ProviderConfig::Gemini(gemini_config) => Ok(Box::new(OpenAiProvider::new(gemini_config)?)),
    }
}
