pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_COMPLETIONS_PATH: &str = "/v1/chat/completions";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_COMPLETIONS_PATH: &str = "/chat/completions";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.5-flash-lite";

// Unified enum to wrap different provider configurations
#[derive(Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    /// Gemini through its OpenAI-compatible endpoint
    Gemini(OpenAiProviderConfig),
}

#[derive(Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub completions_path: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn openai<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            model: OPENAI_DEFAULT_MODEL.to_string(),
            completions_path: OPENAI_COMPLETIONS_PATH.to_string(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    pub fn gemini<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: GEMINI_HOST.to_string(),
            api_key: api_key.into(),
            model: GEMINI_DEFAULT_MODEL.to_string(),
            completions_path: GEMINI_COMPLETIONS_PATH.to_string(),
            temperature: Some(0.0),
            max_tokens: None,
        }
    }

    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = model.into();
        self
    }
}
