use anyhow::Result;
use std::sync::Arc;

use crate::configuration::Settings;
use leadbot::agent::Agent;
use leadbot::conversation::ConversationStore;
use leadbot::leads::{JsonlSink, LeadSink, LogSink};
use leadbot::providers::factory::get_provider;
use leadbot::tools::sales_registry;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub knowledge_available: bool,
}

impl AppState {
    pub fn new(agent: Agent, knowledge_available: bool) -> Self {
        Self {
            agent: Arc::new(agent),
            knowledge_available,
        }
    }

    /// Wire the provider, knowledge index, lead sink and agent from settings
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let provider_type = settings.provider.provider_type();
        let provider = get_provider(settings.provider.into_config())?;

        let index = settings.knowledge.load_index().map(Arc::new);
        let knowledge_available = index.is_some();

        let sink: Arc<dyn LeadSink> = match &settings.leads.path {
            Some(path) => Arc::new(JsonlSink::new(path)),
            None => Arc::new(LogSink),
        };

        let registry = sales_registry(
            index,
            settings.knowledge.top_k,
            sink,
            settings.agent.tool_timeout(),
        )?;
        let agent = Agent::new(
            provider,
            registry,
            Arc::new(ConversationStore::new()),
            settings.agent.into_config(),
        )?;

        tracing::info!(
            provider = %provider_type,
            knowledge_available,
            "agent ready"
        );
        Ok(Self::new(agent, knowledge_available))
    }
}
