use async_trait::async_trait;
use indoc::indoc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::registry::{ToolDefinition, ToolExecutor};
use crate::errors::{AgentError, AgentResult};
use crate::knowledge::KnowledgeIndex;
use crate::models::tool::Tool;

pub const RETRIEVE_KNOWLEDGE: &str = "retrieve_knowledge";

/// Returned for every call while the knowledge base could not be built
pub const KNOWLEDGE_UNAVAILABLE: &str = "The knowledge base is currently unavailable.";

const NO_RESULTS: &str = "No relevant information was found in the knowledge base.";

#[derive(Debug, Deserialize)]
struct RetrieveArguments {
    query: String,
}

/// Looks up passages in the knowledge index, or reports it unavailable when there is none
pub struct RetrieveKnowledge {
    index: Option<Arc<KnowledgeIndex>>,
    top_k: usize,
}

impl RetrieveKnowledge {
    pub fn new(index: Option<Arc<KnowledgeIndex>>, top_k: usize) -> Self {
        Self { index, top_k }
    }

    pub fn tool() -> Tool {
        Tool::new(
            RETRIEVE_KNOWLEDGE,
            indoc! {"
                Useful for answering questions about AutoStream pricing, plans, features and
                policies. Returns the most relevant passages of the product knowledge base."},
            json!({
                "type": "object",
                "required": ["query"],
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to look up, in plain words."
                    }
                }
            }),
        )
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition::new(Self::tool(), self)
    }
}

#[async_trait]
impl ToolExecutor for RetrieveKnowledge {
    async fn execute(&self, arguments: Value) -> AgentResult<String> {
        let arguments: RetrieveArguments = serde_json::from_value(arguments)
            .map_err(|e| AgentError::InvalidArguments(e.to_string()))?;

        let Some(index) = &self.index else {
            tracing::warn!("knowledge lookup requested while the knowledge base is unavailable");
            return Ok(KNOWLEDGE_UNAVAILABLE.to_string());
        };

        let passages = index.query(&arguments.query, self.top_k);
        tracing::debug!(query = %arguments.query, passages = passages.len(), "knowledge lookup");
        if passages.is_empty() {
            return Ok(NO_RESULTS.to_string());
        }

        Ok(passages
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
