use async_trait::async_trait;
use indoc::indoc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use super::registry::{ToolDefinition, ToolExecutor};
use crate::errors::{AgentError, AgentResult};
use crate::leads::{LeadRecord, LeadSink};
use crate::models::tool::Tool;

pub const CAPTURE_LEAD: &str = "capture_lead";

pub const LEAD_SAVED: &str = "Lead saved successfully.";

#[derive(Debug, Clone, Deserialize)]
pub struct LeadArguments {
    pub name: String,
    pub email: String,
    pub platform: String,
}

impl LeadArguments {
    pub fn from_value(arguments: Value) -> AgentResult<Self> {
        serde_json::from_value(arguments).map_err(|e| AgentError::InvalidArguments(e.to_string()))
    }

    pub fn slots(&self) -> [(&'static str, &str); 3] {
        [
            ("name", self.name.as_str()),
            ("email", self.email.as_str()),
            ("platform", self.platform.as_str()),
        ]
    }

    /// True when both carry the same slot values, ignoring case and surrounding whitespace
    pub fn same_lead(&self, other: &LeadArguments) -> bool {
        self.slots()
            .iter()
            .zip(other.slots().iter())
            .all(|((_, a), (_, b))| a.trim().eq_ignore_ascii_case(b.trim()))
    }

    pub fn into_record(self) -> AgentResult<LeadRecord> {
        LeadRecord::new(&self.name, &self.email, &self.platform)
    }
}

/// Emits a lead record once all three slots are present in a single call
pub struct CaptureLead {
    sink: Arc<dyn LeadSink>,
}

impl CaptureLead {
    pub fn new(sink: Arc<dyn LeadSink>) -> Self {
        Self { sink }
    }

    pub fn tool() -> Tool {
        Tool::new(
            CAPTURE_LEAD,
            indoc! {"
                Save a qualified lead. Call this ONLY when the user has given their name, their
                email and the content platform they create for (YouTube, Instagram, ...)."},
            json!({
                "type": "object",
                "required": ["name", "email", "platform"],
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "The user's name."
                    },
                    "email": {
                        "type": "string",
                        "description": "The user's email address."
                    },
                    "platform": {
                        "type": "string",
                        "description": "The platform the user creates content for."
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
impl ToolExecutor for CaptureLead {
    async fn execute(&self, arguments: Value) -> AgentResult<String> {
        let lead = LeadArguments::from_value(arguments)?.into_record()?;

        self.sink
            .emit(&lead)
            .map_err(|e| AgentError::ExecutionFailed(format!("could not record lead: {}", e)))?;

        tracing::info!(platform = %lead.platform, "lead captured");
        Ok(LEAD_SAVED.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leads::MemorySink;

    struct FailingSink;

    impl LeadSink for FailingSink {
        fn emit(&self, _lead: &LeadRecord) -> anyhow::Result<()> {
            Err(anyhow::anyhow!("disk full"))
        }
    }

    #[tokio::test]
    async fn test_capture_emits_one_record() {
        let sink = Arc::new(MemorySink::new());
        let tool = CaptureLead::new(sink.clone());

        let result = tool
            .execute(json!({"name": "Samarth", "email": "sam@test.com", "platform": "YouTube"}))
            .await
            .unwrap();

        assert_eq!(result, LEAD_SAVED);
        let leads = sink.leads();
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "Samarth");
        assert_eq!(leads[0].email, "sam@test.com");
        assert_eq!(leads[0].platform, "YouTube");
    }

    #[tokio::test]
    async fn test_capture_rejects_missing_or_empty_slots() {
        let sink = Arc::new(MemorySink::new());
        let tool = CaptureLead::new(sink.clone());

        let missing = tool
            .execute(json!({"name": "Samarth", "email": "sam@test.com"}))
            .await
            .unwrap_err();
        assert!(matches!(missing, AgentError::InvalidArguments(_)));

        let empty = tool
            .execute(json!({"name": "", "email": "sam@test.com", "platform": "YouTube"}))
            .await
            .unwrap_err();
        assert!(matches!(empty, AgentError::InvalidArguments(msg) if msg.contains("'name'")));

        assert!(sink.leads().is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_is_execution_failure() {
        let tool = CaptureLead::new(Arc::new(FailingSink));
        let err = tool
            .execute(json!({"name": "Samarth", "email": "sam@test.com", "platform": "YouTube"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(msg) if msg.contains("disk full")));
    }
}
