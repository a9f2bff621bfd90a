pub mod capture_lead;
pub mod registry;
pub mod retrieve_knowledge;

use std::sync::Arc;
use std::time::Duration;

use crate::errors::AgentResult;
use crate::knowledge::KnowledgeIndex;
use crate::leads::LeadSink;

pub use capture_lead::{CaptureLead, CAPTURE_LEAD};
pub use registry::{ToolDefinition, ToolExecutor, ToolRegistry};
pub use retrieve_knowledge::{RetrieveKnowledge, KNOWLEDGE_UNAVAILABLE, RETRIEVE_KNOWLEDGE};

/// The registry of a sales assistant: knowledge retrieval and lead capture.
///
/// Passing `None` for the index runs retrieval in degraded mode.
pub fn sales_registry(
    index: Option<Arc<KnowledgeIndex>>,
    top_k: usize,
    sink: Arc<dyn LeadSink>,
    timeout: Duration,
) -> AgentResult<ToolRegistry> {
    let mut registry = ToolRegistry::new(timeout);
    registry.register(RetrieveKnowledge::new(index, top_k).definition())?;
    registry.register(CaptureLead::new(sink).definition())?;
    Ok(registry)
}
