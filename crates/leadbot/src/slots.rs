//! Mechanical checks on `capture_lead` calls, applied before the call reaches the registry.
//!
//! The oracle is asked to collect the three slots before capturing a lead. The guard verifies
//! that it did: every slot value must have been typed by the user somewhere in the thread, and
//! the same lead must not be captured twice in one thread.
use serde_json::Value;
use std::collections::HashSet;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::Message;
use crate::models::role::Role;
use crate::tools::capture_lead::{LeadArguments, CAPTURE_LEAD};

#[derive(Debug, Default)]
pub struct SlotGuard {
    user_text: String,
    captured: Vec<LeadArguments>,
}

impl SlotGuard {
    pub fn from_history(history: &[Message]) -> Self {
        let user_text = history
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.text().to_lowercase())
            .collect::<Vec<_>>()
            .join("\n");

        let succeeded: HashSet<&str> = history
            .iter()
            .filter(|m| m.role == Role::Tool)
            .flat_map(|m| m.tool_responses())
            .filter(|r| r.tool_result.is_ok())
            .map(|r| r.id.as_str())
            .collect();

        let captured = history
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .flat_map(|m| m.tool_requests())
            .filter(|r| succeeded.contains(r.id.as_str()))
            .filter_map(|r| r.tool_call.as_ref().ok())
            .filter(|call| call.name == CAPTURE_LEAD)
            .filter_map(|call| LeadArguments::from_value(call.arguments.clone()).ok())
            .collect();

        Self {
            user_text,
            captured,
        }
    }

    /// Approve or reject one `capture_lead` call.
    ///
    /// Arguments that do not even parse are let through so the registry reports them with the
    /// schema error. Approved calls count as captured for the rest of the batch.
    pub fn check(&mut self, arguments: &Value) -> AgentResult<()> {
        let Ok(lead) = LeadArguments::from_value(arguments.clone()) else {
            return Ok(());
        };

        for (slot, value) in lead.slots() {
            let value = value.trim().to_lowercase();
            if !value.is_empty() && !self.user_text.contains(&value) {
                return Err(AgentError::InvalidArguments(format!(
                    "the {} '{}' was not provided by the user, ask for it before capturing the lead",
                    slot,
                    value
                )));
            }
        }

        if self.captured.iter().any(|previous| previous.same_lead(&lead)) {
            return Err(AgentError::ExecutionFailed(
                "a lead with these details was already captured in this conversation".to_string(),
            ));
        }

        self.captured.push(lead);
        Ok(())
    }
}
