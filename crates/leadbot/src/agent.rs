use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::conversation::ConversationStore;
use crate::errors::{AgentResult, ConversationError, ConversationResult};
use crate::models::message::{Message, MessageContent, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::prompt_template::{load_prompt, load_prompt_file, SYSTEM_POLICY_TEMPLATE};
use crate::providers::base::Provider;
use crate::slots::SlotGuard;
use crate::tools::{ToolRegistry, CAPTURE_LEAD};

pub const DEFAULT_MAX_ITERATIONS: usize = 5;
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Oracle consultations allowed in a single user turn
    pub max_iterations: usize,
    pub oracle_timeout: Duration,
    /// Check `capture_lead` calls against what the user actually said
    pub slot_guard: bool,
    pub company: String,
    pub product: String,
    /// A policy template to use instead of the built-in one
    pub policy_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            slot_guard: true,
            company: "AutoStream".to_string(),
            product: "a video editing SaaS for content creators".to_string(),
            policy_path: None,
        }
    }
}

#[derive(Serialize)]
struct PolicyContext<'a> {
    company: &'a str,
    product: &'a str,
    tools: &'a [Tool],
}

/// Where the dialogue loop currently is within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingUserInput,
    Deciding,
    ExecutingTools,
}

/// What a completed turn produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnOutcome {
    pub reply: String,
    /// Oracle consultations used by the turn
    pub iterations: usize,
    /// Names of the tools requested during the turn, in request order
    pub tools_invoked: Vec<String>,
    /// The reply is a fallback because the oracle could not be reached
    pub fallback: bool,
}

/// Agent drives a conversation: it consults the oracle, runs the tools it asks for and
/// records every step in the thread's history
pub struct Agent {
    provider: Box<dyn Provider>,
    registry: ToolRegistry,
    store: Arc<ConversationStore>,
    config: AgentConfig,
    policy: String,
}

impl Agent {
    /// Create an agent, rendering the policy once from the configured template
    pub fn new(
        provider: Box<dyn Provider>,
        registry: ToolRegistry,
        store: Arc<ConversationStore>,
        config: AgentConfig,
    ) -> Result<Self> {
        let tools = registry.tools();
        let context = PolicyContext {
            company: &config.company,
            product: &config.product,
            tools: &tools,
        };
        let policy = match &config.policy_path {
            Some(path) => load_prompt_file(path.clone(), &context)?,
            None => load_prompt(SYSTEM_POLICY_TEMPLATE, &context)?,
        };

        Ok(Self {
            provider,
            registry,
            store,
            config,
            policy,
        })
    }

    /// The system policy sent as the first message of every oracle request
    pub fn policy(&self) -> &str {
        &self.policy
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.registry.tools()
    }

    /// Send a user message on a thread and get the assistant's reply
    pub async fn send(&self, thread_id: &str, user_text: &str) -> ConversationResult<String> {
        self.turn(thread_id, user_text).await.map(|outcome| outcome.reply)
    }

    /// Run one user turn to completion.
    ///
    /// The thread stays locked for the whole turn. The user message is appended first; each
    /// tool batch is appended together with the assistant message that requested it once every
    /// call resolved, so dropping this future never leaves an unanswered tool call behind.
    pub async fn turn(&self, thread_id: &str, user_text: &str) -> ConversationResult<TurnOutcome> {
        let mut thread = self.store.lock(thread_id).await;
        thread.check()?;
        thread.append(Message::user().with_text(user_text))?;

        let tools = self.registry.tools();
        let mut iterations = 0;
        let mut tools_invoked = Vec::new();

        loop {
            if iterations >= self.config.max_iterations {
                tracing::warn!(
                    %thread_id,
                    limit = self.config.max_iterations,
                    ?tools_invoked,
                    "tool loop exceeded, aborting turn"
                );
                return Err(ConversationError::ToolLoopExceeded {
                    limit: self.config.max_iterations,
                });
            }
            iterations += 1;
            tracing::debug!(%thread_id, iteration = iterations, state = ?TurnState::Deciding);

            let response = match self.consult(thread.messages(), &tools).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(%thread_id, error = %e, "oracle unavailable");
                    return Ok(TurnOutcome {
                        reply: e.fallback_reply().to_string(),
                        iterations,
                        tools_invoked,
                        fallback: true,
                    });
                }
            };

            let response = normalize_request_ids(response, iterations);
            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();

            if requests.is_empty() {
                let reply = response.text();
                thread.append(response)?;
                tracing::debug!(%thread_id, state = ?TurnState::AwaitingUserInput);
                tracing::info!(%thread_id, iterations, ?tools_invoked, "turn complete");
                return Ok(TurnOutcome {
                    reply,
                    iterations,
                    tools_invoked,
                    fallback: false,
                });
            }

            tracing::debug!(%thread_id, calls = requests.len(), state = ?TurnState::ExecutingTools);
            tools_invoked.extend(
                requests
                    .iter()
                    .filter_map(|r| r.tool_call.as_ref().ok())
                    .map(|call| call.name.clone()),
            );

            let results = self.dispatch_batch(thread.messages(), &requests).await;
            let mut batch = Vec::with_capacity(results.len() + 1);
            batch.push(response);
            batch.extend(results);
            thread.append_all(batch)?;
        }
    }

    async fn consult(&self, history: &[Message], tools: &[Tool]) -> ConversationResult<Message> {
        let completion = self.provider.complete(&self.policy, history, tools);
        match tokio::time::timeout(self.config.oracle_timeout, completion).await {
            Ok(Ok((mut message, usage))) => {
                tracing::debug!(total_tokens = ?usage.total_tokens, "oracle responded");
                message.role = Role::Assistant;
                Ok(message)
            }
            Ok(Err(e)) => Err(ConversationError::OracleUnavailable(e.to_string())),
            Err(_) => Err(ConversationError::OracleUnavailable(format!(
                "no response within {}s",
                self.config.oracle_timeout.as_secs_f32()
            ))),
        }
    }

    /// Run every request of a batch and produce one tool message per request, in order
    async fn dispatch_batch(&self, history: &[Message], requests: &[ToolRequest]) -> Vec<Message> {
        let mut guard = self
            .config
            .slot_guard
            .then(|| SlotGuard::from_history(history));

        let mut calls = Vec::with_capacity(requests.len());
        for request in requests {
            let approval = match (&request.tool_call, guard.as_mut()) {
                (Ok(call), Some(guard)) if call.name == CAPTURE_LEAD => guard.check(&call.arguments),
                _ => Ok(()),
            };
            calls.push(self.dispatch_tool_call(request.tool_call.clone(), approval));
        }

        // Calls in a batch do not depend on each other, so they run concurrently
        let outputs = join_all(calls).await;

        requests
            .iter()
            .zip(outputs)
            .map(|(request, output)| {
                if let Err(e) = &output {
                    tracing::debug!(id = %request.id, error = %e, "tool call failed");
                }
                Message::tool().with_tool_response(request.id.clone(), output)
            })
            .collect()
    }

    /// Dispatch a single tool call to the registry
    async fn dispatch_tool_call(
        &self,
        tool_call: AgentResult<ToolCall>,
        approval: AgentResult<()>,
    ) -> AgentResult<String> {
        let call = tool_call?;
        approval?;
        tracing::debug!(tool = %call.name, "dispatching tool call");
        self.registry.invoke(&call.name, call.arguments).await
    }
}

/// Give every request of a response a non-empty id that is unique within the batch
fn normalize_request_ids(mut message: Message, iteration: usize) -> Message {
    let mut seen = HashSet::new();
    for (index, content) in message.content.iter_mut().enumerate() {
        if let MessageContent::ToolRequest(request) = content {
            if request.id.is_empty() || !seen.insert(request.id.clone()) {
                request.id = format!("call_{}_{}", iteration, index);
                seen.insert(request.id.clone());
            }
        }
    }
    message
}
