use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use crate::errors::AgentError;
use crate::models::message::{Message, MessageContent};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};

/// Stands in for a tool request the oracle malformed, so its error result still has a call to answer
pub const INVALID_TOOL_CALL: &str = "invalid_tool_call";

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    let mut messages_spec = Vec::new();

    for message in messages {
        match message.role {
            Role::Tool => {
                for response in message.tool_responses() {
                    messages_spec.push(json!({
                        "role": "tool",
                        "content": response.text(),
                        "tool_call_id": response.id,
                    }));
                }
            }
            Role::User | Role::Assistant => {
                let mut converted = json!({ "role": message.role });
                let text = message.text();
                if !text.is_empty() {
                    converted["content"] = json!(text);
                }

                let tool_calls: Vec<Value> = message
                    .content
                    .iter()
                    .filter_map(MessageContent::as_tool_request)
                    .map(|request| {
                        let (name, arguments) = match &request.tool_call {
                            Ok(tool_call) => (
                                sanitize_function_name(&tool_call.name),
                                tool_call.arguments.to_string(),
                            ),
                            Err(_) => (INVALID_TOOL_CALL.to_string(), "{}".to_string()),
                        };
                        json!({
                            "id": request.id,
                            "type": "function",
                            "function": {
                                "name": name,
                                "arguments": arguments,
                            }
                        })
                    })
                    .collect();

                if !tool_calls.is_empty() {
                    converted["tool_calls"] = json!(tool_calls);
                    if converted.get("content").is_none() {
                        converted["content"] = Value::Null;
                    }
                }

                if converted.get("content").is_some() || converted.get("tool_calls").is_some() {
                    messages_spec.push(converted);
                }
            }
        }
    }

    messages_spec
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to internal Message format
pub fn openai_response_to_message(response: Value) -> Result<Message> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("Response contained no message: {}", response))?;

    let mut message = Message::assistant();

    if let Some(text) = original.get("content").and_then(|t| t.as_str()) {
        if !text.is_empty() {
            message = message.with_text(text);
        }
    }

    if let Some(tool_calls) = original.get("tool_calls").and_then(|t| t.as_array()) {
        for tool_call in tool_calls {
            let id = tool_call["id"].as_str().unwrap_or_default().to_string();
            let function_name = tool_call["function"]["name"]
                .as_str()
                .unwrap_or_default()
                .to_string();
            let arguments = tool_call["function"]["arguments"]
                .as_str()
                .unwrap_or_default()
                .to_string();

            if !is_valid_function_name(&function_name) {
                let error = AgentError::UnknownTool(format!(
                    "The provided function name '{}' had invalid characters, it must match this regex [a-zA-Z0-9_-]+",
                    function_name
                ));
                message = message.with_tool_request(id, Err(error));
                continue;
            }

            // Some backends send an empty string for a call without arguments
            let arguments = if arguments.trim().is_empty() {
                "{}".to_string()
            } else {
                arguments
            };

            match serde_json::from_str::<Value>(&arguments) {
                Ok(params) => {
                    message =
                        message.with_tool_request(id, Ok(ToolCall::new(&function_name, params)));
                }
                Err(e) => {
                    let error = AgentError::InvalidArguments(format!(
                        "Could not interpret tool use parameters for id {}: {}",
                        id, e
                    ));
                    message = message.with_tool_request(id, Err(error));
                }
            }
        }
    }

    Ok(message)
}

lazy_static! {
    static ref INVALID_NAME_CHARS: Regex = Regex::new(r"[^a-zA-Z0-9_-]").expect("valid regex");
    static ref VALID_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex");
}

fn sanitize_function_name(name: &str) -> String {
    INVALID_NAME_CHARS.replace_all(name, "_").to_string()
}

fn is_valid_function_name(name: &str) -> bool {
    VALID_NAME.is_match(name)
}
