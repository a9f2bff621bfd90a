use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

pub const DEFAULT_TOOL_TIMEOUT: Duration = Duration::from_secs(30);

/// The capability behind a tool: arguments in, result text out
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, arguments: Value) -> AgentResult<String>;
}

/// A catalog entry together with the executor that runs it
#[derive(Clone)]
pub struct ToolDefinition {
    pub tool: Tool,
    executor: Arc<dyn ToolExecutor>,
}

impl ToolDefinition {
    pub fn new(tool: Tool, executor: impl ToolExecutor + 'static) -> Self {
        Self {
            tool,
            executor: Arc::new(executor),
        }
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    schema: JSONSchema,
}

/// Holds the tools the oracle may call and dispatches calls to them
pub struct ToolRegistry {
    tools: Vec<RegisteredTool>,
    timeout: Duration,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_TOOL_TIMEOUT)
    }
}

impl ToolRegistry {
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: Vec::new(),
            timeout,
        }
    }

    /// Add a tool, names must be unique and the parameter schema must compile
    pub fn register(&mut self, definition: ToolDefinition) -> AgentResult<()> {
        if self.get(&definition.tool.name).is_some() {
            return Err(AgentError::DuplicateTool(definition.tool.name));
        }
        let schema = JSONSchema::compile(&definition.tool.parameters).map_err(|e| {
            AgentError::InvalidSchema(format!("'{}': {}", definition.tool.name, e))
        })?;
        tracing::debug!(tool = %definition.tool.name, "registered tool");
        self.tools.push(RegisteredTool { definition, schema });
        Ok(())
    }

    /// The catalog offered to the oracle, in registration order
    pub fn tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|t| t.definition.tool.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.registered(name).map(|t| &t.definition)
    }

    fn registered(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.definition.tool.name == name)
    }

    /// Validate the arguments against the tool's schema and run it under the call timeout
    pub async fn invoke(&self, name: &str, arguments: Value) -> AgentResult<String> {
        let registered = self
            .registered(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;

        validate_arguments(name, &registered.schema, &arguments)?;

        let execution = registered.definition.executor.execute(arguments);
        match tokio::time::timeout(self.timeout, execution).await {
            Ok(result) => result,
            Err(_) => Err(AgentError::ExecutionFailed(format!(
                "'{}' timed out after {}s",
                name,
                self.timeout.as_secs_f32()
            ))),
        }
    }
}

fn validate_arguments(name: &str, schema: &JSONSchema, arguments: &Value) -> AgentResult<()> {
    if !arguments.is_object() {
        return Err(AgentError::InvalidArguments(format!(
            "arguments for '{}' must be a JSON object",
            name
        )));
    }
    if let Err(errors) = schema.validate(arguments) {
        let issues = errors.map(|e| e.to_string()).collect::<Vec<_>>();
        return Err(AgentError::InvalidArguments(format!(
            "arguments for '{}' do not match its schema: {}",
            name,
            issues.join("; ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoExecutor;

    #[async_trait]
    impl ToolExecutor for EchoExecutor {
        async fn execute(&self, arguments: Value) -> AgentResult<String> {
            Ok(arguments["message"].as_str().unwrap_or("").to_string())
        }
    }

    struct SlowExecutor;

    #[async_trait]
    impl ToolExecutor for SlowExecutor {
        async fn execute(&self, _arguments: Value) -> AgentResult<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("too late".to_string())
        }
    }

    fn echo_tool() -> Tool {
        Tool::new(
            "echo",
            "Echoes back the input",
            json!({
                "type": "object",
                "properties": {"message": {"type": "string"}},
                "required": ["message"]
            }),
        )
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry
            .register(ToolDefinition::new(echo_tool(), EchoExecutor))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_invoke() {
        let result = registry()
            .invoke("echo", json!({"message": "hello"}))
            .await
            .unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry().invoke("fly", json!({})).await.unwrap_err();
        assert_eq!(err, AgentError::UnknownTool("fly".to_string()));
    }

    #[tokio::test]
    async fn test_missing_required_argument() {
        let err = registry().invoke("echo", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(msg) if msg.contains("\"message\"")));
    }

    #[tokio::test]
    async fn test_wrong_argument_type() {
        let err = registry()
            .invoke("echo", json!({"message": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(msg) if msg.contains("\"string\"")));
    }

    #[tokio::test]
    async fn test_arguments_must_be_object() {
        let err = registry()
            .invoke("echo", json!("hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_execution_failure() {
        let mut registry = ToolRegistry::new(Duration::from_millis(20));
        registry
            .register(ToolDefinition::new(
                Tool::new("slow", "Takes its time", json!({"type": "object"})),
                SlowExecutor,
            ))
            .unwrap();

        let err = registry.invoke("slow", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(msg) if msg.contains("timed out")));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = registry();
        let err = registry
            .register(ToolDefinition::new(echo_tool(), EchoExecutor))
            .unwrap_err();
        assert_eq!(err, AgentError::DuplicateTool("echo".to_string()));
        assert_eq!(registry.tools().len(), 1);
    }

    struct PlatformExecutor;

    #[async_trait]
    impl ToolExecutor for PlatformExecutor {
        async fn execute(&self, arguments: Value) -> AgentResult<String> {
            Ok(arguments["platform"].as_str().unwrap_or("").to_string())
        }
    }

    fn platform_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry
            .register(ToolDefinition::new(
                Tool::new(
                    "pick_platform",
                    "Records a platform",
                    json!({
                        "type": "object",
                        "properties": {
                            "platform": {"type": "string", "enum": ["YouTube", "Instagram"]}
                        },
                        "required": ["platform"],
                        "additionalProperties": false
                    }),
                ),
                PlatformExecutor,
            ))
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn test_enum_violation() {
        let registry = platform_registry();
        let err = registry
            .invoke("pick_platform", json!({"platform": "TikTok"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(msg) if msg.contains("TikTok")));

        let result = registry
            .invoke("pick_platform", json!({"platform": "YouTube"}))
            .await
            .unwrap();
        assert_eq!(result, "YouTube");
    }

    #[tokio::test]
    async fn test_additional_property_violation() {
        let err = platform_registry()
            .invoke("pick_platform", json!({"platform": "YouTube", "extra": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidArguments(msg) if msg.contains("extra")));
    }

    #[test]
    fn test_invalid_schema_is_rejected() {
        let mut registry = ToolRegistry::default();
        let err = registry
            .register(ToolDefinition::new(
                Tool::new("broken", "Bad schema", json!({"type": "not-a-type"})),
                EchoExecutor,
            ))
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidSchema(msg) if msg.contains("broken")));
        assert!(registry.tools().is_empty());
    }
}
