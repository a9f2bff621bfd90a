use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use regex::Regex;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

use leadbot::agent::{Agent, AgentConfig};
use leadbot::conversation::{validate_history, ConversationStore};
use leadbot::knowledge::{load_documents, Chunking, KnowledgeIndex};
use leadbot::leads::MemorySink;
use leadbot::models::message::Message;
use leadbot::models::role::Role;
use leadbot::models::tool::{Tool, ToolCall};
use leadbot::providers::base::{Provider, Usage};
use leadbot::tools::registry::DEFAULT_TOOL_TIMEOUT;
use leadbot::tools::{sales_registry, CAPTURE_LEAD, KNOWLEDGE_UNAVAILABLE, RETRIEVE_KNOWLEDGE};

const SCRIPT: [&str; 7] = [
    "Hi!",
    "Tell me about your pricing.",
    "That sounds good. I want to sign up for the Pro plan.",
    "Wait, does the Pro plan actually have 24/7 support?",
    "Okay cool. My name is Samarth.",
    "My email is sam@test.com.",
    "I create content for YouTube.",
];

/// An oracle that follows the sales policy with fixed rules instead of a model
struct RuleBasedOracle;

impl RuleBasedOracle {
    fn user_texts(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.text())
            .collect()
    }

    fn lead_captured(messages: &[Message]) -> bool {
        messages
            .iter()
            .flat_map(|m| m.tool_requests())
            .filter_map(|r| r.tool_call.as_ref().ok())
            .any(|call| call.name == CAPTURE_LEAD)
    }

    fn slots(user_texts: &[String]) -> (Option<String>, Option<String>, Option<String>) {
        let name_re = Regex::new(r"(?i)my name is (\w+)").unwrap();
        let email_re = Regex::new(r"[\w.+-]+@[\w-]+\.[a-z]+").unwrap();
        let all = user_texts.join("\n");

        let name = name_re.captures(&all).map(|c| c[1].to_string());
        let email = email_re.find(&all).map(|m| m.as_str().to_string());
        let platform = ["YouTube", "Instagram", "TikTok"]
            .into_iter()
            .find(|p| all.to_lowercase().contains(&p.to_lowercase()))
            .map(str::to_string);
        (name, email, platform)
    }
}

#[async_trait]
impl Provider for RuleBasedOracle {
    async fn complete(
        &self,
        _system: &str,
        messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let last = messages.last().expect("a turn always starts with a user message");
        let call_id = format!("call_{}", messages.len());

        if last.role == Role::Tool {
            let text = last
                .tool_responses()
                .first()
                .map(|r| r.text())
                .unwrap_or_default();
            return Ok((
                Message::assistant().with_text(format!("Here is what I have: {}", text)),
                Usage::default(),
            ));
        }

        let text = last.text().to_lowercase();
        let reply = if ["pricing", "support", "refund"]
            .iter()
            .any(|topic| text.contains(topic))
        {
            Message::assistant().with_tool_request(
                call_id,
                Ok(ToolCall::new(RETRIEVE_KNOWLEDGE, json!({"query": last.text()}))),
            )
        } else {
            let users = Self::user_texts(messages);
            let intent = users.iter().any(|t| t.to_lowercase().contains("sign up"));
            if intent && !Self::lead_captured(messages) {
                match Self::slots(&users) {
                    (Some(name), Some(email), Some(platform)) => Message::assistant()
                        .with_tool_request(
                            call_id,
                            Ok(ToolCall::new(
                                CAPTURE_LEAD,
                                json!({"name": name, "email": email, "platform": platform}),
                            )),
                        ),
                    (None, _, _) => Message::assistant().with_text("Great! What's your name?"),
                    (_, None, _) => Message::assistant().with_text("Thanks! What's your email?"),
                    (_, _, None) => {
                        Message::assistant().with_text("Which platform do you create content for?")
                    }
                }
            } else {
                Message::assistant().with_text("Hi! How can I help you with AutoStream today?")
            }
        };

        Ok((reply, Usage::default()))
    }
}

fn knowledge_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/knowledge.json")
}

fn sales_agent(index: Option<Arc<KnowledgeIndex>>) -> (Agent, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let registry = sales_registry(index, 4, sink.clone(), DEFAULT_TOOL_TIMEOUT).unwrap();
    let agent = Agent::new(
        Box::new(RuleBasedOracle),
        registry,
        Arc::new(ConversationStore::new()),
        AgentConfig::default(),
    )
    .unwrap();
    (agent, sink)
}

fn autostream_index(chunking: Chunking) -> Arc<KnowledgeIndex> {
    let documents = load_documents(knowledge_path()).unwrap();
    Arc::new(KnowledgeIndex::build(documents, chunking).unwrap())
}

#[tokio::test]
async fn test_scripted_conversation_captures_one_lead() -> Result<()> {
    let (agent, sink) = sales_agent(Some(autostream_index(Chunking::Single)));

    let mut outcomes = Vec::new();
    for text in SCRIPT {
        outcomes.push(agent.turn("demo", text).await?);
    }

    // small talk needs no tool
    assert!(outcomes[0].tools_invoked.is_empty());
    // pricing goes through retrieval before the reply
    assert_eq!(outcomes[1].tools_invoked, vec![RETRIEVE_KNOWLEDGE]);
    assert!(outcomes[1].reply.contains("$79/month"));
    // intent asks for the name, the detour is answered, then slots are collected
    assert_eq!(outcomes[2].reply, "Great! What's your name?");
    assert_eq!(outcomes[3].tools_invoked, vec![RETRIEVE_KNOWLEDGE]);
    assert!(outcomes[3].reply.contains("24/7"));
    assert_eq!(outcomes[4].reply, "Thanks! What's your email?");
    assert_eq!(outcomes[5].reply, "Which platform do you create content for?");
    assert_eq!(outcomes[6].tools_invoked, vec![CAPTURE_LEAD]);
    assert!(outcomes[6].reply.contains("Lead saved successfully."));

    for outcome in &outcomes {
        assert!(outcome.iterations <= AgentConfig::default().max_iterations);
        assert!(!outcome.fallback);
    }

    let leads = sink.leads();
    assert_eq!(leads.len(), 1);
    assert_eq!(leads[0].name, "Samarth");
    assert_eq!(leads[0].email, "sam@test.com");
    assert_eq!(leads[0].platform, "YouTube");

    let history = agent.store().snapshot("demo");
    assert!(validate_history(&history).is_ok());
    let captures = history
        .iter()
        .flat_map(|m| m.tool_requests())
        .filter_map(|r| r.tool_call.as_ref().ok())
        .filter(|call| call.name == CAPTURE_LEAD)
        .count();
    assert_eq!(captures, 1);
    Ok(())
}

#[tokio::test]
async fn test_history_invariant_holds_after_every_turn() -> Result<()> {
    let (agent, _sink) = sales_agent(Some(autostream_index(Chunking::PerSection)));

    for text in SCRIPT {
        agent.send("t", text).await?;
        let history = agent.store().snapshot("t");
        assert!(validate_history(&history).is_ok());
        assert_eq!(history.last().unwrap().role, Role::Assistant);
    }
    Ok(())
}

#[tokio::test]
async fn test_degraded_knowledge_still_completes_turns() -> Result<()> {
    let missing = tempfile::tempdir()?.path().join("missing.json");
    assert!(load_documents(&missing).is_err());

    let (agent, sink) = sales_agent(None);
    for text in SCRIPT {
        agent.send("t", text).await?;
    }

    let history = agent.store().snapshot("t");
    let knowledge_results: Vec<String> = history
        .iter()
        .filter(|m| m.role == Role::Tool)
        .flat_map(|m| m.tool_responses())
        .filter_map(|r| r.tool_result.clone().ok())
        .filter(|text| text != "Lead saved successfully.")
        .collect();
    assert_eq!(knowledge_results.len(), 2);
    assert!(knowledge_results.iter().all(|t| t == KNOWLEDGE_UNAVAILABLE));
    assert_eq!(sink.leads().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_parallel_threads_each_capture_their_own_lead() -> Result<()> {
    let (agent, sink) = sales_agent(Some(autostream_index(Chunking::Single)));
    let agent = Arc::new(agent);

    let runs = (0..3).map(|i| {
        let agent = agent.clone();
        async move {
            let thread_id = format!("thread-{}", i);
            for text in SCRIPT {
                agent.send(&thread_id, text).await?;
            }
            anyhow::Ok(thread_id)
        }
    });

    for result in join_all(runs).await {
        let thread_id = result?;
        let history = agent.store().snapshot(&thread_id);
        assert!(validate_history(&history).is_ok());
        assert_eq!(
            history.iter().filter(|m| m.role == Role::User).count(),
            SCRIPT.len()
        );
    }

    assert_eq!(sink.leads().len(), 3);
    assert_eq!(agent.store().thread_ids().len(), 3);
    Ok(())
}
