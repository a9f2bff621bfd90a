//! Per-thread conversation history.
//!
//! Each thread is an append-only log guarded by its own async mutex, so a turn holds exclusive
//! access to one thread while other threads proceed independently. Readers never take that
//! lock: every append also lands in a committed copy that `ConversationStore::snapshot` serves.
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::errors::{ConversationError, ConversationResult};
use crate::models::message::Message;
use crate::models::role::Role;

type Committed = Arc<Mutex<Vec<Message>>>;

#[derive(Debug)]
pub struct Thread {
    id: String,
    messages: Vec<Message>,
    committed: Committed,
    corrupted: Option<String>,
}

impl Thread {
    fn new(id: &str, committed: Committed) -> Self {
        Self {
            id: id.to_string(),
            messages: Vec::new(),
            committed,
            corrupted: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn corrupted_error(&self, reason: &str) -> ConversationError {
        ConversationError::ThreadCorrupted {
            thread_id: self.id.clone(),
            reason: reason.to_string(),
        }
    }

    /// Validate the persisted history, marking the thread corrupted on the first violation
    pub fn check(&mut self) -> ConversationResult<()> {
        if let Some(reason) = &self.corrupted {
            return Err(self.corrupted_error(reason));
        }
        if let Err(reason) = validate_history(&self.messages) {
            tracing::error!(thread_id = %self.id, %reason, "conversation history is corrupted");
            let err = self.corrupted_error(&reason);
            self.corrupted = Some(reason);
            return Err(err);
        }
        Ok(())
    }

    pub fn append(&mut self, message: Message) -> ConversationResult<()> {
        self.append_all(vec![message])
    }

    /// Append several messages at once; either all of them land or none do
    pub fn append_all(&mut self, messages: Vec<Message>) -> ConversationResult<()> {
        if let Some(reason) = &self.corrupted {
            return Err(self.corrupted_error(reason));
        }
        self.committed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(messages.iter().cloned());
        self.messages.extend(messages);
        Ok(())
    }
}

/// Check the ordering rules between tool requests and tool results.
///
/// Every tool message must answer a still unanswered request of the nearest preceding
/// assistant message, with only tool messages in between, and every request must be answered
/// before the next user or assistant message.
pub fn validate_history(messages: &[Message]) -> Result<(), String> {
    let mut pending: HashSet<String> = HashSet::new();
    let mut seen_assistant = false;

    for (position, message) in messages.iter().enumerate() {
        match message.role {
            Role::Tool => {
                if !seen_assistant {
                    return Err(format!(
                        "tool result at position {} has no preceding assistant message",
                        position
                    ));
                }
                let id = message.tool_call_id().ok_or_else(|| {
                    format!(
                        "tool message at position {} must answer exactly one tool call",
                        position
                    )
                })?;
                if !pending.remove(id) {
                    return Err(format!(
                        "tool result '{}' at position {} does not answer an open tool call",
                        id, position
                    ));
                }
            }
            Role::User | Role::Assistant => {
                if let Some(id) = pending.iter().next() {
                    return Err(format!(
                        "tool call '{}' was never answered before position {}",
                        id, position
                    ));
                }
                if message.role == Role::Assistant {
                    seen_assistant = true;
                    for request in message.tool_requests() {
                        if !pending.insert(request.id.clone()) {
                            return Err(format!(
                                "tool call id '{}' is repeated at position {}",
                                request.id, position
                            ));
                        }
                    }
                } else if !message.tool_responses().is_empty() {
                    return Err(format!(
                        "user message at position {} carries a tool result",
                        position
                    ));
                }
            }
        }
    }

    if let Some(id) = pending.iter().next() {
        return Err(format!("tool call '{}' was never answered", id));
    }
    Ok(())
}

#[derive(Debug, Clone)]
struct ThreadHandle {
    turn: Arc<AsyncMutex<Thread>>,
    committed: Committed,
}

/// In-memory store of every thread, keyed by thread id
#[derive(Debug, Default)]
pub struct ConversationStore {
    threads: Mutex<HashMap<String, ThreadHandle>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn thread(&self, thread_id: &str) -> ThreadHandle {
        let mut threads = self.threads.lock().unwrap_or_else(|e| e.into_inner());
        threads
            .entry(thread_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(%thread_id, "created conversation thread");
                let committed = Committed::default();
                ThreadHandle {
                    turn: Arc::new(AsyncMutex::new(Thread::new(thread_id, committed.clone()))),
                    committed,
                }
            })
            .clone()
    }

    /// Exclusive access to a thread, created on first reference
    pub async fn lock(&self, thread_id: &str) -> OwnedMutexGuard<Thread> {
        self.thread(thread_id).turn.lock_owned().await
    }

    /// The thread's committed history, without waiting for a turn in progress
    pub fn snapshot(&self, thread_id: &str) -> Vec<Message> {
        self.thread(thread_id)
            .committed
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub async fn append(&self, thread_id: &str, message: Message) -> ConversationResult<()> {
        self.lock(thread_id).await.append(message)
    }

    pub fn contains(&self, thread_id: &str) -> bool {
        self.threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(thread_id)
    }

    pub fn thread_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .threads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tool::ToolCall;
    use serde_json::json;

    fn request(id: &str) -> Message {
        Message::assistant().with_tool_request(
            id,
            Ok(ToolCall::new("retrieve_knowledge", json!({"query": "pricing"}))),
        )
    }

    fn response(id: &str) -> Message {
        Message::tool().with_tool_response(id, Ok("Pro plan costs $79/month.".to_string()))
    }

    #[test]
    fn test_valid_history() {
        let messages = vec![
            Message::user().with_text("Tell me about your pricing."),
            request("1").with_tool_request("2", Ok(ToolCall::new("x", json!({})))),
            response("2"),
            response("1"),
            Message::assistant().with_text("Pro is $79/month."),
        ];
        assert!(validate_history(&messages).is_ok());
    }

    #[test]
    fn test_orphaned_tool_result() {
        let messages = vec![Message::user().with_text("Hi!"), response("1")];
        let err = validate_history(&messages).unwrap_err();
        assert!(err.contains("no preceding assistant"));
    }

    #[test]
    fn test_mismatched_tool_call_id() {
        let messages = vec![Message::user().with_text("Hi!"), request("1"), response("2")];
        let err = validate_history(&messages).unwrap_err();
        assert!(err.contains("'2'"));
    }

    #[test]
    fn test_tool_result_after_intervening_message() {
        let messages = vec![
            request("1"),
            response("1"),
            Message::assistant().with_text("Done"),
            response("1"),
        ];
        assert!(validate_history(&messages).is_err());
    }

    #[test]
    fn test_unanswered_tool_call() {
        let messages = vec![request("1"), Message::user().with_text("Hello?")];
        let err = validate_history(&messages).unwrap_err();
        assert!(err.contains("never answered"));

        assert!(validate_history(&[request("1")]).is_err());
    }

    #[tokio::test]
    async fn test_store_creates_threads_on_first_reference() {
        let store = ConversationStore::new();
        assert!(!store.contains("a"));
        assert!(store.snapshot("a").is_empty());
        assert!(store.contains("a"));

        store
            .append("b", Message::user().with_text("Hi!"))
            .await
            .unwrap();
        assert_eq!(store.thread_ids(), vec!["a", "b"]);
        assert_eq!(store.snapshot("b").len(), 1);
        assert!(store.snapshot("a").is_empty());
    }

    #[tokio::test]
    async fn test_corrupted_thread_refuses_appends() {
        let store = ConversationStore::new();
        store.append("t", response("1")).await.unwrap();

        let mut thread = store.lock("t").await;
        assert!(matches!(
            thread.check(),
            Err(ConversationError::ThreadCorrupted { .. })
        ));
        assert!(thread.check().is_err());
        let err = thread
            .append(Message::user().with_text("Hi!"))
            .unwrap_err();
        assert!(matches!(err, ConversationError::ThreadCorrupted { thread_id, .. } if thread_id == "t"));
        assert_eq!(thread.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_does_not_wait_for_a_turn() {
        let store = ConversationStore::new();
        store
            .append("t", Message::user().with_text("Hi!"))
            .await
            .unwrap();

        let mut thread = store.lock("t").await;
        thread
            .append_all(vec![request("1"), response("1")])
            .unwrap();

        // the turn still holds the lock
        let history = store.snapshot("t");
        assert_eq!(history.len(), 3);
        assert_eq!(history[2].tool_call_id(), Some("1"));
        drop(thread);
    }
}
