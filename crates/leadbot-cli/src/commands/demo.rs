use anyhow::Result;
use uuid::Uuid;

use crate::session::session_file::session_path;
use crate::session::Session;
use leadbot::agent::Agent;

/// Greeting, a pricing question, purchase intent, a detour about support and then the three
/// details the assistant needs to capture the lead
pub const DEMO_SCRIPT: [&str; 7] = [
    "Hi!",
    "Tell me about your pricing.",
    "That sounds good. I want to sign up for the Pro plan.",
    "Wait, does the Pro plan actually have 24/7 support?",
    "Okay cool. My name is Samarth.",
    "My email is sam@test.com.",
    "I create content for YouTube.",
];

pub async fn execute(agent: Agent, thread: Option<String>) -> Result<()> {
    let thread_id = thread.unwrap_or_else(|| format!("demo-{}", Uuid::new_v4()));
    let session = Session::new(agent, thread_id.clone(), session_path(&thread_id)?);
    session.run_script(&DEMO_SCRIPT).await
}
