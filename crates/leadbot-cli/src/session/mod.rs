pub mod session_file;

use anyhow::Result;
use cliclack::{input, spinner};
use console::style;
use std::path::PathBuf;

use leadbot::agent::{Agent, TurnOutcome};
use leadbot::tools::{CAPTURE_LEAD, RETRIEVE_KNOWLEDGE};
use session_file::{persist_messages, read_messages};

pub struct Session {
    agent: Agent,
    thread_id: String,
    session_file: PathBuf,
}

impl Session {
    pub fn new(agent: Agent, thread_id: String, session_file: PathBuf) -> Self {
        Session {
            agent,
            thread_id,
            session_file,
        }
    }

    /// Load any earlier transcript of this thread into the agent's store
    pub async fn resume(&self) -> Result<usize> {
        let messages = read_messages(&self.session_file)?;
        let count = messages.len();
        for message in messages {
            self.agent.store().append(&self.thread_id, message).await?;
        }
        Ok(count)
    }

    /// Interactive loop until the user types "exit" or interrupts the prompt
    pub async fn start(&self) -> Result<()> {
        self.setup_session().await?;

        loop {
            let text: String = match input("Message:").placeholder("").interact() {
                Ok(text) => text,
                Err(_) => break,
            };
            if text.trim().eq_ignore_ascii_case("exit") {
                break;
            }
            if text.trim().is_empty() {
                continue;
            }

            self.process(&text).await?;
        }

        self.close_session();
        Ok(())
    }

    /// Send each line as a user turn, echoing both sides
    pub async fn run_script(&self, script: &[&str]) -> Result<()> {
        self.setup_session().await?;

        for text in script {
            println!("{} {}", style("User:").cyan().bold(), text);
            self.process(text).await?;
        }

        self.close_session();
        Ok(())
    }

    async fn process(&self, text: &str) -> Result<()> {
        let spin = spinner();
        spin.start("awaiting reply");

        tokio::select! {
            outcome = self.agent.turn(&self.thread_id, text) => {
                spin.stop("");
                match outcome {
                    Ok(outcome) => render_outcome(&outcome),
                    Err(e) => {
                        tracing::warn!(error = %e, "turn failed");
                        render_reply(e.fallback_reply());
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                spin.stop("");
                println!(
                    "{}",
                    style("Interrupt: the last message was cancelled.").yellow()
                );
            }
        }

        let messages = self.agent.store().snapshot(&self.thread_id);
        persist_messages(&self.session_file, &messages)
            .unwrap_or_else(|e| eprintln!("Failed to persist messages: {}", e));
        Ok(())
    }

    async fn setup_session(&self) -> Result<()> {
        let resumed = self.resume().await?;
        println!(
            "Starting session {}. Recording to {}",
            style(&self.thread_id).bold(),
            self.session_file.display()
        );
        if resumed > 0 {
            println!("Resumed {} earlier messages.", resumed);
        }
        println!("{}\n", style("- type \"exit\" to end the session").dim());
        Ok(())
    }

    fn close_session(&self) {
        println!("Closing session. Recorded to {}", self.session_file.display());
    }
}

fn render_outcome(outcome: &TurnOutcome) {
    if outcome
        .tools_invoked
        .iter()
        .any(|name| name == RETRIEVE_KNOWLEDGE)
    {
        println!("{}", style("(checking knowledge base…)").dim());
    }
    if outcome.tools_invoked.iter().any(|name| name == CAPTURE_LEAD) {
        println!("{}", style(">>> Lead captured <<<").green().bold());
    }
    render_reply(&outcome.reply);
}

fn render_reply(reply: &str) {
    println!("{} {}\n", style("Agent:").magenta().bold(), reply);
}
