use anyhow::Result;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::errors::{AgentError, AgentResult};

lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex");
}

/// A qualified lead, produced once all three slots are known
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: String,
    pub email: String,
    pub platform: String,
    pub captured_at: DateTime<Utc>,
}

impl LeadRecord {
    /// Build a record from raw slot values, trimming them and rejecting empty or malformed ones
    pub fn new(name: &str, email: &str, platform: &str) -> AgentResult<Self> {
        let name = required_slot("name", name)?;
        let email = required_slot("email", email)?;
        let platform = required_slot("platform", platform)?;

        if !EMAIL.is_match(&email) {
            return Err(AgentError::InvalidArguments(format!(
                "'{}' is not a valid email address",
                email
            )));
        }

        Ok(Self {
            name,
            email,
            platform,
            captured_at: Utc::now(),
        })
    }
}

fn required_slot(slot: &str, value: &str) -> AgentResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AgentError::InvalidArguments(format!(
            "'{}' must not be empty",
            slot
        )));
    }
    Ok(value.to_string())
}

/// Where captured leads go
pub trait LeadSink: Send + Sync {
    fn emit(&self, lead: &LeadRecord) -> Result<()>;
}

/// Emits each lead as a structured log event
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl LeadSink for LogSink {
    fn emit(&self, lead: &LeadRecord) -> Result<()> {
        tracing::info!(
            target: "leadbot::lead",
            name = %lead.name,
            email = %lead.email,
            platform = %lead.platform,
            "Lead captured successfully"
        );
        Ok(())
    }
}

/// Appends each lead as one JSON line to a file
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }
}

impl LeadSink for JsonlSink {
    fn emit(&self, lead: &LeadRecord) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("lead file lock poisoned"))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(lead)?)?;
        Ok(())
    }
}

/// Keeps leads in memory, for hosts that forward them elsewhere and for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    leads: Mutex<Vec<LeadRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leads(&self) -> Vec<LeadRecord> {
        self.leads
            .lock()
            .map(|leads| leads.clone())
            .unwrap_or_default()
    }
}

impl LeadSink for MemorySink {
    fn emit(&self, lead: &LeadRecord) -> Result<()> {
        self.leads
            .lock()
            .map_err(|_| anyhow::anyhow!("lead store lock poisoned"))?
            .push(lead.clone());
        Ok(())
    }
}
