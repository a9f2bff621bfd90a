use anyhow::Result;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use leadbot::models::message::Message;

pub fn ensure_session_dir() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    let config_dir = home_dir.join(".config").join("leadbot").join("sessions");

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

/// The transcript file of a thread
pub fn session_path(thread_id: &str) -> Result<PathBuf> {
    Ok(ensure_session_dir()?.join(format!("{}.jsonl", thread_id)))
}

pub fn persist_messages(session_file: &Path, messages: &[Message]) -> Result<()> {
    let file = File::create(session_file)?; // Create or truncate the file
    write_messages(file, messages)
}

fn write_messages(session_file: File, messages: &[Message]) -> Result<()> {
    let mut writer = std::io::BufWriter::new(session_file);

    for message in messages {
        serde_json::to_writer(&mut writer, &message)?;
        writeln!(writer)?;
    }

    writer.flush()?;
    Ok(())
}

/// Read back a transcript; a missing file is an empty thread
pub fn read_messages(session_file: &Path) -> Result<Vec<Message>> {
    if !session_file.exists() {
        return Ok(Vec::new());
    }

    let reader = BufReader::new(File::open(session_file)?);
    let mut messages = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        messages.push(serde_json::from_str(&line)?);
    }
    Ok(messages)
}
