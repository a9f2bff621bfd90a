use anyhow::Result;
use uuid::Uuid;

use crate::session::session_file::session_path;
use crate::session::Session;
use leadbot::agent::Agent;

pub async fn execute(agent: Agent, thread: Option<String>) -> Result<()> {
    let thread_id = thread.unwrap_or_else(|| Uuid::new_v4().to_string());
    let session = Session::new(agent, thread_id.clone(), session_path(&thread_id)?);
    session.start().await
}
