use serde::{Deserialize, Serialize};

/// The author of a persisted message.
///
/// The system policy is never persisted, it is supplied to the oracle on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}
