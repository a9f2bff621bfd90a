//! These models represent the objects passed around by the agent
//!
//! There are two formats we need to interact with:
//! - openai-compatible chat completion messages/tools, sent from the agent to the oracle
//! - the persisted conversation log kept per thread
//!
//! We always immediately convert the wire format into these internal structs using the
//! helpers in `providers::utils`, so the rest of the crate never sees raw JSON messages.
pub mod message;
pub mod role;
pub mod tool;
