//! Generation model abstraction for the TMAI chat pipeline.
//!
//! The generation call is an opaque external collaborator: one assembled
//! prompt in, one completion out, bounded by a timeout. Failures surface
//! as errors and are never retried at this layer; retry policy belongs to
//! the caller.

mod mock;
mod model;
mod remote;
mod types;

pub use mock::MockChatModel;
pub use model::ChatModel;
pub use remote::{RemoteChatConfig, RemoteChatModel};
pub use types::{GenerationRequest, GenerationResponse, LlmError, LlmResult, TokenUsage};
