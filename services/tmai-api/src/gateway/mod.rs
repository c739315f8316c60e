//! Application services composing the gateway: key issuance,
//! authentication, quota enforcement, ingestion, retrieval, and the chat
//! orchestrator that ties them together.

mod authenticator;
mod chat;
mod ingest;
mod issuer;
mod quota;
mod retrieve;

pub use authenticator::Authenticator;
pub use chat::{ChatOrchestrator, ChatRequestScope};
pub use ingest::IngestionPipeline;
pub use issuer::KeyIssuer;
pub use quota::{QuotaEnforcer, METER_ACCEPTED_REQUESTS};
pub use retrieve::Retriever;
