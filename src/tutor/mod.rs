//! Tutoring session plumbing around the hosted model.

pub mod client;
pub mod knowledge;
pub mod retry;
pub mod session;

pub use client::{GeminiClient, Responder, ResponseRequest, Role, Turn};
pub use knowledge::{FALLBACK_CONTEXT, load_knowledge_base, system_instruction};
pub use retry::RetryPolicy;
pub use session::TutorSession;
