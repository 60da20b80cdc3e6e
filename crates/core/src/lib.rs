//! # Stepwise Core
//!
//! Domain types, traits, and error definitions for the Stepwise assistant.
//! This crate performs **no I/O**: it defines the domain model that the
//! provider, tool, agent, and presentation crates implement against.
//!
//! ## Contents
//!
//! - [`envelope`]: the Step Envelope protocol: the structured JSON object
//!   the model must emit each round, its tolerant decoder, and the
//!   synthesized observation encoder.
//! - [`message`]: role-tagged messages and the per-query conversation.
//! - [`provider`]: the trait over hosted model backends.
//! - [`error`]: error enums per bounded context.

pub mod envelope;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use envelope::{Step, StepEnvelope, observation_json, strip_code_fence};
pub use error::{EnvelopeError, ProviderError, ToolError};
pub use message::{Conversation, Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
