//! # Stakeholder Core
//!
//! Domain types, traits, and error definitions for consulting stakeholder
//! personas. This crate has **no framework dependencies**. It defines the
//! domain model that every other crate implements against.
//!
//! ## Seams
//!
//! Each external collaborator is a trait here, with implementations in
//! their own crates:
//! - [`Provider`]: the completion call (`stakeholder-providers`)
//! - [`ConsultationLog`]: the durable exchange log (`stakeholder-log`)
//! - [`RosterSource`]: the declarative persona roster (`stakeholder-config`)
//! - [`RuntimePersistence`]: the runtime persona mirror (`stakeholder-personas`)
//! - [`Tool`]: the exposed operation surface (`stakeholder-tools`)

pub mod consultation;
pub mod error;
pub mod log;
pub mod message;
pub mod persona;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use consultation::{
    Artifact, ArtifactKind, ConsultationContext, ConsultationResult, FeedbackSummary, GroupError,
    GroupMode, GroupOutcome, HistoryStyle, LogFilter, LoggedExchange,
};
pub use error::{Error, Result};
pub use log::ConsultationLog;
pub use message::{Message, Role};
pub use persona::{
    NewPersona, Persona, PersonaConfig, PersonaFilter, PersonaPatch, PersonaSummary, Personality,
    PersonalityPatch, Provenance, RosterSource, RuntimePersistence, SourceFilter,
};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use tool::{Tool, ToolCall, ToolDefinition, ToolRegistry, ToolResult};
