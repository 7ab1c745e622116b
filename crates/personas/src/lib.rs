//! Persona resolution and prompt construction.
//!
//! - [`PersonaStore`]: two keyed collections (config and runtime) merged
//!   into one namespace where runtime entries shadow config entries.
//! - [`prompt`]: system prompt rendering and context formatting.
//! - [`JsonFileStore`]: optional on-disk mirror of the runtime collection.

pub mod file_store;
pub mod prompt;
pub mod store;

pub use file_store::JsonFileStore;
pub use prompt::{build_context_string, build_system_prompt, build_user_prompt};
pub use store::{PersonaStore, StaticRoster};
