//! # Stakeholder Consult
//!
//! Turns a persona id and a question into a logged answer.
//!
//! - [`HistoryAssembler`] rebuilds the bounded per-session memory of a
//!   persona from logged exchanges.
//! - [`Orchestrator`] runs single and group consultations against a
//!   [`Provider`](stakeholder_core::Provider), recording each success in
//!   the [`ConsultationLog`](stakeholder_core::ConsultationLog).

pub mod history;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use history::{AssembledHistory, HistoryAssembler, HistoryPolicy};
pub use orchestrator::{ConsultRequest, Orchestrator};
