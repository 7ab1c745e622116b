//! Transports for the stakeholder tool surface.
//!
//! - [`mcp`]: the MCP JSON-RPC dispatcher, served over stdio
//! - [`http`]: an axum gateway exposing the same tools plus `/mcp`
//! - [`auth`]: API-key middleware for the gateway

pub mod auth;
pub mod http;
pub mod mcp;

pub use http::{build_router, start, GatewayState};
pub use mcp::McpServer;
