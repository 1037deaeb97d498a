//! Multi-agent task orchestration over a local Ollama server.
//!
//! Agents are named workers bound to one model and system prompt, grouped
//! into [`agents::AgentGroup`]s that share memory and keep an execution
//! history. Tasks run through one of four protocols: manager-coordinated
//! planning, a single named agent, a multi-agent fan-out, or inline
//! `@Name:` directives. All execution failures are returned as tagged
//! result envelopes rather than errors.
//!
//! The [`api`] module exposes the whole thing over HTTP.

pub mod agents;
pub mod api;
pub mod config;
pub mod llm;
pub mod store;

pub use agents::{Agent, AgentGroup};
pub use config::Config;
