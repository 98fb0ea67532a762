// ABOUTME: Root module for deepmux - MCP tool aggregation with a policy-filtered agent loop.
// ABOUTME: Re-exports the main types from submodules.

pub mod agent;
pub mod builder;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod mcp;
pub mod policy;
pub mod prelude;
pub mod prompt;
pub mod tool;
pub mod trace;

pub use builder::{Agent, build_agent, build_from_config};
pub use error::DeepMuxError;
