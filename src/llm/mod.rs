// ABOUTME: LLM module - the language model boundary used by the agent loop.
// ABOUTME: Defines transcript types, the LlmClient trait, and the Ollama client.

mod client;
mod ollama;
mod types;

pub use client::*;
pub use ollama::*;
pub use types::*;

#[cfg(test)]
mod types_test;
