// ABOUTME: Defines the LlmClient trait - the single inference operation the
// ABOUTME: agent loop needs from any language model provider.

use async_trait::async_trait;

use super::{AssistantTurn, InferenceRequest};
use crate::error::LlmError;

/// Trait for language model providers.
///
/// One call sees the whole transcript, the tools the model may call and the
/// instruction preamble, and returns either a final answer or tool calls.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn infer(&self, request: &InferenceRequest<'_>) -> Result<AssistantTurn, LlmError>;
}
