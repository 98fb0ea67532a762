// ABOUTME: AgentRun - one query driven through the reason/dispatch state machine.
// ABOUTME: Owns the transcript; shares the toolbox read-only with other runs.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::future::join_all;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::RuntimeConfig;
use crate::error::RunError;
use crate::llm::{InferenceRequest, LlmClient, Message, ToolCall, ToolDefinition, Usage};
use crate::tool::{ToolResult, Toolbox};

/// Cancellation and deadline for one execution.
///
/// Checked between state transitions and between sequential tool calls,
/// never in the middle of a model or tool call.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    pub cancel: CancellationToken,
    pub deadline: Option<Instant>,
}

impl RunControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn check(&self) -> Result<(), RunError> {
        if self.cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(RunError::DeadlineExceeded);
        }
        Ok(())
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,

    /// Final text from the model.
    pub answer: String,

    /// Number of reasoning steps taken.
    pub iterations: usize,

    /// Number of tool calls dispatched, including rejected ones.
    pub tool_call_count: usize,

    /// Total token usage across all model calls.
    pub usage: Usage,
}

#[derive(Debug)]
enum RunState {
    Start,
    Reasoning,
    ToolDispatch(VecDeque<ToolCall>),
    Done(String),
}

/// A single agent run.
///
/// A run that fails keeps its transcript and its current state, so the
/// caller can render what happened or call [`execute`](Self::execute) again
/// with a fresh [`RunControl`] after a cancellation.
pub struct AgentRun {
    run_id: String,
    query: String,
    client: Arc<dyn LlmClient>,
    config: Arc<RuntimeConfig>,
    toolbox: Arc<Toolbox>,
    definitions: Arc<[ToolDefinition]>,
    transcript: Vec<Message>,
    state: RunState,
    iterations: usize,
    tool_call_count: usize,
    next_call_id: usize,
    usage: Usage,
}

impl AgentRun {
    pub(crate) fn new(
        query: String,
        client: Arc<dyn LlmClient>,
        config: Arc<RuntimeConfig>,
        toolbox: Arc<Toolbox>,
        definitions: Arc<[ToolDefinition]>,
    ) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            query,
            client,
            config,
            toolbox,
            definitions,
            transcript: Vec::new(),
            state: RunState::Start,
            iterations: 0,
            tool_call_count: 0,
            next_call_id: 0,
            usage: Usage::default(),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Messages so far, in the order they were appended.
    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn into_transcript(self) -> Vec<Message> {
        self.transcript
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn tool_call_count(&self) -> usize {
        self.tool_call_count
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, RunState::Done(_))
    }

    /// Drive the run until it produces a final answer or fails.
    pub async fn execute(&mut self, control: &RunControl) -> Result<RunOutcome, RunError> {
        loop {
            if let RunState::Done(answer) = &self.state {
                return Ok(RunOutcome {
                    run_id: self.run_id.clone(),
                    answer: answer.clone(),
                    iterations: self.iterations,
                    tool_call_count: self.tool_call_count,
                    usage: self.usage,
                });
            }

            control.check()?;

            // A failed step leaves the run in Reasoning unless the step says otherwise.
            self.state = match std::mem::replace(&mut self.state, RunState::Reasoning) {
                RunState::Start => {
                    tracing::debug!(run_id = %self.run_id, "start");
                    self.transcript.push(Message::user(self.query.clone()));
                    RunState::Reasoning
                }
                RunState::Reasoning => self.reason().await?,
                RunState::ToolDispatch(calls) => self.dispatch(calls, control).await?,
                done @ RunState::Done(_) => done,
            };
        }
    }

    /// One model call. Leaves the run in `Reasoning` on failure.
    async fn reason(&mut self) -> Result<RunState, RunError> {
        if self.iterations >= self.config.max_iterations {
            tracing::warn!(
                run_id = %self.run_id,
                max_iterations = self.config.max_iterations,
                "iteration limit reached"
            );
            return Err(RunError::Exhausted {
                max_iterations: self.config.max_iterations,
            });
        }
        self.iterations += 1;
        tracing::debug!(run_id = %self.run_id, iteration = self.iterations, "reasoning");

        let request = InferenceRequest {
            model: &self.config.model,
            instructions: &self.config.instructions,
            transcript: &self.transcript,
            tools: &self.definitions,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };
        let mut turn = self.client.infer(&request).await?;
        self.usage.add(turn.usage);

        if !turn.has_tool_calls() {
            let answer = turn.content.clone().unwrap_or_default();
            if answer.is_empty() {
                tracing::warn!(
                    run_id = %self.run_id,
                    iteration = self.iterations,
                    "model returned neither content nor tool calls"
                );
            }
            self.transcript.push(turn.into_message());
            tracing::info!(
                run_id = %self.run_id,
                iterations = self.iterations,
                tool_calls = self.tool_call_count,
                "final answer"
            );
            return Ok(RunState::Done(answer));
        }

        for call in &mut turn.tool_calls {
            if call.id.is_empty() {
                self.next_call_id += 1;
                call.id = format!("call_{}", self.next_call_id);
            }
        }

        let calls: VecDeque<ToolCall> = turn.tool_calls.iter().cloned().collect();
        self.transcript.push(turn.into_message());
        Ok(RunState::ToolDispatch(calls))
    }

    /// Run the pending calls, appending results in request order.
    ///
    /// Sequential dispatch stops between calls when cancelled and keeps the
    /// remaining calls pending.
    async fn dispatch(
        &mut self,
        mut calls: VecDeque<ToolCall>,
        control: &RunControl,
    ) -> Result<RunState, RunError> {
        if self.config.parallel_tool_calls {
            let toolbox = &self.toolbox;
            let results = join_all(calls.iter().map(|call| invoke(toolbox, call))).await;
            for (call, result) in calls.iter().zip(results) {
                self.record(call, result);
            }
            return Ok(RunState::Reasoning);
        }

        let mut first = true;
        while let Some(call) = calls.pop_front() {
            if !first {
                if let Err(e) = control.check() {
                    calls.push_front(call);
                    self.state = RunState::ToolDispatch(calls);
                    return Err(e);
                }
            }
            first = false;

            let result = invoke(&self.toolbox, &call).await;
            self.record(&call, result);
        }

        Ok(RunState::Reasoning)
    }

    fn record(&mut self, call: &ToolCall, result: ToolResult) {
        self.tool_call_count += 1;
        self.transcript.push(Message::tool_result(call, result));
    }
}

async fn invoke(toolbox: &Toolbox, call: &ToolCall) -> ToolResult {
    tracing::debug!(tool = %call.name, call_id = %call.id, "dispatching tool call");
    match toolbox.invoke(&call.name, call.arguments.clone()).await {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(
                tool = %call.name,
                policy_violation = e.is_policy_violation(),
                error = %e,
                "tool call failed"
            );
            ToolResult::error(e.to_string())
        }
    }
}
