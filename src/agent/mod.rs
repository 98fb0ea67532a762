// ABOUTME: Agent module - the runtime that drives one query through the
// ABOUTME: reason/dispatch loop over a policy-filtered toolbox.

mod config;
mod run;
mod runtime;

pub use config::{DEFAULT_MAX_ITERATIONS, RuntimeConfig};
pub use run::{AgentRun, RunControl, RunOutcome};
pub use runtime::AgentRuntime;
