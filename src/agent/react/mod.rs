//! Bounded Thought → Action → Observation reasoning.
//!
//! The [`ReasoningAgent`] asks the model for one step at a time, invokes the
//! named tool, feeds the result back as an observation, and stops at a
//! final answer or after `max_steps` model decisions.

mod agent;
mod parser;

use std::time::Duration;

use serde::Serialize;
use serde::ser::SerializeStruct;

pub use agent::{FINISH_ACTION, ReasonerAgent, ReasoningAgent};
pub use parser::{ReactOutput, ReactParser};

use super::answer::serialize_duration;
use crate::error::AgentError;

/// One recorded step of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentStep {
    /// The model's reasoning for this step.
    pub thought: String,
    /// Tool name, or [`FINISH_ACTION`] for the final step.
    pub action: String,
    /// Tool input, or the final answer for the final step.
    pub action_input: String,
    /// What the tool returned; absent on the final step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

/// A successful run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    /// The answer returned to the user.
    pub final_answer: String,
    /// Every step taken, in order.
    pub intermediate_steps: Vec<AgentStep>,
    /// Tokens consumed by the agent and its tools.
    pub total_tokens: u32,
    /// Wall-clock duration of the run.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

/// A failed run, with the steps taken before the failure.
#[derive(Debug, thiserror::Error)]
#[error("{error}")]
pub struct RunFailure {
    /// Why the run stopped.
    #[source]
    pub error: AgentError,
    /// Steps completed before the failure.
    pub intermediate_steps: Vec<AgentStep>,
}

impl RunFailure {
    /// Wraps an error raised before any step was taken.
    #[must_use]
    pub const fn new(error: AgentError) -> Self {
        Self {
            error,
            intermediate_steps: Vec::new(),
        }
    }
}

impl From<AgentError> for RunFailure {
    fn from(error: AgentError) -> Self {
        Self::new(error)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl Serialize for RunFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let body = ErrorBody {
            kind: self.error.kind(),
            message: self.error.to_string(),
        };
        let mut state = serializer.serialize_struct("RunFailure", 2)?;
        state.serialize_field("error", &body)?;
        state.serialize_field("intermediate_steps", &self.intermediate_steps)?;
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_failure_serializes_kind_and_message() {
        let failure = RunFailure {
            error: AgentError::MaxStepsExceeded { max_steps: 2 },
            intermediate_steps: vec![AgentStep {
                thought: "look it up".to_string(),
                action: "legal_documents".to_string(),
                action_input: "q".to_string(),
                observation: Some("nothing".to_string()),
            }],
        };
        let json = serde_json::to_value(&failure).unwrap_or_default();
        assert_eq!(json["error"]["kind"], "max_steps_exceeded");
        assert!(json["error"]["message"].as_str().is_some_and(|m| m.contains('2')));
        assert_eq!(json["intermediate_steps"][0]["observation"], "nothing");
    }

    #[test]
    fn test_final_step_omits_observation() {
        let step = AgentStep {
            thought: String::new(),
            action: FINISH_ACTION.to_string(),
            action_input: "done".to_string(),
            observation: None,
        };
        let json = serde_json::to_value(&step).unwrap_or_default();
        assert!(json.get("observation").is_none());
        assert_eq!(json["action"], "finish");
    }
}
