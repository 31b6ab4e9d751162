//! Output formatting for CLI commands.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::pipeline::LoadFailure;
use crate::agent::{AgentRun, PlannerAnswer, RunFailure};
use crate::core::DocumentSpec;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything unrecognised is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes a value as pretty JSON.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            let msg = e.to_string().replace('\\', "\\\\").replace('"', "\\\"");
            format!("{{\"error\": \"JSON serialization failed: {msg}\"}}")
        })
    }
}

/// Renders a completed agent run.
#[must_use]
pub fn format_run(run: &AgentRun, verbose: bool) -> String {
    let mut out = run.final_answer.clone();
    let _ = write!(
        out,
        "\n\n---\nSteps: {} | Tokens: {} | Time: {:.1}s",
        run.intermediate_steps.len(),
        run.total_tokens,
        run.elapsed.as_secs_f64()
    );
    if verbose {
        for (i, step) in run.intermediate_steps.iter().enumerate() {
            let _ = write!(out, "\n\nStep {}: {}", i + 1, step.action);
            if !step.thought.is_empty() {
                let _ = write!(out, "\n  Thought: {}", step.thought);
            }
            if let Some(observation) = &step.observation {
                let _ = write!(out, "\n  Input: {}", step.action_input);
                let _ = write!(out, "\n  Observation: {observation}");
            }
        }
    }
    out.push('\n');
    out
}

/// Renders a failed agent run.
#[must_use]
pub fn format_run_failure(failure: &RunFailure, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format.to_json(failure),
        OutputFormat::Text => {
            let mut out = format!("Run failed ({}): {}", failure.error.kind(), failure.error);
            for (i, step) in failure.intermediate_steps.iter().enumerate() {
                let _ = write!(out, "\n  Step {}: {} <- {}", i + 1, step.action, step.action_input);
            }
            out
        }
    }
}

/// Renders a planner answer with its per-document breakdown.
#[must_use]
pub fn format_planner_answer(answer: &PlannerAnswer, verbose: bool) -> String {
    let mut out = answer.response.clone();
    out.push_str("\n\n---\nSources:");
    for group in answer.sources() {
        let _ = write!(out, "\n[{}]", group.tool_name);
        for sub in &group.answers {
            let _ = write!(out, "\n  Q: {}\n  A: {}", sub.sub_question.sub_question, sub.text);
            if verbose {
                for passage in &sub.source_passages {
                    let _ = write!(out, "\n    - {} ({:.3})", passage.id(), passage.score);
                }
            }
        }
    }
    for failure in &answer.failures {
        let _ = write!(
            out,
            "\nFailed [{}] {}: {}",
            failure.sub_question.tool_name, failure.kind, failure.error
        );
    }
    for dropped in &answer.dropped {
        let _ = write!(
            out,
            "\nDropped (unknown tool '{}'): {}",
            dropped.tool_name, dropped.sub_question
        );
    }
    if answer.used_fallback {
        out.push_str("\nRouted the whole question to every document.");
    }
    let _ = write!(
        out,
        "\nSub-questions: {} | Answered: {} | Tokens: {} | Time: {:.1}s\n",
        answer.sub_questions.len(),
        answer.sub_answers.len(),
        answer.total_tokens,
        answer.elapsed.as_secs_f64()
    );
    out
}

/// Load status of one declared document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus<'a> {
    /// The declaration.
    #[serde(flatten)]
    pub spec: &'a DocumentSpec,
    /// `None` when not checked, otherwise whether the index loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded: Option<bool>,
    /// Load error, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

/// Pairs declarations with load failures; `failures` is `None` when the
/// indexes were not checked.
#[must_use]
pub fn document_statuses<'a>(
    documents: &'a [DocumentSpec],
    failures: Option<&'a [LoadFailure]>,
) -> Vec<DocumentStatus<'a>> {
    documents
        .iter()
        .map(|spec| {
            let failure = failures.and_then(|f| f.iter().find(|f| f.document == spec.id));
            DocumentStatus {
                spec,
                loaded: failures.map(|_| failure.is_none()),
                error: failure.map(|f| f.error.as_str()),
            }
        })
        .collect()
}

/// Renders document statuses as text.
#[must_use]
pub fn format_documents(statuses: &[DocumentStatus<'_>]) -> String {
    if statuses.is_empty() {
        return "No documents declared.\n".to_string();
    }
    let mut out = String::new();
    for status in statuses {
        let marker = match status.loaded {
            Some(true) => "[ok] ",
            Some(false) => "[missing] ",
            None => "",
        };
        let _ = writeln!(out, "{marker}{}: {}", status.spec.id, status.spec.name);
        let _ = writeln!(out, "    index: {}", status.spec.index_path.display());
        if let Some(error) = status.error {
            let _ = writeln!(out, "    error: {error}");
        }
    }
    out
}
