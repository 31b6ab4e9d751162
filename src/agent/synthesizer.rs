//! Synthesizer agent for aggregating sub-answers.
//!
//! Takes the successful sub-answers from every document tool and
//! produces one answer that attributes each fact to its source.

use std::fmt::Write;

use super::answer::SubAnswer;
use super::config::AgentConfig;
use super::traits::Agent;

/// Agent that synthesizes sub-answers into a final response.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.synthesizer_max_tokens,
            system_prompt,
        }
    }
}

impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Renders sub-answers as `Sub question / Source / Response` blocks.
///
/// `source_name` maps a tool name to the label shown to the model.
#[must_use]
pub fn format_sub_answers(answers: &[SubAnswer], source_name: impl Fn(&str) -> String) -> String {
    let mut out = String::new();
    for (i, answer) in answers.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(
            out,
            "Sub question: {}\nSource: {}\nResponse: {}",
            answer.sub_question.sub_question,
            source_name(&answer.sub_question.tool_name),
            answer.text,
        );
    }
    out
}
