//! Grammar for reasoning-agent output.
//!
//! A model turn is either
//!
//! ```text
//! Thought: ...
//! Action: <tool name>
//! Action Input: <input>
//! ```
//!
//! or
//!
//! ```text
//! Thought: ...
//! Final Answer: <answer>
//! ```
//!
//! Anything from a line starting with `Observation:` onward is discarded,
//! since observations are produced by the loop, never by the model.

use regex::Regex;

use crate::error::AgentError;

/// Classification of one model turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactOutput {
    /// The model wants to call a tool.
    Action {
        /// Tool name as written by the model.
        name: String,
        /// Input for the tool.
        input: String,
    },
    /// The model has finished.
    Final {
        /// Final answer text.
        text: String,
    },
    /// The turn matches neither form, or both.
    Malformed {
        /// Why the turn was rejected.
        reason: String,
    },
}

/// Compiled grammar.
#[derive(Debug, Clone)]
pub struct ReactParser {
    observation: Regex,
    action: Regex,
    action_only: Regex,
    final_answer: Regex,
    thought: Regex,
}

impl ReactParser {
    /// Compiles the grammar.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if a pattern fails to compile.
    pub fn new() -> Result<Self, AgentError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| AgentError::Configuration {
                message: format!("invalid output grammar: {e}"),
            })
        };
        Ok(Self {
            observation: compile(r"(?m)^[ \t]*Observation[ \t]*\d*[ \t]*:")?,
            action: compile(
                r"(?s)Action[ \t]*\d*[ \t]*:[\s]*(?P<name>.*?)[\s]*Action[ \t]*\d*[ \t]*Input[ \t]*\d*[ \t]*:[\s]*(?P<input>.*)",
            )?,
            action_only: compile(r"Action[ \t]*\d*[ \t]*:")?,
            final_answer: compile(r"(?s)Final[ \t]+Answer[ \t]*:[\s]*(?P<text>.*)")?,
            thought: compile(r"^Thought[ \t]*\d*[ \t]*:[\s]*")?,
        })
    }

    /// Drops a hallucinated observation and everything after it.
    fn visible<'a>(&self, text: &'a str) -> &'a str {
        self.observation
            .find(text)
            .map_or(text, |m| &text[..m.start()])
    }

    /// Classifies one model turn.
    #[must_use]
    pub fn parse(&self, text: &str) -> ReactOutput {
        let text = self.visible(text);
        let action = self.action.captures(text);
        let final_answer = self.final_answer.captures(text);

        match (action, final_answer) {
            (Some(_), Some(_)) => ReactOutput::Malformed {
                reason: "output contains both a final answer and an action".to_string(),
            },
            (None, Some(caps)) => {
                let answer = caps.name("text").map_or("", |m| m.as_str()).trim();
                if answer.is_empty() {
                    ReactOutput::Malformed {
                        reason: "'Final Answer:' is empty".to_string(),
                    }
                } else {
                    ReactOutput::Final {
                        text: answer.to_string(),
                    }
                }
            }
            (Some(caps), None) => {
                let name = caps
                    .name("name")
                    .map_or("", |m| m.as_str())
                    .trim()
                    .trim_matches(|c| matches!(c, '`' | '"' | '\'' | '[' | ']'))
                    .trim();
                let input = caps
                    .name("input")
                    .map_or("", |m| m.as_str())
                    .trim()
                    .trim_matches('"')
                    .trim();
                if name.is_empty() {
                    ReactOutput::Malformed {
                        reason: "'Action:' names no tool".to_string(),
                    }
                } else {
                    ReactOutput::Action {
                        name: name.to_string(),
                        input: input.to_string(),
                    }
                }
            }
            (None, None) if self.action_only.is_match(text) => ReactOutput::Malformed {
                reason: "missing 'Action Input:' after 'Action:'".to_string(),
            },
            (None, None) => ReactOutput::Malformed {
                reason: "missing 'Action:' or 'Final Answer:' after 'Thought:'".to_string(),
            },
        }
    }

    /// Reasoning text preceding the action or final answer, without its
    /// `Thought:` key.
    #[must_use]
    pub fn thought(&self, text: &str) -> String {
        let text = self.visible(text);
        let end = [
            self.action_only.find(text).map(|m| m.start()),
            self.final_answer.find(text).map(|m| m.start()),
        ]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(text.len());
        let head = text[..end].trim();
        self.thought.replace(head, "").trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn parser() -> ReactParser {
        ReactParser::new().unwrap_or_else(|_| unreachable!())
    }

    fn action(name: &str, input: &str) -> ReactOutput {
        ReactOutput::Action {
            name: name.to_string(),
            input: input.to_string(),
        }
    }

    #[test_case(
        "Thought: I should search.\nAction: legal_documents\nAction Input: What is a rebate?",
        "legal_documents", "What is a rebate?" ; "plain")]
    #[test_case(
        "  \n Thought: x\n Action: legal_documents \n  Action Input:   What is a rebate?  \n",
        "legal_documents", "What is a rebate?" ; "surrounding whitespace")]
    #[test_case(
        "Thought: x\nAction 1: legal_documents\nAction 1 Input 1: Who may donate?",
        "legal_documents", "Who may donate?" ; "numbered keys")]
    #[test_case(
        "Thought: x\nAction: legal_documents\nAction Input: \"Who may donate?\"",
        "legal_documents", "Who may donate?" ; "quoted input")]
    #[test_case(
        "Thought: x\nAction: `legal_documents`\nAction Input: q",
        "legal_documents", "q" ; "backticked tool")]
    #[test_case(
        "Thought: x\nAction: legal_documents\nAction Input: q\nObservation: The Act says yes.\nThought: done\nFinal Answer: yes",
        "legal_documents", "q" ; "hallucinated observation is cut")]
    #[test_case(
        "Thought: x\nAction: legal_documents\nAction Input: Does section 2 apply?\nIt covers agents.",
        "legal_documents", "Does section 2 apply?\nIt covers agents." ; "multi-line input")]
    fn test_parse_action(text: &str, name: &str, input: &str) {
        assert_eq!(parser().parse(text), action(name, input));
    }

    #[test_case("Thought: I now know the final answer\nFinal Answer: No.", "No." ; "plain")]
    #[test_case("Final Answer:\n  Yes, under section 41.\n\nSee also 42.  ", "Yes, under section 41.\n\nSee also 42." ; "multi-line")]
    #[test_case("Thought: x\nFinal Answer: yes\nObservation: ignored", "yes" ; "trailing observation")]
    fn test_parse_final(text: &str, expected: &str) {
        assert_eq!(
            parser().parse(text),
            ReactOutput::Final {
                text: expected.to_string()
            }
        );
    }

    #[test_case("I think the answer is yes." ; "prose")]
    #[test_case("" ; "empty")]
    #[test_case("Thought: search\nAction: legal_documents" ; "action without input")]
    #[test_case("Thought: x\nAction: legal_documents\nAction Input: q\nFinal Answer: yes" ; "both forms")]
    #[test_case("Thought: x\nAction:\nAction Input: q" ; "blank tool")]
    #[test_case("Final Answer:   " ; "blank final answer")]
    #[test_case("Observation: the Act says yes\nFinal Answer: yes" ; "only an observation")]
    #[test_case("Thought: x\nAction Input: q" ; "input without action")]
    fn test_parse_malformed(text: &str) {
        assert!(matches!(parser().parse(text), ReactOutput::Malformed { .. }));
    }

    #[test]
    fn test_malformed_reasons_differ() {
        let p = parser();
        let missing_input = p.parse("Action: legal_documents");
        let missing_all = p.parse("just prose");
        assert_ne!(missing_input, missing_all);
    }

    #[test_case("Thought: I should search.\nAction: t\nAction Input: q", "I should search." ; "with key")]
    #[test_case("Let me look it up.\nAction: t\nAction Input: q", "Let me look it up." ; "without key")]
    #[test_case("Thought 2: enough\nFinal Answer: yes", "enough" ; "numbered key")]
    #[test_case("Final Answer: yes", "" ; "no thought")]
    fn test_thought(text: &str, expected: &str) {
        assert_eq!(parser().thought(text), expected);
    }
}
