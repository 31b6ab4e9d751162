//! The reasoning loop.

use std::fmt::Write;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::parser::{ReactOutput, ReactParser};
use super::{AgentRun, AgentStep, RunFailure};
use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, assistant_message, user_message};
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::agent::template::PromptTemplate;
use crate::agent::tool::{Tool, describe_tools, tool_names};
use crate::agent::traits::Agent;
use crate::error::AgentError;

/// Action recorded on the step that produced the final answer.
pub const FINISH_ACTION: &str = "finish";

/// Generation stops here so the model cannot write its own observations.
const OBSERVATION_STOP: &str = "\nObservation:";

/// Agent that emits one Thought/Action or Thought/Final Answer turn.
pub struct ReasonerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl ReasonerAgent {
    /// Creates a new reasoner agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.agent_max_tokens,
            system_prompt,
        }
    }
}

impl Agent for ReasonerAgent {
    fn name(&self) -> &'static str {
        "reasoner"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    fn stop_sequences(&self) -> Vec<String> {
        vec![OBSERVATION_STOP.to_string()]
    }
}

/// Runs the bounded reasoning loop over a fixed set of tools.
pub struct ReasoningAgent {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<Arc<dyn Tool>>,
    reasoner: ReasonerAgent,
    user_template: PromptTemplate,
    parser: ReactParser,
    max_steps: usize,
    return_direct: bool,
}

impl ReasoningAgent {
    /// Creates an agent; the system prompt is rendered with the tools once.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Template`] if the system prompt cannot render,
    /// or [`AgentError::Configuration`] if no tools are given.
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Vec<Arc<dyn Tool>>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Result<Self, AgentError> {
        if tools.is_empty() {
            return Err(AgentError::Configuration {
                message: "reasoning agent needs at least one tool".to_string(),
            });
        }

        let descriptions = describe_tools(tools.iter().map(|t| t.metadata()));
        let names = tool_names(tools.iter().map(|t| t.metadata()));
        let system_prompt = prompts.react_system.render(&[
            ("tools", descriptions.as_str()),
            ("tool_names", names.as_str()),
        ])?;

        Ok(Self {
            provider,
            tools,
            reasoner: ReasonerAgent::new(config, system_prompt),
            user_template: prompts.react_user.clone(),
            parser: ReactParser::new()?,
            max_steps: config.max_steps,
            return_direct: config.return_direct,
        })
    }

    fn tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools
            .iter()
            .find(|t| t.metadata().name == name)
            .or_else(|| {
                let wanted = name.trim();
                self.tools
                    .iter()
                    .find(|t| t.metadata().name.eq_ignore_ascii_case(wanted))
            })
    }

    fn unknown_tool(&self, name: &str) -> String {
        let names = tool_names(self.tools.iter().map(|t| t.metadata()));
        format!("{name} is not a valid tool, try one of [{names}].")
    }

    /// Sends one conversation and parses the reply.
    async fn decide(
        &self,
        conversation: Vec<ChatMessage>,
        total_tokens: &mut u32,
    ) -> Result<(String, ReactOutput), AgentError> {
        let request = self.reasoner.request(conversation);
        let response = self.provider.chat(&request).await?;
        *total_tokens = total_tokens.saturating_add(response.usage.total_tokens);
        let output = self.parser.parse(&response.content);
        Ok((response.content, output))
    }

    /// Answers a query.
    ///
    /// # Errors
    ///
    /// Returns a [`RunFailure`] carrying [`AgentError::MaxStepsExceeded`]
    /// after `max_steps` decisions without a final answer,
    /// [`AgentError::MalformedAgentOutput`] if a turn stays unparseable
    /// after one corrective re-prompt, or the completion error that
    /// stopped the run. Steps taken so far are kept in the failure.
    pub async fn run(&self, query: &str) -> Result<AgentRun, RunFailure> {
        if query.trim().is_empty() {
            return Err(RunFailure::new(AgentError::Orchestration {
                message: "Query cannot be empty".to_string(),
            }));
        }

        let start = Instant::now();
        let mut total_tokens: u32 = 0;
        let mut steps: Vec<AgentStep> = Vec::new();
        let mut scratchpad = String::new();

        let fail = |error: AgentError, steps: Vec<AgentStep>| RunFailure {
            error,
            intermediate_steps: steps,
        };

        for step in 0..self.max_steps {
            let prompt = match self.user_template.render(&[
                ("input", query),
                ("agent_scratchpad", scratchpad.as_str()),
            ]) {
                Ok(prompt) => prompt,
                Err(e) => return Err(fail(e.into(), steps)),
            };

            let mut conversation = vec![user_message(&prompt)];
            let (mut raw, mut output) =
                match self.decide(conversation.clone(), &mut total_tokens).await {
                    Ok(decision) => decision,
                    Err(e) => return Err(fail(e, steps)),
                };

            if let ReactOutput::Malformed { reason } = &output {
                warn!(step, reason = %reason, "malformed agent output, re-prompting");
                conversation.push(assistant_message(&raw));
                conversation.push(user_message(&format!(
                    "Your last reply could not be parsed: {reason}. Reply with either \
                     'Thought:', 'Action:' and 'Action Input:' lines, or 'Thought:' and \
                     'Final Answer:' lines."
                )));
                (raw, output) = match self.decide(conversation, &mut total_tokens).await {
                    Ok(decision) => decision,
                    Err(e) => return Err(fail(e, steps)),
                };
            }

            let thought = self.parser.thought(&raw);
            match output {
                ReactOutput::Malformed { reason } => {
                    warn!(step, reason = %reason, "agent output still malformed, aborting");
                    return Err(fail(
                        AgentError::MalformedAgentOutput {
                            message: reason,
                            content: raw,
                        },
                        steps,
                    ));
                }
                ReactOutput::Final { text } => {
                    debug!(step, "agent reached a final answer");
                    steps.push(AgentStep {
                        thought,
                        action: FINISH_ACTION.to_string(),
                        action_input: text.clone(),
                        observation: None,
                    });
                    return Ok(self.finish(text, steps, total_tokens, start));
                }
                ReactOutput::Action { name, input } => {
                    debug!(step, tool = %name, input = %input, "agent invoking tool");
                    let (observation, direct) = match self.tool(&name) {
                        None => {
                            warn!(step, tool = %name, "agent named an unknown tool");
                            (self.unknown_tool(&name), false)
                        }
                        Some(tool) => match tool.invoke(&input).await {
                            Ok(output) => {
                                total_tokens = total_tokens.saturating_add(output.total_tokens);
                                (output.content, self.return_direct)
                            }
                            Err(e) => {
                                warn!(step, tool = %name, error = %e, "tool failed");
                                (format!("Tool error: {e}"), false)
                            }
                        },
                    };

                    // After the first step the pad already ends with a "Thought: " cue.
                    if scratchpad.is_empty() {
                        if !thought.is_empty() {
                            let _ = writeln!(scratchpad, "Thought: {thought}");
                        }
                    } else {
                        let _ = writeln!(scratchpad, "{thought}");
                    }
                    let _ = write!(
                        scratchpad,
                        "Action: {name}\nAction Input: {input}\nObservation: {observation}\nThought: "
                    );
                    steps.push(AgentStep {
                        thought,
                        action: name,
                        action_input: input,
                        observation: Some(observation.clone()),
                    });

                    if direct {
                        debug!(step, "returning tool output directly");
                        return Ok(self.finish(observation, steps, total_tokens, start));
                    }
                }
            }
        }

        warn!(max_steps = self.max_steps, "agent ran out of steps");
        Err(fail(
            AgentError::MaxStepsExceeded {
                max_steps: self.max_steps,
            },
            steps,
        ))
    }

    fn finish(
        &self,
        final_answer: String,
        steps: Vec<AgentStep>,
        total_tokens: u32,
        start: Instant,
    ) -> AgentRun {
        info!(
            steps = steps.len(),
            total_tokens,
            max_steps = self.max_steps,
            "agent run finished"
        );
        AgentRun {
            final_answer,
            intermediate_steps: steps,
            total_tokens,
            elapsed: start.elapsed(),
        }
    }
}

impl std::fmt::Debug for ReasoningAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = tool_names(self.tools.iter().map(|t| t.metadata()));
        f.debug_struct("ReasoningAgent")
            .field("provider", &self.provider.name())
            .field("tools", &names)
            .field("max_steps", &self.max_steps)
            .field("return_direct", &self.return_direct)
            .finish_non_exhaustive()
    }
}
