//! Prompt templates for every agent.
//!
//! Each prompt is a [`PromptTemplate`] with a fixed set of required
//! placeholders. Overrides are read from markdown files in a prompt
//! directory; a file that is missing, unreadable, or fails validation is
//! replaced by the compiled-in default.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::template::PromptTemplate;
use crate::error::TemplateError;

/// System prompt for the reasoning agent.
pub const REACT_SYSTEM_PROMPT: &str = r"You are a Smart Insurance Agent Assistant. Insurance agents ask you domain-specific questions about Indian insurance law and the statutes around it. The tools available to you interpret keywords well, so name the exact subject in your tool input (a question about two-wheeler insurance rules should mention two-wheelers).

You have access to the following tools:

{tools}

Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action, a complete English sentence
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question

Be ethical and articulate in your final answer, and say which documents it relies on.";

/// User turn for the reasoning agent; the scratchpad grows each step.
pub const REACT_USER_PROMPT: &str = "Question: {input}\n{agent_scratchpad}";

/// System prompt for the decomposition agent.
pub const DECOMPOSER_SYSTEM_PROMPT: &str = r#"You split a user's question into sub-questions. Each sub-question is answered by exactly one document tool.

## Instructions

1. Read the question and the list of tools. Each tool searches one legal document.
2. Write one self-contained sub-question for every tool that can contribute. A question that spans two documents needs at least two sub-questions.
3. Set `tool_name` to a tool name exactly as listed. Never invent tool names.
4. Keep sub-questions specific: name the subject, section, or defined term being asked about.
5. If only one document is relevant, return a single sub-question.

## Output Format (JSON)

```json
{{
  "items": [
    {{"sub_question": "What does the Insurance Act say about rebates on premiums?", "tool_name": "insurance"}}
  ]
}}
```

Return ONLY the JSON object, no surrounding text."#;

/// User turn for the decomposition agent.
pub const DECOMPOSER_USER_PROMPT: &str = "<tools>\n{tools}\n</tools>\n\n<question>{query}</question>";

/// System prompt for per-document answering.
pub const ANSWER_SYSTEM_PROMPT: &str = "You answer questions about a single legal document using only the excerpts you are given. If the excerpts do not contain the answer, say so plainly. Quote section numbers and defined terms where the excerpts provide them.";

/// Grounding prompt for per-document answering.
pub const ANSWER_PROMPT: &str = "Context information from {document} is below.
---------------------
{context}
---------------------
Given the context information and not prior knowledge, answer the query.
Query: {query}
Answer:";

/// Grounding prompt for per-document answering with numbered citations.
pub const ANSWER_CITED_PROMPT: &str = "Numbered excerpts from {document} are below.
---------------------
{context}
---------------------
Using only the numbered excerpts, answer the query. Cite each claim with the number of the supporting excerpt in square brackets, for example [1] or [2][3]. Only cite an excerpt that supports the claim. If none of the excerpts help, say so.
Query: {query}
Answer:";

/// System prompt for the aggregate synthesizer.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = "You combine answers drawn from several legal documents into one coherent response. State which document each fact comes from. If the answers disagree, say so and show both positions. Do not add facts that are absent from the answers.";

/// User turn for the aggregate synthesizer.
pub const SYNTHESIZER_USER_PROMPT: &str = "<question>{query}</question>

<answers>
{answers}
</answers>

Write one answer to the question from the sub-answers above, attributing each fact to its source document.";

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/multidoc-rs/prompts";

/// Environment variable naming the prompt directory.
const PROMPT_DIR_ENV: &str = "MULTIDOC_PROMPT_DIR";

struct TemplateSpec {
    filename: &'static str,
    default: &'static str,
    required: &'static [&'static str],
    /// Values the caller supplies that an override may use.
    optional: &'static [&'static str],
}

const REACT_SYSTEM: TemplateSpec = TemplateSpec {
    filename: "react_system.md",
    default: REACT_SYSTEM_PROMPT,
    required: &["tools", "tool_names"],
    optional: &[],
};
const REACT_USER: TemplateSpec = TemplateSpec {
    filename: "react_user.md",
    default: REACT_USER_PROMPT,
    required: &["input", "agent_scratchpad"],
    optional: &[],
};
const DECOMPOSER_SYSTEM: TemplateSpec = TemplateSpec {
    filename: "decomposer_system.md",
    default: DECOMPOSER_SYSTEM_PROMPT,
    required: &[],
    optional: &[],
};
const DECOMPOSER_USER: TemplateSpec = TemplateSpec {
    filename: "decomposer_user.md",
    default: DECOMPOSER_USER_PROMPT,
    required: &["tools", "query"],
    optional: &[],
};
const ANSWER_SYSTEM: TemplateSpec = TemplateSpec {
    filename: "answer_system.md",
    default: ANSWER_SYSTEM_PROMPT,
    required: &[],
    optional: &[],
};
const ANSWER: TemplateSpec = TemplateSpec {
    filename: "answer.md",
    default: ANSWER_PROMPT,
    required: &["context", "query"],
    optional: &["document"],
};
const ANSWER_CITED: TemplateSpec = TemplateSpec {
    filename: "answer_cited.md",
    default: ANSWER_CITED_PROMPT,
    required: &["context", "query"],
    optional: &["document"],
};
const SYNTHESIZER_SYSTEM: TemplateSpec = TemplateSpec {
    filename: "synthesizer_system.md",
    default: SYNTHESIZER_SYSTEM_PROMPT,
    required: &[],
    optional: &[],
};
const SYNTHESIZER_USER: TemplateSpec = TemplateSpec {
    filename: "synthesizer_user.md",
    default: SYNTHESIZER_USER_PROMPT,
    required: &["query", "answers"],
    optional: &[],
};

const ALL: [&TemplateSpec; 9] = [
    &REACT_SYSTEM,
    &REACT_USER,
    &DECOMPOSER_SYSTEM,
    &DECOMPOSER_USER,
    &ANSWER_SYSTEM,
    &ANSWER,
    &ANSWER_CITED,
    &SYNTHESIZER_SYSTEM,
    &SYNTHESIZER_USER,
];

/// A set of prompt templates for all agents.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from CLI flags, environment variables, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// Reasoning agent system prompt (`{tools}`, `{tool_names}`).
    pub react_system: PromptTemplate,
    /// Reasoning agent user turn (`{input}`, `{agent_scratchpad}`).
    pub react_user: PromptTemplate,
    /// Decomposer system prompt.
    pub decomposer_system: PromptTemplate,
    /// Decomposer user turn (`{tools}`, `{query}`).
    pub decomposer_user: PromptTemplate,
    /// Per-document answer system prompt.
    pub answer_system: PromptTemplate,
    /// Per-document grounding prompt (`{context}`, `{query}`).
    pub answer: PromptTemplate,
    /// Per-document grounding prompt with citations (`{context}`, `{query}`).
    pub answer_cited: PromptTemplate,
    /// Synthesizer system prompt.
    pub synthesizer_system: PromptTemplate,
    /// Synthesizer user turn (`{query}`, `{answers}`).
    pub synthesizer_user: PromptTemplate,
}

impl TemplateSpec {
    fn name(&self) -> &'static str {
        self.filename.trim_end_matches(".md")
    }

    fn parse(&self, source: &str) -> Result<PromptTemplate, TemplateError> {
        let template = PromptTemplate::parse(self.name(), source)?;
        template.require(self.required)?;
        let allowed: Vec<&str> = self.required.iter().chain(self.optional).copied().collect();
        template.allow_only(&allowed)?;
        Ok(template)
    }

    fn default_template(&self) -> Result<PromptTemplate, TemplateError> {
        self.parse(self.default)
    }

    fn load(&self, dir: Option<&Path>) -> Result<PromptTemplate, TemplateError> {
        let Some(path) = dir.map(|d| d.join(self.filename)) else {
            return self.default_template();
        };
        let Ok(source) = std::fs::read_to_string(&path) else {
            return self.default_template();
        };
        match self.parse(&source) {
            Ok(template) => {
                debug!(path = %path.display(), "loaded prompt override");
                Ok(template)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "invalid prompt override, using default");
                self.default_template()
            }
        }
    }
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument
    /// 2. `MULTIDOC_PROMPT_DIR` environment variable
    /// 3. `~/.config/multidoc-rs/prompts/`
    ///
    /// Each file is loaded independently; a missing or invalid file uses its default.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] only if a compiled-in default fails to parse.
    pub fn load(prompt_dir: Option<&Path>) -> Result<Self, TemplateError> {
        let resolved_dir = prompt_dir
            .map(PathBuf::from)
            .or_else(|| std::env::var(PROMPT_DIR_ENV).ok().map(PathBuf::from))
            .or_else(Self::default_dir);
        let dir = resolved_dir.as_deref();

        Ok(Self {
            react_system: REACT_SYSTEM.load(dir)?,
            react_user: REACT_USER.load(dir)?,
            decomposer_system: DECOMPOSER_SYSTEM.load(dir)?,
            decomposer_user: DECOMPOSER_USER.load(dir)?,
            answer_system: ANSWER_SYSTEM.load(dir)?,
            answer: ANSWER.load(dir)?,
            answer_cited: ANSWER_CITED.load(dir)?,
            synthesizer_system: SYNTHESIZER_SYSTEM.load(dir)?,
            synthesizer_user: SYNTHESIZER_USER.load(dir)?,
        })
    }

    /// Returns compiled-in defaults without checking the filesystem.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError`] only if a compiled-in default fails to parse.
    pub fn defaults() -> Result<Self, TemplateError> {
        Ok(Self {
            react_system: REACT_SYSTEM.default_template()?,
            react_user: REACT_USER.default_template()?,
            decomposer_system: DECOMPOSER_SYSTEM.default_template()?,
            decomposer_user: DECOMPOSER_USER.default_template()?,
            answer_system: ANSWER_SYSTEM.default_template()?,
            answer: ANSWER.default_template()?,
            answer_cited: ANSWER_CITED.default_template()?,
            synthesizer_system: SYNTHESIZER_SYSTEM.default_template()?,
            synthesizer_user: SYNTHESIZER_USER.default_template()?,
        })
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten; use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let mut written = Vec::new();
        for spec in ALL {
            let path = dir.join(spec.filename);
            if !path.exists() {
                std::fs::write(&path, spec.default)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}
