//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::RegistryConfig;
use crate::error::AgentError;

/// multidoc: answer questions across several legal documents.
///
/// Routes compound questions to per-document vector indexes, answers each
/// part from retrieved passages, and combines the answers with a
/// reasoning agent.
#[derive(Parser, Debug)]
#[command(name = "multidoc")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Document registry (TOML with `[[documents]]` tables).
    ///
    /// Defaults to the compiled-in registry of five reference statutes.
    #[arg(short, long, env = "MULTIDOC_DOCUMENTS", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output and debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Loads the document registry named by `--config`, or the reference
    /// registry when none is given.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Configuration`] if the registry cannot be read
    /// or fails validation.
    pub fn registry_config(&self) -> Result<RegistryConfig, AgentError> {
        self.config
            .as_deref()
            .map_or_else(RegistryConfig::reference, RegistryConfig::from_file)
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a question across every loaded document.
    ///
    /// The reasoning agent hands the question to the sub-question planner,
    /// which routes parts of it to individual documents and combines their
    /// answers. Requires an OpenAI-compatible API key.
    #[command(after_help = r#"Examples:
  multidoc ask "Can an insurer offer rebates on premiums?"
  multidoc ask "Compare rebates under the Insurance Act with payment for organs" -v
  multidoc ask "Who is a consumer?" --planner-only --citations
  multidoc --config ./docs.toml --format json ask "What is sickness benefit?"
  OPENAI_API_KEY=sk-... multidoc ask "Explain the Tariff Advisory Committee"
"#)]
    Ask {
        /// The question to answer.
        query: String,

        /// Skip the reasoning agent and print the planner's aggregated
        /// answer with its per-document breakdown.
        #[arg(long)]
        planner_only: bool,

        /// Passages retrieved per document.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Maximum reasoning steps.
        #[arg(long)]
        max_steps: Option<usize>,

        /// Completion model.
        #[arg(long)]
        model: Option<String>,

        /// Embedding model.
        #[arg(long)]
        embedding_model: Option<String>,

        /// Maximum concurrent document queries.
        #[arg(long)]
        concurrency: Option<usize>,

        /// Ask per-document answers to cite numbered passages.
        #[arg(long)]
        citations: bool,

        /// Return the first tool answer without further reasoning.
        #[arg(long)]
        return_direct: bool,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// List the declared documents.
    #[command(after_help = r#"Examples:
  multidoc documents                       # Reference registry
  multidoc documents --check               # Try loading every index
  multidoc --config ./docs.toml documents --format json
"#)]
    Documents {
        /// Load every index and report which ones are usable.
        #[arg(long)]
        check: bool,
    },

    /// Write default prompt templates to disk for customization.
    ///
    /// Creates markdown template files in the prompt directory so prompts
    /// can be changed without recompiling. Existing files are kept.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  multidoc init-prompts                    # Write to ~/.config/multidoc-rs/prompts/
  multidoc init-prompts --dir ./prompts    # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `~/.config/multidoc-rs/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask() {
        let cli = Cli::try_parse_from([
            "multidoc",
            "--format",
            "json",
            "ask",
            "Who may donate?",
            "-k",
            "5",
            "--planner-only",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Ask {
                query,
                top_k,
                planner_only,
                ..
            } => {
                assert_eq!(query, "Who may donate?");
                assert_eq!(top_k, Some(5));
                assert!(planner_only);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["multidoc", "documents", "--check", "-v"])
            .unwrap_or_else(|_| unreachable!());
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Documents { check: true }));
    }

    #[test]
    fn test_ask_requires_query() {
        assert!(Cli::try_parse_from(["multidoc", "ask"]).is_err());
    }
}
