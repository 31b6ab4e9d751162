//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

// Allow certain patterns that improve readability in CLI output formatting
#![allow(clippy::format_push_string)]

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};

use crate::agent::config::{AgentConfig, AgentConfigBuilder};
use crate::agent::pipeline::{Pipeline, load_indexes};
use crate::agent::prompt::PromptSet;
use crate::cli::output::{
    OutputFormat, document_statuses, format_documents, format_planner_answer, format_run,
    format_run_failure,
};
use crate::cli::parser::{Cli, Commands};
use crate::error::{CommandError, Result};

/// Parameters for the ask command.
#[derive(Debug, Clone, Default)]
pub struct AskParams<'a> {
    /// The question to answer.
    pub query: &'a str,
    /// Print the planner answer instead of running the reasoning agent.
    pub planner_only: bool,
    /// Passages retrieved per document.
    pub top_k: Option<usize>,
    /// Maximum reasoning steps.
    pub max_steps: Option<usize>,
    /// Completion model.
    pub model: Option<&'a str>,
    /// Embedding model.
    pub embedding_model: Option<&'a str>,
    /// Maximum concurrent document queries.
    pub concurrency: Option<usize>,
    /// Ask for numbered citations.
    pub citations: bool,
    /// Return the first tool answer directly.
    pub return_direct: bool,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<&'a Path>,
    /// Show detailed diagnostics.
    pub verbose: bool,
}

/// Executes the CLI command.
///
/// # Arguments
///
/// * `cli` - Parsed CLI arguments.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute. A failed agent run is
/// reported as [`CommandError::RunFailed`] carrying the rendered failure.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            query,
            planner_only,
            top_k,
            max_steps,
            model,
            embedding_model,
            concurrency,
            citations,
            return_direct,
            prompt_dir,
        } => {
            let params = AskParams {
                query,
                planner_only: *planner_only,
                top_k: *top_k,
                max_steps: *max_steps,
                model: model.as_deref(),
                embedding_model: embedding_model.as_deref(),
                concurrency: *concurrency,
                citations: *citations,
                return_direct: *return_direct,
                prompt_dir: prompt_dir.as_deref(),
                verbose: cli.verbose,
            };
            cmd_ask(cli, &params, format)
        }
        Commands::Documents { check } => cmd_documents(cli, *check, format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Applies CLI overrides on top of `builder` and builds the configuration.
fn agent_config(mut builder: AgentConfigBuilder, params: &AskParams<'_>) -> Result<AgentConfig> {
    if let Some(k) = params.top_k {
        builder = builder.top_k(k);
    }
    if let Some(n) = params.max_steps {
        builder = builder.max_steps(n);
    }
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(model) = params.embedding_model {
        builder = builder.embedding_model(model);
    }
    if let Some(n) = params.concurrency {
        builder = builder.max_concurrency(n);
    }
    if params.citations {
        builder = builder.citations(true);
    }
    if params.return_direct {
        builder = builder.return_direct(true);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }

    builder.build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Agent configuration error: {e}")).into()
    })
}

fn cmd_ask(cli: &Cli, params: &AskParams<'_>, format: OutputFormat) -> Result<String> {
    let config = agent_config(AgentConfig::builder().from_env(), params)?;
    let registry_config = cli.registry_config()?;

    let pipeline = Pipeline::from_config(&config, &registry_config)
        .map_err(|e| CommandError::ExecutionFailed(format!("Startup failed: {e}")))?;

    // Create tokio runtime as sync/async bridge
    let rt = tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}"))
    })?;

    if params.planner_only {
        let answer = rt
            .block_on(pipeline.plan(params.query))
            .map_err(|e| CommandError::ExecutionFailed(format!("Query failed: {e}")))?;
        return Ok(match format {
            OutputFormat::Text => {
                let mut output = format_planner_answer(&answer, params.verbose);
                append_load_failures(&mut output, &pipeline);
                output
            }
            OutputFormat::Json => format.to_json(&answer),
        });
    }

    match rt.block_on(pipeline.process(params.query)) {
        Ok(run) => Ok(match format {
            OutputFormat::Text => {
                let mut output = format_run(&run, params.verbose);
                append_load_failures(&mut output, &pipeline);
                output
            }
            OutputFormat::Json => format.to_json(&run),
        }),
        Err(failure) => Err(CommandError::RunFailed(format_run_failure(&failure, format)).into()),
    }
}

fn append_load_failures(output: &mut String, pipeline: &Pipeline) {
    for failure in pipeline.load_failures() {
        let _ = writeln!(output, "Excluded: {}", failure.error);
    }
}

fn cmd_documents(cli: &Cli, check: bool, format: OutputFormat) -> Result<String> {
    let registry_config = cli.registry_config()?;

    let failures = check.then(|| load_indexes(&registry_config).1);
    let statuses = document_statuses(&registry_config.documents, failures.as_deref());

    match format {
        OutputFormat::Text => {
            let mut output = format_documents(&statuses);
            if let Some(failures) = &failures {
                output.push_str(&format!(
                    "{}/{} indexes loaded\n",
                    statuses.len() - failures.len(),
                    statuses.len()
                ));
            }
            Ok(output)
        }
        OutputFormat::Json => Ok(format.to_json(&statuses)),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ))
            } else {
                let mut output = format!(
                    "Wrote {} prompt template(s) to: {}\n",
                    written.len(),
                    target_dir.display()
                );
                for path in &written {
                    output.push_str(&format!(
                        "  {}\n",
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("unknown")
                    ));
                }
                Ok(output)
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written
                    .iter()
                    .map(|p| p.to_string_lossy().to_string())
                    .collect::<Vec<_>>(),
            });
            Ok(format.to_json(&json))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_init_prompts_writes_once() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let first = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(first.starts_with("Wrote 9 prompt template(s)"));
        assert!(first.contains("react_system.md"));

        let second = cmd_init_prompts(Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|_| unreachable!());
        assert!(second.starts_with("All prompt templates already exist"));
    }

    #[test]
    fn test_documents_lists_reference_registry() {
        let cli = Cli::try_parse_from(["multidoc", "documents"]).unwrap_or_else(|_| unreachable!());
        let output = execute(&cli).unwrap_or_else(|_| unreachable!());
        for id in ["insurance", "cpa", "tesia", "iradaoi", "ttohoata"] {
            assert!(output.contains(&format!("{id}: ")), "missing {id}");
        }
    }

    #[test]
    fn test_documents_check_reports_missing_indexes() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let config = dir.path().join("documents.toml");
        std::fs::write(
            &config,
            "[[documents]]\nid = \"cpa\"\nname = \"The Consumer Protection Act, 1986\"\n\
             description = \"Consumers.\"\nindex_path = \"cpa\"\n",
        )
        .unwrap_or_else(|_| unreachable!());
        let config = config.to_string_lossy().to_string();

        let cli = Cli::try_parse_from(["multidoc", "--config", &config, "documents", "--check"])
            .unwrap_or_else(|_| unreachable!());
        let output = execute(&cli).unwrap_or_else(|_| unreachable!());
        assert!(output.contains("[missing] cpa"));
        assert!(output.ends_with("0/1 indexes loaded\n"));
    }

    #[test]
    fn test_agent_config_applies_overrides() {
        let params = AskParams {
            query: "q",
            top_k: Some(7),
            max_steps: Some(2),
            model: Some("gpt-4o-mini"),
            citations: true,
            ..AskParams::default()
        };
        let config = agent_config(AgentConfig::builder().api_key("test"), &params)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.top_k, 7);
        assert_eq!(config.max_steps, 2);
        assert_eq!(config.model, "gpt-4o-mini");
        assert!(config.citations);
        assert!(!config.return_direct);
    }

    #[test]
    fn test_agent_config_reports_missing_key() {
        let params = AskParams {
            query: "q",
            ..AskParams::default()
        };
        let err = agent_config(AgentConfig::builder(), &params).err();
        let message = err.map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("API key"), "{message}");
    }
}
