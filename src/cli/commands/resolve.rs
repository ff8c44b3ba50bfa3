//! Resolve command implementation.
//!
//! Picks two models from the pool, runs both against the issue, appends both
//! records to the issue's ledger and publishes the result.

use colored::Colorize;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::cli::ResolveArgs;
use crate::config::{
    ArenaConfig, find_remote_store, load_config, resolve_agent_command, resolve_github_token,
    resolve_model_pool, resolve_output_dir, resolve_store_credential, resolve_username,
};
use crate::error::Result;
use crate::model::{IssueRef, SuccessState};
use crate::pipeline::{DualRunReport, Pipeline};
use crate::publish::{MemoryStore, Publisher};
use crate::resolve::{
    AttemptConfig, CommandAttempt, DEFAULT_AGENT_CLASS, DEFAULT_MAX_ITERATIONS, GithubIssues,
    OutputBuilder,
};
use crate::select::{PAIR, parse_model_pool, select_models};

use super::{captured_payloads, dry_run_mode, missing_store, runtime};

/// Execute the resolve command.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the issue does not
/// exist, the ledger cannot be written, or the remote store rejects the
/// upload.
pub fn execute(args: &ResolveArgs, dry_run: bool, json: bool) -> Result<()> {
    let config = load_config()?;

    let token = resolve_github_token(args.token.as_deref())?;
    let username = resolve_username(args.username.as_deref())?;
    let pool = parse_model_pool(&resolve_model_pool(args.llm_models.as_deref(), &config)?);
    let output_dir = resolve_output_dir(args.output_dir.as_deref(), &config);
    let agent_command = resolve_agent_command(args.agent_command.as_deref(), &config)?;
    let store = find_remote_store(args.remote_store.as_deref(), &config)?;
    if store.is_none() && !dry_run {
        return Err(missing_store());
    }

    let issue_ref = IssueRef::from_slug(&args.repo, args.issue_number, args.issue_type.into())?;

    let models = match args.seed {
        Some(seed) => select_models(&pool, PAIR, &mut StdRng::seed_from_u64(seed))?,
        None => select_models(&pool, PAIR, &mut rand::thread_rng())?,
    };
    info!(issue = %issue_ref, models = ?models, "Selected models");

    let builder = OutputBuilder::new(
        GithubIssues::new(issue_ref.owner.as_str(), issue_ref.repo.as_str(), issue_ref.kind),
        CommandAttempt::from_command_line(&agent_command)?,
        attempt_config(args, &config),
    );

    let rt = runtime()?;

    if dry_run {
        let publisher = Publisher::new(MemoryStore::new(), dry_run_mode(store.as_ref()));
        let pipeline = Pipeline::new(&builder, &publisher, &output_dir, &username);
        let report = rt.block_on(pipeline.run(&issue_ref, &token, None, &models))?;
        return print_report(&issue_ref, &report, Some(publisher.store()), json);
    }

    let store = store.ok_or_else(missing_store)?;
    let store_credential = resolve_store_credential(&store);
    let publisher = Publisher::from_config(&store);
    let pipeline = Pipeline::new(&builder, &publisher, &output_dir, &username);
    let report = rt.block_on(pipeline.run(&issue_ref, &token, store_credential.as_ref(), &models))?;

    print_report(&issue_ref, &report, None, json)
}

/// Attempt settings: flag > config file > default.
fn attempt_config(args: &ResolveArgs, config: &ArenaConfig) -> AttemptConfig {
    AttemptConfig {
        agent_class: args
            .agent_class
            .clone()
            .or_else(|| config.agent_class.clone())
            .unwrap_or_else(|| DEFAULT_AGENT_CLASS.to_string()),
        max_iterations: args
            .max_iterations
            .or(config.max_iterations)
            .unwrap_or(DEFAULT_MAX_ITERATIONS),
        deadline_secs: args.deadline_secs,
        repo_instruction: args.repo_instruction.clone(),
    }
}

fn print_report(
    issue_ref: &IssueRef,
    report: &DualRunReport,
    captured: Option<&MemoryStore>,
    json: bool,
) -> Result<()> {
    if json {
        let mut output = serde_json::to_value(report)?;
        if let Some(store) = captured {
            output["dry_run"] = captured_payloads(store);
        }
        println!("{}", serde_json::to_string(&output)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        "Resolved".green().bold(),
        issue_ref.to_string().bold(),
        format!("(run {})", report.run_id).dimmed()
    );
    for candidate in &report.candidates {
        let status = if candidate.attempt_failed {
            "crashed".red()
        } else {
            match candidate.success {
                SuccessState::Succeeded => "succeeded".green(),
                SuccessState::Failed => "failed".yellow(),
                SuccessState::Unknown => "unknown".normal(),
            }
        };
        println!(
            "  {:<24} {:<10} {}",
            candidate.model.cyan(),
            status,
            format!("{} patch bytes", candidate.patch_bytes).dimmed()
        );
        if let Some(error) = &candidate.error {
            println!("    {}", error.red());
        }
    }

    println!();
    println!("  Ledger: {}", report.ledger.display());
    for receipt in &report.published {
        println!(
            "  Published: {} {} ({})",
            receipt.mode,
            receipt.target.bold(),
            receipt.status
        );
    }
    if report.skipped_duplicates > 0 {
        println!(
            "  Skipped:   {} already published entr{}",
            report.skipped_duplicates,
            if report.skipped_duplicates == 1 { "y" } else { "ies" }
        );
    }

    if let Some(store) = captured {
        println!();
        println!("{}", "Dry run, nothing was sent. Payloads:".yellow());
        println!("{}", serde_json::to_string_pretty(&captured_payloads(store))?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn parse(extra: &[&str]) -> ResolveArgs {
        let mut argv = vec!["arena", "resolve", "--repo", "o/r", "--issue-number", "1"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Resolve(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_attempt_config_defaults() {
        let config = attempt_config(&parse(&[]), &ArenaConfig::default());
        assert_eq!(config, AttemptConfig::default());
    }

    #[test]
    fn test_attempt_config_flag_beats_file() {
        let file = ArenaConfig {
            agent_class: Some("FileAgent".into()),
            max_iterations: Some(10),
            ..ArenaConfig::default()
        };

        let config = attempt_config(&parse(&["--max-iterations", "30", "--deadline-secs", "600"]), &file);

        assert_eq!(config.agent_class, "FileAgent");
        assert_eq!(config.max_iterations, 30);
        assert_eq!(config.deadline_secs, Some(600));
    }
}
