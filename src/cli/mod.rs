//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::IssueKind;

pub mod commands;

/// Arena CLI - run two models against one issue and publish the comparison
#[derive(Parser, Debug)]
#[command(name = "arena", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Publish into an in-memory store and print the payloads instead
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an issue with two randomly selected models and publish both
    Resolve(ResolveArgs),

    /// Merge two existing ledgers for one issue and publish the comparison
    Merge(MergeArgs),

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Kind of item to resolve.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IssueType {
    #[default]
    Issue,
    #[value(alias = "pull-request")]
    Pr,
}

impl From<IssueType> for IssueKind {
    fn from(value: IssueType) -> Self {
        match value {
            IssueType::Issue => Self::Issue,
            IssueType::Pr => Self::PullRequest,
        }
    }
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Repository as owner/repo
    #[arg(long)]
    pub repo: String,

    /// Issue or pull request number
    #[arg(long)]
    pub issue_number: u64,

    /// Whether the number refers to an issue or a pull request
    #[arg(long, value_enum, default_value_t)]
    pub issue_type: IssueType,

    /// GitHub token (default: GITHUB_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// GitHub username used in ledger file names (default: GITHUB_USERNAME)
    #[arg(long)]
    pub username: Option<String>,

    /// Ledger directory (default: output)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Comma-separated model pool (default: LLM_MODELS)
    #[arg(long)]
    pub llm_models: Option<String>,

    /// Remote store configuration JSON (default: REMOTE_STORE_CONFIG)
    #[arg(long)]
    pub remote_store: Option<String>,

    /// Agent program run for each attempt (default: ARENA_AGENT_COMMAND)
    #[arg(long)]
    pub agent_command: Option<String>,

    /// Agent class passed to the agent
    #[arg(long)]
    pub agent_class: Option<String>,

    /// Maximum agent iterations per attempt
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Deadline in seconds passed to the agent
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Extra repository-specific instructions for the agent
    #[arg(long)]
    pub repo_instruction: Option<String>,

    /// Seed for model selection (reproducible pairs)
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Issue number both ledgers are merged for
    #[arg(long)]
    pub issue_number: u64,

    /// First ledger (default: <output-dir>/output1.jsonl)
    #[arg(long)]
    pub first: Option<PathBuf>,

    /// Second ledger (default: <output-dir>/output2.jsonl)
    #[arg(long)]
    pub second: Option<PathBuf>,

    /// Directory holding the default ledgers (default: output)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Remote store configuration JSON (default: REMOTE_STORE_CONFIG)
    #[arg(long)]
    pub remote_store: Option<String>,
}
