use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hubgate",
    about = "hubgate: ref-aware HTTP façade over the GitHub API",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file. Flags and environment override it.
    #[arg(long, global = true, env = "HUBGATE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Resolve a ref to a commit (or tree) hash
    Resolve(ResolveArgs),
    /// Show the head commit of a branch
    BranchHead(BranchHeadArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Upstream connection settings shared by every command.
#[derive(Args, Clone, Debug, Default)]
pub struct UpstreamArgs {
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
    #[arg(long, env = "DEFAULT_OWNER")]
    pub owner: Option<String>,
    #[arg(long, env = "DEFAULT_REPO")]
    pub repo: Option<String>,
    #[arg(long, env = "DEFAULT_BRANCH")]
    pub default_branch: Option<String>,
}

#[derive(Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,
    #[arg(long, env = "GITHUB_WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Branch, tag, `refs/...` path or commit hash. Defaults to the default branch.
    pub reference: Option<String>,
    /// Print the root tree instead of the commit.
    #[arg(long)]
    pub tree: bool,
    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Args)]
pub struct BranchHeadArgs {
    pub branch: String,
    #[command(flatten)]
    pub upstream: UpstreamArgs,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub upstream: UpstreamArgs,
}
