use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use hubgate_refs::RefResolver;
use hubgate_server::{HubgateServer, ServerConfig};
use hubgate_upstream::GithubClient;
use serde_json::json;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let file = cli.config.as_deref();
    match cli.command {
        Command::Serve(args) => cmd_serve(file, args).await,
        Command::Resolve(args) => cmd_resolve(file, args, cli.format).await,
        Command::BranchHead(args) => cmd_branch_head(file, args, cli.format).await,
        Command::Config(args) => cmd_config(file, args, cli.format),
    }
}

async fn cmd_serve(file: Option<&Path>, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(file, &args.upstream)?;
    if let Some(port) = args.port {
        config.bind_addr.set_port(port);
    }
    if args.webhook_secret.is_some() {
        config.webhook_secret = args.webhook_secret;
    }
    if config.webhook_secret.is_none() {
        tracing::warn!("no webhook secret configured, deliveries are accepted unsigned");
    }
    HubgateServer::new(config).serve().await?;
    Ok(())
}

async fn cmd_resolve(file: Option<&Path>, args: ResolveArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = load_config(file, &args.upstream)?;
    let resolver = resolver(&config)?;
    let coordinate = config.default_coordinate()?;
    let reference = args.reference.unwrap_or_else(|| config.default_branch.clone());

    let (label, hash) = if args.tree {
        ("tree", resolver.resolve_tree(&reference, &coordinate).await?)
    } else {
        ("commit", resolver.resolve_commit(&reference, &coordinate).await?)
    };

    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "repository": coordinate.to_string(), "reference": reference, label: hash })
        ),
        OutputFormat::Text => println!(
            "{} {} {} {}",
            reference.yellow().bold(),
            "->".dimmed(),
            label,
            hash.to_string().green()
        ),
    }
    Ok(())
}

async fn cmd_branch_head(
    file: Option<&Path>,
    args: BranchHeadArgs,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = load_config(file, &args.upstream)?;
    let coordinate = config.default_coordinate()?;
    let head = resolver(&config)?
        .branch_head(&args.branch, &coordinate)
        .await?;

    match format {
        OutputFormat::Json => println!("{}", json!({ "branch": args.branch, "head_sha": head })),
        OutputFormat::Text => println!(
            "{} {} at {}",
            coordinate.to_string().bold(),
            args.branch.yellow(),
            head.to_string().green()
        ),
    }
    Ok(())
}

fn cmd_config(file: Option<&Path>, args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut config = load_config(file, &args.upstream)?;
    for secret in [&mut config.github_token, &mut config.webhook_secret] {
        if secret.is_some() {
            *secret = Some("<redacted>".into());
        }
    }
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        OutputFormat::Text => print!("{}", toml::to_string(&config)?),
    }
    Ok(())
}

fn resolver(config: &ServerConfig) -> anyhow::Result<RefResolver> {
    let client = GithubClient::new(config.client_config())?;
    if !client.has_token() {
        tracing::warn!("GITHUB_TOKEN is not set, only public repositories will resolve");
    }
    Ok(RefResolver::new(Arc::new(client), config.default_branch.clone()))
}

/// Defaults, then the TOML file, then flags and environment.
fn load_config(file: Option<&Path>, args: &UpstreamArgs) -> anyhow::Result<ServerConfig> {
    let mut config = match file {
        Some(path) => ServerConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    apply_overrides(&mut config, args);
    Ok(config)
}

fn apply_overrides(config: &mut ServerConfig, args: &UpstreamArgs) {
    let args = args.clone();
    if args.token.is_some() {
        config.github_token = args.token;
    }
    if let Some(url) = args.api_url {
        config.github_api_url = url;
    }
    if let Some(owner) = args.owner {
        config.default_owner = owner;
    }
    if let Some(repo) = args.repo {
        config.default_repo = repo;
    }
    if let Some(branch) = args.default_branch {
        config.default_branch = branch;
    }
}
