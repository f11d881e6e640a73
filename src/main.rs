mod aggregate;
mod api;
mod api_utils;
mod cache;
mod config;
mod group;
mod output;
mod render;
mod render_filter;
mod render_highlight;
mod render_rows;
mod render_selection;
mod render_summary;
mod tui;
mod tui_keys;
mod types;
mod upgrade;

use anyhow::{bail, Context, Result};
use api::{GitHubClient, TeamMap};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use config::Config;
use lazy_static::lazy_static;
use std::io::IsTerminal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use types::{OutputFormat, OutputType, RepoGroup};

lazy_static! {
    /// `1.4.0 (abc1234 · linux/x64)`
    static ref VERSION_FULL: String = format!(
        "{} ({} · {}/{})",
        env!("CARGO_PKG_VERSION"),
        option_env!("GCS_BUILD_COMMIT").unwrap_or("dev"),
        upgrade::platform_name(std::env::consts::OS),
        upgrade::arch_name(std::env::consts::ARCH)
    );
}

#[derive(Parser)]
#[command(
    name = "github-code-search",
    version = VERSION_FULL.as_str(),
    about = "Interactive GitHub code search with per-repo aggregation",
    long_about = "Search code across a GitHub organization, browse the matches grouped per repository, \
                  pick what to keep and print the selection as markdown or JSON.",
    args_conflicts_with_subcommands = true,
    subcommand_negates_reqs = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    search: SearchArgs,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Search GitHub code (default command when no subcommand is given)
    Query(SearchArgs),

    /// Check for a new release and replace the running binary
    Upgrade,

    /// Show configuration
    Config {
        /// Write the default config file
        #[arg(long)]
        create: bool,
    },
}

#[derive(Args, Debug, Clone)]
struct SearchArgs {
    /// Search query
    #[arg(required = true)]
    query: Option<String>,

    /// GitHub organization to search in
    #[arg(long, required = true)]
    org: Option<String>,

    /// Comma-separated repositories to exclude (repoA,repoB or org/repoA,org/repoB)
    #[arg(long, default_value = "")]
    exclude_repositories: String,

    /// Comma-separated extract refs to exclude (repoA:src/foo.ts:0,...)
    #[arg(long, default_value = "")]
    exclude_extracts: String,

    /// Print results without the interactive selector (also when CI=true)
    #[arg(long)]
    no_interactive: bool,

    /// Output format: markdown or json
    #[arg(long, default_value = "markdown")]
    format: OutputFormat,

    /// Output type: repo-and-matches or repo-only
    #[arg(long, default_value = "repo-and-matches")]
    output_type: OutputType,

    /// Include archived repositories
    #[arg(long)]
    include_archived: bool,

    /// Comma-separated team-name prefixes used to group repos (e.g. squad-,chapter-)
    #[arg(long, default_value = "")]
    group_by_team_prefix: String,

    /// Ignore the cached team map (the fresh one is still cached)
    #[arg(long)]
    no_cache: bool,
}

fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_env("GCS_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn github_token() -> Option<String> {
    std::env::var("GITHUB_TOKEN")
        .ok()
        .filter(|t| !t.trim().is_empty())
}

fn is_ci() -> bool {
    std::env::var("CI").map(|v| v == "true").unwrap_or(false)
}

fn load_team_map(
    client: &GitHubClient,
    org: &str,
    prefixes: &[String],
    config: &Config,
    no_cache: bool,
) -> Result<TeamMap> {
    if !config.cache.enabled {
        return Ok(client.fetch_repo_teams(org, prefixes)?);
    }

    let cache = cache::Cache::from_config(&config.cache);
    let key = cache::team_cache_key(org, prefixes);
    if !no_cache {
        if let Some(teams) = cache.read::<TeamMap>(&key) {
            debug!(key, dir = %cache.dir().display(), "team map served from cache");
            return Ok(teams);
        }
    }

    let teams = client.fetch_repo_teams(org, prefixes)?;
    cache.write(&key, &teams);
    Ok(teams)
}

fn apply_teams(mut groups: Vec<RepoGroup>, teams: &TeamMap, prefixes: &[String]) -> Vec<RepoGroup> {
    for group in &mut groups {
        group.teams = Some(
            teams
                .get(&group.repo_full_name)
                .cloned()
                .unwrap_or_default(),
        );
    }
    group::flatten_team_sections(&group::group_by_team_prefix(&groups, prefixes))
}

fn run_query(args: SearchArgs, config: &Config) -> Result<()> {
    let Some(token) = github_token() else {
        bail!("GITHUB_TOKEN environment variable is not set.");
    };
    let (Some(query), Some(org)) = (args.query, args.org) else {
        bail!("a query and --org are required");
    };

    let excluded_repos =
        aggregate::parse_ref_list(&org, &args.exclude_repositories, aggregate::normalise_repo);
    let excluded_extract_refs =
        aggregate::parse_ref_list(&org, &args.exclude_extracts, aggregate::normalise_extract_ref);

    let client = GitHubClient::new(token, config.api.clone());
    let matches = client
        .fetch_all_results(&query, &org)
        .context("code search failed")?;
    let mut groups = aggregate::aggregate(
        &matches,
        &excluded_repos,
        &excluded_extract_refs,
        args.include_archived,
    );
    info!(matches = matches.len(), repos = groups.len(), "results aggregated");

    let prefixes = group::parse_prefixes(&args.group_by_team_prefix);
    if !prefixes.is_empty() {
        let teams = load_team_map(&client, &org, &prefixes, config, args.no_cache)
            .context("failed to resolve team membership")?;
        groups = apply_teams(groups, &teams, &prefixes);
    }

    let ctx = output::OutputContext {
        query: &query,
        org: &org,
        excluded_repos: &excluded_repos,
        excluded_extract_refs: &excluded_extract_refs,
        options: output::ReplayOptions {
            format: args.format,
            output_type: args.output_type,
            include_archived: args.include_archived,
            group_by_team_prefix: prefixes.join(","),
        },
    };

    let interactive = !args.no_interactive
        && !is_ci()
        && std::io::stdin().is_terminal()
        && std::io::stdout().is_terminal();

    if !interactive {
        println!("{}", output::build_output(&groups, &ctx)?);
        return Ok(());
    }

    if let Some(selected) = tui::run_interactive(groups, &query, &org)? {
        println!("{}", output::build_output(&selected, &ctx)?);
    }
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    if !config.display.colors || std::env::var_os("NO_COLOR").is_some() {
        colored::control::set_override(false);
    }

    match cli.command.unwrap_or(Commands::Query(cli.search)) {
        Commands::Query(args) => run_query(args, &config)?,

        Commands::Upgrade => {
            let exe = std::env::current_exe().context("cannot locate the running binary")?;
            let token = github_token();
            upgrade::perform_upgrade(
                env!("CARGO_PKG_VERSION"),
                &exe,
                &config.api.base_url,
                token.as_deref(),
            )?;
        }

        Commands::Config { create } => {
            if create {
                let path = Config::create_default()?;
                println!("Created: {}", path.display());
            } else {
                config::show_config()?;
            }
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", err).red());
        std::process::exit(1);
    }
}
