// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use strata::{
    backend::BitbakeBackend,
    config::Config,
    fetch::{FetchOutcome, Fetcher, Request},
    gate::TerminalConfirmation,
    index::{transport::HttpTransport, LayerIndex},
    path::locate_config,
    workspace::Workspace,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{env::current_dir, fs::read_to_string, path::PathBuf, process::exit, time::Duration};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type StrataFetcher = Fetcher<HttpTransport, BitbakeBackend, TerminalConfirmation>;

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "strata [options] <strata-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Workspace root, defaults to current directory.
    #[arg(short, long, global = true, value_name = "dir")]
    pub workspace: Option<PathBuf>,

    /// Configuration file to use instead of the default lookup.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let root = match self.workspace {
            Some(root) => root,
            None => current_dir().context("cannot determine current directory")?,
        };
        let config = load_config(self.config, &root)?;
        let workspace = Workspace::new(root, &config.workspace);
        let mut fetcher = build_fetcher(&config, workspace)?;

        match self.command {
            Command::Get(opts) => run_get(&mut fetcher, opts),
            Command::Machine(opts) => run_machine(&mut fetcher, opts),
            Command::Search(opts) => run_search(&mut fetcher, opts),
            Command::Layers(opts) => run_layers(&fetcher, opts),
            Command::Deps(opts) => run_deps(&mut fetcher, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Fetch recipe's layer and every layer it requires.
    #[command(override_usage = "strata get [options] <recipe>")]
    Get(GetOptions),

    /// Fetch machine's layer and every layer it requires.
    #[command(override_usage = "strata machine [options] <machine>")]
    Machine(MachineOptions),

    /// Search recipes available on a branch.
    #[command(override_usage = "strata search [options] <term>")]
    Search(SearchOptions),

    /// Search layers by name.
    #[command(override_usage = "strata layers <term>")]
    Layers(LayersOptions),

    /// Show dependency tree of a layer.
    #[command(override_usage = "strata deps [options] <layer>")]
    Deps(DepsOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct GetOptions {
    /// Name of recipe to fetch.
    #[arg(required = true, value_name = "recipe")]
    pub recipe: String,

    /// Branch to search instead of the workspace branch.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MachineOptions {
    /// Name of machine to fetch.
    #[arg(required = true, value_name = "machine")]
    pub machine: String,

    /// Branch to search instead of the workspace branch.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct SearchOptions {
    /// Substring of recipe names to look for.
    #[arg(required = true, value_name = "term")]
    pub term: String,

    /// Branch to search instead of the workspace branch.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,

    /// Maximum number of results to list.
    #[arg(short, long, value_name = "count", default_value_t = 10)]
    pub limit: usize,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct LayersOptions {
    /// Substring of layer names to look for.
    #[arg(required = true, value_name = "term")]
    pub term: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DepsOptions {
    /// Exact name of layer.
    #[arg(required = true, value_name = "layer")]
    pub layer: String,

    /// Branch to inspect instead of the workspace branch.
    #[arg(short, long, value_name = "branch")]
    pub branch: Option<String>,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn load_config(explicit: Option<PathBuf>, root: &std::path::Path) -> Result<Config> {
    let Some(path) = locate_config(explicit.as_deref(), root) else {
        debug!("no configuration file found, using defaults");
        return Ok(Config::default());
    };

    debug!("load configuration from {:?}", path.display());
    let data = read_to_string(&path)
        .with_context(|| format!("cannot read configuration file {:?}", path.display()))?;
    data.parse::<Config>()
        .with_context(|| format!("invalid configuration file {:?}", path.display()))
}

fn build_fetcher(config: &Config, workspace: Workspace) -> Result<StrataFetcher> {
    let transport = HttpTransport::new(
        &config.index.url,
        &config.index.user_agent,
        Duration::from_secs(config.index.timeout_secs),
    )?;
    let branch = workspace.branch();
    debug!("workspace branch is {branch:?}");
    let backend = BitbakeBackend::new(workspace).with_shallow(config.acquire.shallow);

    Ok(Fetcher::new(
        LayerIndex::new(transport),
        backend,
        TerminalConfirmation::detect(),
        branch,
    )
    .with_fallback_ref(&config.acquire.fallback_branch))
}

fn branch_or_workspace(fetcher: &StrataFetcher, branch: Option<String>) -> String {
    branch.unwrap_or_else(|| fetcher.workspace_branch().to_string())
}

fn run_get(fetcher: &mut StrataFetcher, opts: GetOptions) -> Result<()> {
    let branch = branch_or_workspace(fetcher, opts.branch);
    let outcome = fetcher.fetch(&Request::recipe(opts.recipe, branch))?;
    report(&outcome);

    Ok(())
}

fn run_machine(fetcher: &mut StrataFetcher, opts: MachineOptions) -> Result<()> {
    let branch = branch_or_workspace(fetcher, opts.branch);
    let outcome = fetcher.fetch(&Request::machine(opts.machine, branch))?;
    report(&outcome);

    Ok(())
}

fn run_search(fetcher: &mut StrataFetcher, opts: SearchOptions) -> Result<()> {
    let branch = branch_or_workspace(fetcher, opts.branch);
    let listing = fetcher.search_recipes(&opts.term, &branch, opts.limit)?;

    if listing.hits.is_empty() {
        if listing.elsewhere > 0 {
            warn!(
                "no recipes matching {:?} on branch {branch:?}, {} match(es) on other branches",
                opts.term, listing.elsewhere
            );
        } else {
            warn!("no recipes matching {:?}", opts.term);
        }
        return Ok(());
    }

    println!("{:<32} {:<20} {:<28} SUMMARY", "RECIPE", "VERSION", "LAYER");
    for hit in listing.hits {
        println!(
            "{:<32} {:<20} {:<28} {}",
            hit.name,
            hit.version.unwrap_or_default(),
            hit.layer_name,
            hit.summary
        );
    }

    Ok(())
}

fn run_layers(fetcher: &StrataFetcher, opts: LayersOptions) -> Result<()> {
    let layers = fetcher.search_layers(&opts.term);
    if layers.is_empty() {
        warn!("no layers matching {:?}", opts.term);
        return Ok(());
    }

    println!("{:<32} URL", "LAYER");
    for layer in layers {
        println!("{:<32} {}", layer.name, layer.vcs_url);
    }

    Ok(())
}

fn run_deps(fetcher: &mut StrataFetcher, opts: DepsOptions) -> Result<()> {
    let branch = branch_or_workspace(fetcher, opts.branch);
    let tree = fetcher.dependency_tree(&opts.layer, &branch)?;
    print!("{tree}");

    Ok(())
}

fn report(outcome: &FetchOutcome) {
    let target = &outcome.target;
    info!(
        "{} {:?} is available from layer {:?} on branch {:?}",
        target.kind, target.name, target.layer_name, target.branch.name
    );
    if let Some(web_url) = &target.vcs_web_url {
        info!("layer web view: {web_url}");
    }

    let report = &outcome.report;
    if report.registered.is_empty() {
        info!("nothing to do, every layer is already active");
    } else {
        info!(
            "cloned {} repositories, registered {}",
            report.cloned.len(),
            report.registered.join(", ")
        );
    }
}
