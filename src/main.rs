//! gwh CLI - manage local git warehouses

use clap::{Parser, Subcommand};
use gwh::config::{self, LayoutConfig};
use gwh::output::OutputMode;
use gwh::ui::{self, Spinner};
use gwh::Warehouse;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gwh")]
#[command(version)]
#[command(about = "Git Warehouse - manage local git warehouses")]
#[command(long_about = r#"
gwh links git repositories to a warehouse directory and ingests their commit
history into a property graph of commits and parent edges.

Example usage:
  gwh init
  gwh link app ../src/app
  gwh sync app
  gwh stats app
"#)]
struct Cli {
    /// Directory containing the warehouse directory (defaults to the current directory)
    #[arg(short, long, global = true)]
    prefix: Option<PathBuf>,

    /// Path to a gwh.toml config file (defaults to <prefix>/gwh.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the warehouse (idempotent)
    Init,

    /// Link a git repository under a name
    Link {
        /// Link name ([A-Za-z_][A-Za-z0-9_-]*)
        name: String,

        /// Repository path, relative to the warehouse root unless absolute
        path: PathBuf,
    },

    /// Ingest the commit history of a linked repository
    Sync {
        /// Link name
        name: String,
    },

    /// List linked repositories
    List,

    /// Show statistics about a linked repository's ingested history
    Stats {
        /// Link name
        name: String,
    },

    /// Show the parents and ancestors of a commit in a linked repository
    Log {
        /// Link name
        name: String,

        /// Commit id
        commit: String,
    },

    /// Dump a linked repository's commit graph as JSON
    Export {
        /// Link name
        name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cwd = std::env::current_dir()?;
    let prefix = match &cli.prefix {
        Some(p) if p.is_absolute() => p.clone(),
        Some(p) => cwd.join(p),
        None => cwd.clone(),
    };
    let layout = load_layout(&prefix, cli.config.as_deref())?;
    let mode = OutputMode::select(cli.json);

    let warehouse = Warehouse::open_with(&prefix, &cwd, layout)?;

    match &cli.command {
        Commands::Init => {
            let control = warehouse.control();
            mode.emit_json(&serde_json::json!({
                "root": warehouse.layout().root(),
                "state": format!("{:?}", control.state()),
                "schema_version": control.schema_version(),
                "links": control.count_links()?,
            }))?;
            if mode.is_human() {
                ui::success(&format!("Warehouse ready at {}", warehouse.layout().root().display()));
                ui::summary_row("Control store:", &warehouse.layout().control_db_path().display().to_string());
                ui::summary_row("Schema version:", &control.schema_version().to_string());
                ui::summary_row("Links:", &control.count_links()?.to_string());
            }
        }

        Commands::Link { name, path } => {
            let outcome = warehouse.link_repository(name, path)?;
            mode.emit_json(&serde_json::json!({
                "link": outcome.link(),
                "created": outcome.is_new(),
            }))?;
            if mode.is_human() {
                if outcome.is_new() {
                    ui::success(&format!("Linked {}", name));
                } else {
                    ui::warn(&format!("{} is already linked; keeping the existing link", name));
                }
                ui::link_line(outcome.link());
            }
        }

        Commands::Sync { name } => {
            let spinner = mode.is_human().then(|| Spinner::new(&format!("Syncing {}", name)));
            let result = warehouse.sync_repository(name);
            if let Some(spinner) = &spinner {
                spinner.finish_and_clear();
            }
            let stats = result?;

            mode.emit_json(&stats)?;
            if mode.is_human() {
                ui::success(&format!("Synced {}", name));
                ui::sync_summary(&stats);
            }
        }

        Commands::List => {
            let links = warehouse.links()?;
            mode.emit_json(&links)?;
            if mode.is_human() {
                if links.is_empty() {
                    ui::info("Links", "none");
                } else {
                    ui::header(&format!("{} linked repositories", links.len()));
                    println!("{}", ui::links_table(&links));
                }
            }
        }

        Commands::Stats { name } => {
            let stats = warehouse.analytics(name)?.stats()?;
            mode.emit_json(&stats)?;
            if mode.is_human() {
                ui::section(name);
                println!(
                    "{}",
                    ui::stats_table(&[
                        ("Commits", stats.commits.to_string()),
                        ("Parent edges", stats.parents.to_string()),
                        ("Roots", stats.roots.to_string()),
                        ("Merges", stats.merges.to_string()),
                        ("Graph", (if stats.graph { "registered" } else { "missing" }).to_string()),
                    ])
                );
            }
        }

        Commands::Log { name, commit } => {
            let store = warehouse.analytics(name)?;
            if store.get_commit(commit)?.is_none() {
                anyhow::bail!("commit {} has not been synced into {}", commit, name);
            }
            let parents = store.parents(commit)?;
            let ancestors = store.ancestors(commit)?;

            mode.emit_json(&serde_json::json!({
                "commit": commit,
                "parents": parents,
                "ancestors": ancestors,
            }))?;
            if mode.is_human() {
                ui::info("Parents", &parents.join(", "));
                ui::info("Ancestors", &ancestors.len().to_string());
                for id in ancestors {
                    let message = store.get_commit(&id)?.map(|c| c.message).unwrap_or_default();
                    ui::commit_line(&id, &message);
                }
            }
        }

        Commands::Export { name } => {
            let store = warehouse.analytics(name)?;
            let data = serde_json::json!({
                "graph": gwh::storage::schema::COMMIT_GRAPH_NAME,
                "commits": store.commit_ids()?,
                "parents": store.parent_edges()?,
            });
            if mode != OutputMode::Quiet {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
        }
    }

    warehouse.close()?;
    Ok(())
}

fn load_layout(prefix: &Path, explicit: Option<&Path>) -> anyhow::Result<LayoutConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config::default_config_path_in(prefix));

    match config::load_config(&path)? {
        Some(config) => {
            tracing::debug!("Loaded config from {}", path.display());
            Ok(config.layout)
        }
        None if explicit.is_some() => anyhow::bail!("config file not found: {}", path.display()),
        None => Ok(LayoutConfig::default()),
    }
}
