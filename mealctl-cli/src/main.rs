//! mealctl CLI - filter queries against the meal-planning store
//!
//! Subcommands:
//! - `migrate`: create tables and indexes
//! - `query` / `count`: run a filter dictionary against an entity
//! - `explain`: print the SQL for a filter without touching the database
//! - `keys`: list the filter keys an entity accepts
//! - `discard`: soft-delete a row

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use mealctl_core::config::{load_dotenv, MealctlConfig};

mod commands;
mod tracing_setup;

use commands::discard::DiscardArgs;
use commands::keys::KeysArgs;
use commands::query::QueryArgs;
use tracing_setup::{init_tracing, TracingConfig};

#[derive(Parser, Debug)]
#[command(
    name = "mealctl",
    author,
    version,
    about = "Query the meal-planning store with filter dictionaries",
    long_about = "Filter clients, menus, meals, recipes and products with key=value filters. \
                  Keys take operator postfixes (_gte, _lte, _gt, _lt, _ne, _not_in, _is_not) \
                  and may reach into related tables; joins are added as needed."
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(long, global = true)]
    debug: bool,

    /// PostgreSQL URL (overrides DATABASE_URL and the config file)
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create tables and indexes (idempotent)
    Migrate,
    /// Print matching rows as JSON
    Query(QueryArgs),
    /// Print the number of matching rows
    Count(QueryArgs),
    /// Print the SQL a query would run (no database needed)
    Explain(QueryArgs),
    /// List filter keys for an entity
    Keys(KeysArgs),
    /// Soft-delete a row
    Discard(DiscardArgs),
    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(Parser, Debug)]
struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    shell: Shell,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)] // PowerShell is a proper noun, not a suffix
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&TracingConfig { debug: cli.debug }).ok();
    load_dotenv();

    let mut config = MealctlConfig::load();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    match cli.command {
        Commands::Migrate => commands::run_migrate(&config).await?,
        Commands::Query(args) => commands::run_query(args, &config).await?,
        Commands::Count(args) => commands::run_count(args, &config).await?,
        Commands::Explain(args) => commands::run_explain(args, &config)?,
        Commands::Keys(args) => commands::run_keys(args)?,
        Commands::Discard(args) => commands::run_discard(args, &config).await?,
        Commands::Completions(args) => run_completions(args)?,
    }
    Ok(())
}

fn run_completions(args: CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as CompletionShell};
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();

    let shell = match args.shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    };

    generate(shell, &mut cmd, bin_name, &mut io::stdout());

    Ok(())
}
