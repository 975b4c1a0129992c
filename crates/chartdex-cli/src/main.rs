//! chartdex CLI - Chart repository index builder and resolver

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;

use commands::Settings;
use commands::show::OutputFormat;
use error::Result;

#[derive(Parser)]
#[command(name = "chartdex")]
#[command(author = "chartdex Contributors")]
#[command(version)]
#[command(about = "Build chart repository indices and resolve charts against them", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Path to the repository configuration file
    #[arg(long, global = true, env = "CHARTDEX_REPOSITORY_CONFIG")]
    repository_config: Option<PathBuf>,

    /// Directory holding cached repository indices
    #[arg(long, global = true, env = "CHARTDEX_REPOSITORY_CACHE")]
    repository_cache: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an index file from a directory of packaged charts
    Index {
        /// Directory containing .tgz chart archives
        dir: PathBuf,

        /// URL of the chart repository
        #[arg(long, default_value = "")]
        url: String,

        /// Merge the generated index into an existing index file
        #[arg(long)]
        merge: Option<PathBuf>,

        /// Write index.json instead of index.yaml
        #[arg(long)]
        json: bool,
    },

    /// Inspect configured repositories
    Repo {
        #[command(subcommand)]
        command: RepoCommands,
    },

    /// Print the canonical repository for each reference
    Resolve {
        /// Repository names, @aliases, alias:names or URLs
        #[arg(required = true)]
        references: Vec<String>,

        /// Treat references as <repository>/<chart>
        #[arg(long)]
        chart: bool,
    },

    /// Show a chart version from a cached repository index
    #[command(disable_version_flag = true)]
    Show {
        /// Chart reference (<repository>/<chart>)
        reference: String,

        /// Version constraint (default: latest stable)
        #[arg(long)]
        version: Option<String>,

        /// Output the index record as YAML
        #[arg(long, conflicts_with = "json")]
        yaml: bool,

        /// Output the index record as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RepoCommands {
    /// List configured repositories
    List,
}

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Index {
            dir,
            url,
            merge,
            json,
        } => commands::index::run(&dir, &url, merge.as_deref(), json),

        Commands::Repo { command } => {
            let settings = Settings::resolve(cli.repository_config, cli.repository_cache)?;
            match command {
                RepoCommands::List => commands::repo::list(&settings),
            }
        }

        Commands::Resolve { references, chart } => {
            let settings = Settings::resolve(cli.repository_config, cli.repository_cache)?;
            commands::resolve::run(&settings, &references, chart)
        }

        Commands::Show {
            reference,
            version,
            yaml,
            json,
        } => {
            let format = if json {
                OutputFormat::Json
            } else if yaml {
                OutputFormat::Yaml
            } else {
                OutputFormat::Summary
            };
            let settings = Settings::resolve(cli.repository_config, cli.repository_cache)?;
            commands::show::run(&settings, &reference, version.as_deref(), format)
        }
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
