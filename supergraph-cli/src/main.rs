//! Supergraph CLI - structural graph extraction and superimposition for Java
//!
//! Extracts types, methods, fields and their dependencies from Java source
//! trees, then aligns two snapshots to report what changed.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::superimpose::SuperimposeArgs;
use config::SgConfig;
use output::OutputFormat;

/// Structural graph extraction and superimposition for Java codebases.
#[derive(Parser)]
#[command(name = "supergraph")]
#[command(author, version)]
#[command(about = "Structural graph extraction and superimposition for Java codebases")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  supergraph extract src/ --repo v1 --out v1.json
  supergraph superimpose old/ new/ --left-repo v1 --right-repo v2
  supergraph diff v1.json v2.json --supergraph release --markers-out markers.json")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the structural graph of one source root
    #[command(visible_alias = "x")]
    Extract {
        /// Source root to analyze
        #[arg(default_value = ".")]
        path: String,

        /// Repository (snapshot) id recorded in the graph
        #[arg(short, long)]
        repo: String,

        /// Project name (overrides config)
        #[arg(short, long)]
        project: Option<String>,

        /// Write the graph as JSON to this file
        #[arg(short, long)]
        out: Option<String>,

        /// Skip the external semantic backend even if configured
        #[arg(long)]
        no_semantic: bool,
    },

    /// Ingest two source roots and classify every entity
    #[command(visible_alias = "si")]
    Superimpose {
        /// Left (baseline) source root
        left: String,

        /// Right (candidate) source root
        right: String,

        /// Repository id for the left root
        #[arg(long, default_value = "left")]
        left_repo: String,

        /// Repository id for the right root
        #[arg(long, default_value = "right")]
        right_repo: String,

        /// Supergraph id (default: <left-repo>..<right-repo>)
        #[arg(long)]
        supergraph: Option<String>,

        /// Project name (overrides config)
        #[arg(short, long)]
        project: Option<String>,

        /// Do not attach patch text to CHANGED markers
        #[arg(long)]
        no_patches: bool,

        /// Skip the external semantic backend even if configured
        #[arg(long)]
        no_semantic: bool,

        /// Write summary and markers as JSON to this file
        #[arg(long)]
        markers_out: Option<String>,
    },

    /// Superimpose two previously extracted graph files
    Diff {
        /// Left graph JSON
        left: String,

        /// Right graph JSON
        right: String,

        /// Supergraph id recorded on every marker
        #[arg(long, default_value = "diff")]
        supergraph: String,

        /// Source root of the left graph (enables patches)
        #[arg(long)]
        left_root: Option<String>,

        /// Source root of the right graph (enables patches)
        #[arg(long)]
        right_root: Option<String>,

        /// Write summary and markers as JSON to this file
        #[arg(long)]
        markers_out: Option<String>,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = SgConfig::load(std::path::Path::new("."));

    // CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Extract {
            path,
            repo,
            project,
            out,
            no_semantic,
        } => commands::extract::run(
            &path,
            &repo,
            project.as_deref(),
            out.as_deref(),
            no_semantic,
            &config,
            format,
        ),
        Commands::Superimpose {
            left,
            right,
            left_repo,
            right_repo,
            supergraph,
            project,
            no_patches,
            no_semantic,
            markers_out,
        } => commands::superimpose::run(
            SuperimposeArgs {
                left: &left,
                right: &right,
                left_repo: &left_repo,
                right_repo: &right_repo,
                supergraph: supergraph.as_deref(),
                project: project.as_deref(),
                no_patches,
                no_semantic,
                markers_out: markers_out.as_deref(),
            },
            &config,
            format,
        ),
        Commands::Diff {
            left,
            right,
            supergraph,
            left_root,
            right_root,
            markers_out,
        } => commands::diff::run(
            &left,
            &right,
            &supergraph,
            left_root.as_deref(),
            right_root.as_deref(),
            markers_out.as_deref(),
            &config,
            format,
        ),
    }
}
