mod commands;
mod ui;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::Result;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(
    name = "termwiki",
    version,
    about = "Reconcile a multilingual term collection between spreadsheets and the wiki"
)]
struct Cli {
    /// Disable coloured output
    #[arg(long, global = true)]
    no_color: bool,

    /// Only print warnings and errors on the console
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Reconcile a spreadsheet with the wiki and apply the edits
    Import {
        #[arg(long)]
        sheet: PathBuf,
        /// Use a directory of page files instead of the MediaWiki API
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        /// Save the computed plan as JSON for `bot-update`
        #[arg(long)]
        plan_out: Option<PathBuf>,
        /// Concept ids to delete on the wiki
        #[arg(long, num_args = 1..)]
        delete: Vec<String>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Write wiki concepts to a spreadsheet
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        /// Title prefix, namespace included (`Boazodoallu:`)
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Read a MediaWiki XML export instead of the live wiki
        #[arg(long, conflicts_with = "pages_dir")]
        dump: Option<PathBuf>,
        /// Merge into this existing spreadsheet
        #[arg(long)]
        into: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Apply a plan saved by `import --plan-out`
    BotUpdate {
        #[arg(long)]
        plan: PathBuf,
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        /// Index of the first operation to apply
        #[arg(long, default_value_t = 0)]
        resume_from: usize,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Rename a concept, or merge it into another one
    Move {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, default_value_t = false)]
        merge: bool,
        #[arg(long)]
        pages_dir: Option<PathBuf>,
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Check spreadsheet forms against the morphological analysers
    Validate {
        #[arg(long)]
        sheet: PathBuf,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Dump JSON Schemas of the report types
    Schema {
        #[arg(long)]
        out_dir: PathBuf,
    },
}

trait Runnable {
    /// `Ok(false)` means the command ran but some record failed.
    fn run(self, use_color: bool) -> Result<bool>;
}

impl Runnable for Commands {
    fn run(self, use_color: bool) -> Result<bool> {
        let cmd_name = format!("{self:?}");
        info!(event = "command_started", command = %cmd_name);
        let cfg = termwiki_config::load_config()?;

        let result = match self {
            Commands::Import {
                sheet,
                pages_dir,
                dry_run,
                plan_out,
                delete,
                format,
            } => commands::import::run_import(
                &cfg,
                commands::import::ImportArgs {
                    sheet,
                    pages_dir,
                    dry_run,
                    plan_out,
                    delete,
                },
                format,
                use_color,
            ),
            Commands::Export {
                out,
                pages_dir,
                prefix,
                category,
                dump,
                into,
                format,
            } => commands::export::run_export(
                &cfg,
                commands::export::ExportArgs {
                    out,
                    pages_dir,
                    prefix,
                    category,
                    dump,
                    into,
                },
                format,
                use_color,
            ),
            Commands::BotUpdate {
                plan,
                pages_dir,
                resume_from,
                format,
            } => commands::bot_update::run_bot_update(&cfg, plan, pages_dir, resume_from, format, use_color),
            Commands::Move {
                from,
                to,
                merge,
                pages_dir,
                dry_run,
                format,
            } => commands::moves::run_move(
                &cfg,
                commands::moves::MoveArgs {
                    from,
                    to,
                    merge,
                    pages_dir,
                    dry_run,
                },
                format,
                use_color,
            ),
            Commands::Validate { sheet, format } => {
                commands::validate::run_validate(&cfg, sheet, format, use_color)
            }
            Commands::Schema { out_dir } => commands::schema::run_schema(out_dir).map(|_| true),
        };

        match &result {
            Ok(ok) => info!(event = "command_finished", command = %cmd_name, success = ok),
            Err(e) => error!(event = "command_failed", command = %cmd_name, error = ?e),
        }
        result
    }
}

fn init_tracing(quiet: bool) -> WorkerGuard {
    let file_appender = rolling::daily("logs", "termwiki.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if quiet { "warn" } else { "info" };
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        );

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    guard
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let guard = init_tracing(cli.quiet);

    let use_color = !cli.no_color
        && std::io::stdout().is_terminal()
        && std::env::var_os("NO_COLOR").is_none();

    if !cli.cmd.run(use_color)? {
        drop(guard);
        std::process::exit(1);
    }
    Ok(())
}
