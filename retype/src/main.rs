use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::OutputFormat;
use crate::config::Config;
use crate::decode::DocumentKind;
use crate::error::AppError;

mod commands;
mod config;
mod decode;
mod error;
mod store;

const LOG_ENV: &str = "RETYPE_LOG";

/// Practice typing long-form text, chapter by chapter
#[derive(Debug, Parser)]
#[command(name = "retype", version, about)]
struct Cli {
    /// Configuration directory, instead of the platform default
    #[arg(long, global = true, value_name = "DIR")]
    config: Option<PathBuf>,

    /// More logging, repeat for even more
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct Input {
    /// Document to read
    file: PathBuf,

    /// Input format, guessed from the file extension if omitted
    #[arg(long, value_enum)]
    kind: Option<DocumentKind>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the table of contents
    Toc {
        #[command(flatten)]
        input: Input,

        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Print every chapter with its content
    Split {
        #[command(flatten)]
        input: Input,

        #[arg(short, long, value_enum, default_value_t)]
        output: OutputFormat,
    },

    /// Print the text with blank lines around detected headings
    Format {
        #[command(flatten)]
        input: Input,
    },

    /// Type the document line by line, resuming saved progress
    Practice {
        #[command(flatten)]
        input: Input,

        /// Chapter number or title to start at
        #[arg(short, long)]
        chapter: Option<String>,

        /// Ignore saved progress
        #[arg(long)]
        restart: bool,
    },

    /// Inspect or create the configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write a settings file with every default
    Init {
        /// Overwrite an existing settings file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective settings
    Show,
}

fn init_tracing(verbose: u8, quiet: bool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
}

fn run(cli: Cli) -> Result<(), AppError> {
    if let Command::Config {
        command: ConfigCommand::Init { force },
    } = cli.command
    {
        let directory = Config::directory(cli.config)?;
        let path = config::init(&directory, force)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = Config::get(cli.config)?;
    let mut out = io::stdout().lock();

    match cli.command {
        Command::Toc { input, output } => commands::toc(&config, &input.file, input.kind, output, &mut out),
        Command::Split { input, output } => {
            commands::split(&config, &input.file, input.kind, output, &mut out)
        }
        Command::Format { input } => commands::format(&input.file, input.kind, &mut out),
        Command::Practice {
            input,
            chapter,
            restart,
        } => commands::practice(
            &config,
            &input.file,
            input.kind,
            chapter.as_deref(),
            restart,
            io::stdin().lock(),
            &mut out,
        ),
        Command::Config { .. } => commands::show_config(&config, &mut out),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_tracing(cli.verbose, cli.quiet) {
        eprintln!("Failed to initialize logging: {error}");
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
