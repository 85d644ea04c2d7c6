pub(crate) mod commands;
pub(crate) mod state;

pub use state::AppState;

use crate::domain::error::Result;
use crate::domain::test_case::TestType;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "casegen")]
#[command(about = "Generate structured test cases from requirements with a language model")]
#[command(
    after_help = "Environment:\n  CASEGEN_LLM__MODEL     Override llm.model (any key, `__` separates sections)\n  RUST_LOG               Log filter (default: info)"
)]
pub struct Cli {
    /// Configuration file (default: casegen.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a requirements document and generate a test case per feature and type.
    Generate {
        #[arg(long)]
        requirements: PathBuf,
        /// Repeatable; defaults to the configured test types.
        #[arg(long = "test-type")]
        test_types: Vec<TestType>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Print the features found in a requirements document.
    Analyze {
        #[arg(long)]
        requirements: PathBuf,
    },
    /// Structure previously captured model output (`-` reads stdin).
    Extract {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value_t = false)]
        no_save: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// List the models offered by the configured backend.
    Models,
}

pub async fn dispatch(cli: Cli) -> Result<ExitCode> {
    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Generate {
            requirements,
            test_types,
            output_dir,
        } => {
            let state = AppState::load(cli.config.as_deref(), output_dir)?;
            commands::generate(&state, &requirements, &test_types, &mut out).await
        }
        Commands::Analyze { requirements } => {
            let state = AppState::load(cli.config.as_deref(), None)?;
            commands::analyze(&state, &requirements, &mut out).await
        }
        Commands::Extract {
            input,
            title,
            no_save,
            output_dir,
        } => {
            let state = AppState::load(cli.config.as_deref(), output_dir)?;
            commands::extract(&state, &input, title.as_deref(), no_save, &mut out)
        }
        Commands::Models => {
            let state = AppState::load(cli.config.as_deref(), None)?;
            commands::models(&state, &mut out).await
        }
    }
}
