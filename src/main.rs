use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::Level;

use phased::cli::commands::{self, CommonOptions};

#[derive(Parser)]
#[command(
    name = "phased",
    about = "Step dependency analysis and phased execution planning",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Common {
    /// Scenario source files
    files: Vec<PathBuf>,

    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Active phase: producer, consumer, non_phased, permutational
    #[arg(short, long)]
    phase: Option<String>,

    /// Number call sites instead of using source lines as positions
    #[arg(long)]
    synthetic: bool,

    /// Refuse plans with more orderings than this
    #[arg(long)]
    max_permutations: Option<u64>,

    /// Output format: yaml, json
    #[arg(short, long, default_value = "yaml")]
    format: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl From<&Common> for CommonOptions {
    fn from(c: &Common) -> Self {
        Self {
            config: c.config.clone(),
            phase: c.phase.clone(),
            synthetic: c.synthetic,
            max_permutations: c.max_permutations,
            format: c.format.clone(),
            output: c.output.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compile run plans (orderings) for the active phase
    Plan(Common),

    /// Classify produce/consume relations between steps
    Relations(Common),

    /// Decide which lifecycle methods run in the active phase
    Gate(Common),

    /// Check that a producer run stored every key the scenarios consume
    Verify {
        #[command(flatten)]
        common: Common,

        /// Run identity shared by the producer and consumer runs
        #[arg(long)]
        run_id: String,

        /// Directory holding cross-run store files
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn require_files(common: &Common) {
    if common.files.is_empty() {
        eprintln!("error: no input files provided");
        std::process::exit(1);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Some(Commands::Plan(common)) => {
            require_files(common);
            commands::run_plan(&common.files, &common.into())
        }
        Some(Commands::Relations(common)) => {
            require_files(common);
            commands::run_relations(&common.files, &common.into())
        }
        Some(Commands::Gate(common)) => {
            require_files(common);
            commands::run_gate(&common.files, &common.into())
        }
        Some(Commands::Verify {
            common,
            run_id,
            store,
        }) => {
            require_files(common);
            commands::run_verify(&common.files, run_id, store.as_deref(), &common.into())
        }
        None => {
            // No subcommand: print help
            Cli::parse_from(["phased", "--help"]);
            return;
        }
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}
