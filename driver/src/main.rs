use anyhow::Context;
use clap::{Parser, Subcommand};
use generator::profile::{write_experiments, GeneratorConfig};
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use workflow::config::{Overrides, WorkflowConfig};
use workflow::runner::{BatchMode, IngestOutcome, Runner};

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "SHPB signal extraction and batch analysis driver")]
struct Args {
    /// Load a workflow config from YAML
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Folder holding the permanent experiment collection
    #[arg(long, global = true)]
    database: Option<PathBuf>,
    #[arg(long, global = true)]
    workers: Option<usize>,
    /// Resampling factor for extracted pulse windows
    #[arg(long, global = true)]
    interpolation: Option<usize>,
    /// Per-experiment time budget in seconds
    #[arg(long, global = true)]
    deadline_secs: Option<u64>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Convert units and analyze one experiment, rewriting it in place
    Analyze { file: PathBuf },
    /// Validate, analyze and copy experiments into the database
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Re-analyze every experiment in the database
    Update,
    /// Write synthetic experiments
    Generate {
        dir: PathBuf,
        #[arg(long, default_value_t = 8)]
        count: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Generator settings as YAML
        #[arg(long)]
        profile: Option<PathBuf>,
    },
}

fn load_generator(path: Option<PathBuf>) -> anyhow::Result<GeneratorConfig> {
    let Some(path) = path else {
        return Ok(GeneratorConfig::default());
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading generator profile {}", path.display()))?;
    serde_yaml::from_str(&contents)
        .with_context(|| format!("parsing generator profile {}", path.display()))
}

fn run_batch(runner: &Runner, files: Vec<PathBuf>, mode: BatchMode) -> anyhow::Result<bool> {
    let runtime = TokioBuilder::new_multi_thread()
        .enable_all()
        .build()
        .context("creating runtime for batch processing")?;
    let summary = runtime.block_on(runner.run_batch(files, mode))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("serializing batch summary")?
    );
    Ok(summary.is_clean() && summary.rejected == 0)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let workflow_config = match &args.config {
        Some(path) => WorkflowConfig::load(path)?,
        None => WorkflowConfig::default(),
    }
    .with_overrides(&Overrides {
        database: args.database,
        workers: args.workers,
        interpolation: args.interpolation,
        deadline_secs: args.deadline_secs,
    });

    let ok = match args.command {
        Command::Generate {
            dir,
            count,
            seed,
            profile,
        } => {
            let config = GeneratorConfig {
                seed,
                ..load_generator(profile)?
            };
            for path in write_experiments(&dir, count, &config)? {
                println!("{}", path.display());
            }
            true
        }
        Command::Analyze { file } => {
            let runner = Runner::new(workflow_config)?;
            let summary = runner.process_file(&file)?;
            print!("{summary}");
            true
        }
        Command::Ingest { files } => {
            let runner = Runner::new(workflow_config)?;
            if let [file] = files.as_slice() {
                match runner.ingest_file(file)? {
                    IngestOutcome::Accepted {
                        summary,
                        destination,
                    } => {
                        print!("{summary}");
                        println!("Written to {}", destination.display());
                        true
                    }
                    IngestOutcome::Rejected(report) => {
                        print!("{report}");
                        false
                    }
                }
            } else {
                run_batch(&runner, files, BatchMode::Ingest)?
            }
        }
        Command::Update => {
            let runner = Runner::new(workflow_config)?;
            let files = runner.database_files()?;
            log::info!(
                "updating {} experiments in {} with {} workers",
                files.len(),
                runner.config().database.display(),
                runner.config().workers
            );
            run_batch(&runner, files, BatchMode::Update)?
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
