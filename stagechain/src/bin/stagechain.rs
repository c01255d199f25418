//! Stagechain CLI - runs or prints the standard processing chain for a project.
//!
//! Stage implementations are not bundled; the CLI runs every stage as a dry
//! run, which exercises the chain, the context and the benchmarking log.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use stagechain::prelude::*;

/// Sequential stage-chain runner.
#[derive(Parser)]
#[command(name = "stagechain")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory.
    project_path: PathBuf,

    /// JSON file with run options. Flags below override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip dense reconstruction.
    #[arg(long)]
    fast_orthophoto: bool,

    /// Reset the benchmarking log and record per-stage runtimes.
    #[arg(long)]
    time: bool,

    /// Verbose stage output.
    #[arg(short, long)]
    verbose: bool,

    /// Debug logging.
    #[arg(long)]
    debug: bool,

    /// Stop after this stage.
    #[arg(long)]
    end_with: Option<String>,

    /// Rerun only this stage.
    #[arg(long)]
    rerun: Option<String>,

    /// Rerun every stage.
    #[arg(long)]
    rerun_all: bool,

    /// Rerun this stage and every later one.
    #[arg(long)]
    rerun_from: Option<String>,

    /// Print the chain and exit without running it.
    #[arg(long)]
    plan: bool,
}

impl Cli {
    fn options(&self) -> anyhow::Result<RunOptions> {
        let mut options = match &self.config {
            Some(path) => RunOptions::from_json_file(path)?,
            None => RunOptions::default(),
        };

        options.project_path.clone_from(&self.project_path);
        options.fast_orthophoto |= self.fast_orthophoto;
        options.benchmarking |= self.time;
        options.verbose |= self.verbose;
        options.debug |= self.debug;
        options.rerun_all |= self.rerun_all;
        if self.end_with.is_some() {
            options.end_with.clone_from(&self.end_with);
        }
        if self.rerun.is_some() {
            options.rerun.clone_from(&self.rerun);
        }
        if self.rerun_from.is_some() {
            options.rerun_from.clone_from(&self.rerun_from);
        }
        Ok(options)
    }
}

fn init_logging(options: &RunOptions) {
    let default_level = if options.debug {
        "debug"
    } else if options.verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn print_plan(chain: &Chain) {
    println!("Chain: {}", chain.name());
    for (i, name) in chain.planned().into_iter().enumerate() {
        let progress = chain.node(name).map_or(0.0, StageNode::progress);
        let rerun = if chain.is_rerun(name) { " (rerun)" } else { "" };
        println!("  {:>2}. {:<20} {:>5.1}%{}", i + 1, name, progress, rerun);
    }
    let skipped = chain.skipped();
    if !skipped.is_empty() {
        println!("Skipped: {}", skipped.join(", "));
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let options = cli.options()?;
    init_logging(&options);

    let driver = PipelineDriver::new(options, &StageRegistry::dry_run())?;
    if cli.plan {
        print_plan(driver.chain());
        return Ok(());
    }

    let planned = driver.chain().planned().len();
    let started = std::time::Instant::now();
    let ctx = driver
        .with_progress_sink(Arc::new(LoggingProgressSink::default()))
        .execute()?;

    println!(
        "Finished {} stages in {:.2?} ({} context keys)",
        planned,
        started.elapsed(),
        ctx.len()
    );
    Ok(())
}
