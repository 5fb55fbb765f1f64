//! stylo-lab CLI
//!
//! Runs authorship-attribution experiments described by TOML files.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use stylo_lab::analyzer::ClassifierRegistry;
use stylo_lab::{Experiment, ExperimentFile};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stylo-lab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare, run, and report one experiment
    Run {
        /// Experiment file
        experiment: PathBuf,

        /// Override the info gain attribute count from the file
        #[arg(long)]
        info_gain: Option<usize>,

        /// Print the ranked info gain listing (zero-gain entries included)
        #[arg(long)]
        show_info_gain: bool,

        /// Write the prepared training table as ARFF
        #[arg(long)]
        export_training: Option<PathBuf>,

        /// Write the run history as JSON
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// List the built-in classifier identifiers
    Classifiers,
}

fn run(
    path: &Path,
    info_gain: Option<usize>,
    show_info_gain: bool,
    export_training: Option<&Path>,
    history: Option<&Path>,
) -> Result<()> {
    let file = ExperimentFile::from_path(path)
        .with_context(|| format!("cannot read experiment file {}", path.display()))?;
    let info_gain = info_gain.or(file.info_gain);
    let mut experiment = file.into_builder().build()?;

    let report = experiment.prepare_instances();
    if let Some(failure) = report.failure() {
        bail!("preparation stopped: {failure}");
    }
    experiment.prepare_analyzer()?;

    if info_gain.is_some() || show_info_gain {
        experiment.calc_info_gain()?;
        if show_info_gain {
            println!("{}", experiment.readable_info_gain(true)?);
        }
    }
    if let Some(n) = info_gain {
        experiment.apply_info_gain(n)?;
    }
    if let Some(out) = export_training {
        let table = experiment
            .training_table()
            .context("no training table to export")?;
        Experiment::write_arff(out, table)?;
        tracing::info!(path = %out.display(), "Exported training table");
    }

    let result = experiment.run().map(|_| ());
    if let Some(out) = history {
        experiment
            .history()
            .write_json(out)
            .with_context(|| format!("cannot write {}", out.display()))?;
    }
    result?;

    if let Some(predictions) = experiment.predictions() {
        for (document, scores) in predictions {
            println!("{document}");
            let mut ranked: Vec<_> = scores.iter().collect();
            ranked.sort_by(|a, b| b.1.total_cmp(a.1));
            for (author, score) in ranked {
                println!("  {author:<30} {score:.6}");
            }
        }
    } else {
        println!("Accuracy: {}%", experiment.classification_accuracy()?);
        println!("{}", experiment.stat_string()?);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            experiment,
            info_gain,
            show_info_gain,
            export_training,
            history,
        } => run(
            &experiment,
            info_gain,
            show_info_gain,
            export_training.as_deref(),
            history.as_deref(),
        ),
        Commands::Classifiers => {
            for identifier in ClassifierRegistry::with_defaults().identifiers() {
                println!("{identifier}");
            }
            Ok(())
        }
    }
}
