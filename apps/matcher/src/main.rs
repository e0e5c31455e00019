use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matcher::config::Config;
use matcher::matching::highlights::{highlight_evidence, SkillHighlight};
use matcher::matching::scorer::{ExplainabilityReport, ScoreExplanation, Scorer};
use matcher::matching::{store_skill_embeddings, CandidateProfile, JobProfile};
use matcher::settings::{FixedThreshold, ThresholdSource};

#[derive(Parser)]
#[command(name = "matcher", version, about = "Score a resume against a job posting")]
struct Cli {
    /// Skill similarity threshold for this run (overrides settings file and env)
    #[arg(long, global = true)]
    threshold: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Composite score plus summary explanation
    Score {
        #[arg(long)]
        job: PathBuf,
        #[arg(long)]
        resume: PathBuf,
    },
    /// Full explainability report
    Explain {
        #[arg(long)]
        job: PathBuf,
        #[arg(long)]
        resume: PathBuf,
        /// Attach resume sentences supporting each skill
        #[arg(long)]
        highlights: bool,
    },
    /// Precompute skill embeddings and store them in the job JSON
    EmbedSkills {
        #[arg(long)]
        job: PathBuf,
        /// Write here instead of overwriting the job file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the active threshold, or persist a new one to the settings file
    Threshold { value: Option<f64> },
}

#[derive(Serialize)]
struct ScoreOutput {
    score: f64,
    explanation: ScoreExplanation,
}

#[derive(Serialize)]
struct ExplainOutput {
    #[serde(flatten)]
    report: ExplainabilityReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    highlights: Option<Vec<SkillHighlight>>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr; stdout carries the JSON result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let threshold: Arc<dyn ThresholdSource> = match cli.threshold {
        Some(value) => Arc::new(FixedThreshold(value)),
        None => config.threshold_source(),
    };

    match cli.command {
        Command::Score { job, resume } => {
            let scorer = build_scorer(&config, threshold);
            let (score, explanation) = scorer.score(&read_job(&job)?, &read_resume(&resume)?);
            print_json(&ScoreOutput { score, explanation })
        }
        Command::Explain {
            job,
            resume,
            highlights,
        } => {
            let scorer = build_scorer(&config, threshold);
            let candidate = read_resume(&resume)?;
            let report = scorer.explain(&read_job(&job)?, &candidate);
            let highlights =
                highlights.then(|| highlight_evidence(&candidate.resume_text, &report.per_skill));
            print_json(&ExplainOutput { report, highlights })
        }
        Command::EmbedSkills { job, output } => {
            let raw = std::fs::read_to_string(&job)
                .with_context(|| format!("Failed to read job file {}", job.display()))?;
            let mut doc: Value = serde_json::from_str(&raw)
                .with_context(|| format!("Invalid job JSON in {}", job.display()))?;
            let provider = config.embedding_provider();
            match store_skill_embeddings(&mut doc, &provider)
                .with_context(|| format!("Invalid job JSON in {}", job.display()))?
            {
                Some(count) => info!(
                    skills = count,
                    dimension = provider.dimension(),
                    "Precomputed skill embeddings"
                ),
                None => info!("Embedding backend unavailable; job saved without skill embeddings"),
            }
            let target = output.unwrap_or(job);
            let body = serde_json::to_string_pretty(&doc)?;
            std::fs::write(&target, body)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            Ok(())
        }
        Command::Threshold { value: None } => {
            println!("{}", threshold.skill_threshold());
            Ok(())
        }
        Command::Threshold { value: Some(value) } => {
            let settings = config.file_settings();
            let stored = settings.set_skill_threshold(value).with_context(|| {
                format!("Failed to update {}", settings.path().display())
            })?;
            info!(threshold = stored, path = %settings.path().display(), "Skill threshold updated");
            println!("{stored}");
            Ok(())
        }
    }
}

fn build_scorer(config: &Config, threshold: Arc<dyn ThresholdSource>) -> Scorer {
    let provider = Arc::new(config.embedding_provider());
    info!(
        backend = provider.label(),
        threshold = threshold.skill_threshold(),
        "Scorer ready"
    );
    Scorer::new(provider, threshold)
}

fn read_job(path: &Path) -> Result<JobProfile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read job file {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid job JSON in {}", path.display()))
}

/// Resume text is taken as-is; invalid UTF-8 is replaced rather than rejected.
fn read_resume(path: &Path) -> Result<CandidateProfile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read resume file {}", path.display()))?;
    Ok(CandidateProfile {
        resume_text: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
