use std::path::PathBuf;

use anyhow::ensure;
use chrono::{DateTime, Utc};
use parley_learning::{
    evaluation::{self, TrialReport},
    trainer::Trainer,
};
use serde::Serialize;
use tracing::info;

use crate::util::{Output, seeded_rng};

#[derive(Debug, Clone, clap::Args)]
pub(crate) struct EvaluateLearnerArg {
    /// Smallest number of issues of a generated preference structure
    #[arg(long, default_value_t = 2)]
    min_issues: usize,
    /// Largest number of issues of a generated preference structure
    #[arg(long, default_value_t = 9)]
    max_issues: usize,
    /// Training examples per trial
    #[arg(long, default_value_t = 500)]
    train: usize,
    /// Test examples per trial
    #[arg(long, default_value_t = 1000)]
    test: usize,
    #[arg(long, default_value_t = 10)]
    trials: usize,
    #[arg(long, default_value_t = Trainer::default().learning_rate)]
    learning_rate: f64,
    #[arg(long, default_value_t = Trainer::default().passes)]
    passes: usize,
    #[arg(long)]
    seed: Option<u64>,
    /// Output file path
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
struct EvaluationReport {
    evaluated_at: DateTime<Utc>,
    seed: u64,
    learning_rate: f64,
    passes: usize,
    train_size: usize,
    test_size: usize,
    mean_accuracy: f64,
    min_accuracy: f64,
    max_accuracy: f64,
    trials: Vec<TrialReport>,
}

pub(crate) fn run(arg: &EvaluateLearnerArg) -> anyhow::Result<()> {
    let EvaluateLearnerArg {
        min_issues,
        max_issues,
        train,
        test,
        trials,
        learning_rate,
        passes,
        seed,
        output,
    } = arg;
    ensure!(
        *min_issues > 0 && min_issues <= max_issues,
        "issue range {min_issues}..={max_issues} is empty"
    );
    ensure!(*trials > 0, "at least one trial is required");

    let (seed, mut rng) = seeded_rng(*seed);
    let trainer = Trainer {
        learning_rate: *learning_rate,
        passes: *passes,
    };

    let issues = *min_issues..=*max_issues;
    let mut reports = Vec::with_capacity(*trials);
    for trial in 0..*trials {
        let report = evaluation::run_trial(&mut rng, &trainer, issues.clone(), *train, *test)?;
        info!(
            trial,
            issues = report.issues,
            accuracy = report.accuracy,
            mean_abs_error = report.mean_abs_error.unwrap_or_default(),
            "finished trial"
        );
        reports.push(report);
    }

    let accuracies = reports.iter().map(|r| r.accuracy);
    #[expect(clippy::cast_precision_loss)]
    let mean_accuracy = accuracies.clone().sum::<f64>() / reports.len() as f64;
    let report = EvaluationReport {
        evaluated_at: Utc::now(),
        seed,
        learning_rate: *learning_rate,
        passes: *passes,
        train_size: *train,
        test_size: *test,
        mean_accuracy,
        min_accuracy: accuracies.clone().fold(f64::INFINITY, f64::min),
        max_accuracy: accuracies.fold(f64::NEG_INFINITY, f64::max),
        trials: reports,
    };
    info!(mean_accuracy, "evaluation finished");

    Output::save_json(&report, output.clone())?;
    Ok(())
}
