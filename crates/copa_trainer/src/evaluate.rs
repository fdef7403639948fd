//! Held-out evaluation
//!
//! Four independent metrics: overall accuracy, class prevalence, accuracy
//! by true class and feature importance. Each one is computed and written
//! on its own; a failing metric is logged and recorded in the report while
//! the others still run.

use copa_core::ClassifierModel;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::encoder::OneHotEncoder;
use crate::errors::EvalError;

/// Share of one true label among held-out rows
#[derive(Debug, Clone, PartialEq)]
pub struct ClassPrevalence {
    pub label: String,
    pub count: usize,
    /// Fraction of all held-out rows, 0..=1
    pub fraction: f64,
}

/// Share of one true label's rows predicted correctly or incorrectly
#[derive(Debug, Clone, PartialEq)]
pub struct ClassAccuracy {
    pub label: String,
    pub correct: bool,
    /// Percent of this label's rows, 0..=100
    pub percent: f64,
}

/// The metrics an evaluation produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    OverallAccuracy,
    ClassPrevalence,
    ClassAccuracy,
    FeatureImportance,
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::OverallAccuracy => "overall accuracy",
            Metric::ClassPrevalence => "class prevalence",
            Metric::ClassAccuracy => "class accuracy",
            Metric::FeatureImportance => "feature importance",
        };
        f.write_str(name)
    }
}

/// Where each report is written
#[derive(Debug, Clone)]
pub struct ReportPaths {
    pub overall_accuracy: PathBuf,
    pub class_accuracy: PathBuf,
    pub prevalence: PathBuf,
    pub feature_importance: PathBuf,
}

/// Outcome of an evaluation run
#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub overall_accuracy: Option<f64>,
    pub prevalence: Option<Vec<ClassPrevalence>>,
    pub class_accuracy: Option<Vec<ClassAccuracy>>,
    pub feature_importance: Option<Vec<(String, f64)>>,
    pub failures: Vec<(Metric, String)>,
}

impl EvaluationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fraction of predictions equal to the truth
pub fn overall_accuracy(truth: &[String], predicted: &[&str]) -> Result<f64, EvalError> {
    check_lengths(truth, predicted)?;
    let correct = truth
        .iter()
        .zip(predicted)
        .filter(|(t, p)| t.as_str() == **p)
        .count();
    Ok(correct as f64 / truth.len() as f64)
}

/// Count and fraction of each true label, sorted by label
pub fn class_prevalence(truth: &[String]) -> Result<Vec<ClassPrevalence>, EvalError> {
    if truth.is_empty() {
        return Err(EvalError::Empty);
    }

    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for label in truth {
        *counts.entry(label.as_str()).or_default() += 1;
    }

    let total = truth.len() as f64;
    Ok(counts
        .into_iter()
        .map(|(label, count)| ClassPrevalence {
            label: label.to_string(),
            count,
            fraction: count as f64 / total,
        })
        .collect())
}

/// Percent correct and incorrect within each true label
///
/// Only outcomes that occur are listed; a label's rows sum to 100.
pub fn class_accuracy(truth: &[String], predicted: &[&str]) -> Result<Vec<ClassAccuracy>, EvalError> {
    check_lengths(truth, predicted)?;

    let mut groups: BTreeMap<(&str, bool), usize> = BTreeMap::new();
    let mut totals: BTreeMap<&str, usize> = BTreeMap::new();
    for (t, p) in truth.iter().zip(predicted) {
        *groups.entry((t.as_str(), t.as_str() == *p)).or_default() += 1;
        *totals.entry(t.as_str()).or_default() += 1;
    }

    Ok(groups
        .into_iter()
        .map(|((label, correct), count)| ClassAccuracy {
            label: label.to_string(),
            correct,
            percent: 100.0 * count as f64 / totals[label] as f64,
        })
        .collect())
}

/// Model importances by indicator name, highest first
pub fn feature_importance(
    model: &ClassifierModel,
    encoder: &OneHotEncoder,
) -> Result<Vec<(String, f64)>, EvalError> {
    let names = encoder.feature_names();
    if names.len() != model.num_features() {
        return Err(EvalError::FeatureMismatch {
            model: model.num_features(),
            encoder: names.len(),
        });
    }

    let mut ranked: Vec<(String, f64)> = names
        .into_iter()
        .zip(model.feature_importances())
        .map(|(name, (_, score))| (name, score))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(ranked)
}

fn check_lengths(truth: &[String], predicted: &[&str]) -> Result<(), EvalError> {
    if truth.is_empty() {
        return Err(EvalError::Empty);
    }
    if truth.len() != predicted.len() {
        return Err(EvalError::LengthMismatch {
            truth: truth.len(),
            predicted: predicted.len(),
        });
    }
    Ok(())
}

pub fn write_overall_accuracy(path: &Path, accuracy: f64) -> Result<(), EvalError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write!(writer, "Accuracy:{accuracy}")?;
    writer.flush()?;
    Ok(())
}

pub fn write_prevalence(path: &Path, rows: &[ClassPrevalence]) -> Result<(), EvalError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["True", "Count", "Percent of total"])?;
    for row in rows {
        writer.write_record([
            row.label.clone(),
            row.count.to_string(),
            row.fraction.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_class_accuracy(path: &Path, rows: &[ClassAccuracy]) -> Result<(), EvalError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["True", "Correct", "Percent"])?;
    for row in rows {
        let correct = if row.correct { "True" } else { "False" };
        writer.write_record([row.label.as_str(), correct, row.percent.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_feature_importance(path: &Path, rows: &[(String, f64)]) -> Result<(), EvalError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Feature", "Importance"])?;
    for (name, score) in rows {
        writer.write_record([name.as_str(), score.to_string().as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Evaluates a fitted model on held-out data
pub struct Evaluator<'a> {
    model: &'a ClassifierModel,
    encoder: &'a OneHotEncoder,
}

impl<'a> Evaluator<'a> {
    pub fn new(model: &'a ClassifierModel, encoder: &'a OneHotEncoder) -> Self {
        Self { model, encoder }
    }

    /// Compute and write every metric, isolating failures per metric
    pub fn run(&self, x_test: &[Vec<i64>], y_test: &[String], paths: &ReportPaths) -> EvaluationReport {
        let mut report = EvaluationReport::default();

        let predictions = self
            .model
            .predict_batch(x_test)
            .map_err(EvalError::from);

        let outcome = predictions.as_ref().map_err(|e| e.to_string()).and_then(|predicted| {
            overall_accuracy(y_test, predicted)
                .and_then(|acc| write_overall_accuracy(&paths.overall_accuracy, acc).map(|_| acc))
                .map_err(|e| e.to_string())
        });
        report.overall_accuracy = record(&mut report.failures, Metric::OverallAccuracy, outcome);
        if let Some(acc) = report.overall_accuracy {
            info!("Overall accuracy {:.4} saved to {}", acc, paths.overall_accuracy.display());
        }

        let outcome = class_prevalence(y_test)
            .and_then(|rows| write_prevalence(&paths.prevalence, &rows).map(|_| rows))
            .map_err(|e| e.to_string());
        report.prevalence = record(&mut report.failures, Metric::ClassPrevalence, outcome);
        if report.prevalence.is_some() {
            info!("Group prevalence saved to {}", paths.prevalence.display());
        }

        let outcome = predictions.as_ref().map_err(|e| e.to_string()).and_then(|predicted| {
            class_accuracy(y_test, predicted)
                .and_then(|rows| write_class_accuracy(&paths.class_accuracy, &rows).map(|_| rows))
                .map_err(|e| e.to_string())
        });
        report.class_accuracy = record(&mut report.failures, Metric::ClassAccuracy, outcome);
        if report.class_accuracy.is_some() {
            info!("Accuracy by group saved to {}", paths.class_accuracy.display());
        }

        let outcome = feature_importance(self.model, self.encoder)
            .and_then(|rows| write_feature_importance(&paths.feature_importance, &rows).map(|_| rows))
            .map_err(|e| e.to_string());
        report.feature_importance = record(&mut report.failures, Metric::FeatureImportance, outcome);
        if report.feature_importance.is_some() {
            info!("Variable importance saved to {}", paths.feature_importance.display());
        }

        report
    }
}

fn record<T>(failures: &mut Vec<(Metric, String)>, metric: Metric, outcome: Result<T, String>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(reason) => {
            error!("Problem computing {}: {}", metric, reason);
            failures.push((metric, reason));
            None
        }
    }
}
