//! Pipeline driver
//!
//! Runs the clean stage and the model stage as configured. Every stage
//! returns a `Result`; the first error is logged and ends the run.

use copa_core::{ClassifierModel, PipelineConfig, Table};
use std::path::Path;
use tracing::{error, info};

use crate::combinations::write_combinations;
use crate::dataset::train_test_split;
use crate::encoder::OneHotEncoder;
use crate::errors::PipelineError;
use crate::evaluate::{EvaluationReport, Evaluator, ReportPaths};
use crate::features::make_excessive_force;
use crate::filter::drop_invalid;
use crate::trainer::{GbdtTrainer, TrainingParams};

/// What a model stage produced
#[derive(Debug)]
pub struct ModelOutcome {
    pub model: ClassifierModel,
    pub encoder: OneHotEncoder,
    pub model_hash: String,
    pub evaluation: EvaluationReport,
    /// Rows written to the combination table, when it was built
    pub combinations: Option<usize>,
}

/// What a pipeline run produced
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Rows in the cleaned table, when the clean stage ran
    pub cleaned_rows: Option<usize>,
    pub model: Option<ModelOutcome>,
}

/// Filter and featurize the raw records and write the cleaned table
pub fn clean_data(raw_path: &Path, clean_path: &Path) -> Result<Table, PipelineError> {
    info!("Reading raw data from {}", raw_path.display());
    let raw = Table::from_csv_path(raw_path)?;
    info!("Raw data loaded: {} rows", raw.len());

    let filtered = drop_invalid(&raw)?;
    let clean = make_excessive_force(&filtered)?;

    ensure_parent(clean_path)?;
    clean.write_csv_path(clean_path)?;
    info!(
        "Cleaned data written to {}: {} rows",
        clean_path.display(),
        clean.len()
    );
    Ok(clean)
}

/// Split, encode, fit, persist, evaluate and optionally enumerate
pub fn train_model(config: &PipelineConfig) -> Result<ModelOutcome, PipelineError> {
    let paths = &config.paths;
    let settings = &config.model;

    info!("Reading cleaned data from {}", paths.clean_data.display());
    let data = Table::from_csv_path(&paths.clean_data)?;

    let split = train_test_split(
        &data,
        &settings.features,
        &settings.target,
        settings.split_seed,
        settings.test_size,
    )?;

    let encoder = OneHotEncoder::fit(&split.x_train)?;
    let x_train = encoder.transform(&split.x_train)?;
    let x_test = encoder.transform(&split.x_test)?;
    info!("Data encoded: {} indicator columns", encoder.width());

    let params = TrainingParams {
        num_rounds: settings.num_rounds,
        learning_rate: settings.learning_rate,
        max_depth: settings.max_depth,
        min_samples_leaf: settings.min_samples_leaf,
        min_samples_split: settings.min_samples_split,
        seed: settings.fit_seed,
    };
    let model = GbdtTrainer::new(params).train(&x_train, &split.y_train, encoder.feature_names())?;

    ensure_parent(&paths.model)?;
    let model_hash = model.save(&paths.model)?;
    info!("Model saved to {} (hash {})", paths.model.display(), model_hash);

    let report_paths = ReportPaths {
        overall_accuracy: paths.overall_accuracy.clone(),
        class_accuracy: paths.class_accuracy.clone(),
        prevalence: paths.prevalence.clone(),
        feature_importance: paths.feature_importance.clone(),
    };
    for path in [
        &report_paths.overall_accuracy,
        &report_paths.class_accuracy,
        &report_paths.prevalence,
        &report_paths.feature_importance,
    ] {
        ensure_parent(path)?;
    }
    let evaluation = Evaluator::new(&model, &encoder).run(&x_test, &split.y_test, &report_paths);

    let combinations = if config.flags.app_data {
        ensure_parent(&paths.app_data)?;
        Some(write_combinations(&split.x_train, &model, &encoder, &paths.app_data)?)
    } else {
        None
    };

    Ok(ModelOutcome {
        model,
        encoder,
        model_hash,
        evaluation,
        combinations,
    })
}

/// Run every enabled stage in order, stopping at the first failure
pub fn run(config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let mut summary = RunSummary::default();

    if config.flags.clean {
        let clean = clean_data(&config.paths.raw_data, &config.paths.clean_data).map_err(|e| {
            error!("Clean stage failed: {}", e);
            e
        })?;
        summary.cleaned_rows = Some(clean.len());
    }

    if config.flags.model {
        let outcome = train_model(config).map_err(|e| {
            error!("Model stage failed: {}", e);
            e
        })?;
        summary.model = Some(outcome);
    }

    info!("Pipeline finished");
    Ok(summary)
}

fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use copa_core::TableError;

    #[test]
    fn test_missing_raw_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = clean_data(&dir.path().join("absent.csv"), &dir.path().join("clean.csv"));
        assert!(matches!(result, Err(PipelineError::Table(_))));
    }

    #[test]
    fn test_missing_column_halts_run() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.csv");
        std::fs::write(&raw, "COMPLAINT_DATE,ASSIGNMENT\n2019-01-01,COPA\n").unwrap();

        let mut config = PipelineConfig::default();
        config.paths.raw_data = raw;
        config.paths.clean_data = dir.path().join("clean.csv");

        let err = run(&config).unwrap_err();
        assert!(matches!(err, PipelineError::Table(TableError::MissingColumn(_))));
        assert!(!config.paths.clean_data.exists());
    }

    #[test]
    fn test_disabled_stages_do_nothing() {
        let mut config = PipelineConfig::default();
        config.flags.clean = false;
        config.flags.model = false;

        let summary = run(&config).unwrap();
        assert!(summary.cleaned_rows.is_none());
        assert!(summary.model.is_none());
    }
}
