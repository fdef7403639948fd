//! Exhaustive feature combinations
//!
//! Builds the Cartesian product of every feature column's distinct values,
//! whether or not a combination occurred in training, and scores each row
//! with the fitted model. The result feeds the application database.

use copa_core::{ClassifierModel, Row, Table};
use tracing::{debug, info, warn};

use crate::encoder::OneHotEncoder;
use crate::errors::PipelineError;
use crate::schema::PREDICTION;

/// Number of rows the product of `data`'s distinct column values would have
pub fn combination_count(data: &Table) -> Result<usize, PipelineError> {
    let mut total = 1usize;
    for name in data.headers() {
        let distinct = data.distinct(name)?.len();
        total = total.checked_mul(distinct).ok_or_else(|| {
            PipelineError::Combinations(format!("combination count overflows at column {name}"))
        })?;
    }
    Ok(total)
}

/// One row per combination of per-column distinct values
///
/// Values keep their first-seen order; the first column varies slowest.
pub fn unique_combinations(data: &Table) -> Result<Table, PipelineError> {
    let mut values: Vec<Vec<Option<String>>> = Vec::with_capacity(data.width());
    for name in data.headers() {
        let distinct = data.distinct(name)?;
        debug!("Processing {} ({} values)", name, distinct.len());
        values.push(distinct);
    }

    let total = combination_count(data)?;
    let mut rows: Vec<Row> = Vec::with_capacity(total);

    if total > 0 && !values.is_empty() {
        // Odometer over value positions, last column fastest
        let mut cursor = vec![0usize; values.len()];
        loop {
            rows.push(
                cursor
                    .iter()
                    .zip(&values)
                    .map(|(&pos, column)| column[pos].clone())
                    .collect(),
            );

            let mut col = values.len();
            loop {
                if col == 0 {
                    break;
                }
                col -= 1;
                cursor[col] += 1;
                if cursor[col] < values[col].len() {
                    break;
                }
                cursor[col] = 0;
            }
            if cursor.iter().all(|&pos| pos == 0) {
                break;
            }
        }
    }

    let table = Table::new(data.headers().to_vec(), rows)?;
    info!("Unique features dataset created: {} rows", table.len());
    Ok(table)
}

/// Every combination of `x_train`'s values with its predicted label in `pred`
pub fn score_combinations(
    x_train: &Table,
    model: &ClassifierModel,
    encoder: &OneHotEncoder,
) -> Result<Table, PipelineError> {
    let combos = unique_combinations(x_train)?;

    debug!("Encoding unique data");
    let encoded = encoder.transform(&combos)?;

    debug!("Generating predictions");
    let predictions = model
        .predict_batch(&encoded)?
        .into_iter()
        .map(|label| Some(label.to_string()))
        .collect();

    let scored = combos.with_column(PREDICTION, predictions)?;
    info!("Predictions generated");
    Ok(scored)
}

/// Score every combination and write the table to `path`
pub fn write_combinations(
    x_train: &Table,
    model: &ClassifierModel,
    encoder: &OneHotEncoder,
    path: &std::path::Path,
) -> Result<usize, PipelineError> {
    let scored = score_combinations(x_train, model, encoder)?;

    warn!(
        "Writing {} unique-combination rows to file - this step can take several minutes",
        scored.len()
    );
    scored.write_csv_path(path)?;
    info!("Data written to file in {}", path.display());
    Ok(scored.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use copa_core::{Node, Tree, SCALE};
    use std::collections::HashSet;

    fn two_by_three() -> Table {
        Table::from_strs(
            &["SEX", "AGE"],
            &[
                &["Male", "20-29"],
                &["Female", "30-39"],
                &["Male", "40-49"],
                &["Male", "20-29"],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_product_row_count() {
        let combos = unique_combinations(&two_by_three()).unwrap();

        assert_eq!(combos.len(), 6);
        assert_eq!(combination_count(&two_by_three()).unwrap(), 6);

        let distinct: HashSet<&Row> = combos.rows().iter().collect();
        assert_eq!(distinct.len(), 6);

        assert_eq!(combos.cell(0, 0), Some("Male"));
        assert_eq!(combos.cell(0, 1), Some("20-29"));
        assert_eq!(combos.cell(1, 1), Some("30-39"));
        assert_eq!(combos.cell(3, 0), Some("Female"));
    }

    #[test]
    fn test_single_column() {
        let data = two_by_three().select(&["AGE"]).unwrap();
        let combos = unique_combinations(&data).unwrap();

        assert_eq!(combos.len(), 3);
        assert_eq!(combos.width(), 1);
    }

    #[test]
    fn test_empty_table_has_no_combinations() {
        let data = Table::from_strs(&["SEX"], &[]).unwrap();
        assert_eq!(unique_combinations(&data).unwrap().len(), 0);
    }

    #[test]
    fn test_scores_appended() {
        let data = two_by_three();
        let encoder = OneHotEncoder::fit(&data).unwrap();
        let names = encoder.feature_names();
        let female = names.iter().position(|n| n == "SEX_Female").unwrap();

        let tree = Tree::new(
            vec![
                Node::internal(0, female as i32, 0, 1, 2),
                Node::leaf(1, -SCALE),
                Node::leaf(2, SCALE),
            ],
            SCALE,
            1,
        );
        let model = ClassifierModel::new(
            vec!["Not Sustained".into(), "Sustained".into()],
            names.clone(),
            vec![0, 0],
            vec![tree],
            vec![0; names.len()],
            14,
        );

        let scored = score_combinations(&data, &model, &encoder).unwrap();
        assert_eq!(scored.headers().last().map(String::as_str), Some(PREDICTION));

        for row in scored.rows() {
            let expected = if row[0].as_deref() == Some("Female") {
                "Sustained"
            } else {
                "Not Sustained"
            };
            assert_eq!(row[2].as_deref(), Some(expected));
        }
    }
}
