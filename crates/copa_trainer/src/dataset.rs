//! Train/test split of the cleaned case table
//!
//! Rows are shuffled with a seeded LCG, so a seed always yields the same
//! partition.

use copa_core::Table;
use tracing::info;

use crate::deterministic::LcgRng;
use crate::errors::TrainerError;

/// Feature tables and labels for both partitions
#[derive(Clone, Debug)]
pub struct SplitData {
    pub x_train: Table,
    pub x_test: Table,
    pub y_train: Vec<String>,
    pub y_test: Vec<String>,
}

/// Number of held-out rows, rounded up
pub fn test_count(rows: usize, test_size: f64) -> usize {
    (rows as f64 * test_size).ceil() as usize
}

/// Select `features` and `target` and hold out `test_size` of the rows
pub fn train_test_split<S: AsRef<str>>(
    data: &Table,
    features: &[S],
    target: &str,
    seed: u64,
    test_size: f64,
) -> Result<SplitData, TrainerError> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(TrainerError::Dataset(format!(
            "test_size must be in (0, 1), got {test_size}"
        )));
    }

    let x = data.select(features)?;
    let labels: Vec<String> = data
        .column(target)?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            label
                .map(str::to_string)
                .ok_or_else(|| TrainerError::Dataset(format!("row {row}: missing {target}")))
        })
        .collect::<Result<_, _>>()?;

    let n = data.len();
    let n_test = test_count(n, test_size);
    if n < 2 || n_test == 0 || n_test >= n {
        return Err(TrainerError::Dataset(format!(
            "cannot split {n} rows with test_size {test_size}"
        )));
    }

    let order = LcgRng::new(seed).permutation(n);
    let (test_idx, train_idx) = order.split_at(n_test);

    let split = SplitData {
        x_train: x.take(train_idx),
        x_test: x.take(test_idx),
        y_train: train_idx.iter().map(|&i| labels[i].clone()).collect(),
        y_test: test_idx.iter().map(|&i| labels[i].clone()).collect(),
    };

    info!(
        "Data split into train/test: {} train, {} test",
        split.y_train.len(),
        split.y_test.len()
    );
    Ok(split)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cases(n: usize) -> Table {
        let rows: Vec<Vec<Option<String>>> = (0..n)
            .map(|i| {
                vec![
                    Some(format!("a{}", i % 3)),
                    Some(format!("b{}", i % 2)),
                    Some(if i % 2 == 0 { "Sustained" } else { "Unfounded" }.to_string()),
                ]
            })
            .collect();
        Table::new(vec!["A".into(), "B".into(), "FINDING_CODE".into()], rows).unwrap()
    }

    #[test]
    fn test_split_sizes_and_columns() {
        let split = train_test_split(&cases(10), &["A", "B"], "FINDING_CODE", 4, 0.25).unwrap();

        assert_eq!(split.x_test.len(), 3);
        assert_eq!(split.x_train.len(), 7);
        assert_eq!(split.y_train.len(), 7);
        assert_eq!(split.x_train.width(), 2);
    }

    #[test]
    fn test_split_is_seeded() {
        let data = cases(30);
        let a = train_test_split(&data, &["A"], "FINDING_CODE", 4, 0.5).unwrap();
        let b = train_test_split(&data, &["A"], "FINDING_CODE", 4, 0.5).unwrap();

        assert_eq!(a.x_train, b.x_train);
        assert_eq!(a.y_test, b.y_test);
    }

    #[test]
    fn test_split_rejects_bad_input() {
        let data = cases(10);
        assert!(train_test_split(&data, &["ffff"], "FINDING_CODE", 4, 0.5).is_err());
        assert!(train_test_split(&data, &["A"], "FINDING_CODE", 4, 1.5).is_err());
        assert!(train_test_split(&cases(1), &["A"], "FINDING_CODE", 4, 0.5).is_err());
    }
}
