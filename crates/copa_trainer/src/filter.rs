//! Row filter for raw case records
//!
//! Keeps closed COPA/IPRA complaints with one complainant, one officer and
//! one finding, complete demographics, filed before the cutoff date. Stages
//! run in a fixed order, each returning a new table and logging how many
//! rows it removed. Date parsing runs first.

use chrono::{NaiveDate, NaiveDateTime};
use copa_core::{Table, TableError};
use tracing::info;

use crate::schema::{
    ASSIGNMENT, CASE_TYPE, COMPLAINT_DATE, CURRENT_STATUS, DEMOGRAPHIC_COLUMNS,
    MULTI_VALUE_DELIMITER, SINGLE_PARTY_COLUMNS,
};

/// Cases filed on or after this date are too recent to have a settled outcome
pub const CUTOFF_DATE: (i32, u32, u32) = (2020, 5, 10);

const DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
];

const DATE_FORMATS: &[&str] = &["%m/%d/%Y", "%Y-%m-%d"];

pub fn cutoff_date() -> NaiveDate {
    let (y, m, d) = CUTOFF_DATE;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

/// Parse a complaint date in any of the export's formats
pub fn parse_complaint_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}

/// Run every stage in order
pub fn drop_invalid(data: &Table) -> Result<Table, TableError> {
    let data = drop_too_recent(data)?;
    let data = drop_status_assignment(&data)?;
    let data = drop_missing(&data)?;
    let data = drop_multiples(&data)?;
    let data = complaints_only(&data)?;
    info!("Data clean - {} rows", data.len());
    Ok(data)
}

/// Keep rows filed strictly before the cutoff
///
/// An empty date is never before the cutoff; an unparseable one is an error.
pub fn drop_too_recent(data: &Table) -> Result<Table, TableError> {
    let col = data.column_index(COMPLAINT_DATE)?;
    let cutoff = cutoff_date();

    let kept = data.try_filter_rows(|row_idx, row| match row[col].as_deref() {
        None => Ok(false),
        Some(raw) => parse_complaint_date(raw)
            .map(|date| date < cutoff)
            .ok_or_else(|| TableError::MalformedValue {
                column: COMPLAINT_DATE.to_string(),
                row: row_idx,
                value: raw.to_string(),
            }),
    })?;

    info!("Dropped {} rows filed on or after {}", data.len() - kept.len(), cutoff);
    Ok(kept)
}

/// Keep closed cases not owned by BIA
pub fn drop_status_assignment(data: &Table) -> Result<Table, TableError> {
    let assignment = data.column_index(ASSIGNMENT)?;
    let status = data.column_index(CURRENT_STATUS)?;

    let kept = data.filter_rows(|row| {
        row[assignment].as_deref() != Some("BIA") && row[status].as_deref() == Some("Closed")
    });

    info!("Dropped {} rows for status and assignment", data.len() - kept.len());
    Ok(kept)
}

/// Drop rows missing any demographic field
pub fn drop_missing(data: &Table) -> Result<Table, TableError> {
    let cols = data.require_columns(&DEMOGRAPHIC_COLUMNS)?;

    let kept = data.filter_rows(|row| cols.iter().all(|&c| row[c].is_some()));

    info!("Dropped {} rows for missing values", data.len() - kept.len());
    Ok(kept)
}

/// Drop cases with several complainants, officers or findings
pub fn drop_multiples(data: &Table) -> Result<Table, TableError> {
    let cols = data.require_columns(&SINGLE_PARTY_COLUMNS)?;

    let kept = data.filter_rows(|row| {
        !cols.iter().any(|&c| {
            row[c]
                .as_deref()
                .is_some_and(|v| v.contains(MULTI_VALUE_DELIMITER))
        })
    });

    info!("Dropped {} rows for multiples", data.len() - kept.len());
    Ok(kept)
}

/// Keep complaints, dropping other case types
pub fn complaints_only(data: &Table) -> Result<Table, TableError> {
    let col = data.column_index(CASE_TYPE)?;

    let kept = data.filter_rows(|row| row[col].as_deref() == Some("Complaint"));

    info!("Dropped {} rows of non-complaints", data.len() - kept.len());
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::*;
    use proptest::prelude::*;

    const HEADERS: &[&str] = &[
        COMPLAINT_DATE,
        ASSIGNMENT,
        CURRENT_STATUS,
        CASE_TYPE,
        CURRENT_CATEGORY,
        RACE_OF_COMPLAINANTS,
        SEX_OF_COMPLAINANTS,
        AGE_OF_COMPLAINANTS,
        RACE_OF_INVOLVED_OFFICERS,
        SEX_OF_INVOLVED_OFFICERS,
        AGE_OF_INVOLVED_OFFICERS,
        YEARS_ON_FORCE_OF_INVOLVED_OFFICERS,
        FINDING_CODE,
    ];

    fn case(date: &str) -> Vec<&str> {
        vec![
            date,
            "COPA",
            "Closed",
            "Complaint",
            "Excessive Force",
            "Black",
            "Male",
            "20-29",
            "White",
            "Male",
            "30-39",
            "5-9",
            "Not Sustained",
        ]
    }

    fn table(rows: Vec<Vec<&str>>) -> Table {
        let refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        Table::from_strs(HEADERS, &refs).unwrap()
    }

    #[test]
    fn test_cutoff_is_exclusive() {
        let data = table(vec![case("05/10/2020 12:00:00 AM"), case("05/09/2020 11:59:00 PM")]);
        let kept = drop_too_recent(&data).unwrap();

        assert_eq!(kept.len(), 1);
        assert_eq!(kept.cell(0, 0), Some("05/09/2020 11:59:00 PM"));
    }

    #[test]
    fn test_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 5, 9);
        assert_eq!(parse_complaint_date("2020-05-09"), expected);
        assert_eq!(parse_complaint_date("05/09/2020"), expected);
        assert_eq!(parse_complaint_date("2020-05-09 13:45:00"), expected);
        assert_eq!(parse_complaint_date("05/09/2020 01:45:00 PM"), expected);
        assert_eq!(parse_complaint_date("2020-05-09T13:45:00"), expected);
        assert_eq!(parse_complaint_date("2020-05-09T13:45:00.000"), expected);
        assert_eq!(parse_complaint_date("2020-05-09 13:45:00.250"), expected);
        assert_eq!(parse_complaint_date("yesterday"), None);
    }

    #[test]
    fn test_fractional_iso_dates_kept() {
        let data = table(vec![
            case("2019-03-01T10:00:00.000"),
            case("2020-05-10T00:00:00.000"),
        ]);
        let kept = drop_too_recent(&data).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept.cell(0, 0), Some("2019-03-01T10:00:00.000"));
    }

    #[test]
    fn test_missing_and_malformed_dates() {
        let data = table(vec![case(""), case("2019-01-01")]);
        assert_eq!(drop_too_recent(&data).unwrap().len(), 1);

        let data = table(vec![case("not a date")]);
        let err = drop_too_recent(&data).unwrap_err();
        assert!(matches!(err, TableError::MalformedValue { row: 0, .. }));
    }

    #[test]
    fn test_missing_columns_named() {
        let empty = Table::default();
        let cases: [(fn(&Table) -> Result<Table, TableError>, &str); 5] = [
            (drop_too_recent, COMPLAINT_DATE),
            (drop_status_assignment, ASSIGNMENT),
            (drop_missing, RACE_OF_COMPLAINANTS),
            (drop_multiples, RACE_OF_COMPLAINANTS),
            (complaints_only, CASE_TYPE),
        ];

        for (stage, column) in cases {
            let err = stage(&empty).unwrap_err();
            assert!(err.to_string().contains(column), "{err} should name {column}");
        }
    }

    #[test]
    fn test_status_and_assignment() {
        let mut bia = case("2019-01-01");
        bia[1] = "BIA";
        let mut open = case("2019-01-01");
        open[2] = "Open";
        let data = table(vec![bia, open, case("2019-01-01")]);

        assert_eq!(drop_status_assignment(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_demographics() {
        let mut no_age = case("2019-01-01");
        no_age[11] = "";
        let data = table(vec![no_age, case("2019-01-01")]);

        assert_eq!(drop_missing(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_complaints_only() {
        let mut notification = case("2019-01-01");
        notification[3] = "Notification";
        let data = table(vec![notification, case("2019-01-01")]);

        assert_eq!(complaints_only(&data).unwrap().len(), 1);
    }

    #[test]
    fn test_drop_invalid_leaves_source_untouched() {
        let data = table(vec![case("05/10/2020"), case("05/09/2020")]);
        let cleaned = drop_invalid(&data).unwrap();

        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned.cell(0, 0), Some("05/09/2020"));
        assert_eq!(data.len(), 2);
    }

    proptest! {
        #[test]
        fn prop_cutoff_keeps_exactly_earlier_dates(days in proptest::collection::vec(-400i64..400, 1..40)) {
            let cutoff = cutoff_date();
            let dates: Vec<String> = days
                .iter()
                .map(|&d| (cutoff + chrono::Duration::days(d)).format("%Y-%m-%d").to_string())
                .collect();
            let data = table(dates.iter().map(|d| case(d)).collect());

            let kept = drop_too_recent(&data).unwrap();
            let expected = days.iter().filter(|&&d| d < 0).count();
            prop_assert_eq!(kept.len(), expected);
        }

        #[test]
        fn prop_multiples_dropped_iff_delimiter(
            flags in proptest::collection::vec((any::<bool>(), any::<bool>(), any::<bool>()), 1..30)
        ) {
            let rows: Vec<Vec<&str>> = flags
                .iter()
                .map(|&(c, o, f)| {
                    let mut row = case("2019-01-01");
                    if c { row[5] = "Black | White"; }
                    if o { row[8] = "White|Hispanic"; }
                    if f { row[12] = "Sustained|Not Sustained"; }
                    row
                })
                .collect();
            let data = table(rows);

            let kept = drop_multiples(&data).unwrap();
            let expected = flags.iter().filter(|&&(c, o, f)| !(c || o || f)).count();
            prop_assert_eq!(kept.len(), expected);
        }
    }
}
