//! Column names of the COPA case export

pub const COMPLAINT_DATE: &str = "COMPLAINT_DATE";
pub const ASSIGNMENT: &str = "ASSIGNMENT";
pub const CURRENT_STATUS: &str = "CURRENT_STATUS";
pub const CASE_TYPE: &str = "CASE_TYPE";
pub const CURRENT_CATEGORY: &str = "CURRENT_CATEGORY";
pub const RACE_OF_COMPLAINANTS: &str = "RACE_OF_COMPLAINANTS";
pub const SEX_OF_COMPLAINANTS: &str = "SEX_OF_COMPLAINANTS";
pub const AGE_OF_COMPLAINANTS: &str = "AGE_OF_COMPLAINANTS";
pub const RACE_OF_INVOLVED_OFFICERS: &str = "RACE_OF_INVOLVED_OFFICERS";
pub const SEX_OF_INVOLVED_OFFICERS: &str = "SEX_OF_INVOLVED_OFFICERS";
pub const AGE_OF_INVOLVED_OFFICERS: &str = "AGE_OF_INVOLVED_OFFICERS";
pub const YEARS_ON_FORCE_OF_INVOLVED_OFFICERS: &str = "YEARS_ON_FORCE_OF_INVOLVED_OFFICERS";
pub const FINDING_CODE: &str = "FINDING_CODE";

/// Derived indicator column
pub const EXCESSIVE_FORCE: &str = "EXCESSIVE_FORCE";

/// Predicted label column of the combination table
pub const PREDICTION: &str = "pred";

/// Demographic columns that must all be present for a case to be kept
pub const DEMOGRAPHIC_COLUMNS: [&str; 7] = [
    RACE_OF_COMPLAINANTS,
    SEX_OF_COMPLAINANTS,
    AGE_OF_COMPLAINANTS,
    RACE_OF_INVOLVED_OFFICERS,
    SEX_OF_INVOLVED_OFFICERS,
    AGE_OF_INVOLVED_OFFICERS,
    YEARS_ON_FORCE_OF_INVOLVED_OFFICERS,
];

/// Columns in which `|` joins several complainants, officers or findings
pub const SINGLE_PARTY_COLUMNS: [&str; 3] =
    [RACE_OF_COMPLAINANTS, RACE_OF_INVOLVED_OFFICERS, FINDING_CODE];

/// Separator of multi-valued cells
pub const MULTI_VALUE_DELIMITER: char = '|';
