//! Derived case features

use copa_core::{Table, TableError};
use tracing::{error, info};

use crate::schema::{CURRENT_CATEGORY, EXCESSIVE_FORCE};

const EXCESSIVE_FORCE_CATEGORY: &str = "Excessive Force";

/// Render a flag the way the cleaned export spells booleans
pub fn bool_cell(value: bool) -> Option<String> {
    Some(if value { "True" } else { "False" }.to_string())
}

/// Append `EXCESSIVE_FORCE`, true exactly when the category is "Excessive Force"
pub fn make_excessive_force(data: &Table) -> Result<Table, TableError> {
    let category = data.column(CURRENT_CATEGORY).inspect_err(|e| error!("{e}"))?;

    let flags = category
        .into_iter()
        .map(|value| bool_cell(value == Some(EXCESSIVE_FORCE_CATEGORY)))
        .collect();

    let data = data.with_column(EXCESSIVE_FORCE, flags)?;
    info!("Excessive force column created");
    Ok(data)
}
