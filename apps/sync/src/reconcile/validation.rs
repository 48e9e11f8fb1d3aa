#![allow(dead_code)]

//! Mandatory-field gate applied before any remote create or update.

use crate::store::JobRecord;

/// Columns the remote form cannot be submitted without. Checked for
/// presence only — an empty-but-present value is the loader's concern.
pub const MANDATORY_FIELDS: [&str; 5] = [
    "Date_Saved",
    "Employment_Options",
    "Work_Type",
    "Company",
    "Location",
];

/// Result of validating one record: the ordered list of missing column
/// names. Empty means the record may be submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingFields(Vec<&'static str>);

impl MissingFields {
    pub fn is_valid(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> &[&'static str] {
        &self.0
    }

    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

/// Checks the mandatory-field set. Pure; never invoked for deletes.
pub fn validate(record: &JobRecord) -> MissingFields {
    let mut missing = Vec::new();
    if record.date_saved.is_none() {
        missing.push("Date_Saved");
    }
    if record.employment_options.is_none() {
        missing.push("Employment_Options");
    }
    if record.work_type.is_none() {
        missing.push("Work_Type");
    }
    if record.company.is_none() {
        missing.push("Company");
    }
    if record.location.is_none() {
        missing.push("Location");
    }
    MissingFields(missing)
}
