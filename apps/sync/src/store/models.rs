//! Row models for the two tracker sheets.
//!
//! Every cell is an explicit `Option`; the empty string only exists at the
//! two serialization boundaries (the actuator wire projection and the
//! empty-cell write-back in `workbook.rs`).

use chrono::NaiveDateTime;

pub const TRACKER_SHEET: &str = "Job Search Tracker";
pub const NOTES_SHEET: &str = "Job Search Notes";

/// Column order of the tracker sheet. Also the write-back order.
pub const TRACKER_COLUMNS: [&str; 16] = [
    "Hbtn_Job_ID",
    "Job_Position",
    "Company",
    "Work_Type",
    "Employment_Options",
    "Min_Salary",
    "Max_Salary",
    "Currency",
    "Frequency",
    "Location",
    "Status",
    "Excitement",
    "Date_Saved",
    "Last_Updated",
    "Last_Uploaded",
    "Delete",
];

pub const NOTES_COLUMNS: [&str; 3] = ["Hbtn_Job_ID", "Note", "Uploaded"];

const CELL_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One tracked application — a single row of the "Job Search Tracker" sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobRecord {
    /// Remote resource id, assigned exactly once after a successful create.
    pub remote_id: Option<i64>,
    pub position: Option<String>,
    pub company: Option<String>,
    pub work_type: Option<String>,
    pub employment_options: Option<String>,
    pub min_salary: Option<f64>,
    pub max_salary: Option<f64>,
    pub currency: Option<String>,
    pub frequency: Option<String>,
    pub location: Option<String>,
    pub status: Option<String>,
    pub excitement: Option<i64>,
    pub date_saved: Option<NaiveDateTime>,
    pub last_updated: Option<NaiveDateTime>,
    pub last_uploaded: Option<NaiveDateTime>,
    /// "Yes" marks the record for remote deletion. Terminal once set.
    pub delete: Option<String>,
}

impl JobRecord {
    pub fn delete_requested(&self) -> bool {
        matches!(self.delete.as_deref(), Some("Yes"))
    }

    /// A record is stale when its local edit is newer than its last sync,
    /// or when it has an identity but no recorded sync at all.
    pub fn is_stale(&self) -> bool {
        match (self.last_updated, self.last_uploaded) {
            (Some(updated), Some(uploaded)) => updated > uploaded,
            (Some(_), None) => true,
            _ => false,
        }
    }

    /// Cell values in `TRACKER_COLUMNS` order, `None` written as empty.
    pub fn to_cells(&self) -> [String; 16] {
        [
            opt_int_cell(self.remote_id),
            opt_text_cell(&self.position),
            opt_text_cell(&self.company),
            opt_text_cell(&self.work_type),
            opt_text_cell(&self.employment_options),
            opt_float_cell(self.min_salary),
            opt_float_cell(self.max_salary),
            opt_text_cell(&self.currency),
            opt_text_cell(&self.frequency),
            opt_text_cell(&self.location),
            opt_text_cell(&self.status),
            opt_int_cell(self.excitement),
            opt_datetime_cell(self.date_saved),
            opt_datetime_cell(self.last_updated),
            opt_datetime_cell(self.last_uploaded),
            opt_text_cell(&self.delete),
        ]
    }
}

/// One annotation — a single row of the "Job Search Notes" sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteRecord {
    /// Matches the parent job's `remote_id`. Absent until the parent exists
    /// remotely (or the sheet author has not filled it in yet).
    pub job_id: Option<i64>,
    pub text: Option<String>,
    /// "Yes" once uploaded; `None` means pending.
    pub uploaded: Option<String>,
}

impl NoteRecord {
    pub fn is_pending(&self) -> bool {
        self.uploaded.is_none()
    }

    pub fn to_cells(&self) -> [String; 3] {
        [
            opt_int_cell(self.job_id),
            opt_text_cell(&self.text),
            opt_text_cell(&self.uploaded),
        ]
    }
}

fn opt_text_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn opt_int_cell(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_float_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn opt_datetime_cell(value: Option<NaiveDateTime>) -> String {
    value
        .map(|v| v.format(CELL_DATETIME_FORMAT).to_string())
        .unwrap_or_default()
}

/// Parses the datetime formats a cell can carry after round-tripping
/// through the write-back path ("2024-02-01 09:30:00" or a bare date).
pub fn parse_cell_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, CELL_DATETIME_FORMAT) {
        return Some(dt);
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
