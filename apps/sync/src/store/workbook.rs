//! Workbook persistence — loads the two tracker sheets into a [`JobStore`]
//! and writes the mutated store back into the same file.
//!
//! Reading goes through `calamine` (typed cells); writing opens the
//! existing workbook with `umya-spreadsheet` and overwrites the data
//! region starting at A2, so formatting and any other sheets survive.
//! Null cells are written as empty strings rather than left untouched,
//! so stale values from a shrinking record do not linger.

use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};
use chrono::NaiveDateTime;
use tracing::info;

use crate::errors::SyncError;
use crate::store::models::{
    parse_cell_datetime, JobRecord, NoteRecord, NOTES_COLUMNS, NOTES_SHEET, TRACKER_COLUMNS,
    TRACKER_SHEET,
};
use crate::store::JobStore;

/// Loads both sheets. Any structural mismatch (missing sheet, wrong
/// header row, unparsable file) fails before reconciliation starts.
pub fn load(path: &Path) -> Result<JobStore, SyncError> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| SyncError::DataFormat(format!("cannot open {}: {e}", path.display())))?;

    let tracker = workbook
        .worksheet_range(TRACKER_SHEET)
        .map_err(|_| SyncError::DataFormat(format!("missing sheet '{TRACKER_SHEET}'")))?;
    check_header(tracker.rows().next(), &TRACKER_COLUMNS, TRACKER_SHEET)?;

    let notes = workbook
        .worksheet_range(NOTES_SHEET)
        .map_err(|_| SyncError::DataFormat(format!("missing sheet '{NOTES_SHEET}'")))?;
    check_header(notes.rows().next(), &NOTES_COLUMNS, NOTES_SHEET)?;

    let jobs: Vec<JobRecord> = tracker
        .rows()
        .skip(1)
        .filter(|row| !row_is_empty(row))
        .map(parse_job_row)
        .collect();

    let note_rows: Vec<NoteRecord> = notes
        .rows()
        .skip(1)
        .filter(|row| !row_is_empty(row))
        .map(parse_note_row)
        .collect();

    info!(
        jobs = jobs.len(),
        notes = note_rows.len(),
        "job tracking system loaded"
    );
    Ok(JobStore::new(jobs, note_rows))
}

/// Writes the store back into the existing workbook, row order preserved.
pub fn save(store: &JobStore, path: &Path) -> Result<(), SyncError> {
    let mut book = umya_spreadsheet::reader::xlsx::read(path)
        .map_err(|e| SyncError::DataFormat(format!("cannot reopen {}: {e}", path.display())))?;

    write_rows(
        &mut book,
        TRACKER_SHEET,
        store.jobs().iter().map(JobRecord::to_cells),
    )?;
    write_rows(
        &mut book,
        NOTES_SHEET,
        store.notes().iter().map(NoteRecord::to_cells),
    )?;

    umya_spreadsheet::writer::xlsx::write(&book, path)
        .map_err(|e| SyncError::DataFormat(format!("cannot write {}: {e}", path.display())))?;

    info!("job tracking system updated");
    Ok(())
}

fn write_rows<const N: usize>(
    book: &mut umya_spreadsheet::Spreadsheet,
    sheet_name: &str,
    rows: impl Iterator<Item = [String; N]>,
) -> Result<(), SyncError> {
    let sheet = book
        .get_sheet_by_name_mut(sheet_name)
        .ok_or_else(|| SyncError::DataFormat(format!("missing sheet '{sheet_name}'")))?;

    for (row_offset, cells) in rows.enumerate() {
        let row = row_offset as u32 + 2; // data starts under the header
        for (col_offset, value) in cells.iter().enumerate() {
            sheet
                .get_cell_mut((col_offset as u32 + 1, row))
                .set_value(value.clone());
        }
    }
    Ok(())
}

fn check_header(
    header: Option<&[Data]>,
    expected: &[&str],
    sheet_name: &str,
) -> Result<(), SyncError> {
    let header = header
        .ok_or_else(|| SyncError::DataFormat(format!("sheet '{sheet_name}' has no header row")))?;

    for (idx, name) in expected.iter().enumerate() {
        let found = header.get(idx).map(data_as_header).unwrap_or_default();
        if found != *name {
            return Err(SyncError::DataFormat(format!(
                "sheet '{sheet_name}' column {}: expected '{name}', found '{found}'",
                idx + 1
            )));
        }
    }
    Ok(())
}

fn data_as_header(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn row_is_empty(row: &[Data]) -> bool {
    row.iter().all(|cell| match cell {
        Data::Empty => true,
        Data::String(s) => s.trim().is_empty(),
        _ => false,
    })
}

fn parse_job_row(row: &[Data]) -> JobRecord {
    JobRecord {
        remote_id: cell_int(row.get(0)),
        position: cell_text(row.get(1)),
        company: cell_text(row.get(2)),
        work_type: cell_text(row.get(3)),
        employment_options: cell_text(row.get(4)),
        min_salary: cell_float(row.get(5)),
        max_salary: cell_float(row.get(6)),
        currency: cell_text(row.get(7)),
        frequency: cell_text(row.get(8)),
        location: cell_text(row.get(9)),
        status: cell_text(row.get(10)),
        excitement: cell_int(row.get(11)),
        date_saved: cell_datetime(row.get(12)),
        last_updated: cell_datetime(row.get(13)),
        last_uploaded: cell_datetime(row.get(14)),
        delete: cell_text(row.get(15)),
    }
}

fn parse_note_row(row: &[Data]) -> NoteRecord {
    NoteRecord {
        job_id: cell_int(row.get(0)),
        text: cell_text(row.get(1)),
        uploaded: cell_text(row.get(2)),
    }
}

fn cell_text(cell: Option<&Data>) -> Option<String> {
    match cell? {
        Data::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        _ => None,
    }
}

fn cell_int(cell: Option<&Data>) -> Option<i64> {
    match cell? {
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(*f as i64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell_float(cell: Option<&Data>) -> Option<f64> {
    match cell? {
        Data::Int(i) => Some(*i as f64),
        Data::Float(f) => Some(*f),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn cell_datetime(cell: Option<&Data>) -> Option<NaiveDateTime> {
    match cell? {
        Data::DateTime(dt) => dt.as_datetime(),
        Data::DateTimeIso(s) => s.parse().ok().or_else(|| parse_cell_datetime(s)),
        Data::String(s) => parse_cell_datetime(s),
        _ => None,
    }
}
