//! Pending-note selection and upload marking.
//!
//! Notes reference their parent job by the job's remote id. A job that has
//! no remote id yet therefore selects zero notes; its notes become
//! eligible on the first pass after the id exists.

use crate::store::{JobStore, NoteRecord};

/// Returns the row indices of notes belonging to `job_id` that have not
/// been uploaded yet, in table order. A `None` key never matches.
pub fn select_pending(notes: &[NoteRecord], job_id: Option<i64>) -> Vec<usize> {
    let Some(job_id) = job_id else {
        return Vec::new();
    };
    notes
        .iter()
        .enumerate()
        .filter(|(_, note)| note.job_id == Some(job_id) && note.is_pending())
        .map(|(idx, _)| idx)
        .collect()
}

/// Note texts for the selected rows, order preserved. Rows without text
/// are dropped (nothing to upload).
pub fn pending_texts(notes: &[NoteRecord], indices: &[usize]) -> Vec<String> {
    indices
        .iter()
        .filter_map(|&idx| notes[idx].text.clone())
        .collect()
}

/// Marks the selected rows uploaded. Called in the same logical
/// transaction as the parent job's `last_uploaded` update.
pub fn mark_uploaded(store: &mut JobStore, indices: &[usize]) {
    for &idx in indices {
        store.note_mut(idx).uploaded = Some("Yes".to_string());
    }
}
