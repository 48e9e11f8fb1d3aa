//! Record Store — in-memory table of job and note rows, addressed by a
//! stable row index.
//!
//! The reconciler iterates indices and writes through them, so iteration
//! and mutation never alias; everything it changes is visible to the
//! write-back path without re-reading the source file.

pub mod models;
pub mod workbook;

pub use models::{JobRecord, NoteRecord};

#[derive(Debug, Default, Clone)]
pub struct JobStore {
    jobs: Vec<JobRecord>,
    notes: Vec<NoteRecord>,
}

impl JobStore {
    pub fn new(jobs: Vec<JobRecord>, notes: Vec<NoteRecord>) -> Self {
        Self { jobs, notes }
    }

    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    pub fn job(&self, idx: usize) -> &JobRecord {
        &self.jobs[idx]
    }

    pub fn job_mut(&mut self, idx: usize) -> &mut JobRecord {
        &mut self.jobs[idx]
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn notes(&self) -> &[NoteRecord] {
        &self.notes
    }

    pub fn note_mut(&mut self, idx: usize) -> &mut NoteRecord {
        &mut self.notes[idx]
    }
}
