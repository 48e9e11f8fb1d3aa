//! Remote Actuator — the seam between the reconciler and the intranet
//! session that performs create/edit/delete/notes operations.
//!
//! The reconciler only sees [`RemoteActuator`]; the production
//! implementation is [`intranet::IntranetSession`], tests use mocks.

use async_trait::async_trait;
use thiserror::Error;

pub mod intranet;

#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned status {status} during {action}")]
    UnexpectedStatus { action: &'static str, status: u16 },

    #[error("no numeric resource id observable after submitting new entry")]
    MissingResourceId,

    #[error("remote resource {0} not reachable after navigation")]
    WrongResource(i64),
}

/// Outcome of a delete action. `NotFound` is not an error: the remote
/// resource was already absent and the deletion is considered satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// One field per known remote form input. Constructed by
/// `reconcile::form::build_form_data`; stringly-keyed maps never appear
/// outside [`FormData::to_wire`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pub start_year: Option<i32>,
    pub start_month: Option<u32>,
    pub start_day: Option<u32>,
    pub end_year: Option<i32>,
    pub end_month: Option<u32>,
    pub end_day: Option<u32>,
    pub employment: Option<String>,
    pub work_type: Option<String>,
    pub company: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub title: Option<String>,
    pub salary: Option<f64>,
    pub currency: Option<String>,
    pub frequency: Option<String>,
}

impl FormData {
    /// Projects the payload to the wire shape the remote form expects:
    /// one (input id, value) pair per field, `None` rendered as the empty
    /// string. This is the only place an absent value becomes "".
    pub fn to_wire(&self) -> Vec<(&'static str, String)> {
        vec![
            ("user_working_status_start_date_1i", num(&self.start_year)),
            ("user_working_status_start_date_2i", num(&self.start_month)),
            ("user_working_status_start_date_3i", num(&self.start_day)),
            ("user_working_status_end_date_1i", num(&self.end_year)),
            ("user_working_status_end_date_2i", num(&self.end_month)),
            ("user_working_status_end_date_3i", num(&self.end_day)),
            ("user_working_status_employment", text(&self.employment)),
            ("user_working_status_work_type", text(&self.work_type)),
            ("company_name", text(&self.company)),
            ("user_working_status_location_city", text(&self.city)),
            ("user_working_status_location_state", text(&self.state)),
            ("user_working_status_location_country", text(&self.country)),
            ("user_working_status_location_lat", num(&self.latitude)),
            ("user_working_status_location_lng", num(&self.longitude)),
            ("title", text(&self.title)),
            ("user_working_status_salary", num(&self.salary)),
            ("user_working_status_salary_currency", text(&self.currency)),
            ("user_working_status_salary_frequency", text(&self.frequency)),
        ]
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn num<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(T::to_string).unwrap_or_default()
}

/// The remote actuation operations the reconciler drives. A single shared
/// session backs all calls; the reconciler never invokes it concurrently.
#[async_trait]
pub trait RemoteActuator: Send + Sync {
    /// Submits a new entry and returns the remote id assigned to it.
    async fn create(&self, form: &FormData, notes: &[String]) -> Result<i64, ActuationError>;

    /// Re-submits the form for an existing entry.
    async fn edit(
        &self,
        remote_id: i64,
        form: &FormData,
        notes: &[String],
    ) -> Result<(), ActuationError>;

    /// Removes an entry. An already-absent resource is `NotFound`, not an
    /// error.
    async fn delete(&self, remote_id: i64) -> Result<DeleteOutcome, ActuationError>;

    /// Appends one editor entry per note, preserving note order.
    async fn attach_notes(&self, remote_id: i64, notes: &[String]) -> Result<(), ActuationError>;
}
