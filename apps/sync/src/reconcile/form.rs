//! Builds the typed remote form payload from a validated record plus its
//! enriched location.

use chrono::Datelike;

use crate::actuator::FormData;
use crate::geocode::LocationDetails;
use crate::store::JobRecord;

/// Statuses that close out an application; only these carry an end date,
/// taken from the record's last local edit.
const CLOSED_STATUSES: [&str; 4] = ["Declined", "Rejected", "Resigned", "Laid off"];

pub fn build_form_data(record: &JobRecord, location: &LocationDetails) -> FormData {
    let mut form = FormData {
        employment: record.employment_options.clone(),
        work_type: record.work_type.clone(),
        company: record.company.clone(),
        city: location.city.clone(),
        state: location.state.clone(),
        country: location.country.clone(),
        latitude: Some(location.latitude),
        longitude: Some(location.longitude),
        title: record.position.clone(),
        salary: record.min_salary,
        currency: record.currency.clone(),
        frequency: record.frequency.clone(),
        ..Default::default()
    };

    if let Some(saved) = record.date_saved {
        form.start_year = Some(saved.year());
        form.start_month = Some(saved.month());
        form.start_day = Some(saved.day());
    }

    let closed = record
        .status
        .as_deref()
        .is_some_and(|status| CLOSED_STATUSES.contains(&status));
    if closed {
        if let Some(updated) = record.last_updated {
            form.end_year = Some(updated.year());
            form.end_month = Some(updated.month());
            form.end_day = Some(updated.day());
        }
    }

    form
}
