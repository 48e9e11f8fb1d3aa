//! Intranet session — cookie-backed HTTP client that signs in once and
//! performs all remote form operations for the rest of the run.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, info};

use crate::actuator::{ActuationError, DeleteOutcome, FormData, RemoteActuator};
use crate::config::Config;
use crate::errors::SyncError;

pub struct IntranetSession {
    client: Client,
    base_url: String,
}

impl IntranetSession {
    /// Signs in with the configured credentials. Blank or rejected
    /// credentials abort the run before any record is touched.
    pub async fn login(config: &Config) -> Result<Self, SyncError> {
        let user = config.intranet_username.trim();
        let password = config.intranet_password.trim();
        if user.is_empty() || password.is_empty() {
            return Err(SyncError::Authentication(
                "intranet username and password must be provided".to_string(),
            ));
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")
            .map_err(SyncError::Internal)?;

        let response = client
            .post(format!("{}/auth/sign_in", config.intranet_base_url))
            .form(&[("user[login]", user), ("user[password]", password)])
            .send()
            .await
            .map_err(|e| SyncError::Authentication(format!("sign-in request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SyncError::Authentication(format!(
                "sign-in returned status {}",
                response.status()
            )));
        }
        // A rejected login lands back on the sign-in page.
        if response.url().path().ends_with("sign_in") {
            return Err(SyncError::Authentication(
                "credentials were rejected".to_string(),
            ));
        }

        info!("logged in to the intranet");
        Ok(Self {
            client,
            base_url: config.intranet_base_url.clone(),
        })
    }

    fn statuses_url(&self) -> String {
        format!("{}/user_working_statuses", self.base_url)
    }
}

/// Extracts the numeric resource id from the URL the browser session lands
/// on after a successful submit (e.g. `/user_working_statuses/1234`).
fn id_from_url(url: &Url) -> Option<i64> {
    url.path_segments()?
        .rev()
        .find_map(|segment| segment.parse().ok())
}

#[async_trait]
impl RemoteActuator for IntranetSession {
    async fn create(&self, form: &FormData, notes: &[String]) -> Result<i64, ActuationError> {
        let response = self
            .client
            .post(self.statuses_url())
            .form(&form.to_wire())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ActuationError::UnexpectedStatus {
                action: "create",
                status: response.status().as_u16(),
            });
        }
        let remote_id = id_from_url(response.url()).ok_or(ActuationError::MissingResourceId)?;
        debug!(remote_id, "created remote entry");

        if !notes.is_empty() {
            self.attach_notes(remote_id, notes).await?;
        }
        Ok(remote_id)
    }

    async fn edit(
        &self,
        remote_id: i64,
        form: &FormData,
        notes: &[String],
    ) -> Result<(), ActuationError> {
        let mut wire = form.to_wire();
        wire.push(("_method", "patch".to_string()));

        let response = self
            .client
            .post(format!("{}/{remote_id}", self.statuses_url()))
            .form(&wire)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ActuationError::WrongResource(remote_id)),
            status if !status.is_success() => {
                return Err(ActuationError::UnexpectedStatus {
                    action: "edit",
                    status: status.as_u16(),
                })
            }
            _ => {}
        }
        debug!(remote_id, "edited remote entry");

        if !notes.is_empty() {
            self.attach_notes(remote_id, notes).await?;
        }
        Ok(())
    }

    async fn delete(&self, remote_id: i64) -> Result<DeleteOutcome, ActuationError> {
        let response = self
            .client
            .post(format!("{}/{remote_id}", self.statuses_url()))
            .form(&[("_method", "delete")])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            status if status.is_success() => {
                debug!(remote_id, "deleted remote entry");
                Ok(DeleteOutcome::Deleted)
            }
            status => Err(ActuationError::UnexpectedStatus {
                action: "delete",
                status: status.as_u16(),
            }),
        }
    }

    async fn attach_notes(&self, remote_id: i64, notes: &[String]) -> Result<(), ActuationError> {
        for note in notes {
            let response = self
                .client
                .post(format!("{}/{remote_id}/notes", self.statuses_url()))
                .form(&[("note[content]", note.as_str())])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(ActuationError::UnexpectedStatus {
                    action: "attach_notes",
                    status: response.status().as_u16(),
                });
            }
        }
        debug!(remote_id, count = notes.len(), "attached notes");
        Ok(())
    }
}
