use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::catalog::Catalog;
use crate::drafts::{DraftStorage, ScopedDrafts, ISSUE_REPORT_DRAFT};
use crate::forms::{EventForm, IssueReportForm, ValidationErrors};
use crate::models::EntityKind;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub id: u64,
    pub kind: EntityKind,
    pub submitted_at_utc: String,
}

/// Destination for finished forms. Implementations validate nothing; callers
/// go through [`submit_event_form`] and [`submit_issue_report`].
#[allow(async_fn_in_trait)]
pub trait Submitter {
    async fn submit_event(&self, form: &EventForm) -> Result<Receipt, SubmitError>;
    async fn submit_issue(&self, form: &IssueReportForm) -> Result<Receipt, SubmitError>;
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", content = "form", rename_all = "lowercase")]
pub enum Submission {
    Event(EventForm),
    Issue(IssueReportForm),
}

/// Accepts everything after an artificial delay and keeps what it accepted.
#[derive(Debug)]
pub struct SimulatedSubmitter {
    delay: Duration,
    failure: Option<String>,
    accepted: Mutex<Vec<(Receipt, Submission)>>,
}

impl SimulatedSubmitter {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            failure: None,
            accepted: Mutex::new(Vec::new()),
        }
    }

    /// A submitter whose every call fails in transit.
    pub fn failing(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::new(delay)
        }
    }

    pub async fn accepted(&self) -> Vec<(Receipt, Submission)> {
        self.accepted.lock().await.clone()
    }

    async fn accept(&self, submission: Submission) -> Result<Receipt, SubmitError> {
        let kind = match &submission {
            Submission::Event(_) => EntityKind::Event,
            Submission::Issue(_) => EntityKind::Issue,
        };
        tracing::info!(kind = kind.noun(), delay_ms = self.delay.as_millis() as u64, "submitting");
        tokio::time::sleep(self.delay).await;

        if let Some(reason) = &self.failure {
            tracing::warn!(kind = kind.noun(), "submission failed: {reason}");
            return Err(SubmitError::Transport(reason.clone()));
        }

        let mut accepted = self.accepted.lock().await;
        let receipt = Receipt {
            id: accepted.len() as u64 + 1,
            kind,
            submitted_at_utc: chrono::Utc::now().to_rfc3339(),
        };
        match serde_json::to_string(&submission) {
            Ok(payload) => tracing::info!(receipt = receipt.id, "{} data: {payload}", kind.noun()),
            Err(err) => tracing::warn!("could not log submission payload: {err}"),
        }
        accepted.push((receipt.clone(), submission));
        Ok(receipt)
    }
}

impl Submitter for SimulatedSubmitter {
    async fn submit_event(&self, form: &EventForm) -> Result<Receipt, SubmitError> {
        self.accept(Submission::Event(form.clone())).await
    }

    async fn submit_issue(&self, form: &IssueReportForm) -> Result<Receipt, SubmitError> {
        self.accept(Submission::Issue(form.clone())).await
    }
}

/// Validates and submits an event; the form is reset only on success.
pub async fn submit_event_form<T: Submitter>(
    form: &mut EventForm,
    catalog: &Catalog,
    submitter: &T,
) -> Result<Receipt, SubmitError> {
    form.validate(catalog)?;
    let receipt = submitter.submit_event(form).await?;
    form.reset();
    Ok(receipt)
}

/// Validates and submits an issue report. On success the stored draft is
/// cleared and the form reset; on failure both are left as they were.
pub async fn submit_issue_report<T: Submitter, S: DraftStorage>(
    form: &mut IssueReportForm,
    catalog: &Catalog,
    submitter: &T,
    drafts: &ScopedDrafts<S>,
) -> Result<Receipt, SubmitError> {
    form.validate(catalog)?;
    let receipt = submitter.submit_issue(form).await?;
    if let Err(err) = drafts.clear(ISSUE_REPORT_DRAFT) {
        tracing::warn!("report submitted but its draft could not be cleared: {err}");
    }
    form.reset();
    Ok(receipt)
}
