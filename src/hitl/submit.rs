//! Sending an operator's answer back to the backend.

use tracing::{info, warn};

use crate::api::BackendClient;
use crate::errors::ClientError;
use crate::hitl::dispatch::SubmitOutcome;
use crate::models::hitl::TaskId;

/// Post `text` for `task_id` and fold the result into a [`SubmitOutcome`].
///
/// Never fails: every error is reported through the outcome so the driver
/// can turn it into a banner and leave the request pending.
pub async fn submit(backend: &BackendClient, task_id: &TaskId, text: &str) -> SubmitOutcome {
    let result = backend.submit_response(task_id, text).await;
    match &result {
        Ok(_) => info!(task_id = %task_id, "hitl response accepted"),
        Err(e) => warn!(task_id = %task_id, error = %e, "hitl response not accepted"),
    }
    outcome_of(result.map(|_| ()))
}

pub fn outcome_of(result: Result<(), ClientError>) -> SubmitOutcome {
    match result {
        Ok(()) => SubmitOutcome::Accepted,
        Err(ClientError::Rejected(message)) | Err(ClientError::Api { message, .. }) => {
            SubmitOutcome::Rejected(message)
        }
        Err(other) => SubmitOutcome::Failed(other.to_string()),
    }
}
