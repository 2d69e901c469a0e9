//! Write-and-poll job protocol
//!
//! Buffer reads and register writes are asynchronous on the platform: the
//! submission answers with an `idRequest`, and the result is fetched by
//! polling `deviceJobStatus/<id>` until `jobAnswerStatus` reads
//! `"completed"`. Jobs whose submission carries no id are failed
//! immediately; jobs that never complete exhaust a fixed attempt budget.

use crate::client::session::Session;
use crate::client::transport::{Transport, PATH_DEVICE_JOB_STATUS};
use crate::error::{AguaIotError, Result};
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Final state of a completed device job
#[derive(Debug, Clone)]
pub struct JobStatus {
    /// Reported status; `"completed"` by the time this is returned
    pub status: String,
    /// The job's `jobAnswerData` payload, when it carries one
    pub data: Option<Value>,
}

/// Polling cadence, taken from the client configuration
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    /// Delay before each status poll
    pub interval: Duration,
    /// Attempt budget per job
    pub attempts: u32,
}

/// Submit a job request and wait for it to complete
///
/// Each attempt sleeps first: a freshly submitted job has no answer yet.
/// Only a `"completed"` status ends the wait; any other status, and any
/// transient poll failure, consumes one attempt.
pub async fn submit_and_wait(
    transport: &Transport,
    session: &Session,
    method: Method,
    path: &str,
    payload: &Value,
    settings: PollSettings,
) -> Result<JobStatus> {
    let response = session
        .authenticated_request(transport, method, path, Some(payload))
        .await?;

    let job_id = extract_job_id(&response).ok_or_else(|| {
        AguaIotError::no_job_id(format!("submission to {path} returned no idRequest"))
    })?;
    debug!("Job {job_id} submitted via {path}");

    let status_path = format!("{PATH_DEVICE_JOB_STATUS}{job_id}");
    for attempt in 1..=settings.attempts {
        tokio::time::sleep(settings.interval).await;

        match session
            .authenticated_request(transport, Method::GET, &status_path, None)
            .await
        {
            Ok(status) => {
                let answer_status = status
                    .get("jobAnswerStatus")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                debug!(
                    "Job {job_id} status (attempt {attempt}/{}): {answer_status}",
                    settings.attempts
                );

                if answer_status == "completed" {
                    return Ok(JobStatus {
                        status: answer_status.to_string(),
                        data: status.get("jobAnswerData").cloned(),
                    });
                }
            }
            Err(e) => {
                warn!(
                    "Job {job_id} poll failed (attempt {attempt}/{}): {e}",
                    settings.attempts
                );
            }
        }
    }

    Err(AguaIotError::job_timeout(format!(
        "job {job_id} did not complete within {} attempts",
        settings.attempts
    )))
}

/// Job identifier out of a submission response
///
/// Tenants answer with a string or a bare number; an empty string counts
/// as missing.
fn extract_job_id(response: &Value) -> Option<String> {
    match response.get("idRequest")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_id_from_string_or_number() {
        assert_eq!(
            extract_job_id(&json!({"idRequest": "abc-123"})),
            Some("abc-123".to_string())
        );
        assert_eq!(
            extract_job_id(&json!({"idRequest": 42})),
            Some("42".to_string())
        );
    }

    #[test]
    fn test_missing_job_id_forms() {
        assert_eq!(extract_job_id(&json!({})), None);
        assert_eq!(extract_job_id(&json!({"idRequest": ""})), None);
        assert_eq!(extract_job_id(&json!({"idRequest": null})), None);
        assert_eq!(extract_job_id(&json!({"idRequest": []})), None);
    }
}
