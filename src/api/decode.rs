use crate::error::ClientError;
use crate::model::{ControlReply, JobSnapshot};
use serde_json::Value;

const NO_SESSION_FALLBACK: &str = "No active voting session found";

/// Validate a `/check_status` body.
///
/// A `status: "error"` wrapper means there is nothing to poll. Anything else
/// must carry every snapshot field with the right type.
pub fn decode_status(body: &Value) -> Result<JobSnapshot, ClientError> {
    let obj = body
        .as_object()
        .ok_or_else(|| ClientError::MalformedSnapshot("expected a JSON object".into()))?;

    if let Some(status) = obj.get("status") {
        match status.as_str() {
            Some("error") => {
                let message = obj
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or(NO_SESSION_FALLBACK);
                return Err(ClientError::NoActiveSession(message.to_string()));
            }
            Some("ok") | Some("success") => {}
            _ => {
                return Err(ClientError::MalformedSnapshot(format!(
                    "unexpected status field {status}"
                )))
            }
        }
    }

    JobSnapshot::deserialize_strict(body)
}

/// Validate a `/start_voting` or `/stop_voting` body.
pub fn decode_control_reply(body: &Value) -> Result<ControlReply, ClientError> {
    serde_json::from_value(body.clone())
        .map_err(|e| ClientError::transport("unexpected control reply", e))
}

impl JobSnapshot {
    fn deserialize_strict(body: &Value) -> Result<Self, ClientError> {
        // serde rejects missing and ill-typed fields. Over-reported completion
        // is only logged; the projector clamps it.
        let snap: JobSnapshot = serde_json::from_value(body.clone())
            .map_err(|e| ClientError::MalformedSnapshot(e.to_string()))?;
        if snap.total_votes > 0 && snap.completed_votes > snap.total_votes {
            log::warn!(
                "snapshot reports {} completed of {} total votes",
                snap.completed_votes,
                snap.total_votes
            );
        }
        Ok(snap)
    }
}
