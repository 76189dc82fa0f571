//! Single-pass resolution of server-detected field conflicts.

use serde_json::Value;
use tracing::{info, warn};

use crate::prompt::OperatorPrompt;

use super::{IngestClient, IngestError, Outcome};

/// How the conflict pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The stripped resubmission went through; carries its outcome.
    Resolved(Outcome),
    /// The operator chose not to strip; the record stays unsubmitted.
    Declined,
    /// The resubmission conflicted again; handed back for manual
    /// handling, never retried a second time.
    Unresolved { fields: Vec<String> },
}

/// Applies the conflict policy: confirm with the operator, delete exactly
/// the conflicting fields from the payload, resubmit once.
pub struct ConflictResolver<'a> {
    client: &'a IngestClient,
    prompt: &'a dyn OperatorPrompt,
}

impl<'a> ConflictResolver<'a> {
    #[must_use]
    pub fn new(client: &'a IngestClient, prompt: &'a dyn OperatorPrompt) -> Self {
        Self { client, prompt }
    }

    /// Runs the single resolution pass for a conflicted submission.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the resubmission itself fails at the
    /// transport or server level.
    pub async fn resolve(
        &self,
        key: &str,
        payload: &Value,
        fields: &[String],
    ) -> Result<Resolution, IngestError> {
        let message = format!(
            "Conflicts: {}. Retry without the conflicting fields?",
            fields.join(", ")
        );
        if !self.prompt.confirm(&message) {
            info!(?fields, "operator declined conflict resolution");
            return Ok(Resolution::Declined);
        }

        let stripped = strip_fields(payload, fields);
        match self.client.submit_payload(key, &stripped).await? {
            Outcome::Conflict { fields } => {
                warn!(?fields, "resubmission conflicted again; not retrying");
                Ok(Resolution::Unresolved { fields })
            }
            outcome => Ok(Resolution::Resolved(outcome)),
        }
    }
}

/// Returns a copy of `payload` with exactly the named fields deleted.
pub(crate) fn strip_fields(payload: &Value, fields: &[String]) -> Value {
    let mut stripped = payload.clone();
    if let Some(object) = stripped.as_object_mut() {
        for field in fields {
            object.remove(field);
        }
    }
    stripped
}
