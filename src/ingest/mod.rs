//! Submission to the collection API: the idempotent, conflict-aware
//! upsert protocol and the secondary resource-import channel.
//!
//! # Architecture
//!
//! - [`IngestClient`] - `PUT /works/{key}?merge=1` upsert with outcome mapping
//! - [`Outcome`] - Created / Updated / Ignored / Conflict
//! - [`ConflictResolver`] - single strip-and-resubmit pass for field conflicts
//! - [`ResourceDescriptor`] - payload for `POST /works/{sn}/resource/import`

mod conflict;
mod error;
mod resources;

pub use conflict::{ConflictResolver, Resolution};
pub use error::IngestError;
pub use resources::ResourceDescriptor;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};
use url::Url;

use crate::net::{ClientOptions, build_http_client};
use crate::work::Work;

/// Upsert key for records without a natural identity; the server resolves
/// those by best match instead.
pub const UNKEYED_SENTINEL: &str = "none";

/// How the server disposed of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new record was stored under the returned identifier.
    Created { id: String },
    /// An existing record was merged; same identifier semantics.
    Updated { id: String },
    /// The submission added nothing new; a no-op, not an error.
    Ignored,
    /// One or more fields disagree with stored data in a way the server
    /// cannot auto-merge.
    Conflict { fields: Vec<String> },
}

#[derive(Debug, Deserialize)]
struct ConflictBody {
    data: Vec<ConflictField>,
}

#[derive(Debug, Deserialize)]
struct ConflictField {
    field: String,
}

#[derive(Debug, Deserialize)]
struct ImportBody {
    code: i64,
    data: Option<u64>,
    message: Option<String>,
}

/// Client for the collection API. The base URL is explicit configuration;
/// nothing here is process-global.
#[derive(Debug, Clone)]
pub struct IngestClient {
    client: Client,
    base_url: Url,
}

impl IngestClient {
    /// Creates a client against `base_url` (e.g.
    /// `https://127.0.0.1/study/api/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] when the base URL cannot carry joined paths
    /// or the HTTP client cannot be built.
    pub fn new(base_url: &str, options: &ClientOptions) -> Result<Self, IngestError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized).map_err(|_| IngestError::InvalidBaseUrl {
            value: base_url.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(IngestError::InvalidBaseUrl {
                value: base_url.to_string(),
            });
        }

        let client =
            build_http_client(options).map_err(|source| IngestError::ClientBuild { source })?;

        Ok(Self { client, base_url })
    }

    /// The upsert key for a record: its canonical serial number, or the
    /// best-match sentinel when the domain has none.
    #[must_use]
    pub fn upsert_key(work: &Work) -> &str {
        work.serial_number.as_deref().unwrap_or(UNKEYED_SENTINEL)
    }

    /// Submits a validated record with the merge flag set.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] on transport faults or non-protocol
    /// responses; conflicts are an [`Outcome`], not an error.
    pub async fn submit(&self, work: &Work) -> Result<Outcome, IngestError> {
        let key = Self::upsert_key(work).to_string();
        let payload = serde_json::to_value(work)?;
        self.submit_payload(&key, &payload).await
    }

    /// Submits an already-encoded payload under an explicit key; the
    /// conflict resolver uses this for its stripped resubmission.
    ///
    /// # Errors
    ///
    /// Same as [`IngestClient::submit`].
    #[instrument(skip(self, payload), fields(key = %key))]
    pub async fn submit_payload(&self, key: &str, payload: &Value) -> Result<Outcome, IngestError> {
        let url = self.endpoint(&format!("works/{key}"), Some("merge=1"))?;
        debug!(url = %url, "submitting work");

        let response = self
            .client
            .put(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|source| IngestError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        match status {
            StatusCode::OK | StatusCode::CREATED => {
                let body: Value =
                    response
                        .json()
                        .await
                        .map_err(|error| IngestError::MalformedResponse {
                            status: status.as_u16(),
                            detail: error.to_string(),
                        })?;
                let id = render_id(&body).ok_or_else(|| IngestError::MalformedResponse {
                    status: status.as_u16(),
                    detail: "response body carries no id".to_string(),
                })?;
                if status == StatusCode::CREATED {
                    Ok(Outcome::Created { id })
                } else {
                    Ok(Outcome::Updated { id })
                }
            }
            StatusCode::NO_CONTENT => Ok(Outcome::Ignored),
            StatusCode::CONFLICT => {
                let body: ConflictBody =
                    response
                        .json()
                        .await
                        .map_err(|error| IngestError::MalformedResponse {
                            status: status.as_u16(),
                            detail: error.to_string(),
                        })?;
                Ok(Outcome::Conflict {
                    fields: body.data.into_iter().map(|entry| entry.field).collect(),
                })
            }
            _ => {
                // Anything else is terminal; surface the body verbatim.
                let message = response.text().await.unwrap_or_default();
                Err(IngestError::Server {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Submits download-resource descriptors discovered on an aggregator
    /// page; independent of the upsert flow. Returns the imported count.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::ImportRejected`] when the server answers
    /// with a non-zero code, and the usual transport/server errors.
    #[instrument(skip(self, resources), fields(serial_number = %serial_number, count = resources.len()))]
    pub async fn import_resources(
        &self,
        serial_number: &str,
        resources: &[ResourceDescriptor],
    ) -> Result<u64, IngestError> {
        let url = self.endpoint(&format!("works/{serial_number}/resource/import"), None)?;

        let response = self
            .client
            .post(url.clone())
            .json(resources)
            .send()
            .await
            .map_err(|source| IngestError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IngestError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body: ImportBody =
            response
                .json()
                .await
                .map_err(|error| IngestError::MalformedResponse {
                    status: status.as_u16(),
                    detail: error.to_string(),
                })?;

        if body.code == 0 {
            Ok(body.data.unwrap_or(0))
        } else {
            Err(IngestError::ImportRejected {
                message: body.message.unwrap_or_else(|| format!("code {}", body.code)),
            })
        }
    }

    fn endpoint(&self, path: &str, query: Option<&str>) -> Result<Url, IngestError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|_| IngestError::InvalidBaseUrl {
                value: self.base_url.to_string(),
            })?;
        url.set_query(query);
        Ok(url)
    }
}

/// Renders the server-assigned identifier from a success body.
fn render_id(body: &Value) -> Option<String> {
    match body.get("id")? {
        Value::String(id) => Some(id.clone()),
        other => Some(other.to_string()),
    }
}
