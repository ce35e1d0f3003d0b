//! Changeset submission pipeline
//!
//! Creates one node inside a fresh changeset:
//!
//! 1. open a changeset,
//! 2. upload the node,
//! 3. close the changeset,
//!
//! strictly in that order. Once step 1 succeeds, step 3 always runs, whatever
//! step 2 did. A close failure is logged and never replaces the upload's
//! outcome.

use crate::auth::Credential;
use crate::error::{OsmSubmitError, Result};
use crate::osm::client::{ApiResponse, OsmApiClient};
use crate::osm::codec::{changeset_xml, to_osm_xml, PointOfInterest};
use crate::osm::log::{LogSink, Severity, SubmissionLogEntry};

/// Lifecycle of a remote changeset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangesetState {
    /// Created and accepting edits
    Open,
    /// Close request in flight
    Closing,
    /// Close attempted
    Closed,
}

/// A changeset opened by this pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Changeset {
    /// Server-assigned id
    pub id: String,
    /// Local view of its state
    pub state: ChangesetState,
}

/// Runs the open / upload / close protocol
pub struct ChangesetPipeline {
    client: OsmApiClient,
    generator: String,
}

impl ChangesetPipeline {
    /// Creates a pipeline. `generator` becomes the `created_by` tag and the
    /// document `generator` attribute.
    pub fn new(client: OsmApiClient, generator: impl Into<String>) -> Self {
        Self {
            client,
            generator: generator.into(),
        }
    }

    /// Submits `poi` as a new node and returns its id.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` when opening the changeset answers 401
    /// - `ChangesetCreateFailure` for any other open failure
    /// - `NodeCreateFailure` when the upload fails (after the close attempt)
    pub async fn submit(
        &self,
        credential: &Credential,
        poi: &PointOfInterest,
        sink: &dyn LogSink,
    ) -> Result<String> {
        let mut changeset = match self.open_changeset(credential, poi, sink).await {
            Ok(changeset) => changeset,
            Err(e) => {
                log(sink, e.to_string(), Severity::Error);
                return Err(e);
            }
        };

        let uploaded = self.upload_node(credential, poi, &changeset, sink).await;

        self.close_changeset(credential, &mut changeset, sink).await;

        match uploaded {
            Ok(node_id) => Ok(node_id),
            Err(e) => {
                log(sink, e.to_string(), Severity::Error);
                Err(e.into())
            }
        }
    }

    async fn open_changeset(
        &self,
        credential: &Credential,
        poi: &PointOfInterest,
        sink: &dyn LogSink,
    ) -> Result<Changeset> {
        log(sink, "Creating OSM Changeset...", Severity::Info);

        let resp = self
            .client
            .create_changeset(credential, changeset_xml(poi, &self.generator))
            .await
            .map_err(|e| OsmSubmitError::ChangesetCreateFailure {
                body: e.to_string(),
            })?;

        if resp.status == 401 {
            return Err(OsmSubmitError::Unauthorized { body: resp.body }.into());
        }
        if !resp.is_success() {
            return Err(OsmSubmitError::ChangesetCreateFailure { body: resp.body }.into());
        }

        let Some(id) = decimal_id(&resp) else {
            return Err(OsmSubmitError::ChangesetCreateFailure {
                body: format!("unexpected changeset id {:?}", resp.body),
            }
            .into());
        };

        log(sink, format!("Changeset #{} created.", id), Severity::Success);
        tracing::debug!(changeset_id = id, "Changeset open");

        Ok(Changeset {
            id: id.to_string(),
            state: ChangesetState::Open,
        })
    }

    /// Failures come back as `NodeCreateFailure` values; the caller closes
    /// the changeset before surfacing them.
    async fn upload_node(
        &self,
        credential: &Credential,
        poi: &PointOfInterest,
        changeset: &Changeset,
        sink: &dyn LogSink,
    ) -> std::result::Result<String, OsmSubmitError> {
        log(sink, "Uploading Node data...", Severity::Info);

        let document = to_osm_xml(poi, &changeset.id, &self.generator);
        let resp = self
            .client
            .create_node(credential, document)
            .await
            .map_err(|e| OsmSubmitError::NodeCreateFailure {
                body: e.to_string(),
            })?;

        if !resp.is_success() {
            return Err(OsmSubmitError::NodeCreateFailure { body: resp.body });
        }

        let Some(node_id) = decimal_id(&resp).map(str::to_string) else {
            return Err(OsmSubmitError::NodeCreateFailure {
                body: format!("unexpected node id {:?}", resp.body),
            });
        };
        log(
            sink,
            format!("Node #{} successfully created!", node_id),
            Severity::Success,
        );
        Ok(node_id)
    }

    /// Best effort; failures are logged and swallowed.
    async fn close_changeset(
        &self,
        credential: &Credential,
        changeset: &mut Changeset,
        sink: &dyn LogSink,
    ) {
        changeset.state = ChangesetState::Closing;
        log(sink, "Closing changeset...", Severity::Info);

        let failure = match self.client.close_changeset(credential, &changeset.id).await {
            Ok(resp) if resp.is_success() => None,
            Ok(resp) => Some(OsmSubmitError::ChangesetCloseFailure { body: resp.body }),
            Err(e) => Some(OsmSubmitError::ChangesetCloseFailure {
                body: e.to_string(),
            }),
        };

        changeset.state = ChangesetState::Closed;
        match failure {
            None => log(
                sink,
                format!("Changeset #{} closed.", changeset.id),
                Severity::Success,
            ),
            Some(e) => {
                tracing::warn!(changeset_id = %changeset.id, "Changeset left open: {}", e);
                log(sink, e.to_string(), Severity::Error);
            }
        }
    }
}

/// The trimmed body when it is a decimal id
fn decimal_id(resp: &ApiResponse) -> Option<&str> {
    let id = resp.trimmed_body();
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

fn log(sink: &dyn LogSink, message: impl Into<String>, severity: Severity) {
    let entry = SubmissionLogEntry::new(message, severity);
    match severity {
        Severity::Error => tracing::error!("{}", entry.message),
        _ => tracing::info!("{}", entry.message),
    }
    sink.emit(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{EndpointTable, OsmEnvironment};
    use crate::osm::log::MemoryLogSink;

    #[tokio::test]
    async fn test_transport_failure_on_open_is_changeset_create_failure() {
        // Nothing listens on port 9 (discard); the connect fails fast.
        let client = OsmApiClient::new(
            reqwest::Client::new(),
            EndpointTable::uniform("http://127.0.0.1:9"),
        );
        let pipeline = ChangesetPipeline::new(client, "test");
        let credential = Credential {
            access_token: "t".to_string(),
            environment: OsmEnvironment::Dev,
        };
        let sink = MemoryLogSink::new();

        let err = pipeline
            .submit(&credential, &PointOfInterest::new(0.0, 0.0), &sink)
            .await
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<OsmSubmitError>(),
            Some(OsmSubmitError::ChangesetCreateFailure { .. })
        ));
        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].severity, Severity::Info);
        assert_eq!(entries[1].severity, Severity::Error);
    }
}
