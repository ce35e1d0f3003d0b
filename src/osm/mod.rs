//! OpenStreetMap API 0.6 write path
//!
//! - [`codec`]    -- XML/JSON encodings of a point of interest
//! - [`client`]   -- bearer-authenticated HTTP calls
//! - [`log`]      -- submission log entries and sinks
//! - [`pipeline`] -- open / upload / close protocol with guaranteed closure

pub mod client;
pub mod codec;
pub mod log;
pub mod pipeline;

pub use client::{ApiResponse, OsmApiClient, UserDetails};
pub use codec::{to_osm_json, to_osm_xml, PointOfInterest};
pub use log::{LogSink, MemoryLogSink, Severity, SubmissionLogEntry};
pub use pipeline::{Changeset, ChangesetPipeline, ChangesetState};
