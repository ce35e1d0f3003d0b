//! Preview and submit commands

use super::nearby::{clear_to_submit, overpass_client};
use super::{create_auth_provider, open_store, point_from_args};
use crate::cli::{PointArgs, PreviewFormat};
use crate::config::Config;
use crate::error::{OsmSubmitError, Result};
use crate::osm::codec::{to_osm_json, to_osm_xml};
use crate::osm::log::{ConsoleLogSink, TracingLogSink};
use crate::osm::{ChangesetPipeline, LogSink, OsmApiClient};
use colored::Colorize;

/// Placeholder changeset id shown in XML previews
const PREVIEW_CHANGESET_ID: &str = "0";

/// Renders the document that `submit` would upload
pub fn render_preview(config: &Config, point: &PointArgs, format: PreviewFormat) -> String {
    let poi = point_from_args(point);
    match format {
        PreviewFormat::Xml => to_osm_xml(&poi, PREVIEW_CHANGESET_ID, &config.osm.generator),
        PreviewFormat::Json => to_osm_json(&poi),
    }
}

/// Prints the preview document
pub fn preview(config: &Config, point: &PointArgs, format: PreviewFormat) {
    println!("{}", render_preview(config, point, format));
}

/// Progress sink for the CLI: a colored console, or tracing events when logs
/// are emitted as JSON
pub fn progress_sink(json_logs: bool) -> Box<dyn LogSink> {
    if json_logs {
        Box::new(TracingLogSink)
    } else {
        Box::new(ConsoleLogSink)
    }
}

/// Submits a point as a new node, reporting progress to `sink`
///
/// Returns the new node id, or `None` when the nearby check stopped the
/// submission.
///
/// # Errors
///
/// `NotAuthenticated` without a stored credential; otherwise the pipeline's
/// errors (`Unauthorized`, `ChangesetCreateFailure`, `NodeCreateFailure`)
pub async fn submit(
    config: &Config,
    point: &PointArgs,
    force: bool,
    sink: &dyn LogSink,
) -> Result<Option<String>> {
    let credential = {
        let store = open_store(config)?;
        let provider = create_auth_provider(config, store)?;
        provider.credential()?.ok_or(OsmSubmitError::NotAuthenticated)?
    };

    let poi = point_from_args(point);

    if config.nearby.enabled {
        let lookup = overpass_client(config)?;
        if !clear_to_submit(&lookup, poi.lat, poi.lon, config.nearby.radius_meters, force).await {
            return Ok(None);
        }
    }

    tracing::info!(
        environment = %credential.environment,
        lat = poi.lat,
        lon = poi.lon,
        "Submitting point of interest"
    );

    let client = OsmApiClient::new(config.http_client()?, config.endpoint_table());
    let pipeline = ChangesetPipeline::new(client, config.osm.generator.clone());

    match pipeline.submit(&credential, &poi, sink).await {
        Ok(node_id) => Ok(Some(node_id)),
        Err(e) => {
            if let Some(OsmSubmitError::Unauthorized { .. }) = e.downcast_ref::<OsmSubmitError>() {
                eprintln!(
                    "{} the stored token was rejected; run `osm-submit login` again",
                    "hint:".yellow()
                );
            }
            Err(e)
        }
    }
}
