//! One extraction run: resolve the state/output file pair, page through the
//! layer and write every feature to the output.

use serde_json::{Map, Value};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::client::FeatureClient;
use crate::error::{ExtractError, Result};
use crate::ledger::DedupLedger;
use crate::models::{BoxDims, Envelope, GetMapFormat, Operation, RetrievalMode, Service};
use crate::output::{count_lines, read_lines, JsonLinesFile};
use crate::pager::{ExtentPager, OffsetPager};
use crate::request::QueryBuilder;
use crate::state::{state_path_for, Identity, State};
use crate::transport::Transport;

/// Append `piece` to `url` with exactly one separating slash
fn join_url(url: &str, piece: &str) -> String {
    if url.ends_with('/') {
        format!("{}{}", url, piece)
    } else {
        format!("{}/{}", url, piece)
    }
}

/// Service endpoint and bare layer name for a GeoServer base url.
///
/// `ns:layer` targets the namespace endpoint `<url>/ns/ows`, a plain layer
/// name targets `<url>/ows`.
pub fn service_url_for_geoserver(geoserver_url: &str, layername: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = layername.split(':').collect();
    match parts.as_slice() {
        [layer] => Ok((join_url(geoserver_url, "ows"), layer.to_string())),
        [namespace, layer] => Ok((
            join_url(geoserver_url, &format!("{}/ows", namespace)),
            layer.to_string(),
        )),
        _ => Err(ExtractError::config(
            "layername",
            format!("{} is of unexpected format, has more than one ':'", layername),
        )),
    }
}

/// Output file name derived from a layer name
pub fn default_output_name(layername: &str) -> String {
    let stem: String = layername
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    format!("{}.geojsonl", stem)
}

/// Everything that defines one extraction
#[derive(Debug, Clone)]
pub struct ExtractJob {
    pub url: String,
    pub layername: String,
    pub service: Service,
    pub version: String,
    pub operation: Operation,
    pub mode: RetrievalMode,
    pub sort_key: Option<String>,
    pub out_srs: String,
    pub getmap_format: GetMapFormat,
    pub output: PathBuf,
    pub bounds: Envelope,
    pub max_box: Option<BoxDims>,
    pub skip_index: u64,
    pub batch_size: usize,
}

impl ExtractJob {
    /// Apply the combinations the services force.
    ///
    /// WFS only has `GetFeature`, and `GetFeatureInfo` cannot be index
    /// paged so it always runs in Extent mode.
    pub fn normalized(mut self) -> Self {
        if self.service == Service::Wfs && self.operation != Operation::GetFeature {
            tracing::info!("Using GetFeature for WFS retrieval, overriding {}", self.operation);
            self.operation = Operation::GetFeature;
        }
        if self.operation == Operation::GetFeatureInfo && self.mode != RetrievalMode::Extent {
            tracing::info!("Using GetFeatureInfo for retrieval, overriding mode to EXTENT");
            self.mode = RetrievalMode::Extent;
        }
        self
    }

    pub fn identity(&self) -> Identity {
        Identity {
            url: self.url.clone(),
            layername: self.layername.clone(),
            service: self.service,
            version: self.version.clone(),
            operation: self.operation,
            mode: self.mode,
        }
    }

    pub fn query(&self) -> QueryBuilder {
        QueryBuilder {
            service: self.service,
            version: self.version.clone(),
            operation: self.operation,
            layername: self.layername.clone(),
            out_srs: self.out_srs.clone(),
            sort_key: self.sort_key.clone(),
            getmap_format: self.getmap_format,
        }
    }

    pub fn state_path(&self) -> PathBuf {
        state_path_for(&self.output)
    }

    fn check(&self) -> Result<()> {
        if self.skip_index != 0 && self.mode != RetrievalMode::Offset {
            return Err(ExtractError::config(
                "skip_index",
                "skip index can't be used for non OFFSET based retrieval",
            ));
        }
        if self.batch_size == 0 {
            return Err(ExtractError::config("batch_size", "must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    pub output: PathBuf,
    /// Features written by this run
    pub written: u64,
    /// Whether the run continued from an existing state file
    pub resumed: bool,
}

/// Load or create the state for `job`.
///
/// Exactly one of the two files existing means one of them was deleted or
/// never written, and is refused.
fn open_state(job: &ExtractJob) -> Result<(State, bool)> {
    let state_path = job.state_path();
    match (state_path.exists(), job.output.exists()) {
        (true, false) => Err(ExtractError::InconsistentFiles {
            existing: state_path,
            missing: job.output.clone(),
        }),
        (false, true) => Err(ExtractError::InconsistentFiles {
            existing: job.output.clone(),
            missing: state_path,
        }),
        (true, true) => {
            tracing::info!("Found existing state file {}, resuming", state_path.display());
            Ok((State::load_file(&state_path)?, true))
        }
        (false, false) => Ok((State::create(job.identity(), job.sort_key.clone()), false)),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Run `job` to completion, calling `on_feature` with the running count of
/// features written.
///
/// On success the state file is removed. On failure both files are left as
/// they are so the same invocation can resume.
pub fn run<T: Transport>(
    job: &ExtractJob,
    client: &mut FeatureClient<T>,
    mut on_feature: impl FnMut(u64),
) -> Result<ExtractSummary> {
    job.check()?;
    let identity = job.identity();
    tracing::info!(
        "Working with url={} layername={} service={} operation={} mode={}",
        job.url,
        job.layername,
        job.service,
        job.operation,
        job.mode
    );

    let (mut state, resumed) = open_state(job)?;
    if resumed {
        match job.mode {
            RetrievalMode::Offset => {
                let line_count = count_lines(&job.output)?;
                state.reconcile_offset(&identity, job.sort_key.as_deref(), line_count)?;
            }
            RetrievalMode::Extent => state.check_identity(&identity)?,
        }
    }
    ensure_parent(&job.output)?;

    let keep_index = job.mode == RetrievalMode::Extent;
    let output = Rc::new(RefCell::new(JsonLinesFile::open(&job.output, keep_index)?));
    if !resumed {
        state.attach(&job.state_path())?;
    }

    let mut written = 0u64;
    let mut write = |feature: geojson::Feature| -> Result<()> {
        output.borrow_mut().write_feature(&feature)?;
        written += 1;
        on_feature(written);
        Ok(())
    };

    match job.mode {
        RetrievalMode::Offset => {
            if job.skip_index > 0 {
                tracing::info!("Skipping {} records", job.skip_index);
                state.update_offset(job.skip_index, 0)?;
            }

            for feature in OffsetPager::new(client, &mut state, job.batch_size) {
                write(feature?)?;
            }
        }
        RetrievalMode::Extent => {
            let mut ledger = DedupLedger::new(Rc::clone(&output));
            if resumed {
                let replayed = state.reconcile_extent(&identity, read_lines(&job.output)?, &mut ledger)?;
                tracing::info!("Replayed {} existing records into the dedup ledger", replayed);
            }

            let pager = ExtentPager::new(client, &mut state, &mut ledger, job.bounds, job.batch_size)
                .with_max_box(job.max_box);
            for feature in pager {
                write(feature?)?;
            }
        }
    }

    output.borrow_mut().sync()?;
    state.remove()?;
    tracing::info!("Done, wrote {} records to {}", written, job.output.display());

    Ok(ExtractSummary {
        output: job.output.clone(),
        written,
        resumed,
    })
}

/// Properties of a couple of unsorted records, to help pick a sort key
pub fn sample_properties<T: Transport>(client: &mut FeatureClient<T>) -> Result<Vec<Map<String, Value>>> {
    let features = client.get_features(2, None, false)?;
    Ok(features
        .into_iter()
        .map(|feature| feature.properties.unwrap_or_default())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geoserver_url_plain_layer() {
        let (url, layer) = service_url_for_geoserver("https://maps.example.org/geoserver", "roads").unwrap();
        assert_eq!(url, "https://maps.example.org/geoserver/ows");
        assert_eq!(layer, "roads");
    }

    #[test]
    fn test_geoserver_url_namespaced_layer() {
        let (url, layer) = service_url_for_geoserver("https://maps.example.org/geoserver/", "india:roads").unwrap();
        assert_eq!(url, "https://maps.example.org/geoserver/india/ows");
        assert_eq!(layer, "roads");

        assert!(service_url_for_geoserver("https://x", "a:b:c").is_err());
    }

    #[test]
    fn test_default_output_name() {
        assert_eq!(default_output_name("india:roads v2"), "india_roads_v2.geojsonl");
        assert_eq!(default_output_name("plain-name_1"), "plain-name_1.geojsonl");
    }

    fn job() -> ExtractJob {
        ExtractJob {
            url: "https://maps.example.org/ows".to_string(),
            layername: "roads".to_string(),
            service: Service::Wfs,
            version: "1.0.0".to_string(),
            operation: Operation::GetMap,
            mode: RetrievalMode::Offset,
            sort_key: None,
            out_srs: "EPSG:4326".to_string(),
            getmap_format: GetMapFormat::GeoRss,
            output: PathBuf::from("roads.geojsonl"),
            bounds: Envelope::new(-180.0, -90.0, 180.0, 90.0).unwrap(),
            max_box: None,
            skip_index: 0,
            batch_size: 10,
        }
    }

    #[test]
    fn test_normalized_forces_operation_and_mode() {
        let wfs = job().normalized();
        assert_eq!(wfs.operation, Operation::GetFeature);

        let mut info = job();
        info.service = Service::Wms;
        info.operation = Operation::GetFeatureInfo;
        let info = info.normalized();
        assert_eq!(info.mode, RetrievalMode::Extent);
    }

    #[test]
    fn test_skip_index_requires_offset_mode() {
        let mut extent = job();
        extent.mode = RetrievalMode::Extent;
        extent.skip_index = 5;
        assert!(matches!(extent.check(), Err(ExtractError::ConfigInvalid { .. })));
    }
}
