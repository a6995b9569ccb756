//! Durable extraction progress, persisted write-through to a side-car file.
//!
//! The state file is a flat JSON object: the identity of the run (`url`,
//! `layername`, `service`, `version`, `operation`, `mode`) plus either the
//! offset counters or the `explored_tree` map of quadrant key to status.
//! Every update rewrites the whole file before returning, so the file always
//! reflects the last completed unit of work.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::error::{ExtractError, Result};
use crate::ledger::{DedupLedger, LineSource};
use crate::models::{Operation, RetrievalMode, Service};

static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("invalid version pattern"));

static QUADRANT_KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-3]+$").expect("invalid quadrant key pattern"));

/// Key of the root envelope in the explored tree
pub const ROOT_KEY: &str = "0";

/// Side-car state file path for an output file
pub fn state_path_for(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(".state");
    PathBuf::from(name)
}

/// What makes two runs the same extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub url: String,
    pub layername: String,
    pub service: Service,
    pub version: String,
    pub operation: Operation,
    pub mode: RetrievalMode,
}

/// Exploration status of one quadrant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Exploration {
    /// Never attempted
    NotPresent = 0,
    /// Requested and found full, children still to visit
    Open = 1,
    /// Fully covered, never visited again
    Explored = 2,
}

impl TryFrom<u8> for Exploration {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Exploration::NotPresent),
            1 => Ok(Exploration::Open),
            2 => Ok(Exploration::Explored),
            other => Err(format!("invalid exploration status {}", other)),
        }
    }
}

impl From<Exploration> for u8 {
    fn from(value: Exploration) -> Self {
        value as u8
    }
}

/// Counters of an offset-paged run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OffsetProgress {
    /// Next start index to request
    pub index_done_till: u64,
    /// Features written to the output so far
    pub downloaded_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    Offset {
        sort_key: Option<String>,
        progress: OffsetProgress,
    },
    Extent {
        explored_tree: BTreeMap<String, Exploration>,
    },
}

#[derive(Serialize, Deserialize)]
struct OffsetRecord {
    #[serde(flatten)]
    identity: Identity,
    sort_key: Option<String>,
    index_done_till: u64,
    downloaded_count: u64,
}

#[derive(Serialize, Deserialize)]
struct ExtentRecord {
    #[serde(flatten)]
    identity: Identity,
    explored_tree: BTreeMap<String, Exploration>,
}

/// Progress of one extraction run
#[derive(Debug, Clone)]
pub struct State {
    identity: Identity,
    progress: Progress,
    path: Option<PathBuf>,
}

impl State {
    /// Fresh state with no progress, not yet bound to a file
    pub fn create(identity: Identity, sort_key: Option<String>) -> Self {
        let progress = match identity.mode {
            RetrievalMode::Offset => Progress::Offset {
                sort_key,
                progress: OffsetProgress::default(),
            },
            RetrievalMode::Extent => Progress::Extent {
                explored_tree: BTreeMap::new(),
            },
        };
        Self {
            identity,
            progress,
            path: None,
        }
    }

    /// Parse and schema-validate a persisted state record
    pub fn load(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ExtractError::StateValidation(format!("not valid JSON: {}", e)))?;
        validate_schema(&value)?;

        let invalid = |e: serde_json::Error| ExtractError::StateValidation(e.to_string());
        let identity: Identity = serde_json::from_value(value.clone()).map_err(invalid)?;

        let progress = match identity.mode {
            RetrievalMode::Offset => {
                let record: OffsetRecord = serde_json::from_value(value).map_err(invalid)?;
                Progress::Offset {
                    sort_key: record.sort_key,
                    progress: OffsetProgress {
                        index_done_till: record.index_done_till,
                        downloaded_count: record.downloaded_count,
                    },
                }
            }
            RetrievalMode::Extent => {
                let record: ExtentRecord = serde_json::from_value(value).map_err(invalid)?;
                Progress::Extent {
                    explored_tree: record.explored_tree,
                }
            }
        };

        Ok(Self {
            identity,
            progress,
            path: None,
        })
    }

    /// Read and validate the state file at `path`, binding to it
    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut state = Self::load(&text)?;
        state.path = Some(path.to_path_buf());
        Ok(state)
    }

    /// Bind to `path` and persist immediately
    pub fn attach(&mut self, path: &Path) -> Result<()> {
        self.path = Some(path.to_path_buf());
        self.save()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    /// Offset counters, `None` in Extent mode
    pub fn offset(&self) -> Option<OffsetProgress> {
        match &self.progress {
            Progress::Offset { progress, .. } => Some(*progress),
            Progress::Extent { .. } => None,
        }
    }

    pub fn sort_key(&self) -> Option<&str> {
        match &self.progress {
            Progress::Offset { sort_key, .. } => sort_key.as_deref(),
            Progress::Extent { .. } => None,
        }
    }

    /// Status of a quadrant, `NotPresent` when absent or in Offset mode
    pub fn status(&self, key: &str) -> Exploration {
        match &self.progress {
            Progress::Extent { explored_tree } => explored_tree
                .get(key)
                .copied()
                .unwrap_or(Exploration::NotPresent),
            Progress::Offset { .. } => Exploration::NotPresent,
        }
    }

    /// Refuse to resume a different extraction
    pub fn check_identity(&self, expected: &Identity) -> Result<()> {
        let ours = &self.identity;
        let mismatch = |field: &str, stored: &dyn std::fmt::Display, wanted: &dyn std::fmt::Display| {
            Err(ExtractError::StateMismatch(format!(
                "state {}:{} not the same as invocation {}:{}",
                field, stored, field, wanted
            )))
        };

        if ours.url != expected.url {
            return mismatch("url", &ours.url, &expected.url);
        }
        if ours.layername != expected.layername {
            return mismatch("layername", &ours.layername, &expected.layername);
        }
        if ours.service != expected.service {
            return mismatch("service", &ours.service, &expected.service);
        }
        if ours.version != expected.version {
            return mismatch("version", &ours.version, &expected.version);
        }
        if ours.operation != expected.operation {
            return mismatch("operation", &ours.operation, &expected.operation);
        }
        if ours.mode != expected.mode {
            return mismatch("mode", &ours.mode, &expected.mode);
        }
        Ok(())
    }

    /// Check an Offset resume against the output already on disk.
    ///
    /// `line_count` must equal `downloaded_count` exactly.
    pub fn reconcile_offset(
        &self,
        expected: &Identity,
        sort_key: Option<&str>,
        line_count: u64,
    ) -> Result<()> {
        self.check_identity(expected)?;
        let Progress::Offset { sort_key: stored_key, progress } = &self.progress else {
            return Err(self.mode_mismatch(RetrievalMode::Offset));
        };

        if progress.downloaded_count != line_count {
            return Err(ExtractError::StateMismatch(format!(
                "downloaded records count in state ({}) doesn't match existing count ({})",
                progress.downloaded_count, line_count
            )));
        }
        if stored_key.as_deref() != sort_key {
            return Err(ExtractError::StateMismatch(format!(
                "sort_key in state ({}) doesn't match requested sort_key ({})",
                stored_key.as_deref().unwrap_or("none"),
                sort_key.unwrap_or("none")
            )));
        }
        Ok(())
    }

    /// Check an Extent resume and replay existing output into the ledger.
    ///
    /// Lines are recorded without comparison and nothing is emitted. No
    /// count check is made: quadrant status defines progress.
    pub fn reconcile_extent<S, I>(
        &self,
        expected: &Identity,
        existing_lines: I,
        ledger: &mut DedupLedger<S>,
    ) -> Result<u64>
    where
        S: LineSource,
        I: IntoIterator<Item = Result<String>>,
    {
        self.check_identity(expected)?;
        if !matches!(self.progress, Progress::Extent { .. }) {
            return Err(self.mode_mismatch(RetrievalMode::Extent));
        }

        let mut replayed = 0;
        for line in existing_lines {
            ledger.record_existing(&line?);
            replayed += 1;
        }
        Ok(replayed)
    }

    /// Advance offset counters and persist
    pub fn update_offset(&mut self, index_delta: u64, downloaded_delta: u64) -> Result<()> {
        let mode_error = self.mode_mismatch(RetrievalMode::Offset);
        let Progress::Offset { progress, .. } = &mut self.progress else {
            return Err(mode_error);
        };
        progress.index_done_till += index_delta;
        progress.downloaded_count += downloaded_delta;
        self.save()
    }

    /// Record a quadrant status and persist.
    ///
    /// Status only moves forward: marking a key with a status at or below
    /// its current one is a no-op.
    pub fn mark(&mut self, key: &str, status: Exploration) -> Result<()> {
        let mode_error = self.mode_mismatch(RetrievalMode::Extent);
        let Progress::Extent { explored_tree } = &mut self.progress else {
            return Err(mode_error);
        };

        let current = explored_tree
            .get(key)
            .copied()
            .unwrap_or(Exploration::NotPresent);
        if status <= current {
            return Ok(());
        }
        explored_tree.insert(key.to_string(), status);
        self.save()
    }

    /// Serialize the whole record
    pub fn to_json(&self) -> Result<String> {
        let identity = self.identity.clone();
        let text = match &self.progress {
            Progress::Offset { sort_key, progress } => serde_json::to_string(&OffsetRecord {
                identity,
                sort_key: sort_key.clone(),
                index_done_till: progress.index_done_till,
                downloaded_count: progress.downloaded_count,
            })?,
            Progress::Extent { explored_tree } => serde_json::to_string(&ExtentRecord {
                identity,
                explored_tree: explored_tree.clone(),
            })?,
        };
        Ok(text)
    }

    /// Rewrite the state file, if bound to one
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut tmp = path.as_os_str().to_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, self.to_json()?)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Delete the state file after a completed run
    pub fn remove(self) -> Result<()> {
        if let Some(path) = &self.path {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    fn mode_mismatch(&self, expected: RetrievalMode) -> ExtractError {
        ExtractError::ModeMismatch {
            expected: expected.to_string(),
            actual: self.identity.mode.to_string(),
        }
    }
}

/// Validate a raw record against the schema selected by its `mode`
pub fn validate_schema(value: &Value) -> Result<()> {
    let fail = |reason: String| Err(ExtractError::StateValidation(reason));

    let Some(object) = value.as_object() else {
        return fail("state is not a JSON object".to_string());
    };

    let mode = match object.get("mode").and_then(Value::as_str) {
        Some("OFFSET") => RetrievalMode::Offset,
        Some("EXTENT") => RetrievalMode::Extent,
        other => return fail(format!("mode={:?} not supported", other)),
    };

    let mut required = vec!["url", "layername", "service", "version", "operation", "mode"];
    match mode {
        RetrievalMode::Offset => {
            required.extend(["sort_key", "index_done_till", "downloaded_count"])
        }
        RetrievalMode::Extent => required.push("explored_tree"),
    }
    if let Some(missing) = required.iter().find(|k| !object.contains_key(**k)) {
        return fail(format!("'{}' is a required property", missing));
    }

    for key in ["url", "layername", "service", "version", "operation"] {
        if !object[key].is_string() {
            return fail(format!("'{}' must be a string", key));
        }
    }

    let service = object["service"].as_str().unwrap_or_default();
    if service != "WFS" && service != "WMS" {
        return fail(format!("'{}' does not match 'WFS|WMS'", service));
    }

    let version = object["version"].as_str().unwrap_or_default();
    if !VERSION_PATTERN.is_match(version) {
        return fail(format!("'{}' is not a version of the form x.y.z", version));
    }

    let operation = object["operation"].as_str().unwrap_or_default();
    if !matches!(operation, "GetMap" | "GetFeatureInfo" | "GetFeature") {
        return fail(format!(
            "'{}' does not match 'GetMap|GetFeatureInfo|GetFeature'",
            operation
        ));
    }

    match mode {
        RetrievalMode::Offset => {
            let sort_key = &object["sort_key"];
            if !(sort_key.is_string() || sort_key.is_null()) {
                return fail("'sort_key' must be a string or null".to_string());
            }
            for key in ["index_done_till", "downloaded_count"] {
                if object[key].as_u64().is_none() {
                    return fail(format!("'{}' must be a non-negative integer", key));
                }
            }
        }
        RetrievalMode::Extent => {
            let Some(tree) = object["explored_tree"].as_object() else {
                return fail("'explored_tree' must be an object".to_string());
            };
            for (key, status) in tree {
                if !QUADRANT_KEY_PATTERN.is_match(key) {
                    return fail(format!("quadrant key '{}' does not match ^[0-3]+$", key));
                }
                if !matches!(status.as_u64(), Some(0..=2)) {
                    return fail(format!("status of '{}' must be 0, 1 or 2, got {}", key, status));
                }
            }
        }
    }

    Ok(())
}
