//! Simulated feature server shared by the extraction tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use featdump_core::client::FeatureClient;
use featdump_core::extract::ExtractJob;
use featdump_core::models::{Envelope, GetMapFormat, Operation, RetrievalMode, Service};
use featdump_core::transport::Transport;
use featdump_core::{ExtractError, Result};

pub type Query = Vec<(&'static str, String)>;

/// Point layer answering WFS GetFeature requests.
///
/// Unbounded requests page through the points in id order with
/// `startIndex`; bounded requests return the first `maxFeatures` points
/// inside the (inclusive) bbox.
pub struct SimServer {
    points: Vec<(u32, f64, f64)>,
    pub log: RefCell<Vec<Query>>,
    fail_on: Cell<Option<usize>>,
    zero_area: Option<[f64; 4]>,
}

impl SimServer {
    pub fn new(points: Vec<(u32, f64, f64)>) -> Self {
        Self {
            points,
            log: RefCell::new(Vec::new()),
            fail_on: Cell::new(None),
            zero_area: None,
        }
    }

    /// `count` points on the x axis
    pub fn line(count: u32) -> Self {
        Self::new((0..count).map(|i| (i, f64::from(i), 0.0)).collect())
    }

    /// 7 x 5 grid, several points on the quadrant split lines
    pub fn grid() -> Self {
        let xs = [-150.0, -90.0, -30.0, 0.0, 30.0, 90.0, 150.0];
        let ys = [-60.0, -30.0, 0.0, 30.0, 60.0];
        let mut points = Vec::new();
        let mut id = 0;
        for y in ys {
            for x in xs {
                points.push((id, x, y));
                id += 1;
            }
        }
        Self::new(points)
    }

    /// Fail the `n`th request (1-based) with a network error
    pub fn fail_on(self, n: usize) -> Self {
        self.fail_on.set(Some(n));
        self
    }

    /// Answer a request for exactly this bbox with a zero-area exception
    pub fn zero_area_for(mut self, bbox: [f64; 4]) -> Self {
        self.zero_area = Some(bbox);
        self
    }

    pub fn requests(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn param(query: &Query, key: &str) -> Option<String> {
        query.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    }

    pub fn bbox_of(query: &Query) -> Option<[f64; 4]> {
        let text = Self::param(query, "bbox")?;
        let n: Vec<f64> = text
            .split(',')
            .take(4)
            .map(|part| part.trim().parse().unwrap())
            .collect();
        Some([n[0], n[1], n[2], n[3]])
    }

    fn feature_json(&self, (id, x, y): (u32, f64, f64)) -> serde_json::Value {
        serde_json::json!({
            "type": "Feature",
            "id": format!("points.{}", id),
            "geometry": {"type": "Point", "coordinates": [x, y]},
            "properties": {"n": id}
        })
    }
}

impl Transport for SimServer {
    fn request(&self, query: &[(&'static str, String)]) -> Result<String> {
        let query = query.to_vec();
        self.log.borrow_mut().push(query.clone());

        if self.fail_on.get() == Some(self.requests()) {
            return Err(ExtractError::Network("connection reset by peer".to_string()));
        }

        let max: usize = Self::param(&query, "maxFeatures")
            .or_else(|| Self::param(&query, "count"))
            .map(|v| v.parse().unwrap())
            .unwrap_or(usize::MAX);

        let selected: Vec<(u32, f64, f64)> = match Self::bbox_of(&query) {
            Some(bbox) => {
                if Some(bbox) == self.zero_area {
                    return Ok(concat!(
                        "<?xml version=\"1.0\" ?>",
                        "<ServiceExceptionReport version=\"1.2.0\">",
                        "<ServiceException>The request bounding box has zero area: ",
                        "ReferencedEnvelope[0.0 : 0.0, 0.0 : 0.0]</ServiceException>",
                        "</ServiceExceptionReport>"
                    )
                    .to_string());
                }
                self.points
                    .iter()
                    .copied()
                    .filter(|(_, x, y)| {
                        *x >= bbox[0] && *x <= bbox[2] && *y >= bbox[1] && *y <= bbox[3]
                    })
                    .take(max)
                    .collect()
            }
            None => {
                let start: usize = Self::param(&query, "startIndex")
                    .map(|v| v.parse().unwrap())
                    .unwrap_or(0);
                self.points.iter().copied().skip(start).take(max).collect()
            }
        };

        let features: Vec<serde_json::Value> =
            selected.into_iter().map(|p| self.feature_json(p)).collect();
        Ok(serde_json::json!({"type": "FeatureCollection", "features": features}).to_string())
    }
}

pub fn job(output: &Path, mode: RetrievalMode, batch_size: usize) -> ExtractJob {
    ExtractJob {
        url: "https://maps.example.org/geoserver/ows".to_string(),
        layername: "points".to_string(),
        service: Service::Wfs,
        version: "1.0.0".to_string(),
        operation: Operation::GetFeature,
        mode,
        sort_key: Some("n".to_string()),
        out_srs: "EPSG:4326".to_string(),
        getmap_format: GetMapFormat::GeoRss,
        output: output.to_path_buf(),
        bounds: Envelope::new(-180.0, -90.0, 180.0, 90.0).unwrap(),
        max_box: None,
        skip_index: 0,
        batch_size,
    }
}

pub fn client<'a>(server: &'a SimServer, job: &ExtractJob) -> FeatureClient<&'a SimServer> {
    FeatureClient::new(server, job.query(), job.bounds)
}

pub fn read_output(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Ids of the features in an output file, in file order
pub fn output_ids(path: &Path) -> Vec<u64> {
    read_output(path)
        .iter()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            value["properties"]["n"].as_u64().unwrap()
        })
        .collect()
}

pub fn state_path(output: &Path) -> PathBuf {
    featdump_core::state::state_path_for(output)
}
