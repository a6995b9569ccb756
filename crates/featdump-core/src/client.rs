//! Feature requests against one layer: build the query, fetch, decode and
//! truncate.

use geojson::Feature;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::Result;
use crate::formats::Decoder;
use crate::geo::truncate_feature;
use crate::geo::truncate::NO_TRUNCATION;
use crate::models::{Envelope, Operation};
use crate::request::QueryBuilder;
use crate::transport::{Pacer, Transport};

/// Environment variable naming a file that receives every raw response
pub const SAVE_RESPONSE_ENV: &str = "FEATDUMP_SAVE_RESPONSE_TO_FILE";

/// Issues feature requests for one layer
pub struct FeatureClient<T> {
    transport: T,
    query: QueryBuilder,
    bounds: Envelope,
    precision: i32,
    strip_points: bool,
    pacer: Pacer,
    save_responses_to: Option<PathBuf>,
}

impl<T: Transport> FeatureClient<T> {
    /// Client for `query`, with `bounds` used by unbounded GetMap requests
    pub fn new(transport: T, query: QueryBuilder, bounds: Envelope) -> Self {
        Self {
            transport,
            query,
            bounds,
            precision: NO_TRUNCATION,
            strip_points: false,
            pacer: Pacer::new(0, std::time::Duration::ZERO),
            save_responses_to: env::var_os(SAVE_RESPONSE_ENV).map(PathBuf::from),
        }
    }

    pub fn with_precision(mut self, precision: i32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_pacer(mut self, pacer: Pacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn with_kml_strip_points(mut self, strip_points: bool) -> Self {
        self.strip_points = strip_points;
        self
    }

    fn decoder(&self, operation: Operation) -> Decoder {
        Decoder::for_operation(operation, self.query.getmap_format, self.strip_points)
    }

    fn fetch(&mut self, query: &[(&'static str, String)], decoder: Decoder) -> Result<Vec<Feature>> {
        self.pacer.tick();
        tracing::debug!("Request parameters: {:?}", query);

        let text = self.transport.request(query)?;
        if let Some(path) = &self.save_responses_to {
            if let Err(e) = fs::write(path, &text) {
                tracing::debug!("Could not save response to {}: {}", path.display(), e);
            }
        }

        let mut features = decoder.decode(&text)?;
        for feature in features.iter_mut() {
            truncate_feature(feature, self.precision);
        }
        Ok(features)
    }

    /// Unbounded, index-paged request.
    ///
    /// Without a start index or sort this samples the first records of the
    /// layer, which is how a usable sort key is looked for.
    pub fn get_features(
        &mut self,
        count: usize,
        start_index: Option<u64>,
        sort: bool,
    ) -> Result<Vec<Feature>> {
        let query = self.query.paged(count, start_index, sort, &self.bounds);
        let decoder = self.decoder(self.query.paged_operation());
        self.fetch(&query, decoder)
    }

    /// Request restricted to `envelope`
    pub fn get_bounded_features(&mut self, envelope: &Envelope, count: usize) -> Result<Vec<Feature>> {
        let query = self.query.bounded(count, envelope);
        let decoder = self.decoder(self.query.operation);
        self.fetch(&query, decoder)
    }
}
