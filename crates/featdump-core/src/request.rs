//! OGC request parameter builders.

use crate::models::{Envelope, GetMapFormat, Operation, Service};
use crate::transport::Query;

/// Pixel size of the virtual map used by GetMap and GetFeatureInfo
const MAP_SIZE: u32 = 256;

/// Builds the query string of every request issued for one layer
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    pub service: Service,
    pub version: String,
    pub operation: Operation,
    pub layername: String,
    pub out_srs: String,
    pub sort_key: Option<String>,
    pub getmap_format: GetMapFormat,
}

impl QueryBuilder {
    /// Operation used for unbounded, index-paged requests
    pub fn paged_operation(&self) -> Operation {
        match self.service {
            Service::Wfs => Operation::GetFeature,
            Service::Wms => Operation::GetMap,
        }
    }

    /// Parameters for an index-paged request.
    ///
    /// `start_index: None` omits the index and `sort: false` omits the sort
    /// key, both used when sampling records for diagnostics.
    pub fn paged(
        &self,
        count: usize,
        start_index: Option<u64>,
        sort: bool,
        bounds: &Envelope,
    ) -> Query {
        match self.service {
            Service::Wfs => self.get_feature(count, None, start_index, sort),
            Service::Wms => self.get_map(count, bounds, start_index, sort),
        }
    }

    /// Parameters for a request restricted to `envelope`
    pub fn bounded(&self, count: usize, envelope: &Envelope) -> Query {
        match self.operation {
            Operation::GetFeature => self.get_feature(count, Some(envelope), None, false),
            Operation::GetMap => self.get_map(count, envelope, None, false),
            Operation::GetFeatureInfo => self.get_feature_info(count, envelope),
        }
    }

    fn get_feature(
        &self,
        count: usize,
        envelope: Option<&Envelope>,
        start_index: Option<u64>,
        sort: bool,
    ) -> Query {
        let mut query: Query = vec![
            ("service", Service::Wfs.to_string()),
            ("version", self.version.clone()),
            ("request", "GetFeature".to_string()),
            ("typeName", self.layername.clone()),
            ("outputFormat", "application/json".to_string()),
            ("srsName", self.out_srs.clone()),
        ];
        if let Some(index) = start_index {
            query.push(("startIndex", index.to_string()));
        }

        let count_key = if self.version == "2.0.0" { "count" } else { "maxFeatures" };
        query.push((count_key, count.to_string()));

        if sort {
            if let Some(key) = &self.sort_key {
                query.push(("sortBy", key.clone()));
            }
        }
        if let Some(envelope) = envelope {
            query.push(("bbox", envelope.to_bbox_string(Some(&self.out_srs))));
        }
        query
    }

    fn get_map(
        &self,
        count: usize,
        envelope: &Envelope,
        start_index: Option<u64>,
        sort: bool,
    ) -> Query {
        let mut query: Query = vec![
            ("service", Service::Wms.to_string()),
            ("version", self.version.clone()),
            ("request", "GetMap".to_string()),
            ("layers", self.layername.clone()),
            ("maxFeatures", count.to_string()),
            ("srs", self.out_srs.clone()),
            ("format", self.getmap_format.mime_type().to_string()),
            ("width", MAP_SIZE.to_string()),
            ("height", MAP_SIZE.to_string()),
            ("styles", String::new()),
            ("bbox", envelope.to_bbox_string(None)),
        ];
        if let Some(index) = start_index {
            query.push(("startIndex", index.to_string()));
        }
        if sort {
            if let Some(key) = &self.sort_key {
                query.push(("sortBy", key.clone()));
            }
        }
        query
    }

    /// Query the centre pixel with a buffer reaching the map corners
    fn get_feature_info(&self, count: usize, envelope: &Envelope) -> Query {
        let centre = MAP_SIZE / 2;
        let buffer = (f64::from(MAP_SIZE) / 2f64.sqrt()).ceil() as u32;

        vec![
            ("service", Service::Wms.to_string()),
            ("version", self.version.clone()),
            ("request", "GetFeatureInfo".to_string()),
            ("layers", self.layername.clone()),
            ("query_layers", self.layername.clone()),
            ("feature_count", count.to_string()),
            ("srs", self.out_srs.clone()),
            ("info_format", "application/json".to_string()),
            ("width", MAP_SIZE.to_string()),
            ("height", MAP_SIZE.to_string()),
            ("styles", String::new()),
            ("bbox", envelope.to_bbox_string(None)),
            ("x", centre.to_string()),
            ("y", centre.to_string()),
            ("buffer", buffer.to_string()),
        ]
    }
}
