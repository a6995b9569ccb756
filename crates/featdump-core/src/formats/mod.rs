//! Response decoders for the wire formats served by WMS/WFS endpoints.
//!
//! The set of formats is closed: a [`Decoder`] is chosen once from the
//! service, operation and GetMap format, and every response of the run is
//! decoded through it. Each decoder recognizes OGC exception documents and
//! turns them into classified errors.

use ::geojson::Feature;

use crate::error::Result;
use crate::models::{GetMapFormat, Operation};

pub mod exception;
pub mod geojson;
pub mod georss;
pub mod html;
pub mod kml;

pub use exception::{check_exception, classify_message, exception_message};
pub use html::props_from_html;

/// Wire format decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    GeoJson,
    GeoRss,
    Kml { strip_points: bool },
}

impl Decoder {
    /// Decoder matching the responses of `operation`
    pub fn for_operation(operation: Operation, format: GetMapFormat, strip_points: bool) -> Self {
        match (operation, format) {
            (Operation::GetFeature | Operation::GetFeatureInfo, _) => Decoder::GeoJson,
            (Operation::GetMap, GetMapFormat::GeoRss) => Decoder::GeoRss,
            (Operation::GetMap, GetMapFormat::Kml) => Decoder::Kml { strip_points },
        }
    }

    /// Decode a response body into features
    pub fn decode(&self, text: &str) -> Result<Vec<Feature>> {
        match self {
            Decoder::GeoJson => geojson::decode(text),
            Decoder::GeoRss => georss::decode(text),
            Decoder::Kml { strip_points } => kml::decode(text, *strip_points),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Decoder::GeoJson => "GeoJSON",
            Decoder::GeoRss => "GeoRSS",
            Decoder::Kml { .. } => "KML",
        }
    }
}
