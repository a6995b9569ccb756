//! OGC service vocabulary shared by requests, state and configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ExtractError;

/// OGC service used for extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "WMS")]
    Wms,
    #[serde(rename = "WFS")]
    Wfs,
}

impl Service {
    /// Protocol version used when none is given
    pub fn default_version(&self) -> &'static str {
        match self {
            Service::Wms => "1.1.1",
            Service::Wfs => "1.0.0",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Service::Wms => "WMS",
            Service::Wfs => "WFS",
        }
    }

    /// The other service, used when suggesting a fallback
    pub fn alternative(&self) -> Service {
        match self {
            Service::Wms => Service::Wfs,
            Service::Wfs => Service::Wms,
        }
    }
}

/// OGC operation issued against the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    GetMap,
    GetFeatureInfo,
    GetFeature,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetMap => "GetMap",
            Operation::GetFeatureInfo => "GetFeatureInfo",
            Operation::GetFeature => "GetFeature",
        }
    }
}

/// Pagination strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetrievalMode {
    /// Sequential numeric-offset paging
    #[serde(rename = "OFFSET")]
    Offset,
    /// Recursive spatial-extent subdivision
    #[serde(rename = "EXTENT")]
    Extent,
}

impl RetrievalMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalMode::Offset => "OFFSET",
            RetrievalMode::Extent => "EXTENT",
        }
    }
}

/// Response format requested from WMS GetMap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GetMapFormat {
    #[default]
    #[serde(rename = "GEORSS")]
    GeoRss,
    #[serde(rename = "KML")]
    Kml,
}

impl GetMapFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            GetMapFormat::GeoRss => "application/atom xml",
            GetMapFormat::Kml => "application/vnd.google-earth.kml+xml",
        }
    }
}

macro_rules! display_via_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_via_as_str!(Service, Operation, RetrievalMode);

impl FromStr for Service {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "WMS" => Ok(Service::Wms),
            "WFS" => Ok(Service::Wfs),
            _ => Err(ExtractError::config(
                "service",
                format!("Invalid service: {}. Use WMS or WFS", s),
            )),
        }
    }
}

impl FromStr for Operation {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "getmap" => Ok(Operation::GetMap),
            "getfeatureinfo" => Ok(Operation::GetFeatureInfo),
            "getfeature" => Ok(Operation::GetFeature),
            _ => Err(ExtractError::config(
                "operation",
                format!("Invalid operation: {}. Use GetMap, GetFeatureInfo or GetFeature", s),
            )),
        }
    }
}

impl FromStr for RetrievalMode {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "OFFSET" => Ok(RetrievalMode::Offset),
            "EXTENT" => Ok(RetrievalMode::Extent),
            _ => Err(ExtractError::config(
                "retrieval_mode",
                format!("Invalid retrieval mode: {}. Use OFFSET or EXTENT", s),
            )),
        }
    }
}

impl FromStr for GetMapFormat {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GEORSS" => Ok(GetMapFormat::GeoRss),
            "KML" => Ok(GetMapFormat::Kml),
            _ => Err(ExtractError::config(
                "getmap_format",
                format!("Invalid GetMap format: {}. Use GEORSS or KML", s),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!("wfs".parse::<Service>().unwrap(), Service::Wfs);
        assert_eq!("GETFEATUREINFO".parse::<Operation>().unwrap(), Operation::GetFeatureInfo);
        assert_eq!("extent".parse::<RetrievalMode>().unwrap(), RetrievalMode::Extent);
        assert_eq!("kml".parse::<GetMapFormat>().unwrap(), GetMapFormat::Kml);
        assert!("WCS".parse::<Service>().is_err());
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Service::Wms).unwrap(), "\"WMS\"");
        assert_eq!(serde_json::to_string(&RetrievalMode::Offset).unwrap(), "\"OFFSET\"");
        assert_eq!(serde_json::to_string(&Operation::GetFeature).unwrap(), "\"GetFeature\"");
    }

    #[test]
    fn test_default_versions() {
        assert_eq!(Service::Wms.default_version(), "1.1.1");
        assert_eq!(Service::Wfs.default_version(), "1.0.0");
    }
}
