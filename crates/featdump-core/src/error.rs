//! Error types for featdump

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Server-reported conditions recognized inside an OGC exception envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerErrorKind {
    /// Natural ordering needs a primary key the layer does not have
    SortKeyRequired,
    /// The supplied sort key is not a property of the layer
    InvalidSortKey,
    /// The endpoint does not serve the requested service at all
    ServiceUnsupported,
    /// WFS is switched off on the endpoint
    WfsUnsupported,
    /// GetMap cannot produce KML
    KmlUnsupported,
    /// GetMap cannot produce GeoRSS
    GeoRssUnsupported,
    /// The layer is not published on the endpoint
    LayerMissing,
    /// The request bounding box collapsed to zero area
    ZeroArea,
}

impl fmt::Display for ServerErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerErrorKind::SortKeyRequired => "sort key required",
            ServerErrorKind::InvalidSortKey => "invalid sort key",
            ServerErrorKind::ServiceUnsupported => "service unsupported",
            ServerErrorKind::WfsUnsupported => "WFS unsupported",
            ServerErrorKind::KmlUnsupported => "KML unsupported",
            ServerErrorKind::GeoRssUnsupported => "GeoRSS unsupported",
            ServerErrorKind::LayerMissing => "layer missing",
            ServerErrorKind::ZeroArea => "zero area bounding box",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    // Server errors
    #[error("Server rejected the request ({kind}): {message}")]
    Server {
        kind: ServerErrorKind,
        message: String,
    },

    #[error("Server exception: {0}")]
    ServerException(String),

    // Transport errors
    #[error("Request failed with status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ExtractError>,
    },

    // Decoding errors
    #[error("Failed to decode {format} response: {reason}")]
    Decode { format: String, reason: String },

    // State errors
    #[error("State file is invalid: {0}")]
    StateValidation(String),

    #[error("State not in sync: {0}")]
    StateMismatch(String),

    #[error("{existing} exists but {missing} does not. Delete the existing file to proceed")]
    InconsistentFiles { existing: PathBuf, missing: PathBuf },

    #[error("Operation requires {expected} mode but state is in {actual} mode")]
    ModeMismatch { expected: String, actual: String },

    // Configuration errors
    #[error("Invalid configuration value for {key}: {reason}")]
    ConfigInvalid { key: String, reason: String },

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ExtractError {
    /// Classified server kind, looking through retry exhaustion
    pub fn kind(&self) -> Option<ServerErrorKind> {
        match self {
            ExtractError::Server { kind, .. } => Some(*kind),
            ExtractError::RetriesExhausted { source, .. } => source.kind(),
            _ => None,
        }
    }

    /// Whether the failure is worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExtractError::Network(_) | ExtractError::HttpStatus { .. }
        )
    }

    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        ExtractError::ConfigInvalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(e: serde_json::Error) -> Self {
        ExtractError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_through_retries() {
        let err = ExtractError::RetriesExhausted {
            attempts: 3,
            source: Box::new(ExtractError::Server {
                kind: ServerErrorKind::LayerMissing,
                message: "no such layer".to_string(),
            }),
        };
        assert_eq!(err.kind(), Some(ServerErrorKind::LayerMissing));
        assert_eq!(ExtractError::Network("reset".into()).kind(), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(ExtractError::Network("timeout".into()).is_transient());
        assert!(ExtractError::HttpStatus { status: 503, body: String::new() }.is_transient());
        assert!(!ExtractError::ServerException("boom".into()).is_transient());
        assert!(!ExtractError::StateValidation("bad".into()).is_transient());
    }
}
