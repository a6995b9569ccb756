//! GeoJSON decoding for WFS GetFeature and WMS GetFeatureInfo responses.

use geojson::{Feature, GeoJson};

use super::exception::check_exception;
use crate::error::{ExtractError, Result};

/// Decode a FeatureCollection (or a lone Feature) into features.
///
/// Servers answer errors with an XML exception document, so a body that is
/// not GeoJSON is checked for one before reporting a decode failure.
pub fn decode(text: &str) -> Result<Vec<Feature>> {
    let geojson = match text.parse::<GeoJson>() {
        Ok(geojson) => geojson,
        Err(e) => {
            check_exception(text)?;
            tracing::debug!("Unparseable response: {}", text);
            return Err(ExtractError::Decode {
                format: "GeoJSON".to_string(),
                reason: e.to_string(),
            });
        }
    };

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection.features),
        GeoJson::Feature(feature) => Ok(vec![feature]),
        GeoJson::Geometry(_) => Err(ExtractError::Decode {
            format: "GeoJSON".to_string(),
            reason: "expected a FeatureCollection, got a bare geometry".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerErrorKind;
    use geojson::Value;

    #[test]
    fn test_feature_collection() {
        let text = r#"{
            "type": "FeatureCollection",
            "totalFeatures": 2,
            "features": [
                {"type": "Feature", "id": "roads.1", "geometry": {"type": "Point", "coordinates": [77.5, 12.9]}, "properties": {"name": "a"}},
                {"type": "Feature", "id": "roads.2", "geometry": null, "properties": {"name": "b"}}
            ],
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::4326"}}
        }"#;

        let features = decode(text).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(
            features[0].geometry.as_ref().unwrap().value,
            Value::Point(vec![77.5, 12.9])
        );
        assert!(features[1].geometry.is_none());
    }

    #[test]
    fn test_sort_key_exception() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows" version="1.0.0">
  <ows:Exception exceptionCode="NoApplicableCode">
    <ows:ExceptionText>Cannot do natural order without a primary key, please add it or specify a manual sort over existing attributes</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#;

        assert_eq!(
            decode(text).unwrap_err().kind(),
            Some(ServerErrorKind::SortKeyRequired)
        );
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            decode("<html>Bad gateway</html>"),
            Err(ExtractError::Decode { .. })
        ));
    }
}
