//! Known CRS extents and parsing of user supplied boxes.

use super::envelope::{BoxDims, Envelope};
use crate::error::{ExtractError, Result};

const MERCATOR_LIMIT: f64 = 20037508.342789244;

/// Full extent of a CRS, used as the root envelope
pub fn bounds_for_crs(crs: &str) -> Result<Envelope> {
    let code = crs.rsplit(':').next().unwrap_or(crs);
    match code {
        "4326" | "84" | "CRS84" => Envelope::new(-180.0, -90.0, 180.0, 90.0),
        "3857" | "900913" | "3785" | "102100" => {
            Envelope::new(-MERCATOR_LIMIT, -MERCATOR_LIMIT, MERCATOR_LIMIT, MERCATOR_LIMIT)
        }
        _ => Err(ExtractError::config(
            "bounds",
            format!("No known bounds for {}. Pass explicit bounds instead", crs),
        )),
    }
}

fn parse_numbers(key: &str, s: &str, expected: usize, format_hint: &str) -> Result<Vec<f64>> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != expected {
        return Err(ExtractError::config(
            key,
            format!("'{}' does not have {} parts, expected: {}", s, expected, format_hint),
        ));
    }

    parts
        .iter()
        .map(|part| {
            part.trim().parse::<f64>().map_err(|_| {
                ExtractError::config(key, format!("not a number: {}, expected floating point", part))
            })
        })
        .collect()
}

/// Parse `xmin,ymin,xmax,ymax` and check it lies inside the CRS extent
pub fn parse_bounds(s: &str, crs: &str) -> Result<Envelope> {
    let n = parse_numbers("bounds", s, 4, "<xmin>,<ymin>,<xmax>,<ymax>")?;
    let global = bounds_for_crs(crs)?;

    let check = |name: &str, value: f64, lo: f64, hi: f64| {
        if value < lo || value > hi {
            return Err(ExtractError::config(
                "bounds",
                format!("Invalid {}: {}, expected value between {} and {}", name, value, lo, hi),
            ));
        }
        Ok(())
    };
    check("xmin", n[0], global.xmin, global.xmax)?;
    check("ymin", n[1], global.ymin, global.ymax)?;
    check("xmax", n[2], global.xmin, global.xmax)?;
    check("ymax", n[3], global.ymin, global.ymax)?;

    Envelope::new(n[0], n[1], n[2], n[3])
}

/// Parse `deltax,deltay`, both strictly positive
pub fn parse_box_dims(s: &str) -> Result<BoxDims> {
    let n = parse_numbers("max_box_dims", s, 2, "<deltax>,<deltay>")?;
    if n.iter().any(|v| *v <= 0.0 || !v.is_finite()) {
        return Err(ExtractError::config(
            "max_box_dims",
            format!("'{}' must contain positive non-zero numbers", s),
        ));
    }
    Ok(BoxDims { deltax: n[0], deltay: n[1] })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_crs_bounds() {
        let wgs84 = bounds_for_crs("EPSG:4326").unwrap();
        assert_eq!(wgs84.xmin, -180.0);
        assert_eq!(wgs84.ymax, 90.0);

        let mercator = bounds_for_crs("EPSG:3857").unwrap();
        assert_eq!(mercator.xmax, MERCATOR_LIMIT);

        assert!(bounds_for_crs("EPSG:32643").is_err());
    }

    #[test]
    fn test_parse_bounds() {
        let env = parse_bounds("68.1, 6.5, 97.4, 35.7", "EPSG:4326").unwrap();
        assert_eq!(env.xmin, 68.1);
        assert_eq!(env.ymax, 35.7);

        assert!(parse_bounds("68.1,6.5,97.4", "EPSG:4326").is_err());
        assert!(parse_bounds("a,6.5,97.4,35.7", "EPSG:4326").is_err());
        assert!(parse_bounds("-200,6.5,97.4,35.7", "EPSG:4326").is_err());
        assert!(parse_bounds("97.4,6.5,68.1,35.7", "EPSG:4326").is_err());
    }

    #[test]
    fn test_parse_box_dims() {
        let dims = parse_box_dims("1.5,2").unwrap();
        assert_eq!(dims.deltax, 1.5);
        assert_eq!(dims.deltay, 2.0);

        assert!(parse_box_dims("0,2").is_err());
        assert!(parse_box_dims("-1,2").is_err());
        assert!(parse_box_dims("1,2,3").is_err());
    }
}
