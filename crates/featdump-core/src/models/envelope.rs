//! Axis-aligned envelopes and their quadtree subdivision.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, Result};

/// Axis-aligned bounding box in the output CRS
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

/// Largest box size a server is asked for in one request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxDims {
    pub deltax: f64,
    pub deltay: f64,
}

impl Envelope {
    /// Create an envelope, rejecting inverted or non-finite bounds
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Result<Self> {
        let finite = [xmin, ymin, xmax, ymax].iter().all(|v| v.is_finite());
        if !finite || xmin > xmax || ymin > ymax {
            return Err(ExtractError::config(
                "bounds",
                format!(
                    "Invalid envelope ({}, {}, {}, {}): expected finite xmin <= xmax and ymin <= ymax",
                    xmin, ymin, xmax, ymax
                ),
            ));
        }
        Ok(Self { xmin, ymin, xmax, ymax })
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether the box is larger than `max` along either axis
    pub fn exceeds(&self, max: &BoxDims) -> bool {
        self.width() > max.deltax || self.height() > max.deltay
    }

    /// Split into four quadrants at the axis midpoints.
    ///
    /// Order is fixed: bottom-left, top-right, bottom-right, top-left. The
    /// quadrant at index `i` is the child reached by appending `i` to the
    /// parent's quadrant key, so the order must never change between runs.
    pub fn split(&self) -> [Envelope; 4] {
        let mid_x = self.xmin + self.width() / 2.0;
        let mid_y = self.ymin + self.height() / 2.0;

        [
            Envelope { xmin: self.xmin, ymin: self.ymin, xmax: mid_x, ymax: mid_y },
            Envelope { xmin: mid_x, ymin: mid_y, xmax: self.xmax, ymax: self.ymax },
            Envelope { xmin: mid_x, ymin: self.ymin, xmax: self.xmax, ymax: mid_y },
            Envelope { xmin: self.xmin, ymin: mid_y, xmax: mid_x, ymax: self.ymax },
        ]
    }

    /// Render as an OGC `bbox` parameter, optionally suffixed with a CRS
    pub fn to_bbox_string(&self, crs: Option<&str>) -> String {
        let mut bbox = format!("{}, {}, {}, {}", self.xmin, self.ymin, self.xmax, self.ymax);
        if let Some(crs) = crs {
            bbox.push_str(", ");
            bbox.push_str(crs);
        }
        bbox
    }
}
