pub mod crs;
pub mod envelope;
pub mod service;

pub use crs::{bounds_for_crs, parse_bounds, parse_box_dims};
pub use envelope::{BoxDims, Envelope};
pub use service::{GetMapFormat, Operation, RetrievalMode, Service};
