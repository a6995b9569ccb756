//! Geometry post-processing applied to decoded features.

pub mod collection;
pub mod truncate;

pub use collection::normalize_collection;
pub use truncate::{truncate_feature, truncate_geometry};
