//! Pagers turn a feature client plus persisted progress into a flat,
//! resumable stream of features.

pub mod extent;
pub mod offset;

pub use extent::ExtentPager;
pub use offset::OffsetPager;
