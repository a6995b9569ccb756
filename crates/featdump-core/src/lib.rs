//! featdump core - resumable bulk extraction of vector features from OGC
//! WMS/WFS endpoints
//!
//! This crate contains the request builders, response decoders, pagers,
//! durable state and output handling used by the `featdump` CLI.

pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod formats;
pub mod geo;
pub mod ledger;
pub mod models;
pub mod output;
pub mod pager;
pub mod request;
pub mod state;
pub mod transport;

pub use client::FeatureClient;
pub use error::{ExtractError, Result, ServerErrorKind};
pub use extract::{ExtractJob, ExtractSummary};
pub use state::State;
