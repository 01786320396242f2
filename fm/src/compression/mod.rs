//! File compression
//!
//! [`CompressionSelector`] maps a file type to a [`BackendId`]; a
//! [`BackendSet`] holds the [`CompressionBackend`] implementations:
//!
//! - `specialized-image`: TinyPNG shrink API
//! - `specialized-document`: ConvertAPI compress endpoint
//! - `generic-archive`: local ZIP (also the fallback)

mod archive;
mod backend;
mod convertapi;
mod error;
mod selector;
mod tinypng;

pub use archive::ZipBackend;
pub use backend::{BackendId, BackendSet, CompressionBackend, reserve_sibling};
pub use convertapi::ConvertApiBackend;
pub use error::CompressionError;
pub use selector::CompressionSelector;
pub use tinypng::TinyPngBackend;
