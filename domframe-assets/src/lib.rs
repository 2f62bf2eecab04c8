//! # Domframe Assets
//!
//! Collects image, SVG and font references during traversal and resolves
//! them afterwards in bounded batches.
//!
//! ## Flow
//!
//! ```text
//! traversal ──register──▶ AssetRegistry ──pending──▶ AssetPipeline
//!                          (dedup by key)             │ data: URI → decode locally
//!                                                     │ http(s)   → fetch + retry
//!                                                     ▼
//!                                          payload or terminal error
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod data_uri;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod probe;
pub mod registry;
pub mod retry;

pub use data_uri::{parse_data_uri, DataUri, ImageFormat};
pub use error::{AssetError, AssetResult};
pub use fetch::{AssetFetcher, FetchedAsset, HttpFetcher};
pub use pipeline::{AssetFailure, AssetPipeline, PipelineConfig, PipelineReport};
pub use probe::decode_image_dimensions;
pub use registry::{AssetRegistry, PendingAsset, RegistryStats};
pub use retry::{fetch_with_retry, RetryConfig};
