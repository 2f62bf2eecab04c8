//! # Domframe Extract
//!
//! Walks a render tree (elements with computed style and measured boxes)
//! and compiles it into a [`DesignDocument`].
//!
//! ## Usage
//!
//! ```bash
//! domframe snapshot.json -o design.json --pretty
//! ```
//!
//! ## Architecture
//!
//! - [`RenderTreeAccessor`] - what the host render tree must answer
//! - [`RenderSnapshot`] - offline, JSON-backed accessor
//! - [`Controller`] - bounded, yielding traversal into a node arena
//! - [`Compiler`] - one run: traversal, fonts, asset resolution, validation
//!
//! [`DesignDocument`]: domframe_core::DesignDocument

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod accessor;
pub mod classify;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod media;
pub mod paint;
pub mod pseudo;
pub mod snapshot;
pub mod stacking;

pub use accessor::{ChildItem, ElementId, FontFaceSource, PageInfo, PictureSource, PseudoKind, RenderTreeAccessor, TextRun};
pub use cli::{CliArgs, CompactArg};
pub use compiler::{extract, Compiler};
pub use config::ExtractConfig;
pub use context::RunContext;
pub use controller::Controller;
pub use error::{ExtractError, ExtractResult};
pub use media::{MediaCapability, MediaSource};
pub use snapshot::{PseudoBox, RenderSnapshot, SnapshotChild, SnapshotElement};
