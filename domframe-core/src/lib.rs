//! # Domframe Core
//!
//! Pure, synchronous half of the render-tree compiler: it turns computed
//! style strings and measured boxes into a design document.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                domframe-core                │
//! ├─────────────────────────────────────────────┤
//! │  Style Normalizer │  Geometry Reconciler    │
//! │  - Colors         │  - Border/content box   │
//! │  - Gradients      │  - Document/viewport    │
//! │  - Shadows        │  - Min visible size     │
//! │  - Filters        │                         │
//! │  - Transforms     │                         │
//! ├─────────────────────────────────────────────┤
//! │  Auto-Layout      │  Document Model         │
//! │  - Candidacy      │  - Nodes and paint      │
//! │  - Simulation     │  - Asset records        │
//! │  - Circuit breaker│  - Diagnostics, tokens  │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod asset;
pub mod autolayout;
pub mod compact;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod geometry;
pub mod node;
pub mod paint;
pub mod style;
pub mod tokens;

pub use asset::{AssetKey, AssetKind, AssetRecord, Dimensions, FontFace};
pub use autolayout::{
    Alignment, AutoLayout, AutoLayoutConfig, AutoLayoutVerdict, DeclineReason, LayoutChild,
    LayoutContainer, LayoutDirection, LayoutEngine, LayoutInferenceConfig, LayoutMetrics,
    LayoutMetricsReport, LayoutOutcome, LayoutSource, RejectionReason,
};
pub use compact::{compact, compact_to_target, CompactLevel, CompactReport};
pub use diagnostics::{DiagnosticCounts, Diagnostics, DiagnosticsSummary, Severity};
pub use document::{DesignDocument, DocumentMetadata, SCHEMA_VERSION};
pub use error::{CoreError, CoreResult};
pub use geometry::{
    reconcile, reconcile_synthetic, CoordinateSpace, Geometry, GeometryInput, Position, Rect,
    Sides, Size, Viewport, MIN_VISIBLE_SIZE,
};
pub use node::{AbsoluteLayout, FrameHints, Node, NodeId, NodeKind, NodeLayout, Typography};
pub use paint::{BlendMode, ColorAdjustments, Effect, Fill, Paint, ScaleMode, Stroke, StrokeAlign};
pub use style::color::{Color, ColorNormalizer, ColorParser};
pub use style::StyleSnapshot;
pub use tokens::{DesignTokens, TokenCollector};

/// Domframe core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
