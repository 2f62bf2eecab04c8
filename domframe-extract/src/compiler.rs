//! Run orchestration.
//!
//! One call compiles one render tree: traverse, register used fonts,
//! resolve assets within whatever is left of the time budget, then
//! assemble and validate the document. Running out of time in any phase
//! fails the run.

use std::sync::Arc;

use domframe_assets::{AssetFetcher, AssetPipeline};
use domframe_core::diagnostics::now_millis;
use domframe_core::{DesignDocument, DocumentMetadata, FontFace, SCHEMA_VERSION};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::accessor::RenderTreeAccessor;
use crate::config::ExtractConfig;
use crate::context::RunContext;
use crate::controller::Controller;
use crate::error::{ExtractError, ExtractResult};

/// Compiles render trees into design documents.
#[derive(Clone)]
pub struct Compiler {
    config: ExtractConfig,
    fetcher: Option<Arc<dyn AssetFetcher>>,
}

impl std::fmt::Debug for Compiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compiler")
            .field("config", &self.config)
            .field("has_fetcher", &self.fetcher.is_some())
            .finish()
    }
}

impl Compiler {
    /// Compiler without an asset fetcher; assets are registered but left
    /// unresolved.
    #[must_use]
    pub fn new(config: ExtractConfig) -> Self {
        Self { config, fetcher: None }
    }

    /// Resolve assets through `fetcher`.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Compile one render tree.
    ///
    /// # Errors
    ///
    /// Returns an error when the run fails as a whole: time budget
    /// exhausted, node cap exceeded, no root, or an invalid result.
    /// Per-node problems end up in the document diagnostics instead.
    pub async fn compile(&self, accessor: &dyn RenderTreeAccessor) -> ExtractResult<DesignDocument> {
        let run_id = Uuid::new_v4().to_string();
        let extracted_at = now_millis();
        let mut ctx = RunContext::new(accessor, &self.config);
        info!(
            run_id = %run_id,
            url = %ctx.page.url,
            max_nodes = self.config.max_nodes,
            budget_ms = self.config.time_budget_ms(),
            "extraction started"
        );

        let root = match Controller::new(&mut ctx).run().await {
            Ok(root) => root,
            Err(e) => {
                ctx.diagnostics.critical("document", e.to_string());
                error!(run_id = %run_id, error = %e, "extraction failed");
                return Err(e);
            }
        };

        register_fonts(&mut ctx);
        if let Err(e) = self.resolve_assets(&mut ctx).await {
            ctx.diagnostics.critical("assets", e.to_string());
            error!(run_id = %run_id, error = %e, "extraction failed");
            return Err(e);
        }

        let node_count = root.count();
        let duration_ms = u64::try_from(ctx.elapsed().as_millis()).unwrap_or(u64::MAX);
        let RunContext {
            page,
            layout,
            tokens,
            assets,
            diagnostics,
            ..
        } = ctx;
        let (images, svgs, fonts) = assets.into_maps();
        let document = DesignDocument {
            schema_version: SCHEMA_VERSION.to_string(),
            metadata: DocumentMetadata {
                source_url: page.url,
                title: page.title,
                viewport: page.viewport,
                color_scheme: page.color_scheme,
                run_id: run_id.clone(),
                extracted_at,
                duration_ms,
                node_count,
                truncated_nodes: 0,
            },
            root,
            images,
            svgs,
            fonts,
            design_tokens: tokens.finish(),
            diagnostics: diagnostics.summary(),
            auto_layout_metrics: layout.metrics().report(),
        };
        document.validate()?;

        info!(
            run_id = %run_id,
            nodes = node_count,
            images = document.images.len(),
            svgs = document.svgs.len(),
            fonts = document.fonts.len(),
            auto_layouts = document.auto_layout_count(),
            warnings = document.diagnostics.counts.warnings,
            duration_ms,
            "extraction complete"
        );
        Ok(document)
    }

    /// Resolve registered assets before the run deadline.
    async fn resolve_assets(&self, ctx: &mut RunContext<'_>) -> ExtractResult<()> {
        if !self.config.resolve_assets || ctx.assets.is_empty() {
            return Ok(());
        }
        let Some(fetcher) = &self.fetcher else {
            info!(pending = ctx.assets.len(), "no asset fetcher configured, assets left unresolved");
            return Ok(());
        };
        let pipeline = AssetPipeline::new(Arc::clone(fetcher), self.config.pipeline.clone());
        let deadline = ctx.deadline();
        let report = pipeline
            .resolve_until(&mut ctx.assets, deadline)
            .await
            .map_err(|_| ExtractError::Timeout {
                budget_ms: self.config.time_budget_ms(),
            })?;
        for failure in &report.failures {
            ctx.diagnostics.warn(
                format!("{}:{}", failure.kind, failure.url),
                format!("Asset unavailable: {}", failure.error),
            );
        }
        if report.failed > 0 {
            warn!(failed = report.failed, resolved = report.resolved, "some assets could not be resolved");
        }
        Ok(())
    }
}

/// Register `@font-face` sources for families that text actually uses.
fn register_fonts(ctx: &mut RunContext<'_>) {
    let used = ctx.used_font_families();
    for face in ctx.accessor.font_faces() {
        if !used.contains(&face.family.to_lowercase()) {
            continue;
        }
        let font = FontFace {
            family: face.family,
            weight: face.weight,
            style: face.style,
        };
        if ctx.assets.register_font(font, &face.url).is_none() {
            ctx.diagnostics
                .warn("fonts", format!("Unusable font source '{}'", face.url));
        }
    }
}

/// Compile `accessor` with `config`, resolving assets through `fetcher`
/// when one is given.
///
/// # Errors
///
/// See [`Compiler::compile`].
pub async fn extract(
    accessor: &dyn RenderTreeAccessor,
    fetcher: Option<Arc<dyn AssetFetcher>>,
    config: ExtractConfig,
) -> ExtractResult<DesignDocument> {
    let mut compiler = Compiler::new(config);
    if let Some(fetcher) = fetcher {
        compiler = compiler.with_fetcher(fetcher);
    }
    compiler.compile(accessor).await
}
