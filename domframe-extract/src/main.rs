//! # Domframe
//!
//! Compiles a render-tree snapshot into a design document.

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use domframe_assets::HttpFetcher;
use domframe_core::{compact, compact_to_target, DesignDocument};
use domframe_extract::{CliArgs, Compiler, ExtractConfig, RenderSnapshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing on stderr with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: info,domframe_extract=debug).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,domframe_extract=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

// The compiler future holds run-scoped caches that are not Send.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = CliArgs::parse();
    let config = ExtractConfig::from(&args);

    let snapshot = RenderSnapshot::from_path(&args.snapshot)
        .with_context(|| format!("Failed to read snapshot {}", args.snapshot.display()))?;

    let mut compiler = Compiler::new(config.clone());
    if config.resolve_assets {
        let fetcher = HttpFetcher::new(config.pipeline.request_timeout, config.pipeline.max_fetch_bytes)
            .context("Failed to build HTTP client")?;
        compiler = compiler.with_fetcher(Arc::new(fetcher));
    }

    let mut document = compiler.compile(&snapshot).await.context("Extraction failed")?;
    shrink(&mut document, &args)?;

    let json = if args.pretty {
        document.to_json_pretty()?
    } else {
        document.to_json()?
    };
    match &args.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), nodes = document.metadata.node_count, "document written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(json.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

/// Apply the requested compaction, level first, then size target.
fn shrink(document: &mut DesignDocument, args: &CliArgs) -> anyhow::Result<()> {
    if let Some(level) = args.compact {
        let report = compact(document, level.into())?;
        tracing::info!(?report, "compacted");
    }
    if let Some(target) = args.target_bytes() {
        let report = compact_to_target(document, target)?;
        if report.bytes_after > target {
            tracing::warn!(
                bytes = report.bytes_after,
                target,
                "document still exceeds the size target after aggressive compaction"
            );
        }
    }
    Ok(())
}
