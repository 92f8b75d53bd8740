//! End-to-end `render` pipeline: Doxygen XML → compound tree → Markdown files.

use std::path::PathBuf;
use std::time::Instant;

use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use doxymark_markdown::{RenderOptions, Renderer};
use doxymark_shared::{CompoundView, DoxymarkError, EntityRecord, RenderConfig, Result};

use crate::assembler::{self, OutputMode, OutputUnit};
use crate::compound::FilterPolicy;

/// Turns one compound into text, or declines with `None`.
pub trait NodeRenderer {
    fn render(&self, view: &CompoundView) -> Result<Option<String>>;
}

impl NodeRenderer for Renderer {
    fn render(&self, view: &CompoundView) -> Result<Option<String>> {
        Renderer::render(self, view)
    }
}

/// A rendered output document, ready to be written.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub content: String,
}

/// Result of a render run.
#[derive(Debug)]
pub struct RenderResult {
    /// Output documents planned.
    pub units: usize,
    /// Files written, sorted by path.
    pub files: Vec<PathBuf>,
    /// Compounds that produced output.
    pub nodes_rendered: usize,
    /// Compounds the renderer declined.
    pub nodes_skipped: usize,
    /// Total elapsed time.
    pub elapsed: std::time::Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each compound is handed to the renderer.
    fn node_rendered(&self, name: &str, current: usize, total: usize);
    /// Called when the pipeline completes.
    fn done(&self, result: &RenderResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn node_rendered(&self, _name: &str, _current: usize, _total: usize) {}
    fn done(&self, _result: &RenderResult) {}
}

/// Run the full `render` pipeline.
///
/// 1. Load Doxygen XML records
/// 2. Build the renderer (templates + helpers)
/// 3. Build, filter and linearize the compound tree
/// 4. Render and write each output document
#[instrument(skip_all, fields(input = %config.input_dir.display(), output = %config.output.display()))]
pub async fn render_docs(
    config: &RenderConfig,
    progress: &dyn ProgressReporter,
) -> Result<RenderResult> {
    progress.phase("Reading Doxygen XML");
    let records = doxymark_doxygen::load_directory(&config.input_dir).await?;

    if records.is_empty() {
        return Err(DoxymarkError::validation(format!(
            "no compounds found in {}",
            config.input_dir.display()
        )));
    }

    progress.phase("Loading templates");
    let renderer = Renderer::new(&RenderOptions {
        lang: config.lang.clone(),
        anchors: config.anchors,
        template_dir: config.template_dir.clone(),
    })?;

    render_records(&records, config, &renderer, progress).await
}

/// Assemble, render and write already-loaded records.
pub async fn render_records(
    records: &[EntityRecord],
    config: &RenderConfig,
    renderer: &dyn NodeRenderer,
    progress: &dyn ProgressReporter,
) -> Result<RenderResult> {
    let start = Instant::now();

    progress.phase("Building compound tree");
    let mut assembly = assembler::build(records, OutputMode::from(config))?;
    let units = assembler::plan(&mut assembly, &FilterPolicy::from(config));

    if units.is_empty() {
        warn!("nothing to render, no groups were found");
    }

    progress.phase("Rendering");
    let (documents, nodes_rendered, nodes_skipped) = render_units(&units, config, renderer, progress)?;

    progress.phase("Writing output");
    let files = write_documents(documents).await?;

    let result = RenderResult {
        units: units.len(),
        files,
        nodes_rendered,
        nodes_skipped,
        elapsed: start.elapsed(),
    };

    info!(
        files = result.files.len(),
        rendered = result.nodes_rendered,
        skipped = result.nodes_skipped,
        "render complete"
    );
    progress.done(&result);

    Ok(result)
}

/// Render every unit into a document. Declined nodes are left out.
fn render_units(
    units: &[OutputUnit],
    config: &RenderConfig,
    renderer: &dyn NodeRenderer,
    progress: &dyn ProgressReporter,
) -> Result<(Vec<Document>, usize, usize)> {
    let total: usize = units.iter().map(|u| u.views.len()).sum();
    let mut current = 0;
    let mut rendered = 0;
    let mut skipped = 0;
    let mut documents = Vec::with_capacity(units.len());

    for unit in units {
        let path = match &unit.group {
            Some(group) => config.group_output_path(group),
            None => config.output.clone(),
        };

        let mut content = String::new();
        for view in &unit.views {
            current += 1;
            match renderer.render(view)? {
                Some(text) => {
                    content.push_str(&text);
                    rendered += 1;
                }
                None => {
                    debug!(kind = %view.kind, name = %view.name, "renderer declined compound");
                    skipped += 1;
                }
            }
            progress.node_rendered(&view.name, current, total);
        }

        documents.push(Document { path, content });
    }

    Ok((documents, rendered, skipped))
}

/// Write each document as an independent task.
///
/// Every write runs to completion; the first failure is returned after all
/// tasks have finished.
pub async fn write_documents(documents: Vec<Document>) -> Result<Vec<PathBuf>> {
    let mut tasks = JoinSet::new();

    for doc in documents {
        tasks.spawn(async move {
            if let Some(parent) = doc.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| DoxymarkError::io(parent, e))?;
            }
            tokio::fs::write(&doc.path, doc.content.as_bytes())
                .await
                .map_err(|e| DoxymarkError::io(&doc.path, e))?;
            debug!(path = %doc.path.display(), bytes = doc.content.len(), "wrote output file");
            Ok::<PathBuf, DoxymarkError>(doc.path)
        });
    }

    let mut written = Vec::new();
    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(path)) => written.push(path),
            Ok(Err(e)) => {
                warn!(error = %e, "output write failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                warn!(error = %e, "output task failed");
                first_error.get_or_insert(DoxymarkError::validation(format!("write task failed: {e}")));
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    written.sort();
    Ok(written)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
