use super::references::{LivenessPolicy, ReferenceCollector};
use super::report::UnusedReport;
use super::store::{ReferenceMap, SymbolMap};
use super::symbols::SymbolCollector;
use crate::config::{DeadweightConfig, Rules};
use crate::lsp::{LspClient, Session, SessionState};
use crate::utils::file::discover_source_files;
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn, Level};

/// Runs the two collection phases against an initialized server and derives
/// the report.
#[derive(Debug)]
pub struct Analyzer {
    client: LspClient,
    rules: Arc<Rules>,
    liveness: LivenessPolicy,
    symbols: Arc<SymbolMap>,
    references: Arc<ReferenceMap>,
}

impl Analyzer {
    pub fn new(client: LspClient, rules: Rules, liveness: LivenessPolicy) -> Self {
        Self {
            client,
            rules: Arc::new(rules),
            liveness,
            symbols: Arc::new(SymbolMap::new()),
            references: Arc::new(ReferenceMap::new()),
        }
    }

    pub fn symbols(&self) -> &SymbolMap {
        &self.symbols
    }

    pub fn references(&self) -> &ReferenceMap {
        &self.references
    }

    pub async fn analyze(&self, files: &[String]) -> UnusedReport {
        self.collect_symbols(files).await;
        self.collect_references().await;
        self.report()
    }

    /// One task per file; returns once every response has been processed.
    pub async fn collect_symbols(&self, files: &[String]) {
        let tracker = TaskTracker::new();
        let collector = SymbolCollector::new(self.client.clone(), Arc::clone(&self.symbols), Arc::clone(&self.rules));

        for file in files {
            let collector = collector.clone();
            let file = file.clone();
            let handle = tracker.clone();
            tracker.spawn(async move {
                if let Err(e) = collector.collect(&file, &handle).await {
                    warn!(file = %file, error = %e, "failed to request document symbols");
                }
            });
        }

        tracker.close();
        tracker.wait().await;
        info!(
            files = self.symbols.len(),
            symbols = self.symbols.symbol_count(),
            "symbol collection finished"
        );

        if tracing::enabled!(Level::DEBUG) {
            for (file, symbols) in self.symbols.snapshot() {
                let names: Vec<&str> = symbols.iter().map(|symbol| symbol.name.as_str()).collect();
                debug!(file = %file, symbols = ?names, "collected");
            }
        }
    }

    /// One task per collected (file, symbol) pair.
    pub async fn collect_references(&self) {
        let tracker = TaskTracker::new();
        let collector = ReferenceCollector::new(self.client.clone(), Arc::clone(&self.references));

        for (file, symbols) in self.symbols.snapshot() {
            for symbol in symbols {
                let collector = collector.clone();
                let file = file.clone();
                let handle = tracker.clone();
                tracker.spawn(async move {
                    let name = symbol.name.clone();
                    if let Err(e) = collector.collect(&file, symbol, &handle).await {
                        warn!(file = %file, symbol = %name, error = %e, "failed to request references");
                    }
                });
            }
        }

        tracker.close();
        tracker.wait().await;
        info!(entries = self.references.len(), "reference collection finished");
    }

    pub fn report(&self) -> UnusedReport {
        UnusedReport::from_symbol_map(&self.references.unused_symbols(&self.liveness))
    }
}

/// Discovers the files to analyse unless an explicit list is given.
pub fn resolve_files(root: &Path, config: &DeadweightConfig, files: Vec<String>) -> Result<Vec<String>> {
    if !files.is_empty() {
        return Ok(files);
    }
    let files = discover_source_files(root, config)
        .with_context(|| format!("Failed to discover source files under {}", root.display()))?;
    info!(count = files.len(), root = %root.display(), "discovered source files");
    Ok(files)
}

/// Drives `session` from handshake to close.
///
/// Returns `None` when the handshake was cancelled. The session is closed on
/// every path.
pub async fn run_session(
    mut session: Session,
    config: &DeadweightConfig,
    files: &[String],
    cancel: &CancellationToken,
) -> Result<Option<UnusedReport>> {
    let outcome = drive(&mut session, config, files, cancel).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close language server session");
    }
    outcome
}

async fn drive(
    session: &mut Session,
    config: &DeadweightConfig,
    files: &[String],
    cancel: &CancellationToken,
) -> Result<Option<UnusedReport>> {
    let rules = config.rules()?;
    let state = session
        .initialize(cancel)
        .await
        .context("Failed to initialize language server")?;
    if state != SessionState::Initialized {
        info!(%state, "analysis skipped");
        return Ok(None);
    }

    let analyzer = Analyzer::new(session.client()?, rules, config.liveness());
    Ok(Some(analyzer.analyze(files).await))
}

/// Analyses `root` with a language server spawned from `config`.
pub async fn run(
    root: &Path,
    config: &DeadweightConfig,
    files: Vec<String>,
    cancel: &CancellationToken,
) -> Result<Option<UnusedReport>> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Failed to resolve root {}", root.display()))?;
    let files = resolve_files(&root, config, files)?;
    let session = Session::new(config.server.clone(), root);
    run_session(session, config, &files, cancel).await
}
