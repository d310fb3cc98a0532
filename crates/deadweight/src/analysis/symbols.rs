use super::store::SymbolMap;
use crate::config::Rules;
use crate::lsp::dispatcher::handler;
use crate::lsp::error::Result;
use crate::lsp::LspClient;
use crate::model::{Kind, Position, Symbol};
use lsp_types::{DocumentSymbol, DocumentSymbolResponse, SymbolInformation, SymbolKind};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

/// One node of a document symbol tree, before flattening.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSymbolNode {
    pub name: String,
    pub kind: SymbolKind,
    pub position: Position,
    /// Qualifying type text, e.g. `sync.Mutex` for a field
    pub detail: Option<String>,
    pub children: Vec<DocumentSymbolNode>,
}

impl From<DocumentSymbol> for DocumentSymbolNode {
    fn from(symbol: DocumentSymbol) -> Self {
        Self {
            name: symbol.name,
            kind: symbol.kind,
            position: symbol.selection_range.start.into(),
            detail: symbol.detail,
            children: symbol
                .children
                .unwrap_or_default()
                .into_iter()
                .map(DocumentSymbolNode::from)
                .collect(),
        }
    }
}

impl From<SymbolInformation> for DocumentSymbolNode {
    fn from(symbol: SymbolInformation) -> Self {
        Self {
            name: symbol.name,
            kind: symbol.kind,
            position: symbol.location.range.start.into(),
            detail: None,
            children: Vec::new(),
        }
    }
}

/// Parses a `textDocument/documentSymbol` result; `null` is an empty document.
pub fn parse_document_symbols(value: Value) -> serde_json::Result<Vec<DocumentSymbolNode>> {
    let nodes = match serde_json::from_value::<Option<DocumentSymbolResponse>>(value)? {
        Some(DocumentSymbolResponse::Nested(symbols)) => symbols.into_iter().map(DocumentSymbolNode::from).collect(),
        Some(DocumentSymbolResponse::Flat(symbols)) => symbols.into_iter().map(DocumentSymbolNode::from).collect(),
        None => Vec::new(),
    };
    Ok(nodes)
}

/// A flattened symbol together with the detail text of its node.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: Symbol,
    pub detail: Option<String>,
}

/// Pre-order flattening: each parent precedes its children.
///
/// Nodes whose kind is outside [`Kind`] are skipped; their children are not.
pub fn flatten(nodes: Vec<DocumentSymbolNode>) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for node in nodes {
        flatten_into(node, &mut candidates);
    }
    candidates
}

fn flatten_into(node: DocumentSymbolNode, candidates: &mut Vec<Candidate>) {
    match Kind::from_lsp(node.kind) {
        Some(kind) => candidates.push(Candidate {
            symbol: Symbol::new(node.name, kind, node.position),
            detail: node.detail,
        }),
        None => warn!(symbol = %node.name, kind = ?node.kind, "skipping symbol of unknown kind"),
    }
    for child in node.children {
        flatten_into(child, candidates);
    }
}

/// Whether the last `.` segment of `detail` equals `name`, which is how an
/// anonymously embedded field looks.
pub fn detail_names_field(detail: Option<&str>, name: &str) -> bool {
    detail.and_then(|detail| detail.rsplit('.').next()) == Some(name)
}

/// Collects, classifies and filters the symbols declared in each file.
#[derive(Debug, Clone)]
pub struct SymbolCollector {
    client: LspClient,
    symbols: Arc<SymbolMap>,
    rules: Arc<Rules>,
}

impl SymbolCollector {
    pub fn new(client: LspClient, symbols: Arc<SymbolMap>, rules: Arc<Rules>) -> Self {
        Self { client, symbols, rules }
    }

    /// Sends the document symbol request for `file`. The response is processed
    /// by a handler holding a token of `tracker`.
    pub async fn collect(&self, file: &str, tracker: &TaskTracker) -> Result<()> {
        let token = tracker.token();
        let collector = self.clone();
        let owner = file.to_string();

        self.client
            .document_symbols(
                file,
                handler(move |result| async move {
                    let _token = token;
                    let value = match result {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(file = %owner, error = %e, "document symbol request failed");
                            return;
                        },
                    };
                    let nodes = match parse_document_symbols(value) {
                        Ok(nodes) => nodes,
                        Err(e) => {
                            warn!(file = %owner, error = %e, "failed to parse document symbols");
                            return;
                        },
                    };
                    let retained = collector.retain(&owner, flatten(nodes)).await;
                    debug!(file = %owner, count = retained.len(), "symbols collected");
                    collector.symbols.store(owner, retained);
                }),
            )
            .await
    }

    /// Marks embedded fields and applies the ignore rules.
    ///
    /// A field whose type hierarchy request fails is dropped.
    async fn retain(&self, file: &str, candidates: Vec<Candidate>) -> Vec<Symbol> {
        let mut retained = Vec::with_capacity(candidates.len());

        for Candidate { mut symbol, detail } in candidates {
            if symbol.kind == Kind::Field && detail_names_field(detail.as_deref(), &symbol.name) {
                match self.client.prepare_type_hierarchy(file, symbol.position).await {
                    Ok(is_type) => symbol = symbol.embedded(is_type),
                    Err(e) => {
                        error!(
                            file,
                            symbol = %symbol.name,
                            line = symbol.position.line,
                            character = symbol.position.character,
                            error = %e,
                            "type hierarchy request failed"
                        );
                        continue;
                    },
                }
            }

            if self.rules.keep_symbol(&symbol) {
                retained.push(symbol);
            }
        }

        retained
    }
}
