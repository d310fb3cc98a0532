use crate::lsp::dispatcher::{Dispatch, Dispatcher, ResponseHandler};
use crate::lsp::error::{LspError, Result};
use crate::model::Position;
use crate::utils::file::relative_file_id;
use lsp_types::{
    DocumentSymbolParams, ReferenceContext, ReferenceParams, TextDocumentIdentifier, TextDocumentPositionParams,
    TypeHierarchyPrepareParams,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;
use url::Url;

/// Language Server Protocol client for the three queries the analysis needs.
///
/// Requests are addressed by root-relative file path. `document_symbols` and
/// `references` return as soon as the request is written; their handlers run
/// when the reply arrives.
#[derive(Debug, Clone)]
pub struct LspClient {
    dispatcher: Dispatcher,
    root: Arc<PathBuf>,
}

impl LspClient {
    /// `root` must be absolute.
    pub fn new(dispatcher: Dispatcher, root: PathBuf) -> Self {
        Self {
            dispatcher,
            root: Arc::new(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn document_uri(&self, file: &str) -> Result<Url> {
        let path = self.root.join(file);
        Url::from_file_path(&path).map_err(|()| LspError::InvalidPath(path.display().to_string()))
    }

    /// Root-relative identifier of the file a location points into.
    pub fn file_id(&self, uri: &Url) -> String {
        relative_file_id(&self.root, uri)
    }

    /// Request the hierarchical symbols declared in `file`.
    pub async fn document_symbols(&self, file: &str, handler: ResponseHandler) -> Result<()> {
        let params = DocumentSymbolParams {
            text_document: TextDocumentIdentifier::new(self.document_uri(file)?),
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
        };
        self.send("textDocument/documentSymbol", serde_json::to_value(params)?, handler)
            .await
    }

    /// Request the references to the symbol declared at `position`, the
    /// declaration itself excluded.
    pub async fn references(&self, file: &str, position: Position, handler: ResponseHandler) -> Result<()> {
        let params = ReferenceParams {
            text_document_position: self.position_params(file, position)?,
            work_done_progress_params: Default::default(),
            partial_result_params: Default::default(),
            context: ReferenceContext {
                include_declaration: false,
            },
        };
        self.send("textDocument/references", serde_json::to_value(params)?, handler)
            .await
    }

    /// Whether the symbol at `position` resolves to a nominal type.
    ///
    /// Waits for the reply, unlike the other two queries.
    pub async fn prepare_type_hierarchy(&self, file: &str, position: Position) -> Result<bool> {
        let params = TypeHierarchyPrepareParams {
            text_document_position_params: self.position_params(file, position)?,
            work_done_progress_params: Default::default(),
        };
        let result = self
            .dispatcher
            .request("textDocument/prepareTypeHierarchy", serde_json::to_value(params)?)
            .await?;
        trace!(file, ?position, %result, "type hierarchy prepared");
        Ok(has_items(&result))
    }

    fn position_params(&self, file: &str, position: Position) -> Result<TextDocumentPositionParams> {
        Ok(TextDocumentPositionParams::new(
            TextDocumentIdentifier::new(self.document_uri(file)?),
            position.into(),
        ))
    }

    async fn send(&self, method: &str, params: Value, handler: ResponseHandler) -> Result<()> {
        self.dispatcher.send(method, params, Dispatch::Request(handler)).await?;
        Ok(())
    }
}

fn has_items(result: &Value) -> bool {
    match result {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}
