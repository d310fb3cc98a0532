use lsp_types::*;
use serde_json::Value;
use url::Url;

/// Configuration for LSP client initialization
pub struct LspConfig;

#[allow(deprecated)]
impl LspConfig {
    /// Build the `initialize` parameters, announcing hierarchical document
    /// symbol support.
    pub fn build_initialize_params(root_uri: Url, initialization_options: Option<Value>) -> InitializeParams {
        InitializeParams {
            process_id: None,
            root_path: None,
            root_uri: Some(root_uri.clone()),
            initialization_options,
            capabilities: ClientCapabilities {
                text_document: Some(TextDocumentClientCapabilities {
                    references: Some(ReferenceClientCapabilities {
                        dynamic_registration: Some(false),
                    }),
                    document_symbol: Some(DocumentSymbolClientCapabilities {
                        hierarchical_document_symbol_support: Some(true),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            },
            trace: Some(TraceValue::Off),
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: root_uri,
                name: "workspace".to_string(),
            }]),
            client_info: Some(ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            locale: None,
            work_done_progress_params: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_initialize_params_basic() {
        let root_uri = Url::parse("file:///workspace").unwrap();
        let params = LspConfig::build_initialize_params(root_uri.clone(), None);

        let workspace_folders = params.workspace_folders.unwrap();
        assert_eq!(workspace_folders.len(), 1);
        assert_eq!(workspace_folders[0].uri, root_uri);
        assert!(params.initialization_options.is_none());
        assert_eq!(params.trace, Some(TraceValue::Off));
    }

    #[test]
    fn test_build_initialize_params_with_options() {
        let root_uri = Url::parse("file:///project").unwrap();
        let init_options = json!({"staticcheck": false});

        let params = LspConfig::build_initialize_params(root_uri, Some(init_options.clone()));

        assert_eq!(params.initialization_options, Some(init_options));
    }

    #[test]
    fn test_hierarchical_document_symbols_requested() {
        let root_uri = Url::parse("file:///test").unwrap();
        let params = LspConfig::build_initialize_params(root_uri, None);
        let value = serde_json::to_value(&params).unwrap();

        assert_eq!(
            value["capabilities"]["textDocument"]["documentSymbol"]["hierarchicalDocumentSymbolSupport"],
            json!(true)
        );
        assert_eq!(value["rootUri"], json!("file:///test"));
    }
}
