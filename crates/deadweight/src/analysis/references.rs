use super::store::ReferenceMap;
use crate::lsp::dispatcher::handler;
use crate::lsp::error::Result;
use crate::lsp::LspClient;
use crate::model::{Location, Symbol};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

/// Name that is always treated as used.
const ENTRY_POINT: &str = "main";

/// Decides which reference locations count as evidence of use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessPolicy {
    test_suffix: String,
    mock_marker: String,
}

impl Default for LivenessPolicy {
    fn default() -> Self {
        Self::new("_test.go", "mock")
    }
}

impl LivenessPolicy {
    pub fn new(test_suffix: &str, mock_marker: &str) -> Self {
        Self {
            test_suffix: test_suffix.to_string(),
            mock_marker: mock_marker.to_string(),
        }
    }

    /// A reference qualifies unless it sits in a test file or a mock.
    pub fn qualifies(&self, location: &Location) -> bool {
        let in_test = !self.test_suffix.is_empty() && location.file.ends_with(&self.test_suffix);
        let in_mock = !self.mock_marker.is_empty() && location.file.contains(&self.mock_marker);
        !in_test && !in_mock
    }

    pub fn is_used(&self, symbol: &Symbol, locations: &[Location]) -> bool {
        symbol.name == ENTRY_POINT || locations.iter().any(|location| self.qualifies(location))
    }
}

/// Issues one references request per (file, symbol) and records the answers.
#[derive(Debug, Clone)]
pub struct ReferenceCollector {
    client: LspClient,
    references: Arc<ReferenceMap>,
}

impl ReferenceCollector {
    pub fn new(client: LspClient, references: Arc<ReferenceMap>) -> Self {
        Self { client, references }
    }

    /// Sends the request; the reply is stored by a handler holding a token of
    /// `tracker`, so `tracker.wait()` covers it.
    pub async fn collect(&self, file: &str, symbol: Symbol, tracker: &TaskTracker) -> Result<()> {
        let token = tracker.token();
        let client = self.client.clone();
        let references = Arc::clone(&self.references);
        let owner = file.to_string();
        let position = symbol.position;

        self.client
            .references(
                file,
                position,
                handler(move |result| async move {
                    let _token = token;
                    let value = match result {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(file = %owner, symbol = %symbol.name, error = %e, "references request failed");
                            return;
                        },
                    };
                    let locations = match serde_json::from_value::<Option<Vec<lsp_types::Location>>>(value) {
                        Ok(locations) => locations.unwrap_or_default(),
                        Err(e) => {
                            warn!(file = %owner, symbol = %symbol.name, error = %e, "failed to parse references");
                            return;
                        },
                    };
                    let locations: Vec<Location> = locations
                        .iter()
                        .map(|location| Location::new(client.file_id(&location.uri)))
                        .collect();
                    debug!(file = %owner, symbol = %symbol.name, count = locations.len(), "references received");
                    references.store(owner, symbol, locations);
                }),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Kind, Position};

    fn symbol(name: &str) -> Symbol {
        Symbol::new(name, Kind::Function, Position::new(2, 5))
    }

    fn locations(files: &[&str]) -> Vec<Location> {
        files.iter().map(|file| Location::new(*file)).collect()
    }

    #[test]
    fn test_no_references_is_unused() {
        let policy = LivenessPolicy::default();
        assert!(!policy.is_used(&symbol("Helper"), &[]));
    }

    #[test]
    fn test_main_is_always_used() {
        let policy = LivenessPolicy::default();
        assert!(policy.is_used(&symbol("main"), &[]));
        assert!(policy.is_used(&symbol("main"), &locations(&["a_test.go"])));
    }

    #[test]
    fn test_test_only_references_are_unused() {
        let policy = LivenessPolicy::default();
        assert!(!policy.is_used(&symbol("Helper"), &locations(&["a_test.go", "pkg/b_test.go"])));
    }

    #[test]
    fn test_mock_only_references_are_unused() {
        let policy = LivenessPolicy::default();
        assert!(!policy.is_used(&symbol("Helper"), &locations(&["mocks/store.go", "pkg/mock_client.go"])));
    }

    #[test]
    fn test_one_real_reference_is_used() {
        let policy = LivenessPolicy::default();
        assert!(policy.is_used(&symbol("Helper"), &locations(&["a_test.go", "cmd/server.go"])));
    }

    #[test]
    fn test_custom_policy() {
        let policy = LivenessPolicy::new(".test.ts", "fake");
        assert!(!policy.is_used(&symbol("Helper"), &locations(&["a.test.ts", "fakes/x.ts"])));
        assert!(policy.is_used(&symbol("Helper"), &locations(&["a_test.go"])));
    }
}
