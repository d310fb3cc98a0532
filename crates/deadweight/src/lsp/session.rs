use crate::lsp::client::LspClient;
use crate::lsp::config::LspConfig;
use crate::lsp::dispatcher::{handler, Dispatch};
use crate::lsp::error::{LspError, Result};
use crate::lsp::transport::Transport;
use crate::model::types::ServerConfig;
use serde_json::json;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum SessionState {
    Unstarted,
    /// The server process is running and both background loops are reading
    Starting,
    /// `initialize` was sent; waiting for its result or for cancellation
    AwaitingInitializeResult,
    /// `initialized` was sent; the server accepts queries
    Initialized,
    /// The handshake wait was cancelled before the server answered
    Cancelled,
    /// The server exited and the background loops have joined.
    ///
    /// This is the final state.
    Closed,
}

/// Handshake state machine over a [`Transport`].
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    server: ServerConfig,
    root: PathBuf,
    transport: Option<Transport>,
}

impl Session {
    /// `root` must be absolute; it becomes the workspace folder.
    pub fn new(server: ServerConfig, root: PathBuf) -> Self {
        Self {
            state: SessionState::Unstarted,
            server,
            root,
            transport: None,
        }
    }

    /// Wraps an already running transport; the session starts in `Starting`.
    pub fn with_transport(transport: Transport, server: ServerConfig, root: PathBuf) -> Self {
        Self {
            state: SessionState::Starting,
            server,
            root,
            transport: Some(transport),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Spawns the server. Failure here is fatal: nothing has been sent yet.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state(SessionState::Unstarted, "Unstarted")?;
        self.transport = Some(Transport::spawn(&self.server)?);
        self.state = SessionState::Starting;
        Ok(())
    }

    /// Runs the capability negotiation, starting the server first if needed.
    ///
    /// Resolves to `Initialized` once the server answers, or to `Cancelled`
    /// without error when `cancel` fires first. No retry is attempted.
    pub async fn initialize(&mut self, cancel: &CancellationToken) -> Result<SessionState> {
        if self.state == SessionState::Unstarted {
            self.start()?;
        }
        self.expect_state(SessionState::Starting, "Starting")?;

        let dispatcher = self.client()?.dispatcher().clone();
        let root_uri = Url::from_directory_path(&self.root)
            .map_err(|()| LspError::InvalidPath(self.root.display().to_string()))?;
        let params = LspConfig::build_initialize_params(root_uri, self.server.initialization_options.clone());

        let (ready_tx, ready_rx) = oneshot::channel();
        let id = dispatcher
            .send(
                "initialize",
                serde_json::to_value(params)?,
                Dispatch::Request(handler(move |result| async move {
                    let _ = ready_tx.send(result);
                })),
            )
            .await?
            .unwrap_or_default();
        self.state = SessionState::AwaitingInitializeResult;

        tokio::select! {
            ready = ready_rx => {
                match ready {
                    Ok(Ok(result)) => debug!(capabilities = %result["capabilities"], "server initialized"),
                    Ok(Err(e)) => return Err(e),
                    Err(_) => return Err(LspError::HandlerDropped(id)),
                }
                dispatcher.notify("initialized", json!({})).await?;
                self.state = SessionState::Initialized;
                info!("lsp client initialized");
            },
            _ = cancel.cancelled() => {
                self.state = SessionState::Cancelled;
                info!("initialization cancelled");
            },
        }

        Ok(self.state)
    }

    pub fn client(&self) -> Result<LspClient> {
        let transport = self.transport.as_ref().ok_or_else(|| LspError::InvalidState {
            expected: "started",
            actual: self.state.to_string(),
        })?;
        Ok(LspClient::new(transport.dispatcher(), self.root.clone()))
    }

    /// Stops the server and joins the background loops.
    pub async fn close(&mut self) -> Result<()> {
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        self.state = SessionState::Closed;
        Ok(())
    }

    fn expect_state(&self, expected: SessionState, name: &'static str) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(LspError::InvalidState {
                expected: name,
                actual: self.state.to_string(),
            })
        }
    }
}
