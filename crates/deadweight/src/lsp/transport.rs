use crate::lsp::dispatcher::Dispatcher;
use crate::lsp::error::{FrameError, LspError, Result};
use crate::lsp::protocol::{parse_lsp_message, read_lsp_message};
use crate::model::types::ServerConfig;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Owns the language server process, its pipes and the two background loops
/// reading from it.
#[derive(Debug)]
pub struct Transport {
    child: Option<Child>,
    dispatcher: Dispatcher,
    tasks: Vec<JoinHandle<()>>,
}

impl Transport {
    /// Spawns the language server found on `PATH` and attaches its pipes.
    pub fn spawn(config: &ServerConfig) -> Result<Self> {
        let program = which::which(&config.command).map_err(|source| LspError::ServerNotFound {
            command: config.command.clone(),
            source,
        })?;

        let mut child = Command::new(&program)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LspError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(LspError::MissingPipe("stdin"))?;
        let stdout = child.stdout.take().ok_or(LspError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(LspError::MissingPipe("stderr"))?;

        info!(command = %program.display(), pid = ?child.id(), "language server running");

        let mut transport = Self::from_streams(stdout, stdin).with_diagnostics(stderr);
        transport.child = Some(child);
        Ok(transport)
    }

    /// Builds a transport over arbitrary streams and starts the reader loop.
    pub fn from_streams<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let dispatcher = Dispatcher::new(writer);
        let reader_task = tokio::spawn(read_loop(reader, dispatcher.clone()));
        Self {
            child: None,
            dispatcher,
            tasks: vec![reader_task],
        }
    }

    /// Starts the loop draining the server's diagnostic stream.
    pub fn with_diagnostics<E>(mut self, diagnostics: E) -> Self
    where
        E: AsyncRead + Send + Unpin + 'static,
    {
        self.tasks.push(tokio::spawn(log_diagnostics(diagnostics)));
        self
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Closes stdin, stops the server and joins both background loops.
    pub async fn close(mut self) -> Result<()> {
        if let Err(e) = self.dispatcher.shutdown().await {
            debug!(error = %e, "failed to close server stdin");
        }

        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "language server already stopped");
            }
            match child.wait().await {
                Ok(status) => debug!(%status, "language server exited"),
                Err(e) => warn!(error = %e, "failed to wait for language server"),
            }
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                warn!(error = %e, "background task failed");
            }
        }
        info!("lsp client exited");
        Ok(())
    }
}

/// Reads frames in arrival order and hands each response to the dispatcher.
///
/// Malformed frames are logged and skipped. End of stream or a failure while
/// reading headers ends the loop.
async fn read_loop<R: AsyncRead + Unpin>(reader: R, dispatcher: Dispatcher) {
    let mut reader = BufReader::new(reader);

    loop {
        let content = match read_lsp_message(&mut reader).await {
            Ok(content) => content,
            Err(FrameError::EndOfStream) => break,
            Err(FrameError::MissingContentLength) => {
                warn!("received empty response from language server");
                continue;
            },
            Err(FrameError::Io(e)) => {
                error!(error = %e, "failed to read headers from stdout");
                break;
            },
            Err(e) => {
                error!(error = %e, "failed to read frame from stdout");
                continue;
            },
        };

        let message = match parse_lsp_message(&content) {
            Ok(message) => message,
            Err(e) => {
                error!(error = %e, "failed to parse message");
                continue;
            },
        };

        trace!(body = %content, id = ?message.id, "message received");
        dispatcher.deliver(message);
    }

    let dropped = dispatcher.fail_pending();
    debug!(dropped, "LSP connection closed");
}

async fn log_diagnostics<E: AsyncRead + Unpin>(diagnostics: E) {
    let mut lines = BufReader::new(diagnostics).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if !line.is_empty() {
                    debug!(server = line, "language server output");
                }
            },
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read from stderr");
                break;
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::dispatcher::{handler, Dispatch};
    use crate::lsp::protocol::encode_frame;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;
    use tokio::sync::mpsc;
    use tokio_util::task::TaskTracker;

    #[tokio::test]
    async fn test_reader_survives_malformed_frames() {
        let (client_out, mut server_in) = tokio::io::duplex(16 * 1024);
        let (client_in, _server_out) = tokio::io::duplex(16 * 1024);
        let transport = Transport::from_streams(client_out, client_in);
        let dispatcher = transport.dispatcher();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = dispatcher
            .send(
                "textDocument/documentSymbol",
                json!({}),
                Dispatch::Request(handler(move |result| async move {
                    let _ = tx.send(result.unwrap());
                })),
            )
            .await
            .unwrap()
            .unwrap();

        let mut stream = Vec::new();
        stream.extend_from_slice(b"Content-Length: 0\r\n\r\n");
        stream.extend(encode_frame(b"{not json"));
        stream.extend(encode_frame(br#"{"method":"window/logMessage","params":{"type":3,"message":"hi"}}"#));
        stream.extend(encode_frame(br#"{"id":4242,"result":null}"#));
        stream.extend(encode_frame(json!({"jsonrpc": "2.0", "id": id, "result": ["ok"]}).to_string().as_bytes()));
        server_in.write_all(&stream).await.unwrap();

        assert_eq!(rx.recv().await, Some(json!(["ok"])));
        assert_eq!(dispatcher.pending_count(), 0);

        drop(server_in);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_joins_loops_after_end_of_stream() {
        let (client_out, server_in) = tokio::io::duplex(1024);
        let (client_in, _server_out) = tokio::io::duplex(1024);
        let (stderr_client, mut stderr_server) = tokio::io::duplex(1024);
        let transport = Transport::from_streams(client_out, client_in).with_diagnostics(stderr_client);

        stderr_server.write_all(b"starting\n\n  serving  \n").await.unwrap();
        drop(stderr_server);
        drop(server_in);

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_end_of_stream_releases_pending_requests() {
        let (client_out, server_in) = tokio::io::duplex(1024);
        let (client_in, _server_out) = tokio::io::duplex(1024);
        let transport = Transport::from_streams(client_out, client_in);
        let dispatcher = transport.dispatcher();

        let tracker = TaskTracker::new();
        let token = tracker.token();
        dispatcher
            .send(
                "textDocument/references",
                json!({}),
                Dispatch::Request(handler(move |_| async move {
                    drop(token);
                })),
            )
            .await
            .unwrap();
        tracker.close();

        let waiting = dispatcher.clone();
        let request = tokio::spawn(async move { waiting.request("textDocument/prepareTypeHierarchy", json!({})).await });
        while dispatcher.pending_count() < 2 {
            tokio::task::yield_now().await;
        }

        drop(server_in);

        tokio::time::timeout(Duration::from_secs(2), tracker.wait())
            .await
            .unwrap();
        assert!(matches!(request.await.unwrap(), Err(LspError::HandlerDropped(_))));
        assert_eq!(dispatcher.pending_count(), 0);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_reader_survives_oversized_and_garbled_headers() {
        let (client_out, mut server_in) = tokio::io::duplex(16 * 1024);
        let (client_in, _server_out) = tokio::io::duplex(16 * 1024);
        let transport = Transport::from_streams(client_out, client_in);
        let dispatcher = transport.dispatcher();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = dispatcher
            .send(
                "textDocument/documentSymbol",
                json!({}),
                Dispatch::Request(handler(move |result| async move {
                    let _ = tx.send(result.unwrap());
                })),
            )
            .await
            .unwrap()
            .unwrap();

        let mut stream = Vec::new();
        stream.extend_from_slice(b"Content-Length: 18446744073709551615\r\n\r\n");
        stream.extend_from_slice(b"X-Junk: \xff\xfe\r\n\r\n");
        stream.extend(encode_frame(json!({"jsonrpc": "2.0", "id": id, "result": ["ok"]}).to_string().as_bytes()));
        server_in.write_all(&stream).await.unwrap();

        assert_eq!(rx.recv().await, Some(json!(["ok"])));

        drop(server_in);
        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_send_fails_after_close() {
        let (client_out, server_in) = tokio::io::duplex(1024);
        let (client_in, _server_out) = tokio::io::duplex(1024);
        let transport = Transport::from_streams(client_out, client_in);
        let dispatcher = transport.dispatcher();

        drop(server_in);
        transport.close().await.unwrap();

        let result = dispatcher.send("initialized", Value::Null, Dispatch::Notification).await;
        assert!(matches!(result, Err(LspError::Write(_))));
    }

    #[test]
    fn test_spawn_unknown_server() {
        let config = ServerConfig {
            command: "deadweight-no-such-server".to_string(),
            args: vec![],
            initialization_options: None,
        };
        assert!(matches!(
            Transport::spawn(&config),
            Err(LspError::ServerNotFound { .. })
        ));
    }
}
