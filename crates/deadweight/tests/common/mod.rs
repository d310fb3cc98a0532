//! In-process language server stub speaking the framed protocol over duplex
//! pipes. Replies are delayed by an amount derived from the request id, so
//! they come back out of order.

#![allow(dead_code)]

use deadweight::lsp::protocol::{encode_frame, read_lsp_message, write_lsp_message};
use deadweight::lsp::Transport;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{BufReader, DuplexStream};
use tokio::sync::Mutex;
use tokio::task::{JoinHandle, JoinSet};
use url::Url;

type Key = (String, u32, u32);

pub fn stub_root() -> PathBuf {
    std::env::temp_dir().join("deadweight-stub")
}

fn range(line: u32, character: u32, len: u32) -> Value {
    json!({
        "start": {"line": line, "character": character},
        "end": {"line": line, "character": character + len}
    })
}

/// A function declared as `func <name>` on `line`; its name starts at column 5.
pub fn function(name: &str, line: u32) -> Value {
    json!({
        "name": name,
        "detail": "func()",
        "kind": 12,
        "range": range(line, 0, 20),
        "selectionRange": range(line, 5, name.len() as u32),
    })
}

pub fn variable(name: &str, line: u32) -> Value {
    json!({
        "name": name,
        "kind": 13,
        "range": range(line, 4, 20),
        "selectionRange": range(line, 4, name.len() as u32),
    })
}

/// A struct field whose name starts at column 1.
pub fn field(name: &str, detail: &str, line: u32) -> Value {
    json!({
        "name": name,
        "detail": detail,
        "kind": 8,
        "range": range(line, 1, 20),
        "selectionRange": range(line, 1, name.len() as u32),
    })
}

pub fn structure(name: &str, line: u32, children: Vec<Value>) -> Value {
    json!({
        "name": name,
        "detail": "struct{...}",
        "kind": 23,
        "range": range(line, 0, 40),
        "selectionRange": range(line, 5, name.len() as u32),
        "children": children,
    })
}

/// What the stub knows about the workspace.
#[derive(Debug, Clone)]
pub struct StubWorkspace {
    root: PathBuf,
    symbols: HashMap<String, Value>,
    references: HashMap<Key, Vec<String>>,
    types: HashSet<Key>,
    failing_hierarchies: HashSet<Key>,
    answer_initialize: bool,
}

impl StubWorkspace {
    pub fn new() -> Self {
        Self {
            root: stub_root(),
            symbols: HashMap::new(),
            references: HashMap::new(),
            types: HashSet::new(),
            failing_hierarchies: HashSet::new(),
            answer_initialize: true,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn file(mut self, file: &str, symbols: Vec<Value>) -> Self {
        self.symbols.insert(file.to_string(), Value::Array(symbols));
        self
    }

    /// Replies to `documentSymbol` for `file` with `result` verbatim.
    pub fn raw_symbols(mut self, file: &str, result: Value) -> Self {
        self.symbols.insert(file.to_string(), result);
        self
    }

    pub fn references(mut self, file: &str, line: u32, character: u32, from: &[&str]) -> Self {
        self.references.insert(
            (file.to_string(), line, character),
            from.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    /// The position resolves to a nominal type.
    pub fn nominal_type(mut self, file: &str, line: u32, character: u32) -> Self {
        self.types.insert((file.to_string(), line, character));
        self
    }

    pub fn failing_hierarchy(mut self, file: &str, line: u32, character: u32) -> Self {
        self.failing_hierarchies.insert((file.to_string(), line, character));
        self
    }

    /// Never answer `initialize`.
    pub fn silent(mut self) -> Self {
        self.answer_initialize = false;
        self
    }

    fn uri(&self, file: &str) -> String {
        Url::from_file_path(self.root.join(file))
            .map(|uri| uri.to_string())
            .unwrap_or_else(|()| file.to_string())
    }

    fn relative(&self, uri: &Value) -> String {
        let uri = uri.as_str().unwrap_or_default();
        Url::parse(uri)
            .ok()
            .and_then(|uri| uri.to_file_path().ok())
            .and_then(|path| {
                path.strip_prefix(&self.root)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .unwrap_or_else(|| uri.to_string())
    }

    fn key(&self, params: &Value) -> Key {
        (
            self.relative(&params["textDocument"]["uri"]),
            params["position"]["line"].as_u64().unwrap_or_default() as u32,
            params["position"]["character"].as_u64().unwrap_or_default() as u32,
        )
    }

    fn reply(&self, method: &str, params: &Value) -> Result<Value, Value> {
        match method {
            "initialize" => Ok(json!({"capabilities": {"referencesProvider": true}})),
            "textDocument/documentSymbol" => {
                let file = self.relative(&params["textDocument"]["uri"]);
                Ok(self.symbols.get(&file).cloned().unwrap_or(Value::Null))
            },
            "textDocument/references" => {
                let files = self.references.get(&self.key(params)).cloned().unwrap_or_default();
                Ok(Value::Array(
                    files
                        .iter()
                        .map(|file| json!({"uri": self.uri(file), "range": range(10, 2, 5)}))
                        .collect(),
                ))
            },
            "textDocument/prepareTypeHierarchy" => {
                let key = self.key(params);
                if self.failing_hierarchies.contains(&key) {
                    Err(json!({"code": -32603, "message": "no type at position"}))
                } else if self.types.contains(&key) {
                    Ok(json!([{"name": key.0, "kind": 23, "uri": self.uri(&key.0),
                        "range": range(key.1, key.2, 5), "selectionRange": range(key.1, key.2, 5)}]))
                } else {
                    Ok(Value::Null)
                }
            },
            _ => Err(json!({"code": -32601, "message": format!("method not found: {}", method)})),
        }
    }
}

/// Connects a transport to a stub serving `workspace`. The handle resolves to
/// every message the stub received once the client closes its end.
pub fn connect(workspace: StubWorkspace) -> (Transport, JoinHandle<Vec<Value>>) {
    let (client_writer, server_reader) = tokio::io::duplex(1 << 16);
    let (server_writer, client_reader) = tokio::io::duplex(1 << 16);
    let transport = Transport::from_streams(client_reader, client_writer);
    let handle = tokio::spawn(serve(workspace, server_reader, server_writer));
    (transport, handle)
}

fn reply_delay(id: u64) -> Duration {
    Duration::from_millis(id * 7 % 13)
}

async fn send(writer: &Mutex<DuplexStream>, message: Value) {
    let frame = encode_frame(&serde_json::to_vec(&message).unwrap());
    let _ = write_lsp_message(&mut *writer.lock().await, &frame).await;
}

async fn serve(workspace: StubWorkspace, reader: DuplexStream, writer: DuplexStream) -> Vec<Value> {
    let workspace = Arc::new(workspace);
    let writer = Arc::new(Mutex::new(writer));
    let mut reader = BufReader::new(reader);
    let mut received = Vec::new();
    let mut replies = JoinSet::new();

    while let Ok(body) = read_lsp_message(&mut reader).await {
        let message: Value = serde_json::from_str(&body).unwrap();
        received.push(message.clone());

        let Some(id) = message.get("id").and_then(Value::as_u64) else {
            continue;
        };
        let method = message["method"].as_str().unwrap_or_default().to_string();
        if method == "initialize" && !workspace.answer_initialize {
            continue;
        }

        let workspace = Arc::clone(&workspace);
        let writer = Arc::clone(&writer);
        replies.spawn(async move {
            tokio::time::sleep(reply_delay(id)).await;
            let reply = match workspace.reply(&method, &message["params"]) {
                Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
            };
            send(&writer, reply).await;

            if method == "initialize" {
                // Server-initiated traffic reusing a client id must not be matched.
                send(
                    &writer,
                    json!({"jsonrpc": "2.0", "id": 2, "method": "workspace/configuration", "params": {"items": []}}),
                )
                .await;
                send(
                    &writer,
                    json!({"jsonrpc": "2.0", "method": "window/logMessage", "params": {"type": 3, "message": "ready"}}),
                )
                .await;
            }
        });
    }

    while replies.join_next().await.is_some() {}
    received
}

pub fn methods(messages: &[Value]) -> Vec<&str> {
    messages.iter().filter_map(|m| m["method"].as_str()).collect()
}
