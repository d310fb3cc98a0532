use std::io;

/// Errors produced while talking to the language server.
#[derive(Debug, thiserror::Error)]
pub enum LspError {
    #[error("Language server '{command}' was not found on PATH: {source}")]
    ServerNotFound {
        command: String,
        #[source]
        source: which::Error,
    },
    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to create {0} pipe")]
    MissingPipe(&'static str),
    #[error("Failed to write message: {0}")]
    Write(#[source] io::Error),
    #[error("Failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Path cannot be converted to a file URI: {0}")]
    InvalidPath(String),
    #[error("LSP Error {code}: {message}")]
    Response { code: i64, message: String },
    #[error("Response handler for request {0} was dropped before a reply arrived")]
    HandlerDropped(i32),
    #[error("Language server closed its output")]
    ConnectionClosed,
    #[error("Session is {actual}, expected {expected}")]
    InvalidState { expected: &'static str, actual: String },
}

/// Errors produced while reading a single frame off the server's stdout.
///
/// [`FrameError::EndOfStream`] and header read failures stop the reader loop;
/// every other variant drops the offending frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("Connection closed by language server")]
    EndOfStream,
    #[error("Missing or zero Content-Length header")]
    MissingContentLength,
    #[error("Invalid Content-Length header '{0}'")]
    InvalidContentLength(String),
    #[error("Failed to read headers: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to read frame body: {0}")]
    Truncated(#[source] io::Error),
    #[error("Frame body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub type Result<T, E = LspError> = std::result::Result<T, E>;
