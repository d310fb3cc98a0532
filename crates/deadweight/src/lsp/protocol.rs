use crate::lsp::error::{FrameError, LspError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const JSONRPC_VERSION: &str = "2.0";

/// Largest frame body accepted from the server.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Outbound JSON-RPC message. Notifications carry no id.
#[derive(Debug, Serialize)]
pub struct OutgoingMessage<'a> {
    pub jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    pub method: &'a str,
    pub params: &'a Value,
}

impl<'a> OutgoingMessage<'a> {
    pub fn request(id: i32, method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params,
        }
    }

    pub fn notification(method: &'a str, params: &'a Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseErrorBody {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Inbound message as read off the server's stdout.
///
/// Responses carry `id` plus `result` or `error`. Anything carrying a `method`
/// was initiated by the server and is never correlated with our requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<ResponseErrorBody>,
}

impl IncomingMessage {
    /// Id of the request this message answers, if any.
    ///
    /// `0` is the "no correlation" sentinel: the dispatcher starts allocating at 1.
    pub fn correlation_id(&self) -> Option<i32> {
        if self.method.is_some() {
            return None;
        }
        self.id
            .as_ref()
            .and_then(Value::as_i64)
            .and_then(|id| i32::try_from(id).ok())
            .filter(|id| *id != 0)
    }

    pub fn into_result(self) -> Result<Value, LspError> {
        match self.error {
            Some(error) => Err(LspError::Response {
                code: error.code,
                message: error.message,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Serializes a message and prepends its `Content-Length` header block.
pub fn encode_message(message: &OutgoingMessage<'_>) -> Result<Vec<u8>, serde_json::Error> {
    let body = serde_json::to_vec(message)?;
    Ok(encode_frame(&body))
}

pub fn encode_frame(body: &[u8]) -> Vec<u8> {
    let header = format!("Content-Length: {}\r\n\r\n", body.len());
    let mut frame = Vec::with_capacity(header.len() + body.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(body);
    frame
}

/// Writes one complete frame. Callers serialize access to the writer so that
/// header and body of concurrent frames never interleave.
pub async fn write_lsp_message<W: AsyncWrite + Unpin + ?Sized>(writer: &mut W, frame: &[u8]) -> std::io::Result<()> {
    writer.write_all(frame).await?;
    writer.flush().await
}

/// Reads one frame body.
///
/// The header block is always consumed up to its blank terminator before a
/// header problem is reported, so the stream stays aligned on frame boundaries.
pub async fn read_lsp_message<R: AsyncBufRead + Unpin>(reader: &mut R) -> Result<String, FrameError> {
    let mut content_length: Option<usize> = None;
    let mut invalid_length: Option<String> = None;
    let mut line = Vec::new();

    loop {
        line.clear();
        let bytes_read = reader.read_until(b'\n', &mut line).await?;
        if bytes_read == 0 {
            return Err(FrameError::EndOfStream);
        }

        let text = String::from_utf8_lossy(&line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            break;
        }

        if let Some((key, value)) = trimmed.split_once(':') {
            if key.trim().eq_ignore_ascii_case("content-length") {
                match value.trim().parse::<usize>() {
                    Ok(length) => content_length = Some(length),
                    Err(_) => invalid_length = Some(value.trim().to_string()),
                }
            }
        }
    }

    if let Some(value) = invalid_length {
        return Err(FrameError::InvalidContentLength(value));
    }
    let content_length = match content_length {
        Some(length) if length > MAX_FRAME_LEN => return Err(FrameError::InvalidContentLength(length.to_string())),
        Some(length) if length > 0 => length,
        _ => return Err(FrameError::MissingContentLength),
    };

    let mut buffer = vec![0; content_length];
    reader
        .read_exact(&mut buffer)
        .await
        .map_err(FrameError::Truncated)?;

    Ok(String::from_utf8(buffer)?)
}

pub fn parse_lsp_message(content: &str) -> serde_json::Result<IncomingMessage> {
    serde_json::from_str(content)
}
