//! Line-oriented stdio transport
//!
//! One JSON-RPC message per line in, one response per line out. Messages
//! are handled strictly in order: the next line is not read until the
//! previous response has been written and flushed.

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::protocol::McpHandler;
use crate::provider::ToolProvider;

/// Longest slice of an unparseable line that is echoed into the logs
const LOG_PREVIEW_CHARS: usize = 200;

/// Serve a handler over the process's stdin/stdout until stdin closes
pub async fn serve_stdio<P: ToolProvider>(handler: &McpHandler<P>) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    serve_lines(handler, tokio::io::stdin(), &mut stdout).await
}

/// Serve a handler over any line-oriented reader/writer pair
pub async fn serve_lines<P, R, W>(
    handler: &McpHandler<P>,
    reader: R,
    writer: &mut W,
) -> anyhow::Result<()>
where
    P: ToolProvider,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(e) => {
                tracing::warn!(error = %e, "Non UTF-8 line on stdin");
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                let preview: String = line.chars().take(LOG_PREVIEW_CHARS).collect();
                tracing::warn!(error = %e, line = %preview, "Invalid JSON on stdin");
                continue;
            }
        };

        if let Some(response) = handler.handle_value(message).await {
            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("stdin closed");
    Ok(())
}
