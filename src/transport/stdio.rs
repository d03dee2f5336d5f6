//! Newline-delimited JSON-RPC over standard streams

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::config::StdioConfig;
use crate::error::rpc_codes;
use crate::gateway::Dispatcher;
use crate::protocol::JsonRpcResponse;
use crate::{Error, Result};

/// Serve `dispatcher` on this process's stdin/stdout until stdin closes.
///
/// Every message is charged to the configured caller key.
pub async fn serve_stdio(dispatcher: &Dispatcher, config: &StdioConfig) -> Result<()> {
    info!(
        caller = %config.caller_key,
        max_line_size = config.max_line_size,
        tools = dispatcher.registry().len(),
        "Serving on stdio"
    );
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    let handled = serve_lines(
        dispatcher,
        &config.caller_key,
        config.max_line_size,
        stdin,
        stdout,
    )
    .await?;
    info!(messages = handled, "stdin closed");
    Ok(())
}

/// One newline-terminated frame read from the input
enum Frame {
    /// The line fit within the limit and sits in the read buffer
    Line,
    /// The line exceeded the limit and was discarded
    Oversized,
}

/// Read bytes up to the next `\n` (or EOF) into `buf`, keeping at most
/// `limit` bytes. Past the limit the rest of the line is consumed and dropped.
///
/// Returns `None` at EOF with nothing read.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>, limit: usize) -> std::io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut oversized = false;
    let mut read_any = false;

    loop {
        let (used, done) = {
            let available = reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            read_any = true;
            let (chunk, used, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };
            if !oversized {
                if buf.len() + chunk.len() > limit {
                    oversized = true;
                    buf.clear();
                } else {
                    buf.extend_from_slice(chunk);
                }
            }
            (used, done)
        };
        reader.consume(used);
        if done {
            break;
        }
    }

    Ok(match (read_any, oversized) {
        (false, _) => None,
        (true, true) => Some(Frame::Oversized),
        (true, false) => Some(Frame::Line),
    })
}

/// Read one message per line from `reader` and write one response line per
/// message to `writer`. Blank lines are skipped.
///
/// Lines are handed to the dispatcher as raw bytes, so invalid UTF-8 is
/// answered with a parse error like any other malformed message. A line
/// longer than `max_line_size` bytes is answered with a parse error without
/// being buffered.
///
/// Returns the number of messages handled once `reader` reaches EOF.
pub async fn serve_lines<R, W>(
    dispatcher: &Dispatcher,
    caller_key: &str,
    max_line_size: usize,
    mut reader: R,
    mut writer: W,
) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut handled = 0;

    while let Some(frame) = read_frame(&mut reader, &mut buf, max_line_size)
        .await
        .map_err(|e| Error::Transport(format!("Failed to read message: {e}")))?
    {
        let response = match frame {
            Frame::Oversized => {
                warn!(caller = %caller_key, max_line_size, "Oversized message discarded");
                JsonRpcResponse::error(
                    Value::Null,
                    rpc_codes::PARSE_ERROR,
                    format!("Parse error: message exceeds {max_line_size} bytes"),
                )
            }
            Frame::Line => {
                let line = buf.trim_ascii();
                if line.is_empty() {
                    continue;
                }
                dispatcher.handle(line, caller_key)
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer
            .write_all(&out)
            .await
            .map_err(|e| Error::Transport(format!("Failed to write response: {e}")))?;
        writer.flush().await?;

        handled += 1;
        debug!(handled, "Response written");
    }

    Ok(handled)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::admission::{AdmissionControl, BucketPolicy};
    use crate::dice::SequenceRandom;
    use crate::registry::ToolRegistry;
    use pretty_assertions::assert_eq;

    const LIMIT: usize = 256;

    fn dispatcher() -> Dispatcher {
        let policy = BucketPolicy::new(10, 10, Duration::from_secs(60)).unwrap();
        Dispatcher::new(
            Arc::new(ToolRegistry::dice()),
            Arc::new(AdmissionControl::new(policy)),
            5,
        )
        .with_random(Arc::new(SequenceRandom::new(vec![2])))
    }

    async fn run_with<R: AsyncBufRead + Unpin>(reader: R) -> Vec<JsonRpcResponse> {
        let d = dispatcher();
        let mut output = Vec::new();
        let handled = serve_lines(&d, "stdio", LIMIT, reader, &mut output)
            .await
            .unwrap();
        let responses: Vec<JsonRpcResponse> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(responses.len(), handled);
        responses
    }

    async fn run(input: &[u8]) -> Vec<JsonRpcResponse> {
        run_with(input).await
    }

    #[tokio::test]
    async fn one_response_line_per_message() {
        let input = b"{\"id\":1,\"method\":\"tools/list\"}\n\n   \n{\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"roll_d6\"}}\n";
        let responses = run(input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].id, serde_json::json!(1));
        assert_eq!(responses[1].id, serde_json::json!(2));
        assert!(responses[1].error.is_none());
    }

    #[tokio::test]
    async fn garbage_line_gets_parse_error_and_loop_continues() {
        let responses = run(b"nope\n{\"id\":9,\"method\":\"tools/list\"}").await;
        assert_eq!(responses[0].error_code(), Some(rpc_codes::PARSE_ERROR));
        assert_eq!(responses[1].id, serde_json::json!(9));
    }

    #[tokio::test]
    async fn invalid_utf8_line_gets_parse_error_and_loop_continues() {
        let input = b"{\"id\":1,\"method\":\"tools/list\"}\n\xff\xfe garbage\n{\"id\":3,\"method\":\"tools/list\"}\n";
        let responses = run(input).await;
        assert_eq!(responses.len(), 3);
        assert!(responses[0].error.is_none());
        assert_eq!(responses[1].error_code(), Some(rpc_codes::PARSE_ERROR));
        assert_eq!(responses[1].id, Value::Null);
        assert_eq!(responses[2].id, serde_json::json!(3));
        assert!(responses[2].error.is_none());
    }

    #[tokio::test]
    async fn crlf_line_endings_are_accepted() {
        let responses = run(b"{\"id\":4,\"method\":\"tools/list\"}\r\n").await;
        assert_eq!(responses.len(), 1);
        assert!(responses[0].error.is_none());
    }

    #[tokio::test]
    async fn oversized_line_gets_parse_error_and_loop_continues() {
        let mut input = format!("{{\"id\":1,\"method\":\"tools/list\",\"pad\":\"{}\"}}\n", "x".repeat(LIMIT * 4))
            .into_bytes();
        input.extend_from_slice(b"{\"id\":2,\"method\":\"tools/list\"}\n");

        // A small read buffer splits the long line across many fills.
        let responses = run_with(BufReader::with_capacity(16, input.as_slice())).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0].error_code(), Some(rpc_codes::PARSE_ERROR));
        assert!(responses[0].error.as_ref().unwrap().message.contains("exceeds 256 bytes"));
        assert_eq!(responses[1].id, serde_json::json!(2));
        assert!(responses[1].error.is_none());
    }

    #[tokio::test]
    async fn line_at_the_limit_is_dispatched() {
        let message = b"{\"id\":5,\"method\":\"tools/list\"}";
        let mut input = message.to_vec();
        input.resize(LIMIT, b' ');
        input.push(b'\n');

        let responses = run(&input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].id, serde_json::json!(5));
        assert!(responses[0].error.is_none());
    }

    #[tokio::test]
    async fn stdio_caller_shares_one_bucket() {
        let call = "{\"id\":1,\"method\":\"tools/call\",\"params\":{\"name\":\"roll_d6\"}}\n";
        let responses = run(call.repeat(3).as_bytes()).await;
        let codes: Vec<_> = responses.iter().map(JsonRpcResponse::error_code).collect();
        assert_eq!(codes, vec![None, None, Some(rpc_codes::RATE_LIMITED)]);
    }
}
