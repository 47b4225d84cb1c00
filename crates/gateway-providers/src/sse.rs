//! Shared SSE buffering/forwarding loop.
//!
//! Upstream bytes arrive in arbitrary chunks that don't align with event
//! boundaries; this buffers partial lines, forwards each complete `data: `
//! line to the client immediately, and only inspects the decoded JSON to
//! accumulate usage — the usage trailer is never required to forward a
//! chunk, only to settle the call once the stream ends.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use gateway_core::Usage;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;

use crate::adapter::{Chunk, FinalUsage};

const DONE_MARKER: &str = "[DONE]";
const FORWARD_BUFFER: usize = 64;

fn merge_usage(acc: &mut Option<Usage>, delta: Usage) {
    let base = acc.get_or_insert_with(Usage::default);
    base.input += delta.input;
    base.output += delta.output;
    base.cache_read += delta.cache_read;
    base.cache_write += delta.cache_write;
}

/// Consume `response` as an SSE stream: forward every `data: ` line
/// verbatim to the returned stream, and call `extract_usage` on every
/// decodable JSON payload to accumulate the usage reported back on
/// `FinalUsage` once the body ends.
///
/// `extract_usage` returns a usage *delta* (fields present in this event),
/// not a running total — deltas across events are summed. A provider that
/// reports a single complete usage object once still works correctly, since
/// summing once is the same as overwriting once.
pub fn stream_sse_with_usage<F>(
    response: reqwest::Response,
    mut extract_usage: F,
) -> (BoxStream<'static, Chunk>, FinalUsage)
where
    F: FnMut(&serde_json::Value) -> Option<Usage> + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Chunk>(FORWARD_BUFFER);
    let (usage_tx, usage_rx) = oneshot::channel();

    tokio::spawn(async move {
        let mut buf = String::new();
        let mut final_usage: Option<Usage> = None;
        let mut byte_stream = response.bytes_stream();

        'outer: while let Some(next) = byte_stream.next().await {
            let bytes = match next {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "upstream stream read error, closing early");
                    break;
                }
            };
            buf.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = buf.find('\n') {
                let line = buf[..newline].trim_end_matches('\r').to_string();
                buf.drain(..=newline);

                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };

                if data == DONE_MARKER {
                    let frame = Bytes::from(format!("data: {DONE_MARKER}\n\n"));
                    if tx.send(Ok(frame)).await.is_err() {
                        break 'outer;
                    }
                    continue;
                }

                if let Ok(value) = serde_json::from_str::<serde_json::Value>(data) {
                    if let Some(delta) = extract_usage(&value) {
                        merge_usage(&mut final_usage, delta);
                    }
                }

                let frame = Bytes::from(format!("data: {data}\n\n"));
                if tx.send(Ok(frame)).await.is_err() {
                    break 'outer;
                }
            }
        }

        let _ = usage_tx.send(final_usage);
    });

    (Box::pin(ReceiverStream::new(rx)), usage_rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_usage_sums_components() {
        let mut acc = None;
        merge_usage(
            &mut acc,
            Usage {
                input: 10,
                output: 0,
                cache_read: 0,
                cache_write: 0,
            },
        );
        merge_usage(
            &mut acc,
            Usage {
                input: 0,
                output: 20,
                cache_read: 0,
                cache_write: 0,
            },
        );
        let usage = acc.unwrap();
        assert_eq!(usage.input, 10);
        assert_eq!(usage.output, 20);
    }
}
