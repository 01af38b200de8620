//! Parser for the `data:` lines of an OpenAI-format SSE stream.
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```

use crate::error::{ProviderError, Result};
use crate::types::{StreamChunk, StreamDelta};

/// End-of-stream sentinel.
const DONE_SENTINEL: &str = "[DONE]";

/// Parse one SSE line into at most one [`StreamChunk`].
///
/// Empty lines, comments, and non-`data:` fields yield `None`. A `data:`
/// line with unparseable JSON is an [`ProviderError::InvalidResponse`].
pub fn parse_sse_line(line: &str) -> Result<Option<StreamChunk>> {
    let line = line.trim_end();

    if line.is_empty() || line.starts_with(':') {
        return Ok(None);
    }
    let Some(payload) = line.strip_prefix("data:") else {
        // event:, id:, retry: fields
        return Ok(None);
    };
    let payload = payload.trim_start();
    if payload.is_empty() {
        return Ok(None);
    }
    if payload == DONE_SENTINEL {
        return Ok(Some(StreamChunk::Done));
    }

    let delta: StreamDelta = serde_json::from_str(payload)
        .map_err(|e| ProviderError::InvalidResponse(format!("bad stream delta: {e}")))?;

    let Some(choice) = delta.choices.first() else {
        return Ok(None);
    };
    if let Some(text) = &choice.delta.content {
        if !text.is_empty() {
            return Ok(Some(StreamChunk::TextDelta(text.clone())));
        }
    }
    if choice.finish_reason.is_some() {
        return Ok(Some(StreamChunk::Done));
    }
    Ok(None)
}
