//! Assistant model provider for mailpilot.
//!
//! The conversational layer is a stateless relay: a chat request goes to
//! an OpenAI-compatible endpoint and the reply (whole or streamed token
//! by token) comes back. [`ChatProvider`] is the seam; the server never
//! names a concrete vendor.

pub mod error;
pub mod provider;
pub mod sse;
pub mod types;

pub use error::{ProviderError, Result};
pub use provider::{ChatProvider, OpenAiCompatProvider};
pub use types::{ChatMessage, ChatRequest, ChatResponse, StreamChunk};
