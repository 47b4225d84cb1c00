//! Uniform adapter contract over upstream LLM providers (spec.md §4.7).

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod adapter;
pub mod anthropic;
pub mod openai;
pub mod sse;

pub use adapter::{AdapterResponse, Chunk, Dispatch, FinalUsage, ProviderAdapter};
pub use anthropic::AnthropicAdapter;
pub use openai::OpenAiAdapter;
