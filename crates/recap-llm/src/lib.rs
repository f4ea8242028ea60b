//! Language-model plumbing for digest generation.
//!
//! Providers turn a [`Prompt`] into text, either in one piece or as a stream
//! of chunks. [`parse::parse_digest`] then carves that text into a
//! structured digest.

pub mod config;
pub mod error;
pub mod gemini;
pub mod offline;
pub mod openai;
pub mod parse;
pub mod prompt;
pub mod provider;
pub mod sse;

pub use config::{ConfigError, ProviderConfig, ProviderKind, build_provider};
pub use error::LlmError;
pub use provider::{LlmProvider, Prompt, TextStream};
