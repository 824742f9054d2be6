//! LLM provider implementations.
//!
//! Concrete implementations of the `LlmProvider` trait from `xmem-core`:
//! - `OpenAiProvider`: any OpenAI-compatible API via a configurable base URL
//! - `OllamaProvider`: a local Ollama server

pub mod ollama;
pub mod openai;
