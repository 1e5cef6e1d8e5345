//! ABAP code generation for ABAPify
//!
//! This crate turns a natural-language description into ABAP source text:
//! prompts are rendered from embedded Tera templates, sent to an LLM provider
//! and the response is written to disk unchanged.

mod artifact;
mod generator;
pub mod llm;
mod templates;

pub use artifact::{default_filename, write_artifact, ABAP_EXTENSION};
pub use generator::{AbapGenerator, EnhancementType, ProgramSpec};
pub use llm::{ChatCompletionsProvider, ChatRequest, LlmClient, LlmProvider, ProviderProfile};
pub use templates::PromptAssembler;
