//! code-scribe - LLM-backed code explanation and refactoring service
//!
//! This library builds prompts for explaining, refactoring, and chatting about
//! source code, sends them to a hosted language model, and turns the free-form
//! replies into structured results served over a small JSON API.

#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped consts are fine

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod parser;
pub mod prompts;
pub mod providers;
pub mod server;
pub mod service;
pub mod types;

pub use client::{GenerationRequest, LanguageModel, ModelClient, ModelError};
pub use config::Config;
pub use error::AppError;
pub use parser::ResponseParser;
pub use providers::{Provider, ProviderConfig};
pub use server::{AppState, router};
pub use service::CodeAssistant;
pub use types::{
    Action, AnalyzeResponse, ChatRequest, ChatResponse, CodeSnippet, ExplanationResult,
    TaskRequest,
};
