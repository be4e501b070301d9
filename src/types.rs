//! Request, response, and result types shared by the orchestrator and the HTTP layer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language assumed when a request does not name one
pub const DEFAULT_LANGUAGE: &str = "python";

/// Source code submitted for analysis, with an optional language tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSnippet {
    pub code: String,
    language: Option<String>,
}

impl CodeSnippet {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: None,
        }
    }

    /// Attach a language tag. Blank tags are ignored.
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language.filter(|lang| !lang.trim().is_empty());
        self
    }

    /// The tagged language, or [`DEFAULT_LANGUAGE`]
    pub fn language(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}

/// Structured explanation of a snippet. Both fields are always populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplanationResult {
    pub explanation_html: String,
    pub mermaid_code: String,
}

/// Refactored source code with markdown fences removed
pub type RefactorResult = String;

/// Chat answer or the empty-query placeholder
pub type ChatResult = String;

/// What the analyze flow should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Explain,
    Refactor,
}

impl Action {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Explain => "explain",
            Self::Refactor => "refactor",
        }
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "explain" => Ok(Self::Explain),
            "refactor" => Ok(Self::Refactor),
            other => Err(format!(
                "Unsupported action '{other}'. Expected 'explain' or 'refactor'."
            )),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Validated input for the analyze flow
#[derive(Debug, Clone)]
pub struct TaskRequest {
    pub snippet: CodeSnippet,
    pub action: Action,
    pub instructions: Option<String>,
}

/// Validated input for the chat flow
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub snippet: CodeSnippet,
    pub query: String,
}

/// Raw `POST /api/analyze` body. Fields are optional so that missing ones
/// can be reported as a validation error instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzePayload {
    pub code: Option<String>,
    pub action: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Raw `POST /api/chat` body
#[derive(Debug, Default, Deserialize)]
pub struct ChatPayload {
    pub code: Option<String>,
    pub query: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// `POST /api/analyze` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub explanation_html: String,
    pub mermaid_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refactored_code: Option<RefactorResult>,
}

/// `POST /api/chat` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: ChatResult,
}
