//! Task orchestration
//!
//! Each task is one prompt → model → parse cycle. Provider and parse failures
//! are contained per task and come back as placeholder content, so callers
//! always receive a fully populated result.

use serde::Deserialize;
use std::fmt;
use std::sync::Arc;

use crate::client::{GenerationRequest, LanguageModel, ModelError};
use crate::parser::ResponseParser;
use crate::prompts;
use crate::types::{
    Action, AnalyzeResponse, ChatRequest, ChatResult, CodeSnippet, ExplanationResult,
    RefactorResult, TaskRequest,
};
use crate::{log_error, log_info, log_warn};

pub const MISSING_EXPLANATION_HTML: &str = "<p>Error: Explanation format is invalid.</p>";
pub const MISSING_MERMAID_CODE: &str = "graph TD; error[Invalid diagram format];";
pub const FAILED_MERMAID_CODE: &str = "graph TD; error[An error occurred];";
pub const EMPTY_QUERY_REPLY: &str = "Please ask a question about the code.";

/// JSON shape requested by the explain prompt. Keys may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawExplanation {
    explanation_html: Option<String>,
    mermaid_code: Option<String>,
}

/// Blank model output counts as missing
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Why an explanation could not be produced
#[derive(Debug)]
enum ExplainFailure {
    Provider(ModelError),
    Unparseable,
}

impl fmt::Display for ExplainFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Provider(e) => write!(f, "{e}"),
            Self::Unparseable => f.write_str("Failed to parse JSON from model response."),
        }
    }
}

impl ExplanationResult {
    /// Placeholder content reporting `reason`
    pub fn failed(reason: &impl fmt::Display) -> Self {
        Self {
            explanation_html: format!(
                "<p>An error occurred during code explanation: {reason}</p>"
            ),
            mermaid_code: FAILED_MERMAID_CODE.to_string(),
        }
    }
}

/// Explains, refactors, and answers questions about code using a language model
#[derive(Clone)]
pub struct CodeAssistant {
    model: Arc<dyn LanguageModel>,
    parser: ResponseParser,
}

impl CodeAssistant {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            parser: ResponseParser::new(),
        }
    }

    /// Explain the snippet as HTML plus a Mermaid flowchart
    pub async fn explain(&self, snippet: &CodeSnippet) -> ExplanationResult {
        match self.try_explain(snippet).await {
            Ok(result) => {
                log_info!("Code explanation and diagram generated.");
                result
            }
            Err(failure) => {
                log_warn!("Explanation fell back to placeholder content: {}", failure);
                ExplanationResult::failed(&failure)
            }
        }
    }

    async fn try_explain(&self, snippet: &CodeSnippet) -> Result<ExplanationResult, ExplainFailure> {
        let request = GenerationRequest::new(prompts::create_explain_prompt(snippet));
        let raw = self
            .model
            .generate(&request)
            .await
            .map_err(ExplainFailure::Provider)?;

        let parsed: RawExplanation = self
            .parser
            .parse_json_object(&raw)
            .ok_or(ExplainFailure::Unparseable)?;

        Ok(ExplanationResult {
            explanation_html: non_blank(parsed.explanation_html)
                .unwrap_or_else(|| MISSING_EXPLANATION_HTML.to_string()),
            mermaid_code: non_blank(parsed.mermaid_code)
                .unwrap_or_else(|| MISSING_MERMAID_CODE.to_string()),
        })
    }

    /// Refactor the snippet, returning bare code without fences
    pub async fn refactor(
        &self,
        snippet: &CodeSnippet,
        instructions: Option<&str>,
    ) -> RefactorResult {
        let request =
            GenerationRequest::new(prompts::create_refactor_prompt(snippet, instructions))
                .plain_text();

        match self.model.generate(&request).await {
            Ok(raw) => {
                log_info!("Code refactoring generated.");
                self.parser.extract_code_block(&raw)
            }
            Err(e) => {
                log_error!("Refactoring failed: {}", e);
                format!("An error occurred during code refactoring: {e}")
            }
        }
    }

    /// Answer a question about the snippet. An empty query never reaches the model.
    #[tracing::instrument(name = "chat", skip_all, fields(language = request.snippet.language()))]
    pub async fn chat(&self, request: &ChatRequest) -> ChatResult {
        if request.query.trim().is_empty() {
            return EMPTY_QUERY_REPLY.to_string();
        }

        let prompt = prompts::create_chat_prompt(&request.snippet, &request.query);
        match self.model.generate(&GenerationRequest::new(prompt)).await {
            Ok(answer) => answer,
            Err(e) => {
                log_error!("Chat request failed: {}", e);
                format!("An error occurred: {e}")
            }
        }
    }

    /// Run the analyze flow: always explain, and refactor when asked to.
    ///
    /// The two model calls are independent and run concurrently; a failed
    /// refactor leaves the explanation intact and vice versa.
    #[tracing::instrument(name = "analyze", skip_all, fields(action = %request.action))]
    pub async fn analyze(&self, request: &TaskRequest) -> AnalyzeResponse {
        log_info!("Received action '{}'", request.action);

        let (explanation, refactored_code) = match request.action {
            Action::Explain => (self.explain(&request.snippet).await, None),
            Action::Refactor => {
                let (explanation, refactored) = tokio::join!(
                    self.explain(&request.snippet),
                    self.refactor(&request.snippet, request.instructions.as_deref())
                );
                (explanation, Some(refactored))
            }
        };

        AnalyzeResponse {
            explanation_html: explanation.explanation_html,
            mermaid_code: explanation.mermaid_code,
            refactored_code,
        }
    }
}
