//! HTTP surface: the static front end plus the analyze and chat endpoints.

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::client::ModelClient;
use crate::config::Config;
use crate::error::AppError;
use crate::service::CodeAssistant;
use crate::types::{
    Action, AnalyzePayload, AnalyzeResponse, ChatPayload, ChatRequest, ChatResponse, CodeSnippet,
    TaskRequest,
};
use crate::{log_error, log_info};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared handler state, built once at startup.
///
/// `assistant` is `None` when no usable credential was found; every API call
/// then answers with a configuration error.
#[derive(Clone)]
pub struct AppState {
    assistant: Option<Arc<CodeAssistant>>,
    default_language: String,
}

impl AppState {
    pub fn configured(assistant: CodeAssistant, default_language: impl Into<String>) -> Self {
        Self {
            assistant: Some(Arc::new(assistant)),
            default_language: default_language.into(),
        }
    }

    pub fn unconfigured(default_language: impl Into<String>) -> Self {
        Self {
            assistant: None,
            default_language: default_language.into(),
        }
    }

    /// Build the state from configuration, degrading to unconfigured on a missing credential
    pub fn from_config(config: &Config) -> Self {
        match ModelClient::from_config(config) {
            Ok(client) => {
                log_info!(
                    "Assistant initialized with {} ({})",
                    client.provider(),
                    client.model()
                );
                Self::configured(
                    CodeAssistant::new(Arc::new(client)),
                    config.default_language.clone(),
                )
            }
            Err(e) => {
                log_error!("Assistant not configured: {}", e);
                Self::unconfigured(config.default_language.clone())
            }
        }
    }

    fn assistant(&self) -> Result<&CodeAssistant, AppError> {
        self.assistant.as_deref().ok_or_else(AppError::not_configured)
    }

    fn snippet(&self, code: String, language: Option<String>) -> CodeSnippet {
        CodeSnippet::new(code)
            .with_language(language.or_else(|| Some(self.default_language.clone())))
    }
}

/// Routes for the whole application
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/analyze", post(analyze))
        .route("/api/chat", post(chat))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let state = AppState::from_config(config);
    let addr = config.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    log_info!("Listening on http://{}", addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    log_info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log_error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn analyze(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzePayload>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let assistant = state.assistant()?;
    let request = analyze_request(&state, payload)?;
    Ok(Json(assistant.analyze(&request).await))
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let assistant = state.assistant()?;
    let request = chat_request(&state, payload)?;
    Ok(Json(ChatResponse {
        response: assistant.chat(&request).await,
    }))
}

fn analyze_request(
    state: &AppState,
    payload: Result<Json<AnalyzePayload>, JsonRejection>,
) -> Result<TaskRequest, AppError> {
    const REQUIRED: &str = "Invalid request payload: \"code\" and \"action\" are required.";

    let Json(payload) = payload.map_err(|_| AppError::Validation(REQUIRED.to_string()))?;
    let (Some(code), Some(action)) = (payload.code, payload.action) else {
        return Err(AppError::Validation(REQUIRED.to_string()));
    };
    let action: Action = action.parse().map_err(AppError::Validation)?;

    Ok(TaskRequest {
        snippet: state.snippet(code, payload.language),
        action,
        instructions: payload.instructions,
    })
}

fn chat_request(
    state: &AppState,
    payload: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<ChatRequest, AppError> {
    const REQUIRED: &str = "Invalid request: \"code\" and \"query\" are required.";

    let Json(payload) = payload.map_err(|_| AppError::Validation(REQUIRED.to_string()))?;
    let (Some(code), Some(query)) = (payload.code, payload.query) else {
        return Err(AppError::Validation(REQUIRED.to_string()));
    };

    Ok(ChatRequest {
        snippet: state.snippet(code, payload.language),
        query,
    })
}
