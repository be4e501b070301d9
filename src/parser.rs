//! Response Parser
//!
//! Pulls structured data out of free-form model output. JSON payloads are tried
//! as a whole first and then looked up inside a ```json fenced block; code
//! payloads are unwrapped from their surrounding fence.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::LazyLock;

use crate::log_debug;

// Non-greedy so that only the first labeled block is taken
static JSON_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").expect("Failed to compile JSON block regex")
});

const FENCE: &str = "```";

/// Response parser for model output with format-drift tolerance
#[derive(Clone, Debug, Default)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a JSON object out of `response`.
    ///
    /// Returns `None` when neither the whole response nor a ```json block
    /// holds an object that deserializes into `T`.
    pub fn parse_json_object<T>(&self, response: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let trimmed = response.trim();
        log_debug!("🔍 Parser: Parsing JSON response - {} chars", trimmed.len());

        if let Some(parsed) = Self::decode_object(trimmed) {
            log_debug!("✅ Parser: Direct JSON parsing successful");
            return Some(parsed);
        }
        log_debug!("❌ Parser: Direct JSON parsing failed, trying markdown extraction");

        let Some(block) = self.extract_json_block(trimmed) else {
            log_debug!("🚨 Parser: No ```json block found");
            return None;
        };

        let parsed = Self::decode_object(block);
        if parsed.is_some() {
            log_debug!("✅ Parser: Markdown JSON parsing successful");
        } else {
            log_debug!("🚨 Parser: Markdown JSON block is not a valid object");
        }
        parsed
    }

    /// Find the contents of the first ```json fenced block holding an object
    pub fn extract_json_block<'a>(&self, response: &'a str) -> Option<&'a str> {
        JSON_BLOCK
            .captures(response)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Strip a surrounding code fence (with optional language tag) and trim.
    ///
    /// The remaining text is returned verbatim; it is not checked for being valid code.
    pub fn extract_code_block(&self, response: &str) -> String {
        let mut code = response.trim();

        if let Some(rest) = code.strip_prefix(FENCE) {
            code = strip_language_tag(rest).trim();
        }
        if let Some(rest) = code.strip_suffix(FENCE) {
            code = rest.trim();
        }

        code.to_string()
    }

    fn decode_object<T: DeserializeOwned>(text: &str) -> Option<T> {
        let value: serde_json::Value = serde_json::from_str(text).ok()?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// Drop a language tag such as `python` or `c++` that directly follows an
/// opening fence on its own line. Trailing blanks after the tag are allowed.
fn strip_language_tag(after_fence: &str) -> &str {
    let tag_len = after_fence
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '-' | '_' | '.')))
        .unwrap_or(after_fence.len());

    let (tag, rest) = after_fence.split_at(tag_len);
    if tag.is_empty() {
        return rest;
    }

    let rest = rest.trim_start_matches([' ', '\t']);
    if rest.is_empty() || rest.starts_with('\n') || rest.starts_with("\r\n") {
        rest
    } else {
        after_fence
    }
}
