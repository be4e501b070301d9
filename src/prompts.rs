//! Prompt construction for the explain, refactor, and chat tasks.
//!
//! Every prompt embeds the submitted code verbatim inside a fenced block tagged
//! with the snippet's language.

use crate::types::CodeSnippet;
use std::fmt::Write;

/// Wrap code in a fenced block tagged with `language`
fn fenced(language: &str, code: &str) -> String {
    format!("```{language}\n{code}\n```")
}

/// Prompt asking for an HTML explanation plus a Mermaid flowchart, returned as one JSON object
pub fn create_explain_prompt(snippet: &CodeSnippet) -> String {
    let language = snippet.language();
    let mut prompt = format!(
        "You are an expert software documentation writer. \
        Analyze the following {language} code and produce a two-part explanation.\n\n"
    );

    prompt.push_str(
        "**Part 1: HTML Explanation**
Write a concise HTML fragment explaining the code, structured exactly like this:
- An `<h4>` heading titled \"High-Level Summary\".
- A `<p>` with a short summary of what the code does.
- An `<h4>` heading titled \"Key Components\".
- A `<ul>` with one `<li>` per function, class, or key part. Inside each `<li>`, put the name in `<strong>` followed by a short description.
- Do NOT include `<html>`, `<head>`, or `<body>` tags.

**Part 2: Mermaid.js Flowchart**
Write a Mermaid.js flowchart definition that illustrates the code's workflow.
- The flowchart must be a `graph TD` (top-down).
- Use clear, short node labels.
- Example: `A[Start] --> B(Process Data) --> C{Decision} --> D[End]`.

**Your final output must be a single, valid JSON object** with exactly two keys, \"explanation_html\" and \"mermaid_code\", wrapped in a ```json markdown block.\n\n",
    );

    let _ = write!(
        prompt,
        "**Code to analyze:**\n{}\n",
        fenced(language, &snippet.code)
    );
    prompt
}

/// Prompt asking for refactored code only, optionally steered by user instructions
pub fn create_refactor_prompt(snippet: &CodeSnippet, instructions: Option<&str>) -> String {
    let language = snippet.language();
    let mut prompt = format!(
        "As an expert software engineer specializing in code quality and maintainability, \
        refactor the following {language} code.\n\n"
    );

    prompt.push_str("**Refactoring Goals:**\n");
    prompt.push_str("- Improve readability and clarity.\n");
    prompt.push_str("- Improve performance where applicable.\n");
    let _ = writeln!(prompt, "- Follow idiomatic {language} best practices.");
    prompt.push_str("- Add documentation comments and type annotations where they are missing.\n");
    prompt.push_str("- Simplify complex logic.\n\n");

    if let Some(instructions) = instructions.map(str::trim).filter(|i| !i.is_empty()) {
        let _ = writeln!(prompt, "**User Instructions:** {instructions}\n");
    }

    prompt.push_str(
        "Return ONLY the complete, refactored code in a single markdown code block. \
        Do not include explanations or apologies in your response.\n\n",
    );

    let _ = write!(
        prompt,
        "**Original Code:**\n{}\n",
        fenced(language, &snippet.code)
    );
    prompt
}

/// Prompt asking for a direct answer to a question about the code
pub fn create_chat_prompt(snippet: &CodeSnippet, query: &str) -> String {
    let mut prompt = String::from(
        "You are an expert programmer and a helpful code assistant. \
        A user has a question about the following code. Provide a clear and concise answer.\n\n",
    );

    let _ = write!(
        prompt,
        "Code:\n{}\n\nUser's Question: {}\n\nYour Answer:\n",
        fenced(snippet.language(), &snippet.code),
        query.trim()
    );
    prompt
}
