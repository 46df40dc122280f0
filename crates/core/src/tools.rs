//! The fixed set of functions declared to the upstream model.
//!
//! None of them have side effects: the model calls them to signal what kind
//! of answer it is producing, and the relay acknowledges every call silently.

use crate::generic_types::{Behavior, ToolDeclaration};

const TOOLS: [(&str, &str); 7] = [
    (
        "ask_clarifying_question",
        "Ask the user a clarifying question when their request is ambiguous or lacks necessary detail.",
    ),
    (
        "provide_step_by_step_solution",
        "Provide a structured, step-by-step explanation or solution for technical or complex problems.",
    ),
    (
        "summarize_response",
        "Summarize key points in a clear and concise format when information is lengthy or complex.",
    ),
    (
        "adapt_tone",
        "Adjust communication tone based on user context (casual, professional, technical, beginner-friendly).",
    ),
    (
        "suggest_best_practices",
        "Provide best practices, improvements, or optimizations related to the user's request.",
    ),
    (
        "handle_unknown_safely",
        "Acknowledge limitations when information is unknown and suggest alternative approaches or next steps.",
    ),
    (
        "generate_structured_output",
        "Generate structured output such as JSON, Markdown, or formatted documentation when requested.",
    ),
];

/// Returns the tool catalog, every entry non-blocking.
pub fn declarations() -> Vec<ToolDeclaration> {
    TOOLS
        .iter()
        .map(|(name, description)| ToolDeclaration {
            name: name.to_string(),
            description: description.to_string(),
            behavior: Behavior::NonBlocking,
        })
        .collect()
}
