//! Deterministic prompt composition for the generative-text service.
//!
//! Relevance and summarization are entirely the model's job; these functions
//! only serialize persisted items into stable one-line forms and embed them
//! in fixed templates.

use crate::store::{Note, Task, format_date};

/// Serialize every item to one line for the search prompt.
pub fn item_lines(notes: &[Note], tasks: &[Task]) -> Vec<String> {
    let mut lines = Vec::with_capacity(notes.len() + tasks.len());
    for note in notes {
        lines.push(format!("Note ({}): {}", format_date(note.created_at), note.text));
    }
    for task in tasks {
        lines.push(format!(
            "Task ({}): {} (Status: {})",
            format_date(task.created_at),
            task.text,
            task.status.as_str()
        ));
    }
    lines
}

/// Serialize the 5 most recent items of each kind for the summary prompt.
/// Callers pass items newest first.
pub fn summary_lines(notes: &[Note], tasks: &[Task]) -> Vec<String> {
    let mut lines = Vec::new();
    for note in notes.iter().take(5) {
        lines.push(format!("Note: {}", note.text));
    }
    for task in tasks.iter().take(5) {
        lines.push(format!("Task: {} (Status: {})", task.text, task.status.as_str()));
    }
    lines
}

/// Exact-match search over the serialized items.
pub fn search_prompt(query: &str, lines: &[String]) -> String {
    format!(
        "Find exact matches for: \"{query}\"\nContent:\n{}\n\nReturn only the matching items \
         as bullet points. Each bullet point should start with 🔹. Do not include any \
         intermediate reasoning.\n",
        lines.join("\n")
    )
}

/// Concise summary of the serialized items.
pub fn summary_prompt(lines: &[String]) -> String {
    format!(
        "Summarize these items concisely.\nItems:\n{}\n\nReturn only the final summary as \
         bullet points (each starting with 🔹), including total counts.\n",
        lines.join("\n")
    )
}

/// Free-form question, answer-only.
pub fn query_prompt(input: &str) -> String {
    format!(
        "For the following input, return only the final answer as bullet points (each \
         starting with 🔹). Do not include any intermediate reasoning.\nInput: {input}\n"
    )
}

/// Meeting-transcript summary with follow-up action items.
pub fn meeting_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following meeting transcript and list follow-up action items as \
         bullet points (each starting with 🔹). Do not include any internal thinking.\n\
         Meeting Transcript:\n{transcript}\n"
    )
}
