//! One handler per user-facing command.
//!
//! Every handler validates its input, talks to at most one adapter, and
//! formats the reply itself. Adapter and storage failures are reported to the
//! user from inside the handler; anything that escapes is caught at the
//! dispatch boundary and answered with [`GENERIC_ERROR`].

use crate::bot::{Services, send_chunked};
use crate::llm::LlmClient;
use crate::store::{Note, Task, format_date};
use crate::{prompts, transcribe};

use anyhow::Context as _;
use teloxide::net::Download as _;
use teloxide::prelude::*;
use tokio::io::AsyncWriteExt as _;

pub const GENERIC_ERROR: &str = "❌ An error occurred. Please try again.";

const WELCOME: &str = "🌟 *Welcome to your Productivity Assistant!* 🌟

Available commands:
- `/note [text]` 📝: Save a note
- `/task [text]` ✅: Add a task
- `/list` 📋: View all items
- `/search [query]` 🔍: Search items (bullet points)
- `/summary` 📊: Get summary (bullet points)
- `/query [text]` 🤖: Ask any general question and get a final answer
- `/summarize_meeting` 🗣️: Summarize a meeting transcript from a voice message
- `/delete_tasks` 🗑️: Delete all tasks
- `/delete_notes` 🗑️: Delete all notes
- `/help` ❓: Show this message

*Examples:*
1. `/note Call John about project`
2. `/task Submit report by Friday`
3. `/query What is the capital of France?`

Type `/help` anytime for assistance!";

/// `/start` and `/help`: the welcome message.
pub async fn start(bot: &Bot, msg: &Message) -> anyhow::Result<()> {
    send_chunked(bot, msg.chat.id, WELCOME).await?;
    Ok(())
}

/// `/note <text>`: persist a note for the caller.
pub async fn save_note(
    bot: &Bot,
    msg: &Message,
    services: &Services,
    text: &str,
) -> anyhow::Result<()> {
    let Some(text) = command_argument(text) else {
        send_chunked(
            bot,
            msg.chat.id,
            "❌ Please add note text\nExample: `/note Call John`",
        )
        .await?;
        return Ok(());
    };

    match services.store.add_note(caller_id(msg)?, text).await {
        Ok(()) => {
            send_chunked(bot, msg.chat.id, "✅ *Note saved!* Use `/list` to view all.").await?;
        }
        Err(error) => {
            tracing::error!(%error, "failed to save note");
            send_chunked(bot, msg.chat.id, "❌ Error saving note. Please try again.").await?;
        }
    }
    Ok(())
}

/// `/task <text>`: persist a pending task for the caller.
pub async fn add_task(
    bot: &Bot,
    msg: &Message,
    services: &Services,
    text: &str,
) -> anyhow::Result<()> {
    let Some(text) = command_argument(text) else {
        send_chunked(
            bot,
            msg.chat.id,
            "❌ Please add task text\nExample: `/task Buy groceries`",
        )
        .await?;
        return Ok(());
    };

    match services.store.add_task(caller_id(msg)?, text).await {
        Ok(()) => {
            send_chunked(bot, msg.chat.id, "✅ *Task added!* Use `/list` to view all.").await?;
        }
        Err(error) => {
            tracing::error!(%error, "failed to add task");
            send_chunked(bot, msg.chat.id, "❌ Error adding task. Please try again.").await?;
        }
    }
    Ok(())
}

/// `/list`: all of the caller's notes and tasks, newest first.
pub async fn list_items(bot: &Bot, msg: &Message, services: &Services) -> anyhow::Result<()> {
    let user_id = caller_id(msg)?;
    let (notes, tasks) = match fetch_items(services, user_id).await {
        Ok(items) => items,
        Err(error) => {
            tracing::error!(%error, "failed to list items");
            send_chunked(bot, msg.chat.id, "❌ Error retrieving items. Please try again.").await?;
            return Ok(());
        }
    };

    match render_list(&notes, &tasks) {
        Some(listing) => send_chunked(bot, msg.chat.id, &listing).await?,
        None => {
            send_chunked(bot, msg.chat.id, "📝 No items yet. Add with `/note` or `/task`").await?;
        }
    }
    Ok(())
}

/// `/search <query>`: serialize everything, let the model pick exact matches.
/// No local matching happens here at all.
pub async fn search(
    bot: &Bot,
    msg: &Message,
    services: &Services,
    query: &str,
) -> anyhow::Result<()> {
    let Some(query) = command_argument(query) else {
        send_chunked(
            bot,
            msg.chat.id,
            "❌ Please add search text\nExample: `/search project`",
        )
        .await?;
        return Ok(());
    };

    let user_id = caller_id(msg)?;
    let (notes, tasks) = match fetch_items(services, user_id).await {
        Ok(items) => items,
        Err(error) => {
            tracing::error!(%error, "failed to load items for search");
            send_chunked(bot, msg.chat.id, "❌ Error during search. Please try again.").await?;
            return Ok(());
        }
    };

    let reply = search_reply(&services.llm, query, &notes, &tasks).await;
    send_chunked(bot, msg.chat.id, &reply).await?;
    Ok(())
}

/// `/summary`: model summary of recent items, with a deterministic local
/// fallback when the model is unavailable.
pub async fn get_summary(bot: &Bot, msg: &Message, services: &Services) -> anyhow::Result<()> {
    let user_id = caller_id(msg)?;
    let (notes, tasks) = match fetch_items(services, user_id).await {
        Ok(items) => items,
        Err(error) => {
            tracing::error!(%error, "failed to load items for summary");
            send_chunked(bot, msg.chat.id, "❌ Error generating summary. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if notes.is_empty() && tasks.is_empty() {
        send_chunked(bot, msg.chat.id, "📝 No items to summarize").await?;
        return Ok(());
    }

    let lines = prompts::summary_lines(&notes, &tasks);
    let reply = compose_summary(&services.llm, notes.len(), tasks.len(), &lines).await;
    send_chunked(bot, msg.chat.id, &reply).await?;
    Ok(())
}

/// `/query <text>`: free-form question, relayed verbatim.
pub async fn query(
    bot: &Bot,
    msg: &Message,
    services: &Services,
    input: &str,
) -> anyhow::Result<()> {
    let Some(input) = command_argument(input) else {
        send_chunked(
            bot,
            msg.chat.id,
            "❌ Please provide a query!\nExample: `/query What is the capital of France?`",
        )
        .await?;
        return Ok(());
    };

    let prompt = prompts::query_prompt(input);
    match services.llm.generate(&prompt).await {
        Some(answer) => {
            send_chunked(bot, msg.chat.id, &format!("🤖 *Response:*\n{answer}")).await?;
        }
        None => {
            send_chunked(bot, msg.chat.id, "ℹ️ No response from the AI. Please try again.")
                .await?;
        }
    }
    Ok(())
}

/// `/summarize_meeting`: transcribe an attached voice note and summarize it.
/// Unlike `/summary` there is no local fallback: transcription or model
/// failure both end in a single failure message.
pub async fn summarize_meeting(
    bot: &Bot,
    msg: &Message,
    services: &Services,
) -> anyhow::Result<()> {
    let Some(voice) = msg.voice() else {
        send_chunked(
            bot,
            msg.chat.id,
            "❌ Please attach a voice message with your meeting transcript after using the \
             /summarize_meeting command.",
        )
        .await?;
        return Ok(());
    };

    let transcript = match transcribe_voice(bot, services, voice.file.id.clone()).await {
        Ok(transcript) => transcript,
        Err(error) => {
            tracing::error!(%error, "meeting transcription failed");
            send_chunked(bot, msg.chat.id, "❌ Error processing meeting summary. Please try again.")
                .await?;
            return Ok(());
        }
    };

    let prompt = prompts::meeting_prompt(&transcript);
    match services.llm.generate(&prompt).await {
        Some(summary) => {
            send_chunked(bot, msg.chat.id, &format!("🗣️ *Meeting Summary:*\n\n{summary}")).await?;
        }
        None => {
            send_chunked(bot, msg.chat.id, "❌ No summary could be generated. Please try again.")
                .await?;
        }
    }
    Ok(())
}

/// `/delete_tasks`: bulk delete, reporting the count removed.
pub async fn delete_all_tasks(bot: &Bot, msg: &Message, services: &Services) -> anyhow::Result<()> {
    match services.store.delete_tasks(caller_id(msg)?).await {
        Ok(deleted) => {
            send_chunked(bot, msg.chat.id, &format!("🗑️ Deleted {deleted} task(s).")).await?;
        }
        Err(error) => {
            tracing::error!(%error, "failed to delete tasks");
            send_chunked(bot, msg.chat.id, "❌ Error deleting tasks. Please try again.").await?;
        }
    }
    Ok(())
}

/// `/delete_notes`: bulk delete, reporting the count removed.
pub async fn delete_all_notes(bot: &Bot, msg: &Message, services: &Services) -> anyhow::Result<()> {
    match services.store.delete_notes(caller_id(msg)?).await {
        Ok(deleted) => {
            send_chunked(bot, msg.chat.id, &format!("🗑️ Deleted {deleted} note(s).")).await?;
        }
        Err(error) => {
            tracing::error!(%error, "failed to delete notes");
            send_chunked(bot, msg.chat.id, "❌ Error deleting notes. Please try again.").await?;
        }
    }
    Ok(())
}

// -- Shared pieces --

/// Trimmed command argument, or `None` when the user sent nothing usable.
/// Handlers send their validation message and stop before touching storage
/// or an adapter when this returns `None`.
fn command_argument(text: &str) -> Option<&str> {
    let text = text.trim();
    if text.is_empty() { None } else { Some(text) }
}

/// Compose the `/search` reply. An empty account is answered locally; the
/// model is only consulted when there is something to search.
async fn search_reply(llm: &LlmClient, query: &str, notes: &[Note], tasks: &[Task]) -> String {
    if notes.is_empty() && tasks.is_empty() {
        return "📝 No items to search".to_string();
    }

    let lines = prompts::item_lines(notes, tasks);
    match llm.generate(&prompts::search_prompt(query, &lines)).await {
        Some(results) => format!("🔍 *Search Results:*\n\n{results}"),
        None => "❌ No matches found".to_string(),
    }
}

fn caller_id(msg: &Message) -> anyhow::Result<i64> {
    let user = msg.from.as_ref().context("message has no sender")?;
    Ok(user.id.0 as i64)
}

async fn fetch_items(services: &Services, user_id: i64) -> anyhow::Result<(Vec<Note>, Vec<Task>)> {
    let notes = services.store.notes_for(user_id).await?;
    let tasks = services.store.tasks_for(user_id).await?;
    Ok((notes, tasks))
}

/// Render the two-section listing, or `None` when there is nothing to show.
/// Items arrive newest first.
fn render_list(notes: &[Note], tasks: &[Task]) -> Option<String> {
    if notes.is_empty() && tasks.is_empty() {
        return None;
    }

    let mut lines = vec!["📝 *Your Items:*".to_string(), String::new()];
    if !notes.is_empty() {
        lines.push("*Notes:*".to_string());
        for (i, note) in notes.iter().enumerate() {
            lines.push(format!("🔹 {}. [{}] {}", i + 1, format_date(note.created_at), note.text));
        }
        lines.push(String::new());
    }
    if !tasks.is_empty() {
        lines.push("*Tasks:*".to_string());
        for (i, task) in tasks.iter().enumerate() {
            let glyph = match task.status {
                crate::store::TaskStatus::Completed => "✅",
                crate::store::TaskStatus::Pending => "⏳",
            };
            lines.push(format!(
                "🔹 {}. [{}] {} {}",
                i + 1,
                format_date(task.created_at),
                glyph,
                task.text
            ));
        }
    }
    Some(lines.join("\n").trim_end().to_string())
}

/// Summary tiers, tried in order: the model-backed tier can fail, the basic
/// tier is the deterministic floor and always produces a reply.
async fn compose_summary(
    llm: &LlmClient,
    note_count: usize,
    task_count: usize,
    lines: &[String],
) -> String {
    match model_summary(llm, note_count, task_count, lines).await {
        Some(reply) => reply,
        None => basic_summary(note_count, task_count, lines),
    }
}

async fn model_summary(
    llm: &LlmClient,
    note_count: usize,
    task_count: usize,
    lines: &[String],
) -> Option<String> {
    let summary = llm.generate(&prompts::summary_prompt(lines)).await?;
    Some(format!(
        "📊 *Summary of Your Items:*\n\n🔹 Total Notes: {note_count}\n🔹 Total \
         Tasks: {task_count}\n\n{summary}\n\n👉 Use `/list` to view all items."
    ))
}

/// Deterministic summary used when the model is unavailable: literal totals
/// plus the first three serialized items.
fn basic_summary(note_count: usize, task_count: usize, lines: &[String]) -> String {
    let recent = lines.iter().take(3).cloned().collect::<Vec<_>>().join("\n");
    format!(
        "📊 *Basic Summary:*\n\n🔹 Total Notes: {note_count}\n🔹 Total Tasks: \
         {task_count}\n\nRecent Items:\n🔹 {recent}\n\n👉 Use `/list` to view all items."
    )
}

/// Download the voice attachment to a transient file and transcribe it. The
/// file is removed in every path when the guard drops.
async fn transcribe_voice(
    bot: &Bot,
    services: &Services,
    file_id: teloxide::types::FileId,
) -> anyhow::Result<String> {
    let file = bot
        .get_file(file_id)
        .await
        .context("failed to look up the voice file")?;

    let temp = tempfile::Builder::new()
        .prefix("notekeeper-voice-")
        .suffix(".ogg")
        .tempfile()
        .context("failed to create a transient audio file")?;

    let mut dst = tokio::fs::File::create(temp.path())
        .await
        .context("failed to open the transient audio file")?;
    bot.download_file(&file.path, &mut dst)
        .await
        .context("failed to download the voice file")?;
    dst.flush().await.context("failed to flush the audio download")?;
    drop(dst);

    transcribe::transcribe(
        &services.config.whisper_bin,
        &services.config.whisper_model,
        temp.path(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Store, TaskStatus};

    fn note(text: &str, created_at: i64) -> Note {
        Note {
            user_id: 1,
            text: text.to_string(),
            created_at,
        }
    }

    #[test]
    fn test_render_list_empty_is_none() {
        assert!(render_list(&[], &[]).is_none());
    }

    #[test]
    fn test_command_argument_rejects_blank_input() {
        assert_eq!(command_argument(""), None);
        assert_eq!(command_argument("   "), None);
        assert_eq!(command_argument(" Call John "), Some("Call John"));
    }

    #[tokio::test]
    async fn test_blank_arguments_persist_nothing() {
        let store = Store::memory().await;

        // The handlers persist only when the argument guard passes.
        for raw in ["", "   ", "\t"] {
            if let Some(text) = command_argument(raw) {
                store.add_note(1, text).await.unwrap();
                store.add_task(1, text).await.unwrap();
            }
        }

        assert!(store.notes_for(1).await.unwrap().is_empty());
        assert!(store.tasks_for(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_empty_account_answers_without_the_model() {
        // The adapter is unreachable: any call to it would come back as the
        // "No matches found" failure reply, not the empty-account message.
        let llm = LlmClient::new("http://127.0.0.1:9", "test-model");

        let reply = search_reply(&llm, "ProjectX", &[], &[]).await;
        assert_eq!(reply, "📝 No items to search");
    }

    #[tokio::test]
    async fn test_search_with_items_reports_adapter_failure() {
        let llm = LlmClient::new("http://127.0.0.1:9", "test-model");
        let notes = vec![note("ProjectX kickoff", 1_705_276_800_000)];

        let reply = search_reply(&llm, "ProjectX", &notes, &[]).await;
        assert_eq!(reply, "❌ No matches found");
    }

    #[test]
    fn test_render_list_most_recent_first() {
        let notes = vec![
            note("Buy milk", 1_705_363_200_000),
            note("Call John", 1_705_276_800_000),
        ];
        let listing = render_list(&notes, &[]).unwrap();

        assert!(listing.contains("🔹 1. [2024-01-16] Buy milk"));
        assert!(listing.contains("🔹 2. [2024-01-15] Call John"));
        assert!(listing.find("Buy milk").unwrap() < listing.find("Call John").unwrap());
    }

    #[test]
    fn test_render_list_task_status_glyphs() {
        let tasks = vec![
            Task {
                user_id: 1,
                text: "Submit report".to_string(),
                status: TaskStatus::Pending,
                created_at: 1_705_276_800_000,
            },
            Task {
                user_id: 1,
                text: "Ship release".to_string(),
                status: TaskStatus::Completed,
                created_at: 1_705_276_800_000,
            },
        ];
        let listing = render_list(&[], &tasks).unwrap();

        assert!(listing.contains("⏳ Submit report"));
        assert!(listing.contains("✅ Ship release"));
        assert!(!listing.contains("*Notes:*"));
    }

    #[test]
    fn test_basic_summary_carries_totals_and_top_items() {
        let lines: Vec<String> = (0..5).map(|i| format!("Note: n{i}")).collect();
        let summary = basic_summary(4, 2, &lines);

        assert!(summary.contains("Total Notes: 4"));
        assert!(summary.contains("Total Tasks: 2"));
        assert!(summary.contains("Note: n0"));
        assert!(summary.contains("Note: n2"));
        assert!(!summary.contains("Note: n3"));
    }

    #[tokio::test]
    async fn test_compose_summary_falls_back_when_model_unreachable() {
        let llm = LlmClient::new("http://127.0.0.1:9", "test-model");
        let lines = vec!["Note: Call John".to_string()];

        let reply = compose_summary(&llm, 1, 0, &lines).await;
        assert!(reply.contains("Total Notes: 1"));
        assert!(reply.contains("Total Tasks: 0"));
        assert!(reply.contains("Basic Summary"));
    }

    #[tokio::test]
    async fn test_listing_round_trip_through_store() {
        let store = Store::memory().await;
        store.add_note(42, "Call John").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.add_note(42, "Buy milk").await.unwrap();

        let notes = store.notes_for(42).await.unwrap();
        let listing = render_list(&notes, &[]).unwrap();
        assert!(listing.contains("Call John"));
        assert!(listing.contains("Buy milk"));
        // Most recent first, each preceded by a bullet marker.
        assert!(listing.find("🔹 1.").unwrap() < listing.find("Buy milk").unwrap());
        assert!(listing.find("Buy milk").unwrap() < listing.find("Call John").unwrap());
    }
}
