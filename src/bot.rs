//! Telegram transport adapter: command parsing, dispatch, chunked replies.
//!
//! Dispatch is a static mapping from command token to handler; anything that
//! is not a recognized command is dropped without a reply. One tokio task per
//! inbound update, no shared mutable state beyond the service handles.

pub mod handlers;

use crate::config::Config;
use crate::llm::LlmClient;
use crate::store::Store;

use std::sync::Arc;
use teloxide::payloads::SendMessageSetters as _;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};
use teloxide::utils::command::BotCommands;

/// Safe chunk size under Telegram's 4096-character message limit.
pub const MAX_MESSAGE_LEN: usize = 4000;

/// Long-lived service handles shared by every handler.
pub struct Services {
    pub store: Store,
    pub llm: LlmClient,
    pub config: Config,
}

/// The full command surface. Single-argument commands receive the rest of
/// the message text, untouched.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case")]
pub enum Command {
    Start,
    Help,
    Note(String),
    Task(String),
    List,
    Search(String),
    Summary,
    Query(String),
    SummarizeMeeting,
    DeleteTasks,
    DeleteNotes,
}

/// Run the dispatcher until the process is stopped.
pub async fn run(bot: Bot, services: Arc<Services>) {
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        // Voice notes carry the command in the caption, not the text, so the
        // command filter above never sees them.
        .branch(
            dptree::filter(|msg: Message| {
                msg.voice().is_some()
                    && msg
                        .caption()
                        .is_some_and(|caption| caption.starts_with("/summarize_meeting"))
            })
            .endpoint(handle_voice_command),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![services])
        .default_handler(|_| async {})
        .build()
        .dispatch()
        .await;
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    services: Arc<Services>,
) -> ResponseResult<()> {
    if let Err(error) = dispatch(&bot, &msg, cmd, &services).await {
        tracing::error!(%error, chat_id = %msg.chat.id, "command handler failed");
        let _ = send_chunked(&bot, msg.chat.id, handlers::GENERIC_ERROR).await;
    }
    Ok(())
}

async fn handle_voice_command(
    bot: Bot,
    msg: Message,
    services: Arc<Services>,
) -> ResponseResult<()> {
    if let Err(error) = handlers::summarize_meeting(&bot, &msg, &services).await {
        tracing::error!(%error, chat_id = %msg.chat.id, "meeting summary handler failed");
        let _ = send_chunked(&bot, msg.chat.id, handlers::GENERIC_ERROR).await;
    }
    Ok(())
}

async fn dispatch(
    bot: &Bot,
    msg: &Message,
    cmd: Command,
    services: &Services,
) -> anyhow::Result<()> {
    match cmd {
        Command::Start | Command::Help => handlers::start(bot, msg).await,
        Command::Note(text) => handlers::save_note(bot, msg, services, &text).await,
        Command::Task(text) => handlers::add_task(bot, msg, services, &text).await,
        Command::List => handlers::list_items(bot, msg, services).await,
        Command::Search(text) => handlers::search(bot, msg, services, &text).await,
        Command::Summary => handlers::get_summary(bot, msg, services).await,
        Command::Query(text) => handlers::query(bot, msg, services, &text).await,
        Command::SummarizeMeeting => handlers::summarize_meeting(bot, msg, services).await,
        Command::DeleteTasks => handlers::delete_all_tasks(bot, msg, services).await,
        Command::DeleteNotes => handlers::delete_all_notes(bot, msg, services).await,
    }
}

/// Split `text` into chunks of at most `limit` characters, preserving order
/// and content exactly. Splits on char boundaries, never inside a code point.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for ch in text.chars() {
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Send `text` to `chat_id` as ordered Markdown chunks.
pub async fn send_chunked(bot: &Bot, chat_id: ChatId, text: &str) -> ResponseResult<()> {
    for chunk in split_message(text, MAX_MESSAGE_LEN) {
        bot.send_message(chat_id, chunk)
            .parse_mode(ParseMode::Markdown)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(split_message("hello", 4000), vec!["hello"]);
    }

    #[test]
    fn test_empty_text_sends_nothing() {
        assert!(split_message("", 4000).is_empty());
    }

    #[test]
    fn test_chunks_bounded_and_lossless() {
        let text = "abcdefghij".repeat(1000); // 10_000 chars
        let chunks = split_message(&text, 4000);

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 4000));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_respects_char_boundaries() {
        let text = "🔹".repeat(10);
        let chunks = split_message(&text, 3);

        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
    }

    #[test]
    fn test_command_tokens_parse() {
        let me = "bot_name";
        assert!(matches!(Command::parse("/start", me), Ok(Command::Start)));
        assert!(matches!(Command::parse("/list", me), Ok(Command::List)));
        assert!(matches!(
            Command::parse("/delete_tasks", me),
            Ok(Command::DeleteTasks)
        ));

        match Command::parse("/note Call John about project", me) {
            Ok(Command::Note(text)) => assert_eq!(text, "Call John about project"),
            other => panic!("unexpected parse: {other:?}"),
        }
        match Command::parse("/search ProjectX", me) {
            Ok(Command::Search(text)) => assert_eq!(text, "ProjectX"),
            other => panic!("unexpected parse: {other:?}"),
        }
    }
}
