//! Telegram update handlers: convert a teloxide `Message` into the
//! platform-agnostic event the engine consumes.

use std::sync::Arc;

use teloxide::prelude::*;

use tracing::error;

use guardbot_core::domain::{ChatId, MessageEvent, MessageId, ReplyTo, UserId};

use crate::router::AppState;

fn to_event(msg: &Message) -> Option<MessageEvent> {
    let sender = msg.from()?;
    let text = msg.text()?;

    let reply_to = msg.reply_to_message().and_then(|replied| {
        let author = replied.from()?;
        Some(ReplyTo {
            message_id: MessageId(replied.id.0),
            sender: UserId(author.id.0 as i64),
        })
    });

    Some(MessageEvent {
        chat_id: ChatId(msg.chat.id.0),
        message_id: MessageId(msg.id.0),
        sender: UserId(sender.id.0 as i64),
        text: text.to_string(),
        reply_to,
    })
}

pub async fn handle_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = to_event(&msg) else {
        return Ok(());
    };
    if let Err(e) = state.engine.on_new_message(&event).await {
        error!(error = %e, chat_id = event.chat_id.0, "message handling failed");
    }
    Ok(())
}

pub async fn handle_edited_message(msg: Message, state: Arc<AppState>) -> ResponseResult<()> {
    let Some(event) = to_event(&msg) else {
        return Ok(());
    };
    if let Err(e) = state.engine.on_edited_message(&event).await {
        error!(error = %e, chat_id = event.chat_id.0, "edited message handling failed");
    }
    Ok(())
}
