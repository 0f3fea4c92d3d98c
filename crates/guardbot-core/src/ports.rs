use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{ChatAdmin, ChatId, MessageId, MessageRef, RestrictionScope, UserId};
use crate::Result;

/// Capability interface onto the chat platform.
///
/// The Telegram adapter implements this over the Bot API; tests script it in
/// memory. Everything the moderation engine asks of the outside world goes
/// through here.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Send a plain text reply into a chat.
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef>;

    /// Delete one message.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    /// Delete a batch of messages.
    async fn delete_messages(&self, chat_id: ChatId, message_ids: &[MessageId]) -> Result<()>;

    /// Grant or revoke one named permission for a user, optionally bounded
    /// (`None` = until manually undone).
    async fn edit_permission(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        scope: RestrictionScope,
        grant: bool,
        until: Option<Duration>,
    ) -> Result<()>;

    /// Remove a participant without leaving a lasting ban.
    async fn kick_user(&self, chat_id: ChatId, user_id: UserId) -> Result<()>;

    /// Enumerate the chat's current admins, creator included.
    async fn chat_admins(&self, chat_id: ChatId) -> Result<Vec<ChatAdmin>>;

    /// Resolve a non-numeric user reference (e.g. `@handle`) to its id.
    async fn resolve_user(&self, reference: &str) -> Result<UserId>;

    /// Set the chat's slow-mode interval in seconds (0 turns it off).
    async fn set_slow_mode(&self, chat_id: ChatId, seconds: u32) -> Result<()>;
}
