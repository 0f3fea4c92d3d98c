use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{AdminRecord, ChatId, ChatSettings, UserId, WarnType};
use crate::Result;

/// Repository interface over the bot's persistent state: the admin-roster
/// cache, the warning history, and per-chat settings. The storage engine
/// behind it is an adapter concern.
#[async_trait]
pub trait Store: Send + Sync {
    /// Whether the chat has at least one cached, non-shadow admin.
    async fn has_admins(&self, chat_id: ChatId) -> Result<bool>;

    /// The cached record for one (chat, user); shadow rows included.
    async fn find_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<Option<AdminRecord>>;

    /// Insert, or update on the unique `(chat_id, user_id)` pair.
    async fn upsert_admin(&self, record: &AdminRecord) -> Result<()>;

    async fn delete_admins(&self, chat_id: ChatId, user_ids: &[UserId]) -> Result<()>;

    /// Non-shadow admin ids grouped by chat, optionally narrowed to one chat.
    async fn admins_by_chat(
        &self,
        chat_id: Option<ChatId>,
    ) -> Result<HashMap<ChatId, HashSet<UserId>>>;

    /// Append one warning-history record, stamped now.
    async fn add_warning(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: WarnType,
        comment: Option<&str>,
    ) -> Result<()>;

    /// Records for (chat, user) created within the trailing `window`,
    /// optionally narrowed to one warn type.
    async fn count_warnings(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: Option<WarnType>,
        window: Duration,
    ) -> Result<i64>;

    /// Delete every record (any type) for (chat, user) within the trailing
    /// `window`.
    async fn delete_warnings(&self, chat_id: ChatId, user_id: UserId, window: Duration)
        -> Result<()>;

    /// The chat's settings, created with defaults on first read. A creation
    /// race yields the concurrently created row, never an error.
    async fn chat_settings(&self, chat_id: ChatId) -> Result<ChatSettings>;
}
