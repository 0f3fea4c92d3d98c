use chrono::{DateTime, Duration, Utc};

/// Telegram user id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// Telegram chat id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChatId(pub i64);

/// Telegram message id (numeric).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageId(pub i32);

/// A stable reference to a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageRef {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

/// Kind of an audit-trail entry. Discriminants are stable: the store
/// persists them as integers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WarnType {
    Warn = 1,
    Unwarn = 2,
    Ban = 3,
    Unban = 4,
    Mute = 5,
    Unmute = 6,
    Kick = 7,
    Spam = 8,
}

impl WarnType {
    pub fn as_i64(self) -> i64 {
        self as i64
    }

    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(WarnType::Warn),
            2 => Some(WarnType::Unwarn),
            3 => Some(WarnType::Ban),
            4 => Some(WarnType::Unban),
            5 => Some(WarnType::Mute),
            6 => Some(WarnType::Unmute),
            7 => Some(WarnType::Kick),
            8 => Some(WarnType::Spam),
            _ => None,
        }
    }
}

/// Cached admin rights for one user in one chat. `(chat_id, user_id)` is
/// unique per chat.
///
/// `shadow_admin` rows are seeded from somewhere other than a live roster
/// sync. They authorize like any other row, but reconciliation never counts,
/// sweeps, or deletes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminRecord {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub can_delete: bool,
    pub can_ban: bool,
    pub can_add_admin: bool,
    pub shadow_admin: bool,
}

/// Append-only audit entry: every moderation action that succeeds writes one
/// per affected user. Never mutated, only created or bulk-deleted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WarningRecord {
    pub created: DateTime<Utc>,
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub warn_type: WarnType,
    pub comment: Option<String>,
}

/// Per-chat escalation thresholds, created lazily on first read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatSettings {
    pub chat_id: ChatId,
    /// Warnings within `warn_counter_period` before the auto-mute triggers.
    pub warn_count: i64,
    pub warn_counter_period: Duration,
    pub mute_period: Duration,
}

impl ChatSettings {
    pub fn defaults(chat_id: ChatId) -> Self {
        Self {
            chat_id,
            warn_count: 3,
            warn_counter_period: Duration::days(3),
            mute_period: Duration::days(1),
        }
    }
}

/// Admin rights as the platform reports them for a non-creator admin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdminRights {
    pub delete_messages: bool,
    pub ban_users: bool,
    pub add_admins: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdminRole {
    Creator,
    Admin(AdminRights),
}

/// One entry of a chat's live admin roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatAdmin {
    pub user_id: UserId,
    pub role: AdminRole,
}

/// The two named permissions moderation actions grant or revoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestrictionScope {
    /// Revoking send-messages mutes; granting it back unmutes.
    SendMessages,
    /// Revoking view-messages bans; granting it back unbans.
    ViewMessages,
}

/// Platform-agnostic inbound message, built by the platform adapter.
#[derive(Clone, Debug)]
pub struct MessageEvent {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    pub sender: UserId,
    pub text: String,
    pub reply_to: Option<ReplyTo>,
}

/// The message an inbound message replies to, if any.
#[derive(Clone, Copy, Debug)]
pub struct ReplyTo {
    pub message_id: MessageId,
    pub sender: UserId,
}
