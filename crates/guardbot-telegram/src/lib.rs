//! Telegram adapter (teloxide).
//!
//! This crate implements the `guardbot-core` platform port over the Telegram
//! Bot API and wires the update dispatcher.

use async_trait::async_trait;

use chrono::{Duration, Utc};

use teloxide::{
    prelude::*,
    types::{ChatMember, ChatMemberKind, ChatPermissions, ParseMode},
    ApiError, RequestError,
};

use tokio::time::sleep;

pub mod handlers;
pub mod router;

use guardbot_core::{
    domain::{
        AdminRights, AdminRole, ChatAdmin, ChatId, MessageId, MessageRef, RestrictionScope, UserId,
    },
    errors::Error,
    ports::Platform,
    Result,
};

#[derive(Clone)]
pub struct TelegramPlatform {
    bot: Bot,
}

impl TelegramPlatform {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    pub fn bot(&self) -> Bot {
        self.bot.clone()
    }

    fn tg_chat(chat_id: ChatId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(chat_id.0)
    }

    fn tg_user(user_id: UserId) -> teloxide::types::UserId {
        teloxide::types::UserId(user_id.0 as u64)
    }

    fn tg_msg_id(message_id: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message_id.0)
    }

    fn map_err(e: RequestError) -> Error {
        match e {
            RequestError::Api(ApiError::UserNotFound | ApiError::ChatNotFound) => {
                Error::InvalidUser
            }
            RequestError::Api(
                ApiError::NotEnoughRightsToRestrict
                | ApiError::UserIsAnAdministratorOfTheChat
                | ApiError::CantRestrictSelf,
            ) => Error::AdminRights,
            other => Error::Platform(format!("telegram error: {other}")),
        }
    }

    async fn with_retry<T, Fut>(&self, mut op: impl FnMut() -> Fut) -> Result<T>
    where
        Fut: std::future::IntoFuture<Output = std::result::Result<T, RequestError>>,
        Fut::IntoFuture: Send,
    {
        const MAX_RETRIES: usize = 1;
        let mut attempts = 0usize;
        loop {
            match op().await {
                Ok(v) => return Ok(v),
                Err(e) => match e {
                    RequestError::RetryAfter(d) if attempts < MAX_RETRIES => {
                        attempts += 1;
                        sleep(d).await;
                        continue;
                    }
                    other => return Err(Self::map_err(other)),
                },
            }
        }
    }
}

fn map_member(member: ChatMember) -> Option<ChatAdmin> {
    let user_id = UserId(member.user.id.0 as i64);
    match member.kind {
        ChatMemberKind::Owner(_) => Some(ChatAdmin { user_id, role: AdminRole::Creator }),
        ChatMemberKind::Administrator(admin) => Some(ChatAdmin {
            user_id,
            role: AdminRole::Admin(AdminRights {
                delete_messages: admin.can_delete_messages,
                ban_users: admin.can_restrict_members,
                add_admins: admin.can_promote_members,
            }),
        }),
        _ => None,
    }
}

#[async_trait]
impl Platform for TelegramPlatform {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let msg = self
            .with_retry(|| {
                self.bot
                    .send_message(Self::tg_chat(chat_id), text.to_string())
                    .parse_mode(ParseMode::Markdown)
            })
            .await?;

        Ok(MessageRef { chat_id, message_id: MessageId(msg.id.0) })
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.with_retry(|| {
            self.bot
                .delete_message(Self::tg_chat(chat_id), Self::tg_msg_id(message_id))
        })
        .await?;
        Ok(())
    }

    async fn delete_messages(&self, chat_id: ChatId, message_ids: &[MessageId]) -> Result<()> {
        for message_id in message_ids {
            self.delete_message(chat_id, *message_id).await?;
        }
        Ok(())
    }

    async fn edit_permission(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        scope: RestrictionScope,
        grant: bool,
        until: Option<Duration>,
    ) -> Result<()> {
        let chat = Self::tg_chat(chat_id);
        let user = Self::tg_user(user_id);
        let until_at = until.map(|d| Utc::now() + d);

        match (scope, grant) {
            (RestrictionScope::ViewMessages, false) => {
                self.with_retry(|| {
                    let mut req = self.bot.ban_chat_member(chat, user);
                    if let Some(at) = until_at {
                        req = req.until_date(at);
                    }
                    req
                })
                .await?;
            }
            (RestrictionScope::ViewMessages, true) => {
                self.with_retry(|| self.bot.unban_chat_member(chat, user).only_if_banned(true))
                    .await?;
            }
            (RestrictionScope::SendMessages, false) => {
                self.with_retry(|| {
                    let mut req =
                        self.bot
                            .restrict_chat_member(chat, user, ChatPermissions::empty());
                    if let Some(at) = until_at {
                        req = req.until_date(at);
                    }
                    req
                })
                .await?;
            }
            (RestrictionScope::SendMessages, true) => {
                // Telegram caps the grant at the chat's default permissions.
                self.with_retry(|| {
                    self.bot
                        .restrict_chat_member(chat, user, ChatPermissions::all())
                })
                .await?;
            }
        }
        Ok(())
    }

    async fn kick_user(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        let chat = Self::tg_chat(chat_id);
        let user = Self::tg_user(user_id);

        // Bot API "remove only": ban, then lift the ban immediately.
        self.with_retry(|| self.bot.ban_chat_member(chat, user)).await?;
        self.with_retry(|| self.bot.unban_chat_member(chat, user)).await?;
        Ok(())
    }

    async fn chat_admins(&self, chat_id: ChatId) -> Result<Vec<ChatAdmin>> {
        let members = self
            .with_retry(|| self.bot.get_chat_administrators(Self::tg_chat(chat_id)))
            .await?;
        Ok(members.into_iter().filter_map(map_member).collect())
    }

    async fn resolve_user(&self, _reference: &str) -> Result<UserId> {
        // The Bot API cannot resolve a username to an id (MTProto only);
        // numeric references never reach the adapter.
        Err(Error::InvalidUser)
    }

    async fn set_slow_mode(&self, _chat_id: ChatId, _seconds: u32) -> Result<()> {
        // The Bot API has no slow-mode toggle (MTProto only); report the
        // value as rejected, which the engine swallows.
        Err(Error::InvalidSlowMode)
    }
}
