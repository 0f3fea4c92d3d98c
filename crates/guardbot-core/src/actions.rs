//! The moderation actions behind the command registry.
//!
//! Every action follows the same shape: resolve targets, make the platform
//! call per target, write one audit record per success, and aggregate a reply
//! line per target. A rejected target becomes a failure line; the batch never
//! aborts early.

use chrono::Duration;
use tracing::debug;

use crate::domain::{MessageEvent, RestrictionScope, UserId, WarnType};
use crate::engine::{CommandKind, CommandSpec, Engine};
use crate::escalate;
use crate::extract::CommandArgs;
use crate::messages;
use crate::roster;
use crate::{Error, Result};

/// Slow-mode intervals the platform accepts, seconds.
pub const SLOW_MODE_VALUES: [u32; 7] = [0, 10, 30, 60, 300, 900, 3600];

/// Nearest allowed slow-mode value by absolute difference (first wins a tie).
pub fn snap_slow_mode(seconds: i64) -> u32 {
    SLOW_MODE_VALUES
        .iter()
        .copied()
        .min_by_key(|v| (seconds - i64::from(*v)).abs())
        .unwrap_or(0)
}

fn action_word(scope: RestrictionScope, undo: bool) -> &'static str {
    match (scope, undo) {
        (RestrictionScope::SendMessages, false) => "muted",
        (RestrictionScope::SendMessages, true) => "unmuted",
        (RestrictionScope::ViewMessages, false) => "banned",
        (RestrictionScope::ViewMessages, true) => "unbanned",
    }
}

fn restriction_warn_type(scope: RestrictionScope, undo: bool) -> WarnType {
    match (scope, undo) {
        (RestrictionScope::SendMessages, false) => WarnType::Mute,
        (RestrictionScope::SendMessages, true) => WarnType::Unmute,
        (RestrictionScope::ViewMessages, false) => WarnType::Ban,
        (RestrictionScope::ViewMessages, true) => WarnType::Unban,
    }
}

impl Engine {
    pub(crate) async fn execute(
        &self,
        spec: &CommandSpec,
        event: &MessageEvent,
        args: CommandArgs,
    ) -> Result<()> {
        match spec.kind {
            CommandKind::Restrict { scope, undo, silent } => {
                self.restrict(event, &args, scope, undo, silent).await
            }
            CommandKind::Kick { silent } => self.kick(event, &args, silent).await,
            CommandKind::Warn { delete_replied } => self.warn(event, &args, delete_replied).await,
            CommandKind::Unwarn => self.unwarn(event, &args).await,
            CommandKind::SlowMode { enable } => self.slow_mode(event, &args, enable).await,
            CommandKind::RefreshAdmins => self.refresh_admins(event).await,
        }
    }

    /// The replied-to author wins; otherwise the parsed user references.
    fn targets(event: &MessageEvent, args: &CommandArgs) -> Vec<String> {
        if let Some(reply) = event.reply_to {
            return vec![reply.sender.0.to_string()];
        }
        args.users.clone()
    }

    /// Numeric references resolve locally, anything else via the platform.
    async fn resolve(&self, reference: &str) -> Result<UserId> {
        if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit()) {
            return reference.parse().map(UserId).map_err(|_| Error::InvalidUser);
        }
        self.platform.resolve_user(reference).await
    }

    /// Best-effort removal of the triggering command message.
    async fn delete_command_message(&self, event: &MessageEvent) {
        if let Err(e) = self
            .platform
            .delete_message(event.chat_id, event.message_id)
            .await
        {
            debug!(error = %e, "failed to delete command message");
        }
    }

    async fn restrict(
        &self,
        event: &MessageEvent,
        args: &CommandArgs,
        scope: RestrictionScope,
        undo: bool,
        silent: bool,
    ) -> Result<()> {
        let targets = Self::targets(event, args);
        if targets.is_empty() {
            return Ok(());
        }

        let action = action_word(scope, undo);
        let warn_type = restriction_warn_type(scope, undo);
        let period = args.period();
        let until = (period > Duration::zero()).then_some(period);

        let mut lines = Vec::new();
        for reference in &targets {
            let link = messages::user_link(reference);
            let outcome = match self.resolve(reference).await {
                Ok(user_id) => self
                    .platform
                    .edit_permission(event.chat_id, user_id, scope, undo, until)
                    .await
                    .map(|()| user_id),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(user_id) => {
                    lines.push(messages::acted(&link, action, period));
                    self.store
                        .add_warning(event.chat_id, user_id, warn_type, args.comment.as_deref())
                        .await?;
                }
                Err(e) if e.is_target_rejection() => {
                    debug!(user_ref = reference.as_str(), error = %e, "target rejected");
                    lines.push(messages::not_acted(&link, action));
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(comment) = &args.comment {
            lines.push(messages::reason(comment));
        }

        self.delete_command_message(event).await;
        if !silent {
            self.platform
                .send_message(event.chat_id, &lines.join("\n"))
                .await?;
        }
        Ok(())
    }

    async fn kick(&self, event: &MessageEvent, args: &CommandArgs, silent: bool) -> Result<()> {
        let targets = Self::targets(event, args);
        if targets.is_empty() {
            return Ok(());
        }

        let mut lines = Vec::new();
        for reference in &targets {
            let link = messages::user_link(reference);
            let outcome = match self.resolve(reference).await {
                Ok(user_id) => self
                    .platform
                    .kick_user(event.chat_id, user_id)
                    .await
                    .map(|()| user_id),
                Err(e) => Err(e),
            };
            match outcome {
                Ok(user_id) => {
                    lines.push(messages::acted(&link, "kicked", Duration::zero()));
                    self.store
                        .add_warning(event.chat_id, user_id, WarnType::Kick, args.comment.as_deref())
                        .await?;
                }
                Err(e) if e.is_target_rejection() => {
                    debug!(user_ref = reference.as_str(), error = %e, "target rejected");
                    lines.push(messages::not_acted(&link, "kicked"));
                }
                Err(e) => return Err(e),
            }
        }
        if let Some(comment) = &args.comment {
            lines.push(messages::reason(comment));
        }

        self.delete_command_message(event).await;
        if !silent {
            self.platform
                .send_message(event.chat_id, &lines.join("\n"))
                .await?;
        }
        Ok(())
    }

    async fn warn(
        &self,
        event: &MessageEvent,
        args: &CommandArgs,
        delete_replied: bool,
    ) -> Result<()> {
        // `dwarn` only makes sense on a reply.
        if delete_replied && event.reply_to.is_none() {
            return Ok(());
        }
        let targets = Self::targets(event, args);
        if targets.is_empty() {
            return Ok(());
        }

        let settings = self.store.chat_settings(event.chat_id).await?;
        let mut lines = Vec::new();
        for reference in &targets {
            let link = messages::user_link(reference);
            let user_id = match self.resolve(reference).await {
                Ok(user_id) => user_id,
                Err(e) if e.is_target_rejection() => {
                    lines.push(messages::not_acted(&link, "warned"));
                    continue;
                }
                Err(e) => return Err(e),
            };

            // The escalation check runs against the history as it is before
            // this warning lands.
            let mute_for =
                escalate::mute_due(self.store.as_ref(), &settings, event.chat_id, user_id).await?;
            lines.push(messages::warned(&link));
            self.store
                .add_warning(event.chat_id, user_id, WarnType::Warn, args.comment.as_deref())
                .await?;

            if let Some(period) = mute_for {
                let muted = self
                    .platform
                    .edit_permission(
                        event.chat_id,
                        user_id,
                        RestrictionScope::SendMessages,
                        false,
                        Some(period),
                    )
                    .await;
                match muted {
                    Ok(()) => {
                        lines.push(messages::acted(&link, "muted", period));
                        self.store
                            .add_warning(
                                event.chat_id,
                                user_id,
                                WarnType::Mute,
                                args.comment.as_deref(),
                            )
                            .await?;
                    }
                    Err(e) if e.is_target_rejection() => {
                        debug!(user_ref = reference.as_str(), error = %e, "cascade mute rejected");
                        lines.push(messages::not_acted(&link, "muted"));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        if let Some(comment) = &args.comment {
            lines.push(messages::reason(comment));
        }

        if delete_replied {
            if let Some(reply) = event.reply_to {
                self.platform
                    .delete_messages(event.chat_id, &[reply.message_id])
                    .await?;
            }
        }
        self.platform
            .send_message(event.chat_id, &lines.join("\n"))
            .await?;
        Ok(())
    }

    async fn unwarn(&self, event: &MessageEvent, args: &CommandArgs) -> Result<()> {
        let targets = Self::targets(event, args);
        if targets.is_empty() {
            return Ok(());
        }

        let settings = self.store.chat_settings(event.chat_id).await?;
        let mut lines = Vec::new();
        for reference in &targets {
            let link = messages::user_link(reference);
            let user_id = match self.resolve(reference).await {
                Ok(user_id) => user_id,
                Err(e) if e.is_target_rejection() => {
                    lines.push(messages::not_acted(&link, "unwarned"));
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.store
                .delete_warnings(event.chat_id, user_id, settings.warn_counter_period)
                .await?;
            let remaining = self
                .store
                .count_warnings(event.chat_id, user_id, None, settings.warn_counter_period)
                .await?;
            lines.push(messages::warns_deleted(&link, remaining));
        }
        if let Some(comment) = &args.comment {
            lines.push(messages::reason(comment));
        }

        self.platform
            .send_message(event.chat_id, &lines.join("\n"))
            .await?;
        Ok(())
    }

    async fn slow_mode(&self, event: &MessageEvent, args: &CommandArgs, enable: bool) -> Result<()> {
        let seconds = if enable {
            // Whole days wrap out of the interval before snapping.
            let raw =
                (args.days * 86_400 + args.hours * 3_600 + args.minutes * 60).rem_euclid(86_400);
            snap_slow_mode(raw)
        } else {
            0
        };

        match self.platform.set_slow_mode(event.chat_id, seconds).await {
            Ok(()) => {
                let text = if enable {
                    messages::SLOW_MODE_ON
                } else {
                    messages::SLOW_MODE_OFF
                };
                self.platform.send_message(event.chat_id, text).await?;
                Ok(())
            }
            // The platform refusing the interval is not worth a reply.
            Err(Error::InvalidSlowMode) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn refresh_admins(&self, event: &MessageEvent) -> Result<()> {
        let known = self.store.admins_by_chat(Some(event.chat_id)).await?;
        let known = known.get(&event.chat_id).cloned().unwrap_or_default();
        roster::sync_chat(
            self.platform.as_ref(),
            self.store.as_ref(),
            &self.locks,
            event.chat_id,
            &known,
        )
        .await
    }
}
