//! Command dispatch: the explicit registry and the message-event entry
//! points.
//!
//! Every chat command is a row in the registry — its exact name, the
//! capability it requires, the rule set that parses its arguments, and the
//! action it runs. The table is built once at startup; an unknown name gets
//! the literal `wat?` reply.

use std::sync::Arc;

use tracing::debug;

use crate::authorize::{authorize, Capability};
use crate::domain::{MessageEvent, RestrictionScope};
use crate::extract::{self, CommandArgs, RuleSet};
use crate::messages;
use crate::ports::Platform;
use crate::roster::SyncLocks;
use crate::store::Store;
use crate::Result;

/// What a registered command runs once parsed and authorized.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    /// The ban/mute family: grant or revoke one permission per target.
    Restrict {
        scope: RestrictionScope,
        undo: bool,
        silent: bool,
    },
    Kick {
        silent: bool,
    },
    Warn {
        /// `dwarn`: reply-only, also deletes the replied-to message.
        delete_replied: bool,
    },
    Unwarn,
    SlowMode {
        enable: bool,
    },
    RefreshAdmins,
}

/// One registry row.
pub struct CommandSpec {
    pub name: &'static str,
    pub capability: Capability,
    pub rules: RuleSet,
    pub kind: CommandKind,
}

fn registry() -> Vec<CommandSpec> {
    use CommandKind::*;
    use RestrictionScope::{SendMessages, ViewMessages};

    fn spec(
        name: &'static str,
        capability: Capability,
        rules: RuleSet,
        kind: CommandKind,
    ) -> CommandSpec {
        CommandSpec { name, capability, rules, kind }
    }

    let ban = |undo, silent| Restrict { scope: ViewMessages, undo, silent };
    let mute = |undo, silent| Restrict { scope: SendMessages, undo, silent };

    vec![
        spec("ban", Capability::CanBan, extract::users_rules(), ban(false, false)),
        spec("sban", Capability::CanBan, extract::users_rules(), ban(false, true)),
        spec("unban", Capability::CanBan, extract::users_rules(), ban(true, false)),
        spec("mute", Capability::CanBan, extract::users_and_period_rules(), mute(false, false)),
        spec("smute", Capability::CanBan, extract::users_and_period_rules(), mute(false, true)),
        spec("unmute", Capability::CanBan, extract::users_rules(), mute(true, false)),
        spec("kick", Capability::CanBan, extract::users_rules(), Kick { silent: false }),
        spec("skick", Capability::CanBan, extract::users_rules(), Kick { silent: true }),
        spec("warn", Capability::CanBan, extract::users_rules(), Warn { delete_replied: false }),
        spec("dwarn", Capability::CanBan, extract::users_rules(), Warn { delete_replied: true }),
        spec("unwarn", Capability::CanBan, extract::users_rules(), Unwarn),
        spec("freeze", Capability::CanDelete, extract::period_rules(), SlowMode { enable: true }),
        spec("unfreeze", Capability::CanDelete, extract::period_rules(), SlowMode { enable: false }),
        spec("refresh_admins", Capability::CanAddAdmin, extract::command_rules(), RefreshAdmins),
    ]
}

/// The moderation engine: receives inbound events, dispatches commands, and
/// owns the handles the actions work through.
pub struct Engine {
    pub(crate) platform: Arc<dyn Platform>,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) locks: SyncLocks,
    registry: Vec<CommandSpec>,
}

impl Engine {
    pub fn new(platform: Arc<dyn Platform>, store: Arc<dyn Store>, locks: SyncLocks) -> Self {
        Self {
            platform,
            store,
            locks,
            registry: registry(),
        }
    }

    /// New incoming message: `!`-prefixed text dispatches as a command,
    /// everything else goes to the spam check.
    pub async fn on_new_message(&self, event: &MessageEvent) -> Result<()> {
        if event.text.starts_with('!') {
            self.run_command(event).await
        } else {
            self.spam_check(event).await
        }
    }

    /// Edited messages are never commands.
    pub async fn on_edited_message(&self, event: &MessageEvent) -> Result<()> {
        self.spam_check(event).await
    }

    /// Placeholder for content-based spam detection.
    async fn spam_check(&self, _event: &MessageEvent) -> Result<()> {
        Ok(())
    }

    async fn run_command(&self, event: &MessageEvent) -> Result<()> {
        let name = command_name(&event.text);
        let Some(spec) = self.registry.iter().find(|spec| spec.name == name) else {
            self.platform
                .send_message(event.chat_id, messages::WRONG_COMMAND)
                .await?;
            return Ok(());
        };

        let args = CommandArgs::from_extracted(spec.rules.extract(&event.text));
        if !authorize(
            self.store.as_ref(),
            self.platform.as_ref(),
            event.chat_id,
            event.sender,
            spec.capability,
        )
        .await?
        {
            debug!(
                command = spec.name,
                chat_id = event.chat_id.0,
                sender = event.sender.0,
                "command denied"
            );
            return Ok(());
        }

        self.execute(spec, event, args).await
    }
}

/// First whitespace-delimited token minus the leading `!`. Lookup is
/// case-sensitive.
fn command_name(text: &str) -> &str {
    let first = text.split_whitespace().next().unwrap_or("");
    first.strip_prefix('!').unwrap_or(first)
}
