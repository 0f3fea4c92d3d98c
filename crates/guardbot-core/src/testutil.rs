//! In-memory ports shared by the unit tests: a storage over plain vectors
//! mirroring the SQLite adapter's behavior and a scripted platform that
//! records every call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::{
    AdminRecord, ChatAdmin, ChatId, ChatSettings, MessageEvent, MessageId, MessageRef, ReplyTo,
    RestrictionScope, UserId, WarnType, WarningRecord,
};
use crate::engine::Engine;
use crate::ports::Platform;
use crate::roster::SyncLocks;
use crate::store::Store;
use crate::{Error, Result};

#[derive(Default)]
pub struct MemoryStore {
    admins: Mutex<Vec<AdminRecord>>,
    warnings: Mutex<Vec<WarningRecord>>,
    settings: Mutex<Vec<ChatSettings>>,
}

impl MemoryStore {
    pub fn seed_admin(&self, record: AdminRecord) {
        self.admins.lock().unwrap().push(record);
    }

    pub fn seed_warning(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: WarnType,
        created: DateTime<Utc>,
    ) {
        self.warnings.lock().unwrap().push(WarningRecord {
            created,
            chat_id,
            user_id,
            warn_type,
            comment: None,
        });
    }

    /// All-time count of records of one type, for assertions.
    pub fn warning_count(&self, chat_id: ChatId, user_id: UserId, warn_type: WarnType) -> usize {
        self.warnings
            .lock()
            .unwrap()
            .iter()
            .filter(|w| w.chat_id == chat_id && w.user_id == user_id && w.warn_type == warn_type)
            .count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn has_admins(&self, chat_id: ChatId) -> Result<bool> {
        Ok(self
            .admins
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.chat_id == chat_id && !a.shadow_admin))
    }

    async fn find_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<Option<AdminRecord>> {
        Ok(self
            .admins
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.chat_id == chat_id && a.user_id == user_id)
            .cloned())
    }

    async fn upsert_admin(&self, record: &AdminRecord) -> Result<()> {
        let mut admins = self.admins.lock().unwrap();
        match admins
            .iter_mut()
            .find(|a| a.chat_id == record.chat_id && a.user_id == record.user_id)
        {
            Some(existing) => *existing = record.clone(),
            None => admins.push(record.clone()),
        }
        Ok(())
    }

    async fn delete_admins(&self, chat_id: ChatId, user_ids: &[UserId]) -> Result<()> {
        self.admins
            .lock()
            .unwrap()
            .retain(|a| a.chat_id != chat_id || !user_ids.contains(&a.user_id));
        Ok(())
    }

    async fn admins_by_chat(
        &self,
        chat_id: Option<ChatId>,
    ) -> Result<HashMap<ChatId, HashSet<UserId>>> {
        let mut out: HashMap<ChatId, HashSet<UserId>> = HashMap::new();
        for admin in self.admins.lock().unwrap().iter() {
            if admin.shadow_admin {
                continue;
            }
            if chat_id.is_some_and(|c| c != admin.chat_id) {
                continue;
            }
            out.entry(admin.chat_id).or_default().insert(admin.user_id);
        }
        Ok(out)
    }

    async fn add_warning(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: WarnType,
        comment: Option<&str>,
    ) -> Result<()> {
        self.warnings.lock().unwrap().push(WarningRecord {
            created: Utc::now(),
            chat_id,
            user_id,
            warn_type,
            comment: comment.map(str::to_string),
        });
        Ok(())
    }

    async fn count_warnings(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: Option<WarnType>,
        window: Duration,
    ) -> Result<i64> {
        let cutoff = Utc::now() - window;
        Ok(self
            .warnings
            .lock()
            .unwrap()
            .iter()
            .filter(|w| {
                w.chat_id == chat_id
                    && w.user_id == user_id
                    && w.created > cutoff
                    && warn_type.is_none_or(|t| w.warn_type == t)
            })
            .count() as i64)
    }

    async fn delete_warnings(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        window: Duration,
    ) -> Result<()> {
        let cutoff = Utc::now() - window;
        self.warnings
            .lock()
            .unwrap()
            .retain(|w| w.chat_id != chat_id || w.user_id != user_id || w.created <= cutoff);
        Ok(())
    }

    async fn chat_settings(&self, chat_id: ChatId) -> Result<ChatSettings> {
        let mut settings = self.settings.lock().unwrap();
        if let Some(existing) = settings.iter().find(|s| s.chat_id == chat_id) {
            return Ok(existing.clone());
        }
        let created = ChatSettings::defaults(chat_id);
        settings.push(created.clone());
        Ok(created)
    }
}

/// One recorded `edit_permission` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RestrictionCall {
    pub chat_id: ChatId,
    pub user_id: UserId,
    pub scope: RestrictionScope,
    pub grant: bool,
    pub until: Option<Duration>,
}

#[derive(Default)]
pub struct TestPlatform {
    admins: Mutex<HashMap<i64, Vec<ChatAdmin>>>,
    sent: Mutex<Vec<(ChatId, String)>>,
    deleted: Mutex<Vec<(ChatId, MessageId)>>,
    restrictions: Mutex<Vec<RestrictionCall>>,
    kicked: Mutex<Vec<(ChatId, UserId)>>,
    slow_modes: Mutex<Vec<(ChatId, u32)>>,
    rejected_users: Mutex<HashSet<i64>>,
    slow_mode_rejected: Mutex<bool>,
}

impl TestPlatform {
    pub fn seed_admins(&self, chat_id: ChatId, admins: Vec<ChatAdmin>) {
        self.admins.lock().unwrap().insert(chat_id.0, admins);
    }

    /// Make moderation calls against this user fail with `AdminRights`.
    pub fn reject_moderation_of(&self, user_id: UserId) {
        self.rejected_users.lock().unwrap().insert(user_id.0);
    }

    pub fn reject_slow_mode(&self) {
        *self.slow_mode_rejected.lock().unwrap() = true;
    }

    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<(ChatId, MessageId)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn restrictions(&self) -> Vec<RestrictionCall> {
        self.restrictions.lock().unwrap().clone()
    }

    pub fn kicked(&self) -> Vec<(ChatId, UserId)> {
        self.kicked.lock().unwrap().clone()
    }

    pub fn slow_modes(&self) -> Vec<(ChatId, u32)> {
        self.slow_modes.lock().unwrap().clone()
    }

    fn check_rejected(&self, user_id: UserId) -> Result<()> {
        if self.rejected_users.lock().unwrap().contains(&user_id.0) {
            return Err(Error::AdminRights);
        }
        Ok(())
    }
}

#[async_trait]
impl Platform for TestPlatform {
    async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((chat_id, text.to_string()));
        Ok(MessageRef { chat_id, message_id: MessageId(sent.len() as i32) })
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.deleted.lock().unwrap().push((chat_id, message_id));
        Ok(())
    }

    async fn delete_messages(&self, chat_id: ChatId, message_ids: &[MessageId]) -> Result<()> {
        let mut deleted = self.deleted.lock().unwrap();
        for id in message_ids {
            deleted.push((chat_id, *id));
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
        self.check_rejected(user_id)?;
        self.restrictions
            .lock()
            .unwrap()
            .push(RestrictionCall { chat_id, user_id, scope, grant, until });
        Ok(())
    }

    async fn kick_user(&self, chat_id: ChatId, user_id: UserId) -> Result<()> {
        self.check_rejected(user_id)?;
        self.kicked.lock().unwrap().push((chat_id, user_id));
        Ok(())
    }

    async fn chat_admins(&self, chat_id: ChatId) -> Result<Vec<ChatAdmin>> {
        Ok(self
            .admins
            .lock()
            .unwrap()
            .get(&chat_id.0)
            .cloned()
            .unwrap_or_default())
    }

    async fn resolve_user(&self, _reference: &str) -> Result<UserId> {
        Err(Error::InvalidUser)
    }

    async fn set_slow_mode(&self, chat_id: ChatId, seconds: u32) -> Result<()> {
        if *self.slow_mode_rejected.lock().unwrap() {
            return Err(Error::InvalidSlowMode);
        }
        self.slow_modes.lock().unwrap().push((chat_id, seconds));
        Ok(())
    }
}

/// A default record with every flag off, adjusted by the closure.
pub fn admin_record(
    chat_id: ChatId,
    user_id: UserId,
    adjust: impl FnOnce(&mut AdminRecord),
) -> AdminRecord {
    let mut record = AdminRecord {
        chat_id,
        user_id,
        can_delete: false,
        can_ban: false,
        can_add_admin: false,
        shadow_admin: false,
    };
    adjust(&mut record);
    record
}

pub fn event(chat_id: ChatId, sender: UserId, text: &str) -> MessageEvent {
    MessageEvent {
        chat_id,
        message_id: MessageId(7),
        sender,
        text: text.to_string(),
        reply_to: None,
    }
}

pub fn reply_event(chat_id: ChatId, sender: UserId, text: &str, reply_to: ReplyTo) -> MessageEvent {
    MessageEvent { reply_to: Some(reply_to), ..event(chat_id, sender, text) }
}

pub fn test_engine(
    store: MemoryStore,
    platform: TestPlatform,
) -> (Engine, Arc<TestPlatform>, Arc<MemoryStore>) {
    let store = Arc::new(store);
    let platform = Arc::new(platform);
    let engine = Engine::new(platform.clone(), store.clone(), SyncLocks::default());
    (engine, platform, store)
}

/// An engine whose `admin` already holds `can_ban` in `chat`.
pub fn can_ban_engine(
    chat_id: ChatId,
    admin: UserId,
) -> (Engine, Arc<TestPlatform>, Arc<MemoryStore>) {
    let store = MemoryStore::default();
    store.seed_admin(admin_record(chat_id, admin, |r| r.can_ban = true));
    test_engine(store, TestPlatform::default())
}
