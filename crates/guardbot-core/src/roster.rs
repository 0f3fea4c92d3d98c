//! Admin roster synchronization: the cached rights follow the live admin
//! list, chat by chat, under a per-chat advisory lock.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::domain::{AdminRecord, AdminRole, ChatId, UserId};
use crate::ports::Platform;
use crate::store::Store;
use crate::{Error, Result};

/// Advisory in-process lock set over chat ids.
///
/// Guards roster synchronization only. Moderation actions and authorization
/// reads never take it, so they may observe a roster mid-sync; the worst case
/// is a transient denial, healed by the next sync. Not persisted, cleared
/// with the process.
#[derive(Clone)]
pub struct SyncLocks {
    busy: Arc<Mutex<HashSet<i64>>>,
    timeout: Duration,
    poll: Duration,
}

impl SyncLocks {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self {
            busy: Arc::new(Mutex::new(HashSet::new())),
            timeout,
            poll,
        }
    }

    /// Poll until the chat id is free or the timeout elapses; failure is a
    /// recoverable [`Error::SyncBusy`], never a crash.
    pub async fn acquire(&self, chat_id: ChatId) -> Result<SyncGuard> {
        let deadline = Instant::now() + self.timeout;
        loop {
            {
                let mut busy = self.busy.lock().expect("sync lock set poisoned");
                if !busy.contains(&chat_id.0) {
                    busy.insert(chat_id.0);
                    return Ok(SyncGuard {
                        busy: Arc::clone(&self.busy),
                        chat_id: chat_id.0,
                    });
                }
            }
            if Instant::now() >= deadline {
                return Err(Error::SyncBusy(chat_id.0));
            }
            sleep(self.poll).await;
        }
    }
}

impl Default for SyncLocks {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_millis(100))
    }
}

/// Marks the chat busy until dropped.
pub struct SyncGuard {
    busy: Arc<Mutex<HashSet<i64>>>,
    chat_id: i64,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        if let Ok(mut busy) = self.busy.lock() {
            busy.remove(&self.chat_id);
        }
    }
}

/// Reconcile one chat's cached admins against the live roster.
///
/// If the chat is already being synchronized the sync is skipped with a
/// warning — no partial writes, no error to the caller. Rights are copied
/// from the platform, except the creator, who holds every capability
/// regardless of reported rights. Cached ids missing from the live roster are
/// deleted. Rows written here are never shadow admins.
pub async fn sync_chat(
    platform: &dyn Platform,
    store: &dyn Store,
    locks: &SyncLocks,
    chat_id: ChatId,
    known_admins: &HashSet<UserId>,
) -> Result<()> {
    let _guard = match locks.acquire(chat_id).await {
        Ok(guard) => guard,
        Err(Error::SyncBusy(id)) => {
            warn!(chat_id = id, "chat is busy with another admin sync, skipping");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let mut live_ids = HashSet::new();
    for admin in platform.chat_admins(chat_id).await? {
        live_ids.insert(admin.user_id);
        let (can_delete, can_ban, can_add_admin) = match admin.role {
            AdminRole::Creator => (true, true, true),
            AdminRole::Admin(rights) => {
                (rights.delete_messages, rights.ban_users, rights.add_admins)
            }
        };
        store
            .upsert_admin(&AdminRecord {
                chat_id,
                user_id: admin.user_id,
                can_delete,
                can_ban,
                can_add_admin,
                shadow_admin: false,
            })
            .await?;
    }

    let stale: Vec<UserId> = known_admins
        .iter()
        .copied()
        .filter(|id| !live_ids.contains(id))
        .collect();
    if !stale.is_empty() {
        store.delete_admins(chat_id, &stale).await?;
    }
    Ok(())
}

/// Background sweep keeping every known chat's roster fresh.
pub struct RosterSync {
    platform: Arc<dyn Platform>,
    store: Arc<dyn Store>,
    locks: SyncLocks,
    chat_cooldown: Duration,
    sweep_interval: Duration,
}

impl RosterSync {
    pub fn new(
        platform: Arc<dyn Platform>,
        store: Arc<dyn Store>,
        locks: SyncLocks,
        chat_cooldown: Duration,
        sweep_interval: Duration,
    ) -> Self {
        Self {
            platform,
            store,
            locks,
            chat_cooldown,
            sweep_interval,
        }
    }

    /// One pass over every chat holding cached admins, then the idle pause.
    async fn step(&self) -> Result<()> {
        for (chat_id, known) in self.store.admins_by_chat(None).await? {
            info!(chat_id = chat_id.0, "refreshing chat admins");
            sync_chat(
                self.platform.as_ref(),
                self.store.as_ref(),
                &self.locks,
                chat_id,
                &known,
            )
            .await?;
            sleep(self.chat_cooldown).await;
        }
        sleep(self.sweep_interval).await;
        Ok(())
    }

    /// Runs until an unexpected error escapes a sweep step. Lock contention
    /// never does; it is handled inside [`sync_chat`].
    pub async fn run(&self) -> Result<()> {
        loop {
            self.step().await?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdminRights, ChatAdmin};
    use crate::testutil::{admin_record, MemoryStore, TestPlatform};

    const CHAT: ChatId = ChatId(1);

    fn live_roster() -> Vec<ChatAdmin> {
        vec![
            ChatAdmin {
                user_id: UserId(10),
                role: AdminRole::Admin(AdminRights {
                    ban_users: true,
                    ..Default::default()
                }),
            },
            ChatAdmin { user_id: UserId(7), role: AdminRole::Creator },
        ]
    }

    #[tokio::test]
    async fn reconciles_cache_with_live_roster() {
        let store = MemoryStore::default();
        let platform = TestPlatform::default();
        platform.seed_admins(CHAT, live_roster());
        // Stale cached admin, no longer on the live roster.
        store.seed_admin(admin_record(CHAT, UserId(99), |r| r.can_ban = true));

        let known: HashSet<UserId> = [UserId(99)].into();
        sync_chat(&platform, &store, &SyncLocks::default(), CHAT, &known)
            .await
            .unwrap();

        assert_eq!(store.find_admin(CHAT, UserId(99)).await.unwrap(), None);

        let admin = store.find_admin(CHAT, UserId(10)).await.unwrap().unwrap();
        assert!(admin.can_ban && !admin.can_delete && !admin.can_add_admin);
        assert!(!admin.shadow_admin);

        let creator = store.find_admin(CHAT, UserId(7)).await.unwrap().unwrap();
        assert!(creator.can_ban && creator.can_delete && creator.can_add_admin);
    }

    #[tokio::test]
    async fn shadow_admins_survive_reconciliation() {
        let store = MemoryStore::default();
        let platform = TestPlatform::default();
        platform.seed_admins(CHAT, live_roster());
        store.seed_admin(admin_record(CHAT, UserId(50), |r| {
            r.can_delete = true;
            r.shadow_admin = true;
        }));

        // Shadow ids never appear in the known set handed to the sync.
        let known = store.admins_by_chat(Some(CHAT)).await.unwrap();
        assert!(known.get(&CHAT).is_none());

        sync_chat(&platform, &store, &SyncLocks::default(), CHAT, &HashSet::new())
            .await
            .unwrap();
        let shadow = store.find_admin(CHAT, UserId(50)).await.unwrap().unwrap();
        assert!(shadow.shadow_admin && shadow.can_delete);
    }

    #[tokio::test]
    async fn contended_sync_skips_without_writing() {
        let store = MemoryStore::default();
        let platform = TestPlatform::default();
        platform.seed_admins(CHAT, live_roster());

        let locks = SyncLocks::new(Duration::from_millis(20), Duration::from_millis(5));
        let guard = locks.acquire(CHAT).await.unwrap();

        sync_chat(&platform, &store, &locks, CHAT, &HashSet::new())
            .await
            .unwrap();
        assert!(!store.has_admins(CHAT).await.unwrap());

        // Released lock: the same sync goes through.
        drop(guard);
        sync_chat(&platform, &store, &locks, CHAT, &HashSet::new())
            .await
            .unwrap();
        assert!(store.has_admins(CHAT).await.unwrap());
    }

    #[tokio::test]
    async fn acquire_waits_for_release() {
        let locks = SyncLocks::new(Duration::from_millis(500), Duration::from_millis(5));
        let guard = locks.acquire(CHAT).await.unwrap();

        let locks_clone = locks.clone();
        let waiter = tokio::spawn(async move { locks_clone.acquire(CHAT).await.is_ok() });

        sleep(Duration::from_millis(20)).await;
        drop(guard);
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn other_chats_are_not_blocked() {
        let locks = SyncLocks::new(Duration::from_millis(50), Duration::from_millis(5));
        let _guard = locks.acquire(CHAT).await.unwrap();
        assert!(locks.acquire(ChatId(2)).await.is_ok());
    }
}
