//! The admin-rights authorization gate in front of every chat command.

use crate::domain::{AdminRecord, AdminRole, ChatId, UserId};
use crate::ports::Platform;
use crate::store::Store;
use crate::Result;

/// A named admin capability, mirroring the cached record's flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability {
    CanDelete,
    CanBan,
    CanAddAdmin,
}

impl Capability {
    fn granted_by(self, record: &AdminRecord) -> bool {
        match self {
            Capability::CanDelete => record.can_delete,
            Capability::CanBan => record.can_ban,
            Capability::CanAddAdmin => record.can_add_admin,
        }
    }
}

/// Whether `sender` may exercise `capability` in `chat_id`.
///
/// A chat that was never synchronized (no non-shadow cached record) falls
/// back to a live roster lookup: the chat's creator, or an admin allowed to
/// promote other admins, passes — for any capability, for this call only,
/// with nothing persisted. Otherwise the cached record for the sender
/// decides. Denial is not an error; callers stay silent on `Ok(false)`.
pub async fn authorize(
    store: &dyn Store,
    platform: &dyn Platform,
    chat_id: ChatId,
    sender: UserId,
    capability: Capability,
) -> Result<bool> {
    if !store.has_admins(chat_id).await? {
        let admins = platform.chat_admins(chat_id).await?;
        return Ok(admins.iter().any(|admin| {
            admin.user_id == sender
                && match admin.role {
                    AdminRole::Creator => true,
                    AdminRole::Admin(rights) => rights.add_admins,
                }
        }));
    }

    let Some(record) = store.find_admin(chat_id, sender).await? else {
        return Ok(false);
    };
    Ok(capability.granted_by(&record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdminRights, ChatAdmin};
    use crate::testutil::{admin_record, MemoryStore, TestPlatform};

    const CHAT: ChatId = ChatId(1);

    #[tokio::test]
    async fn cached_capability_flag_decides() {
        let store = MemoryStore::default();
        let platform = TestPlatform::default();
        store.seed_admin(admin_record(CHAT, UserId(1), |r| r.can_ban = true));
        store.seed_admin(admin_record(CHAT, UserId(2), |r| r.can_ban = false));

        assert!(authorize(&store, &platform, CHAT, UserId(1), Capability::CanBan)
            .await
            .unwrap());
        assert!(!authorize(&store, &platform, CHAT, UserId(2), Capability::CanBan)
            .await
            .unwrap());
        // No record at all: denied.
        assert!(!authorize(&store, &platform, CHAT, UserId(3), Capability::CanBan)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn shadow_admins_authorize_but_do_not_prime_the_cache() {
        let store = MemoryStore::default();
        let platform = TestPlatform::default();
        store.seed_admin(admin_record(CHAT, UserId(5), |r| {
            r.can_delete = true;
            r.shadow_admin = true;
        }));
        // Only a shadow row exists, so the gate still treats the chat as
        // uncached and asks the platform; the empty live roster denies.
        assert!(!authorize(&store, &platform, CHAT, UserId(5), Capability::CanDelete)
            .await
            .unwrap());

        // Once any non-shadow row exists, the shadow row authorizes normally.
        store.seed_admin(admin_record(CHAT, UserId(9), |r| r.can_ban = true));
        assert!(authorize(&store, &platform, CHAT, UserId(5), Capability::CanDelete)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn uncached_chat_admits_creator_for_any_capability() {
        let store = MemoryStore::default();
        let platform = TestPlatform::default();
        platform.seed_admins(
            CHAT,
            vec![
                ChatAdmin { user_id: UserId(7), role: AdminRole::Creator },
                ChatAdmin {
                    user_id: UserId(8),
                    role: AdminRole::Admin(AdminRights { add_admins: true, ..Default::default() }),
                },
                ChatAdmin {
                    user_id: UserId(9),
                    role: AdminRole::Admin(AdminRights { ban_users: true, ..Default::default() }),
                },
            ],
        );

        for capability in [Capability::CanDelete, Capability::CanBan, Capability::CanAddAdmin] {
            assert!(authorize(&store, &platform, CHAT, UserId(7), capability).await.unwrap());
            assert!(authorize(&store, &platform, CHAT, UserId(8), capability).await.unwrap());
            // An admin without the promote right is not trusted on a cold
            // cache, not even for the capability it does hold live.
            assert!(!authorize(&store, &platform, CHAT, UserId(9), capability).await.unwrap());
        }

        // Nothing was persisted by the live lookup.
        assert!(!store.has_admins(CHAT).await.unwrap());
    }
}
