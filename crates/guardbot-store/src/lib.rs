//! SQLite adapter (rusqlite).
//!
//! Implements the `guardbot-core` repository port. The schema is created on
//! open; the connection lives behind an async mutex and statements never
//! await while holding it.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use guardbot_core::domain::{AdminRecord, ChatId, ChatSettings, UserId, WarnType};
use guardbot_core::store::Store;
use guardbot_core::{Error, Result};

fn init_db(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        CREATE TABLE IF NOT EXISTS chat_admins (
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            shadow_admin INTEGER NOT NULL DEFAULT 0,
            can_delete INTEGER NOT NULL DEFAULT 0,
            can_ban INTEGER NOT NULL DEFAULT 0,
            can_add_admin INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (chat_id, user_id)
        );
        CREATE TABLE IF NOT EXISTS user_warns (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created INTEGER NOT NULL,
            chat_id INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            warn_type INTEGER NOT NULL,
            comment TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_user_warns_lookup
            ON user_warns(chat_id, user_id, created, warn_type);
        CREATE INDEX IF NOT EXISTS idx_user_warns_created ON user_warns(created);
        CREATE TABLE IF NOT EXISTS chat_settings (
            chat_id INTEGER PRIMARY KEY,
            warn_count INTEGER NOT NULL DEFAULT 3,
            warn_counter_period INTEGER NOT NULL DEFAULT 259200,
            mute_period INTEGER NOT NULL DEFAULT 86400
        );
        "#,
    )
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

fn row_to_admin(row: &rusqlite::Row<'_>) -> rusqlite::Result<AdminRecord> {
    Ok(AdminRecord {
        chat_id: ChatId(row.get(0)?),
        user_id: UserId(row.get(1)?),
        shadow_admin: row.get::<_, i64>(2)? != 0,
        can_delete: row.get::<_, i64>(3)? != 0,
        can_ban: row.get::<_, i64>(4)? != 0,
        can_add_admin: row.get::<_, i64>(5)? != 0,
    })
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        init_db(&conn).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        init_db(&conn).map_err(db_err)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    #[cfg(test)]
    async fn add_warning_at(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: WarnType,
        created: i64,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO user_warns (created, chat_id, user_id, warn_type, comment)
             VALUES (?1, ?2, ?3, ?4, NULL)",
            params![created, chat_id.0, user_id.0, warn_type.as_i64()],
        )
        .map_err(db_err)?;
        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn has_admins(&self, chat_id: ChatId) -> Result<bool> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM chat_admins WHERE chat_id = ?1 AND shadow_admin = 0)",
            params![chat_id.0],
            |row| row.get::<_, i64>(0),
        )
        .map(|v| v != 0)
        .map_err(db_err)
    }

    async fn find_admin(&self, chat_id: ChatId, user_id: UserId) -> Result<Option<AdminRecord>> {
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT chat_id, user_id, shadow_admin, can_delete, can_ban, can_add_admin
             FROM chat_admins WHERE chat_id = ?1 AND user_id = ?2",
            params![chat_id.0, user_id.0],
            row_to_admin,
        )
        .optional()
        .map_err(db_err)
    }

    async fn upsert_admin(&self, record: &AdminRecord) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO chat_admins (chat_id, user_id, shadow_admin, can_delete, can_ban, can_add_admin)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(chat_id, user_id) DO UPDATE SET
                 shadow_admin = excluded.shadow_admin,
                 can_delete = excluded.can_delete,
                 can_ban = excluded.can_ban,
                 can_add_admin = excluded.can_add_admin",
            params![
                record.chat_id.0,
                record.user_id.0,
                record.shadow_admin as i64,
                record.can_delete as i64,
                record.can_ban as i64,
                record.can_add_admin as i64,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn delete_admins(&self, chat_id: ChatId, user_ids: &[UserId]) -> Result<()> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare("DELETE FROM chat_admins WHERE chat_id = ?1 AND user_id = ?2")
            .map_err(db_err)?;
        for user_id in user_ids {
            stmt.execute(params![chat_id.0, user_id.0]).map_err(db_err)?;
        }
        Ok(())
    }

    async fn admins_by_chat(
        &self,
        chat_id: Option<ChatId>,
    ) -> Result<HashMap<ChatId, HashSet<UserId>>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn
            .prepare(
                "SELECT chat_id, user_id FROM chat_admins
                 WHERE shadow_admin = 0 AND (?1 IS NULL OR chat_id = ?1)
                 ORDER BY chat_id",
            )
            .map_err(db_err)?;
        let rows = stmt
            .query_map(params![chat_id.map(|c| c.0)], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(db_err)?;

        let mut out: HashMap<ChatId, HashSet<UserId>> = HashMap::new();
        for row in rows {
            let (chat, user) = row.map_err(db_err)?;
            out.entry(ChatId(chat)).or_default().insert(UserId(user));
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
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO user_warns (created, chat_id, user_id, warn_type, comment)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Utc::now().timestamp(),
                chat_id.0,
                user_id.0,
                warn_type.as_i64(),
                comment,
            ],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn count_warnings(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        warn_type: Option<WarnType>,
        window: Duration,
    ) -> Result<i64> {
        let cutoff = (Utc::now() - window).timestamp();
        let conn = self.conn.lock().await;
        conn.query_row(
            "SELECT COUNT(*) FROM user_warns
             WHERE chat_id = ?1 AND user_id = ?2 AND created > ?3
               AND (?4 IS NULL OR warn_type = ?4)",
            params![chat_id.0, user_id.0, cutoff, warn_type.map(WarnType::as_i64)],
            |row| row.get(0),
        )
        .map_err(db_err)
    }

    async fn delete_warnings(
        &self,
        chat_id: ChatId,
        user_id: UserId,
        window: Duration,
    ) -> Result<()> {
        let cutoff = (Utc::now() - window).timestamp();
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM user_warns WHERE chat_id = ?1 AND user_id = ?2 AND created > ?3",
            params![chat_id.0, user_id.0, cutoff],
        )
        .map_err(db_err)?;
        Ok(())
    }

    async fn chat_settings(&self, chat_id: ChatId) -> Result<ChatSettings> {
        let conn = self.conn.lock().await;
        // Create-if-absent, then read: a concurrent creation loses the
        // INSERT but the follow-up SELECT sees the surviving row.
        conn.execute(
            "INSERT OR IGNORE INTO chat_settings (chat_id) VALUES (?1)",
            params![chat_id.0],
        )
        .map_err(db_err)?;
        conn.query_row(
            "SELECT chat_id, warn_count, warn_counter_period, mute_period
             FROM chat_settings WHERE chat_id = ?1",
            params![chat_id.0],
            |row| {
                Ok(ChatSettings {
                    chat_id: ChatId(row.get(0)?),
                    warn_count: row.get(1)?,
                    warn_counter_period: Duration::seconds(row.get(2)?),
                    mute_period: Duration::seconds(row.get(3)?),
                })
            },
        )
        .map_err(db_err)
    }
}
