// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turn log operations.

use chrono::{DateTime, Utc};
use parley_core::ParleyError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{TurnRow, format_timestamp};

/// Insert a turn and return its row id. `content` is stored verbatim.
pub async fn insert_turn(
    db: &Database,
    user_id: &str,
    role: &str,
    content: String,
    created_at: &DateTime<Utc>,
) -> Result<i64, ParleyError> {
    let user_id = user_id.to_string();
    let role = role.to_string();
    let created_at = format_timestamp(created_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO turns (user_id, role, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![user_id, role, content, created_at],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The `limit` newest turns of a user, oldest first.
pub async fn recent_turns(
    db: &Database,
    user_id: &str,
    limit: usize,
) -> Result<Vec<TurnRow>, ParleyError> {
    let user_id = user_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, role, content, created_at
                 FROM turns WHERE user_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![user_id, limit], |row| {
                Ok(TurnRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    created_at: row.get(4)?,
                })
            })?;
            let mut turns = rows.collect::<Result<Vec<_>, _>>()?;
            turns.reverse();
            Ok(turns)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete every turn of a user. Returns the number of deleted rows.
pub async fn delete_user_turns(db: &Database, user_id: &str) -> Result<u64, ParleyError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM turns WHERE user_id = ?1", params![user_id])?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete all turns created strictly before `cutoff`.
pub async fn delete_turns_before(
    db: &Database,
    cutoff: &DateTime<Utc>,
) -> Result<u64, ParleyError> {
    let cutoff = format_timestamp(cutoff);
    db.connection()
        .call(move |conn| {
            let n = conn.execute("DELETE FROM turns WHERE created_at < ?1", params![cutoff])?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of stored turns for a user.
pub async fn count_user_turns(db: &Database, user_id: &str) -> Result<u64, ParleyError> {
    let user_id = user_id.to_string();
    db.connection()
        .call(move |conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM turns WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::OpenOptions;
    use chrono::Duration;
    use tempfile::tempdir;

    async fn open() -> (tempfile::TempDir, Database) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("turns.db");
        let db = Database::open(path.to_str().unwrap(), &OpenOptions::default())
            .await
            .unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn same_timestamp_orders_by_insertion() {
        let (_dir, db) = open().await;
        let ts = Utc::now();
        for i in 0..3 {
            insert_turn(&db, "u1", "user", format!("m{i}"), &ts).await.unwrap();
        }
        let rows = recent_turns(&db, "u1", 2).await.unwrap();
        let contents: Vec<_> = rows.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, ["m1", "m2"]);
    }

    #[tokio::test]
    async fn users_are_isolated() {
        let (_dir, db) = open().await;
        let ts = Utc::now();
        insert_turn(&db, "a", "user", "from a".into(), &ts).await.unwrap();
        insert_turn(&db, "b", "user", "from b".into(), &ts).await.unwrap();

        assert_eq!(delete_user_turns(&db, "a").await.unwrap(), 1);
        assert_eq!(count_user_turns(&db, "a").await.unwrap(), 0);
        assert_eq!(count_user_turns(&db, "b").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_before_is_strict() {
        let (_dir, db) = open().await;
        let cutoff = Utc::now();
        insert_turn(&db, "u", "user", "old".into(), &(cutoff - Duration::seconds(1)))
            .await
            .unwrap();
        insert_turn(&db, "u", "user", "edge".into(), &cutoff).await.unwrap();

        assert_eq!(delete_turns_before(&db, &cutoff).await.unwrap(), 1);
        let rows = recent_turns(&db, "u", 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content, "edge");
    }
}
