// SPDX-FileCopyrightText: 2026 Bagwatch Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User CRUD operations.

use bagwatch_core::{BagwatchError, ChatId, Credentials, User};
use rusqlite::{OptionalExtension, Row, params};

use crate::database::Database;

const USER_COLUMNS: &str = "chat_id, email, access_token, refresh_token, cookie";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        chat_id: ChatId(row.get(0)?),
        email: row.get(1)?,
        credentials: Credentials {
            access_token: row.get(2)?,
            refresh_token: row.get(3)?,
            cookie: row.get(4)?,
        },
    })
}

/// Insert a user. Returns `false` without writing if the chat is already registered.
pub async fn insert_user(db: &Database, user: &User) -> Result<bool, BagwatchError> {
    let user = user.clone();
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE chat_id = ?1)",
                params![user.chat_id.0],
                |row| row.get(0),
            )?;
            if exists {
                return Ok(false);
            }
            tx.execute(
                "INSERT INTO users (chat_id, email, access_token, refresh_token, cookie)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.chat_id.0,
                    user.email,
                    user.credentials.access_token,
                    user.credentials.refresh_token,
                    user.credentials.cookie,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the user bound to a chat.
pub async fn get_user(db: &Database, chat_id: ChatId) -> Result<Option<User>, BagwatchError> {
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE chat_id = ?1"),
                params![chat_id.0],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Find the earliest registered user with the given email.
pub async fn find_user_by_email(db: &Database, email: &str) -> Result<Option<User>, BagwatchError> {
    let email = email.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users WHERE email = ?1
                     ORDER BY created_at ASC, chat_id ASC LIMIT 1"
                ),
                params![email],
                row_to_user,
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List all users ordered by chat id.
pub async fn list_users(db: &Database) -> Result<Vec<User>, BagwatchError> {
    db.connection()
        .call(|conn| -> rusqlite::Result<Vec<User>> {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY chat_id"))?;
            let rows = stmt.query_map([], row_to_user)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a user. Notification rows go with it via `ON DELETE CASCADE`.
pub async fn delete_user(db: &Database, chat_id: ChatId) -> Result<bool, BagwatchError> {
    db.connection()
        .call(move |conn| -> rusqlite::Result<bool> {
            let deleted = conn.execute("DELETE FROM users WHERE chat_id = ?1", params![chat_id.0])?;
            Ok(deleted > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn setup() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.db");
        let db = Database::open(path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn user(chat_id: i64, email: &str, token: &str) -> User {
        User {
            chat_id: ChatId(chat_id),
            email: email.to_string(),
            credentials: Credentials {
                access_token: token.to_string(),
                refresh_token: format!("{token}-refresh"),
                cookie: "datadome=abc".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn insert_and_get_user() {
        let (db, _dir) = setup().await;
        assert!(insert_user(&db, &user(42, "a@b.com", "tok")).await.unwrap());

        let got = get_user(&db, ChatId(42)).await.unwrap().unwrap();
        assert_eq!(got.email, "a@b.com");
        assert_eq!(got.credentials.access_token, "tok");
        assert_eq!(got.credentials.refresh_token, "tok-refresh");
        assert_eq!(got.credentials.cookie, "datadome=abc");
    }

    #[tokio::test]
    async fn get_missing_user_returns_none() {
        let (db, _dir) = setup().await;
        assert!(get_user(&db, ChatId(7)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_insert_for_same_chat_is_rejected() {
        let (db, _dir) = setup().await;
        assert!(insert_user(&db, &user(42, "a@b.com", "t1")).await.unwrap());
        assert!(!insert_user(&db, &user(42, "c@d.com", "t2")).await.unwrap());

        let got = get_user(&db, ChatId(42)).await.unwrap().unwrap();
        assert_eq!(got.credentials.access_token, "t1");
    }

    #[tokio::test]
    async fn same_email_may_back_several_chats() {
        let (db, _dir) = setup().await;
        insert_user(&db, &user(1, "shared@b.com", "t")).await.unwrap();
        insert_user(&db, &user(2, "shared@b.com", "t")).await.unwrap();

        let found = find_user_by_email(&db, "shared@b.com").await.unwrap().unwrap();
        assert_eq!(found.chat_id, ChatId(1));
        assert_eq!(list_users(&db).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_row_existed() {
        let (db, _dir) = setup().await;
        insert_user(&db, &user(5, "x@y.com", "t")).await.unwrap();
        assert!(delete_user(&db, ChatId(5)).await.unwrap());
        assert!(!delete_user(&db, ChatId(5)).await.unwrap());
        assert!(list_users(&db).await.unwrap().is_empty());
    }
}
