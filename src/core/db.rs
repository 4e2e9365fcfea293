use anyhow::{Error, Result};
use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

/// Opens (creating if needed) the sqlite database in `dir`.
pub async fn async_db(dir: &str) -> Result<Connection, Error> {
    std::fs::create_dir_all(dir)?;
    let db = Connection::open(format!("{}/slotbot.db", dir.trim_end_matches('/'))).await?;
    Ok(db)
}

pub fn initialize_db(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS auth (
            id TEXT PRIMARY KEY,
            service TEXT NOT NULL,
            refresh_token TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );",
    )
}

/// Stores the refresh token for an account, replacing any previous one.
pub async fn save_refresh_token(
    db: &Connection,
    account: &str,
    service: &str,
    refresh_token: &str,
) -> Result<(), Error> {
    let account = account.trim().to_lowercase();
    let service = service.to_owned();
    let refresh_token = refresh_token.to_owned();
    db.call(move |conn| {
        conn.execute(
            "INSERT INTO auth (id, service, refresh_token) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET service = excluded.service,
                 refresh_token = excluded.refresh_token,
                 updated_at = CURRENT_TIMESTAMP",
            (&account, &service, &refresh_token),
        )?;
        Ok(())
    })
    .await?;

    Ok(())
}

pub async fn find_refresh_token(db: &Connection, account: &str) -> Result<Option<String>, Error> {
    let account = account.trim().to_lowercase();
    let token = db
        .call(move |conn| {
            let token = conn
                .query_row(
                    "SELECT refresh_token FROM auth WHERE id = ?1",
                    [&account],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(token)
        })
        .await?;

    Ok(token)
}
