use crate::errors::ApiError;
use chrono::{DateTime, Utc};
use cred_registry::{CredEvent, CredId};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Row, Sqlite};
use uuid::Uuid;

pub type Db = Pool<Sqlite>;

pub async fn connect(db_url: &str) -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await
        .map_err(|_| ApiError::Internal)
}

/// Single-connection in-memory database (every connection to `sqlite::memory:` is a new database).
#[cfg(test)]
pub async fn connect_in_memory() -> Result<Db, ApiError> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|_| ApiError::Internal)
}

pub async fn init_schema(db: &Db) -> Result<(), ApiError> {
    // Append-only journal of registry events. Registry state itself lives in memory.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS events (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  event_id TEXT NOT NULL UNIQUE,
  cred_id TEXT NOT NULL,
  kind TEXT NOT NULL,
  created_at TEXT NOT NULL,
  event_json TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS events_by_cred ON events (cred_id, seq);
"#,
    )
    .execute(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    Ok(())
}

/// Append `events` in one transaction: either all of them land, in order, or none do.
pub async fn append_events(db: &Db, events: &[CredEvent]) -> Result<(), ApiError> {
    if events.is_empty() {
        return Ok(());
    }

    let mut tx = db.begin().await.map_err(|_| ApiError::Internal)?;
    for event in events {
        let event_json = serde_json::to_string(event).map_err(|_| ApiError::Internal)?;

        sqlx::query(
            r#"INSERT INTO events (event_id, cred_id, kind, created_at, event_json)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(event.cred_id().to_string())
        .bind(event.kind())
        .bind(Utc::now().to_rfc3339())
        .bind(event_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, kind = event.kind(), "journal insert failed");
            ApiError::Internal
        })?;
    }
    tx.commit().await.map_err(|_| ApiError::Internal)?;

    Ok(())
}

/// Every journaled event across all creds, oldest first.
pub async fn all_events(db: &Db) -> Result<Vec<CredEvent>, ApiError> {
    let rows = sqlx::query("SELECT event_json FROM events ORDER BY seq")
        .fetch_all(db)
        .await
        .map_err(|_| ApiError::Internal)?;

    rows.into_iter()
        .map(|row| {
            let event_json: String = row.get(0);
            serde_json::from_str(&event_json).map_err(|_| ApiError::Internal)
        })
        .collect()
}

/// A journal row.
pub struct StoredEvent {
    pub seq: u64,
    pub event_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub event: CredEvent,
}

pub async fn list_events(db: &Db, cred_id: CredId, offset: u64, limit: u64) -> Result<Vec<StoredEvent>, ApiError> {
    let rows = sqlx::query(
        r#"SELECT seq, event_id, created_at, event_json
           FROM events
           WHERE cred_id = ?
           ORDER BY seq
           LIMIT ? OFFSET ?"#,
    )
    .bind(cred_id.to_string())
    .bind(limit as i64)
    .bind(offset as i64)
    .fetch_all(db)
    .await
    .map_err(|_| ApiError::Internal)?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let seq: i64 = row.get(0);
        let event_id: String = row.get(1);
        let created_at: String = row.get(2);
        let event_json: String = row.get(3);

        out.push(StoredEvent {
            seq: seq as u64,
            event_id: Uuid::parse_str(&event_id).map_err(|_| ApiError::Internal)?,
            created_at: DateTime::parse_from_rfc3339(&created_at)
                .map_err(|_| ApiError::Internal)?
                .with_timezone(&Utc),
            event: serde_json::from_str(&event_json).map_err(|_| ApiError::Internal)?,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cred_registry::Identity;

    #[tokio::test]
    async fn journal_round_trip_is_scoped_per_cred() {
        let db = connect_in_memory().await.unwrap();
        init_schema(&db).await.unwrap();

        let created = CredEvent::AdminChanged {
            id: CredId::from(1u64),
            old_admin: Identity::new("a"),
            new_admin: Identity::new("b"),
        };
        let other = CredEvent::RootValidityDurationSet {
            id: CredId::from(2u64),
            duration: 10,
        };
        append_events(&db, &[created.clone(), other.clone()]).await.unwrap();
        append_events(&db, &[created.clone()]).await.unwrap();

        let events = list_events(&db, CredId::from(1u64), 0, 10).await.unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].seq < events[1].seq);
        assert_eq!(events[0].event, created);

        let page = list_events(&db, CredId::from(1u64), 1, 10).await.unwrap();
        assert_eq!(page.len(), 1);

        assert_eq!(all_events(&db).await.unwrap(), vec![created.clone(), other, created]);
    }

    #[tokio::test]
    async fn failed_batch_appends_nothing() {
        let db = connect_in_memory().await.unwrap();
        init_schema(&db).await.unwrap();
        sqlx::query(
            "CREATE TRIGGER reject_admin_changed BEFORE INSERT ON events WHEN NEW.kind = 'admin_changed' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END",
        )
        .execute(&db)
        .await
        .unwrap();

        let duration = CredEvent::RootValidityDurationSet {
            id: CredId::from(1u64),
            duration: 10,
        };
        let admin = CredEvent::AdminChanged {
            id: CredId::from(1u64),
            old_admin: Identity::new("a"),
            new_admin: Identity::new("b"),
        };
        assert!(append_events(&db, &[duration, admin]).await.is_err());
        assert!(all_events(&db).await.unwrap().is_empty());
    }
}
