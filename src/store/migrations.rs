//! Schema migrations for the libSQL backend.
//!
//! `schema_version` records every applied migration; `run_migrations`
//! applies the pending ones in version order.

use libsql::Connection;

use crate::error::DatabaseError;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const VERSION_TABLE: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
)";

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "settings",
        sql: r#"
            CREATE TABLE IF NOT EXISTS settings (
                user_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, key)
            );
        "#,
    },
    Migration {
        version: 2,
        name: "submissions",
        sql: r#"
            CREATE TABLE IF NOT EXISTS submissions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                record TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
        "#,
    },
];

fn migration_error(context: &str) -> impl Fn(libsql::Error) -> DatabaseError + '_ {
    move |e| DatabaseError::Migration(format!("{context}: {e}"))
}

pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(VERSION_TABLE, ())
        .await
        .map_err(migration_error("schema_version"))?;

    let applied = applied_version(conn).await?;
    let pending = MIGRATIONS.iter().filter(|m| m.version > applied);

    let mut latest = applied;
    for migration in pending {
        conn.execute_batch(migration.sql)
            .await
            .map_err(migration_error(migration.name))?;
        record_version(conn, migration).await?;
        latest = migration.version;
        tracing::info!(
            version = migration.version,
            migration = migration.name,
            "Schema migrated"
        );
    }

    if latest == applied {
        tracing::debug!(version = applied, "Schema up to date");
    }
    Ok(())
}

async fn applied_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let read = migration_error("schema_version read");
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await
        .map_err(&read)?;
    match rows.next().await.map_err(&read)? {
        Some(row) => row.get::<i64>(0).map_err(&read),
        None => Ok(0),
    }
}

async fn record_version(conn: &Connection, migration: &Migration) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, name) VALUES (?1, ?2)",
        libsql::params![migration.version, migration.name],
    )
    .await
    .map_err(migration_error(migration.name))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    #[tokio::test]
    async fn migrations_create_all_tables() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in &["schema_version", "settings", "submissions"] {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    libsql::params![*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            let count: i64 = row.get(0).unwrap();
            assert_eq!(count, 1, "Table '{}' should exist", table);
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        let version = applied_version(&conn).await.unwrap();
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn partial_database_is_upgraded() {
        let conn = test_conn().await;
        conn.execute(VERSION_TABLE, ()).await.unwrap();
        conn.execute_batch(MIGRATIONS[0].sql).await.unwrap();
        record_version(&conn, &MIGRATIONS[0]).await.unwrap();
        assert_eq!(applied_version(&conn).await.unwrap(), 1);

        run_migrations(&conn).await.unwrap();
        assert_eq!(applied_version(&conn).await.unwrap(), 2);
    }
}
