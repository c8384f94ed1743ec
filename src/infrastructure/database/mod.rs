//! SQLite storage for users, bills and payments
//!
//! Connections come from an r2d2 pool and every statement runs on the
//! blocking thread pool, so a busy database never stalls a runtime worker.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{Type, Value};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::application::errors::StorageError;
use crate::domain::entities::{Billing, BillingKey, Payment, User, UserKey};
use crate::domain::traits::Store;

const MEMORY_PATH: &str = ":memory:";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id            TEXT PRIMARY KEY,
        telegram_id   INTEGER NOT NULL UNIQUE,
        telegram_name TEXT NOT NULL DEFAULT '',
        admin         INTEGER NOT NULL DEFAULT 0,
        created_at    TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS billings (
        id          TEXT PRIMARY KEY,
        name        TEXT NOT NULL UNIQUE,
        value       REAL NOT NULL,
        created_at  TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS billing_user (
        id_billing  TEXT NOT NULL REFERENCES billings(id) ON DELETE CASCADE,
        id_user     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        paid        INTEGER NOT NULL DEFAULT 0,
        paid_at     TEXT,
        PRIMARY KEY (id_billing, id_user)
    );

    CREATE INDEX IF NOT EXISTS idx_billing_user_user ON billing_user(id_user);
";

const USER_COLUMNS: &str = "id, telegram_id, telegram_name, admin, created_at";
const BILLING_COLUMNS: &str = "id, name, value, created_at";

/// SQLite backed [`Store`]
#[derive(Clone)]
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// An in-memory database lives inside a single connection, so the pool
    /// holds one connection for `:memory:`.
    pub async fn open(path: impl Into<String>, max_conn: usize) -> Result<Self, StorageError> {
        let path = path.into();
        let in_memory = path == MEMORY_PATH;
        let max_size = if in_memory {
            1
        } else {
            u32::try_from(max_conn).unwrap_or(u32::MAX).max(1)
        };

        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(&path)
        }
        .with_init(move |conn| {
            conn.pragma_update(None, "foreign_keys", "ON")?;
            if !in_memory {
                conn.pragma_update(None, "journal_mode", "WAL")?;
                conn.busy_timeout(Duration::from_secs(5))?;
            }
            Ok(())
        });

        // Building the pool opens its connections
        let pool = tokio::task::spawn_blocking(move || Pool::builder().max_size(max_size).build(manager))
            .await??;

        let db = Self { pool };
        db.interact(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        tracing::info!("Database opened at {} (max {} connections)", path, max_size);
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, StorageError> {
        Self::open(MEMORY_PATH, 1).await
    }

    /// Largest number of connections the pool hands out at once
    pub fn max_conn(&self) -> u32 {
        self.pool.max_size()
    }

    /// Run `f` with a pooled connection on the blocking thread pool
    async fn interact<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut *conn)
        })
        .await?
    }
}

fn user_filter(key: &UserKey) -> (&'static str, Value) {
    match key {
        UserKey::Id(id) => ("id = ?1", Value::Text(id.to_string())),
        UserKey::TelegramId(tid) => ("telegram_id = ?1", Value::Integer(*tid)),
    }
}

fn billing_filter(key: &BillingKey) -> (&'static str, Value) {
    match key {
        BillingKey::Id(id) => ("id = ?1", Value::Text(id.to_string())),
        BillingKey::Name(name) => ("name = ?1", Value::Text(name.clone())),
    }
}

fn uuid_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let text: String = row.get(idx)?;
    Uuid::parse_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_column(row, 0)?,
        telegram_id: row.get(1)?,
        telegram_name: row.get(2)?,
        admin: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn billing_from_row(row: &Row<'_>) -> rusqlite::Result<Billing> {
    Ok(Billing {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        value: row.get(2)?,
        created_at: row.get(3)?,
        value_per_user: None,
        payments: Vec::new(),
    })
}

/// Unique and primary key violations become `Conflict`, foreign key
/// violations mean a referenced row is missing.
fn classify(err: rusqlite::Error, what: impl FnOnce() -> String) -> StorageError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == rusqlite::ErrorCode::ConstraintViolation {
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                return StorageError::not_found("billing or user", what());
            }
            return StorageError::Conflict(what());
        }
    }
    StorageError::Sqlite(err)
}

fn query_payment(conn: &Connection, billing_id: Uuid, user_id: Uuid) -> Result<Payment, StorageError> {
    conn.query_row(
        "SELECT paid, paid_at FROM billing_user WHERE id_billing = ?1 AND id_user = ?2",
        params![billing_id.to_string(), user_id.to_string()],
        |row| {
            Ok(Payment {
                billing_id,
                user_id,
                paid: row.get(0)?,
                paid_at: row.get::<_, Option<DateTime<Utc>>>(1)?,
                user: None,
            })
        },
    )
    .optional()?
    .ok_or_else(|| StorageError::not_found("payment", format!("{}/{}", billing_id, user_id)))
}

#[async_trait]
impl Store for Database {
    async fn create_user(&self, user: &User) -> Result<(), StorageError> {
        let user = user.clone();
        self.interact(move |conn| {
            conn.execute(
                "INSERT INTO users (id, telegram_id, telegram_name, admin, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    user.id.to_string(),
                    user.telegram_id,
                    user.telegram_name,
                    user.admin,
                    user.created_at
                ],
            )
            .map_err(|e| classify(e, || format!("user {}", user.telegram_id)))?;
            Ok(())
        })
        .await
    }

    async fn get_user(&self, key: &UserKey) -> Result<User, StorageError> {
        let key = *key;
        self.interact(move |conn| {
            let (clause, value) = user_filter(&key);
            let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, clause);

            conn.query_row(&sql, [value], user_from_row)
                .optional()?
                .ok_or_else(|| StorageError::not_found("user", key))
        })
        .await
    }

    async fn delete_user(&self, key: &UserKey) -> Result<(), StorageError> {
        let key = *key;
        self.interact(move |conn| {
            let (clause, value) = user_filter(&key);

            let tx = conn.transaction()?;
            let deleted = tx.execute(&format!("DELETE FROM users WHERE {}", clause), [value])?;
            if deleted == 0 {
                return Err(StorageError::not_found("user", key));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn create_billing(&self, billing: &Billing) -> Result<(), StorageError> {
        let billing = billing.clone();
        self.interact(move |conn| {
            conn.execute(
                "INSERT INTO billings (id, name, value, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![
                    billing.id.to_string(),
                    billing.name,
                    billing.value,
                    billing.created_at
                ],
            )
            .map_err(|e| classify(e, || format!("billing {}", billing.name)))?;
            Ok(())
        })
        .await
    }

    async fn get_billing(&self, key: &BillingKey) -> Result<Billing, StorageError> {
        let key = key.clone();
        self.interact(move |conn| {
            let (clause, value) = billing_filter(&key);

            // One read transaction so the bill and its rows agree
            let tx = conn.transaction()?;
            let sql = format!("SELECT {} FROM billings WHERE {}", BILLING_COLUMNS, clause);
            let mut billing = tx
                .query_row(&sql, [value], billing_from_row)
                .optional()?
                .ok_or_else(|| StorageError::not_found("billing", &key))?;

            {
                let mut stmt = tx.prepare(
                    "SELECT bu.id_user, bu.paid, bu.paid_at,
                            u.id, u.telegram_id, u.telegram_name, u.admin, u.created_at
                     FROM billing_user bu
                     JOIN users u ON u.id = bu.id_user
                     WHERE bu.id_billing = ?1
                     ORDER BY bu.rowid",
                )?;
                let billing_id = billing.id;
                let rows = stmt.query_map([billing_id.to_string()], |row| {
                    Ok(Payment {
                        billing_id,
                        user_id: uuid_column(row, 0)?,
                        paid: row.get(1)?,
                        paid_at: row.get::<_, Option<DateTime<Utc>>>(2)?,
                        user: Some(User {
                            id: uuid_column(row, 3)?,
                            telegram_id: row.get(4)?,
                            telegram_name: row.get(5)?,
                            admin: row.get(6)?,
                            created_at: row.get(7)?,
                        }),
                    })
                })?;
                for payment in rows {
                    billing.payments.push(payment?);
                }
            }

            tx.commit()?;
            Ok(billing)
        })
        .await
    }

    async fn list_billings(&self) -> Result<Vec<Billing>, StorageError> {
        self.interact(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM billings ORDER BY created_at, id",
                BILLING_COLUMNS
            ))?;

            let rows = stmt.query_map([], billing_from_row)?;
            let mut billings = Vec::new();
            for billing in rows {
                billings.push(billing?);
            }
            Ok(billings)
        })
        .await
    }

    async fn delete_billing(&self, key: &BillingKey) -> Result<(), StorageError> {
        let key = key.clone();
        self.interact(move |conn| {
            let (clause, value) = billing_filter(&key);

            let tx = conn.transaction()?;
            let deleted = tx.execute(&format!("DELETE FROM billings WHERE {}", clause), [value])?;
            if deleted == 0 {
                return Err(StorageError::not_found("billing", &key));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn associate_payment(&self, payment: &Payment) -> Result<(), StorageError> {
        let (billing_id, user_id) = (payment.billing_id, payment.user_id);
        let (paid, paid_at) = (payment.paid, payment.paid_at);
        self.interact(move |conn| {
            conn.execute(
                "INSERT INTO billing_user (id_billing, id_user, paid, paid_at) VALUES (?1, ?2, ?3, ?4)",
                params![billing_id.to_string(), user_id.to_string(), paid, paid_at],
            )
            .map_err(|e| classify(e, || format!("user {} on billing {}", user_id, billing_id)))?;
            Ok(())
        })
        .await
    }

    async fn disassociate_payment(&self, billing_id: Uuid, user_id: Uuid) -> Result<(), StorageError> {
        self.interact(move |conn| {
            let tx = conn.transaction()?;
            let deleted = tx.execute(
                "DELETE FROM billing_user WHERE id_billing = ?1 AND id_user = ?2",
                params![billing_id.to_string(), user_id.to_string()],
            )?;
            if deleted == 0 {
                return Err(StorageError::not_found("payment", format!("{}/{}", billing_id, user_id)));
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn change_payment_status(&self, payment: &Payment) -> Result<(), StorageError> {
        let (billing_id, user_id) = (payment.billing_id, payment.user_id);
        let (paid, paid_at) = (payment.paid, payment.paid_at);
        self.interact(move |conn| {
            let updated = conn.execute(
                "UPDATE billing_user SET paid = ?1, paid_at = ?2 WHERE id_billing = ?3 AND id_user = ?4",
                params![paid, paid_at, billing_id.to_string(), user_id.to_string()],
            )?;
            if updated == 0 {
                return Err(StorageError::not_found("payment", format!("{}/{}", billing_id, user_id)));
            }
            Ok(())
        })
        .await
    }

    async fn get_payment_association(&self, billing_id: Uuid, user_id: Uuid) -> Result<Payment, StorageError> {
        self.interact(move |conn| query_payment(conn, billing_id, user_id)).await
    }
}
