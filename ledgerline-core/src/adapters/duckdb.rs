//! DuckDB ledger store
//!
//! A single connection sits behind an async mutex. A unit of work owns the
//! connection for its whole lifetime (`BEGIN TRANSACTION` .. `COMMIT`), so
//! writers are serialised and lock ordering can never produce a cycle here.
//! Read-side directory calls borrow the connection between units of work.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection, OptionalExt};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{Account, Entry, Error, NewAccount, NewUser, Result, Transfer, User};
use crate::ports::{LedgerDirectory, LedgerStore, TransactionalStore, UnitOfWork, UserStore};
use crate::services::{MigrationResult, MigrationService};

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const ACCOUNT_COLUMNS: &str = "id, owner, currency_id, balance, CAST(created_at AS VARCHAR)";
const ENTRY_COLUMNS: &str = "id, account_id, amount, CAST(created_at AS VARCHAR)";
const TRANSFER_COLUMNS: &str =
    "id, from_account_id, to_account_id, amount, CAST(created_at AS VARCHAR)";
const USER_COLUMNS: &str = "username, hashed_password, full_name, email, CAST(created_at AS VARCHAR)";

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    // Windows error messages
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        // Unix/macOS error messages
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

/// Map driver errors onto the ledger taxonomy
fn map_db_error(e: duckdb::Error) -> Error {
    match e {
        duckdb::Error::QueryReturnedNoRows => Error::not_found("row"),
        other => {
            let msg = other.to_string();
            if msg.contains("Constraint Error") || msg.contains("Out of Range Error") {
                Error::constraint(msg)
            } else {
                Error::database(msg)
            }
        }
    }
}

/// Current time truncated to the column's microsecond precision
fn now_micros() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_micros(now.timestamp_micros()).unwrap_or(now)
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::database(format!("bad timestamp {:?}: {}", s, e)))
}

type AccountRow = (i64, String, i64, i64, String);
type EntryRow = (i64, i64, i64, String);
type TransferRow = (i64, i64, i64, i64, String);
type UserRow = (String, String, String, String, String);

fn account_row(row: &duckdb::Row) -> duckdb::Result<AccountRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_account((id, owner, currency_id, balance, created_at): AccountRow) -> Result<Account> {
    Ok(Account {
        id,
        owner,
        currency_id,
        balance,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn entry_row(row: &duckdb::Row) -> duckdb::Result<EntryRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

fn into_entry((id, account_id, amount, created_at): EntryRow) -> Result<Entry> {
    Ok(Entry {
        id,
        account_id,
        amount,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn transfer_row(row: &duckdb::Row) -> duckdb::Result<TransferRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_transfer((id, from_account_id, to_account_id, amount, created_at): TransferRow) -> Result<Transfer> {
    Ok(Transfer {
        id,
        from_account_id,
        to_account_id,
        amount,
        created_at: parse_timestamp(&created_at)?,
    })
}

fn user_row(row: &duckdb::Row) -> duckdb::Result<UserRow> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_user((username, hashed_password, full_name, email, created_at): UserRow) -> Result<User> {
    Ok(User {
        username,
        hashed_password,
        full_name,
        email,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// DuckDB-backed ledger store
pub struct DuckDbLedgerStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbLedgerStore {
    /// Open (or create) a database file and bring its schema up to date
    ///
    /// Includes retry logic with exponential backoff for file locking errors,
    /// which occur when another process holds the database file.
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut attempt = 0;
        let conn = loop {
            match Self::try_open_connection(db_path) {
                Ok(conn) => break conn,
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max_attempts = MAX_RETRIES,
                            error = %err_msg,
                            "database busy, retrying"
                        );
                        thread::sleep(delay);
                        attempt += 1;
                        continue;
                    }
                    return Err(map_db_error(e));
                }
            }
        };

        Self::with_connection(conn, Some(db_path.to_path_buf()))
    }

    /// Open a private in-memory database (tests, dry runs)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(map_db_error)?;
        Self::with_connection(conn, None)
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off; nothing here needs extensions.
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn with_connection(conn: Connection, db_path: Option<PathBuf>) -> Result<Self> {
        let migrations = MigrationService::new(&conn).run_pending()?;
        if !migrations.applied.is_empty() {
            tracing::info!(applied = migrations.applied.len(), "database schema upgraded");
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Path of the backing file, `None` for in-memory databases
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Re-run migrations; reports what was already in place
    pub async fn migration_status(&self) -> Result<MigrationResult> {
        let conn = self.conn.lock().await;
        MigrationService::new(&conn).run_pending()
    }
}

#[async_trait]
impl TransactionalStore for DuckDbLedgerStore {
    type UnitOfWork = DuckDbUnitOfWork;

    async fn begin(&self) -> Result<DuckDbUnitOfWork> {
        let conn = Arc::clone(&self.conn).lock_owned().await;
        conn.execute_batch("BEGIN TRANSACTION").map_err(map_db_error)?;
        Ok(DuckDbUnitOfWork {
            conn,
            finished: false,
        })
    }
}

#[async_trait]
impl LedgerDirectory for DuckDbLedgerStore {
    async fn open_account(&self, account: &NewAccount) -> Result<Account> {
        let conn = self.conn.lock().await;
        let created_at = now_micros();
        let id: i64 = conn
            .query_row(
                "INSERT INTO accounts (owner, currency_id, balance, created_at)
                 VALUES (?, ?, 0, ?) RETURNING id",
                params![account.owner, account.currency_id, format_timestamp(&created_at)],
                |row| row.get(0),
            )
            .map_err(map_db_error)?;

        Ok(Account {
            id,
            owner: account.owner.clone(),
            currency_id: account.currency_id,
            balance: 0,
            created_at,
        })
    }

    async fn get_account(&self, id: i64) -> Result<Option<Account>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM accounts WHERE id = ?", ACCOUNT_COLUMNS);
        conn.query_row(&sql, params![id], account_row)
            .optional()
            .map_err(map_db_error)?
            .map(into_account)
            .transpose()
    }

    async fn list_accounts(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Account>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM accounts WHERE owner = ? ORDER BY id LIMIT ? OFFSET ?",
            ACCOUNT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(map_db_error)?;
        let rows = stmt
            .query_map(params![owner, limit, offset], account_row)
            .map_err(map_db_error)?;
        rows.map(|r| r.map_err(map_db_error).and_then(into_account))
            .collect()
    }

    async fn list_entries(&self, account_id: i64) -> Result<Vec<Entry>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM entries WHERE account_id = ? ORDER BY id",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(map_db_error)?;
        let rows = stmt
            .query_map(params![account_id], entry_row)
            .map_err(map_db_error)?;
        rows.map(|r| r.map_err(map_db_error).and_then(into_entry))
            .collect()
    }

    async fn list_transfers(&self, account_id: i64) -> Result<Vec<Transfer>> {
        let conn = self.conn.lock().await;
        let sql = format!(
            "SELECT {} FROM transfers WHERE from_account_id = ? OR to_account_id = ? ORDER BY id",
            TRANSFER_COLUMNS
        );
        let mut stmt = conn.prepare(&sql).map_err(map_db_error)?;
        let rows = stmt
            .query_map(params![account_id, account_id], transfer_row)
            .map_err(map_db_error)?;
        rows.map(|r| r.map_err(map_db_error).and_then(into_transfer))
            .collect()
    }

    async fn get_user(&self, username: &str) -> Result<Option<User>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS);
        conn.query_row(&sql, params![username], user_row)
            .optional()
            .map_err(map_db_error)?
            .map(into_user)
            .transpose()
    }
}

/// Unit of work over [`DuckDbLedgerStore`]; owns the connection until it ends
pub struct DuckDbUnitOfWork {
    conn: OwnedMutexGuard<Connection>,
    finished: bool,
}

#[async_trait]
impl LedgerStore for DuckDbUnitOfWork {
    async fn create_transfer(
        &mut self,
        from_account_id: i64,
        to_account_id: i64,
        amount: i64,
    ) -> Result<Transfer> {
        let created_at = now_micros();
        let id: i64 = self
            .conn
            .query_row(
                "INSERT INTO transfers (from_account_id, to_account_id, amount, created_at)
                 VALUES (?, ?, ?, ?) RETURNING id",
                params![from_account_id, to_account_id, amount, format_timestamp(&created_at)],
                |row| row.get(0),
            )
            .map_err(map_db_error)?;

        Ok(Transfer {
            id,
            from_account_id,
            to_account_id,
            amount,
            created_at,
        })
    }

    async fn create_entry(&mut self, account_id: i64, amount: i64) -> Result<Entry> {
        let created_at = now_micros();
        let id: i64 = self
            .conn
            .query_row(
                "INSERT INTO entries (account_id, amount, created_at) VALUES (?, ?, ?) RETURNING id",
                params![account_id, amount, format_timestamp(&created_at)],
                |row| row.get(0),
            )
            .map_err(map_db_error)?;

        Ok(Entry {
            id,
            account_id,
            amount,
            created_at,
        })
    }

    async fn add_account_balance(&mut self, account_id: i64, delta: i64) -> Result<Account> {
        let sql = format!(
            "UPDATE accounts SET balance = balance + ? WHERE id = ? RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let row = self
            .conn
            .query_row(&sql, params![delta, account_id], account_row)
            .map_err(|e| match e {
                duckdb::Error::QueryReturnedNoRows => {
                    Error::not_found(format!("account {}", account_id))
                }
                other => map_db_error(other),
            })?;
        into_account(row)
    }
}

#[async_trait]
impl UserStore for DuckDbUnitOfWork {
    async fn create_user(&mut self, user: NewUser) -> Result<User> {
        let created_at = now_micros();
        self.conn
            .execute(
                "INSERT INTO users (username, hashed_password, full_name, email, created_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![
                    user.username,
                    user.hashed_password,
                    user.full_name,
                    user.email,
                    format_timestamp(&created_at)
                ],
            )
            .map_err(map_db_error)?;

        Ok(User {
            username: user.username,
            hashed_password: user.hashed_password,
            full_name: user.full_name,
            email: user.email,
            created_at,
        })
    }
}

#[async_trait]
impl UnitOfWork for DuckDbUnitOfWork {
    async fn commit(mut self) -> Result<()> {
        self.finished = true;
        if let Err(e) = self.conn.execute_batch("COMMIT") {
            // A failed COMMIT may leave the transaction open; close it.
            if let Err(rollback) = self.conn.execute_batch("ROLLBACK") {
                tracing::debug!(error = %rollback, "rollback after failed commit");
            }
            return Err(map_db_error(e));
        }
        Ok(())
    }

    async fn rollback(mut self) -> Result<()> {
        self.finished = true;
        self.conn.execute_batch("ROLLBACK").map_err(map_db_error)
    }
}

impl Drop for DuckDbUnitOfWork {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::error!(error = %e, "rollback of abandoned unit of work failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error("IO Error: Could not set lock on file"));
        assert!(is_retryable_error("The process cannot access the file"));
        assert!(!is_retryable_error("Catalog Error: Table does not exist"));
    }

    #[test]
    fn test_timestamp_round_trip() {
        let ts = now_micros();
        assert_eq!(parse_timestamp(&format_timestamp(&ts)).unwrap(), ts);
        assert!(parse_timestamp("2025-01-15 10:30:00").is_ok());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn test_no_rows_maps_to_not_found() {
        assert!(map_db_error(duckdb::Error::QueryReturnedNoRows).is_not_found());
    }

    #[tokio::test]
    async fn test_balance_update_returns_post_update_row() {
        let store = DuckDbLedgerStore::open_in_memory().unwrap();
        let account = store
            .open_account(&NewAccount::new("alice", 1))
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        let updated = uow.add_account_balance(account.id, 40).await.unwrap();
        assert_eq!(updated.balance, 40);
        assert_eq!(updated.owner, "alice");
        uow.commit().await.unwrap();

        let stored = store.get_account(account.id).await.unwrap().unwrap();
        assert_eq!(stored.balance, 40);
        assert_eq!(stored.created_at, account.created_at);
    }

    #[tokio::test]
    async fn test_missing_account_not_found() {
        let store = DuckDbLedgerStore::open_in_memory().unwrap();
        let mut uow = store.begin().await.unwrap();
        let err = uow.add_account_balance(404, 1).await.unwrap_err();
        assert!(err.is_not_found());
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let store = DuckDbLedgerStore::open_in_memory().unwrap();
        let a = store.open_account(&NewAccount::new("alice", 1)).await.unwrap();
        let b = store.open_account(&NewAccount::new("bob", 1)).await.unwrap();

        {
            let mut uow = store.begin().await.unwrap();
            uow.create_transfer(a.id, b.id, 5).await.unwrap();
            uow.add_account_balance(a.id, -5).await.unwrap();
        }

        assert!(store.list_transfers(a.id).await.unwrap().is_empty());
        assert_eq!(store.get_account(a.id).await.unwrap().unwrap().balance, 0);
    }

    #[tokio::test]
    async fn test_check_constraints_on_transfers() {
        let store = DuckDbLedgerStore::open_in_memory().unwrap();
        let mut uow = store.begin().await.unwrap();
        let err = uow.create_transfer(1, 1, 5).await.unwrap_err();
        assert!(matches!(err, Error::Constraint(_)), "got {:?}", err);
        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_owner_currency_rejected() {
        let store = DuckDbLedgerStore::open_in_memory().unwrap();
        store.open_account(&NewAccount::new("alice", 1)).await.unwrap();
        let err = store
            .open_account(&NewAccount::new("alice", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Constraint(_)), "got {:?}", err);
    }
}
