//! SQLite-backed store for sample records and user accounts.
//!
//! A single connection is shared behind a mutex. Blocking SQLite calls run
//! on the tokio blocking pool, gated by a semaphore so that only one
//! blocking thread waits on the mutex at a time.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

use crate::error::AnalyticsError;
use crate::filter::DATE_FORMAT;
use crate::models::{SampleRecord, User};

/// Handle to the sample store. Cheap to clone.
#[derive(Clone)]
pub struct SampleStore {
    conn: Arc<Mutex<Connection>>,
    sem: Arc<Semaphore>,
}

impl SampleStore {
    /// Open or create the store at the given path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AnalyticsError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;\
             PRAGMA synchronous=NORMAL;\
             PRAGMA foreign_keys=ON;\
             PRAGMA busy_timeout=5000;",
        )?;
        Self::create_tables(&conn)?;
        Ok(Self::wrap(conn))
    }

    /// Create an in-memory store. Used by tests and benchmarks.
    pub fn in_memory() -> Result<Self, AnalyticsError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Self::create_tables(&conn)?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            sem: Arc::new(Semaphore::new(1)),
        }
    }

    pub(crate) fn create_tables(conn: &Connection) -> Result<(), AnalyticsError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS samples (\
               id INTEGER PRIMARY KEY,\
               ship TEXT NOT NULL,\
               sample_type TEXT NOT NULL,\
               test_date TEXT NOT NULL,\
               sample_point TEXT,\
               particle_count_4_micron REAL,\
               particle_count_6_micron REAL,\
               particle_count_14_micron REAL\
             );\
             CREATE TABLE IF NOT EXISTS users (\
               id INTEGER PRIMARY KEY,\
               email TEXT NOT NULL UNIQUE,\
               password_hash TEXT NOT NULL\
             );\
             CREATE TABLE IF NOT EXISTS sessions (\
               token TEXT PRIMARY KEY,\
               user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,\
               created_at TEXT NOT NULL\
             );\
             CREATE INDEX IF NOT EXISTS idx_samples_test_date ON samples(test_date);\
             CREATE INDEX IF NOT EXISTS idx_samples_sample_type ON samples(sample_type);\
             CREATE INDEX IF NOT EXISTS idx_samples_ship ON samples(ship);",
        )?;
        Ok(())
    }

    /// Acquire the semaphore, then lock the connection and run `f`.
    ///
    /// A poisoned lock surfaces as a server error rather than a panic.
    fn with_conn<F, R>(&self, f: F) -> Result<R, AnalyticsError>
    where
        F: FnOnce(&Connection) -> Result<R, AnalyticsError>,
    {
        let guard = self.conn.lock().map_err(|_| AnalyticsError::LockPoisoned)?;
        f(&guard)
    }

    /// Run a read-only query against the store on the blocking pool.
    ///
    /// The aggregation functions in [crate::aggregate] are designed to be
    /// passed here.
    pub async fn read<F, R>(&self, f: F) -> Result<R, AnalyticsError>
    where
        F: FnOnce(&Connection) -> Result<R, AnalyticsError> + Send + 'static,
        R: Send + 'static,
    {
        let store = self.clone();
        let _permit = self.sem.acquire().await?;
        tokio::task::spawn_blocking(move || store.with_conn(f)).await?
    }

    /// Insert a single sample record, returning its row ID.
    pub async fn insert_sample(&self, record: SampleRecord) -> Result<i64, AnalyticsError> {
        let store = self.clone();
        let _permit = self.sem.acquire().await?;
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                insert_sample_record(conn, &record)?;
                Ok(conn.last_insert_rowid())
            })
        })
        .await?
    }

    /// Insert a batch of sample records in one transaction.
    ///
    /// A fault part way through rolls the whole batch back.
    pub async fn insert_samples(&self, records: Vec<SampleRecord>) -> Result<(), AnalyticsError> {
        let store = self.clone();
        let _permit = self.sem.acquire().await?;
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                let tx = conn.unchecked_transaction()?;
                for record in &records {
                    insert_sample_record(&tx, record)?;
                }
                tx.commit()?;
                Ok(())
            })
        })
        .await?
    }

    /// Create a user account with the given password hash.
    ///
    /// The UNIQUE constraint on email makes duplicate detection atomic; a
    /// concurrent signup for the same email cannot create a second row.
    pub async fn create_user(
        &self,
        email: String,
        password_hash: String,
    ) -> Result<User, AnalyticsError> {
        let store = self.clone();
        let _permit = self.sem.acquire().await?;
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                match conn.execute(
                    "INSERT INTO users (email, password_hash) VALUES (?1, ?2)",
                    params![email, password_hash],
                ) {
                    Ok(_) => Ok(User {
                        id: conn.last_insert_rowid(),
                        email,
                        password_hash,
                    }),
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                    {
                        Err(AnalyticsError::EmailExists)
                    }
                    Err(e) => Err(e.into()),
                }
            })
        })
        .await?
    }

    /// Look up a user account by email.
    pub async fn user_by_email(&self, email: String) -> Result<Option<User>, AnalyticsError> {
        let store = self.clone();
        let _permit = self.sem.acquire().await?;
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                let result = conn.query_row(
                    "SELECT id, email, password_hash FROM users WHERE email = ?1",
                    params![email],
                    |row| {
                        Ok(User {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            password_hash: row.get(2)?,
                        })
                    },
                );
                match result {
                    Ok(user) => Ok(Some(user)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
        })
        .await?
    }

    /// Persist a session token for a user.
    pub async fn create_session(&self, user_id: i64, token: String) -> Result<(), AnalyticsError> {
        let store = self.clone();
        let _permit = self.sem.acquire().await?;
        tokio::task::spawn_blocking(move || {
            store.with_conn(|conn| {
                let created_at = time::OffsetDateTime::now_utc()
                    .format(&time::format_description::well_known::Rfc3339)?;
                conn.execute(
                    "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                    params![token, user_id, created_at],
                )?;
                Ok(())
            })
        })
        .await?
    }
}

pub(crate) fn insert_sample_record(
    conn: &Connection,
    record: &SampleRecord,
) -> Result<(), AnalyticsError> {
    let test_date = record.test_date.format(DATE_FORMAT)?;
    conn.execute(
        "INSERT INTO samples (ship, sample_type, test_date, sample_point, \
         particle_count_4_micron, particle_count_6_micron, particle_count_14_micron) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.ship,
            record.sample_type,
            test_date,
            record.sample_point,
            record.particle_count_4_micron,
            record.particle_count_6_micron,
            record.particle_count_14_micron,
        ],
    )?;
    Ok(())
}
