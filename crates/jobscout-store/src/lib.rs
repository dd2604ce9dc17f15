//! SQLite persistence for resumes and their job listings.
//!
//! One connection sits behind a `Mutex`, so the store is `Send + Sync` and
//! can be shared by the scrape workers and the web handlers. Every run-scoped
//! write happens in an immediate transaction that first checks the run id,
//! which keeps the compare-and-swap atomic across processes sharing the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row, Transaction, TransactionBehavior, params};

use jobscout_core::store::{ScrapeStore, StoreError, ensure_current, transition_allowed};
use jobscout_core::{JobListing, JobRecord, Platform, ResumeDocument, ScrapeStatus};

/// Filters for [`SqliteStore::list_jobs`]. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub resume_id: Option<i64>,
    pub platform: Option<Platform>,
    /// Case-insensitive substring of the listing's location.
    pub location: Option<String>,
    /// Case-insensitive substring of the title or company.
    pub search: Option<String>,
    pub active_only: bool,
    pub limit: Option<usize>,
}

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS resumes (
        id          INTEGER PRIMARY KEY,
        file_path   TEXT NOT NULL,
        uploaded_at TEXT NOT NULL,
        keywords    TEXT NOT NULL DEFAULT '',
        status      TEXT NOT NULL DEFAULT 'pending',
        result      TEXT NOT NULL DEFAULT '',
        run_id      TEXT
    );

    CREATE TABLE IF NOT EXISTS job_listings (
        id          INTEGER PRIMARY KEY,
        resume_id   INTEGER NOT NULL REFERENCES resumes(id) ON DELETE CASCADE,
        title       TEXT NOT NULL,
        company     TEXT NOT NULL,
        platform    TEXT NOT NULL,
        link        TEXT NOT NULL,
        location    TEXT NOT NULL,
        description TEXT,
        scraped_at  TEXT NOT NULL,
        is_active   INTEGER NOT NULL DEFAULT 1,
        UNIQUE (resume_id, link)
    );

    CREATE INDEX IF NOT EXISTS idx_jobs_platform_scraped ON job_listings(platform, scraped_at);
    CREATE INDEX IF NOT EXISTS idx_jobs_resume_scraped ON job_listings(resume_id, scraped_at);
";

const RESUME_COLUMNS: &str = "id, file_path, uploaded_at, keywords, status, result, run_id";
const JOB_COLUMNS: &str =
    "id, resume_id, title, company, platform, link, location, description, scraped_at, is_active";

fn db(e: rusqlite::Error) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Substring pattern for `LIKE ... ESCAPE '\'` with the wildcards in
/// `needle` taken literally.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Open a SQLite connection with WAL mode and standard pragmas.
fn open_sqlite(path: &Path) -> Result<Connection, rusqlite::Error> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

/// Timestamps are stored as fixed-width RFC 3339 UTC strings, so text
/// comparison orders them chronologically.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn parse_text<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn resume_from_row(row: &Row<'_>) -> rusqlite::Result<ResumeDocument> {
    let uploaded_at: String = row.get(2)?;
    let status: String = row.get(4)?;
    Ok(ResumeDocument {
        id: row.get(0)?,
        file_path: PathBuf::from(row.get::<_, String>(1)?),
        uploaded_at: parse_timestamp(2, &uploaded_at)?,
        keywords: row.get(3)?,
        status: parse_text(4, &status)?,
        result: row.get(5)?,
        run_id: row.get(6)?,
    })
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobListing> {
    let platform: String = row.get(4)?;
    let scraped_at: String = row.get(8)?;
    Ok(JobListing {
        id: row.get(0)?,
        resume_id: row.get(1)?,
        title: row.get(2)?,
        company: row.get(3)?,
        platform: parse_text(4, &platform)?,
        link: row.get(5)?,
        location: row.get(6)?,
        description: row.get(7)?,
        scraped_at: parse_timestamp(8, &scraped_at)?,
        is_active: row.get(9)?,
    })
}

fn load_resume(conn: &Connection, resume_id: i64) -> Result<ResumeDocument, StoreError> {
    conn.query_row(
        &format!("SELECT {RESUME_COLUMNS} FROM resumes WHERE id = ?1"),
        params![resume_id],
        resume_from_row,
    )
    .optional()
    .map_err(db)?
    .ok_or(StoreError::NotFound(resume_id))
}

/// Load the resume inside `tx` and check that `run_id` still owns it.
fn load_current(
    tx: &Transaction<'_>,
    resume_id: i64,
    run_id: &str,
) -> Result<ResumeDocument, StoreError> {
    let doc = load_resume(tx, resume_id)?;
    ensure_current(&doc, run_id)?;
    Ok(doc)
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("cannot create {}: {e}", parent.display())))?;
        }
        let conn = open_sqlite(path).map_err(db)?;
        Self::init(conn)
    }

    /// A private database that lives as long as the store.
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(db)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;").map_err(db)?;
        conn.execute_batch(SCHEMA).map_err(db)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Database(format!("connection lock poisoned: {e}")))
    }

    /// Register an uploaded resume. It starts pending with no run.
    pub fn create_resume(&self, file_path: &Path) -> Result<ResumeDocument, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO resumes (file_path, uploaded_at) VALUES (?1, ?2)",
            params![file_path.to_string_lossy(), timestamp(Utc::now())],
        )
        .map_err(db)?;
        let id = conn.last_insert_rowid();
        tracing::debug!(resume_id = id, path = %file_path.display(), "resume registered");
        load_resume(&conn, id)
    }

    pub fn get_resume(&self, resume_id: i64) -> Result<ResumeDocument, StoreError> {
        let conn = self.lock()?;
        load_resume(&conn, resume_id)
    }

    /// Every resume, most recently uploaded first.
    pub fn list_resumes(&self) -> Result<Vec<ResumeDocument>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {RESUME_COLUMNS} FROM resumes ORDER BY uploaded_at DESC, id DESC"
            ))
            .map_err(db)?;
        let rows = stmt.query_map([], resume_from_row).map_err(db)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db)
    }

    /// Listings matching `filter`, newest first.
    pub fn list_jobs(&self, filter: &JobFilter) -> Result<Vec<JobListing>, StoreError> {
        let mut sql = format!("SELECT {JOB_COLUMNS} FROM job_listings WHERE 1 = 1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(resume_id) = filter.resume_id {
            args.push(Box::new(resume_id));
            sql.push_str(&format!(" AND resume_id = ?{}", args.len()));
        }
        if let Some(platform) = filter.platform {
            args.push(Box::new(platform.tag()));
            sql.push_str(&format!(" AND platform = ?{}", args.len()));
        }
        if let Some(location) = filter.location.as_deref().filter(|l| !l.is_empty()) {
            args.push(Box::new(like_pattern(location)));
            sql.push_str(&format!(" AND location LIKE ?{} ESCAPE '\\'", args.len()));
        }
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            args.push(Box::new(like_pattern(search)));
            let n = args.len();
            sql.push_str(&format!(
                " AND (title LIKE ?{n} ESCAPE '\\' OR company LIKE ?{n} ESCAPE '\\')"
            ));
        }
        if filter.active_only {
            sql.push_str(" AND is_active = 1");
        }
        sql.push_str(" ORDER BY scraped_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            args.push(Box::new(limit as i64));
            sql.push_str(&format!(" LIMIT ?{}", args.len()));
        }

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).map_err(db)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), job_from_row)
            .map_err(db)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(db)
    }

    fn transition(
        &self,
        resume_id: i64,
        run_id: &str,
        to: ScrapeStatus,
        message: Option<&str>,
    ) -> Result<ResumeDocument, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db)?;
        let mut doc = load_current(&tx, resume_id, run_id)?;
        if !transition_allowed(doc.status, to) {
            return Err(StoreError::InvalidTransition {
                resume_id,
                from: doc.status,
                to,
            });
        }

        match message {
            Some(message) => {
                tx.execute(
                    "UPDATE resumes SET status = ?1, result = ?2 WHERE id = ?3",
                    params![to.as_str(), message, resume_id],
                )
                .map_err(db)?;
                doc.result = message.to_string();
            }
            None => {
                tx.execute(
                    "UPDATE resumes SET status = ?1 WHERE id = ?2",
                    params![to.as_str(), resume_id],
                )
                .map_err(db)?;
            }
        }
        tx.commit().map_err(db)?;

        doc.status = to;
        tracing::debug!(resume_id, run_id, status = %to, "resume status changed");
        Ok(doc)
    }
}

impl ScrapeStore for SqliteStore {
    fn enqueue_run(&self, resume_id: i64, run_id: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        let updated = conn
            .execute(
                "UPDATE resumes SET status = 'pending', run_id = ?1, result = '' WHERE id = ?2",
                params![run_id, resume_id],
            )
            .map_err(db)?;
        if updated == 0 {
            return Err(StoreError::NotFound(resume_id));
        }
        Ok(())
    }

    fn begin_run(&self, resume_id: i64, run_id: &str) -> Result<ResumeDocument, StoreError> {
        self.transition(resume_id, run_id, ScrapeStatus::Processing, None)
    }

    fn record_keywords(
        &self,
        resume_id: i64,
        run_id: &str,
        keywords: &str,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db)?;
        load_current(&tx, resume_id, run_id)?;
        tx.execute(
            "UPDATE resumes SET keywords = ?1 WHERE id = ?2",
            params![keywords, resume_id],
        )
        .map_err(db)?;
        tx.commit().map_err(db)
    }

    fn insert_jobs(
        &self,
        resume_id: i64,
        run_id: &str,
        records: &[JobRecord],
    ) -> Result<usize, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(db)?;
        load_current(&tx, resume_id, run_id)?;

        let now = timestamp(Utc::now());
        let mut created = 0;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO job_listings
                         (resume_id, title, company, platform, link, location, scraped_at, is_active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1)",
                )
                .map_err(db)?;
            for record in records {
                created += stmt
                    .execute(params![
                        resume_id,
                        record.title,
                        record.company,
                        record.platform_tag(),
                        record.link,
                        record.location,
                        now,
                    ])
                    .map_err(db)?;
            }
        }
        tx.commit().map_err(db)?;

        tracing::debug!(
            resume_id,
            run_id,
            offered = records.len(),
            created,
            "listings stored"
        );
        Ok(created)
    }

    fn complete_run(&self, resume_id: i64, run_id: &str, message: &str) -> Result<(), StoreError> {
        self.transition(resume_id, run_id, ScrapeStatus::Completed, Some(message))
            .map(|_| ())
    }

    fn fail_run(&self, resume_id: i64, run_id: &str, message: &str) -> Result<(), StoreError> {
        self.transition(resume_id, run_id, ScrapeStatus::Failed, Some(message))
            .map(|_| ())
    }

    fn deactivate_stale(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE job_listings SET is_active = 0 WHERE is_active = 1 AND scraped_at < ?1",
            params![timestamp(cutoff)],
        )
        .map_err(db)
    }
}
