//! Kitten storage trait and SQLite implementation

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, params};

use super::error::StoreError;
use super::migrations;
use crate::attribution::Attributor;
use crate::types::{Contributor, Revision};

/// Outcome of re-deriving every attribution link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    pub revisions_scanned: usize,
    /// Links that did not exist before the rebuild
    pub links_added: usize,
    pub links_total: usize,
}

/// Storage for revisions, the contributor roster and attribution links
///
/// Every operation is idempotent and runs in its own transaction.
pub trait KittenStore: Send + Sync {
    /// Insert a roster entry or update its display name
    fn upsert_contributor(&self, email: &str, name: &str) -> Result<(), StoreError>;

    /// Insert a revision unless its id is already stored; returns whether it was new
    fn upsert_revision(&self, revision: &Revision) -> Result<bool, StoreError>;

    /// Store a revision and its attribution links in one transaction
    ///
    /// The revision row is written before its links. Returns whether the
    /// revision was new.
    fn record_revision(&self, revision: &Revision, attributed: &[String])
    -> Result<bool, StoreError>;

    /// Link a contributor to a stored revision; returns whether the link was new
    fn upsert_attribution(&self, email: &str, revision_id: i64) -> Result<bool, StoreError>;

    /// Every contributor with their attributed revisions, including those with none
    fn list_contributors_with_revisions(&self) -> Result<Vec<Contributor>, StoreError>;

    /// Stored revisions, newest first, at most `limit` when given
    fn list_revisions(&self, limit: Option<usize>) -> Result<Vec<Revision>, StoreError>;

    fn latest_revision_id(&self) -> Result<Option<i64>, StoreError>;

    fn revision_count(&self) -> Result<usize, StoreError>;

    /// All `(email, revision_id)` links ordered by revision then email
    fn attribution_links(&self) -> Result<Vec<(String, i64)>, StoreError>;

    /// Re-scan every stored revision against the current roster
    fn rebuild_attributions(&self, attributor: &Attributor) -> Result<RebuildReport, StoreError>;
}

/// SQLite-backed kitten store
pub struct SqliteKittenStore {
    conn: Mutex<Connection>,
}

impl SqliteKittenStore {
    /// Open or create database at path, creating the parent directory if needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.display().to_string(),
                source,
            })?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    /// Open in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(mut conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::upgrade(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn row_to_revision(row: &rusqlite::Row) -> Result<Revision, rusqlite::Error> {
        Ok(Revision {
            id: row.get(0)?,
            comment: row.get(1)?,
            date: row.get(2)?,
            author: row.get(3)?,
            paths: Vec::new(),
        })
    }
}

/// Revisions newest first; a negative limit means all of them
fn load_revisions(conn: &Connection, limit: i64) -> Result<Vec<Revision>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT id, comment, date, author FROM revision ORDER BY id DESC LIMIT ?1",
    )?;
    let rows = stmt.query_map([limit], SqliteKittenStore::row_to_revision)?;
    let mut revisions = Vec::new();
    for row in rows {
        revisions.push(row?);
    }
    Ok(revisions)
}

/// Fill in changed paths for revisions loaded by [`load_revisions`]
fn attach_paths(conn: &Connection, revisions: &mut [Revision]) -> Result<(), StoreError> {
    let (Some(low), Some(high)) = (
        revisions.iter().map(|r| r.id).min(),
        revisions.iter().map(|r| r.id).max(),
    ) else {
        return Ok(());
    };

    let mut stmt = conn.prepare(
        "SELECT revision_id, path FROM revision_path
         WHERE revision_id BETWEEN ?1 AND ?2
         ORDER BY revision_id, position",
    )?;
    let rows = stmt.query_map([low, high], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut paths: HashMap<i64, Vec<String>> = HashMap::new();
    for row in rows {
        let (id, path) = row?;
        paths.entry(id).or_default().push(path);
    }
    for revision in revisions.iter_mut() {
        if let Some(found) = paths.remove(&revision.id) {
            revision.paths = found;
        }
    }
    Ok(())
}

/// Insert a revision row and its paths unless the id is already stored
fn insert_revision(conn: &Connection, revision: &Revision) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO revision (id, comment, date, author) VALUES (?1, ?2, ?3, ?4)",
        params![
            revision.id,
            revision.comment,
            revision.date,
            revision.author
        ],
    )? == 1;

    if inserted {
        for (position, path) in revision.paths.iter().enumerate() {
            conn.execute(
                "INSERT OR IGNORE INTO revision_path (revision_id, position, path)
                 VALUES (?1, ?2, ?3)",
                params![revision.id, position as i64, path],
            )?;
        }
    }
    Ok(inserted)
}

fn load_emails(conn: &Connection) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare("SELECT email FROM contributor ORDER BY email")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut emails = Vec::new();
    for row in rows {
        emails.push(row?);
    }
    Ok(emails)
}

fn count_links(conn: &Connection) -> Result<usize, StoreError> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM attribution", [], |row| row.get(0))?;
    Ok(count as usize)
}

impl KittenStore for SqliteKittenStore {
    fn upsert_contributor(&self, email: &str, name: &str) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO contributor (email, name) VALUES (?1, ?2)
             ON CONFLICT(email) DO UPDATE SET name = excluded.name",
            params![email, name],
        )?;
        Ok(())
    }

    fn upsert_revision(&self, revision: &Revision) -> Result<bool, StoreError> {
        self.record_revision(revision, &[])
    }

    fn record_revision(
        &self,
        revision: &Revision,
        attributed: &[String],
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let inserted = insert_revision(&tx, revision)?;
        for email in attributed {
            tx.execute(
                "INSERT OR IGNORE INTO attribution (email, revision_id) VALUES (?1, ?2)",
                params![email, revision.id],
            )?;
        }
        tx.commit()?;
        Ok(inserted)
    }

    fn upsert_attribution(&self, email: &str, revision_id: i64) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO attribution (email, revision_id) VALUES (?1, ?2)",
            params![email, revision_id],
        )?;
        Ok(changed == 1)
    }

    fn list_contributors_with_revisions(&self) -> Result<Vec<Contributor>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.email, c.name, a.revision_id
             FROM contributor c LEFT OUTER JOIN attribution a ON c.email = a.email
             ORDER BY c.email, a.revision_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<i64>>(2)?,
            ))
        })?;

        let mut contributors: Vec<Contributor> = Vec::new();
        for row in rows {
            let (email, name, revision) = row?;
            let starts_new = contributors.last().is_none_or(|last| last.email != email);
            if starts_new {
                contributors.push(Contributor::new(email, name));
            }
            if let (Some(id), Some(current)) = (revision, contributors.last_mut()) {
                current.revisions.push(id);
            }
        }
        Ok(contributors)
    }

    fn list_revisions(&self, limit: Option<usize>) -> Result<Vec<Revision>, StoreError> {
        let conn = self.conn()?;
        let limit = limit.map_or(-1, |n| i64::try_from(n).unwrap_or(i64::MAX));
        let mut revisions = load_revisions(&conn, limit)?;
        attach_paths(&conn, &mut revisions)?;
        Ok(revisions)
    }

    fn latest_revision_id(&self) -> Result<Option<i64>, StoreError> {
        let conn = self.conn()?;
        let latest: Option<i64> =
            conn.query_row("SELECT MAX(id) FROM revision", [], |row| row.get(0))?;
        Ok(latest)
    }

    fn revision_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM revision", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn attribution_links(&self) -> Result<Vec<(String, i64)>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT email, revision_id FROM attribution ORDER BY revision_id, email",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        let mut links = Vec::new();
        for row in rows {
            links.push(row?);
        }
        Ok(links)
    }

    fn rebuild_attributions(&self, attributor: &Attributor) -> Result<RebuildReport, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let emails = load_emails(&tx)?;
        let revisions = load_revisions(&tx, -1)?;

        let mut links_added = 0;
        {
            let mut insert = tx.prepare(
                "INSERT OR IGNORE INTO attribution (email, revision_id) VALUES (?1, ?2)",
            )?;
            for revision in &revisions {
                for email in attributor.attribute(revision, emails.iter().map(String::as_str)) {
                    links_added += insert.execute(params![email, revision.id])?;
                }
            }
        }

        let links_total = count_links(&tx)?;
        tx.commit()?;

        Ok(RebuildReport {
            revisions_scanned: revisions.len(),
            links_added,
            links_total,
        })
    }
}
