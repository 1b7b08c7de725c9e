//! The persistent symbol index.
//!
//! A single SQLite database holds every indexed file and its identifier
//! occurrences. Files are keyed by content digest so unchanged files are
//! skipped on re-runs; a changed file has its entries pruned and rewritten
//! inside one transaction.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::output::Entry;

const INDEX_VERSION: i64 = 1;

/// A row returned by identifier lookup.
#[derive(Debug, Clone, Serialize)]
pub struct LookupRow {
    pub filename: String,
    pub line: u32,
    pub column_start: u32,
    pub column_end: u32,
    pub scope: String,
    pub kind: String,
    pub role: String,
    pub identifier: String,
}

pub struct SymbolIndex {
    conn: Connection,
}

/// Hex SHA-256 of a file's bytes.
pub fn digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

impl SymbolIndex {
    /// Create or open the index database, verifying the format version.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create directory for index: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open index at {}", path.display()))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )
        .context("failed to configure index pragmas")?;

        let version: Option<i64> = conn
            .query_row("SELECT Version FROM Version", [], |row| row.get(0))
            .optional()
            .unwrap_or(None);

        match version {
            Some(v) if v == INDEX_VERSION => {}
            Some(v) => bail!("wrong index format version {v}, delete the index to continue"),
            None => {
                conn.execute_batch(&format!(
                    "
                    CREATE TABLE IF NOT EXISTS Version(Version INTEGER);
                    INSERT INTO Version VALUES({INDEX_VERSION});
                    CREATE TABLE IF NOT EXISTS Files(
                        Digest TEXT,
                        Filename TEXT UNIQUE
                    );
                    CREATE TABLE IF NOT EXISTS Entries(
                        Filerow INTEGER,
                        Line INTEGER,
                        ColumnStart INTEGER,
                        ColumnEnd INTEGER,
                        Context TEXT,
                        Type TEXT,
                        SubType TEXT,
                        Identifier TEXT
                    );
                    CREATE INDEX IF NOT EXISTS idx_entries_ident
                        ON Entries(Identifier);
                    CREATE INDEX IF NOT EXISTS idx_entries_filerow
                        ON Entries(Filerow);
                    ",
                ))
                .context("failed to create index schema")?;
            }
        }

        Ok(SymbolIndex { conn })
    }

    /// Decide whether a file needs analysis. Returns the file's row id, or
    /// `None` when the stored digest matches and the file can be skipped.
    pub fn prepare_for_file(&mut self, filename: &str, digest: &str) -> Result<Option<i64>> {
        let existing: Option<(i64, String)> = self
            .conn
            .query_row(
                "SELECT rowid, Digest FROM Files WHERE Filename = ?1",
                params![filename],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("file lookup failed")?;

        match existing {
            Some((_, stored)) if stored == digest => {
                log::info!("{filename}: unchanged, skipping");
                Ok(None)
            }
            Some((rowid, _)) => {
                log::info!("{filename}: digest changed, re-indexing");
                self.conn.execute(
                    "UPDATE Files SET Digest = ?1 WHERE Filename = ?2",
                    params![digest, filename],
                )?;
                self.conn.execute(
                    "DELETE FROM Entries WHERE Filerow = ?1",
                    params![rowid],
                )?;
                Ok(Some(rowid))
            }
            None => {
                self.conn.execute(
                    "INSERT INTO Files VALUES(?1, ?2)",
                    params![digest, filename],
                )?;
                Ok(Some(self.conn.last_insert_rowid()))
            }
        }
    }

    /// Write one file's entries inside a single transaction.
    pub fn store_entries(&mut self, filerow: i64, entries: &[Entry]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO Entries VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for e in entries {
                insert.execute(params![
                    filerow,
                    e.line,
                    e.col,
                    e.col_end,
                    e.scope,
                    e.kind.as_str(),
                    e.role.as_str(),
                    e.identifier,
                ])?;
            }
        }
        tx.commit().context("failed to commit file entries")?;
        Ok(())
    }

    /// Drop files (and their entries) that no longer exist on disk.
    pub fn prune_missing(&mut self) -> Result<usize> {
        let gone: Vec<(i64, String)> = {
            let mut stmt = self.conn.prepare("SELECT rowid, Filename FROM Files")?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.filter_map(|r| r.ok())
                .filter(|(_, name)| !Path::new(name).exists())
                .collect()
        };

        let tx = self.conn.transaction()?;
        for (rowid, name) in &gone {
            log::info!("pruning vanished file {name}");
            tx.execute("DELETE FROM Entries WHERE Filerow = ?1", params![rowid])?;
            tx.execute("DELETE FROM Files WHERE rowid = ?1", params![rowid])?;
        }
        tx.commit()?;
        Ok(gone.len())
    }

    /// Look up identifier occurrences. `pattern` supports `*` and `?`
    /// wildcards; `roles` filters by occurrence role name.
    pub fn lookup(&self, pattern: &str, roles: &[&str]) -> Result<Vec<LookupRow>> {
        let like = pattern.replace('%', "\\%").replace('_', "\\_")
            .replace('*', "%")
            .replace('?', "_");
        let role_list = roles
            .iter()
            .map(|r| format!("'{r}'"))
            .collect::<Vec<_>>()
            .join(",");

        let sql = format!(
            "SELECT f.Filename, e.Line, e.ColumnStart, e.ColumnEnd,
                    e.Context, e.Type, e.SubType, e.Identifier
             FROM Entries e JOIN Files f ON f.rowid = e.Filerow
             WHERE e.Identifier LIKE ?1 ESCAPE '\\'
               AND e.SubType IN ({role_list})
             ORDER BY f.Filename, e.Line, e.ColumnStart"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![like], |row| {
            Ok(LookupRow {
                filename: row.get(0)?,
                line: row.get(1)?,
                column_start: row.get(2)?,
                column_end: row.get(3)?,
                scope: row.get(4)?,
                kind: row.get(5)?,
                role: row.get(6)?,
                identifier: row.get(7)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{IdKind, IdRole};

    fn entry(line: u32, ident: &str) -> Entry {
        Entry {
            line,
            col: 1,
            col_end: 1 + ident.len() as u32,
            scope: "<global>".into(),
            kind: IdKind::Function,
            role: IdRole::Definition,
            identifier: ident.into(),
        }
    }

    #[test]
    fn digest_gating() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SymbolIndex::open(&dir.path().join("idx.db")).unwrap();

        let row = index.prepare_for_file("a.c", "d1").unwrap();
        assert!(row.is_some());
        index.store_entries(row.unwrap(), &[entry(1, "foo")]).unwrap();

        // same digest: skip
        assert!(index.prepare_for_file("a.c", "d1").unwrap().is_none());

        // new digest: prune and reuse the row
        let row2 = index.prepare_for_file("a.c", "d2").unwrap();
        assert!(row2.is_some());
        index.store_entries(row2.unwrap(), &[entry(2, "bar")]).unwrap();

        let rows = index.lookup("*", &["DEF"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identifier, "bar");
        assert_eq!(rows[0].line, 2);
    }

    #[test]
    fn wildcard_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = SymbolIndex::open(&dir.path().join("idx.db")).unwrap();
        let row = index.prepare_for_file("b.c", "x").unwrap().unwrap();
        index
            .store_entries(row, &[entry(1, "alpha"), entry(2, "beta"), entry(3, "gamma")])
            .unwrap();

        let rows = index.lookup("?et?", &["DEF"]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].identifier, "beta");

        let rows = index.lookup("*a", &["DEF"]).unwrap();
        assert_eq!(rows.len(), 3);

        let rows = index.lookup("alpha", &["REF"]).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn version_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE Version(Version INTEGER); INSERT INTO Version VALUES(99);",
            )
            .unwrap();
        }
        assert!(SymbolIndex::open(&path).is_err());
    }
}
