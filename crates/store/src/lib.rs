//! SQLite-backed file index and per-family metadata tables.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use casefile_extract_types::{Family, TypeRecord};

// ── Schema ────────────────────────────────────────────────────────────────────

/// Open (creating if needed) the index at `db_path` and ensure the schema.
pub fn open(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;
    init(&conn)?;
    info!("opened index {}", db_path.display());
    Ok(conn)
}

/// In-memory index, for tests and dry runs.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("opening in-memory index")?;
    init(&conn)?;
    Ok(conn)
}

fn init(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let _mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(include_str!("schema.sql"))
        .context("initialising schema")?;
    Ok(())
}

// ── File rows ─────────────────────────────────────────────────────────────────

/// The part of a `file` row the extraction engine reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    pub id: i64,
    pub path: String,
    pub decl_extension: Option<String>,
    pub true_extension: Option<String>,
}

impl FileRow {
    /// Lowercased final path component, used for literal-name routing.
    pub fn file_name_lower(&self) -> String {
        Path::new(&self.path)
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }
}

/// Row written by the directory-walk stage.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub path: String,
    pub folder_id: Option<i64>,
    pub size_bytes: Option<i64>,
    pub mtime: Option<i64>,
    pub decl_extension: Option<String>,
    pub hash_sha256: Option<String>,
}

impl NewFile {
    /// A row for `path` with its declared extension taken from the name.
    pub fn from_path(path: &str) -> Self {
        let decl = Path::new(path)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()));
        Self { path: path.to_string(), decl_extension: decl, ..Default::default() }
    }
}

/// Which `file` rows to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFilter {
    All,
    /// `true_extension IS NULL`: not sniffed yet.
    Unresolved,
    /// Rows with `id % count == index`, for running several workers over
    /// disjoint slices of the same index.
    Shard { count: u32, index: u32 },
}

/// Insert or refresh a file row; returns its id.  Sniffing and extraction
/// results already stored for the path are kept.
pub fn upsert_file(conn: &Connection, file: &NewFile) -> Result<i64> {
    conn.execute(
        "INSERT INTO file (path, folder_id, size_bytes, mtime, decl_extension, hash_sha256)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(path) DO UPDATE SET
           folder_id      = excluded.folder_id,
           size_bytes     = excluded.size_bytes,
           mtime          = excluded.mtime,
           decl_extension = excluded.decl_extension,
           hash_sha256    = excluded.hash_sha256",
        params![file.path, file.folder_id, file.size_bytes, file.mtime, file.decl_extension, file.hash_sha256],
    )
    .with_context(|| format!("upserting {}", file.path))?;

    let id = conn.query_row("SELECT id FROM file WHERE path = ?1", params![file.path], |row| row.get(0))?;
    Ok(id)
}

/// Rows matching `filter`, in ascending id order.
pub fn list_files(conn: &Connection, filter: FileFilter) -> Result<Vec<FileRow>> {
    const COLS: &str = "SELECT id, path, decl_extension, true_extension FROM file";
    let (sql, args): (String, Vec<i64>) = match filter {
        FileFilter::All => (format!("{COLS} ORDER BY id"), vec![]),
        FileFilter::Unresolved => (format!("{COLS} WHERE true_extension IS NULL ORDER BY id"), vec![]),
        FileFilter::Shard { count, index } => (
            format!("{COLS} WHERE (id % ?1) = ?2 ORDER BY id"),
            vec![i64::from(count.max(1)), i64::from(index)],
        ),
    };
    let mut stmt = conn.prepare(&sql).context("preparing file listing")?;
    let rows = stmt
        .query_map(params_from_iter(args), row_to_file)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("listing files")?;
    Ok(rows)
}

pub fn get_file(conn: &Connection, id: i64) -> Result<Option<FileRow>> {
    let row = conn
        .query_row(
            "SELECT id, path, decl_extension, true_extension FROM file WHERE id = ?1",
            params![id],
            row_to_file,
        )
        .optional()?;
    Ok(row)
}

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRow> {
    Ok(FileRow {
        id: row.get(0)?,
        path: row.get(1)?,
        decl_extension: row.get(2)?,
        true_extension: row.get(3)?,
    })
}

/// Persist a sniffing result.  `None` leaves the row unresolved.
pub fn set_true_extension(conn: &Connection, id: i64, ext: Option<&str>) -> Result<()> {
    conn.execute("UPDATE file SET true_extension = ?1 WHERE id = ?2", params![ext, id])
        .with_context(|| format!("updating true_extension for file {id}"))?;
    Ok(())
}

// ── Family records ────────────────────────────────────────────────────────────

/// Replace the family record for `file_id` and stamp the base row, in one
/// transaction.
///
/// The base row gets the record's family and `updated_at`; its MIME type is
/// only overwritten when the record carries one.
pub fn write_record(conn: &Connection, file_id: i64, record: &TypeRecord) -> Result<()> {
    let family = record.family();
    let columns = record.columns().context("serializing record")?;

    let names: Vec<&str> = columns.iter().map(|(k, _)| k.as_str()).collect();
    let placeholders: Vec<String> = (0..columns.len()).map(|i| format!("?{}", i + 2)).collect();
    let sql = format!(
        "INSERT OR REPLACE INTO {} (file_id, {}) VALUES (?1, {})",
        family.table(),
        names.join(", "),
        placeholders.join(", "),
    );

    let mut values = Vec::with_capacity(columns.len() + 1);
    values.push(SqlValue::Integer(file_id));
    values.extend(columns.into_iter().map(|(_, v)| to_sql_value(v)));

    let tx = conn.unchecked_transaction()?;
    tx.execute(&sql, params_from_iter(values))
        .with_context(|| format!("writing {} record for file {file_id}", family))?;
    tx.execute(
        "UPDATE file
         SET mime_detected = COALESCE(?1, mime_detected),
             ext_family    = ?2,
             updated_at    = datetime('now')
         WHERE id = ?3",
        params![record.mime, family.as_str(), file_id],
    )?;
    tx.commit()?;
    debug!("committed {family} record for file {file_id}");
    Ok(())
}

fn to_sql_value(v: Value) -> SqlValue {
    match v {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(i) = n.as_u64().and_then(|u| i64::try_from(u).ok()) {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => SqlValue::Text(s),
        other => SqlValue::Text(other.to_string()),
    }
}

/// The stored family row for `file_id` as column → JSON value, or `None`.
pub fn read_record(conn: &Connection, family: Family, file_id: i64) -> Result<Option<serde_json::Map<String, Value>>> {
    let sql = format!("SELECT * FROM {} WHERE file_id = ?1", family.table());
    let mut stmt = conn.prepare(&sql)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let row = stmt
        .query_row(params![file_id], |row| {
            let mut map = serde_json::Map::new();
            for (i, name) in names.iter().enumerate() {
                let v = match row.get::<_, SqlValue>(i)? {
                    SqlValue::Null => Value::Null,
                    SqlValue::Integer(n) => Value::from(n),
                    SqlValue::Real(f) => Value::from(f),
                    SqlValue::Text(s) => Value::from(s),
                    SqlValue::Blob(b) => Value::from(b),
                };
                map.insert(name.clone(), v);
            }
            Ok(map)
        })
        .optional()?;
    Ok(row)
}

pub fn count_records(conn: &Connection, family: Family) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {}", family.table());
    let n: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
    Ok(n as u64)
}

/// `(mime_detected, ext_family)` of a file row.
pub fn file_classification(conn: &Connection, id: i64) -> Result<Option<(Option<String>, Option<String>)>> {
    let row = conn
        .query_row(
            "SELECT mime_detected, ext_family FROM file WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    Ok(row)
}
