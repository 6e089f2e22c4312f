//! Database files: SQLite in depth, other engines by signature only.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use tracing::debug;

use casefile_extract_types::records::DatabaseMeta;
use casefile_extract_types::{Excerpts, ExtractOutcome, ExtractorConfig, FamilyMeta, TypeRecord};

const SQLITE_MAGIC: &[u8; 16] = b"SQLite format 3\0";
/// Tables whose rows are counted; the rest are left out of the estimate.
const COUNTED_TABLES: usize = 5;

#[derive(Debug, Default)]
struct Schema {
    tables: Vec<String>,
    views: u32,
    indexes: u32,
    triggers: u32,
    has_foreign_keys: bool,
    /// `CREATE` statements of tables and views, in catalogue order.
    statements: Vec<String>,
}

pub(crate) fn extract(path: &Path, header: &[u8], cfg: &ExtractorConfig) -> ExtractOutcome {
    if header.len() >= 100 && header.starts_with(SQLITE_MAGIC) {
        return extract_sqlite(path, header, cfg);
    }

    let window = &header[..header.len().min(2048)];
    let other = if contains(window, b"Standard Jet DB") {
        Some(("MS Access (Jet)", "application/x-msaccess"))
    } else if contains(window, b"Standard ACE DB") {
        Some(("MS Access (ACE)", "application/x-msaccess"))
    } else if contains(window, b"H2 0.5/B") {
        Some(("H2 Database", "application/octet-stream"))
    } else {
        None
    };
    match other {
        Some((engine, mime)) => {
            let meta = DatabaseMeta {
                engine: Some(engine.to_string()),
                ..Default::default()
            };
            let text = format!("DATABASE TYPE: {engine}\nSchema not readable for this engine.");
            let record = TypeRecord::new(FamilyMeta::Database(meta))
                .with_mime(mime)
                .with_excerpts(Excerpts::from_text(&text));
            ExtractOutcome::PartialSuccess(record, format!("{engine}: schema extraction not supported"))
        }
        None => ExtractOutcome::PartialSuccess(
            TypeRecord::new(FamilyMeta::Database(DatabaseMeta::default())).with_mime("application/octet-stream"),
            "unrecognised database format".to_string(),
        ),
    }
}

fn extract_sqlite(path: &Path, header: &[u8], cfg: &ExtractorConfig) -> ExtractOutcome {
    let mut meta = DatabaseMeta {
        engine: Some("SQLite".to_string()),
        schema_version: writer_version(header),
        is_encrypted: Some(false),
        ..Default::default()
    };

    if !cfg.capabilities.sqlite_inspection {
        let record = TypeRecord::new(FamilyMeta::Database(meta)).with_mime("application/vnd.sqlite3");
        return ExtractOutcome::PartialSuccess(record, "SQLite inspection disabled; header only".to_string());
    }

    let (schema, counts) = match inspect(path) {
        Ok(found) => found,
        Err(e) => {
            debug!("sqlite inspection failed for {}: {e:#}", path.display());
            let text = format!("-- Error reading SQLite DB: {e:#}");
            let record = TypeRecord::new(FamilyMeta::Database(meta))
                .with_mime("application/vnd.sqlite3")
                .with_excerpts(Excerpts::from_text(&text));
            return ExtractOutcome::PartialSuccess(record, format!("{e:#}"));
        }
    };

    meta.table_count = Some(schema.tables.len() as u32);
    meta.view_count = Some(schema.views);
    meta.index_count = Some(schema.indexes);
    meta.trigger_count = Some(schema.triggers);
    meta.has_foreign_keys = Some(schema.has_foreign_keys);
    meta.row_count_estimate = Some(counts.iter().map(|(_, n)| n).sum());
    if let Some((name, rows)) = counts.iter().max_by_key(|(_, n)| *n) {
        meta.largest_table_name = Some(name.clone());
        meta.largest_table_row_count = Some(*rows);
    }

    let mut dump = format!(
        "-- DATABASE SCHEMA DUMP --\n-- Tables: {}, Views: {}\n\n",
        schema.tables.len(),
        schema.views
    );
    dump.push_str(&schema.statements.join("\n\n"));
    let record = TypeRecord::new(FamilyMeta::Database(meta))
        .with_mime("application/vnd.sqlite3")
        .with_excerpts(Excerpts::from_text(&dump));
    ExtractOutcome::Success(record)
}

/// Catalogue plus `(table, rows)` for the first few tables.
fn inspect(path: &Path) -> Result<(Schema, Vec<(String, u64)>)> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX)
        .with_context(|| format!("opening {} read-only", path.display()))?;

    let mut schema = Schema::default();
    let mut stmt = conn
        .prepare("SELECT type, name, sql FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY rowid")
        .context("reading sqlite_master")?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, Option<String>>(2)?,
        ))
    })?;
    for row in rows {
        let (kind, name, sql) = row?;
        match kind.as_str() {
            "table" => {
                if let Some(sql) = &sql {
                    schema.has_foreign_keys |= sql.to_ascii_uppercase().contains("REFERENCES");
                    schema.statements.push(format!("{sql};"));
                }
                schema.tables.push(name);
            }
            "view" => {
                schema.views += 1;
                if let Some(sql) = &sql {
                    schema.statements.push(format!("{sql};"));
                }
            }
            "index" => schema.indexes += 1,
            "trigger" => schema.triggers += 1,
            _ => {}
        }
    }

    let mut counts = Vec::new();
    for table in schema.tables.iter().take(COUNTED_TABLES) {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", table.replace('"', "\"\""));
        match conn.query_row(&sql, [], |row| row.get::<_, i64>(0)) {
            Ok(n) => counts.push((table.clone(), n.max(0) as u64)),
            Err(e) => debug!("counting rows of {table}: {e}"),
        }
    }
    Ok((schema, counts))
}

/// Library version of the last writer, header offset 96 (e.g. 3045001).
fn writer_version(header: &[u8]) -> Option<String> {
    let raw = u32::from_be_bytes(header.get(96..100)?.try_into().ok()?);
    (raw > 0).then(|| format!("{}.{}.{}", raw / 1_000_000, raw / 1000 % 1000, raw % 1000))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use casefile_extract_types::Capabilities;

    fn sample_db(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("case.sqlite");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT);
             CREATE TABLE note (id INTEGER PRIMARY KEY, person_id INTEGER REFERENCES person(id), body TEXT);
             CREATE INDEX note_person ON note(person_id);
             CREATE VIEW named AS SELECT name FROM person;
             CREATE TRIGGER touch AFTER INSERT ON note BEGIN SELECT 1; END;
             INSERT INTO person (name) VALUES ('a'), ('b');
             INSERT INTO note (person_id, body) VALUES (1, 'x'), (1, 'y'), (2, 'z');",
        )
        .unwrap();
        path
    }

    fn meta_of(out: &ExtractOutcome) -> DatabaseMeta {
        match &out.record().expect("record").meta {
            FamilyMeta::Database(m) => m.clone(),
            other => panic!("wrong family: {other:?}"),
        }
    }

    #[test]
    fn test_sqlite_inspection() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = sample_db(dir.path());
        let header = std::fs::read(&path).unwrap();
        let out = extract(&path, &header, &ExtractorConfig::default());
        assert!(matches!(out, ExtractOutcome::Success(_)), "{out:?}");
        let m = meta_of(&out);
        assert_eq!(m.engine.as_deref(), Some("SQLite"));
        assert!(m.schema_version.as_deref().unwrap().starts_with("3."));
        assert_eq!(m.table_count, Some(2));
        assert_eq!(m.view_count, Some(1));
        assert_eq!(m.index_count, Some(1));
        assert_eq!(m.trigger_count, Some(1));
        assert_eq!(m.row_count_estimate, Some(5));
        assert_eq!(m.largest_table_name.as_deref(), Some("note"));
        assert_eq!(m.largest_table_row_count, Some(3));
        assert_eq!(m.has_foreign_keys, Some(true));

        let rec = out.record().unwrap();
        assert_eq!(rec.mime.as_deref(), Some("application/vnd.sqlite3"));
        let dump = rec.excerpts.full.clone().unwrap();
        assert!(dump.starts_with("-- DATABASE SCHEMA DUMP --\n-- Tables: 2, Views: 1\n\nCREATE TABLE person"));
        assert!(dump.contains("CREATE VIEW named"));
    }

    #[test]
    fn test_inspection_disabled() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = sample_db(dir.path());
        let header = std::fs::read(&path).unwrap();
        let cfg = ExtractorConfig {
            capabilities: Capabilities::none(),
            ..ExtractorConfig::default()
        };
        let out = extract(&path, &header, &cfg);
        assert!(matches!(out, ExtractOutcome::PartialSuccess(_, _)));
        assert_eq!(meta_of(&out).table_count, None);
    }

    #[test]
    fn test_access_signature() {
        let mut header = vec![0u8; 64];
        header[4..19].copy_from_slice(b"Standard Jet DB");
        let out = extract(Path::new("legacy.mdb"), &header, &ExtractorConfig::default());
        match &out {
            ExtractOutcome::PartialSuccess(rec, reason) => {
                assert_eq!(rec.mime.as_deref(), Some("application/x-msaccess"));
                assert!(reason.contains("MS Access (Jet)"));
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }

    #[test]
    fn test_writer_version() {
        let mut header = vec![0u8; 100];
        header[96..100].copy_from_slice(&3_045_001u32.to_be_bytes());
        assert_eq!(writer_version(&header).as_deref(), Some("3.45.1"));
        assert_eq!(writer_version(&[0u8; 50]), None);
    }
}
