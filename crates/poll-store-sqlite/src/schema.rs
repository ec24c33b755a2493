//! SQL schema for the survey SQLite store.
//!
//! Only the identity and submission columns are created up front. Every other
//! column is owned by the active [`Shape`](poll_core::schema::Shape) and is
//! added or dropped by structural reconciliation at startup; no version number
//! is stored.

use std::collections::BTreeSet;

use chrono::FixedOffset;
use poll_core::schema::{FieldDefault, FieldSpec, FieldType, MigrationAction, field};
use rusqlite::types::{Type, Value};

use crate::encode::{decode_legacy_dt, encode_dt, quoted};

pub const TABLE: &str = "responses";

/// Table written by the first deployment of the survey: same rating,
/// address and comment columns, a naive local `timestamp`, and no
/// `AUTOINCREMENT`.
pub const LEGACY_TABLE: &str = "response";

/// Name the legacy table is kept under once its rows have been imported.
pub const LEGACY_BACKUP: &str = "response_legacy";

const LEGACY_TIMESTAMP: &str = "timestamp";

/// Base DDL; idempotent thanks to `IF NOT EXISTS`.
///
/// `AUTOINCREMENT` keeps ids from being reused after deletes.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS responses (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    submitted_at  TEXT NOT NULL    -- RFC 3339 UTC; server-assigned
);
";

/// Indexes over shape-independent columns; created once reconciliation has
/// succeeded.
pub const INDEXES: &str = "
CREATE INDEX IF NOT EXISTS responses_submitted_idx ON responses(submitted_at);
";

/// Names of the columns currently present on the responses table.
pub fn existing_columns(
  conn: &rusqlite::Connection,
) -> rusqlite::Result<BTreeSet<String>> {
  Ok(column_types(conn, TABLE)?.into_iter().map(|(name, _)| name).collect())
}

/// `(name, declared type)` for each column of `table`, in table order.
fn column_types(
  conn: &rusqlite::Connection,
  table: &str,
) -> rusqlite::Result<Vec<(String, String)>> {
  let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;
  stmt
    .query_map([table], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect()
}

fn table_exists(conn: &rusqlite::Connection, table: &str) -> rusqlite::Result<bool> {
  conn.query_row(
    "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
    [table],
    |row| row.get(0),
  )
}

/// Move the rows of a [`LEGACY_TABLE`] into the responses table, then rename
/// the legacy table to [`LEGACY_BACKUP`].
///
/// Ids are kept. Every other legacy column is carried over under its own
/// name, leaving reconciliation to fit it to the active shape. Naive
/// timestamps are read as local time at `local_offset`. Returns the number
/// of rows imported, or `None` when there is no legacy table.
///
/// Must run inside a transaction: an unparseable timestamp or an id that
/// already exists aborts the whole import.
pub fn import_legacy(
  conn: &rusqlite::Connection,
  local_offset: FixedOffset,
) -> rusqlite::Result<Option<usize>> {
  if !table_exists(conn, LEGACY_TABLE)? {
    return Ok(None);
  }

  let present = existing_columns(conn)?;
  let carried: Vec<(String, String)> = column_types(conn, LEGACY_TABLE)?
    .into_iter()
    .filter(|(name, _)| name != field::ID && name != LEGACY_TIMESTAMP)
    .collect();
  for (name, ty) in &carried {
    if !present.contains(name) {
      conn.execute_batch(&format!(
        "ALTER TABLE {TABLE} ADD COLUMN {} {ty}",
        quoted(name)
      ))?;
    }
  }

  let mut columns = vec![quoted(field::ID), quoted(LEGACY_TIMESTAMP)];
  columns.extend(carried.iter().map(|(name, _)| quoted(name)));

  let rows: Vec<Vec<Value>> = {
    let mut stmt =
      conn.prepare(&format!("SELECT {} FROM {LEGACY_TABLE}", columns.join(", ")))?;
    stmt
      .query_map([], |row| {
        let stamp: String = row.get(1)?;
        let submitted_at = decode_legacy_dt(&stamp, local_offset).map_err(|e| {
          rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e))
        })?;
        let mut values = vec![row.get::<_, Value>(0)?, Value::Text(encode_dt(submitted_at))];
        for i in 0..carried.len() {
          values.push(row.get(i + 2)?);
        }
        Ok(values)
      })?
      .collect::<rusqlite::Result<_>>()?
  };

  columns[1] = quoted(field::SUBMITTED_AT);
  let placeholders: Vec<String> =
    (1..=columns.len()).map(|i| format!("?{i}")).collect();
  let insert = format!(
    "INSERT INTO {TABLE} ({}) VALUES ({})",
    columns.join(", "),
    placeholders.join(", ")
  );
  for values in &rows {
    conn.execute(&insert, rusqlite::params_from_iter(values))?;
  }

  conn.execute_batch(&format!(
    "ALTER TABLE {LEGACY_TABLE} RENAME TO {LEGACY_BACKUP}"
  ))?;
  Ok(Some(rows.len()))
}

fn sql_type(ty: FieldType) -> &'static str {
  match ty {
    FieldType::Integer => "INTEGER",
    FieldType::Text | FieldType::Timestamp => "TEXT",
  }
}

fn sql_literal(default: &FieldDefault) -> String {
  match default {
    FieldDefault::Integer(n) => n.to_string(),
    FieldDefault::Text(s) => format!("'{}'", s.replace('\'', "''")),
  }
}

fn add_column_sql(spec: &FieldSpec) -> String {
  let mut sql = format!(
    "ALTER TABLE {TABLE} ADD COLUMN {} {}",
    quoted(&spec.name),
    sql_type(spec.ty)
  );
  if spec.required {
    sql.push_str(" NOT NULL");
  }
  if let Some(default) = &spec.default {
    sql.push_str(" DEFAULT ");
    sql.push_str(&sql_literal(default));
  }
  sql
}

/// Apply one migration action unless the table already reflects it.
///
/// Returns `true` if the table was changed. A required column without a
/// default cannot be added to SQLite and fails here.
pub fn apply(
  conn: &rusqlite::Connection,
  action: &MigrationAction,
) -> rusqlite::Result<bool> {
  let present = existing_columns(conn)?.contains(action.field_name());
  match action {
    MigrationAction::AddField(spec) if !present => {
      conn.execute_batch(&add_column_sql(spec))?;
      Ok(true)
    }
    MigrationAction::RemoveField(name) if present => {
      conn.execute_batch(&format!(
        "ALTER TABLE {TABLE} DROP COLUMN {}",
        quoted(name)
      ))?;
      Ok(true)
    }
    _ => Ok(false),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn add_column_statement() {
    let spec = FieldSpec {
      name:     "moderation".into(),
      ty:       FieldType::Text,
      required: true,
      default:  Some(FieldDefault::Text("it's".into())),
    };
    assert_eq!(
      add_column_sql(&spec),
      "ALTER TABLE responses ADD COLUMN \"moderation\" TEXT NOT NULL DEFAULT 'it''s'"
    );
  }

  #[test]
  fn apply_twice_is_a_no_op() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();

    let add = MigrationAction::AddField(FieldSpec {
      name:     "heating".into(),
      ty:       FieldType::Integer,
      required: false,
      default:  None,
    });
    assert!(apply(&conn, &add).unwrap());
    assert!(!apply(&conn, &add).unwrap());

    let remove = MigrationAction::RemoveField("heating".into());
    assert!(apply(&conn, &remove).unwrap());
    assert!(!apply(&conn, &remove).unwrap());

    let columns = existing_columns(&conn).unwrap();
    assert_eq!(
      columns.into_iter().collect::<Vec<_>>(),
      ["id", "submitted_at"]
    );
  }

  const LEGACY_DDL: &str = "
    CREATE TABLE response (
      id INTEGER NOT NULL, address VARCHAR(200),
      cleaning_inside INTEGER, elevator INTEGER, comment TEXT,
      timestamp DATETIME, PRIMARY KEY (id)
    );";

  #[test]
  fn import_without_legacy_table_does_nothing() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    assert_eq!(import_legacy(&conn, FixedOffset::east_opt(0).unwrap()).unwrap(), None);
  }

  #[test]
  fn import_converts_local_timestamps() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(LEGACY_DDL).unwrap();
    conn
      .execute_batch(
        "INSERT INTO response VALUES
           (4, 'Udarnikov 36', 5, 3, 'ok', '2024-03-01 12:05:00.250000');",
      )
      .unwrap();

    let moscow = FixedOffset::east_opt(3 * 3600).unwrap();
    assert_eq!(import_legacy(&conn, moscow).unwrap(), Some(1));

    let (id, at, elevator, comment): (i64, String, i64, String) = conn
      .query_row(
        "SELECT id, submitted_at, elevator, comment FROM responses",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
      )
      .unwrap();
    assert_eq!((id, elevator, comment.as_str()), (4, 3, "ok"));
    assert_eq!(at, "2024-03-01T09:05:00.250000Z");
    assert!(table_exists(&conn, LEGACY_BACKUP).unwrap());
    assert!(!table_exists(&conn, LEGACY_TABLE).unwrap());
  }

  #[test]
  fn import_rejects_unreadable_timestamp() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn.execute_batch(LEGACY_DDL).unwrap();
    conn
      .execute_batch(
        "INSERT INTO response (id, address, timestamp) VALUES (1, 'x', 'yesterday');",
      )
      .unwrap();
    assert!(import_legacy(&conn, FixedOffset::east_opt(0).unwrap()).is_err());
  }

  #[test]
  fn required_column_without_default_fails_on_populated_table() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    conn.execute_batch(SCHEMA).unwrap();
    conn
      .execute(
        "INSERT INTO responses (submitted_at) VALUES ('2024-03-01T09:00:00.000000Z')",
        [],
      )
      .unwrap();

    let add = MigrationAction::AddField(FieldSpec {
      name:     "verified_by".into(),
      ty:       FieldType::Text,
      required: true,
      default:  None,
    });
    assert!(apply(&conn, &add).is_err());
  }
}
