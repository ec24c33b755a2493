//! [`SqliteStore`] — the SQLite implementation of [`ResponseStore`].

use std::{collections::BTreeSet, path::Path, sync::Arc};

use chrono::{FixedOffset, Offset as _, Utc};
use rusqlite::{OptionalExtension as _, types::Value};

use poll_core::{
  response::{Moderation, ModerationStatus, NewResponse, Response},
  schema::{MigrationAction, Shape, field},
  store::{ResponseFilter, ResponseStore, ResponseUpdate},
};

use crate::{
  Error, Result,
  encode::{RawResponse, encode_dt, encode_status, now, quoted},
  schema::{self, INDEXES, SCHEMA, TABLE},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A survey response store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  shape: Arc<Shape>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and reconcile it to `shape`.
  ///
  /// Fails if any migration step fails; no store is handed out against a
  /// table that does not match `shape`. A legacy `response` table is
  /// imported first, with its naive timestamps read as UTC.
  pub async fn open(path: impl AsRef<Path>, shape: Shape) -> Result<Self> {
    Self::open_with_legacy_offset(path, shape, Utc.fix()).await
  }

  /// Like [`open`](Self::open), reading legacy naive timestamps as local
  /// time at `legacy_offset`.
  pub async fn open_with_legacy_offset(
    path: impl AsRef<Path>,
    shape: Shape,
    legacy_offset: FixedOffset,
  ) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, shape: Arc::new(shape) };
    store.init_schema(legacy_offset).await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory(shape: Shape) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, shape: Arc::new(shape) };
    store.init_schema(Utc.fix()).await?;
    Ok(store)
  }

  async fn init_schema(&self, legacy_offset: FixedOffset) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    self.import_legacy(legacy_offset).await?;
    self.reconcile().await?;
    self
      .conn
      .call(|conn| {
        conn.execute_batch(INDEXES)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Import the rows of a legacy `response` table in one transaction.
  async fn import_legacy(&self, local_offset: FixedOffset) -> Result<()> {
    let imported = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let imported = schema::import_legacy(&tx, local_offset)?;
        tx.commit()?;
        Ok(imported)
      })
      .await
      .map_err(|source| Error::Migration {
        action: format!("import legacy table `{}`", schema::LEGACY_TABLE),
        source,
      })?;

    if let Some(rows) = imported {
      tracing::info!(
        rows,
        backup = schema::LEGACY_BACKUP,
        "imported legacy responses"
      );
    }
    Ok(())
  }

  /// Column names currently present on the responses table.
  pub async fn columns(&self) -> Result<BTreeSet<String>> {
    Ok(
      self
        .conn
        .call(|conn| Ok(schema::existing_columns(conn)?))
        .await?,
    )
  }

  /// Bring the table up to the store's shape and return the actions that
  /// changed it. Running it again on a reconciled table returns nothing.
  ///
  /// Each action runs in its own transaction and re-checks the table first,
  /// so a repeated or interleaved run cannot apply an action twice.
  pub async fn reconcile(&self) -> Result<Vec<MigrationAction>> {
    let existing = self.columns().await?;
    let planned = self.shape.reconcile(&existing);

    let mut applied = Vec::with_capacity(planned.len());
    for action in planned {
      let step = action.clone();
      let changed = self
        .conn
        .call(move |conn| {
          let tx = conn.transaction()?;
          let changed = schema::apply(&tx, &step)?;
          tx.commit()?;
          Ok(changed)
        })
        .await
        .map_err(|source| Error::Migration { action: action.to_string(), source })?;

      if changed {
        tracing::info!(%action, "applied schema migration");
        applied.push(action);
      } else {
        tracing::debug!(%action, "schema migration already applied");
      }
    }
    Ok(applied)
  }

  fn select_sql(&self) -> String {
    let columns: Vec<String> =
      self.shape.fields().iter().map(|f| quoted(&f.name)).collect();
    format!("SELECT {} FROM {TABLE}", columns.join(", "))
  }

  /// SQL condition restricting rows to `filter`.
  fn filter_sql(&self, filter: ResponseFilter) -> String {
    let approved = encode_status(ModerationStatus::Approved);
    match (filter, self.shape.has_moderation()) {
      (ResponseFilter::All, _) | (ResponseFilter::UnmoderatedOnly, false) => {
        "1".to_owned()
      }
      (ResponseFilter::ApprovedOnly, true) => {
        format!("{} = '{approved}'", quoted(field::MODERATION))
      }
      (ResponseFilter::UnmoderatedOnly, true) => {
        format!("{} <> '{approved}'", quoted(field::MODERATION))
      }
      // Without moderation fields nothing is ever approved.
      (ResponseFilter::ApprovedOnly, false) => "0".to_owned(),
    }
  }

  async fn query(&self, sql: String, params: Vec<Value>) -> Result<Vec<Response>> {
    let shape = Arc::clone(&self.shape);

    let raws: Vec<RawResponse> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            RawResponse::from_row(row, &shape)
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawResponse::into_response).collect()
  }
}

// ─── ResponseStore impl ──────────────────────────────────────────────────────

impl ResponseStore for SqliteStore {
  type Error = Error;

  fn shape(&self) -> &Shape { &self.shape }

  async fn insert(&self, candidate: NewResponse) -> Result<Response> {
    candidate.validate(&self.shape)?;

    let submitted_at = now();

    let mut columns = vec![quoted(field::SUBMITTED_AT)];
    let mut values = vec![Value::Text(encode_dt(submitted_at))];
    if self.shape.has_address() {
      columns.push(quoted(field::ADDRESS));
      values.push(candidate.address.clone().map_or(Value::Null, Value::Text));
    }
    for (category, rating) in &candidate.ratings {
      columns.push(quoted(category));
      values.push(Value::Integer(i64::from(rating.get())));
    }
    if self.shape.has_comment() {
      columns.push(quoted(field::COMMENT));
      values.push(candidate.comment.clone().map_or(Value::Null, Value::Text));
    }
    if self.shape.has_moderation() {
      columns.push(quoted(field::MODERATION));
      values.push(Value::Text(encode_status(ModerationStatus::Unmoderated)));
    }

    let placeholders: Vec<String> =
      (1..=values.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
      "INSERT INTO {TABLE} ({}) VALUES ({})",
      columns.join(", "),
      placeholders.join(", ")
    );

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Response {
      id,
      address: candidate.address,
      ratings: candidate.ratings,
      comment: candidate.comment,
      submitted_at,
      moderation: Moderation::Unmoderated,
    })
  }

  async fn get(&self, id: i64) -> Result<Response> {
    let sql = format!("{} WHERE {} = ?1", self.select_sql(), quoted(field::ID));
    let shape = Arc::clone(&self.shape);

    let raw: Option<RawResponse> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id], |row| {
              RawResponse::from_row(row, &shape)
            })
            .optional()?,
        )
      })
      .await?;

    raw.ok_or(Error::NotFound(id))?.into_response()
  }

  async fn list(&self, filter: ResponseFilter) -> Result<Vec<Response>> {
    let sql = format!(
      "{} WHERE {} ORDER BY {} DESC, {} DESC",
      self.select_sql(),
      self.filter_sql(filter),
      quoted(field::SUBMITTED_AT),
      quoted(field::ID),
    );
    self.query(sql, Vec::new()).await
  }

  async fn update(&self, id: i64, update: ResponseUpdate) -> Result<Response> {
    let ResponseUpdate::Moderation(moderation) = update;
    if !self.shape.has_moderation() {
      return Err(Error::Core(poll_core::Error::InvalidAction(
        "moderation is not enabled for this survey".into(),
      )));
    }

    let status = encode_status(moderation.status());
    let at = moderation.moderated_at().map(encode_dt);
    let by = moderation.moderated_by().map(str::to_owned);
    let sql = format!(
      "UPDATE {TABLE} SET {} = ?1, {} = ?2, {} = ?3 WHERE {} = ?4",
      quoted(field::MODERATION),
      quoted(field::MODERATED_AT),
      quoted(field::MODERATED_BY),
      quoted(field::ID),
    );

    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![status, at, by, id])?))
      .await?;
    if changed == 0 {
      return Err(Error::NotFound(id));
    }

    self.get(id).await
  }

  async fn delete(&self, id: i64) -> Result<()> {
    let sql = format!("DELETE FROM {TABLE} WHERE {} = ?1", quoted(field::ID));
    let changed = self
      .conn
      .call(move |conn| Ok(conn.execute(&sql, rusqlite::params![id])?))
      .await?;
    if changed == 0 {
      return Err(Error::NotFound(id));
    }
    Ok(())
  }

  async fn count(&self, filter: ResponseFilter) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM {TABLE} WHERE {}", self.filter_sql(filter));
    let n: i64 = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))
      .await?;
    Ok(n.unsigned_abs())
  }
}
