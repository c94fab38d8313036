//! Database-backed depot: one row per identity, one column per artifact kind.
//!
//! Rows carry an optional TTL (unix milliseconds) so expiring identities can
//! be listed and swept.
// 中文: 数据库仓库，每个身份一行，每种工件一列，附带可选的过期时间。

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use super::bundle;
use super::record::DepotRecord;
use super::traits::{CertDepot, Depot, TtlDepot};
use crate::config::{DepotOptions, SqliteDepotOptions};
use crate::credentials::Credentials;
use crate::error::{Error, Result, ResultExt};
use crate::options::CertificateOptions;
use crate::tag::{Tag, format_depot_name};

pub struct SqliteDepot {
    conn: Mutex<Connection>,
    table: String,
    options: DepotOptions,
}

impl SqliteDepot {
    /// Opens the database at `options.path`, or an in-memory one.
    pub fn open(options: &SqliteDepotOptions) -> Result<Self> {
        options.validate()?;
        let conn = match &options.path {
            Some(path) => Connection::open(path)
                .with_context(|| format!("opening depot database {}", path.display()))?,
            None => Connection::open_in_memory().context("opening in-memory depot database")?,
        };
        Self::with_connection(conn, options)
    }

    /// Wraps an existing connection, creating the depot table if needed.
    pub fn with_connection(conn: Connection, options: &SqliteDepotOptions) -> Result<Self> {
        options.validate()?;
        let table = options.table.clone();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY NOT NULL,
                cert BLOB,
                key BLOB,
                cert_req BLOB,
                cert_revoc_list BLOB,
                ttl INTEGER
            );
            CREATE INDEX IF NOT EXISTS {table}_ttl ON {table} (ttl);"
        ))
        .with_context(|| format!("creating depot table '{}'", table))?;

        debug!(table = %table, "opened sqlite depot");
        Ok(Self {
            conn: Mutex::new(conn),
            table,
            options: options.depot.clone(),
        })
    }

    pub fn options(&self) -> &DepotOptions {
        &self.options
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| Error::LockPoisoned)
    }

    fn locate(tag: &Tag) -> Result<(String, &'static str)> {
        let id = tag.storage_name();
        if id.is_empty() {
            return Err(Error::Validation("depot name must not be empty".into()));
        }
        Ok((id, tag.kind().field()))
    }

    /// Reads one field: `None` when the row is missing, `Some(None)` when the
    /// row exists but the field is absent or empty.
    fn read_field(&self, id: &str, field: &str) -> Result<Option<Option<Vec<u8>>>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {field} FROM {} WHERE id = ?1", self.table);
        let value = conn
            .query_row(&sql, params![id], |row| Ok(bytes_of(row.get_ref(0)?)))
            .optional()?;
        Ok(value)
    }

    /// Stores `data` under `tag`, replacing whatever is there.
    pub fn upsert(&self, tag: &Tag, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::Validation(format!("data for '{}' is empty", tag)));
        }
        let (id, field) = Self::locate(tag)?;
        let conn = self.conn()?;
        conn.execute(
            &format!(
                "INSERT INTO {t} (id, {field}) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET {field} = excluded.{field}",
                t = self.table
            ),
            params![id, data],
        )?;
        debug!(op = "upsert", id = %id, field, table = %self.table, "stored artifact");
        Ok(())
    }

    /// The whole record of `name`, with every artifact and its TTL.
    pub fn find_record(&self, name: &str) -> Result<DepotRecord> {
        let id = format_depot_name(name);
        let conn = self.conn()?;
        let sql = format!(
            "SELECT id, cert, key, cert_req, cert_revoc_list, ttl FROM {} WHERE id = ?1",
            self.table
        );
        conn.query_row(&sql, params![id], record_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("name '{}' not found", id)))
    }

    /// Removes the whole record of `name`.
    pub fn delete_record(&self, name: &str) -> Result<()> {
        let id = format_depot_name(name);
        let conn = self.conn()?;
        let removed = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", self.table),
            params![id],
        )?;
        if removed == 0 {
            return Err(Error::NotFound(format!("name '{}' not found", id)));
        }
        debug!(op = "delete_record", id = %id, table = %self.table, "deleted record");
        Ok(())
    }
}

/// Null and empty values both read as absent.
fn bytes_of(value: ValueRef<'_>) -> Option<Vec<u8>> {
    let bytes = match value {
        ValueRef::Null => return None,
        ValueRef::Blob(b) | ValueRef::Text(b) => b.to_vec(),
        ValueRef::Integer(i) => i.to_string().into_bytes(),
        ValueRef::Real(f) => f.to_string().into_bytes(),
    };
    (!bytes.is_empty()).then_some(bytes)
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<DepotRecord> {
    Ok(DepotRecord {
        id: row.get(0)?,
        cert: bytes_of(row.get_ref(1)?),
        private_key: bytes_of(row.get_ref(2)?),
        cert_req: bytes_of(row.get_ref(3)?),
        cert_revoc_list: bytes_of(row.get_ref(4)?),
        ttl: row
            .get::<_, Option<i64>>(5)?
            .and_then(DateTime::from_timestamp_millis),
    })
}

impl Depot for SqliteDepot {
    fn put(&self, tag: &Tag, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::Validation(format!("data for '{}' is empty", tag)));
        }
        let (id, field) = Self::locate(tag)?;
        let conn = self.conn()?;
        // 只有在字段为空时才写入；并发的两次写入至多一次成功
        let changed = conn.execute(
            &format!(
                "INSERT INTO {t} (id, {field}) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET {field} = excluded.{field}
                 WHERE {t}.{field} IS NULL OR length({t}.{field}) = 0",
                t = self.table
            ),
            params![id, data],
        )?;
        if changed == 0 {
            return Err(Error::Conflict(format!("'{}' already exists", tag)));
        }
        debug!(op = "put", id = %id, field, table = %self.table, "stored artifact");
        Ok(())
    }

    fn get(&self, tag: &Tag) -> Result<Vec<u8>> {
        let (id, field) = Self::locate(tag)?;
        match self.read_field(&id, field)? {
            None => Err(Error::NotFound(format!("name '{}' not found", id))),
            Some(None) => Err(Error::NotFound(format!(
                "no data available for '{}'",
                tag
            ))),
            Some(Some(data)) => Ok(data),
        }
    }

    fn check_with_error(&self, tag: &Tag) -> Result<bool> {
        let (id, field) = Self::locate(tag)?;
        Ok(matches!(self.read_field(&id, field)?, Some(Some(_))))
    }

    fn delete(&self, tag: &Tag) -> Result<()> {
        let (id, field) = Self::locate(tag)?;
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!("UPDATE {} SET {field} = NULL WHERE id = ?1", self.table),
            params![id],
        )?;
        debug!(op = "delete", id = %id, field, table = %self.table, changed, "cleared artifact");
        Ok(())
    }

    fn ttl(&self) -> Option<&dyn TtlDepot> {
        Some(self)
    }
}

impl TtlDepot for SqliteDepot {
    fn put_ttl(&self, name: &str, expiration: DateTime<Utc>) -> Result<()> {
        let id = format_depot_name(name);
        let conn = self.conn()?;
        let changed = conn.execute(
            &format!("UPDATE {} SET ttl = ?1 WHERE id = ?2", self.table),
            params![expiration.timestamp_millis(), id],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!(
                "update did not change TTL for '{}'",
                id
            )));
        }
        debug!(op = "put_ttl", id = %id, ttl = %expiration, table = %self.table, "recorded expiration");
        Ok(())
    }

    fn find_expires_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<DepotRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, cert, key, cert_req, cert_revoc_list, ttl FROM {}
             WHERE ttl IS NOT NULL AND ttl <= ?1 ORDER BY ttl",
            self.table
        ))?;
        let records = stmt
            .query_map(params![cutoff.timestamp_millis()], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn delete_expires_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            &format!(
                "DELETE FROM {} WHERE ttl IS NOT NULL AND ttl <= ?1",
                self.table
            ),
            params![cutoff.timestamp_millis()],
        )?;
        debug!(op = "delete_expires_before", cutoff = %cutoff, removed, table = %self.table, "swept expired records");
        Ok(removed)
    }
}

impl CertDepot for SqliteDepot {
    fn save(&self, name: &str, creds: &Credentials) -> Result<()> {
        bundle::save(self, name, creds)
    }

    fn find(&self, name: &str) -> Result<Credentials> {
        bundle::find(self, name, &self.options)
    }

    fn generate(&self, name: &str) -> Result<Credentials> {
        bundle::generate_default(self, name, &self.options)
    }

    fn generate_with_options(&self, opts: CertificateOptions) -> Result<Credentials> {
        let name = opts.common_name.clone();
        bundle::generate(self, &name, &self.options, opts)
    }
}
