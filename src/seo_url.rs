use crate::{placeholders, read_uuid, uuid_value, SqlWrapper};
use async_trait::async_trait;
use rusqlite::params;
use rusqlite::types::{Type, Value};
use seo_types::seo_url::{SeoUrl, SeoUrlChanges, SeoUrlRepository};
use seo_types::By;
use std::collections::HashSet;
use time::OffsetDateTime;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, Select};
use typesafe_repository::prelude::*;
use uuid::Uuid;

const COLUMNS: &str = "id, sales_channel_id, route_name, foreign_key, path_info, seo_path_info,
    is_canonical, is_modified, is_valid, is_deleted, created_at, auto_increment";

impl TryFrom<&rusqlite::Row<'_>> for SqlWrapper<SeoUrl> {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row<'_>) -> Result<Self, Self::Error> {
        let created_at: i64 = row.get(10)?;
        Ok(SqlWrapper(SeoUrl {
            id: read_uuid(row, 0)?,
            sales_channel_id: read_uuid(row, 1)?,
            route_name: row.get(2)?,
            foreign_key: read_uuid(row, 3)?,
            path_info: row.get(4)?,
            seo_path_info: row.get(5)?,
            is_canonical: row.get::<_, i64>(6)? != 0,
            is_modified: row.get::<_, i64>(7)? != 0,
            is_valid: row.get::<_, i64>(8)? != 0,
            is_deleted: row.get::<_, i64>(9)? != 0,
            created_at: OffsetDateTime::from_unix_timestamp(created_at).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(10, Type::Integer, Box::new(err))
            })?,
            auto_increment: row.get(11)?,
        }))
    }
}

fn map_row(row: &rusqlite::Row<'_>) -> Result<SeoUrl, rusqlite::Error> {
    SqlWrapper::<SeoUrl>::try_from(row).map(SqlWrapper::into_inner)
}

pub struct SqliteSeoUrlRepository {
    conn: Connection,
    insert_chunk: usize,
}

impl SqliteSeoUrlRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS seo_url (
                    auto_increment INTEGER PRIMARY KEY AUTOINCREMENT,
                    id BLOB NOT NULL UNIQUE,
                    sales_channel_id BLOB NOT NULL,
                    route_name TEXT NOT NULL,
                    foreign_key BLOB NOT NULL,
                    path_info TEXT NOT NULL,
                    seo_path_info TEXT NOT NULL,
                    is_canonical INTEGER NOT NULL DEFAULT 0,
                    is_modified INTEGER NOT NULL DEFAULT 0,
                    is_valid INTEGER NOT NULL DEFAULT 1,
                    is_deleted INTEGER NOT NULL DEFAULT 0,
                    created_at INTEGER NOT NULL,
                    updated_at INTEGER
                )",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS seo_url_path_lookup
                    ON seo_url (sales_channel_id, seo_path_info, is_valid)",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS seo_url_canonical_lookup
                    ON seo_url (sales_channel_id, route_name, foreign_key, is_canonical)",
                [],
            )?;
            conn.execute(
                "CREATE INDEX IF NOT EXISTS seo_url_path_info
                    ON seo_url (sales_channel_id, path_info)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self {
            conn,
            insert_chunk: *crate::config::INSERT_CHUNK,
        })
    }

    pub fn with_insert_chunk(mut self, insert_chunk: usize) -> Self {
        self.insert_chunk = insert_chunk.clamp(1, crate::config::MAX_INSERT_CHUNK);
        self
    }
}

impl Repository<SeoUrl> for SqliteSeoUrlRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Get<SeoUrl> for SqliteSeoUrlRepository {
    async fn get_one(&self, id: &IdentityOf<SeoUrl>) -> Result<Option<SeoUrl>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {COLUMNS} FROM seo_url WHERE id = ?1"))?;
                let url = stmt.query_map([id], map_row)?.next().transpose()?;
                Ok(url)
            })
            .await?)
    }
}

#[async_trait]
impl Select<SeoUrl, By<Uuid>> for SqliteSeoUrlRepository {
    async fn select(&self, By(sales_channel_id): &By<Uuid>) -> Result<Vec<SeoUrl>, Self::Error> {
        let sales_channel_id = *sales_channel_id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM seo_url WHERE sales_channel_id = ?1 ORDER BY auto_increment"
                ))?;
                let urls = stmt
                    .query_map([sales_channel_id], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(urls)
            })
            .await?)
    }
}

#[async_trait]
impl SeoUrlRepository for SqliteSeoUrlRepository {
    async fn find_canonicals(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        foreign_keys: &[Uuid],
    ) -> Result<Vec<SeoUrl>, Self::Error> {
        let mut result = vec![];
        for chunk in foreign_keys.chunks(self.insert_chunk) {
            let route_name = route_name.to_string();
            let chunk = chunk.to_vec();
            let mut urls = self
                .conn
                .call(move |conn| {
                    let sql = format!(
                        "SELECT {COLUMNS} FROM seo_url
                         WHERE sales_channel_id = ? AND route_name = ? AND is_canonical = 1
                         AND foreign_key IN ({})",
                        placeholders(chunk.len())
                    );
                    let mut params: Vec<Value> = Vec::with_capacity(2 + chunk.len());
                    params.push(uuid_value(sales_channel_id));
                    params.push(route_name.into());
                    params.extend(chunk.into_iter().map(uuid_value));
                    let mut stmt = conn.prepare(&sql)?;
                    let urls = stmt
                        .query_map(rusqlite::params_from_iter(params), map_row)?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(urls)
                })
                .await?;
            result.append(&mut urls);
        }
        Ok(result)
    }

    async fn live_foreign_keys(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
    ) -> Result<HashSet<Uuid>, Self::Error> {
        let route_name = route_name.to_string();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT DISTINCT foreign_key FROM seo_url
                     WHERE sales_channel_id = ?1 AND route_name = ?2 AND is_deleted = 0",
                )?;
                let keys = stmt
                    .query_map(params![sales_channel_id, route_name], |row| read_uuid(row, 0))?
                    .collect::<Result<HashSet<_>, _>>()?;
                Ok(keys)
            })
            .await?)
    }

    async fn apply(&self, changes: SeoUrlChanges) -> Result<(), Self::Error> {
        if changes.is_empty() {
            return Ok(());
        }
        let chunk_size = self.insert_chunk;
        let now = OffsetDateTime::now_utc().unix_timestamp().max(0);
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                for chunk in changes.inserts.chunks(chunk_size) {
                    let values = itertools::intersperse(
                        std::iter::repeat("(?, ?, ?, ?, ?, ?, ?, ?, 1, 0, ?)").take(chunk.len()),
                        ", ",
                    )
                    .collect::<String>();
                    let sql = format!(
                        "INSERT INTO seo_url (id, sales_channel_id, route_name, foreign_key, path_info,
                            seo_path_info, is_canonical, is_modified, is_valid, is_deleted, created_at)
                         VALUES {values}"
                    );
                    let mut params: Vec<Value> = Vec::with_capacity(chunk.len() * 9);
                    for url in chunk {
                        params.push(uuid_value(url.id));
                        params.push(uuid_value(url.sales_channel_id));
                        params.push(url.route_name.clone().into());
                        params.push(uuid_value(url.foreign_key));
                        params.push(url.path_info.clone().into());
                        params.push(url.seo_path_info.clone().into());
                        params.push(i64::from(url.is_canonical).into());
                        params.push(i64::from(url.is_modified).into());
                        params.push(now.into());
                    }
                    tx.execute(&sql, rusqlite::params_from_iter(params))?;
                }
                for chunk in changes.obsoleted.chunks(chunk_size) {
                    let sql = format!(
                        "UPDATE seo_url SET is_canonical = 0, updated_at = ? WHERE id IN ({})",
                        placeholders(chunk.len())
                    );
                    let mut params: Vec<Value> = vec![now.into()];
                    params.extend(chunk.iter().copied().map(uuid_value));
                    tx.execute(&sql, rusqlite::params_from_iter(params))?;
                }
                for chunk in changes.restored.chunks(chunk_size) {
                    let sql = format!(
                        "UPDATE seo_url SET is_deleted = 0, updated_at = ? WHERE id IN ({})",
                        placeholders(chunk.len())
                    );
                    let mut params: Vec<Value> = vec![now.into()];
                    params.extend(chunk.iter().copied().map(uuid_value));
                    tx.execute(&sql, rusqlite::params_from_iter(params))?;
                }
                for chunk in changes.deleted_foreign_keys.chunks(chunk_size) {
                    let sql = format!(
                        "UPDATE seo_url SET is_deleted = 1, updated_at = ?
                         WHERE sales_channel_id = ? AND route_name = ? AND is_deleted = 0
                         AND foreign_key IN ({})",
                        placeholders(chunk.len())
                    );
                    let mut params: Vec<Value> = vec![
                        now.into(),
                        uuid_value(changes.sales_channel_id),
                        changes.route_name.clone().into(),
                    ];
                    params.extend(chunk.iter().copied().map(uuid_value));
                    tx.execute(&sql, rusqlite::params_from_iter(params))?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    async fn invalidate_duplicates(&self, sales_channel_id: Uuid) -> Result<usize, Self::Error> {
        let now = OffsetDateTime::now_utc().unix_timestamp().max(0);
        // Earliest insertion wins. Scoped by sales channel only, routes share the path space.
        Ok(self
            .conn
            .call(move |conn| {
                let count = conn.execute(
                    "UPDATE seo_url SET is_valid = 0, updated_at = ?2
                     WHERE is_valid = 1 AND id IN (
                        SELECT DISTINCT invalid.id
                        FROM seo_url valid
                        INNER JOIN seo_url invalid
                          ON valid.sales_channel_id = invalid.sales_channel_id
                          AND valid.seo_path_info = invalid.seo_path_info
                          AND valid.auto_increment < invalid.auto_increment
                        WHERE valid.sales_channel_id = ?1
                        AND valid.is_deleted = 0
                        AND invalid.is_deleted = 0
                     )",
                    params![sales_channel_id, now],
                )?;
                Ok(count)
            })
            .await?)
    }

    async fn find_valid_by_seo_path(
        &self,
        sales_channel_id: Uuid,
        seo_path_info: &str,
    ) -> Result<Option<SeoUrl>, Self::Error> {
        let seo_path_info = seo_path_info.to_string();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM seo_url
                     WHERE sales_channel_id = ?1 AND seo_path_info = ?2 AND is_valid = 1
                     ORDER BY is_deleted, auto_increment LIMIT 1"
                ))?;
                let url = stmt
                    .query_map(params![sales_channel_id, seo_path_info], map_row)?
                    .next()
                    .transpose()?;
                Ok(url)
            })
            .await?)
    }

    async fn find_canonical_by_path_info(
        &self,
        sales_channel_id: Uuid,
        path_info: &str,
        exclude: Option<IdentityOf<SeoUrl>>,
    ) -> Result<Option<SeoUrl>, Self::Error> {
        let path_info = path_info.to_string();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COLUMNS} FROM seo_url
                     WHERE sales_channel_id = ?1 AND path_info = ?2
                     AND is_valid = 1 AND is_canonical = 1
                     AND (?3 IS NULL OR id != ?3)
                     ORDER BY auto_increment LIMIT 1"
                ))?;
                let url = stmt
                    .query_map(params![sales_channel_id, path_info, exclude], map_row)?
                    .next()
                    .transpose()?;
                Ok(url)
            })
            .await?)
    }
}
