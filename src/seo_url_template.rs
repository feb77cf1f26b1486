use crate::{read_optional_uuid, read_uuid};
use anyhow::Context;
use async_trait::async_trait;
use rusqlite::params;
use seo_types::seo_url_template::{SeoUrlTemplate, SeoUrlTemplateRepository};
use seo_types::By;
use tokio_rusqlite::Connection;
use typesafe_repository::async_ops::{Get, Remove, Save, Select};
use typesafe_repository::prelude::*;
use uuid::Uuid;

/// Effective template for a route: sales channel override, then the global
/// override, then the generator default.
pub async fn resolve_template_string(
    repo: &dyn SeoUrlTemplateRepository,
    sales_channel_id: Uuid,
    route_name: &str,
    default_template: &str,
) -> Result<String, anyhow::Error> {
    if let Some(t) = repo
        .find(Some(sales_channel_id), route_name)
        .await
        .context("Unable to read sales channel seo url template")?
    {
        return Ok(t.template);
    }
    if let Some(t) = repo
        .find(None, route_name)
        .await
        .context("Unable to read default seo url template")?
    {
        return Ok(t.template);
    }
    Ok(default_template.to_string())
}

fn map_row(row: &rusqlite::Row<'_>) -> Result<SeoUrlTemplate, rusqlite::Error> {
    Ok(SeoUrlTemplate {
        id: read_uuid(row, 0)?,
        sales_channel_id: read_optional_uuid(row, 1)?,
        route_name: row.get(2)?,
        entity_name: row.get(3)?,
        template: row.get(4)?,
    })
}

pub struct SqliteSeoUrlTemplateRepository {
    conn: Connection,
}

impl SqliteSeoUrlTemplateRepository {
    pub async fn init(conn: Connection) -> Result<Self, tokio_rusqlite::Error> {
        conn.call(|conn| {
            conn.execute(
                "CREATE TABLE IF NOT EXISTS seo_url_template (
                    id BLOB PRIMARY KEY,
                    sales_channel_id BLOB,
                    route_name TEXT NOT NULL,
                    entity_name TEXT NOT NULL DEFAULT '',
                    template TEXT NOT NULL
                )",
                [],
            )?;
            // NULL sales channels are distinct in sqlite unique indexes, hence the coalesce
            conn.execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS seo_url_template_route
                    ON seo_url_template (COALESCE(sales_channel_id, X''), route_name)",
                [],
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

impl Repository<SeoUrlTemplate> for SqliteSeoUrlTemplateRepository {
    type Error = anyhow::Error;
}

#[async_trait]
impl Get<SeoUrlTemplate> for SqliteSeoUrlTemplateRepository {
    async fn get_one(
        &self,
        id: &IdentityOf<SeoUrlTemplate>,
    ) -> Result<Option<SeoUrlTemplate>, Self::Error> {
        let id = *id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sales_channel_id, route_name, entity_name, template
                     FROM seo_url_template WHERE id = ?1",
                )?;
                let t = stmt.query_map([id], map_row)?.next().transpose()?;
                Ok(t)
            })
            .await?)
    }
}

#[async_trait]
impl Select<SeoUrlTemplate, By<Option<Uuid>>> for SqliteSeoUrlTemplateRepository {
    async fn select(
        &self,
        By(sales_channel_id): &By<Option<Uuid>>,
    ) -> Result<Vec<SeoUrlTemplate>, Self::Error> {
        let sales_channel_id = *sales_channel_id;
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sales_channel_id, route_name, entity_name, template
                     FROM seo_url_template WHERE sales_channel_id IS ?1 ORDER BY route_name",
                )?;
                let list = stmt
                    .query_map(params![sales_channel_id], map_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(list)
            })
            .await?)
    }
}

#[async_trait]
impl Save<SeoUrlTemplate> for SqliteSeoUrlTemplateRepository {
    /// Replaces any other template of the same `(sales channel, route)`.
    async fn save(&self, t: SeoUrlTemplate) -> Result<(), Self::Error> {
        Ok(self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM seo_url_template
                     WHERE sales_channel_id IS ?1 AND route_name = ?2 AND id != ?3",
                    params![t.sales_channel_id, t.route_name, t.id],
                )?;
                tx.execute(
                    "INSERT INTO seo_url_template (id, sales_channel_id, route_name, entity_name, template)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET sales_channel_id=?2, route_name=?3, entity_name=?4, template=?5",
                    params![
                        t.id,
                        t.sales_channel_id,
                        t.route_name,
                        t.entity_name,
                        t.template
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?)
    }
}

#[async_trait]
impl Remove<SeoUrlTemplate> for SqliteSeoUrlTemplateRepository {
    async fn remove(&self, id: &IdentityOf<SeoUrlTemplate>) -> Result<(), Self::Error> {
        let id = *id;
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM seo_url_template WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SeoUrlTemplateRepository for SqliteSeoUrlTemplateRepository {
    async fn find(
        &self,
        sales_channel_id: Option<Uuid>,
        route_name: &str,
    ) -> Result<Option<SeoUrlTemplate>, Self::Error> {
        let route_name = route_name.to_string();
        Ok(self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, sales_channel_id, route_name, entity_name, template
                     FROM seo_url_template WHERE sales_channel_id IS ?1 AND route_name = ?2",
                )?;
                let t = stmt
                    .query_map(params![sales_channel_id, route_name], map_row)?
                    .next()
                    .transpose()?;
                Ok(t)
            })
            .await?)
    }
}
