use crate::{with_leading_slash, without_leading_slash, By};
use actix::prelude::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use time::OffsetDateTime;
use typesafe_repository::async_ops::{Get, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::SelectBy;
use uuid::Uuid;

#[derive(Id, Clone, Debug, PartialEq, Eq)]
#[Id(ref_id, get_id)]
pub struct SeoUrl {
    #[id]
    pub id: Uuid,
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub foreign_key: Uuid,
    pub path_info: String,
    pub seo_path_info: String,
    pub is_canonical: bool,
    pub is_modified: bool,
    pub is_valid: bool,
    pub is_deleted: bool,
    pub created_at: OffsetDateTime,
    /// Insertion sequence, first created wins on duplicate paths
    pub auto_increment: i64,
}

impl SelectBy<By<Uuid>> for SeoUrl {}

/// Path produced by a generator for one entity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedSeoUrl {
    pub foreign_key: Uuid,
    pub path_info: String,
    pub seo_path_info: String,
    #[serde(default)]
    pub is_canonical: Option<bool>,
    #[serde(default)]
    pub is_modified: Option<bool>,
}

impl GeneratedSeoUrl {
    pub fn new(foreign_key: Uuid, path_info: String, seo_path_info: String) -> Self {
        Self {
            foreign_key,
            path_info,
            seo_path_info,
            is_canonical: None,
            is_modified: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSeoUrl {
    pub id: Uuid,
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub foreign_key: Uuid,
    pub path_info: String,
    pub seo_path_info: String,
    pub is_canonical: bool,
    pub is_modified: bool,
}

impl NewSeoUrl {
    pub fn from_generated(sales_channel_id: Uuid, route_name: &str, url: GeneratedSeoUrl) -> Self {
        Self {
            id: Uuid::new_v4(),
            sales_channel_id,
            route_name: route_name.to_string(),
            foreign_key: url.foreign_key,
            path_info: with_leading_slash(&url.path_info),
            seo_path_info: without_leading_slash(&url.seo_path_info).to_string(),
            is_canonical: url.is_canonical.unwrap_or(true),
            is_modified: url.is_modified.unwrap_or(false),
        }
    }
}

/// Writes of one reconciliation pass, applied atomically by the repository.
#[derive(Clone, Debug, Default)]
pub struct SeoUrlChanges {
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub inserts: Vec<NewSeoUrl>,
    pub obsoleted: Vec<IdentityOf<SeoUrl>>,
    pub restored: Vec<IdentityOf<SeoUrl>>,
    pub deleted_foreign_keys: Vec<Uuid>,
}

impl SeoUrlChanges {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty()
            && self.obsoleted.is_empty()
            && self.restored.is_empty()
            && self.deleted_foreign_keys.is_empty()
    }
}

/// Result of resolving a request path.
///
/// `path_info` is always the internal route to dispatch (`/detail/<id>`), never
/// the friendly path that was requested. For a redirect lookup of `/old-name`
/// the requested path is in `seo_path_info` and the redirect target in
/// `canonical_path_info`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSeoPath {
    /// Internal route with a leading slash. Unmapped paths pass through as is.
    pub path_info: String,
    /// Normalized request path, set only when a stored url matched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_path_info: Option<String>,
    pub is_canonical: bool,
    /// Friendly path of the canonical url when the matched one is not canonical.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_path_info: Option<String>,
}

impl ResolvedSeoPath {
    /// No mapping exists, the request path is routed as is.
    pub fn pass_through(path: &str) -> Self {
        Self {
            path_info: with_leading_slash(path),
            seo_path_info: None,
            is_canonical: false,
            canonical_path_info: None,
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "()")]
pub struct SeoUrlsUpdated {
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub inserted: usize,
    pub deleted: usize,
}

#[async_trait]
pub trait SeoUrlRepository:
    Repository<SeoUrl, Error = anyhow::Error>
    + Get<SeoUrl>
    + Select<SeoUrl, By<Uuid>>
    + Send
    + Sync
{
    /// Canonical rows of `(sales_channel_id, route_name)` for the given foreign keys,
    /// including soft-deleted ones.
    async fn find_canonicals(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        foreign_keys: &[Uuid],
    ) -> Result<Vec<SeoUrl>, Self::Error>;
    /// Foreign keys that still have non-deleted rows for the route.
    async fn live_foreign_keys(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
    ) -> Result<HashSet<Uuid>, Self::Error>;
    async fn apply(&self, changes: SeoUrlChanges) -> Result<(), Self::Error>;
    /// Returns the number of rows marked invalid.
    async fn invalidate_duplicates(&self, sales_channel_id: Uuid) -> Result<usize, Self::Error>;
    async fn find_valid_by_seo_path(
        &self,
        sales_channel_id: Uuid,
        seo_path_info: &str,
    ) -> Result<Option<SeoUrl>, Self::Error>;
    async fn find_canonical_by_path_info(
        &self,
        sales_channel_id: Uuid,
        path_info: &str,
        exclude: Option<IdentityOf<SeoUrl>>,
    ) -> Result<Option<SeoUrl>, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_seo_url_defaults_to_canonical_and_generated() {
        let fk = Uuid::new_v4();
        let url = NewSeoUrl::from_generated(
            Uuid::new_v4(),
            "frontend.detail.page",
            GeneratedSeoUrl::new(fk, "detail/1".to_string(), "/shoes".to_string()),
        );
        assert_eq!(url.path_info, "/detail/1");
        assert_eq!(url.seo_path_info, "shoes");
        assert!(url.is_canonical);
        assert!(!url.is_modified);
    }

    #[test]
    fn pass_through_adds_leading_slash() {
        let resolved = ResolvedSeoPath::pass_through("unknown-path");
        assert_eq!(resolved.path_info, "/unknown-path");
        assert!(!resolved.is_canonical);
        assert_eq!(resolved.canonical_path_info, None);
    }
}
