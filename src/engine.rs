use crate::canonical::{self, CanonicalIndex};
use crate::generator::{GeneratorRegistry, SeoUrlGenerator};
use crate::locks::GenerationLocks;
use crate::seo_url_template::resolve_template_string;
use crate::template::{context_variables, SeoUrlTemplateRenderer, TemplateError, UrlTemplate};
use anyhow::Context;
use derive_more::{Display, Error};
use serde::Serialize;
use seo_types::seo_url::{
    GeneratedSeoUrl, NewSeoUrl, ResolvedSeoPath, SeoUrlChanges, SeoUrlRepository,
};
use seo_types::seo_url_template::{SeoUrlTemplate, SeoUrlTemplateRepository};
use seo_types::{with_leading_slash, without_leading_slash};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Display, Error)]
pub enum SeoError {
    #[display("No seo url generator registered for route {route_name}")]
    GeneratorNotFound { route_name: String },
    #[display("Syntax error: {_0}")]
    InvalidTemplate(TemplateError),
    #[display("Unable to render seo url for {foreign_key}: {error}")]
    Render {
        foreign_key: Uuid,
        #[error(source)]
        error: TemplateError,
    },
    #[error(ignore)]
    #[display("{_0:#}")]
    Storage(anyhow::Error),
}

impl From<anyhow::Error> for SeoError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(err)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSummary {
    pub inserted: usize,
    pub obsoleted: usize,
    pub unchanged: usize,
    pub skipped_modified: usize,
    pub restored: usize,
    pub deleted: usize,
    pub invalidated: usize,
}

impl UpdateSummary {
    pub fn has_writes(&self) -> bool {
        self.inserted + self.obsoleted + self.restored + self.deleted + self.invalidated > 0
    }
}

/// Preview of one entity's path under a candidate template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoUrlPreview {
    pub foreign_key: Uuid,
    pub path_info: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seo_path_info: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
pub struct SeoEngine {
    seo_urls: Arc<dyn SeoUrlRepository>,
    templates: Arc<dyn SeoUrlTemplateRepository>,
    generators: Arc<GeneratorRegistry>,
    renderer: SeoUrlTemplateRenderer,
    locks: GenerationLocks,
}

impl SeoEngine {
    pub fn new(
        seo_urls: Arc<dyn SeoUrlRepository>,
        templates: Arc<dyn SeoUrlTemplateRepository>,
        generators: GeneratorRegistry,
    ) -> Self {
        Self {
            seo_urls,
            templates,
            generators: Arc::new(generators),
            renderer: SeoUrlTemplateRenderer::new(),
            locks: GenerationLocks::new(),
        }
    }

    pub fn generators(&self) -> &GeneratorRegistry {
        &self.generators
    }

    async fn template_for(
        &self,
        sales_channel_id: Uuid,
        generator: &dyn SeoUrlGenerator,
        template: Option<&str>,
    ) -> Result<UrlTemplate, SeoError> {
        let source = match template {
            Some(t) => t.to_string(),
            None => {
                resolve_template_string(
                    self.templates.as_ref(),
                    sales_channel_id,
                    generator.route_name(),
                    generator.default_template(),
                )
                .await?
            }
        };
        self.renderer
            .compile(source)
            .map_err(SeoError::InvalidTemplate)
    }

    /// Renders seo paths for `ids` without writing anything.
    pub async fn generate_seo_urls(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        ids: &[Uuid],
        template: Option<&str>,
    ) -> Result<Vec<GeneratedSeoUrl>, SeoError> {
        let generator = self.generators.get(route_name)?;
        let template = self
            .template_for(sales_channel_id, generator.as_ref(), template)
            .await?;
        let urls = generator
            .generate_seo_urls(sales_channel_id, ids, &template)
            .await?;
        log::debug!(
            "Generated {} seo urls for {route_name} in {sales_channel_id}",
            urls.len()
        );
        Ok(urls)
    }

    /// Reconciles stored urls of `(sales_channel_id, route_name)` with `seo_urls`.
    ///
    /// `foreign_keys` plus the keys of `seo_urls` is the complete set of
    /// entities of the route. Entities without a generated url, and stored
    /// entities missing from the set, are soft-deleted.
    pub async fn update_seo_urls(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        foreign_keys: &[Uuid],
        seo_urls: Vec<GeneratedSeoUrl>,
    ) -> Result<UpdateSummary, SeoError> {
        let _guard = self.locks.acquire(sales_channel_id, route_name).await;

        let mut lookup: Vec<Uuid> = foreign_keys.to_vec();
        lookup.extend(seo_urls.iter().map(|u| u.foreign_key));
        lookup.sort();
        lookup.dedup();

        let index: CanonicalIndex = self
            .seo_urls
            .find_canonicals(sales_channel_id, route_name, &lookup)
            .await
            .context("Unable to read canonical seo urls")?
            .into_iter()
            .collect();
        let live = self
            .seo_urls
            .live_foreign_keys(sales_channel_id, route_name)
            .await
            .context("Unable to read live foreign keys")?;

        let canonical::ReconcilePlan { changes, stats } = canonical::plan(
            sales_channel_id,
            route_name,
            foreign_keys,
            &live,
            &index,
            seo_urls,
        );
        let mut summary = UpdateSummary {
            inserted: changes.inserts.len(),
            obsoleted: changes.obsoleted.len(),
            unchanged: stats.unchanged,
            skipped_modified: stats.skipped_modified,
            restored: changes.restored.len(),
            deleted: changes.deleted_foreign_keys.len(),
            invalidated: 0,
        };
        if !changes.is_empty() {
            self.seo_urls
                .apply(changes)
                .await
                .context("Unable to write seo urls")?;
        }
        summary.invalidated = self
            .seo_urls
            .invalidate_duplicates(sales_channel_id)
            .await
            .context("Unable to invalidate duplicate seo urls")?;

        log::info!(
            "Seo urls of {route_name} in {sales_channel_id}: {} inserted, {} unchanged, {} deleted",
            summary.inserted,
            summary.unchanged,
            summary.deleted
        );
        if summary.skipped_modified > 0 {
            log::info!(
                "Kept {} manually modified seo urls of {route_name}",
                summary.skipped_modified
            );
        }
        if summary.invalidated > 0 {
            log::warn!(
                "Invalidated {} duplicate seo paths in {sales_channel_id}",
                summary.invalidated
            );
        }
        Ok(summary)
    }

    /// Generates and stores urls for the complete entity set of a route.
    pub async fn regenerate(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        ids: &[Uuid],
    ) -> Result<UpdateSummary, SeoError> {
        let urls = self
            .generate_seo_urls(sales_channel_id, route_name, ids, None)
            .await?;
        self.update_seo_urls(sales_channel_id, route_name, ids, urls)
            .await
    }

    pub async fn resolve_seo_path(
        &self,
        sales_channel_id: Uuid,
        path: &str,
    ) -> Result<ResolvedSeoPath, SeoError> {
        let seo_path_info = without_leading_slash(path);
        if seo_path_info.is_empty() {
            return Ok(ResolvedSeoPath::pass_through(seo_path_info));
        }
        let Some(url) = self
            .seo_urls
            .find_valid_by_seo_path(sales_channel_id, seo_path_info)
            .await
            .context("Unable to resolve seo path")?
        else {
            return Ok(ResolvedSeoPath::pass_through(seo_path_info));
        };
        let canonical_path_info = if url.is_canonical {
            None
        } else {
            self.seo_urls
                .find_canonical_by_path_info(sales_channel_id, &url.path_info, Some(url.id))
                .await
                .context("Unable to find canonical seo url")?
                .map(|c| with_leading_slash(&c.seo_path_info))
        };
        Ok(ResolvedSeoPath {
            path_info: with_leading_slash(&url.path_info),
            seo_path_info: Some(with_leading_slash(seo_path_info)),
            is_canonical: url.is_canonical,
            canonical_path_info,
        })
    }

    /// Renders `template` for each entity. Entities the template cannot render
    /// are reported with their error, syntax errors fail the whole preview.
    pub async fn preview_seo_urls(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        ids: &[Uuid],
        template: &str,
    ) -> Result<Vec<SeoUrlPreview>, SeoError> {
        let generator = self.generators.get(route_name)?;
        let template = self
            .renderer
            .compile(template)
            .map_err(SeoError::InvalidTemplate)?;
        let contexts = generator
            .contexts(sales_channel_id, ids)
            .await
            .context("Unable to load seo url contexts")?;
        Ok(contexts
            .into_iter()
            .map(|(foreign_key, context)| {
                let rendered = template.render(&context);
                SeoUrlPreview {
                    foreign_key,
                    path_info: generator.path_info(foreign_key),
                    error: rendered.as_ref().err().map(ToString::to_string),
                    seo_path_info: rendered.ok(),
                }
            })
            .collect())
    }

    /// Variables a template of `route_name` can use, taken from one entity.
    pub async fn template_variables(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        foreign_key: Uuid,
    ) -> Result<Vec<String>, SeoError> {
        let generator = self.generators.get(route_name)?;
        let contexts = generator
            .contexts(sales_channel_id, &[foreign_key])
            .await
            .context("Unable to load seo url context")?;
        Ok(contexts
            .first()
            .map(|(_, context)| context_variables(context))
            .unwrap_or_default())
    }

    pub async fn save_template(&self, template: SeoUrlTemplate) -> Result<(), SeoError> {
        self.generators.get(&template.route_name)?;
        self.renderer
            .compile(template.template.as_str())
            .map_err(SeoError::InvalidTemplate)?;
        log::info!(
            "Saving seo url template of {} for {}",
            template.route_name,
            template
                .sales_channel_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| "all sales channels".to_string())
        );
        self.templates
            .save(template)
            .await
            .context("Unable to save seo url template")?;
        Ok(())
    }

    /// Stores a manually edited path. Later generation passes keep it.
    pub async fn save_modified_seo_url(
        &self,
        sales_channel_id: Uuid,
        route_name: &str,
        foreign_key: Uuid,
        path_info: &str,
        seo_path_info: &str,
    ) -> Result<UpdateSummary, SeoError> {
        let _guard = self.locks.acquire(sales_channel_id, route_name).await;
        let index: CanonicalIndex = self
            .seo_urls
            .find_canonicals(sales_channel_id, route_name, &[foreign_key])
            .await
            .context("Unable to read canonical seo urls")?
            .into_iter()
            .collect();

        let mut changes = SeoUrlChanges {
            sales_channel_id,
            route_name: route_name.to_string(),
            ..Default::default()
        };
        let mut summary = UpdateSummary::default();
        changes.obsoleted.extend_from_slice(index.stale(&foreign_key));
        match index.get(&foreign_key) {
            Some(existing)
                if existing.seo_path_info == without_leading_slash(seo_path_info)
                    && !existing.is_deleted =>
            {
                summary.unchanged = 1;
            }
            existing => {
                changes.obsoleted.extend(existing.map(|e| e.id));
                let mut url = GeneratedSeoUrl::new(
                    foreign_key,
                    path_info.to_string(),
                    seo_path_info.to_string(),
                );
                url.is_modified = Some(true);
                changes
                    .inserts
                    .push(NewSeoUrl::from_generated(sales_channel_id, route_name, url));
            }
        }
        summary.inserted = changes.inserts.len();
        summary.obsoleted = changes.obsoleted.len();
        if !changes.is_empty() {
            self.seo_urls
                .apply(changes)
                .await
                .context("Unable to write modified seo url")?;
        }
        summary.invalidated = self
            .seo_urls
            .invalidate_duplicates(sales_channel_id)
            .await
            .context("Unable to invalidate duplicate seo urls")?;
        log::info!("Saved modified seo url {seo_path_info} for {foreign_key}");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{
        InMemoryEntitySource, NavigationSeoUrlGenerator, ProductDetailSeoUrlGenerator,
        NAVIGATION_ROUTE, PRODUCT_DETAIL_ROUTE,
    };
    use crate::seo_url::SqliteSeoUrlRepository;
    use crate::seo_url_template::SqliteSeoUrlTemplateRepository;
    use seo_types::By;
    use serde_json::json;
    use tokio_rusqlite::Connection;
    use typesafe_repository::async_ops::Select;

    struct Fixture {
        engine: SeoEngine,
        repo: Arc<SqliteSeoUrlRepository>,
        channel: Uuid,
    }

    async fn fixture(source: InMemoryEntitySource) -> Fixture {
        let conn = Connection::open_in_memory().await.unwrap();
        let repo = Arc::new(SqliteSeoUrlRepository::init(conn.clone()).await.unwrap());
        let templates = Arc::new(SqliteSeoUrlTemplateRepository::init(conn).await.unwrap());
        let source = Arc::new(source);
        let mut generators = GeneratorRegistry::new();
        generators
            .register(Arc::new(ProductDetailSeoUrlGenerator::new(source.clone())))
            .register(Arc::new(NavigationSeoUrlGenerator::new(source)));
        Fixture {
            engine: SeoEngine::new(repo.clone(), templates, generators),
            repo,
            channel: Uuid::new_v4(),
        }
    }

    fn product(name: &str, number: &str) -> serde_json::Value {
        json!({"name": name, "productNumber": number})
    }

    fn url(fk: Uuid, seo_path_info: &str) -> GeneratedSeoUrl {
        GeneratedSeoUrl::new(
            fk,
            format!("/detail/{}", fk.simple()),
            seo_path_info.to_string(),
        )
    }

    impl Fixture {
        async fn rows(&self) -> Vec<seo_types::seo_url::SeoUrl> {
            self.repo.select(&By(self.channel)).await.unwrap()
        }

        async fn update(&self, fks: &[Uuid], urls: Vec<GeneratedSeoUrl>) -> UpdateSummary {
            self.engine
                .update_seo_urls(self.channel, PRODUCT_DETAIL_ROUTE, fks, urls)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn update_is_idempotent() {
        let a = Uuid::new_v4();
        let f = fixture(InMemoryEntitySource::new()).await;
        let first = f.update(&[a], vec![url(a, "shoes")]).await;
        assert_eq!(first.inserted, 1);
        let second = f.update(&[a], vec![url(a, "shoes")]).await;
        assert_eq!(second.inserted, 0);
        assert_eq!(second.unchanged, 1);
        assert!(!second.has_writes());
        assert_eq!(f.rows().await.len(), 1);
    }

    #[tokio::test]
    async fn manual_edit_survives_regeneration() {
        let a = Uuid::new_v4();
        let f = fixture(InMemoryEntitySource::new().with(a, product("Shoes", "SW1"))).await;
        f.engine
            .regenerate(f.channel, PRODUCT_DETAIL_ROUTE, &[a])
            .await
            .unwrap();
        let path_info = format!("/detail/{}", a.simple());
        let saved = f
            .engine
            .save_modified_seo_url(f.channel, PRODUCT_DETAIL_ROUTE, a, &path_info, "/my-shoes")
            .await
            .unwrap();
        assert_eq!(saved.inserted, 1);
        assert_eq!(saved.obsoleted, 1);

        let summary = f
            .engine
            .regenerate(f.channel, PRODUCT_DETAIL_ROUTE, &[a])
            .await
            .unwrap();
        assert_eq!(summary.skipped_modified, 1);
        assert_eq!(summary.inserted, 0);

        let resolved = f.engine.resolve_seo_path(f.channel, "/my-shoes").await.unwrap();
        assert!(resolved.is_canonical);
        assert_eq!(resolved.path_info, path_info);

        let old = f.engine.resolve_seo_path(f.channel, "shoes/sw1").await.unwrap();
        assert!(!old.is_canonical);
        assert_eq!(old.canonical_path_info.as_deref(), Some("/my-shoes"));
    }

    #[tokio::test]
    async fn one_valid_row_per_path_earliest_wins() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let f = fixture(InMemoryEntitySource::new()).await;
        let summary = f
            .update(&[a, b], vec![url(a, "shoes"), url(b, "shoes")])
            .await;
        assert_eq!(summary.invalidated, 1);

        let valid: Vec<_> = f
            .rows()
            .await
            .into_iter()
            .filter(|u| u.seo_path_info == "shoes" && u.is_valid)
            .collect();
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].foreign_key, a);

        let resolved = f.engine.resolve_seo_path(f.channel, "shoes").await.unwrap();
        assert_eq!(resolved.path_info, format!("/detail/{}", a.simple()));
    }

    #[tokio::test]
    async fn entity_missing_from_set_is_soft_deleted() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let f = fixture(InMemoryEntitySource::new()).await;
        f.update(&[a, b], vec![url(a, "a"), url(b, "b")]).await;
        let summary = f.update(&[a], vec![url(a, "a")]).await;
        assert_eq!(summary.deleted, 1);

        let rows = f.rows().await;
        assert!(rows.iter().filter(|u| u.foreign_key == b).all(|u| u.is_deleted));
        assert!(rows.iter().filter(|u| u.foreign_key == a).all(|u| !u.is_deleted));
    }

    #[tokio::test]
    async fn url_for_key_outside_set_stays_live() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let f = fixture(InMemoryEntitySource::new()).await;
        f.update(&[a, b], vec![url(a, "a"), url(b, "b")]).await;
        let summary = f.update(&[a], vec![url(a, "a"), url(b, "b-new")]).await;
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.deleted, 0);

        let rows = f.rows().await;
        assert!(rows.iter().all(|u| !u.is_deleted));
        let resolved = f.engine.resolve_seo_path(f.channel, "b-new").await.unwrap();
        assert!(resolved.is_canonical);
        assert_eq!(resolved.path_info, format!("/detail/{}", b.simple()));
    }

    #[tokio::test]
    async fn path_of_removed_entity_resolves_to_new_owner() {
        let (gone, b) = (Uuid::new_v4(), Uuid::new_v4());
        let f = fixture(InMemoryEntitySource::new()).await;
        f.update(&[gone], vec![url(gone, "shoes")]).await;
        let summary = f.update(&[b], vec![url(b, "shoes")]).await;
        assert_eq!(summary.deleted, 1);

        let resolved = f.engine.resolve_seo_path(f.channel, "shoes").await.unwrap();
        assert_eq!(resolved.path_info, format!("/detail/{}", b.simple()));
        assert!(resolved.is_canonical);
    }

    #[tokio::test]
    async fn deleted_entity_is_restored_when_it_returns() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let f = fixture(InMemoryEntitySource::new()).await;
        f.update(&[a, b], vec![url(a, "a"), url(b, "b")]).await;
        f.update(&[a], vec![url(a, "a")]).await;
        let summary = f.update(&[a, b], vec![url(a, "a"), url(b, "b")]).await;
        assert_eq!(summary.restored, 1);
        assert_eq!(summary.inserted, 0);
        assert!(f.rows().await.iter().all(|u| !u.is_deleted));
    }

    #[tokio::test]
    async fn renamed_entity_redirects_to_new_path() {
        let a = Uuid::new_v4();
        let f = fixture(InMemoryEntitySource::new()).await;
        f.update(&[a], vec![url(a, "old-name")]).await;
        let summary = f.update(&[a], vec![url(a, "new-name")]).await;
        assert_eq!(summary.inserted, 1);
        assert_eq!(summary.obsoleted, 1);

        let resolved = f.engine.resolve_seo_path(f.channel, "/old-name").await.unwrap();
        assert_eq!(resolved.path_info, format!("/detail/{}", a.simple()));
        assert_eq!(resolved.seo_path_info.as_deref(), Some("/old-name"));
        assert!(!resolved.is_canonical);
        assert_eq!(resolved.canonical_path_info.as_deref(), Some("/new-name"));

        let canonical = f.engine.resolve_seo_path(f.channel, "new-name").await.unwrap();
        assert!(canonical.is_canonical);
        assert_eq!(canonical.canonical_path_info, None);
    }

    #[tokio::test]
    async fn non_canonical_row_without_canonical_has_no_redirect() {
        let a = Uuid::new_v4();
        let f = fixture(InMemoryEntitySource::new()).await;
        let mut history = url(a, "old-name");
        history.is_canonical = Some(false);
        f.update(&[a], vec![history]).await;

        let resolved = f.engine.resolve_seo_path(f.channel, "old-name").await.unwrap();
        assert_eq!(resolved.path_info, format!("/detail/{}", a.simple()));
        assert!(!resolved.is_canonical);
        assert_eq!(resolved.canonical_path_info, None);
    }

    #[tokio::test]
    async fn unknown_path_passes_through() {
        let f = fixture(InMemoryEntitySource::new()).await;
        let resolved = f.engine.resolve_seo_path(f.channel, "/nowhere").await.unwrap();
        assert_eq!(resolved.path_info, "/nowhere");
        assert!(!resolved.is_canonical);
        assert_eq!(resolved.seo_path_info, None);

        let root = f.engine.resolve_seo_path(f.channel, "///").await.unwrap();
        assert_eq!(root.path_info, "/");
        assert!(!root.is_canonical);
    }

    #[tokio::test]
    async fn strict_template_failure_aborts_batch() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let source = InMemoryEntitySource::new()
            .with(a, json!({"name": "Shoes", "productNumber": "SW1", "manufacturer": "Acme"}))
            .with(b, product("Watch", "SW2"));
        let f = fixture(source).await;
        let err = f
            .engine
            .generate_seo_urls(
                f.channel,
                PRODUCT_DETAIL_ROUTE,
                &[a, b],
                Some("{{ product.manufacturer }}/{{ product.name }}"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::Render { foreign_key, .. } if foreign_key == b));
        assert!(f.rows().await.is_empty());
    }

    #[tokio::test]
    async fn syntax_error_fails_before_generation() {
        let f = fixture(InMemoryEntitySource::new()).await;
        let err = f
            .engine
            .generate_seo_urls(f.channel, PRODUCT_DETAIL_ROUTE, &[], Some("{{ product.name"))
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::InvalidTemplate(TemplateError::Syntax(_))));
        assert!(err.to_string().starts_with("Syntax error: "));
    }

    #[tokio::test]
    async fn unknown_route_is_reported() {
        let f = fixture(InMemoryEntitySource::new()).await;
        let err = f
            .engine
            .regenerate(f.channel, "frontend.unknown.page", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::GeneratorNotFound { .. }));
    }

    #[tokio::test]
    async fn saved_template_is_used_for_generation() {
        let a = Uuid::new_v4();
        let f = fixture(InMemoryEntitySource::new().with(a, product("Shoes", "SW1"))).await;
        f.engine
            .save_template(SeoUrlTemplate {
                id: Uuid::new_v4(),
                sales_channel_id: Some(f.channel),
                route_name: PRODUCT_DETAIL_ROUTE.to_string(),
                entity_name: "product".to_string(),
                template: "p/{{ product.productNumber }}".to_string(),
            })
            .await
            .unwrap();
        let urls = f
            .engine
            .generate_seo_urls(f.channel, PRODUCT_DETAIL_ROUTE, &[a], None)
            .await
            .unwrap();
        assert_eq!(urls[0].seo_path_info, "p/sw1");

        // other channels keep the default
        let urls = f
            .engine
            .generate_seo_urls(Uuid::new_v4(), PRODUCT_DETAIL_ROUTE, &[a], None)
            .await
            .unwrap();
        assert_eq!(urls[0].seo_path_info, "shoes/sw1");
    }

    #[tokio::test]
    async fn invalid_template_is_not_saved() {
        let f = fixture(InMemoryEntitySource::new()).await;
        let err = f
            .engine
            .save_template(SeoUrlTemplate {
                id: Uuid::new_v4(),
                sales_channel_id: None,
                route_name: PRODUCT_DETAIL_ROUTE.to_string(),
                entity_name: "product".to_string(),
                template: "{% for %}".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SeoError::InvalidTemplate(_)));
        let urls = f
            .engine
            .generate_seo_urls(f.channel, PRODUCT_DETAIL_ROUTE, &[], None)
            .await
            .unwrap();
        assert!(urls.is_empty());
    }

    #[tokio::test]
    async fn preview_reports_per_entity_errors() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let source = InMemoryEntitySource::new()
            .with(a, json!({"name": "Shoes", "productNumber": "SW1", "manufacturer": "Acme"}))
            .with(b, product("Watch", "SW2"));
        let f = fixture(source).await;
        let preview = f
            .engine
            .preview_seo_urls(
                f.channel,
                PRODUCT_DETAIL_ROUTE,
                &[a, b],
                "{{ product.manufacturer }}/{{ product.name }}",
            )
            .await
            .unwrap();
        assert_eq!(preview[0].seo_path_info.as_deref(), Some("acme/shoes"));
        assert_eq!(preview[0].error, None);
        assert_eq!(preview[1].seo_path_info, None);
        assert!(preview[1].error.is_some());
        assert!(f.rows().await.is_empty());
    }

    #[tokio::test]
    async fn lists_template_variables() {
        let a = Uuid::new_v4();
        let source = InMemoryEntitySource::new()
            .with(a, json!({"name": "Audio", "breadcrumb": ["Audio"]}));
        let f = fixture(source).await;
        let variables = f
            .engine
            .template_variables(f.channel, NAVIGATION_ROUTE, a)
            .await
            .unwrap();
        assert_eq!(
            variables,
            vec!["breadcrumb", "category.breadcrumb", "category.name"]
        );
        let none = f
            .engine
            .template_variables(f.channel, NAVIGATION_ROUTE, Uuid::new_v4())
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
