use crate::engine::SeoError;
use crate::template::UrlTemplate;
use anyhow::Context;
use async_trait::async_trait;
use derive_more::Deref;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use seo_types::seo_url::GeneratedSeoUrl;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

pub const PRODUCT_DETAIL_ROUTE: &str = "frontend.detail.page";
pub const NAVIGATION_ROUTE: &str = "frontend.navigation.page";

/// Produces seo paths for the entities of one route.
#[async_trait]
pub trait SeoUrlGenerator: Send + Sync {
    fn route_name(&self) -> &str;
    fn default_template(&self) -> &str;
    /// Internal path the storefront routes for `foreign_key`.
    fn path_info(&self, foreign_key: Uuid) -> String;
    /// Template context per entity. Unknown ids are left out.
    async fn contexts(
        &self,
        sales_channel_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Value)>, anyhow::Error>;

    async fn generate_seo_urls(
        &self,
        sales_channel_id: Uuid,
        ids: &[Uuid],
        template: &UrlTemplate,
    ) -> Result<Vec<GeneratedSeoUrl>, SeoError> {
        let contexts = self
            .contexts(sales_channel_id, ids)
            .await
            .context("Unable to load seo url contexts")?;
        contexts
            .into_iter()
            .map(|(foreign_key, context)| {
                let seo_path_info = template
                    .render(&context)
                    .map_err(|error| SeoError::Render { foreign_key, error })?;
                Ok(GeneratedSeoUrl::new(
                    foreign_key,
                    self.path_info(foreign_key),
                    seo_path_info,
                ))
            })
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct GeneratorRegistry {
    generators: HashMap<String, Arc<dyn SeoUrlGenerator>>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `generator` under its route name, replacing a previous one.
    pub fn register(&mut self, generator: Arc<dyn SeoUrlGenerator>) -> &mut Self {
        self.generators
            .insert(generator.route_name().to_string(), generator);
        self
    }

    pub fn get(&self, route_name: &str) -> Result<Arc<dyn SeoUrlGenerator>, SeoError> {
        self.generators
            .get(route_name)
            .cloned()
            .ok_or_else(|| SeoError::GeneratorNotFound {
                route_name: route_name.to_string(),
            })
    }

    pub fn route_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.generators.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

#[async_trait]
pub trait EntityContextSource: Send + Sync {
    /// Entity data in the order of `ids`, skipping unknown ones.
    async fn load(
        &self,
        sales_channel_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Value)>, anyhow::Error>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryEntitySource {
    entities: HashMap<Uuid, Value>,
    order: Vec<Uuid>,
}

impl InMemoryEntitySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Uuid, entity: Value) {
        if self.entities.insert(id, entity).is_none() {
            self.order.push(id);
        }
    }

    pub fn with(mut self, id: Uuid, entity: Value) -> Self {
        self.insert(id, entity);
        self
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[Uuid] {
        &self.order
    }
}

#[async_trait]
impl EntityContextSource for InMemoryEntitySource {
    async fn load(&self, _: Uuid, ids: &[Uuid]) -> Result<Vec<(Uuid, Value)>, anyhow::Error> {
        Ok(ids
            .iter()
            .filter_map(|id| self.entities.get(id).map(|e| (*id, e.clone())))
            .collect())
    }
}

#[derive(Deserialize)]
struct EntityRecord {
    id: Uuid,
    #[serde(flatten)]
    data: Map<String, Value>,
}

/// Entities listed in a yaml document, each with an `id` and arbitrary fields.
///
/// ```yaml
/// - id: 4b6f7c5e-2a61-4f0e-9e0b-5d3c1c6f1a10
///   name: Wireless Headphones
///   productNumber: SW10001
/// ```
#[derive(Clone, Debug, Default, Deref)]
pub struct YamlEntitySource(InMemoryEntitySource);

impl YamlEntitySource {
    pub fn parse(yaml: &str) -> Result<Self, anyhow::Error> {
        let records: Vec<EntityRecord> =
            serde_yaml::from_str(yaml).context("Unable to parse entities")?;
        let mut source = InMemoryEntitySource::new();
        for EntityRecord { id, mut data } in records {
            data.insert("id".to_string(), Value::String(id.to_string()));
            source.insert(id, Value::Object(data));
        }
        Ok(Self(source))
    }

    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Unable to read {}", path.display()))?;
        Self::parse(&yaml)
    }
}

#[async_trait]
impl EntityContextSource for YamlEntitySource {
    async fn load(
        &self,
        sales_channel_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Value)>, anyhow::Error> {
        self.0.load(sales_channel_id, ids).await
    }
}

pub struct ProductDetailSeoUrlGenerator {
    source: Arc<dyn EntityContextSource>,
}

impl ProductDetailSeoUrlGenerator {
    pub fn new(source: Arc<dyn EntityContextSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl SeoUrlGenerator for ProductDetailSeoUrlGenerator {
    fn route_name(&self) -> &str {
        PRODUCT_DETAIL_ROUTE
    }

    fn default_template(&self) -> &str {
        "{{ product.name }}/{{ product.productNumber }}"
    }

    fn path_info(&self, foreign_key: Uuid) -> String {
        format!("/detail/{}", foreign_key.simple())
    }

    async fn contexts(
        &self,
        sales_channel_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Value)>, anyhow::Error> {
        Ok(self
            .source
            .load(sales_channel_id, ids)
            .await?
            .into_iter()
            .map(|(id, product)| (id, json!({ "product": product })))
            .collect())
    }
}

pub struct NavigationSeoUrlGenerator {
    source: Arc<dyn EntityContextSource>,
}

impl NavigationSeoUrlGenerator {
    pub fn new(source: Arc<dyn EntityContextSource>) -> Self {
        Self { source }
    }
}

// Categories without an explicit breadcrumb use their own name
fn breadcrumb(category: &Value) -> Value {
    match (category.get("breadcrumb"), category.get("name")) {
        (Some(b), _) => b.clone(),
        (None, Some(name)) => json!([name]),
        (None, None) => json!([]),
    }
}

#[async_trait]
impl SeoUrlGenerator for NavigationSeoUrlGenerator {
    fn route_name(&self) -> &str {
        NAVIGATION_ROUTE
    }

    fn default_template(&self) -> &str {
        "{% for part in breadcrumb %}{{ part }}/{% endfor %}"
    }

    fn path_info(&self, foreign_key: Uuid) -> String {
        format!("/navigation/{}", foreign_key.simple())
    }

    async fn contexts(
        &self,
        sales_channel_id: Uuid,
        ids: &[Uuid],
    ) -> Result<Vec<(Uuid, Value)>, anyhow::Error> {
        Ok(self
            .source
            .load(sales_channel_id, ids)
            .await?
            .into_iter()
            .map(|(id, category)| {
                let breadcrumb = breadcrumb(&category);
                (id, json!({ "category": category, "breadcrumb": breadcrumb }))
            })
            .collect())
    }
}
