use actix::prelude::*;
use anyhow::{anyhow, Context};
use seo_types::seo_url_template::SeoUrlTemplate;
use seo_url::config::{self, DB_PATH, INSERT_CHUNK};
use seo_url::generator::{
    EntityContextSource, GeneratorRegistry, InMemoryEntitySource, NavigationSeoUrlGenerator,
    ProductDetailSeoUrlGenerator, YamlEntitySource, NAVIGATION_ROUTE, PRODUCT_DETAIL_ROUTE,
};
use seo_url::seo_url::SqliteSeoUrlRepository;
use seo_url::seo_url_template::SqliteSeoUrlTemplateRepository;
use seo_url::service::{Preview, Regenerate, Resolve, SaveTemplate, SeoUrlService};
use seo_url::SeoEngine;
use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio_rusqlite::Connection;
use uuid::Uuid;

const USAGE: &str = "usage:
  seo-url generate <sales-channel-id> <route> <entities.yaml>
  seo-url resolve <sales-channel-id> <path>
  seo-url template <sales-channel-id|default> <route> <template>
  seo-url preview <sales-channel-id> <route> <entities.yaml> <template>";

fn entity_name(route_name: &str) -> &'static str {
    match route_name {
        PRODUCT_DETAIL_ROUTE => "product",
        NAVIGATION_ROUTE => "category",
        _ => "",
    }
}

fn parse_id(arg: &str) -> Result<Uuid, anyhow::Error> {
    Uuid::from_str(arg).with_context(|| format!("Invalid sales channel id {arg}"))
}

async fn start_service(
    source: Arc<dyn EntityContextSource>,
) -> Result<Addr<SeoUrlService>, anyhow::Error> {
    let path = Path::new(DB_PATH.as_str());
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Unable to create {}", dir.display()))?;
    }
    let conn = Connection::open(path).await?;
    let seo_url_repo =
        Arc::new(SqliteSeoUrlRepository::init(conn.clone()).await?.with_insert_chunk(*INSERT_CHUNK));
    let template_repo = Arc::new(SqliteSeoUrlTemplateRepository::init(conn).await?);

    let mut generators = GeneratorRegistry::new();
    generators
        .register(Arc::new(ProductDetailSeoUrlGenerator::new(source.clone())))
        .register(Arc::new(NavigationSeoUrlGenerator::new(source)));
    log::info!("Registered seo url routes: {:?}", generators.route_names());

    let engine = SeoEngine::new(seo_url_repo, template_repo, generators);
    Ok(SeoUrlService::new(engine).start())
}

#[actix_rt::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    config::load_env_file()?;

    let args: Vec<String> = env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match args.as_slice() {
        ["generate", channel, route, entities] => {
            let sales_channel_id = parse_id(channel)?;
            let source = YamlEntitySource::open(entities).await?;
            let ids = source.ids().to_vec();
            let addr = start_service(Arc::new(source)).await?;
            let summary = addr
                .send(Regenerate {
                    sales_channel_id,
                    route_name: route.to_string(),
                    ids,
                })
                .await??;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ["resolve", channel, path] => {
            let sales_channel_id = parse_id(channel)?;
            let addr = start_service(Arc::new(InMemoryEntitySource::new())).await?;
            let resolved = addr
                .send(Resolve {
                    sales_channel_id,
                    path: path.to_string(),
                })
                .await??;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        ["template", channel, route, template] => {
            let sales_channel_id = match *channel {
                "default" => None,
                id => Some(parse_id(id)?),
            };
            let addr = start_service(Arc::new(InMemoryEntitySource::new())).await?;
            addr.send(SaveTemplate(SeoUrlTemplate {
                id: Uuid::new_v4(),
                sales_channel_id,
                route_name: route.to_string(),
                entity_name: entity_name(route).to_string(),
                template: template.to_string(),
            }))
            .await??;
            log::info!("Template of {route} saved");
        }
        ["preview", channel, route, entities, template] => {
            let sales_channel_id = parse_id(channel)?;
            let source = YamlEntitySource::open(entities).await?;
            let ids = source.ids().to_vec();
            let addr = start_service(Arc::new(source)).await?;
            let preview = addr
                .send(Preview {
                    sales_channel_id,
                    route_name: route.to_string(),
                    ids,
                    template: template.to_string(),
                })
                .await??;
            println!("{}", serde_json::to_string_pretty(&preview)?);
        }
        _ => return Err(anyhow!("{USAGE}")),
    }
    Ok(())
}
