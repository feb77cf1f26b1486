use crate::engine::{SeoEngine, SeoError, SeoUrlPreview, UpdateSummary};
use actix::prelude::*;
use actix_broker::BrokerIssue;
use seo_types::seo_url::{GeneratedSeoUrl, ResolvedSeoPath, SeoUrlsUpdated};
use seo_types::seo_url_template::SeoUrlTemplate;
use uuid::Uuid;

pub struct SeoUrlService {
    engine: SeoEngine,
}

impl SeoUrlService {
    pub fn new(engine: SeoEngine) -> Self {
        Self { engine }
    }
}

impl Actor for SeoUrlService {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "Result<Vec<GeneratedSeoUrl>, SeoError>")]
pub struct Generate {
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub ids: Vec<Uuid>,
    pub template: Option<String>,
}

#[derive(Message)]
#[rtype(result = "Result<UpdateSummary, SeoError>")]
pub struct Update {
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub foreign_keys: Vec<Uuid>,
    pub seo_urls: Vec<GeneratedSeoUrl>,
}

#[derive(Message)]
#[rtype(result = "Result<UpdateSummary, SeoError>")]
pub struct Regenerate {
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub ids: Vec<Uuid>,
}

#[derive(Message)]
#[rtype(result = "Result<ResolvedSeoPath, SeoError>")]
pub struct Resolve {
    pub sales_channel_id: Uuid,
    pub path: String,
}

#[derive(Message)]
#[rtype(result = "Result<Vec<SeoUrlPreview>, SeoError>")]
pub struct Preview {
    pub sales_channel_id: Uuid,
    pub route_name: String,
    pub ids: Vec<Uuid>,
    pub template: String,
}

#[derive(Message)]
#[rtype(result = "Result<(), SeoError>")]
pub struct SaveTemplate(pub SeoUrlTemplate);

fn updated(
    sales_channel_id: Uuid,
    route_name: String,
    summary: &UpdateSummary,
) -> Option<SeoUrlsUpdated> {
    summary.has_writes().then(|| SeoUrlsUpdated {
        sales_channel_id,
        route_name,
        inserted: summary.inserted,
        deleted: summary.deleted,
    })
}

impl Handler<Generate> for SeoUrlService {
    type Result = ResponseActFuture<Self, Result<Vec<GeneratedSeoUrl>, SeoError>>;

    fn handle(&mut self, msg: Generate, _: &mut Self::Context) -> Self::Result {
        let engine = self.engine.clone();
        Box::pin(
            async move {
                engine
                    .generate_seo_urls(
                        msg.sales_channel_id,
                        &msg.route_name,
                        &msg.ids,
                        msg.template.as_deref(),
                    )
                    .await
            }
            .into_actor(self),
        )
    }
}

impl Handler<Update> for SeoUrlService {
    type Result = ResponseActFuture<Self, Result<UpdateSummary, SeoError>>;

    fn handle(&mut self, msg: Update, _: &mut Self::Context) -> Self::Result {
        let engine = self.engine.clone();
        let Update {
            sales_channel_id,
            route_name,
            foreign_keys,
            seo_urls,
        } = msg;
        let event_route = route_name.clone();
        Box::pin(
            async move {
                engine
                    .update_seo_urls(sales_channel_id, &route_name, &foreign_keys, seo_urls)
                    .await
            }
            .into_actor(self)
            .map(move |res, act, _| {
                if let Some(event) = res
                    .as_ref()
                    .ok()
                    .and_then(|s| updated(sales_channel_id, event_route, s))
                {
                    act.issue_system_async(event);
                }
                res
            }),
        )
    }
}

impl Handler<Regenerate> for SeoUrlService {
    type Result = ResponseActFuture<Self, Result<UpdateSummary, SeoError>>;

    fn handle(&mut self, msg: Regenerate, _: &mut Self::Context) -> Self::Result {
        let engine = self.engine.clone();
        let Regenerate {
            sales_channel_id,
            route_name,
            ids,
        } = msg;
        let event_route = route_name.clone();
        Box::pin(
            async move { engine.regenerate(sales_channel_id, &route_name, &ids).await }
                .into_actor(self)
                .map(move |res, act, _| {
                    if let Some(event) = res
                        .as_ref()
                        .ok()
                        .and_then(|s| updated(sales_channel_id, event_route, s))
                    {
                        act.issue_system_async(event);
                    }
                    res
                }),
        )
    }
}

impl Handler<Resolve> for SeoUrlService {
    type Result = ResponseActFuture<Self, Result<ResolvedSeoPath, SeoError>>;

    fn handle(&mut self, msg: Resolve, _: &mut Self::Context) -> Self::Result {
        let engine = self.engine.clone();
        Box::pin(
            async move { engine.resolve_seo_path(msg.sales_channel_id, &msg.path).await }
                .into_actor(self),
        )
    }
}

impl Handler<Preview> for SeoUrlService {
    type Result = ResponseActFuture<Self, Result<Vec<SeoUrlPreview>, SeoError>>;

    fn handle(&mut self, msg: Preview, _: &mut Self::Context) -> Self::Result {
        let engine = self.engine.clone();
        Box::pin(
            async move {
                engine
                    .preview_seo_urls(
                        msg.sales_channel_id,
                        &msg.route_name,
                        &msg.ids,
                        &msg.template,
                    )
                    .await
            }
            .into_actor(self),
        )
    }
}

impl Handler<SaveTemplate> for SeoUrlService {
    type Result = ResponseActFuture<Self, Result<(), SeoError>>;

    fn handle(&mut self, SaveTemplate(template): SaveTemplate, _: &mut Self::Context) -> Self::Result {
        let engine = self.engine.clone();
        Box::pin(async move { engine.save_template(template).await }.into_actor(self))
    }
}
