use crate::By;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use typesafe_repository::async_ops::{Get, Remove, Save, Select};
use typesafe_repository::macros::Id;
use typesafe_repository::prelude::*;
use typesafe_repository::SelectBy;
use uuid::Uuid;

/// Template override for a route. `sales_channel_id == None` is the global default.
#[derive(Id, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[Id(ref_id, get_id)]
#[serde(rename_all = "camelCase")]
pub struct SeoUrlTemplate {
    #[id]
    pub id: Uuid,
    pub sales_channel_id: Option<Uuid>,
    pub route_name: String,
    pub entity_name: String,
    pub template: String,
}

impl SelectBy<By<Option<Uuid>>> for SeoUrlTemplate {}

#[async_trait]
pub trait SeoUrlTemplateRepository:
    Repository<SeoUrlTemplate, Error = anyhow::Error>
    + Get<SeoUrlTemplate>
    + Save<SeoUrlTemplate>
    + Remove<SeoUrlTemplate>
    + Select<SeoUrlTemplate, By<Option<Uuid>>>
    + Send
    + Sync
{
    async fn find(
        &self,
        sales_channel_id: Option<Uuid>,
        route_name: &str,
    ) -> Result<Option<SeoUrlTemplate>, Self::Error>;
}
