use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::domain::network::{PostOfficeForm, ShipperForm};
use crate::domain::order::{OrderForm, OrderStatus, TransitionRequest};
use crate::lifecycle::LifecycleError;
use crate::views::ListQuery;
use super::AppState;

/// Body of `PATCH /api/orders/{id}/status`
#[derive(Debug, Deserialize)]
pub struct StatusPatch {
    pub status: String,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl StatusPatch {
    fn into_request(self) -> Result<TransitionRequest, LifecycleError> {
        let status = self
            .status
            .trim()
            .parse::<OrderStatus>()
            .map_err(|e| LifecycleError::Validation(e.to_string()))?;

        Ok(TransitionRequest {
            status,
            actor: self.actor.filter(|a| !a.trim().is_empty()),
            location: self.location.filter(|l| !l.trim().is_empty()),
            occurred_at: self.occurred_at,
        })
    }
}

#[instrument(name = "handler::create_order", skip_all)]
pub async fn create_order(
    state: web::Data<AppState>,
    form: web::Json<OrderForm>,
) -> Result<HttpResponse, LifecycleError> {
    let order = state.manager.create(form.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn list_orders(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, LifecycleError> {
    let page = state.views.list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn status_summary(state: web::Data<AppState>) -> Result<HttpResponse, LifecycleError> {
    let summary = state.views.summary().await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn get_order(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, LifecycleError> {
    let order = state.manager.get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::edit_order", skip(state, form), fields(order_id = %path.as_ref()))]
pub async fn edit_order(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Json<OrderForm>,
) -> Result<HttpResponse, LifecycleError> {
    let order = state.manager.edit(path.into_inner(), form.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::change_status", skip(state, body), fields(order_id = %path.as_ref()))]
pub async fn change_status(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<StatusPatch>,
) -> Result<HttpResponse, LifecycleError> {
    let request = body.into_inner().into_request()?;
    let order = state.manager.transition_with(path.into_inner(), request).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn delete_order(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, LifecycleError> {
    state.manager.soft_delete(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn track(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, LifecycleError> {
    let view = state.views.track(&path).await?;
    Ok(HttpResponse::Ok().json(view))
}

pub async fn notifications(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, LifecycleError> {
    let records = state.views.notifications(&path).await?;
    Ok(HttpResponse::Ok().json(records))
}

pub async fn dashboard(state: web::Data<AppState>) -> Result<HttpResponse, LifecycleError> {
    let dashboard = state.views.dashboard().await?;
    Ok(HttpResponse::Ok().json(dashboard))
}

pub async fn cod_total(state: web::Data<AppState>) -> Result<HttpResponse, LifecycleError> {
    let total = state.views.cod_total().await?;
    Ok(HttpResponse::Ok().json(json!({ "total_cod": total })))
}

// ============================================================================
// Directory
// ============================================================================

pub async fn list_post_offices(state: web::Data<AppState>) -> Result<HttpResponse, LifecycleError> {
    Ok(HttpResponse::Ok().json(state.directory.post_offices().await?))
}

#[instrument(name = "handler::create_post_office", skip_all)]
pub async fn create_post_office(
    state: web::Data<AppState>,
    form: web::Json<PostOfficeForm>,
) -> Result<HttpResponse, LifecycleError> {
    let office = state.directory.create_post_office(form.into_inner()).await?;
    Ok(HttpResponse::Created().json(office))
}

pub async fn update_post_office(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Json<PostOfficeForm>,
) -> Result<HttpResponse, LifecycleError> {
    let office = state.directory.update_post_office(path.into_inner(), form.into_inner()).await?;
    Ok(HttpResponse::Ok().json(office))
}

pub async fn delete_post_office(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, LifecycleError> {
    state.directory.delete_post_office(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_shippers(state: web::Data<AppState>) -> Result<HttpResponse, LifecycleError> {
    Ok(HttpResponse::Ok().json(state.directory.shippers().await?))
}

pub async fn active_shippers(state: web::Data<AppState>) -> Result<HttpResponse, LifecycleError> {
    Ok(HttpResponse::Ok().json(state.directory.active_shippers().await?))
}

#[instrument(name = "handler::create_shipper", skip_all)]
pub async fn create_shipper(
    state: web::Data<AppState>,
    form: web::Json<ShipperForm>,
) -> Result<HttpResponse, LifecycleError> {
    let shipper = state.directory.create_shipper(form.into_inner()).await?;
    Ok(HttpResponse::Created().json(shipper))
}

pub async fn update_shipper(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    form: web::Json<ShipperForm>,
) -> Result<HttpResponse, LifecycleError> {
    let shipper = state.directory.update_shipper(path.into_inner(), form.into_inner()).await?;
    Ok(HttpResponse::Ok().json(shipper))
}

pub async fn delete_shipper(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, LifecycleError> {
    state.directory.delete_shipper(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
