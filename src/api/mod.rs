// ============================================================================
// HTTP API
// ============================================================================
//
// JSON routes over the lifecycle manager (writes), tracking views (reads)
// and the post office / shipper directory.
// Lifecycle errors render through `ResponseError` in `errors`.
//
// ============================================================================

mod errors;
pub mod handlers;

use actix_web::web;
use std::sync::Arc;

use crate::directory::NetworkDirectory;
use crate::lifecycle::{LifecycleError, OrderLifecycleManager};
use crate::views::TrackingViews;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<OrderLifecycleManager>,
    pub views: Arc<TrackingViews>,
    pub directory: Arc<NetworkDirectory>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                LifecycleError::Validation(err.to_string()).into()
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                LifecycleError::Validation(err.to_string()).into()
            }))
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::create_order))
                    .route("", web::get().to(handlers::list_orders))
                    .route("/summary", web::get().to(handlers::status_summary))
                    .route("/{id}", web::get().to(handlers::get_order))
                    .route("/{id}", web::put().to(handlers::edit_order))
                    .route("/{id}", web::delete().to(handlers::delete_order))
                    .route("/{id}/status", web::patch().to(handlers::change_status)),
            )
            .route("/track/{code}", web::get().to(handlers::track))
            .route("/notifications/{order_code}", web::get().to(handlers::notifications))
            .route("/dashboard", web::get().to(handlers::dashboard))
            .route("/transactions/cod", web::get().to(handlers::cod_total))
            .service(
                web::scope("/postoffices")
                    .route("", web::get().to(handlers::list_post_offices))
                    .route("", web::post().to(handlers::create_post_office))
                    .route("/{id}", web::put().to(handlers::update_post_office))
                    .route("/{id}", web::delete().to(handlers::delete_post_office)),
            )
            .service(
                web::scope("/shippers")
                    .route("", web::get().to(handlers::list_shippers))
                    .route("", web::post().to(handlers::create_shipper))
                    .route("/active", web::get().to(handlers::active_shippers))
                    .route("/{id}", web::put().to(handlers::update_shipper))
                    .route("/{id}", web::delete().to(handlers::delete_shipper)),
            ),
    );
}
