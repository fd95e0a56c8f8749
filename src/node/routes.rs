use actix_web::web;

use super::handlers;

/// Configures the HTTP routes
///
/// # Arguments
///
/// * `cfg` - The service configuration
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/balances/list", web::get().to(handlers::list_balances))
        .route("/tx/add", web::post().to(handlers::add_tx));
}
