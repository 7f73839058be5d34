use actix_web::web;

pub mod app_state;
pub mod auth_routes;
pub mod chat_routes;
pub mod view_routes;

/// Registers every route of the application.
pub fn configure(cfg: &mut web::ServiceConfig) {
    auth_routes::init_routes(cfg);
    chat_routes::init_routes(cfg);
    view_routes::init_routes(cfg);
}
