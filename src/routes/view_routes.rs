use actix_web::{get, web, HttpRequest, Responder};
use actix_session::Session;
use crate::routes::app_state::AppState;
use crate::services::view_service::CallbackParams;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(page)
        .service(current_view);
}

#[get("/")]
async fn page(
    req: HttpRequest,
    data: web::Data<AppState>,
    session: Session,
    params: web::Query<CallbackParams>,
) -> impl Responder {
    crate::handlers::view_handler::page(req, data, session, params).await
}

#[get("/api/view")]
async fn current_view(data: web::Data<AppState>, session: Session) -> impl Responder {
    crate::handlers::view_handler::current_view(data, session).await
}
