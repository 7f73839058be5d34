use actix_web::{post, put, web, Responder};
use actix_session::Session;
use crate::handlers::chat_handler::{LanguageRequest, SendMessageRequest};
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(send_message)
        .service(reset)
        .service(set_language);
}

#[post("/api/messages")]
async fn send_message(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<SendMessageRequest>,
) -> impl Responder {
    crate::handlers::chat_handler::handle_send_message(data, session, req_body).await
}

#[post("/api/reset")]
async fn reset(data: web::Data<AppState>, session: Session) -> impl Responder {
    crate::handlers::chat_handler::handle_reset(data, session).await
}

#[put("/api/language")]
async fn set_language(session: Session, req_body: web::Json<LanguageRequest>) -> impl Responder {
    crate::handlers::chat_handler::handle_set_language(session, req_body).await
}
