use actix_web::{get, post, web, Responder};
use actix_session::Session;
use crate::routes::app_state::AppState;

pub fn init_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(sign_in)
        .service(sign_up)
        .service(sign_out);
}

#[get("/auth/login")]
async fn sign_in(data: web::Data<AppState>, session: Session) -> impl Responder {
    crate::handlers::auth_handler::sign_in(data, session).await
}

#[get("/auth/signup")]
async fn sign_up(data: web::Data<AppState>, session: Session) -> impl Responder {
    crate::handlers::auth_handler::sign_up(data, session).await
}

#[post("/auth/logout")]
async fn sign_out(data: web::Data<AppState>, session: Session) -> impl Responder {
    crate::handlers::auth_handler::sign_out(data, session).await
}
