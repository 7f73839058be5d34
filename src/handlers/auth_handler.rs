use actix_session::Session;
use actix_web::{web, HttpResponse};
use log::error;
use serde_json::json;
use url::Url;
use crate::models::client_storage::{ClientStorage, CLIENT_KEY};
use crate::routes::app_state::AppState;
use crate::services::auth_service::AuthError;

fn redirect(location: &Url) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("Location", location.to_string()))
        .finish()
}

fn redirect_or_error(result: Result<Url, AuthError>) -> HttpResponse {
    match result {
        Ok(url) => redirect(&url),
        Err(e) => {
            error!("Unable to start sign-in: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": "Unable to start sign-in"}))
        }
    }
}

/// Sends the browser to the provider's sign-in page.
pub async fn sign_in(data: web::Data<AppState>, session: Session) -> HttpResponse {
    redirect_or_error(data.auth.begin_sign_in(&session))
}

/// Sends the browser to the provider's registration page.
pub async fn sign_up(data: web::Data<AppState>, session: Session) -> HttpResponse {
    redirect_or_error(data.auth.begin_sign_up(&session))
}

/// Forgets everything about this browser and navigates to the logout target.
pub async fn sign_out(data: web::Data<AppState>, session: Session) -> HttpResponse {
    if let Some(client_key) = session.get_item(CLIENT_KEY) {
        data.registry.remove(&client_key);
    }
    let target = data.auth.sign_out(&session);
    redirect(&target)
}
