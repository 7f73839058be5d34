use actix_session::Session;
use actix_web::{web, HttpResponse};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;
use crate::models::client_state::ClientState;
use crate::models::language::{Language, Phrase};
use crate::routes::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LanguageRequest {
    pub language: String,
}

fn load_state(session: &Session) -> Result<ClientState, HttpResponse> {
    ClientState::load(session).map_err(|e| {
        error!("Error loading client state: {}", e);
        HttpResponse::InternalServerError().json(json!({"error": e.to_string()}))
    })
}

fn busy() -> HttpResponse {
    HttpResponse::Conflict().json(json!({"error": "A message is already being sent"}))
}

pub async fn handle_send_message(
    data: web::Data<AppState>,
    session: Session,
    req_body: web::Json<SendMessageRequest>,
) -> HttpResponse {
    let state = match load_state(&session) {
        Ok(state) => state,
        Err(resp) => return resp,
    };

    let controller = data
        .registry
        .get_or_insert_with(&state.client_key, || data.new_controller());
    let Ok(mut controller) = controller.try_lock() else {
        warn!("Rejecting concurrent send for session {}", state.session_id);
        return busy();
    };

    let appended = controller.send_message(&state, &req_body.message).await;
    HttpResponse::Ok().json(json!({
        "messages": appended,
        "input_enabled": controller.is_input_enabled(),
    }))
}

pub async fn handle_reset(data: web::Data<AppState>, session: Session) -> HttpResponse {
    let mut state = match load_state(&session) {
        Ok(state) => state,
        Err(resp) => return resp,
    };

    let controller = data
        .registry
        .get_or_insert_with(&state.client_key, || data.new_controller());
    let Ok(mut controller) = controller.try_lock() else {
        return busy();
    };

    match controller.reset_session(&mut state, &session) {
        Ok(messages) => {
            info!("Conversation reset; new session {}", state.session_id);
            HttpResponse::Ok().json(json!({
                "session_id": state.session_id,
                "messages": messages,
            }))
        }
        Err(e) => {
            error!("Error resetting session: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": e.to_string()}))
        }
    }
}

pub async fn handle_set_language(session: Session, req_body: web::Json<LanguageRequest>) -> HttpResponse {
    let language: Language = match req_body.language.parse() {
        Ok(language) => language,
        Err(e) => return HttpResponse::BadRequest().json(json!({"error": e.to_string()})),
    };

    let mut state = match load_state(&session) {
        Ok(state) => state,
        Err(resp) => return resp,
    };
    match state.set_language(&session, language) {
        Ok(()) => HttpResponse::Ok().json(json!({
            "language": state.language,
            "send_failed": state.language.phrase(Phrase::SendFailed),
        })),
        Err(e) => {
            error!("Error storing language preference: {}", e);
            HttpResponse::InternalServerError().json(json!({"error": e.to_string()}))
        }
    }
}
