use std::path::Path;
use actix_files::NamedFile;
use actix_session::Session;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{error, info};
use serde_json::json;
use crate::models::client_state::ClientState;
use crate::models::language::Phrase;
use crate::routes::app_state::AppState;
use crate::services::view_service::{self, CallbackParams, ViewState};

/// Serves the page. When the provider redirected back with a code, the code is
/// exchanged first and the browser is sent to the bare URL so a reload cannot
/// replay it.
pub async fn page(
    req: HttpRequest,
    data: web::Data<AppState>,
    session: Session,
    params: web::Query<CallbackParams>,
) -> HttpResponse {
    if params.is_callback() {
        let view = view_service::resolve_initial_view(&data.auth, &session, &params).await;
        info!("Sign-in callback resolved to {:?}", view);
        return HttpResponse::Found().append_header(("Location", "/")).finish();
    }

    let index = Path::new(&data.static_dir).join("index.html");
    match NamedFile::open_async(&index).await {
        Ok(file) => file.into_response(&req),
        Err(e) => {
            error!("Unable to open {}: {}", index.display(), e);
            HttpResponse::NotFound().body("Page not found")
        }
    }
}

/// Page-load state: which screen to show and, when signed in, the initial transcript.
pub async fn current_view(data: web::Data<AppState>, session: Session) -> HttpResponse {
    let state = match ClientState::load(&session) {
        Ok(state) => state,
        Err(e) => {
            error!("Error loading client state: {}", e);
            return HttpResponse::InternalServerError().json(json!({"error": e.to_string()}));
        }
    };

    match view_service::current_view(&data.auth, &session) {
        ViewState::LoggedOut => {
            data.registry.remove(&state.client_key);
            HttpResponse::Ok().json(json!({"state": "logged_out"}))
        }
        ViewState::LoggedIn { display_name } => {
            let controller = data.registry.replace(&state.client_key, data.new_controller());
            let mut controller = controller.lock().await;
            let messages = controller.enter_logged_in(&state).await.to_vec();
            HttpResponse::Ok().json(json!({
                "state": "logged_in",
                "user": display_name,
                "language": state.language,
                "messages": messages,
                "input_enabled": controller.is_input_enabled(),
                "loading": data.renderer.loading_placeholder(),
                "send_failed": state.language.phrase(Phrase::SendFailed),
            }))
        }
    }
}
