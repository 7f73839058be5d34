mod common;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};
use travel_chat::routes::{self, app_state::AppState};
use travel_chat::services::transport_service::ChatTransport;
use common::{spawn_token_endpoint, test_config, FakeTokenEndpoint, StubTransport};

const SESSION_COOKIE: &str = "id";

/// Issues a request carrying the current session cookie and keeps whatever cookie comes back.
macro_rules! call {
    ($app:expr, $jar:expr, $req:expr) => {{
        let mut req = $req;
        if let Some(cookie) = $jar.clone() {
            req = req.cookie(cookie);
        }
        let resp = test::call_service(&$app, req.to_request()).await;
        if let Some(cookie) = resp.response().cookies().find(|c| c.name() == SESSION_COOKIE) {
            $jar = Some(cookie.into_owned());
        }
        resp
    }};
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new($state))
                .configure(routes::configure),
        )
        .await
    };
}

/// Runs the login round trip and the first page load, leaving a signed-in session in the jar.
macro_rules! sign_in {
    ($app:expr, $jar:expr) => {{
        let resp = call!($app, $jar, test::TestRequest::get().uri("/auth/login"));
        let callback = format!("/?code=good-code&state={}", state_param(&location(&resp)));
        call!($app, $jar, test::TestRequest::get().uri(&callback));
        call!($app, $jar, test::TestRequest::get().uri("/api/view"));
    }};
}

fn state_with(transport: Arc<StubTransport>) -> AppState {
    let token_url = spawn_token_endpoint(FakeTokenEndpoint {
        accept_code: "good-code".to_string(),
        forms: Arc::new(Mutex::new(Vec::<HashMap<String, String>>::new())),
    });
    let config = test_config(&token_url, &[]);
    AppState::new(&config, transport as Arc<dyn ChatTransport>).unwrap()
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn state_param(location: &str) -> String {
    url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .unwrap()
}

#[actix_web::test]
async fn test_logged_out_send_never_reaches_transport() {
    common::init_logging();
    let transport = Arc::new(StubTransport::replying());
    let app = app!(state_with(transport.clone()));
    let mut jar: Option<Cookie<'static>> = None;

    let resp = call!(app, jar, test::TestRequest::get().uri("/api/view"));
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view, json!({"state": "logged_out"}));

    let resp = call!(
        app,
        jar,
        test::TestRequest::post().uri("/api/messages").set_json(json!({"message": "Hotels in Rome"}))
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[0]["content"], "Please sign in to continue");
    assert_eq!(transport.call_count(), 0);
}

#[actix_web::test]
async fn test_sign_in_then_chat() {
    let transport = Arc::new(StubTransport::replying());
    let app = app!(state_with(transport.clone()));
    let mut jar: Option<Cookie<'static>> = None;

    let resp = call!(app, jar, test::TestRequest::get().uri("/auth/login"));
    assert_eq!(resp.status(), StatusCode::FOUND);
    let authorize = location(&resp);
    assert!(authorize.starts_with("https://auth.example/oauth2/authorize?"));

    let callback = format!("/?code=good-code&state={}", state_param(&authorize));
    let resp = call!(app, jar, test::TestRequest::get().uri(&callback));
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    let resp = call!(app, jar, test::TestRequest::get().uri("/api/view"));
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view["state"], "logged_in");
    assert_eq!(view["user"], "ana@example.com");
    assert_eq!(view["input_enabled"], true);
    assert_eq!(view["messages"].as_array().unwrap().len(), 1);
    assert_eq!(view["messages"][0]["role"], "system");
    assert_eq!(view["loading"]["role"], "assistant");
    assert_eq!(view["loading"]["html"].as_str().unwrap().matches("class=\"loading\"").count(), 3);
    assert_eq!(
        view["send_failed"],
        "Sorry, there was an error processing your request. Please try again."
    );

    let resp = call!(
        app,
        jar,
        test::TestRequest::post().uri("/api/messages").set_json(json!({"message": "Lisbon"}))
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["input_enabled"], true);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[1]["role"], "assistant");
    assert_eq!(messages[1]["html"], "You asked about <strong>Lisbon</strong>");
    assert_eq!(transport.call_count(), 1);
    assert_eq!(transport.tokens.lock().unwrap().as_slice(), ["access-token-1".to_string()]);
}

#[actix_web::test]
async fn test_failed_send_keeps_user_message() {
    let transport = Arc::new(StubTransport::failing());
    let app = app!(state_with(transport.clone()));
    let mut jar: Option<Cookie<'static>> = None;
    sign_in!(app, jar);

    let resp = call!(
        app,
        jar,
        test::TestRequest::post().uri("/api/messages").set_json(json!({"message": "Oslo"}))
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Oslo");
    assert_eq!(messages[1]["role"], "system");
    assert_eq!(
        messages[1]["content"],
        "Sorry, there was an error processing your request. Please try again."
    );
    assert_eq!(body["input_enabled"], true);
    assert_eq!(transport.call_count(), 1);
}

#[actix_web::test]
async fn test_second_send_is_rejected_while_first_is_outstanding() {
    let transport = Arc::new(StubTransport::gated());
    let app = app!(state_with(transport.clone()));
    let mut jar: Option<Cookie<'static>> = None;
    sign_in!(app, jar);
    let cookie = jar.clone().unwrap();
    let gate = transport.gate.as_ref().unwrap();

    let first = test::TestRequest::post()
        .uri("/api/messages")
        .cookie(cookie.clone())
        .set_json(json!({"message": "first"}))
        .to_request();
    let second = test::TestRequest::post()
        .uri("/api/messages")
        .cookie(cookie)
        .set_json(json!({"message": "second"}))
        .to_request();

    let (first, second) = tokio::join!(test::call_service(&app, first), async {
        gate.entered.notified().await;
        let resp = test::call_service(&app, second).await;
        gate.release.notify_one();
        resp
    });

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(transport.call_count(), 1);
}

#[actix_web::test]
async fn test_reset_issues_new_session_id() {
    let transport = Arc::new(StubTransport::replying());
    let app = app!(state_with(transport));
    let mut jar: Option<Cookie<'static>> = None;
    sign_in!(app, jar);

    let resp = call!(app, jar, test::TestRequest::post().uri("/api/reset"));
    let first: Value = test::read_body_json(resp).await;
    let resp = call!(app, jar, test::TestRequest::post().uri("/api/reset"));
    let second: Value = test::read_body_json(resp).await;

    assert_ne!(first["session_id"], second["session_id"]);
    assert_eq!(second["messages"].as_array().unwrap().len(), 1);
    assert_eq!(
        second["messages"][0]["content"],
        "Conversation reset. How can I help you plan your trip?"
    );
}

#[actix_web::test]
async fn test_language_preference() {
    let transport = Arc::new(StubTransport::failing());
    let app = app!(state_with(transport));
    let mut jar: Option<Cookie<'static>> = None;
    sign_in!(app, jar);

    let resp = call!(
        app,
        jar,
        test::TestRequest::put().uri("/api/language").set_json(json!({"language": "fr"}))
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = call!(
        app,
        jar,
        test::TestRequest::put().uri("/api/language").set_json(json!({"language": "de"}))
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["language"], "de");
    assert_eq!(
        body["send_failed"],
        "Entschuldigung, bei der Verarbeitung deiner Anfrage ist ein Fehler aufgetreten. Bitte versuche es erneut."
    );

    let resp = call!(
        app,
        jar,
        test::TestRequest::post().uri("/api/messages").set_json(json!({"message": "Hallo"}))
    );
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(
        body["messages"][1]["content"],
        "Entschuldigung, bei der Verarbeitung deiner Anfrage ist ein Fehler aufgetreten. Bitte versuche es erneut."
    );
}

#[actix_web::test]
async fn test_sign_out_forgets_the_user() {
    let transport = Arc::new(StubTransport::replying());
    let app = app!(state_with(transport));
    let mut jar: Option<Cookie<'static>> = None;
    sign_in!(app, jar);

    let resp = call!(app, jar, test::TestRequest::post().uri("/auth/logout"));
    assert_eq!(resp.status(), StatusCode::FOUND);
    let target = url::Url::parse(&location(&resp)).unwrap();
    assert_eq!(target.path(), "/logout");
    assert!(target.query_pairs().any(|(k, v)| k == "logout_uri" && v == "http://localhost:8080/"));

    let resp = call!(app, jar, test::TestRequest::get().uri("/api/view"));
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view["state"], "logged_out");
}

#[actix_web::test]
async fn test_sign_out_link_cannot_be_followed_with_get() {
    let transport = Arc::new(StubTransport::replying());
    let app = app!(state_with(transport));
    let mut jar: Option<Cookie<'static>> = None;
    sign_in!(app, jar);

    let resp = call!(app, jar, test::TestRequest::get().uri("/auth/logout"));
    assert!(!resp.status().is_success());
    assert_ne!(resp.status(), StatusCode::FOUND);

    let resp = call!(app, jar, test::TestRequest::get().uri("/api/view"));
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view["state"], "logged_in");
}

#[actix_web::test]
async fn test_bad_callback_lands_on_login_screen() {
    let transport = Arc::new(StubTransport::replying());
    let app = app!(state_with(transport));
    let mut jar: Option<Cookie<'static>> = None;

    call!(app, jar, test::TestRequest::get().uri("/auth/login"));
    let resp = call!(app, jar, test::TestRequest::get().uri("/?code=good-code&state=forged"));
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");

    let resp = call!(app, jar, test::TestRequest::get().uri("/api/view"));
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view["state"], "logged_out");
}
