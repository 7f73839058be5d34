use actix_files::Files;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::Key;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{info, warn};
use travel_chat::config::{self, AppConfig};
use travel_chat::routes::{self, app_state::AppState};

fn session_key(secret: Option<&str>) -> anyhow::Result<Key> {
    match secret {
        Some(secret) => {
            let bytes = STANDARD
                .decode(secret)
                .context("TRAVEL_CHAT_SESSION_SECRET is not valid base64")?;
            Key::try_from(bytes.as_slice())
                .context("TRAVEL_CHAT_SESSION_SECRET must decode to at least 64 bytes")
        }
        None => {
            warn!("No session secret configured; sessions will not survive a restart");
            Ok(Key::generate())
        }
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    config::init_logging();

    let config = AppConfig::from_env()?;
    let key = session_key(config.server.session_secret.as_deref())?;
    let state = web::Data::new(AppState::from_config(&config)?);
    let static_dir = config.server.static_dir.clone();
    let cookie_secure = config.server.cookie_secure;

    info!("Starting server on {}", config.server.public_url);
    HttpServer::new(move || {
        App::new()
            // Use the Logger middleware to log incoming requests.
            .wrap(Logger::default())
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(cookie_secure)
                    .build(),
            )
            .app_data(state.clone())
            .configure(routes::configure)
            .service(Files::new("/static", &static_dir))
    })
    .bind(&config.server.bind_addr)?
    .run()
    .await?;

    Ok(())
}
