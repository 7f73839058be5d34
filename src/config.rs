use std::env;
use std::time::Duration;
use url::Url;

pub fn init_logging() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
}

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const DEFAULT_STATIC_DIR: &str = "./static";
const DEFAULT_SCOPES: &str = "openid email phone";
const DEFAULT_CLIENT_IDLE_SECS: u64 = 3600;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub public_url: String,
    pub static_dir: String,
    /// Base64 encoded key material for the session cookie; at least 64 bytes once decoded.
    pub session_secret: Option<String>,
    pub cookie_secure: bool,
    pub client_idle_timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub auth_url: String,
    pub token_url: String,
    pub signup_url: Option<String>,
    pub logout_url: Option<String>,
    pub scopes: Vec<String>,
    pub redirect_uri: String,
    pub logout_redirect_uri: String,
}

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub api_url: String,
    /// Number of prior turns restored on page load. `None` shows the static welcome instead.
    pub history_turns: Option<u32>,
    pub request_timeout: Option<Duration>,
    pub label_links: bool,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup, so tests can supply a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let public_url = get("TRAVEL_CHAT_PUBLIC_URL")
            .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if let Err(e) = Url::parse(&public_url) {
            return Err(ConfigError::Invalid {
                name: "TRAVEL_CHAT_PUBLIC_URL",
                reason: e.to_string(),
            });
        }

        let server = ServerConfig {
            bind_addr: get("TRAVEL_CHAT_BIND").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            static_dir: get("TRAVEL_CHAT_STATIC_DIR").unwrap_or_else(|| DEFAULT_STATIC_DIR.to_string()),
            session_secret: get("TRAVEL_CHAT_SESSION_SECRET"),
            cookie_secure: parse_bool("TRAVEL_CHAT_COOKIE_SECURE", get("TRAVEL_CHAT_COOKIE_SECURE"), false)?,
            client_idle_timeout: Duration::from_secs(
                parse_number("TRAVEL_CHAT_CLIENT_IDLE_SECS", get("TRAVEL_CHAT_CLIENT_IDLE_SECS"))?
                    .unwrap_or(DEFAULT_CLIENT_IDLE_SECS),
            ),
            public_url: public_url.clone(),
        };

        let auth = AuthConfig {
            client_id: required("OIDC_CLIENT_ID")?,
            client_secret: get("OIDC_CLIENT_SECRET"),
            auth_url: required("OIDC_AUTH_URL")?,
            token_url: required("OIDC_TOKEN_URL")?,
            signup_url: get("OIDC_SIGNUP_URL"),
            logout_url: get("OIDC_LOGOUT_URL"),
            scopes: get("OIDC_SCOPES")
                .unwrap_or_else(|| DEFAULT_SCOPES.to_string())
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            redirect_uri: format!("{}/", public_url),
            logout_redirect_uri: get("OIDC_LOGOUT_REDIRECT_URI").unwrap_or_else(|| format!("{}/", public_url)),
        };

        let chat = ChatConfig {
            api_url: required("CHAT_API_URL")?,
            history_turns: parse_number("CHAT_HISTORY_TURNS", get("CHAT_HISTORY_TURNS"))?,
            request_timeout: parse_number("CHAT_REQUEST_TIMEOUT_SECS", get("CHAT_REQUEST_TIMEOUT_SECS"))?
                .map(Duration::from_secs),
            label_links: parse_bool("CHAT_LABEL_LINKS", get("CHAT_LABEL_LINKS"), true)?,
        };

        Ok(AppConfig { server, auth, chat })
    }
}

fn parse_bool(name: &'static str, value: Option<String>, default: bool) -> Result<bool, ConfigError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got {:?}", other),
        }),
    }
}

fn parse_number<T>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                reason: e.to_string(),
            })
        })
        .transpose()
}
