use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use log::{debug, error, info, warn};
use oauth2::basic::{
    BasicErrorResponse, BasicRevocationErrorResponse, BasicTokenIntrospectionResponse, BasicTokenType,
};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, ExtraTokenFields,
    PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope, StandardRevocableToken,
    StandardTokenResponse, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use crate::config::AuthConfig;
use crate::models::authenticated_user::AuthenticatedUser;
use crate::models::client_state::{load_user, store_user};
use crate::models::client_storage::{ClientStorage, StorageError, OAUTH_STATE_KEY, PKCE_VERIFIER_KEY};

/// Token endpoint fields beyond the OAuth2 basics; OpenID providers add the ID token here.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IdTokenFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

impl ExtraTokenFields for IdTokenFields {}

pub type OidcTokenResponse = StandardTokenResponse<IdTokenFields, BasicTokenType>;

type OidcClient = Client<
    BasicErrorResponse,
    OidcTokenResponse,
    BasicTokenType,
    BasicTokenIntrospectionResponse,
    StandardRevocableToken,
    BasicRevocationErrorResponse,
>;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid {name} URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthCallbackError {
    #[error("Returned state does not match the pending sign-in")]
    StateMismatch,

    #[error("No sign-in is pending for this browser")]
    MissingVerifier,

    #[error("Code exchange failed: {0}")]
    Exchange(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Authorization-code login against the identity provider, with tokens cached in client storage.
pub struct AuthAdapter {
    client: OidcClient,
    scopes: Vec<String>,
    signup_url: Option<Url>,
    sign_out_url: Url,
}

impl AuthAdapter {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let auth_url = AuthUrl::new(config.auth_url.clone()).map_err(|e| invalid("authorization", e))?;
        let token_url = TokenUrl::new(config.token_url.clone()).map_err(|e| invalid("token", e))?;
        let redirect_url = RedirectUrl::new(config.redirect_uri.clone()).map_err(|e| invalid("redirect", e))?;

        let client = OidcClient::new(
            ClientId::new(config.client_id.clone()),
            config.client_secret.clone().map(ClientSecret::new),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        let signup_url = config
            .signup_url
            .as_deref()
            .map(Url::parse)
            .transpose()
            .map_err(|e| invalid("sign-up", e))?;

        // Without a provider logout endpoint, signing out just returns to the app.
        let sign_out_url = match config.logout_url.as_deref() {
            Some(logout_url) => Url::parse_with_params(
                logout_url,
                &[
                    ("client_id", config.client_id.as_str()),
                    ("logout_uri", config.logout_redirect_uri.as_str()),
                ],
            )
            .map_err(|e| invalid("logout", e))?,
            None => Url::parse(&config.logout_redirect_uri).map_err(|e| invalid("logout redirect", e))?,
        };

        Ok(AuthAdapter {
            client,
            scopes: config.scopes.clone(),
            signup_url,
            sign_out_url,
        })
    }

    /// Builds the provider authorization URL and records the pending state and PKCE verifier.
    pub fn begin_sign_in(&self, storage: &dyn ClientStorage) -> Result<Url, AuthError> {
        self.authorization_url(storage, false)
    }

    /// Like sign-in, but lands the user on the provider's registration page.
    pub fn begin_sign_up(&self, storage: &dyn ClientStorage) -> Result<Url, AuthError> {
        let url = self.authorization_url(storage, self.signup_url.is_none())?;
        match &self.signup_url {
            Some(signup_url) => {
                let mut target = signup_url.clone();
                target.set_query(url.query());
                Ok(target)
            }
            None => Ok(url),
        }
    }

    fn authorization_url(&self, storage: &dyn ClientStorage, signup_hint: bool) -> Result<Url, AuthError> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut request = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(self.scopes.iter().cloned().map(Scope::new))
            .set_pkce_challenge(pkce_challenge);
        if signup_hint {
            request = request.add_extra_param("screen_hint", "signup");
        }
        let (url, csrf_token) = request.url();

        storage.set_item(OAUTH_STATE_KEY, csrf_token.secret())?;
        storage.set_item(PKCE_VERIFIER_KEY, pkce_verifier.secret())?;
        info!("Redirecting to identity provider");
        Ok(url)
    }

    /// Exchanges the authorization code for tokens and caches the resulting user.
    ///
    /// The pending state is consumed whether or not the exchange succeeds, so a
    /// code can only ever be tried once.
    pub async fn complete_sign_in_callback(
        &self,
        storage: &dyn ClientStorage,
        code: &str,
        returned_state: Option<&str>,
    ) -> Result<AuthenticatedUser, AuthCallbackError> {
        let expected_state = storage.get_item(OAUTH_STATE_KEY);
        let verifier = storage.get_item(PKCE_VERIFIER_KEY);
        self.clear_pending(storage);

        let verifier = verifier.ok_or(AuthCallbackError::MissingVerifier)?;
        match (expected_state.as_deref(), returned_state) {
            (Some(expected), Some(returned)) if expected == returned => {}
            _ => {
                warn!("Rejecting sign-in callback with mismatched state");
                return Err(AuthCallbackError::StateMismatch);
            }
        }

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                error!("Token exchange error: {:?}", e);
                AuthCallbackError::Exchange(e.to_string())
            })?;

        let user = user_from_token(&token);
        store_user(storage, &user)?;
        info!("Signed in {}", user.display_name());
        Ok(user)
    }

    /// Drops any half-finished sign-in.
    pub fn clear_pending(&self, storage: &dyn ClientStorage) {
        storage.remove_item(OAUTH_STATE_KEY);
        storage.remove_item(PKCE_VERIFIER_KEY);
    }

    pub fn current_user(&self, storage: &dyn ClientStorage) -> Option<AuthenticatedUser> {
        load_user(storage)
    }

    pub fn is_session_valid(&self, storage: &dyn ClientStorage) -> bool {
        self.current_user(storage).map_or(false, |user| user.is_valid())
    }

    /// Clears all client storage and returns where the browser should go next.
    pub fn sign_out(&self, storage: &dyn ClientStorage) -> Url {
        storage.clear();
        info!("Signed out; navigating to {}", self.sign_out_url);
        self.sign_out_url.clone()
    }
}

fn invalid(name: &'static str, error: url::ParseError) -> AuthError {
    AuthError::InvalidUrl {
        name,
        reason: error.to_string(),
    }
}

fn user_from_token(token: &OidcTokenResponse) -> AuthenticatedUser {
    let now = Utc::now();
    let expires_at = token
        .expires_in()
        .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
        .map(|lifetime| now + lifetime);

    AuthenticatedUser {
        email: token.extra_fields().id_token.as_deref().and_then(email_from_id_token),
        access_token: token.access_token().secret().to_string(),
        expires_at,
    }
}

/// Reads the `email` claim from a JWT payload. The token comes straight from the
/// token endpoint over TLS, so its signature is not re-verified here.
pub fn email_from_id_token(id_token: &str) -> Option<String> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = match URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("ID token payload is not base64url: {}", e);
            return None;
        }
    };
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("email").and_then(Value::as_str).map(str::to_string)
}
