//! Authorization-code flow against the music provider.

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;

use super::state::{ServerConfig, ServerState, Session};
use super::ServerError;

pub const SESSION_COOKIE: &str = "session_id";

/// Scope needed to read the user's saved tracks.
const SCOPE: &str = "user-library-read";

const LANDING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Planetarium</title>
  <link rel="stylesheet" href="/style/style.css">
</head>
<body>
  <h1>Planetarium</h1>
  <p>Your saved tracks, as a solar system.</p>
  <a class="button" href="/authorize">Log in</a>
</body>
</html>
"#;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Provider authorize URL for this client.
pub fn authorize_url(config: &ServerConfig) -> Result<reqwest::Url, ServerError> {
    reqwest::Url::parse_with_params(
        &config.authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("scope", SCOPE),
            ("redirect_uri", config.redirect_uri.as_str()),
        ],
    )
    .map_err(|_| ServerError::Config(format!("invalid authorize URL `{}`", config.authorize_url)))
}

pub async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

pub async fn authorize(State(state): State<ServerState>) -> Result<Redirect, ServerError> {
    let url = authorize_url(&state.config)?;
    Ok(Redirect::to(url.as_str()))
}

pub async fn callback(
    State(state): State<ServerState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ServerError> {
    if let Some(error) = query.error {
        log::warn!("Authorization denied: {}", error);
        return Ok(Redirect::to("/").into_response());
    }
    let code = query.code.ok_or(ServerError::MissingCode)?;
    let access_token = exchange_code(&state, &code).await?;

    let session_id = uuid::Uuid::new_v4().to_string();
    state.insert_session(session_id.clone(), Session::new(access_token)).await;
    log::info!("New session {}", session_id);

    let cookie = Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    Ok((jar.add(cookie), Redirect::to("/dashboard")).into_response())
}

/// Trade an authorization code for an access token, authenticating the
/// client with HTTP Basic credentials.
async fn exchange_code(state: &ServerState, code: &str) -> Result<String, ServerError> {
    let config = &state.config;
    let response = state
        .http
        .post(&config.token_url)
        .basic_auth(&config.client_id, Some(&config.client_secret))
        .form(&[
            ("code", code),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ServerError::UpstreamStatus(status.as_u16()));
    }
    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}

pub async fn logout(State(state): State<ServerState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.lock().await.remove(cookie.value()).is_some() {
            log::info!("Session {} logged out", cookie.value());
        }
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_client_and_scope() {
        let config = ServerConfig {
            client_id: "abc".into(),
            ..Default::default()
        };
        let url = authorize_url(&config).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.spotify.com"));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("client_id".into(), "abc".into())));
        assert!(pairs.contains(&("scope".into(), "user-library-read".into())));
        assert!(pairs.contains(&("redirect_uri".into(), "http://localhost:3000/callback".into())));
    }

    #[test]
    fn test_bad_authorize_url_is_a_config_error() {
        let config = ServerConfig {
            authorize_url: "not a url".into(),
            ..Default::default()
        };
        assert!(matches!(authorize_url(&config), Err(ServerError::Config(_))));
    }
}
