//! The dashboard page: user profile plus the saved-tracks catalog the
//! browser host turns into a planetarium.

use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::oauth::SESSION_COOKIE;
use super::state::ServerState;
use super::ServerError;

/// Number of saved tracks requested from the provider.
const TRACK_LIMIT: u32 = 50;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl UserProfile {
    pub fn name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Deserialize)]
struct SavedTracksPage {
    #[serde(default)]
    items: Vec<serde_json::Value>,
}

pub async fn dashboard(State(state): State<ServerState>, jar: CookieJar) -> Result<Response, ServerError> {
    let session = match jar.get(SESSION_COOKIE) {
        Some(cookie) => state.session(cookie.value()).await,
        None => None,
    };
    let Some(session) = session else {
        return Ok(Redirect::to("/").into_response());
    };

    let user: UserProfile = get_api(&state, "/me", &session.access_token).await?;
    let tracks: SavedTracksPage = get_api(
        &state,
        &format!("/me/tracks?limit={}", TRACK_LIMIT),
        &session.access_token,
    )
    .await?;
    log::info!("Dashboard for {} with {} tracks", user.name(), tracks.items.len());

    let items = serde_json::to_string(&tracks.items)?;
    Ok(Html(render_dashboard(&user, &items)).into_response())
}

async fn get_api<T: DeserializeOwned>(state: &ServerState, endpoint: &str, token: &str) -> Result<T, ServerError> {
    let response = state
        .http
        .get(format!("{}{}", state.config.api_base, endpoint))
        .bearer_auth(token)
        .send()
        .await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ServerError::UpstreamStatus(status.as_u16()));
    }
    Ok(response.json().await?)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Dashboard HTML. The catalog is embedded as a JSON data block; `</` is
/// escaped so track names cannot close the script element.
pub fn render_dashboard(user: &UserProfile, items_json: &str) -> String {
    let catalog = items_json.replace("</", "<\\/");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Planetarium</title>
  <link rel="stylesheet" href="/style/style.css">
</head>
<body>
  <header>
    <span class="user">{name}</span>
    <a class="button" href="/logout">Log out</a>
  </header>
  <canvas id="planetarium"></canvas>
  <div id="labels"></div>
  <aside id="side-panel"></aside>
  <div id="waveform"></div>
  <script id="catalog" type="application/json">{catalog}</script>
  <script type="module" src="/style/script.js"></script>
</body>
</html>
"#,
        name = escape_html(user.name()),
        catalog = catalog,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn embedded_catalog(html: &str) -> &str {
        let start = html.find(r#"type="application/json">"#).unwrap() + r#"type="application/json">"#.len();
        let end = start + html[start..].find("</script>").unwrap();
        &html[start..end]
    }

    #[test]
    fn test_dashboard_embeds_parseable_catalog() {
        let items = r#"[{"track":{"id":"1","name":"A </script> B","preview_url":"u1"}}]"#;
        let user = UserProfile {
            id: "me".into(),
            display_name: Some("<Ada>".into()),
        };
        let html = render_dashboard(&user, items);

        assert!(html.contains("&lt;Ada&gt;"));
        let embedded = embedded_catalog(&html).replace("<\\/", "</");
        let catalog = Catalog::from_json(&embedded).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.tracks()[0].name, "A </script> B");
    }

    #[test]
    fn test_profile_name_falls_back_to_id() {
        let user: UserProfile = serde_json::from_str(r#"{"id":"u42"}"#).unwrap();
        assert_eq!(user.name(), "u42");
    }
}
