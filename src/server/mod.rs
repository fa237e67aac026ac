//! Native web server: OAuth session proxy, dashboard, classifier bridge and
//! static files.

mod classify;
mod dashboard;
mod oauth;
mod state;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use thiserror::Error;
use tower_http::services::ServeDir;

pub use classify::{parse_output, run_classifier, Classification};
pub use dashboard::{render_dashboard, UserProfile};
pub use oauth::{authorize_url, SESSION_COOKIE};
pub use state::{ClassifierConfig, ServerConfig, ServerState, Session};

/// Request failures, mapped onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing authorization code")]
    MissingCode,

    #[error("Missing previewUrl parameter")]
    MissingPreviewUrl,

    #[error("provider request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("provider answered HTTP {0}")]
    UpstreamStatus(u16),

    #[error("failed to start classifier: {0}")]
    ClassifierSpawn(std::io::Error),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("server misconfigured: {0}")]
    Config(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::MissingCode | ServerError::MissingPreviewUrl => StatusCode::BAD_REQUEST,
            ServerError::Upstream(_) | ServerError::UpstreamStatus(_) => StatusCode::BAD_GATEWAY,
            ServerError::ClassifierSpawn(_) | ServerError::Encode(_) | ServerError::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        } else {
            log::info!("Rejected request: {}", self);
        }
        (status, self.to_string()).into_response()
    }
}

pub fn make_app(state: ServerState) -> Router {
    let public_dir = state.config.public_dir.clone();
    Router::new()
        .route("/", get(oauth::landing))
        .route("/authorize", get(oauth::authorize))
        .route("/callback", get(oauth::callback))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/getGenre", get(classify::get_genre))
        .route("/logout", get(oauth::logout))
        .with_state(state)
        .fallback_service(ServeDir::new(public_dir))
}

pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        log::warn!("Client credentials are not set, /callback will fail");
    }
    let address = format!("{}:{}", config.host, config.port);
    let app = make_app(ServerState::new(config));

    let listener = tokio::net::TcpListener::bind(&address).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);
    Ok(axum::serve(listener, app).await?)
}
