use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use tokio::sync::Mutex;

/// Settings for the `serve` subcommand.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory served as static files (page assets, wasm bundle).
    pub public_dir: PathBuf,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub authorize_url: String,
    pub token_url: String,
    /// Base URL of the provider's web API, without trailing slash.
    pub api_base: String,
    pub classifier: ClassifierConfig,
    /// Sessions kept in memory; the oldest is dropped past this.
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 3000,
            public_dir: PathBuf::from("public"),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            authorize_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base: "https://api.spotify.com/v1".to_string(),
            classifier: ClassifierConfig::default(),
            max_sessions: 1024,
        }
    }
}

/// External genre classifier, run as `<interpreter> <script> <url>`.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub interpreter: PathBuf,
    pub script: PathBuf,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        ClassifierConfig {
            interpreter: PathBuf::from("python3"),
            script: PathBuf::from("getGenre.py"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub created: Instant,
}

impl Session {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            created: Instant::now(),
        }
    }
}

pub type GuardedSessions = Arc<Mutex<HashMap<String, Session>>>;

#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<ServerConfig>,
    pub sessions: GuardedSessions,
    pub http: reqwest::Client,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            http: reqwest::Client::new(),
        }
    }

    pub async fn session(&self, id: &str) -> Option<Session> {
        self.sessions.lock().await.get(id).cloned()
    }

    /// Store a session. Sessions only end on logout, so the map is capped
    /// and the oldest session is evicted when full.
    pub async fn insert_session(&self, id: String, session: Session) {
        let mut sessions = self.sessions.lock().await;
        if !sessions.contains_key(&id) && sessions.len() >= self.config.max_sessions.max(1) {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, s)| s.created)
                .map(|(id, _)| id.clone());
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                log::info!("Session limit reached, evicted {}", oldest);
            }
        }
        sessions.insert(id, session);
    }
}

impl FromRef<ServerState> for GuardedSessions {
    fn from_ref(input: &ServerState) -> Self {
        input.sessions.clone()
    }
}

impl FromRef<ServerState> for Arc<ServerConfig> {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_at(token: &str, created: Instant) -> Session {
        Session {
            access_token: token.to_string(),
            created,
        }
    }

    #[tokio::test]
    async fn test_oldest_session_is_evicted_at_capacity() {
        let state = ServerState::new(ServerConfig {
            max_sessions: 2,
            ..Default::default()
        });
        let start = Instant::now();
        state.insert_session("a".into(), session_at("ta", start)).await;
        state
            .insert_session("b".into(), session_at("tb", start + std::time::Duration::from_secs(1)))
            .await;
        state
            .insert_session("c".into(), session_at("tc", start + std::time::Duration::from_secs(2)))
            .await;

        assert!(state.session("a").await.is_none());
        assert_eq!(state.session("b").await.unwrap().access_token, "tb");
        assert_eq!(state.session("c").await.unwrap().access_token, "tc");
        assert_eq!(state.sessions.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_replacing_a_session_does_not_evict() {
        let state = ServerState::new(ServerConfig {
            max_sessions: 1,
            ..Default::default()
        });
        state.insert_session("a".into(), Session::new("old".into())).await;
        state.insert_session("a".into(), Session::new("new".into())).await;
        assert_eq!(state.session("a").await.unwrap().access_token, "new");
    }
}
