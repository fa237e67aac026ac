//! `/getGenre`: runs the external classifier once per preview URL.

use axum::extract::State;
use axum::Json;
use axum_extra::extract::Query;
use serde::Deserialize;

use super::state::{ClassifierConfig, ServerState};
use super::ServerError;
use crate::enrichment::GenreRecord;

#[derive(Debug, Deserialize)]
pub struct GenreQuery {
    #[serde(rename = "previewUrl", default)]
    pub preview_urls: Vec<String>,
}

/// Outcome of one classifier run that did start.
#[derive(Debug)]
pub enum Classification {
    Record(GenreRecord),
    Failed(String),
}

pub async fn get_genre(
    State(state): State<ServerState>,
    Query(query): Query<GenreQuery>,
) -> Result<Json<Vec<GenreRecord>>, ServerError> {
    let urls: Vec<String> = query.preview_urls.into_iter().filter(|u| !u.is_empty()).collect();
    if urls.is_empty() {
        return Err(ServerError::MissingPreviewUrl);
    }
    log::info!("Classifying {} preview URLs", urls.len());

    let mut records = Vec::with_capacity(urls.len());
    for url in &urls {
        match run_classifier(&state.config.classifier, url).await? {
            Classification::Record(record) => records.push(record),
            Classification::Failed(reason) => log::warn!("Classifier failed for {}: {}", url, reason),
        }
    }
    Ok(Json(records))
}

/// Run `<interpreter> <script> <url>` and parse its stdout.
///
/// Only a failure to start the process is an error; a bad exit status or
/// unparseable output is reported as [`Classification::Failed`].
pub async fn run_classifier(config: &ClassifierConfig, url: &str) -> Result<Classification, ServerError> {
    let output = tokio::process::Command::new(&config.interpreter)
        .arg(&config.script)
        .arg(url)
        .output()
        .await
        .map_err(ServerError::ClassifierSpawn)?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        log::debug!("Classifier stderr for {}: {}", url, stderr.trim());
    }
    if !output.status.success() {
        return Ok(Classification::Failed(format!("exited with {}", output.status)));
    }
    Ok(parse_output(&String::from_utf8_lossy(&output.stdout), url))
}

/// The classifier prints one JSON object, possibly after other output;
/// the last non-empty line is taken.
pub fn parse_output(stdout: &str, url: &str) -> Classification {
    let Some(line) = stdout.lines().rev().map(str::trim).find(|l| !l.is_empty()) else {
        return Classification::Failed("no output".to_string());
    };
    match serde_json::from_str::<GenreRecord>(line) {
        Ok(mut record) => {
            record.url = Some(url.to_string());
            Classification::Record(record)
        }
        Err(e) => Classification::Failed(format!("unparseable output: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genre::Genre;

    #[test]
    fn test_parse_output_fills_defaults_and_url() {
        let parsed = parse_output("loading model...\n{\"genre\": \"Rock\"}\n", "u1");
        match parsed {
            Classification::Record(record) => {
                assert_eq!(record.url.as_deref(), Some("u1"));
                assert_eq!(record.genre, Genre::Rock);
                assert_eq!(record.tempo, 0.0);
                assert_eq!(record.loudness, -60.0);
            }
            other => panic!("expected record, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_output_rejects_garbage() {
        assert!(matches!(parse_output("", "u"), Classification::Failed(_)));
        assert!(matches!(parse_output("Traceback ...", "u"), Classification::Failed(_)));
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let config = ClassifierConfig {
            interpreter: "/nonexistent/interpreter".into(),
            script: "classify.py".into(),
        };
        let result = run_classifier(&config, "u").await;
        assert!(matches!(result, Err(ServerError::ClassifierSpawn(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_classifier_output_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("classify.sh");
        std::fs::write(&script, "echo '{\"genre\":\"Jazz\",\"tempo\":98,\"loudness\":-12}'\n").unwrap();
        let config = ClassifierConfig {
            interpreter: "sh".into(),
            script,
        };
        match run_classifier(&config, "u9").await.unwrap() {
            Classification::Record(record) => {
                assert_eq!(record.genre, Genre::Jazz);
                assert_eq!(record.tempo, 98.0);
                assert_eq!(record.loudness, -12.0);
                assert_eq!(record.url.as_deref(), Some("u9"));
            }
            other => panic!("expected record, got {:?}", other),
        }
    }
}
