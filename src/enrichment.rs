//! Genre enrichment client.
//!
//! Looks up genre, tempo and loudness for every playable track through the
//! classifier endpoint and joins the answers back onto tracks by preview URL.
//! Failures are logged and never escape: a failed batch yields no tracks.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, Track};
use crate::config::{EnrichmentConfig, RequestMode};
use crate::error::EnrichmentError;
use crate::genre::{Genre, GenreInfo};

/// Loudness assumed when the classifier does not report one.
pub const DEFAULT_LOUDNESS: f32 = -60.0;

fn default_loudness() -> f32 {
    DEFAULT_LOUDNESS
}

/// One classification result as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub genre: Genre,
    #[serde(default)]
    pub tempo: f32,
    #[serde(default = "default_loudness")]
    pub loudness: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl GenreRecord {
    pub fn info(&self) -> GenreInfo {
        let info = GenreInfo::new(self.genre.clone(), self.tempo, self.loudness);
        match (self.x, self.z) {
            (Some(x), Some(z)) => info.with_hint(x, z),
            _ => info,
        }
    }
}

/// A playable track with its classification attached.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedTrack {
    pub track: Track,
    pub info: GenreInfo,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenreResponse {
    Many(Vec<GenreRecord>),
    One(GenreRecord),
}

/// Endpoint URL with one `previewUrl` parameter per requested URL.
pub fn build_query_url(endpoint: &str, urls: &[String]) -> Result<reqwest::Url, EnrichmentError> {
    let params = urls.iter().map(|url| ("previewUrl", url.as_str()));
    reqwest::Url::parse_with_params(endpoint, params)
        .map_err(|_| EnrichmentError::InvalidEndpoint(endpoint.to_string()))
}

/// Parse a classifier response body for the given request.
///
/// A bare object is accepted only when it can be attributed: either it names
/// its URL or exactly one URL was requested.
pub fn parse_body(body: &str, requested: &[String]) -> Result<Vec<GenreRecord>, EnrichmentError> {
    match serde_json::from_str::<GenreResponse>(body)? {
        GenreResponse::Many(records) => Ok(records),
        GenreResponse::One(mut record) => {
            if record.url.is_none() {
                match requested {
                    [only] => record.url = Some(only.clone()),
                    _ => return Err(EnrichmentError::AmbiguousRecord(requested.len())),
                }
            }
            Ok(vec![record])
        }
    }
}

/// Join records onto playable tracks by exact URL equality.
///
/// Output follows catalog order; response order does not matter. Tracks with
/// no matching record are skipped.
pub fn match_records(tracks: &[Track], records: &[GenreRecord]) -> Vec<EnrichedTrack> {
    let mut by_url: HashMap<&str, &GenreRecord> = HashMap::new();
    for record in records {
        if let Some(url) = record.url.as_deref() {
            by_url.entry(url).or_insert(record);
        }
    }

    tracks
        .iter()
        .filter_map(|track| {
            let url = track.playable_url()?;
            match by_url.get(url) {
                Some(record) => Some(EnrichedTrack {
                    track: track.clone(),
                    info: record.info(),
                }),
                None => {
                    log::debug!("No genre record for '{}', skipping", track.name);
                    None
                }
            }
        })
        .collect()
}

/// HTTP client for the classifier endpoint.
#[derive(Debug, Clone)]
pub struct EnrichmentClient {
    http: reqwest::Client,
    endpoint: String,
    mode: RequestMode,
}

impl EnrichmentClient {
    /// `config.endpoint` must be absolute here; the browser host resolves it
    /// against the page origin first.
    pub fn new(config: &EnrichmentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            mode: config.mode,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One request for the given URLs.
    pub async fn lookup(&self, urls: &[String]) -> Result<Vec<GenreRecord>, EnrichmentError> {
        if urls.is_empty() {
            return Err(EnrichmentError::EmptyBatch);
        }
        let url = build_query_url(&self.endpoint, urls)?;
        log::debug!("Requesting genres for {} preview URLs", urls.len());

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EnrichmentError::Status(status.as_u16()));
        }
        let body = response.text().await?;
        parse_body(&body, urls)
    }

    /// Classify every playable track of the catalog.
    ///
    /// Never fails: errors are logged and the affected tracks dropped.
    pub async fn enrich(&self, catalog: &Catalog) -> Vec<EnrichedTrack> {
        let urls = catalog.preview_urls();
        if urls.is_empty() {
            log::info!("No playable tracks to classify");
            return Vec::new();
        }

        let records = match self.mode {
            RequestMode::Batched => match self.lookup(&urls).await {
                Ok(records) => records,
                Err(e) => {
                    log::warn!("Genre lookup failed, no tracks will be shown: {}", e);
                    return Vec::new();
                }
            },
            RequestMode::PerTrack => {
                let mut records = Vec::with_capacity(urls.len());
                for url in &urls {
                    match self.lookup(std::slice::from_ref(url)).await {
                        Ok(found) => records.extend(found),
                        Err(e) => log::warn!("Genre lookup failed for {}: {}", url, e),
                    }
                }
                records
            }
        };

        let enriched = match_records(catalog.tracks(), &records);
        log::info!("Enriched {} of {} playable tracks", enriched.len(), urls.len());
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_query_url_repeats_preview_param() {
        let url = build_query_url(
            "http://localhost:3000/getGenre",
            &urls(&["https://p/a?x=1", "https://p/b"]),
        )
        .unwrap();
        let values: Vec<String> = url
            .query_pairs()
            .filter(|(k, _)| k == "previewUrl")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(values, urls(&["https://p/a?x=1", "https://p/b"]));
        assert_eq!(url.path(), "/getGenre");
    }

    #[test]
    fn test_relative_endpoint_is_rejected() {
        let err = build_query_url("/getGenre", &urls(&["u"])).unwrap_err();
        assert!(matches!(err, EnrichmentError::InvalidEndpoint(_)));
    }

    #[test]
    fn test_parse_array_body() {
        let body = r#"[
            { "url": "u2", "genre": "pop", "tempo": 100, "loudness": -5.5 },
            { "url": "u1", "genre": "rock", "tempo": 128.0, "loudness": -7, "x": 10, "z": -20 }
        ]"#;
        let records = parse_body(body, &urls(&["u1", "u2"])).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].genre, Genre::Rock);
        assert_eq!(records[1].info().hint.map(|h| (h.x, h.z)), Some((10.0, -20.0)));
    }

    #[test]
    fn test_single_object_is_attributed_to_sole_url() {
        let records = parse_body(r#"{ "genre": "Jazz" }"#, &urls(&["only"])).unwrap();
        assert_eq!(records[0].url.as_deref(), Some("only"));
        assert_eq!(records[0].loudness, DEFAULT_LOUDNESS);
        assert_eq!(records[0].tempo, 0.0);
    }

    #[test]
    fn test_single_object_for_batch_is_ambiguous() {
        let err = parse_body(r#"{ "genre": "Jazz" }"#, &urls(&["a", "b"])).unwrap_err();
        assert!(matches!(err, EnrichmentError::AmbiguousRecord(2)));
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            parse_body("<html>oops</html>", &urls(&["a"])),
            Err(EnrichmentError::Malformed(_))
        ));
    }

    #[test]
    fn test_match_is_order_independent_and_skips_missing() {
        let tracks = vec![
            Track::new("1", "One", Some("u1".into())),
            Track::new("2", "No preview", None),
            Track::new("3", "Three", Some("u3".into())),
            Track::new("4", "Unclassified", Some("u4".into())),
        ];
        let records = parse_body(
            r#"[{ "url": "u3", "genre": "classical", "tempo": 60, "loudness": -20 },
                { "url": "u1", "genre": "rock", "tempo": 120, "loudness": -6 }]"#,
            &urls(&["u1", "u3", "u4"]),
        )
        .unwrap();

        let enriched = match_records(&tracks, &records);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].track.id, "1");
        assert_eq!(enriched[0].info.genre, Genre::Rock);
        assert_eq!(enriched[1].track.id, "3");
        assert_eq!(enriched[1].info.loudness, -20.0);
    }
}
