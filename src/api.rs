use crate::catalog::Game;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = "gogshelf";

/// A remote action's terminal failure. `Rejected` carries the server's
/// `detail` string verbatim (or the caller's fallback when the body has
/// none); `Transport` is anything below the HTTP response level.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("{detail}")]
    Rejected { detail: String },
    #[error("{0}")]
    Transport(String),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthCheckResponse {
    #[serde(rename = "isAuthenticated")]
    is_authenticated: bool,
    #[serde(default)]
    detail: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ActionResponse {
    message: String,
}

/// `/manifest` payload. `downloaded_games` is optional on the wire and
/// decodes as empty when the server omits it.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub available_games: Vec<Game>,
    #[serde(default)]
    pub downloaded_games: Vec<Game>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    os_list: &'a [String],
    lang_list: &'a [String],
}

#[derive(Debug, Serialize)]
struct DownloadRequest<'a> {
    savedir: &'a str,
    os_list: &'a [String],
    lang_list: &'a [String],
    ids: &'a [String],
    compress_downloads: bool,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    ids: &'a [String],
    savedir: &'a str,
}

/// Everything the backend asks for when a download batch is submitted.
/// Assembled right before submission, not kept afterwards.
#[derive(Debug, Clone)]
pub struct DownloadDraft {
    pub savedir: String,
    pub os_list: Vec<String>,
    pub lang_list: Vec<String>,
    pub ids: Vec<String>,
    pub compress_downloads: bool,
}

/// Blocking client for the gogrepoc backend. Cheap to clone; worker
/// threads each take their own copy.
#[derive(Clone)]
pub struct ApiClient {
    agent: ureq::Agent,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        // Server-side update and download runs can take a long time, so the
        // read timeout is generous; connect stays short.
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(3600))
            .timeout_write(Duration::from_secs(30))
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `GET /check-auth`. The server answers 200 either way and flags the
    /// outcome in the body.
    pub fn check_auth(&self) -> Result<(), ApiError> {
        let response = self
            .agent
            .get(&self.url("/check-auth"))
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|err| classify(err, "Not authenticated. Please login."))?;
        let body: AuthCheckResponse = response
            .into_json()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        if body.is_authenticated {
            Ok(())
        } else {
            Err(ApiError::Rejected {
                detail: body
                    .detail
                    .unwrap_or_else(|| "Not authenticated. Please login.".to_string()),
            })
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        self.post_action(
            "/login",
            &LoginRequest { username, password },
            "Login failed",
        )
    }

    pub fn fetch_manifest(&self) -> Result<Manifest, ApiError> {
        let response = self
            .agent
            .get(&self.url("/manifest"))
            .set("User-Agent", USER_AGENT)
            .call()
            .map_err(|err| classify(err, "Failed to load games"))?;
        response
            .into_json()
            .map_err(|err| ApiError::Transport(err.to_string()))
    }

    pub fn update_catalog(
        &self,
        os_list: &[String],
        lang_list: &[String],
    ) -> Result<String, ApiError> {
        self.post_action(
            "/update",
            &UpdateRequest { os_list, lang_list },
            "Update failed",
        )
    }

    pub fn submit_download(&self, draft: &DownloadDraft) -> Result<String, ApiError> {
        self.post_action(
            "/download",
            &DownloadRequest {
                savedir: &draft.savedir,
                os_list: &draft.os_list,
                lang_list: &draft.lang_list,
                ids: &draft.ids,
                compress_downloads: draft.compress_downloads,
            },
            "Download failed",
        )
    }

    pub fn add_without_download(&self, ids: &[String], savedir: &str) -> Result<String, ApiError> {
        self.post_action(
            "/add_without_download",
            &AddRequest { ids, savedir },
            "Failed to add games",
        )
    }

    fn post_action<T: Serialize>(
        &self,
        path: &str,
        body: &T,
        fallback: &str,
    ) -> Result<String, ApiError> {
        let response = self
            .agent
            .post(&self.url(path))
            .set("User-Agent", USER_AGENT)
            .send_json(body)
            .map_err(|err| classify(err, fallback))?;
        let body: ActionResponse = response
            .into_json()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(body.message)
    }
}

/// Maps a ureq failure to the error taxonomy: an HTTP error status becomes
/// `Rejected` with the body's `detail` when present, otherwise `fallback`;
/// everything else is `Transport`.
fn classify(err: ureq::Error, fallback: &str) -> ApiError {
    match err {
        ureq::Error::Status(_, response) => {
            let detail = response
                .into_json::<ErrorBody>()
                .ok()
                .and_then(|body| body.detail)
                .filter(|detail| !detail.is_empty());
            ApiError::Rejected {
                detail: detail.unwrap_or_else(|| fallback.to_string()),
            }
        }
        ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_without_downloaded_games_decodes_empty() {
        let raw = r#"{"status": "success", "available_games": [{"id": 1, "title": "Tyrian 2000"}]}"#;
        let manifest: Manifest = serde_json::from_str(raw).expect("manifest");
        assert_eq!(manifest.available_games.len(), 1);
        assert!(manifest.downloaded_games.is_empty());
    }

    #[test]
    fn manifest_decodes_both_partitions() {
        let raw = r#"{
            "status": "success",
            "available_games": [{"id": 2, "title": "B"}, {"id": 1, "title": "A"}],
            "downloaded_games": [{"id": "abc123", "title": "C", "selectable": "False"}]
        }"#;
        let manifest: Manifest = serde_json::from_str(raw).expect("manifest");
        assert_eq!(manifest.available_games.len(), 2);
        assert_eq!(manifest.downloaded_games.len(), 1);
        assert_eq!(manifest.downloaded_games[0].id, "abc123");
    }

    #[test]
    fn error_body_detail_is_optional() {
        let with: ErrorBody = serde_json::from_str(r#"{"detail": "Invalid credentials"}"#).unwrap();
        assert_eq!(with.detail.as_deref(), Some("Invalid credentials"));
        let without: ErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(without.detail.is_none());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:8000/");
        assert_eq!(client.url("/manifest"), "http://localhost:8000/manifest");
    }
}
