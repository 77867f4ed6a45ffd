//! The mapping file as a GitHub contents-API blob.
//!
//! Reads return the decoded file text plus its blob sha; writes send the
//! sha observed at the last read, so a concurrent commit to the file turns
//! into an explicit ConcurrentModification instead of a silent overwrite.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use super::{Client, API_ROOT, USER_AGENT};
use crate::store::{RemoteBlob, StoreError, VersionToken};

/// One file in the client's repository, addressed by path.
pub struct RepoFile {
    client: Client,
    path: String,
    commit_message: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
    encoding: String,
}

impl RepoFile {
    pub(super) fn new(client: Client, path: String, commit_message: String) -> Self {
        RepoFile {
            client,
            path,
            commit_message,
        }
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            API_ROOT, self.client.owner, self.client.repo, self.path
        )
    }
}

#[async_trait]
impl RemoteBlob for RepoFile {
    async fn fetch(&self) -> Result<(String, VersionToken), StoreError> {
        let response = self
            .client
            .http
            .get(self.contents_url())
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.client.token)
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;

        let contents: ContentsResponse = response.json().await.map_err(unavailable)?;
        if contents.encoding != "base64" {
            return Err(StoreError::Unavailable(format!(
                "unexpected encoding `{}` for {}",
                contents.encoding, self.path
            )));
        }

        let text = decode_base64_content(&contents.content)?;
        debug!(path = %self.path, bytes = text.len(), sha = %contents.sha, "fetched file");
        Ok((text, VersionToken(contents.sha)))
    }

    async fn store(&self, content: &str, token: &VersionToken) -> Result<(), StoreError> {
        let payload = serde_json::json!({
            "message": self.commit_message,
            "content": STANDARD.encode(content),
            "sha": token.0,
        });

        let response = self
            .client
            .http
            .put(self.contents_url())
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.client.token)
            .json(&payload)
            .send()
            .await
            .map_err(unavailable)?;

        // The contents API answers 409 when the sha no longer matches
        if response.status() == StatusCode::CONFLICT {
            return Err(StoreError::ConcurrentModification);
        }
        response.error_for_status().map_err(unavailable)?;
        debug!(path = %self.path, "updated file");
        Ok(())
    }
}

fn unavailable(err: reqwest::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

/// Decode contents-API base64, which arrives chunked with embedded newlines.
fn decode_base64_content(raw: &str) -> Result<String, StoreError> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|err| StoreError::Unavailable(format!("base64 decode failed: {}", err)))?;
    String::from_utf8(bytes)
        .map_err(|err| StoreError::Unavailable(format!("file is not UTF-8: {}", err)))
}
