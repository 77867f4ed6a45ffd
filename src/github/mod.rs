pub mod contents;

pub use contents::RepoFile;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("GitHub API request failed: {0}")]
    ApiRequest(#[from] reqwest::Error),

    #[error("Invalid repository slug (expected owner/name): {0}")]
    InvalidRepo(String),
}

const API_ROOT: &str = "https://api.github.com";
const USER_AGENT: &str = "registry-bot";
const PAGE_SIZE: usize = 100;

/// Split an "owner/name" slug into its two parts.
pub fn parse_repo_slug(slug: &str) -> Result<(String, String), GithubError> {
    match slug.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GithubError::InvalidRepo(slug.to_string())),
    }
}

/// One issue as returned by the issues endpoint. The body is null for
/// issues opened with an empty description.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub body: Option<String>,
    /// Present when the "issue" is actually a pull request
    #[serde(default)]
    pull_request: Option<serde_json::Value>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Minimal GitHub REST client scoped to one repository. Cheap to clone:
/// reqwest's client is reference-counted internally.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    owner: String,
    repo: String,
    token: String,
}

impl Client {
    pub fn new(owner: String, repo: String, token: String) -> Self {
        Client {
            http: reqwest::Client::new(),
            owner,
            repo,
            token,
        }
    }

    /// Browsable URL for a file at the root ref of this repository.
    pub fn blob_url(&self, path: &str) -> String {
        format!(
            "https://github.com/{}/{}/blob/main/{}",
            self.owner, self.repo, path
        )
    }

    /// Handle on a file in this repository, addressed through the contents
    /// API. Implements the store's RemoteBlob trait.
    pub fn repo_file(&self, path: &str, commit_message: &str) -> RepoFile {
        RepoFile::new(self.clone(), path.to_string(), commit_message.to_string())
    }

    /// List all open issues carrying `label`. Paginates until a short page;
    /// pull requests (which the issues endpoint also returns) are dropped.
    #[instrument(skip(self), fields(owner = %self.owner, repo = %self.repo))]
    pub async fn list_open_issues(&self, label: &str) -> Result<Vec<Issue>, GithubError> {
        let url = format!("{}/repos/{}/{}/issues", API_ROOT, self.owner, self.repo);
        let mut issues = Vec::new();
        let mut page = 1u32;

        loop {
            let batch: Vec<Issue> = self
                .http
                .get(&url)
                .query(&[
                    ("state", "open"),
                    ("labels", label),
                    ("per_page", &PAGE_SIZE.to_string()),
                    ("page", &page.to_string()),
                ])
                .header("User-Agent", USER_AGENT)
                .bearer_auth(&self.token)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            let fetched = batch.len();
            issues.extend(batch.into_iter().filter(|issue| !issue.is_pull_request()));
            debug!(page, fetched, "fetched issues page");

            if fetched < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        Ok(issues)
    }

    /// Post one comment on an issue.
    #[instrument(skip(self, body), fields(issue = number))]
    pub async fn create_comment(&self, number: u64, body: &str) -> Result<(), GithubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            API_ROOT, self.owner, self.repo, number
        );
        self.http
            .post(&url)
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?
            .error_for_status()?;
        debug!("posted comment");
        Ok(())
    }

    /// Close an issue, optionally with a state_reason ("duplicate" or
    /// "not_planned"). None closes with GitHub's default reason.
    #[instrument(skip(self), fields(issue = number))]
    pub async fn close_issue(&self, number: u64, reason: Option<&str>) -> Result<(), GithubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}",
            API_ROOT, self.owner, self.repo, number
        );
        self.http
            .patch(&url)
            .header("User-Agent", USER_AGENT)
            .bearer_auth(&self.token)
            .json(&close_payload(reason))
            .send()
            .await?
            .error_for_status()?;
        debug!(reason = reason.unwrap_or("default"), "closed issue");
        Ok(())
    }
}

fn close_payload(reason: Option<&str>) -> serde_json::Value {
    let mut payload = serde_json::json!({ "state": "closed" });
    if let Some(reason) = reason {
        payload["state_reason"] = reason.into();
    }
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_repo_slug() {
        let (owner, repo) = parse_repo_slug("alice/packages").unwrap();
        assert_eq!(owner, "alice");
        assert_eq!(repo, "packages");
    }

    #[test]
    fn test_parse_invalid_repo_slug() {
        assert!(parse_repo_slug("alice").is_err());
        assert!(parse_repo_slug("alice/").is_err());
        assert!(parse_repo_slug("/packages").is_err());
        assert!(parse_repo_slug("alice/pkgs/extra").is_err());
    }

    #[test]
    fn test_issue_deserializes_with_null_body() {
        let issue: Issue =
            serde_json::from_str(r#"{"number": 7, "title": "Register my-pkg", "body": null}"#)
                .unwrap();
        assert_eq!(issue.number, 7);
        assert!(issue.body.is_none());
        assert!(!issue.is_pull_request());
    }

    #[test]
    fn test_issue_list_marks_pull_requests() {
        let items: Vec<Issue> = serde_json::from_str(
            r#"[
                {"number": 1, "title": "Register a", "body": "x"},
                {"number": 2, "title": "Fix bot", "body": "y",
                 "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/2"}}
            ]"#,
        )
        .unwrap();
        let issues: Vec<_> = items.into_iter().filter(|i| !i.is_pull_request()).collect();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].number, 1);
    }

    #[test]
    fn test_close_payload_with_reason() {
        let payload = close_payload(Some("duplicate"));
        assert_eq!(payload["state"], "closed");
        assert_eq!(payload["state_reason"], "duplicate");
    }

    #[test]
    fn test_close_payload_default() {
        let payload = close_payload(None);
        assert_eq!(payload["state"], "closed");
        assert!(payload.get("state_reason").is_none());
    }

    #[test]
    fn test_blob_url() {
        let client = Client::new(
            "owner".to_string(),
            "repo".to_string(),
            "token".to_string(),
        );
        assert_eq!(
            client.blob_url("registry.json"),
            "https://github.com/owner/repo/blob/main/registry.json"
        );
    }
}
