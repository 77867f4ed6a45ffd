pub mod parse;
pub mod types;

pub use parse::{canonicalize, parse_request, RegistrationRequest, SyntaxError};
pub use types::{Outcome, Processed};

use std::collections::HashMap;
use tracing::{debug, instrument};

use crate::store::{Mapping, MappingStore, RemoteBlob, StoreError};

/// Posted verbatim when the body fails the template check.
const SYNTAX_HELP: &str = "This issue syntax is invalid.\n\
- The name can only be made up of a-z, A-Z, underscores or dashes.\n\
- The URL has to be a valid **GitHub** URL, to the root of the repository.";

/// Turns one issue body into exactly one outcome and, for the success case,
/// one mapping write. Holds no mapping state between issues: every call
/// re-reads the store, so each issue sees the writes of the ones before it.
pub struct Processor<B: RemoteBlob> {
    store: MappingStore<B>,
    /// Display name of the mapping file, used in the success comment
    mapping_name: String,
    /// Browsable URL of the mapping file, used in the success comment
    mapping_url: String,
    /// Decide outcomes but never write
    dry_run: bool,
}

impl<B: RemoteBlob> Processor<B> {
    pub fn new(store: MappingStore<B>, mapping_name: String, mapping_url: String, dry_run: bool) -> Self {
        Processor {
            store,
            mapping_name,
            mapping_url,
            dry_run,
        }
    }

    /// Process one issue body: parse, read the mapping once, decide, and for
    /// a new registration write the mapping back under the version token of
    /// that same read.
    ///
    /// Syntax and business-rule rejections are resolved into an Outcome and
    /// never surface as errors; store failures propagate so the caller can
    /// leave the issue open for a later run.
    #[instrument(skip(self, body))]
    pub async fn process(&self, body: &str) -> Result<Processed, StoreError> {
        let request = match parse_request(body) {
            Ok(request) => request,
            Err(SyntaxError) => {
                debug!("body does not match the registration template");
                return Ok(Processed {
                    outcome: Outcome::InvalidSyntax,
                    comment: SYNTAX_HELP.to_string(),
                });
            }
        };

        let mut transcript = vec![
            format!("- Registering `'{}'` for `{}`", request.name, request.raw_url),
            format!("- Parsed URL as `{}`", request.canonical_url),
        ];

        let (mut mapping, token) = self.store.read_all().await?;
        let outcome = decide(&request.name, &request.canonical_url, &mapping);
        debug!(name = %request.name, url = %request.canonical_url, outcome = %outcome, "decided");

        match &outcome {
            Outcome::Registered => {
                mapping.insert(request.name.clone(), request.canonical_url.clone());
                if !self.dry_run {
                    self.store.write_all(&mapping, &token).await?;
                }
                transcript.push(format!(
                    "## Added!! See [{}]({})!",
                    self.mapping_name, self.mapping_url
                ));
            }
            Outcome::AlreadyRegistered => {
                transcript.push("## This was already registered!".to_string());
            }
            Outcome::NameTaken { existing_url } => {
                transcript.push(format!("## Oh no, name already taken: `{}`", existing_url));
            }
            Outcome::UrlTaken { existing_name } => {
                transcript.push(format!("## Repo already registered as `{}`", existing_name));
            }
            // parse_request already resolved syntax errors above
            Outcome::InvalidSyntax => {}
        }

        Ok(Processed {
            outcome,
            comment: transcript.join("\n"),
        })
    }
}

/// Pure decision step over a freshly read mapping. Never mutates.
pub fn decide(name: &str, canonical_url: &str, mapping: &Mapping) -> Outcome {
    if let Some(existing_url) = mapping.get(name) {
        if existing_url == canonical_url {
            return Outcome::AlreadyRegistered;
        }
        return Outcome::NameTaken {
            existing_url: existing_url.clone(),
        };
    }

    // Reverse index url -> name; if stored data already violates URL
    // uniqueness, the last entry in iteration order wins.
    let mut by_url: HashMap<&str, &str> = HashMap::new();
    for (existing_name, url) in mapping {
        by_url.insert(url.as_str(), existing_name.as_str());
    }

    if let Some(existing_name) = by_url.get(canonical_url) {
        return Outcome::UrlTaken {
            existing_name: (*existing_name).to_string(),
        };
    }

    Outcome::Registered
}
