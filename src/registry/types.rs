use std::fmt;

/// Terminal classification of one registration attempt. Exactly one outcome
/// is produced per processed issue; only Registered mutates the mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// New (name, URL) pair written to the mapping
    Registered,
    /// Identical pair already present — idempotent re-run of a prior success
    AlreadyRegistered,
    /// Name maps to a different URL
    NameTaken { existing_url: String },
    /// URL already registered under a different name
    UrlTaken { existing_name: String },
    /// Body does not match the registration template
    InvalidSyntax,
}

impl Outcome {
    /// The state_reason to close the issue with. None means a plain close
    /// (GitHub records it as completed).
    pub fn close_reason(&self) -> Option<&'static str> {
        match self {
            Outcome::Registered => None,
            Outcome::AlreadyRegistered => Some("duplicate"),
            Outcome::NameTaken { .. } | Outcome::UrlTaken { .. } | Outcome::InvalidSyntax => {
                Some("not_planned")
            }
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Outcome::Registered => "registered",
            Outcome::AlreadyRegistered => "already registered",
            Outcome::NameTaken { .. } => "name taken",
            Outcome::UrlTaken { .. } => "url taken",
            Outcome::InvalidSyntax => "invalid syntax",
        };
        f.write_str(label)
    }
}

/// Result of processing one issue body: the classification plus the single
/// comment to post back on the issue.
#[derive(Debug, Clone)]
pub struct Processed {
    pub outcome: Outcome,
    pub comment: String,
}
