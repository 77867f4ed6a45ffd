use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// The registration issue template: four content lines separated by blanks.
/// Anchored at the start of the body only — trailing content is tolerated,
/// which makes this a prefix check, not a full-body acceptor.
static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^### Name\n\n([a-zA-Z0-9_-]+)\n\n### URL\n\n(https?://github\.com(?:/[a-zA-Z0-9._-]+){2}/?)",
    )
    .expect("template regex is valid")
});

#[derive(Debug, Error, PartialEq, Eq)]
#[error("issue body does not match the registration template")]
pub struct SyntaxError;

/// One validated registration request, derived from a single issue body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    /// Package name, constrained to [a-zA-Z0-9_-]+
    pub name: String,
    /// URL exactly as the requester wrote it
    pub raw_url: String,
    /// Normalized https://github.com/<owner>/<repo> form
    pub canonical_url: String,
}

/// Parse and validate one issue body against the registration template.
///
/// The GitHub API delivers bodies with CRLF line endings; these are
/// normalized before matching.
pub fn parse_request(body: &str) -> Result<RegistrationRequest, SyntaxError> {
    let body = body.replace("\r\n", "\n");
    let caps = TEMPLATE_RE.captures(&body).ok_or(SyntaxError)?;

    let name = caps[1].to_string();
    let raw_url = caps[2].to_string();
    let canonical_url = canonicalize(&raw_url)?;

    Ok(RegistrationRequest {
        name,
        raw_url,
        canonical_url,
    })
}

/// Reduce a validated repository URL to its canonical form: scheme forced to
/// https, host github.com, exactly the two path segments, no trailing slash.
/// `http://github.com/Foo/Bar/` and `https://github.com/Foo/Bar` come out
/// identical. Idempotent.
pub fn canonicalize(url: &str) -> Result<String, SyntaxError> {
    let parsed = reqwest::Url::parse(url).map_err(|_| SyntaxError)?;

    let segments: Vec<&str> = parsed
        .path_segments()
        .ok_or(SyntaxError)?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 2 {
        return Err(SyntaxError);
    }

    Ok(format!("https://github.com/{}/{}", segments[0], segments[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(name: &str, url: &str) -> String {
        format!("### Name\n\n{}\n\n### URL\n\n{}", name, url)
    }

    #[test]
    fn test_parse_valid_body() {
        let request = parse_request(&body("my-pkg", "https://github.com/alice/my-pkg")).unwrap();
        assert_eq!(request.name, "my-pkg");
        assert_eq!(request.raw_url, "https://github.com/alice/my-pkg");
        assert_eq!(request.canonical_url, "https://github.com/alice/my-pkg");
    }

    #[test]
    fn test_parse_crlf_body() {
        let crlf = "### Name\r\n\r\nmy-pkg\r\n\r\n### URL\r\n\r\nhttps://github.com/alice/my-pkg";
        let request = parse_request(crlf).unwrap();
        assert_eq!(request.name, "my-pkg");
    }

    #[test]
    fn test_parse_tolerates_trailing_content() {
        let with_extra = body("my-pkg", "https://github.com/alice/my-pkg") + "\n\nPlease merge soon!";
        let request = parse_request(&with_extra).unwrap();
        assert_eq!(request.canonical_url, "https://github.com/alice/my-pkg");
    }

    #[test]
    fn test_parse_rejects_missing_url_section() {
        assert_eq!(
            parse_request("### Name\n\nmy-pkg\n"),
            Err(SyntaxError)
        );
    }

    #[test]
    fn test_parse_rejects_name_with_space() {
        assert_eq!(
            parse_request(&body("my pkg", "https://github.com/alice/my-pkg")),
            Err(SyntaxError)
        );
    }

    #[test]
    fn test_parse_rejects_non_github_host() {
        assert_eq!(
            parse_request(&body("my-pkg", "https://gitlab.com/alice/my-pkg")),
            Err(SyntaxError)
        );
    }

    #[test]
    fn test_parse_rejects_wrong_segment_count() {
        assert_eq!(
            parse_request(&body("my-pkg", "https://github.com/alice")),
            Err(SyntaxError)
        );
    }

    #[test]
    fn test_parse_rejects_leading_content() {
        // Anchored at the start: a preamble invalidates the body
        let with_preamble = format!("hello\n{}", body("my-pkg", "https://github.com/alice/my-pkg"));
        assert_eq!(parse_request(&with_preamble), Err(SyntaxError));
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        assert_eq!(parse_request(""), Err(SyntaxError));
    }

    #[test]
    fn test_canonicalize_normalizes_scheme_and_slash() {
        assert_eq!(
            canonicalize("http://github.com/A/B/").unwrap(),
            "https://github.com/A/B"
        );
        assert_eq!(
            canonicalize("https://github.com/A/B").unwrap(),
            "https://github.com/A/B"
        );
    }

    #[test]
    fn test_canonicalize_idempotent() {
        let once = canonicalize("http://github.com/Foo/Bar/").unwrap();
        assert_eq!(canonicalize(&once).unwrap(), once);
    }

    #[test]
    fn test_canonicalize_preserves_case() {
        // Owner/repo case is deliberately left as written
        assert_eq!(
            canonicalize("https://github.com/Foo/Bar").unwrap(),
            "https://github.com/Foo/Bar"
        );
    }
}
