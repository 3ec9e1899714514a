//! Secret scrubbing for everything the bundle writer persists.
//!
//! Redaction happens at serialization time as a last line of defence; the
//! structured types already exclude credentials by construction.

/// Replace every occurrence of each secret with `<redacted>`.
///
/// Empty and whitespace-only secrets are ignored so a blank password can
/// never blank out the whole artifact.
pub fn scrub(text: &str, secrets: &[String]) -> String {
    let mut out = text.to_string();
    for secret in secrets {
        if secret.trim().len() < 2 {
            continue;
        }
        out = out.replace(secret.as_str(), "<redacted>");
    }
    out
}

/// True iff none of the secrets appear in the text.
pub fn is_clean(text: &str, secrets: &[String]) -> bool {
    secrets
        .iter()
        .filter(|s| s.trim().len() >= 2)
        .all(|s| !text.contains(s.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrub_replaces_all_occurrences() {
        let secrets = vec!["hunter2".to_string()];
        let out = scrub("password=hunter2 again hunter2", &secrets);
        assert_eq!(out, "password=<redacted> again <redacted>");
        assert!(is_clean(&out, &secrets));
    }

    #[test]
    fn test_short_secrets_ignored() {
        let secrets = vec!["a".to_string(), " ".to_string()];
        let text = "a normal sentence";
        assert_eq!(scrub(text, &secrets), text);
        assert!(is_clean(text, &secrets));
    }

    #[test]
    fn test_multiple_secrets() {
        let secrets = vec!["tok_live_123".to_string(), "s3cr3t".to_string()];
        let out = scrub("auth tok_live_123 via s3cr3t", &secrets);
        assert!(!out.contains("tok_live_123"));
        assert!(!out.contains("s3cr3t"));
    }
}
