//! Account-restriction classification
//!
//! Some provider failures mean the credential or project is restricted
//! (exhausted quota, a key without access to the model) and retrying will not
//! help; the user has to switch provider or rotate the key. Providers do not
//! expose a stable error code for this, so the classifier matches known
//! phrases in the error body. It can misfire on unrelated errors that happen
//! to contain one of the phrases.

use crate::error::Error;

/// Lowercase phrases that mark a provider error as an account restriction
pub const ACCOUNT_RESTRICTION_PHRASES: [&str; 3] = ["must contain", "empty", "quota"];

pub fn is_account_restriction(text: &str) -> bool {
    let lower = text.to_lowercase();
    ACCOUNT_RESTRICTION_PHRASES.iter().any(|p| lower.contains(p))
}

/// Reclassify a provider error whose body matches a restriction phrase.
/// Every other error is returned unchanged.
pub fn classify_restriction(err: Error) -> Error {
    match err {
        Error::Provider { status, body } if is_account_restriction(&body) => {
            tracing::debug!(status, "Provider error classified as account restriction");
            Error::AccountRestricted(body)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrases_case_insensitive() {
        assert!(is_account_restriction("Quota exceeded for project"));
        assert!(is_account_restriction("contents is not specified or EMPTY"));
        assert!(is_account_restriction("* GenerateContentRequest.contents: Must Contain text"));
        assert!(!is_account_restriction("Invalid API key"));
    }

    #[test]
    fn test_provider_error_reclassified() {
        let err = classify_restriction(Error::Provider {
            status: 400,
            body: r#"{"error": "quota exceeded, must contain valid input"}"#.to_string(),
        });
        assert!(matches!(err, Error::AccountRestricted(ref b) if b.contains("quota")));
    }

    #[test]
    fn test_other_errors_untouched() {
        let err = classify_restriction(Error::Provider {
            status: 401,
            body: "unauthorized".to_string(),
        });
        assert!(matches!(err, Error::Provider { status: 401, .. }));
        let err = classify_restriction(Error::Transport("quota proxy unreachable".to_string()));
        assert!(matches!(err, Error::Transport(_)));
    }
}
