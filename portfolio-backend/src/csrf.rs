//! One-time anti-forgery tokens, kept in the visitor's session.

use portfolio_shared::error::PortfolioError;
use rand::distr::Alphanumeric;
use rand::Rng;
use tower_sessions::Session;
use tracing::{debug, error};

pub const SESSION_KEY: &str = "csrf_token";
pub const TOKEN_LENGTH: usize = 32;

fn generate() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Create a fresh token for this session, replacing any previous one.
pub async fn issue(session: &Session) -> Result<String, PortfolioError> {
    let token = generate();
    session
        .insert(SESSION_KEY, token.clone())
        .await
        .map_err(|err| {
            error!("Failed to store CSRF token in session: {:?}", err);
            PortfolioError::Security("Failed to store anti-forgery token".to_string())
        })?;
    debug!("Issued CSRF token for session");
    Ok(token)
}

/// Check a submitted token against the session. The stored token is consumed
/// whatever the outcome.
pub async fn verify(session: &Session, submitted: Option<&str>) -> Result<(), PortfolioError> {
    let expected: Option<String> = session.remove(SESSION_KEY).await.map_err(|err| {
        error!("Failed to read CSRF token from session: {:?}", err);
        PortfolioError::Security("Failed to read anti-forgery token".to_string())
    })?;

    match (expected, submitted) {
        (None, _) => Err(PortfolioError::Security(
            "Missing anti-forgery token in session".to_string(),
        )),
        (Some(_), None) | (Some(_), Some("")) => Err(PortfolioError::Security(
            "Missing anti-forgery token in form".to_string(),
        )),
        (Some(expected), Some(submitted)) if constant_time_eq(&expected, submitted) => Ok(()),
        (Some(_), Some(_)) => Err(PortfolioError::Security(
            "Anti-forgery token does not match".to_string(),
        )),
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[test]
    fn test_generate() {
        let a = generate();
        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, generate());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
    }

    #[tokio::test]
    async fn test_token_is_single_use() {
        let session = session();
        let token = issue(&session).await.expect("issue");

        verify(&session, Some(&token)).await.expect("first use");
        assert!(matches!(
            verify(&session, Some(&token)).await,
            Err(PortfolioError::Security(_))
        ));
    }

    #[tokio::test]
    async fn test_rejections() {
        let session = session();
        assert!(verify(&session, Some("anything")).await.is_err());

        issue(&session).await.expect("issue");
        assert!(verify(&session, None).await.is_err());

        issue(&session).await.expect("issue");
        assert!(verify(&session, Some("wrong")).await.is_err());

        // a newer token replaces the old one
        let old = issue(&session).await.expect("issue");
        issue(&session).await.expect("issue");
        assert!(verify(&session, Some(&old)).await.is_err());
    }
}
