// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP basic authentication for the drain endpoint.

use base64::Engine;

use crate::errors::AuthError;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Credentials are only enforced when both parts are set.
    #[must_use]
    pub fn new(user: Option<String>, password: Option<String>) -> Option<Self> {
        match (user, password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some(Credentials { user, password })
            }
            _ => None,
        }
    }
}

/// Checks an `Authorization` header value against `credentials`.
pub fn check(header: Option<&str>, credentials: &Credentials) -> Result<(), AuthError> {
    let header = header.ok_or(AuthError::Missing)?;
    let (scheme, encoded) = header.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(AuthError::UnsupportedScheme);
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|_| AuthError::Malformed)?;
    let decoded = String::from_utf8(decoded).map_err(|_| AuthError::Malformed)?;
    let (user, password) = decoded.split_once(':').ok_or(AuthError::Malformed)?;

    if user != credentials.user {
        return Err(AuthError::UnknownUser);
    }
    if password != credentials.password {
        return Err(AuthError::IncorrectPassword);
    }
    Ok(())
}

/// Builds an `Authorization` header value.
#[must_use]
pub fn basic_header(user: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
    format!("Basic {encoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            user: "drain".to_string(),
            password: "s3cret".to_string(),
        }
    }

    #[test]
    fn test_valid_credentials() {
        let header = basic_header("drain", "s3cret");
        assert_eq!(check(Some(&header), &credentials()), Ok(()));
    }

    #[test]
    fn test_rejections() {
        let creds = credentials();
        assert_eq!(check(None, &creds), Err(AuthError::Missing));
        assert_eq!(check(Some("Basic"), &creds), Err(AuthError::Malformed));
        assert_eq!(
            check(Some("Basic !!notbase64!!"), &creds),
            Err(AuthError::Malformed)
        );
        assert_eq!(
            check(Some("Bearer abc"), &creds),
            Err(AuthError::UnsupportedScheme)
        );
        assert_eq!(
            check(Some(&basic_header("someone", "s3cret")), &creds),
            Err(AuthError::UnknownUser)
        );
        assert_eq!(
            check(Some(&basic_header("drain", "wrong")), &creds),
            Err(AuthError::IncorrectPassword)
        );
    }

    #[test]
    fn test_credentials_need_both_parts() {
        assert!(Credentials::new(Some("drain".into()), Some("s3cret".into())).is_some());
        assert!(Credentials::new(Some("drain".into()), None).is_none());
        assert!(Credentials::new(Some("drain".into()), Some(String::new())).is_none());
        assert!(Credentials::new(None, None).is_none());
    }

    #[test]
    fn test_debug_hides_password() {
        assert!(!format!("{:?}", credentials()).contains("s3cret"));
    }
}
