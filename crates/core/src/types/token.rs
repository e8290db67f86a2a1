//! Session token type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`SessionToken`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum TokenError {
    /// The input string is empty.
    #[error("session token cannot be empty")]
    Empty,
}

/// An opaque credential proving an authenticated user to the remote API.
///
/// The client never inspects or validates the token; it only attaches it as a
/// bearer credential on authenticated calls. Absence of a token means the user
/// is anonymous. Created on successful login, destroyed on logout, and only
/// ever *read* back from storage at application start.
///
/// `Debug` output is redacted so tokens never leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Construct a token from the credential string returned by the server.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Empty`] if the input is empty.
    pub fn new(token: impl Into<String>) -> Result<Self, TokenError> {
        let token = token.into();
        if token.is_empty() {
            return Err(TokenError::Empty);
        }
        Ok(Self(token))
    }

    /// Expose the raw credential for attaching to a request.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionToken").field(&"[REDACTED]").finish()
    }
}
