//! # Identity Newtypes
//!
//! [`LinkId`] and [`SubmissionId`] wrap UUIDs and are always valid by
//! construction. [`Token`] is the recipient's capability: it is validated at
//! construction and never printed in full by [`Token::redacted`].

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Longest token accepted from a caller.
pub const MAX_TOKEN_LEN: usize = 128;

/// Number of token characters kept when a token appears in logs.
const REDACTED_PREFIX_LEN: usize = 8;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Create a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identifier of a document link.
    LinkId
);

uuid_id!(
    /// Identifier of a persisted submission.
    SubmissionId
);

/// Opaque, unguessable token bound one-to-one to a [`crate::Link`].
///
/// Tokens are issued as UUID v4 strings, but any caller-supplied value made
/// of ASCII letters, digits, `-` and `_` (1 to 128 characters) is accepted so
/// that it can be used verbatim as a storage folder name.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Token(String);

impl Token {
    /// Issue a fresh random token.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate a caller-supplied token. The value is compared verbatim;
    /// surrounding whitespace is rejected, not stripped.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::MissingToken);
        }
        if raw.len() > MAX_TOKEN_LEN {
            return Err(ValidationError::InvalidToken(format!(
                "token exceeds {MAX_TOKEN_LEN} characters"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValidationError::InvalidToken(
                "token contains characters outside [A-Za-z0-9_-]".into(),
            ));
        }
        Ok(Self(raw.to_string()))
    }

    /// The full token value. Avoid passing this to log macros.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First few characters followed by an ellipsis, for logs.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(REDACTED_PREFIX_LEN).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Token").field(&self.redacted()).finish()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Token {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.0
    }
}
