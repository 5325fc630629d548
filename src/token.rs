//! Request tokens correlating a caller with the response that settles it.

use std::fmt;

use ulid::Ulid;

/// Opaque correlation key for one in-flight bridged request.
///
/// Freshly generated tokens are ULIDs: 26 Crockford base32 characters, which
/// are URL-safe and need no percent-encoding on the wire. Tokens read back from
/// a request are accepted verbatim, so a foreign value is simply a correlation
/// miss rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestToken(String);

impl RequestToken {
    /// Mint a new token.
    pub fn generate() -> Self {
        Self::from(Ulid::new())
    }

    /// Wrap a token received on the wire.
    ///
    /// Returns `None` for an empty value, which counts as "not tagged".
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() {
            return None;
        }
        Some(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Ulid> for RequestToken {
    fn from(ulid: Ulid) -> Self {
        Self(ulid.to_string())
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
