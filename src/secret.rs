//! Secret material wrapper that keeps credentials out of logs.

use serde::{Deserialize, Deserializer};
use zeroize::Zeroizing;

/// A string holding secret material: client secrets, bearer tokens, minted
/// database passwords.
///
/// The inner buffer is zeroized on drop and the `Debug` representation is
/// redacted, so a `SecretString` can sit inside structs that derive or
/// implement `Debug` without leaking. There is deliberately no `Display`
/// impl; call [`expose`](SecretString::expose) at the single point where the
/// raw value is handed to a client library.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
    /// Wraps a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Returns the raw secret.
    ///
    /// The returned slice must not be logged or persisted; it is meant to
    /// parameterize an outgoing request or connection open call and nothing
    /// else.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// True when the wrapped value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretString([redacted])")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// Deserialize only: wire responses carry secrets in, but a SecretString is
// never serialized back out.
impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::new("hunter2");
        let rendered = format!("{:?}", secret);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn test_expose_returns_value() {
        let secret = SecretString::new("hunter2");
        assert_eq!(secret.expose(), "hunter2");
        assert!(!secret.is_empty());
    }

    #[test]
    fn test_empty() {
        assert!(SecretString::new("").is_empty());
    }

    #[test]
    fn test_deserialize() {
        let secret: SecretString = serde_json::from_str("\"tok-123\"").unwrap();
        assert_eq!(secret.expose(), "tok-123");
    }
}
