//! Redacting wrapper for credential material.
//!
//! [`SecretString`] holds OAuth tokens and signing keys without letting
//! them leak through `Debug` output or serialized JSON. There is no
//! `Display` impl on purpose: a secret can never end up in a formatted
//! log line by accident, only through an explicit [`expose`](SecretString::expose).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string that is redacted everywhere except [`expose`](SecretString::expose).
///
/// - `Debug` prints `SecretString(***)`
/// - `Serialize` always emits an empty string
/// - `Deserialize` accepts a plain string, so config files stay ordinary JSON
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The actual secret. Call sites should be few: Authorization headers,
    /// signing-key construction, and nothing else.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Whether the wrapped value is empty (unset).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(SecretString(String::deserialize(deserializer)?))
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString(s.to_owned())
    }
}
