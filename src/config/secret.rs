//! Connection credentials kept out of logs
//!
//! The PostgreSQL connection string usually embeds a password. It is held in a
//! `secrecy::Secret`, zeroized on drop, and only rendered for logs through
//! [`redact_connection_string`].
//!
//! ```rust
//! use pganon::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let url = secret_string("postgresql://app:hunter2@db/app".to_string());
//! assert!(url.expose_secret().starts_with("postgresql://"));
//! assert!(!format!("{:?}", url).contains("hunter2"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// Secret text, zeroized on drop
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// True for an empty value
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True if the value starts with `prefix`, e.g. a URL scheme
    pub fn starts_with(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }

    /// Parse the value, e.g. into a `tokio_postgres::Config`
    pub fn parse<F: std::str::FromStr>(&self) -> Result<F, F::Err> {
        self.0.parse()
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// Secret string as stored in the configuration
pub type SecretString = Secret<SecretValue>;

/// Wrap `value` as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}

/// Connection string with user and password replaced, safe for logs
///
/// ```rust
/// use pganon::config::{redact_connection_string, secret_string};
///
/// let url = secret_string("postgresql://app:hunter2@db:5432/app".to_string());
/// assert_eq!(redact_connection_string(&url), "postgresql://***@db:5432/app");
/// ```
pub fn redact_connection_string(value: &SecretString) -> String {
    use secrecy::ExposeSecret;

    let raw: &str = value.expose_secret().as_ref();
    let (scheme, rest) = raw.split_once("://").unwrap_or(("postgresql", raw));
    match rest.rsplit_once('@') {
        Some((_, host)) => format!("{}://***@{}", scheme, host),
        None => format!("{}://{}", scheme, rest),
    }
}
