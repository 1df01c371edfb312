use wiresession_serialize::{CodecChoice, DEFAULT_THRESHOLD};

/// Username used when `$USER` is not set.
pub const DEFAULT_USERNAME: &str = "username";

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Human-readable sender name stamped on every header.
    pub username: String,
    /// Session token stamped on every header.
    pub session: String,
    /// Codec for headers and mapping content.
    pub codec: CodecChoice,
    /// Out-of-band threshold for object serialization, in bytes.
    pub threshold: usize,
    /// Treat identity frames without a following delimiter as an error.
    pub strict_identities: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            username: default_username(),
            session: new_token(),
            codec: CodecChoice::default(),
            threshold: DEFAULT_THRESHOLD,
            strict_identities: true,
        }
    }
}

/// `$USER`, or [`DEFAULT_USERNAME`].
pub fn default_username() -> String {
    std::env::var("USER")
        .ok()
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| DEFAULT_USERNAME.to_string())
}

/// Fresh random token for session and message ids.
pub fn new_token() -> String {
    uuid::Uuid::new_v4().to_string()
}
