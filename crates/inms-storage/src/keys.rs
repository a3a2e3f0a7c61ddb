//! Storage key constants.

/// Storage keys used by the client session.
pub struct StorageKeys;

impl StorageKeys {
    /// Common prefix for every session key.
    pub const PREFIX: &'static str = "inms.";

    /// Bearer access token
    pub const ACCESS_TOKEN: &'static str = "inms.access_token";

    /// Refresh token exchanged for new access tokens
    pub const REFRESH_TOKEN: &'static str = "inms.refresh_token";

    /// Cached user record (JSON)
    pub const USER: &'static str = "inms.user";

    /// All keys that make up one logical session.
    pub const SESSION_KEYS: [&'static str; 3] =
        [Self::ACCESS_TOKEN, Self::REFRESH_TOKEN, Self::USER];
}
