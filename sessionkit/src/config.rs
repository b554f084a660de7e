//! Session configuration
//!
//! Built once at startup and handed to [`crate::SessionManager`]; nothing is
//! read from the environment at request time.

use chrono::Duration;

const DEFAULT_COOKIE_NAME: &str = "session";
const DEFAULT_LIFETIME_SECS: i64 = 12 * 60 * 60;
/// Browsers cap cookie expiry at 400 days
const MAX_LIFETIME_SECS: i64 = 400 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token
    pub cookie_name: String,
    /// Absolute lifetime measured from session creation
    pub lifetime: Duration,
    /// Whether the cookie carries the `Secure` attribute
    pub cookie_secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            lifetime: Duration::seconds(DEFAULT_LIFETIME_SECS),
            cookie_secure: true,
        }
    }
}

impl SessionConfig {
    /// Read `SESSION_COOKIE_NAME`, `SESSION_LIFETIME_SECS` and `SESSION_COOKIE_SECURE`,
    /// falling back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let cookie_name = std::env::var("SESSION_COOKIE_NAME")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string());

        let lifetime_secs = std::env::var("SESSION_LIFETIME_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .filter(|secs| *secs > 0)
            .map(|secs| {
                if secs > MAX_LIFETIME_SECS {
                    tracing::warn!(
                        "SESSION_LIFETIME_SECS={} exceeds the maximum, using {}",
                        secs,
                        MAX_LIFETIME_SECS
                    );
                }
                secs.min(MAX_LIFETIME_SECS)
            })
            .unwrap_or(DEFAULT_LIFETIME_SECS);

        let cookie_secure = std::env::var("SESSION_COOKIE_SECURE")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            cookie_name,
            lifetime: Duration::seconds(lifetime_secs),
            cookie_secure,
        }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the absolute lifetime, capped at 400 days.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime.min(Duration::seconds(MAX_LIFETIME_SECS));
        self
    }

    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }
}
