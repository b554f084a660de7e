//! Pipeline configuration
//!
//! Constructed once at startup and shared by the interceptors through
//! [`crate::Pipeline`].

const DEFAULT_LOGIN_PATH: &str = "/user/login";
const DEFAULT_MAX_FORM_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Where unauthenticated requests to protected routes are redirected
    pub login_path: String,
    /// Largest urlencoded body buffered while looking for a submitted CSRF token
    pub max_form_bytes: usize,
    /// Echo the session's CSRF token in an `X-CSRF-Token` response header
    pub respond_with_x_csrf_token: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            max_form_bytes: DEFAULT_MAX_FORM_BYTES,
            respond_with_x_csrf_token: false,
        }
    }
}

impl PipelineConfig {
    /// Read `LOGIN_PATH`, `CSRF_MAX_FORM_BYTES` and `RESPOND_WITH_X_CSRF_TOKEN`,
    /// falling back to the defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let login_path = std::env::var("LOGIN_PATH")
            .ok()
            .filter(|p| p.starts_with('/'))
            .unwrap_or_else(|| DEFAULT_LOGIN_PATH.to_string());

        let max_form_bytes = std::env::var("CSRF_MAX_FORM_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FORM_BYTES);

        let respond_with_x_csrf_token = std::env::var("RESPOND_WITH_X_CSRF_TOKEN")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);

        Self {
            login_path,
            max_form_bytes,
            respond_with_x_csrf_token,
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_max_form_bytes(mut self, bytes: usize) -> Self {
        self.max_form_bytes = bytes;
        self
    }

    pub fn with_x_csrf_token_header(mut self, enabled: bool) -> Self {
        self.respond_with_x_csrf_token = enabled;
        self
    }
}
