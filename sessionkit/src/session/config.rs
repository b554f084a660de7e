/// Session value holding the id of the logged-in user
pub const AUTH_USER_ID_KEY: &str = "authenticatedUserID";

/// Session value holding the anti-forgery token
pub const CSRF_TOKEN_KEY: &str = "csrf_token";

/// Request header carrying a submitted anti-forgery token (`X-CSRF-Token`),
/// lowercase so it can build a static `HeaderName`
pub const CSRF_HEADER_NAME: &str = "x-csrf-token";

/// Form field carrying a submitted anti-forgery token
pub const CSRF_FORM_FIELD: &str = "csrf_token";

/// Random bytes per session token and per CSRF token (256 bits)
pub(super) const TOKEN_BYTES: usize = 32;
