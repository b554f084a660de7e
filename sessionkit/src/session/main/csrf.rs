use subtle::ConstantTimeEq;

use crate::session::config::{CSRF_TOKEN_KEY, TOKEN_BYTES};
use crate::session::errors::SessionError;
use crate::session::types::Session;
use crate::utils::gen_random_string;

pub(crate) fn new_csrf_token() -> Result<String, SessionError> {
    Ok(gen_random_string(TOKEN_BYTES)?)
}

/// Return the session's CSRF token, generating one if the session has none.
pub fn ensure_csrf_token(session: &mut Session) -> Result<String, SessionError> {
    if let Some(token) = session.csrf_token() {
        return Ok(token.to_string());
    }
    let token = new_csrf_token()?;
    session.put(CSRF_TOKEN_KEY, &token)?;
    tracing::debug!("Issued CSRF token for session");
    Ok(token)
}

/// Compare a submitted token against the one bound to `session` in constant time.
pub fn verify_csrf_token(session: &Session, submitted: Option<&str>) -> Result<(), SessionError> {
    let Some(submitted) = submitted.filter(|s| !s.is_empty()) else {
        return Err(SessionError::CsrfToken("No CSRF token submitted".to_string()));
    };

    let Some(expected) = session.csrf_token() else {
        return Err(SessionError::CsrfToken(
            "Session has no CSRF token".to_string(),
        ));
    };

    if bool::from(submitted.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(SessionError::CsrfToken("CSRF token mismatch".to_string()))
    }
}
