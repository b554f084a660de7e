use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use http::header::{COOKIE, HeaderMap, HeaderValue};
use ring::rand::SecureRandom;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),
}

/// Generate `len` random bytes from the system CSPRNG, base64url encoded without padding.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random string".to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

pub(crate) fn random_bytes<const N: usize>() -> Result<[u8; N], UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = [0u8; N];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;
    Ok(bytes)
}

/// IMF-fixdate, as required for the cookie `Expires` attribute.
pub(crate) fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub(crate) fn build_set_cookie(
    name: &str,
    value: &str,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> Result<HeaderValue, UtilError> {
    let secure = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{name}={value}; Path=/; Expires={}; HttpOnly{secure}; SameSite=Strict",
        http_date(expires_at)
    );
    HeaderValue::from_str(&cookie)
        .map_err(|_| UtilError::Cookie("Failed to build cookie header".to_string()))
}

pub(crate) fn build_clear_cookie(name: &str, secure: bool) -> Result<HeaderValue, UtilError> {
    let secure = if secure { "; Secure" } else { "" };
    let cookie = format!(
        "{name}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly{secure}; SameSite=Strict"
    );
    HeaderValue::from_str(&cookie)
        .map_err(|_| UtilError::Cookie("Failed to build cookie header".to_string()))
}

/// Find the value of the cookie named `cookie_name` across every `Cookie` header.
///
/// Malformed (non-UTF-8) headers are skipped rather than treated as an error:
/// an unreadable cookie is equivalent to no session at all.
pub(crate) fn get_cookie_value<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| match header.to_str() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::debug!("Skipping unreadable cookie header: {}", e);
                None
            }
        })
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|s| {
            let mut parts = s.splitn(2, '=');
            match (parts.next(), parts.next()) {
                (Some(k), Some(v)) if k == cookie_name && !v.is_empty() => Some(v),
                _ => None,
            }
        })
}
