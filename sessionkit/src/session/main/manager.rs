use std::sync::Arc;

use chrono::Utc;
use http::header::{HeaderMap, HeaderValue};

use crate::config::SessionConfig;
use crate::session::config::{CSRF_TOKEN_KEY, TOKEN_BYTES};
use crate::session::errors::SessionError;
use crate::session::types::{Session, SessionStatus};
use crate::storage::SessionStore;
use crate::utils::{build_clear_cookie, build_set_cookie, gen_random_string, get_cookie_value};

use super::csrf::new_csrf_token;

/// Owns the per-request session lifecycle: resolve from the cookie token,
/// rotate on privilege change, destroy on logout, and commit once at the end.
///
/// Concurrent requests carrying the same token (two browser tabs) are not
/// serialized; whichever commits last wins.
pub struct SessionManager {
    config: SessionConfig,
    store: Arc<dyn SessionStore>,
}

impl SessionManager {
    pub fn new(config: SessionConfig, store: Arc<dyn SessionStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// The session token carried by the request's cookie, if any.
    pub fn session_cookie<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        get_cookie_value(headers, &self.config.cookie_name)
    }

    fn new_session(&self) -> Result<Session, SessionError> {
        let token = gen_random_string(TOKEN_BYTES)?;
        let mut session = Session::fresh(token, self.config.lifetime, Utc::now())?;
        session.put(CSRF_TOKEN_KEY, new_csrf_token()?)?;
        Ok(session)
    }

    /// Load the session named by `cookie_token`, or start a new one.
    ///
    /// An absent, unknown or expired token (`expires_at <= now`, whatever the
    /// store returns) yields a brand-new dirty session with a fresh token and
    /// CSRF token, so the response always carries a cookie for it.
    #[tracing::instrument(skip_all)]
    pub async fn resolve(&self, cookie_token: Option<&str>) -> Result<Session, SessionError> {
        let Some(token) = cookie_token.filter(|t| !t.is_empty()) else {
            tracing::debug!("No session cookie, starting a new session");
            return self.new_session();
        };

        let now = Utc::now();
        match self.store.load(token).await? {
            Some(record) if !record.is_expired_at(now) => {
                tracing::debug!("Resumed session expiring at {}", record.expires_at);
                Ok(Session::from_record(token.to_string(), record, now))
            }
            Some(record) => {
                tracing::debug!("Session expired at {}", record.expires_at);
                self.new_session()
            }
            None => {
                tracing::debug!("Unknown session token, starting a new session");
                self.new_session()
            }
        }
    }

    /// Issue a new token for `session`, carrying its values over.
    ///
    /// The old store entry is deleted immediately and the CSRF token is
    /// regenerated, so neither the pre-rotation cookie nor any token embedded
    /// in pages rendered before it stays valid. Absolute expiry is unchanged.
    #[tracing::instrument(skip_all)]
    pub async fn rotate(&self, session: &mut Session) -> Result<(), SessionError> {
        if session.is_destroyed() {
            return Err(SessionError::Destroyed);
        }

        let new_token = gen_random_string(TOKEN_BYTES)?;
        let new_csrf = new_csrf_token()?;

        // Session stays untouched if the old entry cannot be removed
        self.store.delete(&session.token).await?;

        session.token = new_token;
        session.put(CSRF_TOKEN_KEY, new_csrf)?;
        session.status = SessionStatus::Modified;
        session.rotated = true;

        tracing::debug!("Rotated session token");
        Ok(())
    }

    /// Delete the session from the store; the next commit clears the cookie.
    #[tracing::instrument(skip_all)]
    pub async fn destroy(&self, session: &mut Session) -> Result<(), SessionError> {
        self.store.delete(&session.token).await?;
        session.values.clear();
        session.status = SessionStatus::Destroyed;
        tracing::debug!("Destroyed session");
        Ok(())
    }

    /// Persist a dirty session and return the `Set-Cookie` value to send.
    ///
    /// A clean session performs no store I/O and returns `None`; a destroyed
    /// one returns a cookie-clearing header. The write runs on its own task so
    /// it completes even if the request future is dropped mid-await.
    #[tracing::instrument(skip_all)]
    pub async fn commit(&self, session: &mut Session) -> Result<Option<HeaderValue>, SessionError> {
        let cookie_name = self.config.cookie_name.as_str();
        let secure = self.config.cookie_secure;

        match session.status {
            SessionStatus::Unmodified => Ok(None),
            SessionStatus::Destroyed => Ok(Some(build_clear_cookie(cookie_name, secure)?)),
            SessionStatus::Modified => {
                if session.is_expired_at(Utc::now()) {
                    tracing::debug!("Not persisting expired session");
                    return Ok(Some(build_clear_cookie(cookie_name, secure)?));
                }

                let store = Arc::clone(&self.store);
                let token = session.token.clone();
                let record = session.to_record();
                let expiry = session.expires_at;

                tokio::spawn(async move { store.save(&token, &record, expiry).await })
                    .await
                    .map_err(|e| SessionError::Storage(format!("Session commit task failed: {e}")))??;

                session.status = SessionStatus::Unmodified;
                tracing::debug!("Committed session expiring at {}", expiry);

                Ok(Some(build_set_cookie(
                    cookie_name,
                    &session.token,
                    session.expires_at,
                    secure,
                )?))
            }
        }
    }
}
