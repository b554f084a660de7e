use http::HeaderMap;
use uuid::Uuid;

use sessionkit::{Session, User};

use crate::error::PipelineError;

/// Why a request ended before reaching its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Rejection {
    Csrf,
    Unauthenticated,
}

/// Where a request is in the pipeline.
///
/// Variants are declared in pipeline order; a request only ever moves
/// forward. `Committed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    New,
    SessionResolved,
    CsrfChecked,
    AuthEvaluated,
    AuthGatePassed,
    Handled,
    Committed,
    Rejected(Rejection),
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Committed | Stage::Rejected(_))
    }
}

/// Per-request state threaded through every interceptor and the handler.
///
/// Owned by the task serving the request and never shared.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    stage: Stage,
    pub(crate) session: Option<Session>,
    pub(crate) authenticated: bool,
    /// `None` until looked up, then the lookup result for the rest of the request
    pub(crate) user: Option<Option<User>>,
    fallback_headers: HeaderMap,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            stage: Stage::New,
            session: None,
            authenticated: false,
            user: None,
            fallback_headers: HeaderMap::new(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `to`, which must lie strictly after the current stage.
    pub fn advance(&mut self, to: Stage) -> Result<(), PipelineError> {
        if self.stage.is_terminal() || to <= self.stage || matches!(to, Stage::Rejected(_)) {
            return Err(PipelineError::StageOrder {
                from: self.stage,
                to,
            });
        }
        tracing::trace!(request_id = %self.request_id, "{:?} -> {:?}", self.stage, to);
        self.stage = to;
        Ok(())
    }

    /// Enter the terminal rejected stage. A request is rejected at most once.
    pub fn reject(&mut self, why: Rejection) -> Result<(), PipelineError> {
        let to = Stage::Rejected(why);
        if self.stage.is_terminal() {
            return Err(PipelineError::StageOrder {
                from: self.stage,
                to,
            });
        }
        self.stage = to;
        Ok(())
    }

    pub fn rejection(&self) -> Option<Rejection> {
        match self.stage {
            Stage::Rejected(why) => Some(why),
            _ => None,
        }
    }

    pub fn is_rejected(&self) -> bool {
        self.rejection().is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// Like [`Self::session_mut`], for handlers that require a session.
    pub fn require_session(&mut self) -> Result<&mut Session, PipelineError> {
        self.session.as_mut().ok_or(PipelineError::NoSession)
    }

    /// Token to embed in rendered forms.
    pub fn csrf_token(&self) -> Option<&str> {
        self.session.as_ref().and_then(Session::csrf_token)
    }

    /// Set by `AuthGate` for the duration of this request.
    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    /// The authenticated user's record, once `AuthGate` has run.
    pub fn user(&self) -> Option<&User> {
        if !self.authenticated {
            return None;
        }
        self.user.as_ref().and_then(Option::as_ref)
    }

    /// Headers attached to the response even when the chain fails
    pub fn fallback_headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.fallback_headers
    }

    pub(crate) fn take_fallback_headers(&mut self) -> HeaderMap {
        std::mem::take(&mut self.fallback_headers)
    }
}
