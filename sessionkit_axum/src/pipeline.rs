use std::sync::Arc;

use sessionkit::{SessionManager, UserStore};

use crate::chain::Chain;
use crate::config::PipelineConfig;
use crate::middleware::{
    AuthGate, CsrfGuard, LoadAndSave, LogRequest, RecoverPanic, RequireAuthenticated,
    SecureHeaders,
};

/// Collaborators shared by every request, built once at startup.
pub struct Pipeline {
    sessions: SessionManager,
    users: Arc<dyn UserStore>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        sessions: SessionManager,
        users: Arc<dyn UserStore>,
        config: PipelineConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions,
            users,
            config,
        })
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Applied to every route: recovery, access log, security headers.
    pub fn standard_chain(self: &Arc<Self>) -> Chain {
        Chain::new()
            .with(RecoverPanic)
            .with(LogRequest)
            .with(SecureHeaders)
    }

    /// Routes that use the session: standard chain plus session load/commit,
    /// CSRF check and authentication evaluation.
    pub fn dynamic_chain(self: &Arc<Self>) -> Chain {
        let session = Chain::new()
            .with(LoadAndSave::new(self.clone()))
            .with(CsrfGuard::new(self.clone()))
            .with(AuthGate::new(self.clone()));
        self.standard_chain().append(&session)
    }

    /// Dynamic chain that redirects unauthenticated requests to the login page.
    pub fn protected_chain(self: &Arc<Self>) -> Chain {
        self.dynamic_chain()
            .with(RequireAuthenticated::new(self.clone()))
    }
}
