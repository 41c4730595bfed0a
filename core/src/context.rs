//! Process-wide client state, passed explicitly to every component.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::alert::{AlertChannel, Severity};
use crate::api::ApiClient;
use crate::config::Config;
use crate::role::Role;
use crate::storage::{CredentialStore, Credentials, MemoryCredentialStore, SledCredentialStore};
use crate::{ClientError, Result};

/// An accepted service machine address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub address: String,
    pub reachable: bool,
}

impl ServiceEndpoint {
    /// Absolute URL of a gateway route on this machine
    pub fn gateway_url(&self, route: &str) -> String {
        format!("http://{}{}", self.address, route)
    }
}

/// The authenticated key pair of the active session
#[derive(Clone)]
pub struct Session {
    pub public_key: String,
    private_key: Zeroizing<String>,
    pub authenticated: bool,
}

impl Session {
    pub(crate) fn authenticated(credentials: &Credentials) -> Self {
        Self {
            public_key: credentials.public_key.clone(),
            private_key: credentials.private_key.clone(),
            authenticated: true,
        }
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("authenticated", &self.authenticated)
            .finish()
    }
}

#[derive(Debug, Default)]
struct SharedState {
    endpoint: Option<ServiceEndpoint>,
    session: Option<Session>,
    role: Option<Role>,
}

struct ContextInner {
    config: Config,
    api: ApiClient,
    alerts: AlertChannel,
    credentials: Box<dyn CredentialStore>,
    state: RwLock<SharedState>,
    scratch: RwLock<HashMap<String, String>>,
}

/// Cheap to clone; every clone sees the same state.
#[derive(Clone)]
pub struct ClientContext {
    inner: Arc<ContextInner>,
}

impl ClientContext {
    pub fn new(config: Config, credentials: Box<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;
        let api = ApiClient::new(&config.service)?;
        Ok(Self {
            inner: Arc::new(ContextInner {
                config,
                api,
                alerts: AlertChannel::new(),
                credentials,
                state: RwLock::new(SharedState::default()),
                scratch: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Build a context whose credential store follows `config.storage`
    pub fn from_config(config: Config) -> Result<Self> {
        let store: Box<dyn CredentialStore> = if config.storage.ephemeral {
            Box::new(MemoryCredentialStore::new())
        } else {
            Box::new(SledCredentialStore::open(
                &config.storage.data_directory,
                &config.storage.credentials_tree,
            )?)
        };
        Self::new(config, store)
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn alerts(&self) -> &AlertChannel {
        &self.inner.alerts
    }

    pub(crate) fn credential_store(&self) -> &dyn CredentialStore {
        self.inner.credentials.as_ref()
    }

    // ---------------------------------------------------------------
    // Endpoint
    // ---------------------------------------------------------------

    pub fn endpoint(&self) -> Option<ServiceEndpoint> {
        self.inner.state.read().endpoint.clone()
    }

    /// The resolved endpoint, or `EndpointUnset` before resolution
    pub fn require_endpoint(&self) -> Result<ServiceEndpoint> {
        self.endpoint().ok_or(ClientError::EndpointUnset)
    }

    pub(crate) fn set_endpoint(&self, endpoint: ServiceEndpoint) {
        self.inner.state.write().endpoint = Some(endpoint);
    }

    // ---------------------------------------------------------------
    // Session and role
    // ---------------------------------------------------------------

    pub fn session(&self) -> Option<Session> {
        self.inner.state.read().session.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .state
            .read()
            .session
            .as_ref()
            .map(|s| s.authenticated)
            .unwrap_or(false)
    }

    /// Gate for every session-scoped call
    pub fn require_session(&self) -> Result<Session> {
        let state = self.inner.state.read();
        if state.endpoint.is_none() {
            return Err(ClientError::EndpointUnset);
        }
        match &state.session {
            Some(session) if session.authenticated => Ok(session.clone()),
            _ => Err(ClientError::NotAuthenticated),
        }
    }

    pub(crate) fn begin_session(&self, session: Session, role: Role) {
        let mut state = self.inner.state.write();
        state.session = Some(session);
        state.role = Some(role);
    }

    pub(crate) fn role(&self) -> Option<Role> {
        self.inner.state.read().role
    }

    pub(crate) fn set_role(&self, role: Role) {
        self.inner.state.write().role = Some(role);
    }

    /// Drop session, role and endpoint in one step, then the scratch space.
    pub(crate) fn clear_session_state(&self) {
        {
            let mut state = self.inner.state.write();
            state.session = None;
            state.role = None;
            state.endpoint = None;
        }
        self.inner.scratch.write().clear();
    }

    // ---------------------------------------------------------------
    // Ephemeral scratch storage, cleared on logout
    // ---------------------------------------------------------------

    pub fn scratch_get(&self, key: &str) -> Option<String> {
        self.inner.scratch.read().get(key).cloned()
    }

    pub fn scratch_put(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.scratch.write().insert(key.into(), value.into());
    }

    pub fn scratch_len(&self) -> usize {
        self.inner.scratch.read().len()
    }

    // ---------------------------------------------------------------
    // Outcome reporting
    // ---------------------------------------------------------------

    /// Route a failure through the alert channel and hand the result back.
    pub(crate) fn report<T>(&self, context: &str, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.alerts().show(format!("{context}: {e}"), Severity::Error);
        }
        result
    }

    pub(crate) fn notify(&self, message: impl Into<String>, severity: Severity) {
        self.alerts().show(message, severity);
    }
}
