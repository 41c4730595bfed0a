use crate::alert::Severity;
use crate::api::{KeyPairReply, LoginReply};
use crate::block::Block;
use crate::context::{ClientContext, Session};
use crate::query::BlockQueryService;
use crate::role::Role;
use crate::storage::Credentials;
use crate::{ClientError, Result};

/// Asked before logging out while a block is still being mined.
pub trait ConfirmPrompt {
    fn confirm(&self, block: &Block) -> bool;
}

impl<F> ConfirmPrompt for F
where
    F: Fn(&Block) -> bool,
{
    fn confirm(&self, block: &Block) -> bool {
        self(block)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    LoggedOut,
    /// The user declined to abandon the block in progress; nothing changed
    Cancelled,
}

/// Login, logout and key generation against the service.
#[derive(Clone)]
pub struct SessionManager {
    ctx: ClientContext,
    blocks: BlockQueryService,
}

impl SessionManager {
    pub fn new(ctx: ClientContext) -> Self {
        let blocks = BlockQueryService::new(ctx.clone());
        Self { ctx, blocks }
    }

    pub fn is_authenticated(&self) -> bool {
        self.ctx.is_authenticated()
    }

    pub fn session(&self) -> Option<Session> {
        self.ctx.session()
    }

    /// Credentials saved by an earlier "remember me" login
    pub fn remembered_credentials(&self) -> Result<Option<Credentials>> {
        self.ctx.credential_store().load()
    }

    /// Authenticate with a key pair.
    ///
    /// On success the credential store is written when `remember_me` is set and
    /// cleared otherwise. On failure no local state changes.
    pub async fn login(&self, public_key: &str, private_key: &str, remember_me: bool) -> Result<Session> {
        let result = self.try_login(public_key, private_key, remember_me).await;
        let result = self.ctx.report("Error during login", result);
        if result.is_ok() {
            self.ctx.alerts().hide();
        }
        result
    }

    async fn try_login(&self, public_key: &str, private_key: &str, remember_me: bool) -> Result<Session> {
        self.ctx.require_endpoint()?;
        let credentials = Credentials::new(public_key.trim(), private_key.trim());
        if credentials.public_key.is_empty() || credentials.private_key.is_empty() {
            return Err(ClientError::Auth("public and private key are required".to_string()));
        }

        let reply: LoginReply = self
            .ctx
            .api()
            .post_form_any_status(
                "/login",
                &[("PubKey", credentials.public_key.as_str()), ("PrvKey", credentials.private_key.as_str())],
            )
            .await
            .map_err(|e| match e {
                ClientError::Server(msg) | ClientError::Network(msg) => ClientError::Auth(msg),
                other => other,
            })?;

        if !reply.succeeded() {
            let reason = reply
                .message
                .or(reply.login)
                .unwrap_or_else(|| "rejected by service".to_string());
            return Err(ClientError::Auth(reason));
        }

        let store = self.ctx.credential_store();
        if remember_me {
            store.save(&credentials)?;
            log::info!("💾 Credentials remembered for next start");
        } else {
            store.clear()?;
        }

        let session = Session::authenticated(&credentials);
        // A fresh service session always starts out mining
        self.ctx.begin_session(session.clone(), Role::Miner);
        log::info!("🔑 Logged in as {}", abbreviate(&session.public_key));
        Ok(session)
    }

    /// End the session.
    ///
    /// The remote logout runs before any local state is touched, so a failed
    /// request leaves the session exactly as it was.
    pub async fn logout(&self, prompt: &dyn ConfirmPrompt) -> Result<LogoutOutcome> {
        self.ctx.alerts().hide();
        let result = self.try_logout(prompt).await;
        self.ctx.report("Logout failed", result)
    }

    async fn try_logout(&self, prompt: &dyn ConfirmPrompt) -> Result<LogoutOutcome> {
        self.ctx.require_session()?;

        if let Some(block) = self.blocks.fetch_currently_mining().await? {
            if !prompt.confirm(&block) {
                log::info!("↩️ Logout cancelled; block {} is still being mined", block.block_number);
                return Ok(LogoutOutcome::Cancelled);
            }
            log::warn!("⚠️ Logging out while block {} is being mined", block.block_number);
        }

        let _: serde_json::Value = self.ctx.api().post("/logout").await?;

        self.ctx.clear_session_state();
        if let Err(e) = self.ctx.credential_store().clear() {
            // The service session is already gone; keep the local side consistent with it
            log::error!("❌ Failed to remove remembered credentials: {e}");
        }
        log::info!("👋 Logged out; resolve the service machine again to continue");
        Ok(LogoutOutcome::LoggedOut)
    }

    /// Ask the service for a fresh key pair. Does not log in.
    pub async fn generate_keys(&self) -> Result<Credentials> {
        let result = self.try_generate_keys().await;
        let result = self.ctx.report("Error in generating key", result);
        if result.is_ok() {
            self.ctx.notify("New key pair generated", Severity::Success);
        }
        result
    }

    async fn try_generate_keys(&self) -> Result<Credentials> {
        self.ctx.require_endpoint()?;
        let reply: KeyPairReply = self.ctx.api().post("/generateKeys").await?;
        Ok(Credentials::new(reply.pub_key, reply.prv_key))
    }
}

fn abbreviate(key: &str) -> String {
    if key.len() <= 16 {
        return key.to_string();
    }
    match (key.get(..8), key.get(key.len() - 8..)) {
        (Some(head), Some(tail)) => format!("{head}…{tail}"),
        _ => key.to_string(),
    }
}
