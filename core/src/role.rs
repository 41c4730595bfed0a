use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::alert::Severity;
use crate::api::RoleReply;
use crate::context::ClientContext;
use crate::query::BlockQueryService;
use crate::{ClientError, Result};

/// Local operating mode negotiated with the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Miner,
    Validator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Miner => "Miner",
            Role::Validator => "Validator",
        }
    }

    /// Only miners originate transactions
    pub fn can_originate_transactions(&self) -> bool {
        match self {
            Role::Miner => true,
            Role::Validator => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "miner" => Ok(Role::Miner),
            "validator" => Ok(Role::Validator),
            other => Err(ClientError::InvalidRole(other.to_string())),
        }
    }
}

/// Owns the role transitions of the active session.
///
/// The Validator guard is advisory: the service may start mining between the
/// currently-mining check and the `setRole` request, and nothing here can
/// close that window.
#[derive(Clone)]
pub struct RoleController {
    ctx: ClientContext,
    blocks: BlockQueryService,
}

impl RoleController {
    pub fn new(ctx: ClientContext) -> Self {
        let blocks = BlockQueryService::new(ctx.clone());
        Self { ctx, blocks }
    }

    /// The locally tracked role
    pub fn get_role(&self) -> Result<Role> {
        self.ctx.require_session()?;
        self.ctx.role().ok_or(ClientError::NotAuthenticated)
    }

    /// Re-read the role from the service and adopt it locally
    pub async fn refresh_role(&self) -> Result<Role> {
        let result = self.fetch_remote_role().await;
        self.ctx.report("Failed to read role", result)
    }

    pub(crate) async fn fetch_remote_role(&self) -> Result<Role> {
        self.ctx.require_session()?;
        let reply: RoleReply = self.ctx.api().get("/getRole", &[]).await?;
        let role = reply.role.parse::<Role>()?;
        self.ctx.set_role(role);
        Ok(role)
    }

    pub async fn set_role(&self, target: Role) -> Result<Role> {
        let result = self.try_set_role(target).await;
        let result = self.ctx.report("Role change rejected", result);
        if let Ok(role) = &result {
            self.ctx.notify(format!("Role set to {role}"), Severity::Success);
        }
        result
    }

    async fn try_set_role(&self, target: Role) -> Result<Role> {
        self.ctx.require_session()?;

        match target {
            Role::Validator => {
                if let Some(block) = self.blocks.fetch_currently_mining().await? {
                    log::warn!(
                        "⛏️ Refusing Validator role: block {} is being mined",
                        block.block_number
                    );
                    return Err(ClientError::RoleConflict);
                }
            }
            Role::Miner => {}
        }

        let _: serde_json::Value = self
            .ctx
            .api()
            .post_form("/setRole", &[("role", target.as_str())])
            .await?;

        self.ctx.set_role(target);
        log::info!("🔁 Role changed to {target}");
        Ok(target)
    }
}
