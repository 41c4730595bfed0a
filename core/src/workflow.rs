use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::alert::Severity;
use crate::api::{ConfirmationReply, NewTransactionReply};
use crate::context::ClientContext;
use crate::role::{Role, RoleController};
use crate::transaction::{Transaction, TransactionStatus};
use crate::{ClientError, Result};

/// Scratch key holding the JSON of the last submitted transaction
pub const LAST_TRANSACTION_KEY: &str = "lastTransaction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingInputs,
    Submitting,
    Mining,
    Confirmed,
    Failed,
}

impl WorkflowState {
    pub fn is_in_flight(&self) -> bool {
        matches!(self, WorkflowState::Submitting | WorkflowState::Mining)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Confirmed | WorkflowState::Failed)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowState::Idle => "idle",
            WorkflowState::AwaitingInputs => "awaiting inputs",
            WorkflowState::Submitting => "submitting",
            WorkflowState::Mining => "mining",
            WorkflowState::Confirmed => "confirmed",
            WorkflowState::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Default)]
struct WorkflowInner {
    state: WorkflowState,
    model_cid: String,
    dataset_cid: String,
    tracked: Option<Transaction>,
}

impl WorkflowInner {
    fn restart_if_terminal(&mut self) {
        if self.state.is_terminal() {
            *self = WorkflowInner::default();
        }
    }
}

/// Drives one transaction at a time from submission to confirmation.
///
/// Clones share the same instance. Separate instances are not excluded from
/// each other.
#[derive(Clone)]
pub struct TransactionWorkflow {
    ctx: ClientContext,
    roles: RoleController,
    inner: Arc<Mutex<WorkflowInner>>,
}

impl TransactionWorkflow {
    pub fn new(ctx: ClientContext) -> Self {
        let roles = RoleController::new(ctx.clone());
        Self {
            ctx,
            roles,
            inner: Arc::new(Mutex::new(WorkflowInner::default())),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.lock().state
    }

    /// The transaction this instance submitted last, if any
    pub fn current_transaction(&self) -> Option<Transaction> {
        self.inner.lock().tracked.clone()
    }

    pub fn set_model_cid(&self, cid: &str) -> Result<()> {
        self.stage(|inner| inner.model_cid = cid.trim().to_string())
    }

    pub fn set_dataset_cid(&self, cid: &str) -> Result<()> {
        self.stage(|inner| inner.dataset_cid = cid.trim().to_string())
    }

    fn stage(&self, apply: impl FnOnce(&mut WorkflowInner)) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.state.is_in_flight() {
            return Err(ClientError::Busy);
        }
        inner.restart_if_terminal();
        apply(&mut inner);
        inner.state = WorkflowState::AwaitingInputs;
        Ok(())
    }

    /// Back to `Idle`, dropping staged inputs and the tracked transaction
    pub fn reset(&self) {
        *self.inner.lock() = WorkflowInner::default();
    }

    /// Submit whatever `set_model_cid` and `set_dataset_cid` staged
    pub async fn submit_staged(&self) -> Result<Transaction> {
        let (model, dataset) = {
            let inner = self.inner.lock();
            (inner.model_cid.clone(), inner.dataset_cid.clone())
        };
        self.submit(&model, &dataset).await
    }

    /// Submit a model/dataset pair for mining.
    pub async fn submit(&self, model_cid: &str, dataset_cid: &str) -> Result<Transaction> {
        let result = self.try_submit(model_cid.trim(), dataset_cid.trim()).await;
        let result = self.ctx.report("Transaction failed", result);
        if let Ok(tx) = &result {
            self.ctx
                .notify(format!("Transaction {} accepted for mining", tx.nonce), Severity::Success);
        }
        result
    }

    async fn try_submit(&self, model_cid: &str, dataset_cid: &str) -> Result<Transaction> {
        if model_cid.is_empty() {
            return Err(ClientError::MissingInput("model CID is required".to_string()));
        }
        if dataset_cid.is_empty() {
            return Err(ClientError::MissingInput("dataset CID is required".to_string()));
        }
        self.ctx.require_session()?;

        {
            let mut inner = self.inner.lock();
            if inner.state.is_in_flight() {
                return Err(ClientError::Busy);
            }
            inner.restart_if_terminal();
            inner.model_cid = model_cid.to_string();
            inner.dataset_cid = dataset_cid.to_string();
            inner.state = WorkflowState::Submitting;
        }

        match self.send(model_cid, dataset_cid).await {
            Ok(tx) => {
                let mut inner = self.inner.lock();
                inner.state = WorkflowState::Mining;
                inner.tracked = Some(tx.clone());
                Ok(tx)
            }
            Err(e) => {
                self.inner.lock().state = WorkflowState::Failed;
                Err(e)
            }
        }
    }

    async fn send(&self, model_cid: &str, dataset_cid: &str) -> Result<Transaction> {
        // The local role may be stale; the service decides
        let role = self.roles.fetch_remote_role().await?;
        if role != Role::Miner {
            return Err(ClientError::RoleNotMiner(role.to_string()));
        }

        let reply: NewTransactionReply = self
            .ctx
            .api()
            .post_form("/newTransaction", &[("modelCID", model_cid), ("datasetCID", dataset_cid)])
            .await?;

        let mut tx = reply.transaction;
        tx.status = TransactionStatus::Mining;
        self.ctx.scratch_put(LAST_TRANSACTION_KEY, serde_json::to_string(&tx)?);
        log::info!("⛏️ Transaction {}/{} submitted for mining", tx.from, tx.nonce);
        Ok(tx)
    }

    /// Ask once whether `(from, nonce)` is in a mined block.
    ///
    /// `Ok(false)` means not mined yet. Polling is up to the caller.
    pub async fn check_confirmation(&self, from: &str, nonce: u64) -> Result<bool> {
        let result = self.try_check_confirmation(from, nonce).await;
        self.ctx.report("Confirmation check failed", result)
    }

    async fn try_check_confirmation(&self, from: &str, nonce: u64) -> Result<bool> {
        self.ctx.require_session()?;
        let reply: ConfirmationReply = self
            .ctx
            .api()
            .get_any_status(
                "/transactionConfirmation",
                &[("from", from.to_string()), ("nonce", nonce.to_string())],
            )
            .await?;

        if !reply.is_confirmed() {
            log::debug!("⏳ Transaction {from}/{nonce} still {}", reply.transaction);
            return Ok(false);
        }

        let mut inner = self.inner.lock();
        let tracks_it = inner.tracked.as_ref().map(|tx| tx.key() == (from, nonce)).unwrap_or(false);
        if tracks_it && inner.state == WorkflowState::Mining {
            inner.state = WorkflowState::Confirmed;
            if let Some(tx) = inner.tracked.as_mut() {
                tx.status = TransactionStatus::Confirmed;
            }
            drop(inner);
            self.ctx
                .notify(format!("Transaction {nonce} confirmed"), Severity::Success);
        }
        log::info!("✅ Transaction {from}/{nonce} confirmed");
        Ok(true)
    }
}
