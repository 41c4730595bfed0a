use crate::api::{resolve_nullable, CurrentBlockReply, CurrentTransactionReply, MinedBlocksReply, PubKeyReply};
use crate::block::{filter_own_transactions, Block};
use crate::context::ClientContext;
use crate::transaction::{Transaction, TransactionStatus};
use crate::Result;

/// Which mined blocks to return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockFilter {
    #[default]
    All,
    OwnOnly,
}

impl BlockFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockFilter::All => "All Transactions",
            BlockFilter::OwnOnly => "Own Transactions",
        }
    }
}

/// Read-only queries over the service's blocks
#[derive(Clone)]
pub struct BlockQueryService {
    ctx: ClientContext,
}

impl BlockQueryService {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// The block being mined for this session, if any
    pub async fn currently_mining(&self) -> Result<Option<Block>> {
        let result = self.fetch_currently_mining().await;
        self.ctx.report("Failed to read currently mining block", result)
    }

    pub(crate) async fn fetch_currently_mining(&self) -> Result<Option<Block>> {
        self.ctx.require_session()?;
        let reply: CurrentBlockReply = self.ctx.api().get("/getCurrentlyMinBlock", &[]).await?;
        resolve_nullable(reply.block, "block")
    }

    /// The transaction being mined for this session, if any
    pub async fn currently_mining_transaction(&self) -> Result<Option<Transaction>> {
        let result = self.fetch_currently_mining_transaction().await;
        self.ctx.report("Failed to read currently mining transaction", result)
    }

    async fn fetch_currently_mining_transaction(&self) -> Result<Option<Transaction>> {
        self.ctx.require_session()?;
        let reply: CurrentTransactionReply =
            self.ctx.api().get("/getCurrentlyMinTransaction", &[]).await?;
        let tx = resolve_nullable(reply.transaction, "transaction")?;
        Ok(tx.map(|mut tx| {
            tx.status = TransactionStatus::Mining;
            tx
        }))
    }

    /// Public key the service holds for this session
    pub async fn own_public_key(&self) -> Result<String> {
        self.ctx.require_session()?;
        let reply: PubKeyReply = self.ctx.api().get("/Pubkey", &[]).await?;
        Ok(reply.pub_key)
    }

    /// Mined blocks, optionally narrowed to this session's own transactions.
    ///
    /// The service is always asked for the full ledger; the `OwnOnly` view is
    /// derived locally from that superset.
    pub async fn list_mined_blocks(&self, filter: BlockFilter) -> Result<Vec<Block>> {
        let result = self.try_list_mined_blocks(filter).await;
        self.ctx.report("Failed to fetch mined blocks", result)
    }

    async fn try_list_mined_blocks(&self, filter: BlockFilter) -> Result<Vec<Block>> {
        self.ctx.require_session()?;
        let reply: MinedBlocksReply = self
            .ctx
            .api()
            .get("/getMinedBlocks", &[("filterValue", BlockFilter::All.as_str().to_string())])
            .await?;
        let mut blocks = resolve_nullable(reply.blocks, "blocks")?.unwrap_or_default();
        for block in &mut blocks {
            block.mark_confirmed();
        }

        match filter {
            BlockFilter::All => Ok(blocks),
            BlockFilter::OwnOnly => {
                let public_key = self.own_public_key().await?;
                let own = filter_own_transactions(blocks, &public_key);
                log::debug!("🔎 {} block(s) carry transactions from this session", own.len());
                Ok(own)
            }
        }
    }
}
