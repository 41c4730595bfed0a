use serde::{Deserialize, Serialize};

use crate::transaction::{Transaction, TransactionStatus};

/// A block produced by the service. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "blockNum", default)]
    pub block_number: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transactions: Vec<Transaction>,
    #[serde(rename = "prev_Hash", default)]
    pub previous_hash: String,
    #[serde(rename = "proposerId", default)]
    pub proposer_id: String,
    #[serde(rename = "eventEmit", default)]
    pub event_emit: String,
    #[serde(rename = "timeStamp", default)]
    pub timestamp: String,
    #[serde(rename = "transactionsHash", default)]
    pub transactions_hash: String,
    #[serde(default)]
    pub salt: String,
    #[serde(default)]
    pub difficulty: u32,
    #[serde(default)]
    pub proof: String,
    #[serde(rename = "type", default)]
    pub block_type: String,
}

impl Block {
    pub fn new(block_number: u64, transactions: Vec<Transaction>) -> Self {
        Self {
            block_number,
            transactions,
            previous_hash: String::new(),
            proposer_id: String::new(),
            event_emit: String::new(),
            timestamp: String::new(),
            transactions_hash: String::new(),
            salt: String::new(),
            difficulty: 0,
            proof: String::new(),
            block_type: "block".to_string(),
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Find a transaction by its `(from, nonce)` identity
    pub fn find_transaction(&self, from: &str, nonce: u64) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.from == from && tx.nonce == nonce)
    }

    /// Keep only the transactions sent by `public_key`
    pub fn retain_sender(&mut self, public_key: &str) {
        self.transactions.retain(|tx| tx.from == public_key);
    }

    pub(crate) fn mark_confirmed(&mut self) {
        for tx in &mut self.transactions {
            tx.status = TransactionStatus::Confirmed;
        }
    }
}

/// Restrict `blocks` to the transactions sent by `public_key`, dropping
/// blocks that end up empty. Block order is preserved.
pub fn filter_own_transactions(blocks: Vec<Block>, public_key: &str) -> Vec<Block> {
    blocks
        .into_iter()
        .filter_map(|mut block| {
            block.retain_sender(public_key);
            (!block.transactions.is_empty()).then_some(block)
        })
        .collect()
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Transaction>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Transaction>>::deserialize(deserializer)?.unwrap_or_default())
}
