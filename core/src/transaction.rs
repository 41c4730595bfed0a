use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::{ClientError, Result};

/// Locally observed lifecycle of a transaction. The service never sends this;
/// it is derived from submission and confirmation polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionStatus {
    #[default]
    Pending,
    Mining,
    Confirmed,
    Failed,
}

/// A model/dataset transaction as the service encodes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub from: String,
    pub nonce: u64,
    #[serde(rename = "input_model", default)]
    pub model_cid: String,
    #[serde(rename = "input_dataSet", default)]
    pub dataset_cid: String,
    /// Base64 JSON envelope produced by model execution; empty until mined
    #[serde(default, deserialize_with = "null_as_default")]
    pub model_output: String,
    #[serde(rename = "blockId", default)]
    pub block_id: String,
    #[serde(default)]
    pub signature: String,
    #[serde(rename = "modelFile", default)]
    pub model_file: String,
    #[serde(rename = "type", default)]
    pub tx_type: String,
    #[serde(skip)]
    pub status: TransactionStatus,
}

/// Decoded `model_output` of a mined transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelArtifact {
    pub model: Vec<u8>,
}

#[derive(Deserialize)]
struct ModelEnvelope {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl Transaction {
    pub fn new(from: impl Into<String>, nonce: u64, model_cid: impl Into<String>, dataset_cid: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            nonce,
            model_cid: model_cid.into(),
            dataset_cid: dataset_cid.into(),
            model_output: String::new(),
            block_id: String::new(),
            signature: String::new(),
            model_file: String::new(),
            tx_type: "transaction".to_string(),
            status: TransactionStatus::Pending,
        }
    }

    /// Identity used by confirmation polling
    pub fn key(&self) -> (&str, u64) {
        (&self.from, self.nonce)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == TransactionStatus::Confirmed
    }

    pub fn has_model_output(&self) -> bool {
        !self.model_output.is_empty()
    }

    /// Decode the trained model carried in `model_output`.
    ///
    /// The payload is base64 of a JSON object `{ "model": <base64>, "error": <string> }`.
    /// An `error` reported by model execution takes precedence over any model bytes.
    pub fn model_artifact(&self) -> Result<ModelArtifact> {
        if self.model_output.is_empty() {
            return Err(ClientError::MissingInput("model output is missing".to_string()));
        }
        let engine = base64::engine::general_purpose::STANDARD;
        let envelope_bytes = engine.decode(self.model_output.trim())?;
        let envelope: ModelEnvelope = serde_json::from_slice(&envelope_bytes)?;

        if let Some(err) = envelope.error.filter(|e| !e.is_empty()) {
            return Err(ClientError::Server(format!("model execution failed: {err}")));
        }
        let model = envelope
            .model
            .ok_or_else(|| ClientError::MissingInput("model data is missing".to_string()))?;
        Ok(ModelArtifact { model: engine.decode(model.trim())? })
    }
}

// An empty model output arrives as JSON null.
fn null_as_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
