use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::transaction::Transaction;
use crate::{ClientError, Result};

/// The service answers "nothing here" with the string `"null"` rather than
/// JSON null; older builds send real nulls or omit the field.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Nullable<T> {
    Present(T),
    Sentinel(String),
}

/// Collapse an optional [`Nullable`] field into `Option<T>`.
pub fn resolve_nullable<T>(field: Option<Nullable<T>>, what: &str) -> Result<Option<T>> {
    match field {
        None => Ok(None),
        Some(Nullable::Present(value)) => Ok(Some(value)),
        Some(Nullable::Sentinel(s)) if s == "null" || s.is_empty() => Ok(None),
        Some(Nullable::Sentinel(other)) => Err(ClientError::Serialization(format!(
            "unexpected {what} payload: {other:?}"
        ))),
    }
}

/// Login response
#[derive(Debug, Deserialize)]
pub struct LoginReply {
    #[serde(default)]
    pub login: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl LoginReply {
    pub fn succeeded(&self) -> bool {
        self.login.as_deref() == Some("Success")
    }
}

/// Generated key pair
#[derive(Debug, Deserialize)]
pub struct KeyPairReply {
    #[serde(rename = "pubKey")]
    pub pub_key: String,
    #[serde(rename = "prvKey")]
    pub prv_key: String,
}

#[derive(Debug, Deserialize)]
pub struct RoleReply {
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct PubKeyReply {
    #[serde(rename = "pubKey")]
    pub pub_key: String,
}

#[derive(Debug, Deserialize)]
pub struct ServiceMachineReply {
    #[serde(rename = "serviceMachineIP", default)]
    pub service_machine_ip: String,
}

#[derive(Debug, Deserialize)]
pub struct CurrentBlockReply {
    #[serde(default)]
    pub block: Option<Nullable<Block>>,
}

#[derive(Debug, Deserialize)]
pub struct CurrentTransactionReply {
    #[serde(default)]
    pub transaction: Option<Nullable<Transaction>>,
}

#[derive(Debug, Deserialize)]
pub struct MinedBlocksReply {
    #[serde(default)]
    pub blocks: Option<Nullable<Vec<Block>>>,
}

#[derive(Debug, Deserialize)]
pub struct NewTransactionReply {
    pub transaction: Transaction,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmationReply {
    pub transaction: String,
}

impl ConfirmationReply {
    pub fn is_confirmed(&self) -> bool {
        self.transaction.eq_ignore_ascii_case("confirmed")
    }
}

/// Gateway upload response. Current gateways put the CID in `message`;
/// the `cid` field is accepted as well.
#[derive(Debug, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
}

/// A file stored under an artifact CID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub name: String,
    pub hash: String,
    pub content: String,
}

/// Gateway listing of an artifact's files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactListing {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub files: Vec<ArtifactFile>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<ArtifactFile>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<ArtifactFile>>::deserialize(deserializer)?.unwrap_or_default())
}
