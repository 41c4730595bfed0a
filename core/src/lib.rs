pub mod alert;
pub mod api;
pub mod block;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod query;
pub mod role;
pub mod session;
pub mod storage;
pub mod transaction;
pub mod upload;
pub mod workflow;

pub use alert::{Alert, AlertChannel, Severity};
pub use api::{ArtifactFile, ArtifactListing};
pub use block::Block;
pub use config::Config;
pub use context::{ClientContext, ServiceEndpoint, Session};
pub use endpoint::EndpointResolver;
pub use error::ClientError;
pub use query::{BlockFilter, BlockQueryService};
pub use role::{Role, RoleController};
pub use session::{ConfirmPrompt, LogoutOutcome, SessionManager};
pub use storage::{CredentialStore, Credentials, MemoryCredentialStore, SledCredentialStore};
pub use transaction::{ModelArtifact, Transaction, TransactionStatus};
pub use upload::{Cid, UploadPipeline};
pub use workflow::{TransactionWorkflow, WorkflowState};

pub type Result<T> = std::result::Result<T, ClientError>;
