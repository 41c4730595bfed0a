use std::fmt;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use reqwest::multipart::{Form, Part};
use uuid::Uuid;

use crate::alert::Severity;
use crate::api::{decode_json, ArtifactListing, UploadReply};
use crate::context::ClientContext;
use crate::{ClientError, Result};

/// Content identifier assigned by the storage gateway
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cid(String);

impl Cid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Cid> for String {
    fn from(cid: Cid) -> Self {
        cid.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Reading,
    Sending,
    Done,
    Failed,
}

/// One upload call. Lives only for the duration of `upload`.
#[derive(Debug)]
struct UploadJob {
    id: Uuid,
    files: Vec<PathBuf>,
    cid: Option<Cid>,
    status: UploadStatus,
}

impl UploadJob {
    fn new(files: &[PathBuf]) -> Self {
        Self {
            id: Uuid::new_v4(),
            files: files.to_vec(),
            cid: None,
            status: UploadStatus::Reading,
        }
    }
}

struct LoadedFile {
    name: String,
    bytes: Vec<u8>,
}

/// Sends model and dataset files to the storage gateway.
#[derive(Clone)]
pub struct UploadPipeline {
    ctx: ClientContext,
}

impl UploadPipeline {
    pub fn new(ctx: ClientContext) -> Self {
        Self { ctx }
    }

    /// Upload every file in one multipart request and return the CID of the set.
    pub async fn upload(&self, files: &[PathBuf]) -> Result<Cid> {
        let mut job = UploadJob::new(files);
        let result = self.run(&mut job).await;
        if result.is_err() {
            job.status = UploadStatus::Failed;
        }
        log::debug!("📦 Upload job {} finished as {:?} ({:?})", job.id, job.status, job.cid);

        let result = self.ctx.report("Upload failed", result);
        if let Ok(cid) = &result {
            self.ctx.notify(format!("Uploaded with CID {cid}"), Severity::Success);
        }
        result
    }

    async fn run(&self, job: &mut UploadJob) -> Result<Cid> {
        let endpoint = self.ctx.require_endpoint()?;
        if job.files.is_empty() {
            return Err(ClientError::MissingInput("no files selected for upload".to_string()));
        }

        let loaded = try_join_all(job.files.iter().map(|path| load_file(path))).await?;

        let total: u64 = loaded.iter().map(|f| f.bytes.len() as u64).sum();
        let limit = self.ctx.config().gateway.max_upload_bytes;
        if total > limit {
            return Err(ClientError::Upload(format!(
                "{total} bytes exceeds the {limit} byte upload limit"
            )));
        }

        let mut hasher = blake3::Hasher::new();
        let mut form = Form::new();
        for file in loaded {
            hasher.update(&file.bytes);
            let part = Part::bytes(file.bytes).file_name(file.name);
            form = form.part("files", part);
        }
        let digest = hasher.finalize();
        log::info!(
            "📤 Uploading {} file(s), {} bytes, digest {}",
            job.files.len(),
            total,
            hex::encode(&digest.as_bytes()[..8])
        );

        job.status = UploadStatus::Sending;
        let url = endpoint.gateway_url(&self.ctx.config().gateway.upload_route);
        let response = self.ctx.api().http().post(&url).multipart(form).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            let text = body.trim();
            return Err(ClientError::Upload(if text.is_empty() {
                status.to_string()
            } else {
                text.to_string()
            }));
        }

        let reply: UploadReply = serde_json::from_str(&body)
            .map_err(|e| ClientError::Upload(format!("unexpected gateway response: {e}")))?;
        if reply.success == Some(false) {
            return Err(ClientError::Upload(
                reply.message.unwrap_or_else(|| "rejected by gateway".to_string()),
            ));
        }

        let cid = reply
            .cid
            .or(reply.message)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ClientError::Upload("gateway returned no CID".to_string()))?;

        let cid = Cid(cid);
        job.cid = Some(cid.clone());
        job.status = UploadStatus::Done;
        log::info!("✅ Upload stored as {cid}");
        Ok(cid)
    }

    /// List the files stored under `cid`
    pub async fn fetch_artifact(&self, cid: &str) -> Result<ArtifactListing> {
        let result = self.try_fetch_artifact(cid).await;
        self.ctx.report("Fetch failed", result)
    }

    async fn try_fetch_artifact(&self, cid: &str) -> Result<ArtifactListing> {
        let endpoint = self.ctx.require_endpoint()?;
        let cid = cid.trim();
        if cid.is_empty() {
            return Err(ClientError::MissingInput("CID is required".to_string()));
        }

        let url = endpoint.gateway_url(&self.ctx.config().gateway.fetch_route);
        log::debug!("POST {url}");
        let response = self.ctx.api().http().post(&url).form(&[("cid", cid)]).send().await?;
        let listing: ArtifactListing = decode_json(response).await?;
        if !listing.success {
            return Err(ClientError::Server(if listing.message.is_empty() {
                format!("gateway has no files for {cid}")
            } else {
                listing.message
            }));
        }
        log::info!("📥 {} file(s) stored under {cid}", listing.files.len());
        Ok(listing)
    }
}

async fn load_file(path: &Path) -> Result<LoadedFile> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ClientError::Upload(format!("{} is not a file", path.display())))?;
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ClientError::Upload(format!("cannot read {}: {e}", path.display())))?;
    Ok(LoadedFile { name, bytes })
}
