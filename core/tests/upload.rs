mod common;

use std::path::PathBuf;

use common::{MockService, UPLOAD_CID};
use proofai_client::{ClientError, UploadPipeline};

fn write_files(dir: &std::path::Path) -> Vec<PathBuf> {
    let model = dir.join("model.py");
    let data = dir.join("data.csv");
    std::fs::write(&model, "print('train')").unwrap();
    std::fs::write(&data, "a,b\n1,2\n").unwrap();
    vec![model, data]
}

#[tokio::test]
async fn uploads_all_files_as_one_set() {
    let mock = MockService::start().await;
    let ctx = mock.logged_in_context().await;
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path());

    let cid = UploadPipeline::new(ctx).upload(&files).await.unwrap();
    assert_eq!(cid.as_str(), UPLOAD_CID);

    let state = mock.state.lock();
    assert_eq!(state.uploaded_files, vec!["model.py".to_string(), "data.csv".to_string()]);
    assert_eq!(state.requests.iter().filter(|r| r.as_str() == "POST /upload").count(), 1);
}

#[tokio::test]
async fn empty_selection_is_missing_input() {
    let mock = MockService::start().await;
    let pipeline = UploadPipeline::new(mock.logged_in_context().await);
    mock.clear_requests();

    let result = pipeline.upload(&[]).await;
    assert!(matches!(result, Err(ClientError::MissingInput(_))));
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn oversized_set_is_rejected_before_sending() {
    let mock = MockService::start().await;
    let mut config = mock.config();
    config.gateway.max_upload_bytes = 4;
    let ctx = proofai_client::ClientContext::from_config(config).unwrap();
    proofai_client::EndpointResolver::new(ctx.clone())
        .resolve(&mock.address())
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path());

    let result = UploadPipeline::new(ctx).upload(&files).await;
    assert!(matches!(result, Err(ClientError::Upload(_))));
    assert!(mock.state.lock().uploaded_files.is_empty());
}

#[tokio::test]
async fn gateway_failure_is_upload_error() {
    let mock = MockService::start().await;
    let ctx = mock.logged_in_context().await;
    mock.state.lock().fail_uploads = true;
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path());

    match UploadPipeline::new(ctx).upload(&files).await {
        Err(ClientError::Upload(message)) => assert!(message.contains("Unable to store files")),
        other => panic!("expected upload error, got {other:?}"),
    }
}

#[tokio::test]
async fn fetch_lists_artifact_files() {
    let mock = MockService::start().await;
    let pipeline = UploadPipeline::new(mock.logged_in_context().await);

    let listing = pipeline.fetch_artifact(UPLOAD_CID).await.unwrap();
    assert!(listing.success);
    let names: Vec<_> = listing.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["model.py", "data.csv"]);

    let result = pipeline.fetch_artifact("QmUnknown").await;
    assert!(matches!(result, Err(ClientError::Server(_))));
}
