use std::net::TcpListener;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use httpmock::MockServer;
use httpmock::prelude::*;
use radmesh_app::build_server;
use radmesh_config::MeshConfig;
use radmesh_telemetry::Metrics;
use radmesh_test_support::{TestUploads, plan_archive};
use serde_json::{Value, json};
use tower::ServiceExt;

const BOUNDARY: &str = "radmesh-pipeline-boundary";

fn router(uploads: &TestUploads, genie: &str) -> anyhow::Result<axum::Router> {
    let root = uploads.path().display().to_string();
    let genie = genie.to_string();
    let config = MeshConfig::from_lookup(|key| match key {
        "UPLOAD_DIR" => Some(root.clone()),
        "GENIE_API" => Some(genie.clone()),
        "RADMESH_REMOTE_TIMEOUT_SECS" => Some("5".to_string()),
        _ => None,
    })?;
    Ok(build_server(&config, Metrics::new()?)?.into_router())
}

fn upload_request(archive: &[u8], start_computation: bool) -> anyhow::Result<Request<Body>> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"plan42.zip\"\r\nContent-Type: application/zip\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(archive);
    body.extend_from_slice(
        format!(
            "\r\n--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"startComputation\"\r\n\r\n{start_computation}\r\n--{BOUNDARY}--\r\n"
        )
        .as_bytes(),
    );
    Ok(Request::builder()
        .method("POST")
        .uri("/api/Upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))?)
}

fn json_request(method: &str, uri: &str, body: &Value) -> anyhow::Result<Request<Body>> {
    Ok(Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body)?))?)
}

async fn json_body(response: Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn upload_with_computation_reaches_genie_and_lists_workspace() -> anyhow::Result<()> {
    let genie = MockServer::start_async().await;
    let mock = genie
        .mock_async(|when, then| {
            when.method(POST).path("/MakeCtMesh");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"saved": true}));
        })
        .await;
    let uploads = TestUploads::new()?;
    let app = router(&uploads, &genie.base_url())?;

    let response = app
        .clone()
        .oneshot(upload_request(&plan_archive(&[])?, true)?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["stage"], "dispatched");
    assert_eq!(body["meshName"], "plan42");
    assert_eq!(body["computation"]["status"], 200);
    assert_eq!(body["computation"]["body"], json!({"saved": true}));
    mock.assert_async().await;

    assert!(uploads.dicoms_root().join("plan42/ctFiles/1.dcm").is_file());
    assert!(uploads.path().join("CT/plan42").is_dir());

    let listing = app
        .clone()
        .oneshot(Request::builder().uri("/api/UploadedDicoms").body(Body::empty())?)
        .await?;
    assert_eq!(listing.status(), StatusCode::OK);
    assert_eq!(json_body(listing).await?, json!({"meshesNames": ["plan42"]}));

    let files = app
        .oneshot(Request::builder().uri("/api/Upload").body(Body::empty())?)
        .await?;
    let files = json_body(files).await?;
    assert_eq!(files["count"], 1);
    assert_eq!(files["files"], json!(["plan42"]));
    Ok(())
}

#[tokio::test]
async fn make_mesh_passes_remote_failure_through() -> anyhow::Result<()> {
    let genie = MockServer::start_async().await;
    genie
        .mock_async(|when, then| {
            when.method(POST).path("/MakeRoiMesh");
            then.status(500).body("mesh failed");
        })
        .await;
    let uploads = TestUploads::new()?;
    uploads.plan_workspace("plan42")?;
    let app = router(&uploads, &genie.base_url())?;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/MakeMesh",
            &json!({"mesh_type": "ROI", "mesh_params": ["plan42", "heart"]}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    assert_eq!(&bytes[..], b"mesh failed");
    assert!(uploads.path().join("ROI/plan42").is_dir());
    Ok(())
}

#[tokio::test]
async fn unreachable_genie_is_a_gateway_problem() -> anyhow::Result<()> {
    let closed = {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        format!("http://{}", listener.local_addr()?)
    };
    let uploads = TestUploads::new()?;
    uploads.plan_workspace("plan42")?;
    let app = router(&uploads, &closed)?;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/MakeMesh",
            &json!({"mesh_type": "CT", "mesh_params": ["plan42"]}),
        )?)
        .await?;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await?;
    assert_eq!(body["type"], "https://radmesh.dev/problems/remote-failure");
    Ok(())
}

#[tokio::test]
async fn regions_of_a_non_dicom_structure_set_are_unprocessable() -> anyhow::Result<()> {
    let uploads = TestUploads::new()?;
    uploads.plan_workspace("plan42")?;
    let app = router(&uploads, "http://127.0.0.1:8001")?;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/UploadedDicoms/plan42/regions")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let missing = app
        .oneshot(
            Request::builder()
                .uri("/api/UploadedDicoms/plan99/regions")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    Ok(())
}
