use super::*;
use crate::test_support::{spawn_mock_server, MockServer, Recorded, ServerScript};
use axum::http::StatusCode;
use serde_json::json;
use shared::domain::WorkflowStatus;

fn controller_for(server: &MockServer) -> WorkflowController {
    let settings = ClientSettings::default().with_base_url(&format!("{}/", server.base_url));
    http_controller(&settings).expect("controller")
}

fn png() -> SelectedFile {
    SelectedFile::new("face.png", "image/png", vec![9u8; 1024])
}

#[tokio::test]
async fn end_to_end_success_downloads_then_deletes_job() {
    let server = spawn_mock_server(ServerScript::success("abc", "image/png")).await;
    let controller = controller_for(&server);
    controller.select(Some(png())).expect("select");

    let job = controller.submit().await.expect("submit");

    assert_eq!(job.display_label().as_deref(), Some("FAKE"));
    assert!(job.is_fake());
    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, WorkflowStatus::Succeeded);
    let result = snapshot.result.expect("result");
    assert_eq!(result.media_type.as_deref(), Some("image/png"));
    assert_eq!(
        controller.resolve(&result.url).map(|blob| blob.bytes.to_vec()),
        Some(b"rendered-output".to_vec())
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert!(matches!(requests[0], Recorded::Predict { .. }));
    assert!(matches!(requests[1], Recorded::Download { .. }));
    assert_eq!(
        requests[2],
        Recorded::Delete {
            job_id: "abc".to_string()
        }
    );
}

#[tokio::test]
async fn end_to_end_server_error_surfaces_detail() {
    let server = spawn_mock_server(ServerScript::success("abc", "image/png").with_predict(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "detail": "model unavailable" }),
    ))
    .await;
    let controller = controller_for(&server);
    controller.select(Some(png())).expect("select");

    controller.submit().await.expect_err("must fail");

    let snapshot = controller.snapshot();
    assert_eq!(snapshot.status, WorkflowStatus::Failed);
    assert_eq!(snapshot.error.as_deref(), Some("model unavailable"));
    assert!(snapshot.job.is_none());
    assert!(server.deleted_jobs().is_empty());
}

#[tokio::test]
async fn end_to_end_missing_download_url_is_cleaned_up_on_teardown() {
    let server = spawn_mock_server(ServerScript::success("abc", "image/png").with_predict(
        StatusCode::OK,
        json!({ "job_id": "abc", "label": "REAL", "output_type": "image/png" }),
    ))
    .await;
    let controller = controller_for(&server);
    controller.select(Some(png())).expect("select");

    controller.submit().await.expect_err("must fail");
    assert_eq!(
        controller.snapshot().error.as_deref(),
        Some("Missing download_url from API response.")
    );
    assert!(server.deleted_jobs().is_empty());

    controller.teardown();

    assert_eq!(server.wait_for_deletes(1).await, vec!["abc".to_string()]);
    assert_eq!(controller.registry().live_count(), 0);
}

#[tokio::test]
async fn rejected_selection_never_reaches_the_network() {
    let server = spawn_mock_server(ServerScript::success("abc", "image/png")).await;
    let controller = controller_for(&server);
    controller
        .select(Some(SelectedFile::new("notes.pdf", "application/pdf", vec![0u8; 16])))
        .expect("select");

    controller.submit().await.expect_err("must fail");

    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn malformed_predict_body_is_a_contract_error() {
    let server = spawn_mock_server(
        ServerScript::success("abc", "image/png")
            .with_predict(StatusCode::OK, json!("not an object")),
    )
    .await;
    let controller = controller_for(&server);
    controller.select(Some(png())).expect("select");

    let err = controller.submit().await.expect_err("must fail");

    assert_eq!(err.category(), ErrorCategory::Contract);
    assert_eq!(controller.status(), WorkflowStatus::Failed);
}
