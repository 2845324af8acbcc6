//! In-process stand-in for the analysis service.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Predict {
        field: String,
        file_name: Option<String>,
        content_type: Option<String>,
        len: usize,
        sample_every: Option<u32>,
    },
    Download {
        job_id: String,
        cache_control: Option<String>,
    },
    Delete {
        job_id: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerScript {
    pub predict_status: StatusCode,
    pub predict_body: Value,
    pub download_status: StatusCode,
    pub download_body: Vec<u8>,
    pub download_content_type: Option<&'static str>,
    pub delete_status: StatusCode,
}

impl ServerScript {
    pub fn success(job_id: &str, output_type: &str) -> Self {
        Self {
            predict_status: StatusCode::OK,
            predict_body: json!({
                "job_id": job_id,
                "label": "FAKE",
                "output_type": output_type,
                "download_url": format!("/download/{job_id}"),
            }),
            download_status: StatusCode::OK,
            download_body: b"rendered-output".to_vec(),
            download_content_type: Some("application/octet-stream"),
            delete_status: StatusCode::OK,
        }
    }

    pub fn with_predict(mut self, status: StatusCode, body: Value) -> Self {
        self.predict_status = status;
        self.predict_body = body;
        self
    }

    pub fn with_download(mut self, status: StatusCode, content_type: Option<&'static str>) -> Self {
        self.download_status = status;
        self.download_content_type = content_type;
        self
    }

    pub fn with_delete_status(mut self, status: StatusCode) -> Self {
        self.delete_status = status;
        self
    }
}

#[derive(Clone)]
struct MockState {
    script: Arc<ServerScript>,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockState {
    fn record(&self, entry: Recorded) {
        self.log.lock().expect("request log").push(entry);
    }
}

pub struct MockServer {
    pub base_url: String,
    log: Arc<Mutex<Vec<Recorded>>>,
}

impl MockServer {
    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().expect("request log").clone()
    }

    pub fn deleted_jobs(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|entry| match entry {
                Recorded::Delete { job_id } => Some(job_id),
                _ => None,
            })
            .collect()
    }

    pub async fn wait_for_deletes(&self, expected: usize) -> Vec<String> {
        for _ in 0..200 {
            let deleted = self.deleted_jobs();
            if deleted.len() >= expected {
                return deleted;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.deleted_jobs()
    }
}

#[derive(Debug, Deserialize)]
struct PredictQuery {
    sample_every: Option<u32>,
}

async fn handle_predict(
    State(state): State<MockState>,
    Query(query): Query<PredictQuery>,
    mut multipart: Multipart,
) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let len = field.bytes().await.map(|b| b.len()).unwrap_or_default();
        state.record(Recorded::Predict {
            field: name,
            file_name,
            content_type,
            len,
            sample_every: query.sample_every,
        });
    }

    (
        state.script.predict_status,
        Json(state.script.predict_body.clone()),
    )
        .into_response()
}

async fn handle_download(
    State(state): State<MockState>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.record(Recorded::Download {
        job_id,
        cache_control: headers
            .get(header::CACHE_CONTROL)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });

    let mut response = (
        state.script.download_status,
        state.script.download_body.clone(),
    )
        .into_response();
    match state.script.download_content_type {
        Some(content_type) => {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        None => {
            response.headers_mut().remove(header::CONTENT_TYPE);
        }
    }
    response
}

async fn handle_delete(State(state): State<MockState>, Path(job_id): Path<String>) -> StatusCode {
    state.record(Recorded::Delete { job_id });
    state.script.delete_status
}

pub async fn spawn_mock_server(script: ServerScript) -> MockServer {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let log = Arc::new(Mutex::new(Vec::new()));
    let state = MockState {
        script: Arc::new(script),
        log: Arc::clone(&log),
    };
    let app = Router::new()
        .route("/predict", post(handle_predict))
        .route("/download/:job_id", get(handle_download))
        .route("/delete/:job_id", delete(handle_delete))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockServer {
        base_url: format!("http://{addr}"),
        log,
    }
}
