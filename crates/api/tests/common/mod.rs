use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{Request, Response};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use imagegen_api::config::{RunningHubConfig, ServerConfig, DEFAULT_MAX_UPLOAD_BYTES};
use imagegen_api::router::build_app_router;
use imagegen_api::state::AppState;
use imagegen_cloud::{BlobError, BlobStore};
use imagegen_core::workflow::{TextToImageNodes, UpscaleNodes};
use imagegen_db::MemoryJobStore;
use imagegen_runninghub::{RunningHubApi, RunningHubEndpoints};

pub const UPSCALE_APP: &str = "upscale-app";
pub const T2I_APP: &str = "t2i-app";
pub const MULTIPART_BOUNDARY: &str = "imagegen-test-boundary";

// ---------------------------------------------------------------------------
// Fake RunningHub
// ---------------------------------------------------------------------------

/// Recorded traffic and scripted answers of the fake engine.
#[derive(Default)]
pub struct EngineScript {
    /// When set, task creation is rejected with this message.
    pub reject_with: Option<String>,
    /// Outputs-endpoint answers keyed by task id; absent tasks are running.
    pub outputs: HashMap<String, Value>,
    /// Bodies received by the task creation endpoint.
    pub created: Vec<Value>,
    /// File names received by the upload endpoint.
    pub uploads: Vec<String>,
    next_task: u64,
}

/// An in-process stand-in for the RunningHub HTTP API on a random port.
pub struct FakeEngine {
    pub base_url: String,
    pub script: Arc<Mutex<EngineScript>>,
}

impl FakeEngine {
    pub async fn spawn() -> Self {
        let script = Arc::new(Mutex::new(EngineScript::default()));
        let app = Router::new()
            .route("/task/openapi/upload", post(fake_upload))
            .route("/task/openapi/ai-app/run", post(fake_run))
            .route("/task/openapi/outputs", post(fake_outputs))
            .with_state(Arc::clone(&script));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            script,
        }
    }

    pub fn endpoints(&self) -> RunningHubEndpoints {
        RunningHubEndpoints {
            upload_url: format!("{}/task/openapi/upload", self.base_url),
            run_url: format!("{}/task/openapi/ai-app/run", self.base_url),
            outputs_url: format!("{}/task/openapi/outputs", self.base_url),
        }
    }

    pub fn reject_tasks(&self, message: &str) {
        self.script.lock().unwrap().reject_with = Some(message.to_string());
    }

    /// Make the outputs endpoint report `task_id` finished with `file_url`.
    pub fn finish_task(&self, task_id: &str, file_url: &str) {
        self.script
            .lock()
            .unwrap()
            .outputs
            .insert(task_id.to_string(), success_outputs(file_url));
    }

    pub fn created(&self) -> Vec<Value> {
        self.script.lock().unwrap().created.clone()
    }

    pub fn uploads(&self) -> Vec<String> {
        self.script.lock().unwrap().uploads.clone()
    }
}

/// A successful task result carrying one output file.
pub fn success_outputs(file_url: &str) -> Value {
    json!({
        "code": 0,
        "msg": "success",
        "data": [{ "fileUrl": file_url, "fileType": "png" }]
    })
}

async fn fake_upload(
    State(script): State<Arc<Mutex<EngineScript>>>,
    mut multipart: Multipart,
) -> Json<Value> {
    let mut file_name = None;
    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() == Some("file") {
            file_name = field.file_name().map(str::to_string);
            let _ = field.bytes().await.unwrap();
        }
    }
    let file_name = file_name.unwrap_or_default();
    script.lock().unwrap().uploads.push(file_name.clone());
    Json(json!({
        "code": 0,
        "msg": "success",
        "data": { "fileName": format!("api/{file_name}"), "fileType": "image" }
    }))
}

async fn fake_run(
    State(script): State<Arc<Mutex<EngineScript>>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut script = script.lock().unwrap();
    script.created.push(body);
    if let Some(message) = &script.reject_with {
        return Json(json!({ "code": 1, "msg": message, "data": null }));
    }
    script.next_task += 1;
    Json(json!({
        "code": 0,
        "msg": "success",
        "data": { "taskId": format!("task-{}", script.next_task), "taskStatus": "RUNNING" }
    }))
}

async fn fake_outputs(
    State(script): State<Arc<Mutex<EngineScript>>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let task_id = body["taskId"].as_str().unwrap_or_default();
    let answer = script.lock().unwrap().outputs.get(task_id).cloned();
    Json(answer.unwrap_or_else(|| {
        json!({ "code": 804, "msg": "APIKEY_TASK_IS_RUNNING", "data": null })
    }))
}

// ---------------------------------------------------------------------------
// Blob store
// ---------------------------------------------------------------------------

/// Blob store recording every object it is handed.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(
        &self,
        file_name: &str,
        _content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<String, BlobError> {
        self.objects
            .lock()
            .unwrap()
            .push((file_name.to_string(), bytes.len()));
        Ok(format!("https://blobs.test/uploads/{file_name}"))
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` pointing at the given engine endpoints.
pub fn test_config(endpoints: RunningHubEndpoints) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:3000".to_string()],
        request_timeout_secs: 30,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        database_url: None,
        reconcile_interval_secs: None,
        runninghub: RunningHubConfig {
            api_key: "test-key".to_string(),
            upscale_webapp_id: UPSCALE_APP.to_string(),
            text_to_image_webapp_id: T2I_APP.to_string(),
            endpoints,
            webhook_url: None,
            timeout_secs: 5,
            upscale_nodes: UpscaleNodes::default(),
            text_to_image_nodes: TextToImageNodes::default(),
        },
        blob: None,
    }
}

/// Everything a test needs: shared state, the store behind it, and the
/// fake engine it talks to.
pub struct TestContext {
    pub state: AppState,
    pub store: Arc<MemoryJobStore>,
    pub engine: FakeEngine,
}

impl TestContext {
    pub async fn new() -> Self {
        Self::build(None).await
    }

    pub async fn with_blob_store(blob_store: Arc<dyn BlobStore>) -> Self {
        Self::build(Some(blob_store)).await
    }

    async fn build(blob_store: Option<Arc<dyn BlobStore>>) -> Self {
        let engine = FakeEngine::spawn().await;
        let config = test_config(engine.endpoints());
        let runninghub = RunningHubApi::new(
            config.runninghub.api_key.clone(),
            config.runninghub.endpoints.clone(),
            std::time::Duration::from_secs(config.runninghub.timeout_secs),
        )
        .unwrap();
        let store = Arc::new(MemoryJobStore::new());

        let state = AppState {
            config: Arc::new(config),
            store: store.clone(),
            runninghub: Arc::new(runninghub),
            blob_store,
        };

        Self {
            state,
            store,
            engine,
        }
    }

    /// A fresh router over the shared state (each `oneshot` consumes one).
    pub fn app(&self) -> Router {
        build_test_app(self.state.clone())
    }
}

/// Build the full application router with all middleware layers.
///
/// Uses the same builder as `main.rs` so integration tests exercise the
/// production middleware stack.
pub fn build_test_app(state: AppState) -> Router {
    let config = Arc::clone(&state.config);
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> Response<Body> {
    post_raw(app, uri, "application/json", body.to_string()).await
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: impl Into<Body>,
) -> Response<Body> {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a multipart form built from text fields and an optional file.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Response<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    let content_type = format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}");
    post_raw(app, uri, &content_type, body).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
