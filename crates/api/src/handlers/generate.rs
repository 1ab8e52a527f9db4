//! Handler for job submission.
//!
//! One endpoint serves both workflows, selected by content type:
//! a JSON body submits text-to-image, a multipart form with an `image`
//! file submits an upscale. Either way the job is created on RunningHub
//! and a `processing` record is stored under the returned task id.

use axum::body::Bytes;
use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use chrono::Utc;
use imagegen_core::job::{JobDetails, JobKind, JobRecord};
use imagegen_core::workflow::{
    parse_flag, resolve_lora_strength, resolve_seed, scale_value, AspectRatio, NodeInfo,
    TextToImageParams, UpscaleParams,
};
use imagegen_runninghub::UploadFile;
use serde::{Deserialize, Serialize};

use super::parse_json;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// A JSON scalar the UI may send as a string, number, or boolean.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl Scalar {
    pub fn to_text(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Number(n) => n.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

/// JSON body for a text-to-image submission.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextToImageRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub ratio: Option<String>,
    #[serde(default)]
    pub use_lora: Option<Scalar>,
    #[serde(default)]
    pub lora_strength: Option<Scalar>,
    #[serde(default)]
    pub seed: Option<Scalar>,
}

/// Fields collected from an upscale multipart form.
#[derive(Debug, Default)]
struct UpscaleForm {
    image: Option<UploadFile>,
    scale: Option<String>,
    use_lora: Option<String>,
    lora_strength: Option<String>,
    seed: Option<String>,
}

/// Response body for an accepted submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub task_id: String,
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// POST /api/generate
///
/// Returns `{success, taskId}`. Missing or invalid input is a 400 and
/// creates nothing; upload and task-creation failures are a 500 carrying
/// the upstream message.
pub async fn submit(
    State(state): State<AppState>,
    request: Request,
) -> AppResult<Json<SubmitResponse>> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let task_id = if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let form = read_upscale_form(multipart).await?;
        submit_upscale(&state, form).await?
    } else if content_type.starts_with("application/json") {
        let body = Bytes::from_request(request, &state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        let input: TextToImageRequest = parse_json(&body)?;
        submit_text_to_image(&state, input).await?
    } else {
        return Err(AppError::BadRequest(
            "Expected an application/json or multipart/form-data body".into(),
        ));
    };

    Ok(Json(SubmitResponse {
        success: true,
        task_id,
    }))
}

// ---------------------------------------------------------------------------
// Text-to-image
// ---------------------------------------------------------------------------

async fn submit_text_to_image(state: &AppState, input: TextToImageRequest) -> AppResult<String> {
    let prompt = input
        .prompt
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::BadRequest("Prompt is required.".into()))?;

    let ratio = match input.ratio.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => r.parse::<AspectRatio>()?,
        _ => AspectRatio::default(),
    };
    let use_lora = input
        .use_lora
        .as_ref()
        .is_some_and(|v| parse_flag(&v.to_text()));
    let lora_strength = input.lora_strength.as_ref().map(Scalar::to_text);
    let seed = input.seed.as_ref().map(Scalar::to_text);

    let params = TextToImageParams {
        prompt,
        ratio,
        lora_strength: resolve_lora_strength(use_lora, lora_strength.as_deref())?,
        seed: resolve_seed(seed.as_deref())?,
    };

    let rh = &state.config.runninghub;
    let nodes = params.node_info_list(&rh.text_to_image_nodes);
    let (width, height) = params.ratio.dimensions();

    let details = JobDetails {
        kind: Some(JobKind::TextToImage),
        prompt: Some(params.prompt),
        ratio: Some(params.ratio.as_str().to_string()),
        width: Some(width),
        height: Some(height),
        seed: Some(params.seed),
        lora_strength: Some(params.lora_strength),
        ..Default::default()
    };

    create_and_record(state, &rh.text_to_image_webapp_id, &nodes, details).await
}

// ---------------------------------------------------------------------------
// Upscale
// ---------------------------------------------------------------------------

async fn read_upscale_form(mut multipart: Multipart) -> AppResult<UpscaleForm> {
    let mut form = UpscaleForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                if !bytes.is_empty() {
                    form.image = Some(UploadFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "scale" | "useLora" | "loraStrength" | "seed" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let slot = match name.as_str() {
                    "scale" => &mut form.scale,
                    "useLora" => &mut form.use_lora,
                    "loraStrength" => &mut form.lora_strength,
                    _ => &mut form.seed,
                };
                *slot = Some(value);
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown form field");
            }
        }
    }

    Ok(form)
}

async fn submit_upscale(state: &AppState, form: UpscaleForm) -> AppResult<String> {
    let image = form
        .image
        .ok_or_else(|| AppError::BadRequest("Image file is required.".into()))?;

    // Resolve every option before uploading so bad input has no side effects.
    let use_lora = form.use_lora.as_deref().is_some_and(parse_flag);
    let lora_strength = resolve_lora_strength(use_lora, form.lora_strength.as_deref())?;
    let seed = resolve_seed(form.seed.as_deref())?;
    let scale = form.scale.unwrap_or_default();
    let original_filename = image.file_name.clone();

    let image_ref = upload_input(state, image).await?;

    let params = UpscaleParams {
        image_ref,
        scale_value: scale_value(&scale).to_string(),
        lora_strength,
        seed,
    };

    let rh = &state.config.runninghub;
    let nodes = params.node_info_list(&rh.upscale_nodes);

    let details = JobDetails {
        kind: Some(JobKind::Upscale),
        original_filename: Some(original_filename),
        scale: Some(scale).filter(|s| !s.is_empty()),
        seed: Some(params.seed),
        lora_strength: Some(params.lora_strength),
        ..Default::default()
    };

    create_and_record(state, &rh.upscale_webapp_id, &nodes, details).await
}

/// Store the input image and return the value for the image node: a
/// public URL when a blob store is configured, else RunningHub's file name.
async fn upload_input(state: &AppState, image: UploadFile) -> AppResult<String> {
    match &state.blob_store {
        Some(blob) => {
            let url = blob
                .put(&image.file_name, image.content_type.as_deref(), image.bytes)
                .await?;
            tracing::debug!(url = %url, "Input image stored in blob store");
            Ok(url)
        }
        None => {
            let file_name = state.runninghub.upload_image(image).await?;
            tracing::debug!(file_name = %file_name, "Input image uploaded to RunningHub");
            Ok(file_name)
        }
    }
}

// ---------------------------------------------------------------------------
// Shared
// ---------------------------------------------------------------------------

/// Create the task on RunningHub and persist its initial record.
async fn create_and_record(
    state: &AppState,
    webapp_id: &str,
    nodes: &[NodeInfo],
    details: JobDetails,
) -> AppResult<String> {
    let task_id = state.runninghub.create_task(webapp_id, nodes).await?;

    let kind = details.kind;
    let record = JobRecord::processing(task_id.clone(), details, Utc::now());
    if !state.store.insert(&record).await? {
        tracing::warn!(task_id = %task_id, "Task id already recorded; keeping existing record");
    }

    tracing::info!(task_id = %task_id, kind = ?kind, webapp_id, "Job submitted");
    Ok(task_id)
}
