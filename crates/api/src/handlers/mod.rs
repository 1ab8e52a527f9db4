pub mod generate;
pub mod history;
pub mod status;
pub mod ui;
pub mod webhook;

use serde::de::DeserializeOwned;

use crate::error::{AppError, AppResult};

/// Decode a JSON request body, reporting malformed input as a 400.
///
/// Used instead of the `Json` extractor so every rejection carries the
/// standard `{"message", "code"}` body.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &[u8]) -> AppResult<T> {
    serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))
}
