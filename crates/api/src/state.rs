use std::sync::Arc;

use imagegen_cloud::BlobStore;
use imagegen_db::JobStore;
use imagegen_runninghub::RunningHubApi;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration, including workflow ids and node addressing.
    pub config: Arc<ServerConfig>,
    /// Job record persistence.
    pub store: Arc<dyn JobStore>,
    /// Workflow engine client.
    pub runninghub: Arc<RunningHubApi>,
    /// Input-asset storage; `None` routes uploads through the engine.
    pub blob_store: Option<Arc<dyn BlobStore>>,
}
