use std::str::FromStr;

use imagegen_core::workflow::{NodeField, TextToImageNodes, UpscaleNodes};
use imagegen_runninghub::RunningHubEndpoints;

/// Default request body limit, sized for camera-resolution source images.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// All fields except the RunningHub credentials have defaults suitable for
/// local development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Largest accepted request body in bytes (default: 20 MiB).
    pub max_upload_bytes: usize,
    /// PostgreSQL URL. When unset, jobs are kept in memory.
    pub database_url: Option<String>,
    /// Interval for the background reconcile sweep; disabled when unset.
    pub reconcile_interval_secs: Option<u64>,
    /// Workflow engine settings.
    pub runninghub: RunningHubConfig,
    /// S3 input-asset storage; engine-side upload is used when unset.
    pub blob: Option<BlobConfig>,
}

/// RunningHub credentials, endpoints, and workflow node addressing.
#[derive(Debug, Clone)]
pub struct RunningHubConfig {
    pub api_key: String,
    /// Published app id of the upscale workflow.
    pub upscale_webapp_id: String,
    /// Published app id of the text-to-image workflow.
    pub text_to_image_webapp_id: String,
    pub endpoints: RunningHubEndpoints,
    /// Passed to task creation so RunningHub calls back on completion.
    pub webhook_url: Option<String>,
    /// Outbound request timeout in seconds (default: `60`).
    pub timeout_secs: u64,
    pub upscale_nodes: UpscaleNodes,
    pub text_to_image_nodes: TextToImageNodes,
}

/// S3 bucket receiving uploaded input images.
#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub bucket: String,
    pub prefix: String,
    /// Base URL under which stored objects are publicly readable.
    pub public_base_url: String,
}

/// A missing or malformed environment variable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                    |
    /// |-----------------------------|----------------------------|
    /// | `HOST`                      | `0.0.0.0`                  |
    /// | `PORT`                      | `3000`                     |
    /// | `CORS_ORIGINS`              | `http://localhost:3000`    |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                       |
    /// | `MAX_UPLOAD_BYTES`          | `20971520`                 |
    /// | `DATABASE_URL`              | unset (in-memory store)    |
    /// | `RECONCILE_INTERVAL_SECS`   | unset (sweep disabled)     |
    /// | `RUNNINGHUB_API_KEY`        | required                   |
    /// | `RUNNINGHUB_WEBAPP_ID`      | required                   |
    /// | `RUNNINGHUB_T2I_WEBAPP_ID`  | `RUNNINGHUB_WEBAPP_ID`     |
    /// | `RUNNINGHUB_RUN_URL`        | RunningHub AI-app run URL  |
    /// | `RUNNINGHUB_UPLOAD_URL`     | RunningHub upload URL      |
    /// | `RUNNINGHUB_OUTPUTS_URL`    | RunningHub outputs URL     |
    /// | `RUNNINGHUB_WEBHOOK_URL`    | unset                      |
    /// | `RUNNINGHUB_TIMEOUT_SECS`   | `60`                       |
    /// | `BLOB_BUCKET`               | unset (engine upload)      |
    /// | `BLOB_PUBLIC_BASE_URL`      | required with `BLOB_BUCKET`|
    /// | `BLOB_PREFIX`               | `uploads`                  |
    ///
    /// Node fields are overridden with `RUNNINGHUB_UPSCALE_{IMAGE,SCALE,LORA,SEED}_FIELD`
    /// and `RUNNINGHUB_T2I_{PROMPT,WIDTH,HEIGHT,LORA,SEED}_FIELD`, each in
    /// `nodeId:fieldName` form.
    ///
    /// Panics on missing or malformed values so misconfiguration fails fast
    /// at startup.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
            .unwrap_or_else(|e| panic!("Invalid configuration: {e}"))
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);

        let host = vars.get("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = vars.parse_or("PORT", 3000u16)?;

        let cors_origins: Vec<String> = vars
            .get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = vars.parse_or("REQUEST_TIMEOUT_SECS", 30u64)?;
        let max_upload_bytes = vars.parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let database_url = vars.get("DATABASE_URL");
        let reconcile_interval_secs = vars
            .parse_opt::<u64>("RECONCILE_INTERVAL_SECS")?
            .filter(|secs| *secs > 0);

        let runninghub = RunningHubConfig::from_vars(&vars)?;

        let blob = match vars.get("BLOB_BUCKET") {
            Some(bucket) => Some(BlobConfig {
                bucket,
                prefix: vars
                    .get("BLOB_PREFIX")
                    .unwrap_or_else(|| imagegen_cloud::DEFAULT_PREFIX.into()),
                public_base_url: vars.require("BLOB_PUBLIC_BASE_URL")?,
            }),
            None => None,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            max_upload_bytes,
            database_url,
            reconcile_interval_secs,
            runninghub,
            blob,
        })
    }
}

impl RunningHubConfig {
    fn from_vars<F>(vars: &Vars<F>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = vars.require("RUNNINGHUB_API_KEY")?;
        let upscale_webapp_id = vars.require("RUNNINGHUB_WEBAPP_ID")?;
        let text_to_image_webapp_id = vars
            .get("RUNNINGHUB_T2I_WEBAPP_ID")
            .unwrap_or_else(|| upscale_webapp_id.clone());

        let defaults = RunningHubEndpoints::default();
        let endpoints = RunningHubEndpoints {
            upload_url: vars.get("RUNNINGHUB_UPLOAD_URL").unwrap_or(defaults.upload_url),
            run_url: vars.get("RUNNINGHUB_RUN_URL").unwrap_or(defaults.run_url),
            outputs_url: vars.get("RUNNINGHUB_OUTPUTS_URL").unwrap_or(defaults.outputs_url),
        };

        let upscale = UpscaleNodes::default();
        let upscale_nodes = UpscaleNodes {
            image: vars.parse_or("RUNNINGHUB_UPSCALE_IMAGE_FIELD", upscale.image)?,
            scale: vars.parse_or("RUNNINGHUB_UPSCALE_SCALE_FIELD", upscale.scale)?,
            lora: vars.parse_or("RUNNINGHUB_UPSCALE_LORA_FIELD", upscale.lora)?,
            seed: vars.parse_or("RUNNINGHUB_UPSCALE_SEED_FIELD", upscale.seed)?,
        };

        let t2i = TextToImageNodes::default();
        let text_to_image_nodes = TextToImageNodes {
            prompt: vars.parse_or::<NodeField>("RUNNINGHUB_T2I_PROMPT_FIELD", t2i.prompt)?,
            width: vars.parse_or("RUNNINGHUB_T2I_WIDTH_FIELD", t2i.width)?,
            height: vars.parse_or("RUNNINGHUB_T2I_HEIGHT_FIELD", t2i.height)?,
            lora: vars.parse_or("RUNNINGHUB_T2I_LORA_FIELD", t2i.lora)?,
            seed: vars.parse_or("RUNNINGHUB_T2I_SEED_FIELD", t2i.seed)?,
        };

        Ok(Self {
            api_key,
            upscale_webapp_id,
            text_to_image_webapp_id,
            endpoints,
            webhook_url: vars.get("RUNNINGHUB_WEBHOOK_URL"),
            timeout_secs: vars.parse_or("RUNNINGHUB_TIMEOUT_SECS", 60u64)?,
            upscale_nodes,
            text_to_image_nodes,
        })
    }
}

/// Variable lookup treating blank values as unset.
struct Vars<F>(F);

impl<F> Vars<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, var: &str) -> Option<String> {
        (self.0)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, var: &'static str) -> Result<String, ConfigError> {
        self.get(var).ok_or(ConfigError::Missing(var))
    }

    fn parse_opt<T>(&self, var: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(var)
            .map(|value| {
                value.parse::<T>().map_err(|e| ConfigError::Invalid {
                    var,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }

    fn parse_or<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse_opt(var)?.unwrap_or(default))
    }
}
