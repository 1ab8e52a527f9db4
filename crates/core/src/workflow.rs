//! Mapping from UI-level options to workflow-engine node parameters.
//!
//! The engine addresses every input by a `(nodeId, fieldName)` pair fixed
//! by the published workflow. Those pairs are treated as opaque
//! configuration ([`NodeField`]); this module only decides the values.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::Serialize;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Seed value meaning "pick one for me".
pub const SEED_RANDOM: &str = "random";

/// Exclusive upper bound for substituted random seeds.
pub const MAX_RANDOM_SEED: u64 = 100_000_000_000_000;

/// LoRA strength sent when the caller enables LoRA without a strength.
pub const DEFAULT_LORA_STRENGTH: &str = "1";

/// LoRA strength sent when LoRA is disabled.
pub const LORA_DISABLED: &str = "0";

/// Scale factor sent for unrecognised scale options.
pub const DEFAULT_SCALE_VALUE: &str = "1";

// ---------------------------------------------------------------------------
// Node addressing
// ---------------------------------------------------------------------------

/// A `(nodeId, fieldName)` pair inside a published workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeField {
    pub node_id: String,
    pub field_name: String,
}

impl NodeField {
    pub fn new(node_id: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            field_name: field_name.into(),
        }
    }

    /// Bind a value to this field.
    pub fn with_value(&self, value: impl Into<String>) -> NodeInfo {
        NodeInfo {
            node_id: self.node_id.clone(),
            field_name: self.field_name.clone(),
            field_value: value.into(),
        }
    }
}

/// Parses the `nodeId:fieldName` form used in configuration.
impl FromStr for NodeField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (node_id, field_name) = s
            .split_once(':')
            .map(|(n, f)| (n.trim(), f.trim()))
            .filter(|(n, f)| !n.is_empty() && !f.is_empty())
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Invalid node field '{s}'. Expected 'nodeId:fieldName'"
                ))
            })?;
        Ok(Self::new(node_id, field_name))
    }
}

impl fmt::Display for NodeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.node_id, self.field_name)
    }
}

/// One entry of the engine's `nodeInfoList`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub node_id: String,
    pub field_name: String,
    pub field_value: String,
}

/// Node fields of the upscale (image-to-image) workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleNodes {
    pub image: NodeField,
    pub scale: NodeField,
    pub lora: NodeField,
    pub seed: NodeField,
}

impl Default for UpscaleNodes {
    fn default() -> Self {
        Self {
            image: NodeField::new("15", "image"),
            scale: NodeField::new("25", "default_value"),
            lora: NodeField::new("22", "strength_model"),
            seed: NodeField::new("7", "seed"),
        }
    }
}

/// Node fields of the text-to-image workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToImageNodes {
    pub prompt: NodeField,
    pub width: NodeField,
    pub height: NodeField,
    pub lora: NodeField,
    pub seed: NodeField,
}

impl Default for TextToImageNodes {
    fn default() -> Self {
        Self {
            prompt: NodeField::new("6", "text"),
            width: NodeField::new("5", "width"),
            height: NodeField::new("5", "height"),
            lora: NodeField::new("22", "strength_model"),
            seed: NodeField::new("7", "seed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Option mapping
// ---------------------------------------------------------------------------

/// Map a UI scale option (`x2`, `x4`, `x8`) to the engine's scale value.
pub fn scale_value(scale: &str) -> &'static str {
    match scale.trim() {
        "x2" => "0.5",
        "x4" => "1",
        "x8" => "2",
        _ => DEFAULT_SCALE_VALUE,
    }
}

/// Interpret a form flag. HTML checkboxes post `on`, scripts post `true`.
pub fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "on")
}

/// Resolve the seed to send.
///
/// Absent, empty, or `random` substitutes a random integer below
/// [`MAX_RANDOM_SEED`]; anything else must be a non-negative integer.
pub fn resolve_seed(raw: Option<&str>) -> Result<String, CoreError> {
    let raw = raw.map(str::trim).unwrap_or_default();
    if raw.is_empty() || raw.eq_ignore_ascii_case(SEED_RANDOM) {
        let seed = rand::rng().random_range(0..MAX_RANDOM_SEED);
        return Ok(seed.to_string());
    }
    raw.parse::<u64>().map(|seed| seed.to_string()).map_err(|_| {
        CoreError::Validation(format!(
            "Seed must be a non-negative integer or 'random', got '{raw}'"
        ))
    })
}

/// Resolve the LoRA strength to send.
pub fn resolve_lora_strength(use_lora: bool, strength: Option<&str>) -> Result<String, CoreError> {
    if !use_lora {
        return Ok(LORA_DISABLED.to_string());
    }
    let strength = strength
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_LORA_STRENGTH);
    match strength.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(strength.to_string()),
        _ => Err(CoreError::Validation(format!(
            "LoRA strength must be a number, got '{strength}'"
        ))),
    }
}

/// Aspect ratios offered for text-to-image generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            AspectRatio::Square => "1:1",
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }

    /// Output `(width, height)` in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (1080, 1080),
            AspectRatio::Landscape => (1920, 1080),
            AspectRatio::Portrait => (1080, 1920),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1:1" => Ok(AspectRatio::Square),
            "16:9" => Ok(AspectRatio::Landscape),
            "9:16" => Ok(AspectRatio::Portrait),
            other => Err(CoreError::Validation(format!(
                "Invalid aspect ratio '{other}'. Must be one of: 1:1, 16:9, 9:16"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter sets
// ---------------------------------------------------------------------------

/// Resolved parameters for an upscale job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleParams {
    /// Engine file name or public URL of the uploaded input image.
    pub image_ref: String,
    pub scale_value: String,
    pub lora_strength: String,
    pub seed: String,
}

impl UpscaleParams {
    pub fn node_info_list(&self, nodes: &UpscaleNodes) -> Vec<NodeInfo> {
        vec![
            nodes.image.with_value(&self.image_ref),
            nodes.scale.with_value(&self.scale_value),
            nodes.lora.with_value(&self.lora_strength),
            nodes.seed.with_value(&self.seed),
        ]
    }
}

/// Resolved parameters for a text-to-image job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextToImageParams {
    pub prompt: String,
    pub ratio: AspectRatio,
    pub lora_strength: String,
    pub seed: String,
}

impl TextToImageParams {
    pub fn node_info_list(&self, nodes: &TextToImageNodes) -> Vec<NodeInfo> {
        let (width, height) = self.ratio.dimensions();
        vec![
            nodes.prompt.with_value(&self.prompt),
            nodes.width.with_value(width.to_string()),
            nodes.height.with_value(height.to_string()),
            nodes.lora.with_value(&self.lora_strength),
            nodes.seed.with_value(&self.seed),
        ]
    }
}
