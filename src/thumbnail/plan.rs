//! One render unit per theme.

use serde::{Deserialize, Serialize};

use crate::fingerprint::stable_hash;
use crate::pipeline::UnitPayload;
use crate::planner::PlannedUnit;
use crate::thumbnail::params::{ImageFormat, Theme, ThumbnailParams};

pub const RENDER_ENGINE_VERSION: &str = "thumb-v1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderVariant {
    pub theme: Theme,
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f32,
    pub format: ImageFormat,
    pub quality: u8,
}

impl UnitPayload for RenderVariant {
    fn label(&self) -> Option<&str> {
        Some(self.theme.as_str())
    }
}

pub fn variant_hash(version: &str, variant: &RenderVariant) -> String {
    stable_hash([
        version.to_string(),
        variant.theme.as_str().to_string(),
        variant.width.to_string(),
        variant.height.to_string(),
        variant.device_scale_factor.to_string(),
        variant.format.extension().to_string(),
        variant.quality.to_string(),
        RENDER_ENGINE_VERSION.to_string(),
    ])
}

/// Units for each distinct requested theme, in request order.
pub fn plan_variants(version: &str, params: &ThumbnailParams) -> Vec<PlannedUnit<RenderVariant>> {
    let mut themes: Vec<Theme> = Vec::with_capacity(params.themes.len());
    for theme in &params.themes {
        if !themes.contains(theme) {
            themes.push(*theme);
        }
    }

    themes
        .into_iter()
        .enumerate()
        .map(|(index, theme)| {
            let variant = RenderVariant {
                theme,
                width: params.width,
                height: params.height,
                device_scale_factor: params.device_scale_factor,
                format: params.format,
                quality: params.quality,
            };
            PlannedUnit {
                index,
                content_hash: variant_hash(version, &variant),
                payload: variant,
            }
        })
        .collect()
}
