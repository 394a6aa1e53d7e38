//! Thumbnail render parameters.

use serde::{Deserialize, Serialize};

use crate::fingerprint::FingerprintParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Webp,
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Webp => "image/webp",
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }

    /// Name expected by the screenshot service
    pub fn render_type(self) -> &'static str {
        match self {
            ImageFormat::Webp => "webp",
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
        }
    }
}

impl std::str::FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "webp" => Ok(ImageFormat::Webp),
            "png" => Ok(ImageFormat::Png),
            "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
            other => Err(format!("unknown image format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThumbnailParams {
    #[serde(default = "default_themes")]
    pub themes: Vec<Theme>,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_scale")]
    pub device_scale_factor: f32,
    #[serde(default)]
    pub format: ImageFormat,
    #[serde(default = "default_quality")]
    pub quality: u8,
}

fn default_themes() -> Vec<Theme> {
    vec![Theme::Light, Theme::Dark]
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    480
}

fn default_scale() -> f32 {
    2.0
}

fn default_quality() -> u8 {
    92
}

impl Default for ThumbnailParams {
    fn default() -> Self {
        Self {
            themes: default_themes(),
            width: default_width(),
            height: default_height(),
            device_scale_factor: default_scale(),
            format: ImageFormat::default(),
            quality: default_quality(),
        }
    }
}

impl FingerprintParams for ThumbnailParams {
    fn fingerprint_parts(&self) -> Vec<String> {
        let themes = self
            .themes
            .iter()
            .map(|t| t.as_str())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            "thumbnail".to_string(),
            themes,
            self.width.to_string(),
            self.height.to_string(),
            self.device_scale_factor.to_string(),
            self.format.extension().to_string(),
            self.quality.to_string(),
        ]
    }
}
