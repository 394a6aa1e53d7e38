//! Screenshot rendering for planned variants.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;

use crate::error::PipelineError;
use crate::pipeline::UnitGenerator;
use crate::planner::PlannedUnit;
use crate::provider::{RenderProvider, RenderRequest};
use crate::thumbnail::params::ImageFormat;
use crate::thumbnail::plan::RenderVariant;
use crate::thumbnail::ThumbnailConfig;

pub struct RenderGenerator {
    renderer: Arc<dyn RenderProvider>,
    page_url: String,
    selector: String,
    timeout_ms: u64,
    format: ImageFormat,
}

/// `{base}/screenshot/documents/{entity_id}?width=..&height=..` with the id percent-encoded.
pub fn page_url(
    app_base_url: &str,
    entity_id: &str,
    width: u32,
    height: u32,
) -> Result<String, PipelineError> {
    let base = format!("{}/screenshot/documents/", app_base_url.trim_end_matches('/'));
    let mut url = Url::parse(&base)
        .map_err(|e| PipelineError::ConfigError(format!("invalid app base url '{app_base_url}': {e}")))?;
    url.path_segments_mut()
        .map_err(|_| PipelineError::ConfigError(format!("app base url '{app_base_url}' cannot be a base")))?
        .pop_if_empty()
        .push(entity_id);
    url.query_pairs_mut()
        .append_pair("width", &width.to_string())
        .append_pair("height", &height.to_string());
    Ok(url.to_string())
}

impl RenderGenerator {
    pub fn new(
        renderer: Arc<dyn RenderProvider>,
        config: &ThumbnailConfig,
        page_url: String,
        format: ImageFormat,
    ) -> Self {
        Self {
            renderer,
            page_url,
            selector: config.selector.clone(),
            timeout_ms: config.timeout_ms,
            format,
        }
    }

    pub fn page_url(&self) -> &str {
        &self.page_url
    }

    pub fn render_request(&self, variant: &RenderVariant) -> RenderRequest {
        RenderRequest {
            url: self.page_url.clone(),
            selector: self.selector.clone(),
            width: variant.width,
            height: variant.height,
            device_scale_factor: variant.device_scale_factor,
            format: variant.format,
            quality: variant.quality,
            theme: variant.theme,
            timeout_ms: self.timeout_ms,
        }
    }
}

#[async_trait]
impl UnitGenerator for RenderGenerator {
    type Payload = RenderVariant;

    fn storage_key(&self, unit: &PlannedUnit<RenderVariant>) -> String {
        format!(
            "thumbnails/{}.{}",
            unit.content_hash,
            unit.payload.format.extension()
        )
    }

    fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    async fn generate(&self, unit: &PlannedUnit<RenderVariant>) -> Result<Vec<u8>, PipelineError> {
        self.renderer.render(&self.render_request(&unit.payload)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thumbnail::params::Theme;

    #[test]
    fn page_url_encodes_the_entity_id() {
        let url = page_url("https://app.example.com/", "doc 1/2", 640, 480).unwrap();
        assert_eq!(
            url,
            "https://app.example.com/screenshot/documents/doc%201%2F2?width=640&height=480"
        );
    }

    #[test]
    fn bad_base_url_is_a_config_error() {
        assert!(matches!(
            page_url("not a url", "doc", 1, 1),
            Err(PipelineError::ConfigError(_))
        ));
    }

    struct Echo;

    #[async_trait]
    impl RenderProvider for Echo {
        async fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, PipelineError> {
            Ok(request.theme.as_str().as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn renders_with_the_variant_theme() {
        let generator = RenderGenerator::new(
            Arc::new(Echo),
            &ThumbnailConfig::default(),
            "http://localhost:3000/screenshot/documents/d".to_string(),
            ImageFormat::Webp,
        );
        let unit = PlannedUnit {
            index: 1,
            content_hash: "h".to_string(),
            payload: RenderVariant {
                theme: Theme::Dark,
                width: 640,
                height: 480,
                device_scale_factor: 2.0,
                format: ImageFormat::Webp,
                quality: 92,
            },
        };
        assert_eq!(generator.generate(&unit).await.unwrap(), b"dark".to_vec());
        assert_eq!(generator.storage_key(&unit), "thumbnails/h.webp");
        assert_eq!(generator.render_request(&unit.payload).selector, "#screenshot-root");
    }
}
