//! Headless screenshot service (`POST {url}/api/screenshot`).

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::error::PipelineError;
use crate::provider::{
    build_provider_http_client, ensure_success, map_http_error, RenderProvider, RenderRequest,
};

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ScreenshotBody<'a> {
    url: &'a str,
    selector: &'a str,
    viewport: Viewport,
    image: ImageOptions,
    wait_until: &'static str,
    timeout_ms: u64,
    theme: &'static str,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct Viewport {
    width: u32,
    height: u32,
    device_scale_factor: f32,
}

#[derive(Debug, Serialize, PartialEq)]
struct ImageOptions {
    #[serde(rename = "type")]
    kind: &'static str,
    quality: u8,
}

pub struct HeadlessRenderer {
    client: Client,
    url: String,
}

impl HeadlessRenderer {
    pub fn new(url: String) -> Result<Self, PipelineError> {
        Ok(Self {
            client: build_provider_http_client()?,
            url: url.trim_end_matches('/').to_string(),
        })
    }
}

fn build_body(request: &RenderRequest) -> ScreenshotBody<'_> {
    ScreenshotBody {
        url: &request.url,
        selector: &request.selector,
        viewport: Viewport {
            width: request.width,
            height: request.height,
            device_scale_factor: request.device_scale_factor,
        },
        image: ImageOptions {
            kind: request.format.render_type(),
            quality: request.quality,
        },
        wait_until: "networkidle2",
        timeout_ms: request.timeout_ms,
        theme: request.theme.as_str(),
    }
}

#[async_trait]
impl RenderProvider for HeadlessRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<Vec<u8>, PipelineError> {
        debug!(url = %request.url, theme = request.theme.as_str(), "Screenshot request");
        let response = self
            .client
            .post(format!("{}/api/screenshot", self.url))
            .json(&build_body(request))
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success("headless-render", response).await?;
        let bytes = response.bytes().await.map_err(map_http_error)?;
        if bytes.is_empty() {
            return Err(PipelineError::ProviderError(
                "renderer returned an empty image".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
