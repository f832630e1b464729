//! Per-slice image generation.

use std::sync::Arc;

use tracing::{debug, instrument};

use contenize_genai::{GenerativeModel, ImageRequest};
use contenize_shared::{BrandAnalysis, ContenizeError, ContentSlice, InlineImage, Result};

/// Requests one illustration per slice, styled after the plan's brand.
#[derive(Clone)]
pub struct Illustrator {
    model: Arc<dyn GenerativeModel>,
}

impl Illustrator {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model }
    }

    /// Generate an image for `slice`. Failures are [`ContenizeError::Illustration`].
    #[instrument(skip_all, fields(slice = %slice.id, channel = %slice.channel))]
    pub async fn illustrate(&self, slice: &ContentSlice, brand: &BrandAnalysis) -> Result<InlineImage> {
        let request = image_request(slice, brand);
        debug!(aspect = %request.aspect_ratio, "requesting illustration");

        self.model
            .generate_image(request)
            .await
            .map_err(|e| ContenizeError::Illustration(format!("slice '{}': {e}", slice.id)))
    }
}

/// Build the image request for `slice`.
pub fn image_request(slice: &ContentSlice, brand: &BrandAnalysis) -> ImageRequest {
    let palette = if brand.suggested_colors.is_empty() {
        "brand neutral".to_string()
    } else {
        brand.suggested_colors.join(", ")
    };

    ImageRequest {
        prompt: format!(
            "Style: Professional and modern, following these brand traits: {}. Tone: {}. \
             Palette: {}. Visual Content: {}",
            brand.personality, brand.tone, palette, slice.image_prompt
        ),
        aspect_ratio: slice.orientation().aspect_ratio().to_string(),
    }
}
