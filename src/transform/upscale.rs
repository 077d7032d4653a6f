//! Super-resolution upscaling.

use std::sync::Arc;

use image::DynamicImage;

use crate::backends::{ModelLocator, SuperResolutionBackend};
use crate::dispatch::{OperationError, OperationOutcome, OperationResult};
use crate::operation::{ScaleFactor, UpscaleParams};
use crate::transform::{encode_png, Transform, MIME_PNG};

/// Algorithm name handed to the super-resolution backend.
pub const ALGORITHM: &str = "esrgan";

/// Model file trained for `scale`.
pub fn model_filename(scale: ScaleFactor) -> String {
    format!("ESRGAN_x{}.pb", scale)
}

/// Upscales images with a model matching the requested factor.
#[derive(Clone)]
pub struct Upscaler {
    backend: Arc<dyn SuperResolutionBackend>,
    locator: Arc<ModelLocator>,
}

impl Upscaler {
    pub fn new(backend: Arc<dyn SuperResolutionBackend>, locator: Arc<ModelLocator>) -> Self {
        Self { backend, locator }
    }
}

impl Transform for Upscaler {
    type Params = UpscaleParams;

    fn apply(
        &self,
        image: DynamicImage,
        params: &UpscaleParams,
    ) -> OperationResult<OperationOutcome> {
        let scale = params.scale_factor;
        let model_file = model_filename(scale);

        let model_path = self
            .locator
            .locate(&model_file)
            .ok_or_else(|| OperationError::ModelNotFound(model_file.clone()))?;

        let model = self.backend.load_model(&model_path, ALGORITHM, scale)?;
        let upscaled = model.upsample(&image)?;

        tracing::debug!(
            scale = %scale,
            width = upscaled.width(),
            height = upscaled.height(),
            "Image upscaled"
        );

        let png = encode_png(&upscaled)?;
        Ok(OperationOutcome::binary(png, MIME_PNG, format!("upscaled_x{}.png", scale)))
    }
}
