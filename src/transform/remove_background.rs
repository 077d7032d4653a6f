//! Background removal through a segmentation backend.

use std::sync::Arc;

use image::DynamicImage;

use crate::backends::{ModelLocator, SegmentationBackend, SegmentationSettings};
use crate::dispatch::{OperationOutcome, OperationResult};
use crate::transform::{encode_png, Transform, MIME_PNG};

/// Model file the segmentation backend loads.
pub const SEGMENTATION_MODEL: &str = "u2net.pth";

pub const NO_BACKGROUND_FILENAME: &str = "no-bg.png";

/// Cuts the subject out of its background.
#[derive(Clone)]
pub struct BackgroundRemover {
    backend: Arc<dyn SegmentationBackend>,
    locator: Arc<ModelLocator>,
}

impl BackgroundRemover {
    pub fn new(backend: Arc<dyn SegmentationBackend>, locator: Arc<ModelLocator>) -> Self {
        Self { backend, locator }
    }

    /// Backend settings for this call. A missing model is not fatal here;
    /// the backend decides whether it can run without one.
    fn settings(&self) -> SegmentationSettings {
        let model_home = self
            .locator
            .locate(SEGMENTATION_MODEL)
            .and_then(|path| path.parent().map(|dir| dir.to_path_buf()));

        if model_home.is_none() {
            tracing::warn!(
                model = SEGMENTATION_MODEL,
                "Segmentation model not found, backend will use its own default"
            );
        }

        SegmentationSettings { model_home }
    }
}

impl Transform for BackgroundRemover {
    type Params = ();

    fn apply(&self, image: DynamicImage, _params: &()) -> OperationResult<OperationOutcome> {
        let settings = self.settings();
        let segmented = self.backend.segment(&image, &settings)?;

        let png = encode_png(&segmented)?;
        Ok(OperationOutcome::binary(png, MIME_PNG, NO_BACKGROUND_FILENAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    use crate::backends::{BackendError, Unconfigured};
    use crate::dispatch::OperationError;

    /// Records the settings it was called with and makes the left half transparent.
    #[derive(Default)]
    struct RecordingSegmenter {
        calls: Mutex<Vec<SegmentationSettings>>,
    }

    impl SegmentationBackend for RecordingSegmenter {
        fn segment(
            &self,
            image: &DynamicImage,
            settings: &SegmentationSettings,
        ) -> Result<DynamicImage, BackendError> {
            self.calls.lock().unwrap().push(settings.clone());
            let mut rgba = image.to_rgba8();
            let half = rgba.width() / 2;
            for (x, _, pixel) in rgba.enumerate_pixels_mut() {
                if x < half {
                    pixel[3] = 0;
                }
            }
            Ok(DynamicImage::ImageRgba8(rgba))
        }
    }

    fn sample() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 2, Rgba([9, 9, 9, 255])))
    }

    #[test]
    fn passes_located_model_home() {
        let root = TempDir::new().unwrap();
        let models = root.path().join("models");
        fs::create_dir_all(&models).unwrap();
        fs::write(models.join(SEGMENTATION_MODEL), b"weights").unwrap();

        let backend = Arc::new(RecordingSegmenter::default());
        let locator = Arc::new(ModelLocator::new(&models, None, root.path(), 0));
        let remover = BackgroundRemover::new(backend.clone(), locator);

        let outcome = remover.apply(sample(), &()).unwrap();

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model_home.as_deref(), Some(models.as_path()));

        match outcome {
            OperationOutcome::Binary { bytes, mime, filename } => {
                assert_eq!(mime, "image/png");
                assert_eq!(filename, "no-bg.png");
                let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
                assert_eq!(decoded.get_pixel(0, 0)[3], 0);
                assert_eq!(decoded.get_pixel(3, 0)[3], 255);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn proceeds_without_model() {
        let root = TempDir::new().unwrap();
        let backend = Arc::new(RecordingSegmenter::default());
        let locator = Arc::new(ModelLocator::new(root.path().join("models"), None, root.path(), 0));

        BackgroundRemover::new(backend.clone(), locator)
            .apply(sample(), &())
            .unwrap();

        assert_eq!(backend.calls.lock().unwrap()[0], SegmentationSettings::default());
    }

    #[test]
    fn backend_failure_surfaces_as_500() {
        let root = TempDir::new().unwrap();
        let locator = Arc::new(ModelLocator::new(root.path(), None, root.path(), 0));
        let remover = BackgroundRemover::new(Arc::new(Unconfigured), locator);

        let err = remover.apply(sample(), &()).unwrap_err();
        assert!(matches!(err, OperationError::BackendFailure(BackendError::NotConfigured(_))));
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
