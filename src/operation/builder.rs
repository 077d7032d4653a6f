//! Builds an [`OperationRequest`] from a decoded upload and URL hints.
//!
//! Building never fails. Numeric fields that do not parse fall back to their
//! defaults; hard validation happens in the strategies.

use std::collections::HashMap;
use std::num::IntErrorKind;
use std::str::FromStr;

use crate::multipart::DecodedUpload;
use crate::operation::types::{
    CompressParams, EditSettings, OperationKind, OperationParams, OperationRequest, ScaleFactor,
    UpscaleParams,
};

/// Form field / query parameter carrying the operation name.
pub const OPERATION_FIELD: &str = "operation";
const QUALITY_FIELD: &str = "quality";
const ESTIMATE_FIELD: &str = "estimate";
const SCALE_FIELD: &str = "scale";

/// Routing hints taken from the request URL.
#[derive(Debug, Clone, Default)]
pub struct OperationHints {
    /// Request path, e.g. `/api/compress`.
    pub path: String,
    /// Decoded query parameters.
    pub query: HashMap<String, String>,
}

impl OperationHints {
    pub fn new(path: impl Into<String>, query: HashMap<String, String>) -> Self {
        Self {
            path: path.into(),
            query,
        }
    }

    /// Explicitly requested operation name: query parameter first, then form field.
    pub fn explicit_operation<'a>(&'a self, decoded: &'a DecodedUpload) -> Option<&'a str> {
        self.query
            .get(OPERATION_FIELD)
            .map(String::as_str)
            .or_else(|| decoded.field(OPERATION_FIELD))
            .filter(|op| !op.is_empty())
    }

    /// Final non-empty path segment.
    pub fn last_path_segment(&self) -> Option<&str> {
        self.path.rsplit('/').find(|segment| !segment.is_empty())
    }
}

/// Resolve the operation kind: explicit name, then path segment, then `Edit`.
pub fn resolve_kind(decoded: &DecodedUpload, hints: &OperationHints) -> OperationKind {
    hints
        .explicit_operation(decoded)
        .and_then(|op| op.parse().ok())
        .or_else(|| hints.last_path_segment().and_then(|s| s.parse().ok()))
        .unwrap_or(OperationKind::Edit)
}

/// Parse a field, falling back to `default` when it is absent or malformed.
pub fn parse_or<T: FromStr>(value: Option<&str>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parse an integer field clamped to `min..=max`. Out-of-range digits clamp
/// to the nearer bound instead of falling back to `default`.
pub fn parse_clamped(value: Option<&str>, default: i64, min: i64, max: i64) -> i64 {
    let parsed = match value.map(|v| v.trim().parse::<i64>()) {
        None => default,
        Some(Ok(n)) => n,
        Some(Err(e)) => match e.kind() {
            IntErrorKind::PosOverflow => max,
            IntErrorKind::NegOverflow => min,
            _ => default,
        },
    };
    parsed.clamp(min, max)
}

impl OperationRequest {
    /// Build a request from a decoded upload.
    pub fn build(decoded: DecodedUpload, hints: &OperationHints) -> Self {
        let kind = resolve_kind(&decoded, hints);

        let params = match kind {
            OperationKind::Compress => {
                let defaults = CompressParams::default();
                let quality = parse_clamped(
                    decoded.field(QUALITY_FIELD),
                    i64::from(defaults.quality),
                    1,
                    100,
                ) as u8;
                OperationParams::Compress(CompressParams {
                    quality,
                    estimate_only: decoded.has_field(ESTIMATE_FIELD),
                })
            }
            OperationKind::Upscale => {
                let requested = parse_or(
                    decoded.field(SCALE_FIELD),
                    i64::from(ScaleFactor::default().value()),
                );
                OperationParams::Upscale(UpscaleParams {
                    scale_factor: ScaleFactor::from_requested(requested),
                })
            }
            OperationKind::Edit => {
                OperationParams::Edit(EditSettings::from_fields(&decoded.fields))
            }
            OperationKind::RemoveBackground => OperationParams::RemoveBackground,
        };

        tracing::debug!(operation = %kind, params = ?params, "Operation request built");

        Self {
            image: decoded,
            params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multipart::ImageMime;
    use crate::operation::types::Adjustment;
    use axum::body::Bytes;

    fn upload(fields: &[(&str, &str)]) -> DecodedUpload {
        DecodedUpload {
            image_bytes: Bytes::from_static(b"png"),
            content_type: ImageMime::Png,
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn hints(path: &str, query: &[(&str, &str)]) -> OperationHints {
        OperationHints::new(
            path,
            query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_to_edit() {
        let request = OperationRequest::build(upload(&[]), &hints("/", &[]));
        assert_eq!(request.kind(), OperationKind::Edit);
    }

    #[test]
    fn path_segment_selects_kind() {
        let request = OperationRequest::build(upload(&[]), &hints("/api/upscale/", &[]));
        assert_eq!(request.kind(), OperationKind::Upscale);

        let request = OperationRequest::build(upload(&[]), &hints("/remove-background", &[]));
        assert_eq!(request.kind(), OperationKind::RemoveBackground);
    }

    #[test]
    fn explicit_operation_beats_path() {
        let request = OperationRequest::build(
            upload(&[]),
            &hints("/upscale", &[("operation", "compress")]),
        );
        assert_eq!(request.kind(), OperationKind::Compress);

        let request =
            OperationRequest::build(upload(&[("operation", "compress")]), &hints("/edit", &[]));
        assert_eq!(request.kind(), OperationKind::Compress);
    }

    #[test]
    fn query_operation_beats_field() {
        let request = OperationRequest::build(
            upload(&[("operation", "edit")]),
            &hints("/", &[("operation", "upscale")]),
        );
        assert_eq!(request.kind(), OperationKind::Upscale);
    }

    #[test]
    fn unrecognized_explicit_operation_falls_through() {
        let request = OperationRequest::build(
            upload(&[]),
            &hints("/compress", &[("operation", "resize")]),
        );
        assert_eq!(request.kind(), OperationKind::Compress);
    }

    #[test]
    fn compress_defaults() {
        let request = OperationRequest::build(upload(&[]), &hints("/compress", &[]));
        assert_eq!(
            request.params,
            OperationParams::Compress(CompressParams {
                quality: 85,
                estimate_only: false
            })
        );
    }

    #[test]
    fn quality_is_clamped() {
        for (raw, expected) in [
            ("0", 1),
            ("-20", 1),
            ("1", 1),
            ("50", 50),
            ("100", 100),
            ("250", 100),
            ("99999999999999999999", 100),
            ("-99999999999999999999", 1),
        ] {
            let request =
                OperationRequest::build(upload(&[("quality", raw)]), &hints("/compress", &[]));
            match request.params {
                OperationParams::Compress(p) => assert_eq!(p.quality, expected, "quality={}", raw),
                other => panic!("unexpected params: {:?}", other),
            }
        }
    }

    #[test]
    fn malformed_quality_uses_default() {
        let request =
            OperationRequest::build(upload(&[("quality", "high")]), &hints("/compress", &[]));
        match request.params {
            OperationParams::Compress(p) => assert_eq!(p.quality, 85),
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn estimate_is_a_presence_flag() {
        for value in ["", "0", "1", "false"] {
            let request = OperationRequest::build(
                upload(&[("estimate", value)]),
                &hints("/compress", &[]),
            );
            match request.params {
                OperationParams::Compress(p) => assert!(p.estimate_only, "estimate={:?}", value),
                other => panic!("unexpected params: {:?}", other),
            }
        }
    }

    #[test]
    fn scale_factor_resolution() {
        for (raw, expected) in [
            ("4", ScaleFactor::X4),
            ("8", ScaleFactor::X8),
            ("3", ScaleFactor::X2),
            ("big", ScaleFactor::X2),
        ] {
            let request =
                OperationRequest::build(upload(&[("scale", raw)]), &hints("/upscale", &[]));
            assert_eq!(
                request.params,
                OperationParams::Upscale(UpscaleParams { scale_factor: expected })
            );
        }
    }

    #[test]
    fn edit_keeps_raw_values() {
        let request = OperationRequest::build(
            upload(&[("blur", "not-a-number"), ("sepia", "40")]),
            &hints("/edit", &[]),
        );
        match request.params {
            OperationParams::Edit(settings) => {
                assert_eq!(settings.get(Adjustment::Blur), Some("not-a-number"));
                assert_eq!(settings.get(Adjustment::Sepia), Some("40"));
                assert_eq!(settings.get(Adjustment::Rotation), None);
            }
            other => panic!("unexpected params: {:?}", other),
        }
    }

    #[test]
    fn parse_or_falls_back() {
        assert_eq!(parse_or::<i64>(Some("12"), 3), 12);
        assert_eq!(parse_or::<i64>(Some("1.5"), 3), 3);
        assert_eq!(parse_or::<i64>(None, 3), 3);
    }
}
