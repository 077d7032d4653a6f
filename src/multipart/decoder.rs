//! Multipart body decoder built on `multer`.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::body::Bytes;
use futures_util::stream;

use crate::multipart::{DecodeError, DecodedUpload, ImageMime};

const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// Decode a `multipart/form-data` body into the image part and scalar fields.
///
/// The whole body is already buffered, so it is fed to the parser as a
/// single-chunk stream.
pub async fn decode(content_type: &str, body: Bytes) -> Result<DecodedUpload, DecodeError> {
    if !is_form_data(content_type) {
        return Err(DecodeError::UnsupportedContentType(content_type.to_string()));
    }

    let boundary =
        multer::parse_boundary(content_type).map_err(|_| DecodeError::MalformedContentType)?;

    let body_stream = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(body_stream, boundary);

    let mut image: Option<(Bytes, ImageMime)> = None;
    let mut fields = HashMap::new();
    let mut index = 0usize;

    while let Some(field) = multipart.next_field().await? {
        index += 1;
        let name = field.name().map(str::to_string);
        let image_mime = field
            .file_name()
            .and(field.content_type())
            .and_then(|mime| ImageMime::from_essence(mime.essence_str()));

        match image_mime {
            Some(mime) => {
                let bytes = field.bytes().await?;
                if bytes.is_empty() {
                    tracing::debug!(part = index, "Skipping empty file part");
                } else if image.is_some() {
                    tracing::debug!(part = index, "Ignoring additional image part");
                } else {
                    image = Some((bytes, mime));
                }
            }
            None => {
                let value = field.text().await?;
                if let Some(name) = name {
                    fields.insert(name, value.trim().to_string());
                }
            }
        }
    }

    let (image_bytes, content_type) = image.ok_or(DecodeError::NoImageFound)?;

    tracing::debug!(
        image_bytes = image_bytes.len(),
        mime = content_type.as_str(),
        fields = fields.len(),
        "Multipart body decoded"
    );

    Ok(DecodedUpload {
        image_bytes,
        content_type,
        fields,
    })
}

fn is_form_data(content_type: &str) -> bool {
    content_type
        .trim_start()
        .get(..MULTIPART_FORM_DATA.len())
        .map(|prefix| prefix.eq_ignore_ascii_case(MULTIPART_FORM_DATA))
        .unwrap_or(false)
}
