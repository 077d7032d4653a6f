//! Typed operation requests.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::multipart::DecodedUpload;

/// The four supported operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Compress,
    RemoveBackground,
    Upscale,
    Edit,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Compress,
        OperationKind::RemoveBackground,
        OperationKind::Upscale,
        OperationKind::Edit,
    ];

    /// Name used in paths, query strings and form fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Compress => "compress",
            OperationKind::RemoveBackground => "remove-background",
            OperationKind::Upscale => "upscale",
            OperationKind::Edit => "edit",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or(())
    }
}

/// Upscaling factors with a trained model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleFactor {
    #[default]
    X2,
    X4,
    X8,
}

impl ScaleFactor {
    /// Map a requested factor, falling back to 2 for anything unsupported.
    pub fn from_requested(requested: i64) -> Self {
        match requested {
            4 => ScaleFactor::X4,
            8 => ScaleFactor::X8,
            _ => ScaleFactor::X2,
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            ScaleFactor::X2 => 2,
            ScaleFactor::X4 => 4,
            ScaleFactor::X8 => 8,
        }
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Parameters for the compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressParams {
    /// JPEG quality, always within 1..=100.
    pub quality: u8,
    /// Report sizes as JSON instead of returning the image.
    pub estimate_only: bool,
}

impl Default for CompressParams {
    fn default() -> Self {
        Self {
            quality: 85,
            estimate_only: false,
        }
    }
}

/// Parameters for the upscaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpscaleParams {
    pub scale_factor: ScaleFactor,
}

/// Adjustments understood by the editor, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Adjustment {
    Brightness,
    Contrast,
    Saturation,
    Blur,
    Rotation,
    Sepia,
}

impl Adjustment {
    /// Fixed application order.
    pub const ORDER: [Adjustment; 6] = [
        Adjustment::Brightness,
        Adjustment::Contrast,
        Adjustment::Saturation,
        Adjustment::Blur,
        Adjustment::Rotation,
        Adjustment::Sepia,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Adjustment::Brightness => "brightness",
            Adjustment::Contrast => "contrast",
            Adjustment::Saturation => "saturation",
            Adjustment::Blur => "blur",
            Adjustment::Rotation => "rotation",
            Adjustment::Sepia => "sepia",
        }
    }
}

/// Raw edit settings keyed by adjustment. Values are parsed by the editor.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditSettings {
    values: HashMap<Adjustment, String>,
}

impl EditSettings {
    /// Keep only recognized adjustment names from a field map.
    pub fn from_fields(fields: &HashMap<String, String>) -> Self {
        let values = Adjustment::ORDER
            .into_iter()
            .filter_map(|adj| fields.get(adj.as_str()).map(|v| (adj, v.clone())))
            .collect();
        Self { values }
    }

    pub fn get(&self, adjustment: Adjustment) -> Option<&str> {
        self.values.get(&adjustment).map(String::as_str)
    }

    /// Present settings in application order.
    pub fn ordered(&self) -> impl Iterator<Item = (Adjustment, &str)> + '_ {
        Adjustment::ORDER
            .into_iter()
            .filter_map(move |adj| self.get(adj).map(|v| (adj, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-operation parameters. The variant determines the operation kind.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationParams {
    Compress(CompressParams),
    RemoveBackground,
    Upscale(UpscaleParams),
    Edit(EditSettings),
}

/// A fully resolved request, built once and never modified.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub image: DecodedUpload,
    pub params: OperationParams,
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self.params {
            OperationParams::Compress(_) => OperationKind::Compress,
            OperationParams::RemoveBackground => OperationKind::RemoveBackground,
            OperationParams::Upscale(_) => OperationKind::Upscale,
            OperationParams::Edit(_) => OperationKind::Edit,
        }
    }
}
