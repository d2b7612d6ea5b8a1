//! Aspect ratio conversion from landscape to 9:16 portrait frames.
//!
//! Everything here is pure arithmetic over pixel sizes. The resulting
//! [`TransformPlan`] is turned into an ffmpeg filter graph by the transcoder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Target ratio is PORTRAIT_W:PORTRAIT_H
const PORTRAIT_W: u64 = 9;
const PORTRAIT_H: u64 = 16;

/// Smallest accepted frame side, one macroblock.
pub const MIN_SIDE: u32 = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("invalid dimensions {width}x{height}: each side must be at least 16 pixels")]
    InvalidDimensions { width: i64, height: i64 },
    #[error("unsupported conversion method '{0}', expected 'crop' or 'scale'")]
    UnsupportedMethod(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const fn new(width: u32, height: u32) -> Self {
        Dimensions { width, height }
    }

    /// Builds dimensions from signed values, as reported by probes or callers.
    pub fn try_new(width: i64, height: i64) -> Result<Self, PlanError> {
        let invalid = || PlanError::InvalidDimensions { width, height };
        let w = u32::try_from(width).map_err(|_| invalid())?;
        let h = u32::try_from(height).map_err(|_| invalid())?;
        let dims = Dimensions::new(w, h);
        dims.validate()?;
        Ok(dims)
    }

    fn validate(&self) -> Result<(), PlanError> {
        if self.width < MIN_SIDE || self.height < MIN_SIDE {
            return Err(PlanError::InvalidDimensions {
                width: self.width.into(),
                height: self.height.into(),
            });
        }
        Ok(())
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ConversionMethod {
    /// Center crop to 9:16, discarding the sides.
    #[default]
    Crop,
    /// Fit the whole frame into a 9:16 canvas and pad with bars.
    Scale,
}

impl FromStr for ConversionMethod {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crop" => Ok(ConversionMethod::Crop),
            "scale" => Ok(ConversionMethod::Scale),
            _ => Err(PlanError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl TryFrom<String> for ConversionMethod {
    type Error = PlanError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for ConversionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionMethod::Crop => f.write_str("crop"),
            ConversionMethod::Scale => f.write_str("scale"),
        }
    }
}

/// Rectangle inside the source frame, in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CropWindow {
    pub x_offset: u32,
    pub y_offset: u32,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScalePlan {
    /// Final 9:16 frame.
    pub canvas: Dimensions,
    /// Source frame after resizing, placed inside the canvas.
    pub scaled: Dimensions,
    /// Bar width on the left and on the right.
    pub pad_x: u32,
    /// Bar height on the top and on the bottom.
    pub pad_y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum TransformPlan {
    Crop {
        window: CropWindow,
        output: Dimensions,
    },
    Scale(ScalePlan),
}

impl TransformPlan {
    pub fn method(&self) -> ConversionMethod {
        match self {
            TransformPlan::Crop { .. } => ConversionMethod::Crop,
            TransformPlan::Scale(_) => ConversionMethod::Scale,
        }
    }

    pub fn output_dimensions(&self) -> Dimensions {
        match self {
            TransformPlan::Crop { output, .. } => *output,
            TransformPlan::Scale(plan) => plan.canvas,
        }
    }
}

pub fn compute_transform(
    source: Dimensions,
    method: ConversionMethod,
) -> Result<TransformPlan, PlanError> {
    compute_transform_with(source, method, None)
}

/// Computes the transform for `source`.
///
/// `target_height` sets the height of the output frame. When it is `None` the
/// source height is kept: a crop emits the window as-is and a scale uses a
/// canvas as tall as the source.
pub fn compute_transform_with(
    source: Dimensions,
    method: ConversionMethod,
    target_height: Option<u32>,
) -> Result<TransformPlan, PlanError> {
    source.validate()?;
    if let Some(h) = target_height.filter(|h| *h < MIN_SIDE) {
        return Err(PlanError::InvalidDimensions {
            width: 0,
            height: h.into(),
        });
    }

    match method {
        ConversionMethod::Crop => {
            let window = crop_window(source);
            let output = match target_height {
                Some(h) => portrait_canvas(h),
                // Odd source sides survive in the window; encode an even frame.
                None => Dimensions::new(even_floor(window.width), even_floor(window.height)),
            };
            Ok(TransformPlan::Crop { window, output })
        }
        ConversionMethod::Scale => Ok(TransformPlan::Scale(scale_plan(
            source,
            target_height.unwrap_or(source.height),
        ))),
    }
}

fn crop_window(source: Dimensions) -> CropWindow {
    let (w, h) = (u64::from(source.width), u64::from(source.height));

    let (width, height) = if h * PORTRAIT_W <= w * PORTRAIT_H {
        // Full height, trim the sides.
        let ideal = h as f64 * PORTRAIT_W as f64 / PORTRAIT_H as f64;
        (even_within(ideal, source.width), source.height)
    } else {
        // Narrower than 9:16 already, trim top and bottom instead.
        let ideal = w as f64 * PORTRAIT_H as f64 / PORTRAIT_W as f64;
        (source.width, even_within(ideal, source.height))
    };

    CropWindow {
        x_offset: (source.width - width) / 2,
        y_offset: (source.height - height) / 2,
        width,
        height,
    }
}

fn portrait_canvas(height: u32) -> Dimensions {
    let height = even(f64::from(height));
    let width = even(f64::from(height) * PORTRAIT_W as f64 / PORTRAIT_H as f64);
    Dimensions::new(width, height)
}

fn scale_plan(source: Dimensions, canvas_height: u32) -> ScalePlan {
    let canvas = portrait_canvas(canvas_height);
    let factor = f64::min(
        f64::from(canvas.width) / f64::from(source.width),
        f64::from(canvas.height) / f64::from(source.height),
    );

    let scaled = Dimensions::new(
        even_within(f64::from(source.width) * factor, canvas.width),
        even_within(f64::from(source.height) * factor, canvas.height),
    );

    ScalePlan {
        canvas,
        scaled,
        pad_x: (canvas.width - scaled.width) / 2,
        pad_y: (canvas.height - scaled.height) / 2,
    }
}

/// Nearest even integer, ties away from zero, never below 2.
///
/// yuv420p and most encoders reject odd frame sizes.
pub fn even(value: f64) -> u32 {
    let rounded = (value / 2.0).round() * 2.0;
    if rounded < 2.0 {
        2
    } else {
        rounded.min(u32::MAX as f64) as u32 & !1
    }
}

fn even_floor(value: u32) -> u32 {
    (value & !1).max(2)
}

/// Like [`even`], but never larger than `bound`.
fn even_within(value: f64, bound: u32) -> u32 {
    let v = even(value);
    if v <= bound {
        v
    } else if bound > 1 {
        bound & !1
    } else {
        bound
    }
}
