use std::path::{Path, PathBuf};

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;
use crate::geometry::{ConversionMethod, TransformPlan, compute_transform_with};
use crate::options::TranscodeOptions;
use crate::probe::VideoSource;
use crate::transcoder::VideoSink;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
    #[serde(default)]
    pub method: ConversionMethod,
    /// Output height; the source height is kept when unset.
    #[serde(default)]
    pub target_height: Option<u32>,
    #[serde(default)]
    pub options: TranscodeOptions,
}

impl ConversionJob {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>, method: ConversionMethod) -> Self {
        ConversionJob {
            input: input.into(),
            output: output.into(),
            method,
            target_height: None,
            options: TranscodeOptions::default(),
        }
    }
}

pub fn load_job(path: &Path) -> Result<ConversionJob, ConvertError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Checks the input, probes it and computes the plan, without encoding.
pub async fn plan_job<S: VideoSource>(
    source: &S,
    job: &ConversionJob,
) -> Result<TransformPlan, ConvertError> {
    if !job.input.exists() {
        let err = ConvertError::InputNotFound(job.input.clone());
        error!("{}", err);
        return Err(err);
    }
    job.options.validate()?;
    debug!("Transcoding options: {:?}", job.options);

    info!("Loading video: {:?}", job.input);
    let dims = source.dimensions(&job.input).await?;
    info!(
        "Original dimensions: {} (aspect ratio: {:.2})",
        dims,
        dims.aspect_ratio()
    );

    let plan = compute_transform_with(dims, job.method, job.target_height)?;
    match &plan {
        TransformPlan::Crop { window, output } => {
            info!(
                "Cropping to: {}x{} at ({}, {})",
                window.width, window.height, window.x_offset, window.y_offset
            );
            if *output != window.dimensions() {
                info!("Scaling to: {}", output);
            }
        }
        TransformPlan::Scale(scale) => {
            info!(
                "Scaling to: {} on a {} canvas, padding {}px left/right and {}px top/bottom",
                scale.scaled, scale.canvas, scale.pad_x, scale.pad_y
            );
        }
    }
    Ok(plan)
}

pub async fn process_job<S: VideoSource, K: VideoSink>(
    source: &S,
    sink: &K,
    job: &ConversionJob,
) -> Result<TransformPlan, ConvertError> {
    let plan = plan_job(source, job).await?;

    info!("Writing output to: {:?}", job.output);
    sink.write(&job.input, &plan, &job.output).await?;
    info!(
        "Conversion completed: {:?} -> {:?} ({})",
        job.input,
        job.output,
        plan.output_dimensions()
    );
    Ok(plan)
}
