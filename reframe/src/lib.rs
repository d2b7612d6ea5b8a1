//! Landscape to portrait (16:9 to 9:16) video conversion.
//!
//! [`geometry`] computes the crop window or the letterbox plan, [`probe`]
//! reads source dimensions with ffprobe and [`transcoder`] renders the plan
//! with ffmpeg. [`job::process_job`] ties the three together.

pub mod error;
pub mod geometry;
pub mod job;
pub mod options;
pub mod probe;
pub mod transcoder;

pub use error::ConvertError;
pub use geometry::{
    ConversionMethod, CropWindow, Dimensions, PlanError, ScalePlan, TransformPlan,
    compute_transform, compute_transform_with,
};
pub use job::{ConversionJob, load_job, plan_job, process_job};
pub use options::TranscodeOptions;
pub use probe::{FfprobeSource, VideoSource};
pub use transcoder::{FfmpegSink, VideoSink};
