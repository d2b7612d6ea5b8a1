use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::geometry::PlanError;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("input file not found: {0:?}")]
    InputNotFound(PathBuf),
    #[error("invalid transcode options: {0}")]
    InvalidOptions(String),
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("ffprobe failed: {0}")]
    Probe(String),
    #[error("ffmpeg command failed with status: {0}. Check ffmpeg output above for details.")]
    Ffmpeg(ExitStatus),
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}
