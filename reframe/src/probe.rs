use std::path::Path;

use log::{debug, error, trace};
use serde::Deserialize;
use tokio::process::Command;

use crate::error::ConvertError;
use crate::geometry::Dimensions;

pub const FFPROBE_ENV_VAR: &str = "REFRAME_FFPROBE";
pub const DEFAULT_FFPROBE: &str = "ffprobe";

/// Something that can report the frame size of a video.
#[allow(async_fn_in_trait)]
pub trait VideoSource {
    async fn dimensions(&self, input: &Path) -> Result<Dimensions, ConvertError>;
}

#[derive(Deserialize, Debug)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Deserialize, Debug)]
struct FfprobeStream {
    width: Option<i64>,
    height: Option<i64>,
    #[serde(default)]
    side_data_list: Vec<FfprobeSideData>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Deserialize, Debug)]
struct FfprobeSideData {
    rotation: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
struct FfprobeTags {
    rotate: Option<String>,
}

impl FfprobeStream {
    /// Display rotation in degrees, from the display matrix or the legacy tag.
    fn rotation(&self) -> i64 {
        self.side_data_list
            .iter()
            .find_map(|sd| sd.rotation)
            .map(|r| r.round() as i64)
            .or_else(|| self.tags.rotate.as_deref().and_then(|r| r.trim().parse().ok()))
            .unwrap_or(0)
    }
}

/// Extracts the first video stream's displayed size from `ffprobe -of json`
/// output.
///
/// ffmpeg autorotates its input, so a stream rotated by 90 or 270 degrees
/// reaches the filter graph with its sides swapped.
pub fn parse_ffprobe_output(json: &str) -> Result<Dimensions, ConvertError> {
    let output: FfprobeOutput = serde_json::from_str(json)?;
    let stream = output
        .streams
        .first()
        .ok_or_else(|| ConvertError::Probe("no video stream found".to_string()))?;

    match (stream.width, stream.height) {
        (Some(w), Some(h)) if stream.rotation().rem_euclid(180) == 90 => {
            debug!("Stream is rotated by {} degrees", stream.rotation());
            Ok(Dimensions::try_new(h, w)?)
        }
        (Some(w), Some(h)) => Ok(Dimensions::try_new(w, h)?),
        _ => Err(ConvertError::Probe(
            "video stream does not report width and height".to_string(),
        )),
    }
}

#[derive(Debug, Clone)]
pub struct FfprobeSource {
    program: String,
}

impl FfprobeSource {
    pub fn new(program: impl Into<String>) -> Self {
        FfprobeSource {
            program: program.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var(FFPROBE_ENV_VAR).unwrap_or_else(|_| DEFAULT_FFPROBE.to_string()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl VideoSource for FfprobeSource {
    async fn dimensions(&self, input: &Path) -> Result<Dimensions, ConvertError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-v", "error", "-select_streams", "v:0"])
            .args([
                "-show_entries",
                "stream=width,height:stream_side_data=rotation:stream_tags=rotate",
            ])
            .args(["-of", "json"])
            .arg(input.as_os_str())
            .kill_on_drop(true);

        trace!("Executing FFPROBE command: {:?}", cmd);

        let out = cmd.output().await.map_err(|e| {
            error!("Failed to execute {}: {}", self.program, e);
            ConvertError::Spawn {
                program: self.program.clone(),
                source: e,
            }
        })?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            error!("{} exited with {} for {:?}: {}", self.program, out.status, input, stderr);
            return Err(ConvertError::Probe(stderr));
        }

        let dims = parse_ffprobe_output(&String::from_utf8_lossy(&out.stdout))?;
        debug!("Probed {:?}: {}", input, dims);
        Ok(dims)
    }
}
