use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::{debug, error, info, trace, warn};
use tokio::process::Command;
use uuid::Uuid;

use crate::error::ConvertError;
use crate::geometry::TransformPlan;
use crate::options::TranscodeOptions;

pub const FFMPEG_ENV_VAR: &str = "REFRAME_FFMPEG";
pub const DEFAULT_FFMPEG: &str = "ffmpeg";

/// Something that can render `input` through a transform plan into `output`.
#[allow(async_fn_in_trait)]
pub trait VideoSink {
    async fn write(
        &self,
        input: &Path,
        plan: &TransformPlan,
        output: &Path,
    ) -> Result<(), ConvertError>;
}

/// ffmpeg `-vf` filter graph for a plan.
pub fn build_filter(plan: &TransformPlan, options: &TranscodeOptions) -> String {
    match plan {
        TransformPlan::Crop { window, output } => {
            let mut vf = format!(
                "crop={}:{}:{}:{}",
                window.width, window.height, window.x_offset, window.y_offset
            );
            if *output != window.dimensions() {
                vf.push_str(&format!(",scale={}:{}", output.width, output.height));
            }
            vf.push_str(",setsar=1");
            vf
        }
        TransformPlan::Scale(scale) => format!(
            "scale={}:{},pad={}:{}:{}:{}:color={},setsar=1",
            scale.scaled.width,
            scale.scaled.height,
            scale.canvas.width,
            scale.canvas.height,
            scale.pad_x,
            scale.pad_y,
            options.pad_color
        ),
    }
}

/// Full ffmpeg argument list, without the program name.
pub fn build_args(
    input: &Path,
    output: &Path,
    plan: &TransformPlan,
    options: &TranscodeOptions,
) -> Result<Vec<OsString>, ConvertError> {
    let mut args: Vec<OsString> = vec!["-y".into(), "-i".into(), input.as_os_str().to_owned()];
    args.push("-vf".into());
    args.push(build_filter(plan, options).into());
    args.push("-c:v".into());
    args.push(options.video_codec.clone().into());

    if let Some(crf_val) = options.crf {
        if options.supports_crf() {
            args.push("-crf".into());
            args.push(crf_val.to_string().into());
        } else {
            warn!(
                "CRF is specified but video codec {} might not support it. Falling back to video_bitrate if available.",
                options.video_codec
            );
            match &options.video_bitrate {
                Some(vb) => {
                    args.push("-b:v".into());
                    args.push(vb.into());
                }
                None => {
                    return Err(ConvertError::InvalidOptions(format!(
                        "CRF not supported for {} and no video_bitrate provided.",
                        options.video_codec
                    )));
                }
            }
        }
    } else if let Some(vb) = &options.video_bitrate {
        args.push("-b:v".into());
        args.push(vb.into());
    } else {
        return Err(ConvertError::InvalidOptions(
            "Video quality setting missing: Neither CRF nor video_bitrate provided.".to_string(),
        ));
    }

    args.push("-preset".into());
    args.push(options.preset.clone().into());

    if options.video_codec == "libx264" {
        args.push("-pix_fmt".into());
        args.push("yuv420p".into());
    }

    args.push("-c:a".into());
    args.push(options.audio_codec.clone().into());
    args.push("-b:a".into());
    args.push(options.audio_bitrate.clone().into());
    args.push(output.as_os_str().to_owned());
    Ok(args)
}

/// Hidden sibling of `output` that keeps its extension, so ffmpeg still picks
/// the right container.
pub fn temp_output_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let mut name = format!(".{}.{}", stem, Uuid::new_v4());
    if let Some(ext) = output.extension() {
        name.push('.');
        name.push_str(&ext.to_string_lossy());
    }
    output.with_file_name(name)
}

#[derive(Debug, Clone)]
pub struct FfmpegSink {
    program: String,
    options: TranscodeOptions,
}

impl FfmpegSink {
    pub fn new(program: impl Into<String>, options: TranscodeOptions) -> Self {
        FfmpegSink {
            program: program.into(),
            options,
        }
    }

    pub fn from_env(options: TranscodeOptions) -> Self {
        let program = std::env::var(FFMPEG_ENV_VAR).unwrap_or_else(|_| DEFAULT_FFMPEG.to_string());
        Self::new(program, options)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    async fn run_ffmpeg(&self, args: Vec<OsString>) -> Result<(), ConvertError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(args)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        trace!("Executing FFMPEG command: {:?}", cmd);

        let status = cmd.status().await.map_err(|e| {
            error!("Failed to execute {}: {}", self.program, e);
            ConvertError::Spawn {
                program: self.program.clone(),
                source: e,
            }
        })?;

        if status.success() {
            Ok(())
        } else {
            let err = ConvertError::Ffmpeg(status);
            error!("{}", err);
            Err(err)
        }
    }
}

/// Removes the temp file unless the conversion got far enough to rename it.
struct TempGuard(Option<PathBuf>);

impl Drop for TempGuard {
    fn drop(&mut self) {
        if let Some(path) = self.0.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Removed temporary file {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove temporary file {:?}: {}", path, e),
            }
        }
    }
}

impl VideoSink for FfmpegSink {
    async fn write(
        &self,
        input: &Path,
        plan: &TransformPlan,
        output: &Path,
    ) -> Result<(), ConvertError> {
        if let Some(parent_dir) = output.parent() {
            if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                tokio::fs::create_dir_all(parent_dir).await.map_err(|e| {
                    error!("Failed to create output directory {:?}: {}", parent_dir, e);
                    e
                })?;
                info!("Created output directory: {:?}", parent_dir);
            }
        }

        let temp_path = temp_output_path(output);
        let args = build_args(input, &temp_path, plan, &self.options)?;
        let mut guard = TempGuard(Some(temp_path.clone()));

        info!(
            "Encoding {:?} -> {:?} ({} {})",
            input,
            output,
            self.options.video_codec,
            plan.output_dimensions()
        );
        self.run_ffmpeg(args).await?;

        tokio::fs::rename(&temp_path, output).await.map_err(|e| {
            error!("Failed to move {:?} to {:?}: {}", temp_path, output, e);
            e
        })?;
        guard.0 = None;
        Ok(())
    }
}
