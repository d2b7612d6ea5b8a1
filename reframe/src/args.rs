use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use reframe::{ConversionJob, ConversionMethod, ConvertError, TranscodeOptions, load_job};

/// Convert 16:9 landscape videos to 9:16 portrait videos
#[derive(Debug, Parser)]
#[command(version, after_help = "Examples:\n  reframe input.mp4 output.mp4\n  reframe input.mp4 output.mp4 --method scale --height 1920")]
pub struct Args {
    /// Input video file path
    #[arg(required_unless_present = "job")]
    pub input: Option<PathBuf>,
    /// Output video file path
    #[arg(required_unless_present = "job")]
    pub output: Option<PathBuf>,
    /// Conversion method [default: crop]
    ///
    /// crop takes a centered 9:16 window, scale fits the whole frame and pads it
    /// with bars.
    #[arg(short, long, value_name = "crop|scale", value_parser = ConversionMethod::from_str)]
    pub method: Option<ConversionMethod>,
    /// Height of the output frame, the source height is kept by default
    #[arg(long)]
    pub height: Option<u32>,
    /// JSON file with encoder settings
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,
    /// Constant rate factor, overrides the options file
    #[arg(long)]
    pub crf: Option<u8>,
    /// Encoder preset, overrides the options file
    #[arg(long)]
    pub preset: Option<String>,
    /// Video codec, overrides the options file
    #[arg(long)]
    pub video_codec: Option<String>,
    /// JSON job file describing the whole conversion
    #[arg(long, value_name = "FILE", conflicts_with_all = ["input", "output", "options"])]
    pub job: Option<PathBuf>,
    /// Print the computed plan and ffmpeg command without encoding
    #[arg(long)]
    pub dry_run: bool,
}

impl Args {
    /// Merges the job file, the options file and the flags, flags winning.
    pub fn into_job(self) -> Result<ConversionJob, ConvertError> {
        let mut job = match &self.job {
            Some(path) => load_job(path)?,
            None => {
                let options = match &self.options {
                    Some(path) => TranscodeOptions::load(path)?,
                    None => TranscodeOptions::default(),
                };
                ConversionJob {
                    input: self.input.clone().unwrap_or_default(),
                    output: self.output.clone().unwrap_or_default(),
                    method: ConversionMethod::default(),
                    target_height: None,
                    options,
                }
            }
        };

        if let Some(method) = self.method {
            job.method = method;
        }
        if self.height.is_some() {
            job.target_height = self.height;
        }
        if self.crf.is_some() {
            job.options.crf = self.crf;
        }
        if let Some(preset) = self.preset {
            job.options.preset = preset;
        }
        if let Some(codec) = self.video_codec {
            job.options.video_codec = codec;
        }
        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("reframe").chain(args.iter().copied()))
    }

    #[test]
    fn test_positional_paths_default_to_crop() {
        let job = parse(&["in.mp4", "out.mp4"]).unwrap().into_job().unwrap();
        assert_eq!(job, ConversionJob::new("in.mp4", "out.mp4", ConversionMethod::Crop));
    }

    #[test]
    fn test_method_and_overrides() {
        let job = parse(&[
            "in.mp4", "out.mp4", "--method", "scale", "--height", "1920", "--crf", "18",
            "--preset", "slow",
        ])
        .unwrap()
        .into_job()
        .unwrap();
        assert_eq!(job.method, ConversionMethod::Scale);
        assert_eq!(job.target_height, Some(1920));
        assert_eq!(job.options.crf, Some(18));
        assert_eq!(job.options.preset, "slow");
        assert_eq!(job.options.video_codec, "libx264");
    }

    #[test]
    fn test_unknown_method_is_rejected() {
        let err = parse(&["in.mp4", "out.mp4", "--method", "stretch"]).unwrap_err();
        assert!(err.to_string().contains("unsupported conversion method"));
    }

    #[test]
    fn test_help_shows_method_default() {
        use clap::CommandFactory;

        let help = Args::command().render_help().to_string();
        assert!(help.contains("[default: crop]"));
        assert!(help.contains("crop|scale"));
    }

    #[test]
    fn test_paths_required_without_job() {
        assert!(parse(&["in.mp4"]).is_err());
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_options_file_then_flag_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"preset": "veryfast", "audio_bitrate": "96k"}}"#).unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let job = parse(&["in.mp4", "out.mp4", "--options", &path, "--preset", "fast"])
            .unwrap()
            .into_job()
            .unwrap();
        assert_eq!(job.options.preset, "fast");
        assert_eq!(job.options.audio_bitrate, "96k");
    }

    #[test]
    fn test_job_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input": "a.mov", "output": "b.mp4", "method": "scale"}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let job = parse(&["--job", &path, "--method", "crop"])
            .unwrap()
            .into_job()
            .unwrap();
        assert_eq!(job.input, PathBuf::from("a.mov"));
        assert_eq!(job.method, ConversionMethod::Crop);

        assert!(parse(&["in.mp4", "out.mp4", "--job", &path]).is_err());
    }
}
