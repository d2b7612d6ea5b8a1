use std::path::Path;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscodeOptions {
    pub video_codec: String,
    pub video_bitrate: Option<String>,
    pub crf: Option<u8>,
    pub preset: String,
    pub audio_codec: String,
    pub audio_bitrate: String,
    /// ffmpeg color used for letterbox bars.
    pub pad_color: String,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        TranscodeOptions {
            video_codec: "libx264".to_string(),
            video_bitrate: None,
            crf: Some(23),
            preset: "medium".to_string(),
            audio_codec: "aac".to_string(),
            audio_bitrate: "128k".to_string(),
            pad_color: "black".to_string(),
        }
    }
}

impl TranscodeOptions {
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        debug!("Loading transcode options from {:?}", path);
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn supports_crf(&self) -> bool {
        self.video_codec == "libx264" || self.video_codec == "libx265"
    }

    pub fn validate(&self) -> Result<(), ConvertError> {
        for (name, value) in [
            ("video_codec", &self.video_codec),
            ("preset", &self.preset),
            ("audio_codec", &self.audio_codec),
            ("audio_bitrate", &self.audio_bitrate),
            ("pad_color", &self.pad_color),
        ] {
            if value.trim().is_empty() {
                return Err(ConvertError::InvalidOptions(format!("{} must not be empty", name)));
            }
        }

        if let Some(crf) = self.crf {
            if crf > 51 {
                return Err(ConvertError::InvalidOptions(format!(
                    "crf {} is out of range 0-51",
                    crf
                )));
            }
            if !self.supports_crf() && self.video_bitrate.is_none() {
                return Err(ConvertError::InvalidOptions(format!(
                    "CRF not supported for {} and no video_bitrate provided.",
                    self.video_codec
                )));
            }
        } else if self.video_bitrate.is_none() {
            return Err(ConvertError::InvalidOptions(
                "Video quality setting missing: Neither CRF nor video_bitrate provided.".to_string(),
            ));
        }

        if let (Some(crf), Some(vb)) = (self.crf, &self.video_bitrate) {
            if self.supports_crf() {
                warn!(
                    "CRF value ({}) is set, video_bitrate ({}) will be ignored.",
                    crf, vb
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let options = TranscodeOptions::default();
        assert!(options.validate().is_ok());
        assert!(options.supports_crf());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let options: TranscodeOptions =
            serde_json::from_str(r#"{"preset": "veryfast", "crf": 18}"#).unwrap();
        assert_eq!(options.preset, "veryfast");
        assert_eq!(options.crf, Some(18));
        assert_eq!(options.video_codec, "libx264");
        assert_eq!(options.pad_color, "black");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"video_codec": "libx265", "audio_bitrate": "192k"}}"#).unwrap();
        let options = TranscodeOptions::load(file.path()).unwrap();
        assert_eq!(options.video_codec, "libx265");
        assert_eq!(options.audio_bitrate, "192k");
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            TranscodeOptions::load(file.path()),
            Err(ConvertError::Json(_))
        ));
    }

    #[test]
    fn test_missing_quality_setting() {
        let options = TranscodeOptions {
            crf: None,
            video_bitrate: None,
            ..Default::default()
        };
        assert!(matches!(
            options.validate(),
            Err(ConvertError::InvalidOptions(_))
        ));
    }

    #[test]
    fn test_crf_without_support_needs_bitrate() {
        let mut options = TranscodeOptions {
            video_codec: "libvpx-vp9".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        options.video_bitrate = Some("2M".to_string());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_crf_out_of_range() {
        let options = TranscodeOptions {
            crf: Some(60),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_empty_preset_rejected() {
        let options = TranscodeOptions {
            preset: "  ".to_string(),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }
}
