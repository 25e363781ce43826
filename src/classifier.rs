//! # Stream Classifier
//!
//! Maps ffprobe's canonical codec names to the coarse codec families that
//! decide which repair treatment a file gets.

use serde::Serialize;
use std::fmt;

/// Codec family of a video stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecFamily {
    H264,
    Mpeg1,
    Mpeg2,
    Wmv,
    Xvid,
    Other,
}

impl CodecFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::H264 => "h264",
            Self::Mpeg1 => "mpeg1",
            Self::Mpeg2 => "mpeg2",
            Self::Wmv => "wmv",
            Self::Xvid => "xvid",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for CodecFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a codec name (case-sensitive, lowercase ffprobe names)
pub fn classify(codec_name: &str) -> CodecFamily {
    match codec_name {
        "mpeg4" => CodecFamily::Xvid,
        "h264" => CodecFamily::H264,
        "mpeg1video" => CodecFamily::Mpeg1,
        "mpeg2video" => CodecFamily::Mpeg2,
        "wmv3" => CodecFamily::Wmv,
        _ => CodecFamily::Other,
    }
}
