//! # Smart-Scale Engine
//!
//! Questo modulo calcola il bitrate finale a partire dal bitrate base.
//!
//! ## Catena moltiplicativa:
//! `final_scale = scale_factor × codec_adjustment × content_adjustment`
//! e `scaled_bitrate = floor(base × final_scale)`.
//!
//! ## Scale factor (primo match vince):
//! - `color_space == "bt470bg"` oppure altezza ≤ 480 → 1.2 (classe SD)
//! - fps < 25 → 1.3
//! - fps ≥ 29.5 → 1.7
//! - altrimenti → 1.5 (banda 25–29.5)
//!
//! ## Content adjustment:
//! - bianco e nero + bassa complessità → 0.65
//! - solo bianco e nero → 0.75
//! - solo bassa complessità → 0.85
//! - nessuno → 1.0
//!
//! Tutte le funzioni sono pure: stesso input, stesso output.

use serde::Serialize;

use crate::bitrate::DEFAULT_HEIGHT;
use crate::classifier::CodecFamily;
use crate::probe::StreamInfo;

/// Frame rate assumed when the stream does not report a usable one
pub const DEFAULT_FPS: f64 = 30.0;

/// Color space that forces the SD class regardless of height
pub const SD_COLOR_SPACE: &str = "bt470bg";

/// Bits per pixel per second below which content counts as low complexity
pub const LOW_COMPLEXITY_BPP: f64 = 0.08;

/// Frame rate below which dimensionless streams count as low complexity
pub const LOW_FPS_THRESHOLD: f64 = 24.0;

/// Grayscale pixel formats
pub const GRAYSCALE_PIX_FMTS: &[&str] = &["gray", "gray8", "gray16", "gray8a", "gray16be", "gray16le"];

// Absorbs binary representation error of the decimal factors before flooring
const FLOOR_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionClass {
    Sd,
    Hd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameRateClass {
    Low,
    Medium,
    High,
}

impl ResolutionClass {
    pub fn of(height: u32, color_space: &str) -> Self {
        if color_space == SD_COLOR_SPACE || height <= 480 {
            Self::Sd
        } else {
            Self::Hd
        }
    }
}

impl FrameRateClass {
    pub fn of(fps: f64) -> Self {
        if fps < 25.0 {
            Self::Low
        } else if fps >= 29.5 {
            Self::High
        } else {
            Self::Medium
        }
    }
}

/// Parse `r_frame_rate` into frames per second.
///
/// Accepts `"N/D"` fractions and bare numbers. A zero denominator yields 0;
/// missing or unparseable text yields [`DEFAULT_FPS`].
pub fn parse_fps(raw: Option<&str>) -> f64 {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return DEFAULT_FPS;
    };

    let parsed = match raw.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            (Ok(_), Ok(den)) if den == 0.0 => Some(0.0),
            (Ok(num), Ok(den)) => Some(num / den),
            _ => None,
        },
        None => raw.parse::<f64>().ok(),
    };

    parsed.filter(|fps| fps.is_finite()).unwrap_or(DEFAULT_FPS)
}

/// Resolution/frame-rate scale factor
pub fn scale_factor(height: u32, fps: f64, color_space: &str) -> f64 {
    if ResolutionClass::of(height, color_space) == ResolutionClass::Sd {
        return 1.2;
    }
    match FrameRateClass::of(fps) {
        FrameRateClass::Low => 1.3,
        FrameRateClass::High => 1.7,
        FrameRateClass::Medium => 1.5,
    }
}

/// Per-codec multiplier. Neutral for every family today; tune here.
pub fn codec_adjustment(family: CodecFamily) -> f64 {
    match family {
        CodecFamily::H264
        | CodecFamily::Mpeg1
        | CodecFamily::Mpeg2
        | CodecFamily::Wmv
        | CodecFamily::Xvid
        | CodecFamily::Other => 1.0,
    }
}

pub fn is_black_and_white(pix_fmt: Option<&str>) -> bool {
    pix_fmt.is_some_and(|fmt| GRAYSCALE_PIX_FMTS.contains(&fmt))
}

/// Low visual complexity detection.
///
/// With both dimensions known: `base / (w·h·fps) < 0.08`, false when fps or
/// pixel count is not positive. Otherwise: `0 < fps < 24`.
pub fn is_low_complexity(stream: &StreamInfo, base_bitrate: u64) -> bool {
    let fps = parse_fps(stream.r_frame_rate.as_deref());

    match (stream.width, stream.height) {
        (Some(width), Some(height)) => {
            let pixels = f64::from(width) * f64::from(height);
            if fps <= 0.0 || pixels <= 0.0 {
                return false;
            }
            let bits_per_pixel_per_second = base_bitrate as f64 / (pixels * fps);
            bits_per_pixel_per_second < LOW_COMPLEXITY_BPP
        }
        _ => fps > 0.0 && fps < LOW_FPS_THRESHOLD,
    }
}

/// Combined content discount
pub fn content_adjustment(black_and_white: bool, low_complexity: bool) -> f64 {
    match (black_and_white, low_complexity) {
        (true, true) => 0.65,
        (true, false) => 0.75,
        (false, true) => 0.85,
        (false, false) => 1.0,
    }
}

/// `floor(base × final_scale)`
pub fn scaled_bitrate(base_bitrate: u64, final_scale: f64) -> u64 {
    let scaled = (base_bitrate as f64 * final_scale + FLOOR_TOLERANCE).floor();
    if scaled.is_finite() && scaled > 0.0 {
        scaled as u64
    } else {
        0
    }
}

/// Every intermediate of one bitrate decision
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScaleDecision {
    pub resolution_class: ResolutionClass,
    pub frame_rate_class: FrameRateClass,
    pub fps: f64,
    pub is_black_and_white: bool,
    pub is_low_complexity: bool,
    pub scale_factor: f64,
    pub codec_adjustment: f64,
    pub content_adjustment: f64,
    pub final_scale: f64,
    pub base_bitrate: u64,
    pub scaled_bitrate: u64,
}

impl ScaleDecision {
    /// Compute the decision for one video stream
    pub fn compute(stream: &StreamInfo, family: CodecFamily, base_bitrate: u64) -> Self {
        let height = stream.height.unwrap_or(DEFAULT_HEIGHT);
        let fps = parse_fps(stream.r_frame_rate.as_deref());
        let color_space = stream.color_space.as_deref().unwrap_or("");

        let scale = scale_factor(height, fps, color_space);
        let codec = codec_adjustment(family);
        let black_and_white = is_black_and_white(stream.pix_fmt.as_deref());
        let low_complexity = is_low_complexity(stream, base_bitrate);
        let content = content_adjustment(black_and_white, low_complexity);
        let final_scale = scale * codec * content;

        Self {
            resolution_class: ResolutionClass::of(height, color_space),
            frame_rate_class: FrameRateClass::of(fps),
            fps,
            is_black_and_white: black_and_white,
            is_low_complexity: low_complexity,
            scale_factor: scale,
            codec_adjustment: codec,
            content_adjustment: content,
            final_scale,
            base_bitrate,
            scaled_bitrate: scaled_bitrate(base_bitrate, final_scale),
        }
    }

    /// Target bitrate handed to the encoder, in kbps
    pub fn target_kbps(&self) -> u64 {
        self.scaled_bitrate / 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(height: Option<u32>, width: Option<u32>, fps: Option<&str>, color_space: Option<&str>, pix_fmt: Option<&str>) -> StreamInfo {
        StreamInfo {
            codec_name: Some("h264".to_string()),
            codec_type: Some("video".to_string()),
            height,
            width,
            r_frame_rate: fps.map(str::to_string),
            color_space: color_space.map(str::to_string),
            pix_fmt: pix_fmt.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_scale_factor_table() {
        assert_eq!(scale_factor(480, 29.97, "bt470bg"), 1.2);
        assert_eq!(scale_factor(720, 24.0, ""), 1.3);
        assert_eq!(scale_factor(1080, 30.0, ""), 1.7);
        assert_eq!(scale_factor(720, 25.0, ""), 1.5);
    }

    #[test]
    fn test_scale_factor_boundaries() {
        assert_eq!(scale_factor(720, 29.5, ""), 1.7);
        assert_eq!(scale_factor(720, 29.4, ""), 1.5);
        assert_eq!(scale_factor(720, 24.99, ""), 1.3);
        assert_eq!(scale_factor(480, 60.0, ""), 1.2);
        assert_eq!(scale_factor(481, 60.0, ""), 1.7);
    }

    #[test]
    fn test_bt470bg_overrides_height() {
        assert_eq!(scale_factor(1080, 60.0, "bt470bg"), 1.2);
        assert_eq!(ResolutionClass::of(1080, "bt470bg"), ResolutionClass::Sd);
    }

    #[test]
    fn test_parse_fps_variants() {
        assert!((parse_fps(Some("30000/1001")) - 29.97).abs() < 0.01);
        assert_eq!(parse_fps(Some("25/1")), 25.0);
        assert_eq!(parse_fps(Some("23.976")), 23.976);
        assert_eq!(parse_fps(Some("24")), 24.0);
        assert_eq!(parse_fps(Some("0/0")), 0.0);
        assert_eq!(parse_fps(Some("30/0")), 0.0);
        assert_eq!(parse_fps(None), DEFAULT_FPS);
        assert_eq!(parse_fps(Some("")), DEFAULT_FPS);
        assert_eq!(parse_fps(Some("abc")), DEFAULT_FPS);
        assert_eq!(parse_fps(Some("x/2")), DEFAULT_FPS);
    }

    #[test]
    fn test_codec_adjustment_is_neutral() {
        for family in [CodecFamily::H264, CodecFamily::Mpeg1, CodecFamily::Mpeg2, CodecFamily::Wmv, CodecFamily::Xvid, CodecFamily::Other] {
            assert_eq!(codec_adjustment(family), 1.0);
        }
    }

    #[test]
    fn test_black_and_white_lookup() {
        for fmt in GRAYSCALE_PIX_FMTS {
            assert!(is_black_and_white(Some(fmt)));
        }
        assert!(!is_black_and_white(Some("yuv420p")));
        assert!(!is_black_and_white(Some("yuvj420p")));
        assert!(!is_black_and_white(Some("GRAY")));
        assert!(!is_black_and_white(None));
    }

    #[test]
    fn test_low_complexity_by_density() {
        // 500_000 / (640·480·30) ≈ 0.054
        let s = stream(Some(480), Some(640), Some("30/1"), None, None);
        assert!(is_low_complexity(&s, 500_000));
        // 8_000_000 / (1920·1080·30) ≈ 0.129
        let hd = stream(Some(1080), Some(1920), Some("30/1"), None, None);
        assert!(!is_low_complexity(&hd, 8_000_000));
    }

    #[test]
    fn test_low_complexity_threshold_is_strict() {
        // 100·100·10 pixels·fps → 8_000 bps is exactly 0.08
        let s = stream(Some(100), Some(100), Some("10/1"), None, None);
        assert!(!is_low_complexity(&s, 8_000));
        assert!(is_low_complexity(&s, 7_999));
    }

    #[test]
    fn test_low_complexity_without_dimensions() {
        let slow = stream(None, None, Some("12/1"), None, None);
        assert!(is_low_complexity(&slow, 1_000_000));
        let normal = stream(None, None, Some("30/1"), None, None);
        assert!(!is_low_complexity(&normal, 1));
        let frozen = stream(None, None, Some("0/1"), None, None);
        assert!(!is_low_complexity(&frozen, 1));
        let height_only = stream(Some(480), None, Some("15/1"), None, None);
        assert!(is_low_complexity(&height_only, 100_000_000));
    }

    #[test]
    fn test_low_complexity_zero_guards() {
        let zero_pixels = stream(Some(0), Some(0), Some("30/1"), None, None);
        assert!(!is_low_complexity(&zero_pixels, 1_000_000));
        let zero_fps = stream(Some(480), Some(640), Some("0/1"), None, None);
        assert!(!is_low_complexity(&zero_fps, 1_000_000));
        let zero_den = stream(Some(480), Some(640), Some("30/0"), None, None);
        assert!(!is_low_complexity(&zero_den, 1_000_000));
    }

    #[test]
    fn test_content_adjustment_table() {
        assert_eq!(content_adjustment(true, true), 0.65);
        assert_eq!(content_adjustment(true, false), 0.75);
        assert_eq!(content_adjustment(false, true), 0.85);
        assert_eq!(content_adjustment(false, false), 1.0);
    }

    #[test]
    fn test_gray_sd_content_discount() {
        let s = stream(Some(480), Some(640), Some("30/1"), Some("bt470bg"), Some("gray"));
        let decision = ScaleDecision::compute(&s, CodecFamily::H264, 1_200_000);
        assert_eq!(decision.scale_factor, 1.2);
        assert!(decision.is_black_and_white);
        assert!(!decision.is_low_complexity);
        assert_eq!(decision.content_adjustment, 0.75);
        assert_eq!(decision.scaled_bitrate, 1_080_000);
    }

    #[test]
    fn test_gray_and_low_complexity() {
        // 400_000 / (640·480·30) ≈ 0.043
        let s = stream(Some(480), Some(640), Some("30/1"), None, Some("gray16le"));
        let decision = ScaleDecision::compute(&s, CodecFamily::Mpeg2, 400_000);
        assert_eq!(decision.content_adjustment, 0.65);
        assert_eq!(decision.scaled_bitrate, 312_000);
    }

    #[test]
    fn test_fractional_fps_without_width() {
        let s = stream(Some(1080), None, Some("30000/1001"), Some(""), None);
        let decision = ScaleDecision::compute(&s, CodecFamily::H264, 1_200_000);
        assert_eq!(decision.frame_rate_class, FrameRateClass::High);
        assert_eq!(decision.scaled_bitrate, 2_040_000);
        assert_eq!(decision.target_kbps(), 2040);
    }

    #[test]
    fn test_defaults_for_empty_stream() {
        let decision = ScaleDecision::compute(&StreamInfo::default(), CodecFamily::Other, 1_200_000);
        assert_eq!(decision.resolution_class, ResolutionClass::Sd);
        assert_eq!(decision.fps, DEFAULT_FPS);
        assert_eq!(decision.scaled_bitrate, 1_440_000);
    }

    #[test]
    fn test_zero_base_bitrate() {
        let s = stream(Some(720), Some(1280), Some("25/1"), None, None);
        let decision = ScaleDecision::compute(&s, CodecFamily::H264, 0);
        assert_eq!(decision.scaled_bitrate, 0);
        assert_eq!(decision.target_kbps(), 0);
    }

    #[test]
    fn test_scaled_bitrate_floors() {
        assert_eq!(scaled_bitrate(1_200_000, 1.2 * 0.75), 1_080_000);
        assert_eq!(scaled_bitrate(1_000_001, 1.5), 1_500_001);
        assert_eq!(scaled_bitrate(8_000_000, 1.7), 13_600_000);
        assert_eq!(scaled_bitrate(999, 1.3), 1_298);
    }

    #[test]
    fn test_decision_is_idempotent() {
        let s = stream(Some(576), Some(720), Some("25/1"), Some("bt709"), Some("yuv420p"));
        let first = ScaleDecision::compute(&s, CodecFamily::Mpeg2, 3_500_000);
        let second = ScaleDecision::compute(&s, CodecFamily::Mpeg2, 3_500_000);
        assert_eq!(first, second);
    }
}
