//! # Bitrate Resolver
//!
//! Derives the base bitrate of a video stream, in strict precedence:
//! 1. stream `bit_rate` (accepted verbatim, `0` included)
//! 2. container `bit_rate`
//! 3. resolution tier of the SD baseline: `≤480 → B`, `≤720 → 2.5·B`, `>720 → 5·B`
//!
//! Text that does not parse as a non-negative integer counts as absent.

use crate::probe::{FormatInfo, StreamInfo};

/// Height assumed when the stream does not report one
pub const DEFAULT_HEIGHT: u32 = 480;

/// Parse a probe bitrate field
pub fn parse_bitrate(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
}

/// Fallback bitrate for a resolution tier
pub fn tier_bitrate(height: u32, sd_baseline: u64) -> u64 {
    if height <= 480 {
        sd_baseline
    } else if height <= 720 {
        // 2.5 × B, exact in integers
        sd_baseline.saturating_mul(5) / 2
    } else {
        sd_baseline.saturating_mul(5)
    }
}

/// Resolve the base bitrate (bps) of `stream`
pub fn resolve_bitrate(stream: &StreamInfo, format: Option<&FormatInfo>, sd_baseline: u64) -> u64 {
    if let Some(bitrate) = parse_bitrate(stream.bit_rate.as_deref()) {
        return bitrate;
    }

    if let Some(bitrate) = format.and_then(|f| parse_bitrate(f.bit_rate.as_deref())) {
        return bitrate;
    }

    tier_bitrate(stream.height.unwrap_or(DEFAULT_HEIGHT), sd_baseline)
}
