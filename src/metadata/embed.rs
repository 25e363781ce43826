//! Matroska tag embedding with `mkvpropedit`.

use std::path::Path;

use super::EpisodeMetadata;
use crate::args;

/// Maximum summary length written to the `comment` field, in characters
pub const MAX_SUMMARY_CHARS: usize = 500;

/// `mkvpropedit` arguments for `metadata`, `None` when there is nothing to write
pub fn mkvpropedit_args(mkv: &Path, metadata: &EpisodeMetadata) -> Option<Vec<String>> {
    let mut args = args![mkv.display()];
    let mut edits = 0;

    let title = single_line(&metadata.title);
    if !title.trim().is_empty() {
        args.extend(args!["--edit", "info", "--set", format!("title={}", title)]);
        edits += 1;
    }

    let summary: String = metadata.summary.chars().take(MAX_SUMMARY_CHARS).collect();
    let summary = single_line(&summary);
    if !summary.trim().is_empty() {
        args.extend(args!["--edit", "info", "--set", format!("comment={}", summary)]);
        edits += 1;
    }

    if is_iso_date(&metadata.airdate) {
        args.extend(args!["--edit", "info", "--set", format!("date={}", metadata.airdate)]);
        edits += 1;
    }

    (edits > 0).then_some(args)
}

fn single_line(text: &str) -> String {
    text.replace(['\n', '\r'], " ")
}

/// `YYYY-MM-DD`, digits only
fn is_iso_date(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
