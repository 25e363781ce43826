//! # Utility Functions Module
//!
//! Small helpers shared by the tool-invoking modules: argument vector
//! building for external commands and lossy display of path components.

use std::path::Path;

/// Converts any iterable of displayable items into owned argument strings.
///
/// ```rust
/// use legacy_video_converter::utils::to_string_vec;
///
/// let bitrate = 1440;
/// let args = to_string_vec(["-b:v", &format!("{}k", bitrate)]);
/// assert_eq!(args, vec!["-b:v", "1440k"]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Builds a `Vec<String>` of command arguments from mixed literals, numbers
/// and `Path::display()` values.
///
/// ```rust
/// use legacy_video_converter::args;
/// use std::path::Path;
///
/// let (input, output) = (Path::new("in.avi"), Path::new("out.avi"));
/// let args = args!["-y", "-i", input.display(), "-c", "copy", output.display()];
/// assert_eq!(args, vec!["-y", "-i", "in.avi", "-c", "copy", "out.avi"]);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec::<String, _>([$(($item).to_string()),*])
    };
}

/// File name of `path` for log messages, empty when there is none
pub fn display_name(path: &Path) -> String {
    path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}

/// File stem of `path`, empty when there is none
pub fn stem_of(path: &Path) -> String {
    path.file_stem().unwrap_or_default().to_string_lossy().into_owned()
}
