//! # Tool Path Resolver
//!
//! Finds the external tools the converter delegates to (`ffmpeg`,
//! `ffprobe`, `mkvpropedit`):
//! - a bundled tool directory named by `CONVERTER_TOOLS_DIR`
//! - the system `PATH`
//!
//! Unresolved tools fall back to their bare name so the OS can still try
//! its own lookup; the spawn error then surfaces as a failed `ToolOutput`.

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable pointing at a directory of bundled tools
pub const TOOLS_DIR_ENV: &str = "CONVERTER_TOOLS_DIR";

/// Tools the converter needs, with what each is used for
pub const REQUIRED_TOOLS: &[(&str, &str)] = &[
    ("ffprobe", "stream probing"),
    ("ffmpeg", "repair remux and encoding"),
    ("mkvpropedit", "episode metadata embedding"),
];

/// Tool path resolver for bundled and system-installed tools
#[derive(Debug, Clone)]
pub struct ToolPathResolver {
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a resolver honoring `CONVERTER_TOOLS_DIR`
    pub fn new() -> Self {
        let tools_dir = env::var_os(TOOLS_DIR_ENV)
            .map(PathBuf::from)
            .filter(|p| p.is_dir());
        Self { tools_dir }
    }

    /// Create a resolver with an explicit bundled directory
    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    fn executable_name(tool_name: &str) -> String {
        if cfg!(windows) {
            format!("{}.exe", tool_name)
        } else {
            tool_name.to_string()
        }
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        let executable = Self::executable_name(tool_name);

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled = tools_dir.join(&executable);
            if bundled.is_file() {
                debug!("Using bundled tool: {} -> {}", tool_name, bundled.display());
                return Some(bundled);
            }
        }

        let found = Self::find_in_system_path(&executable);
        if let Some(ref path) = found {
            debug!("Using system tool: {} -> {}", tool_name, path.display());
        }
        found
    }

    /// Program to spawn for `tool_name`: resolved path or the bare name
    pub fn command_for(&self, tool_name: &str) -> PathBuf {
        self.resolve_tool(tool_name)
            .unwrap_or_else(|| PathBuf::from(Self::executable_name(tool_name)))
    }

    fn find_in_system_path(executable: &str) -> Option<PathBuf> {
        let path_var = env::var_os("PATH")?;
        env::split_paths(&path_var)
            .map(|dir| dir.join(executable))
            .find(|candidate| candidate.is_file())
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Names of required tools that cannot be found
    pub fn missing_tools(&self) -> Vec<&'static str> {
        REQUIRED_TOOLS
            .iter()
            .filter(|(tool, _)| !self.is_tool_available(tool))
            .map(|(tool, _)| *tool)
            .collect()
    }

    /// Get installation instructions for a tool
    pub fn install_hint(tool_name: &str) -> &'static str {
        match tool_name {
            "ffmpeg" | "ffprobe" => "sudo apt-get install ffmpeg  # macOS: brew install ffmpeg",
            "mkvpropedit" => "sudo apt-get install mkvtoolnix  # macOS: brew install mkvtoolnix",
            _ => "install it and make sure it is on PATH",
        }
    }

    /// Human-readable availability report
    pub fn tools_report(&self) -> String {
        let mut report = String::from("Tool availability:\n");
        if let Some(ref dir) = self.tools_dir {
            report.push_str(&format!("Bundled tools dir: {}\n", dir.display()));
        }
        for (tool, purpose) in REQUIRED_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} ({}) -> {}\n", tool, purpose, path.display())),
                None => report.push_str(&format!(
                    "  ❌ {} ({}) not found, install with: {}\n",
                    tool,
                    purpose,
                    Self::install_hint(tool)
                )),
            }
        }
        report
    }

    /// Bundled tools directory, when configured
    pub fn tools_dir(&self) -> Option<&Path> {
        self.tools_dir.as_deref()
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
