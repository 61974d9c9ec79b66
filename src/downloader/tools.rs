// External tool discovery (yt-dlp, ffmpeg)

use log::{info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub is_available: bool,
}

/// Locates tools: explicit path, then common install dirs, then `PATH`.
pub struct ToolManager {
    search_path: Option<String>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self {
            search_path: std::env::var("PATH").ok(),
        }
    }

    /// Use a custom `PATH` string instead of the process one
    pub fn with_search_path(search_path: Option<String>) -> Self {
        Self { search_path }
    }

    pub fn locate(&self, tool_type: ToolType, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            if path.exists() {
                return Some(path.to_path_buf());
            }
            warn!(
                "[Tools] Configured {} path {} does not exist, searching",
                tool_type.as_str(),
                path.display()
            );
        }

        let binary_name = tool_type.as_str();

        // 1. Common install locations
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];
        if let Some(found) = common_paths.iter().map(PathBuf::from).find(|p| p.exists()) {
            return Some(found);
        }

        // 2. PATH
        let search_path = self.search_path.as_deref()?;
        std::env::split_paths(search_path)
            .map(|dir| dir.join(binary_name))
            .find(|candidate| candidate.is_file())
    }

    /// Located path, or the bare binary name as a last resort
    pub fn resolve_or_default(&self, tool_type: ToolType, explicit: Option<&Path>) -> PathBuf {
        self.locate(tool_type, explicit)
            .unwrap_or_else(|| PathBuf::from(tool_type.as_str()))
    }

    pub fn get_tool_info(&self, tool_type: ToolType, explicit: Option<&Path>) -> ToolInfo {
        let path = self.locate(tool_type, explicit);
        let version = path.as_deref().and_then(|p| Self::get_version(p, tool_type));

        ToolInfo {
            name: tool_type.as_str().to_string(),
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    fn get_version(path: &Path, tool_type: ToolType) -> Option<String> {
        match Command::new(path).arg(tool_type.version_arg()).output() {
            Ok(output) if output.status.success() => {
                // ffmpeg prints a banner; the first line carries the version
                String::from_utf8_lossy(&output.stdout)
                    .lines()
                    .next()
                    .map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }

    /// Log what was found at startup
    pub fn report(&self, infos: &[ToolInfo]) {
        for tool in infos {
            match (&tool.path, &tool.version) {
                (Some(path), Some(version)) => {
                    info!("[Tools] {} {} at {}", tool.name, version, path.display())
                }
                (Some(path), None) => info!("[Tools] {} at {}", tool.name, path.display()),
                (None, _) => warn!("[Tools] {} not found", tool.name),
            }
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
