// External tool detection (yt-dlp, ffmpeg)

use std::process::Command;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolKind {
    YtDlp,
    Ffmpeg,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::YtDlp => "yt-dlp",
            ToolKind::Ffmpeg => "ffmpeg",
        }
    }

    fn version_arg(&self) -> &'static str {
        match self {
            ToolKind::YtDlp => "--version",
            ToolKind::Ffmpeg => "-version",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub kind: ToolKind,
    pub path: Option<String>,
    pub version: Option<String>,
    pub is_available: bool,
}

/// Locate a tool: common install paths first, then PATH
pub fn find_binary(kind: ToolKind) -> Option<String> {
    let binary_name = kind.as_str();

    let common_paths = [
        format!("/opt/homebrew/bin/{}", binary_name),
        format!("/usr/local/bin/{}", binary_name),
        format!("/usr/bin/{}", binary_name),
    ];
    for path in common_paths {
        if std::path::Path::new(&path).exists() {
            return Some(path);
        }
    }

    if let Ok(output) = Command::new("which").arg(binary_name).output() {
        if output.status.success() {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !path.is_empty() {
                return Some(path);
            }
        }
    }

    None
}

pub fn is_available(kind: ToolKind) -> bool {
    find_binary(kind).is_some()
}

pub fn detect(kind: ToolKind) -> ToolInfo {
    let path = find_binary(kind);
    let version = path.as_deref().and_then(|p| probe_version(p, kind));
    ToolInfo {
        name: kind.as_str().to_string(),
        kind,
        is_available: path.is_some(),
        path,
        version,
    }
}

pub fn all_tools() -> Vec<ToolInfo> {
    vec![detect(ToolKind::YtDlp), detect(ToolKind::Ffmpeg)]
}

fn probe_version(path: &str, kind: ToolKind) -> Option<String> {
    match Command::new(path).arg(kind.version_arg()).output() {
        Ok(output) if output.status.success() => {
            let out = String::from_utf8_lossy(&output.stdout);
            // ffmpeg prints a banner; the first line is enough
            out.lines().next().map(|l| l.trim().to_string())
        }
        _ => None,
    }
}
