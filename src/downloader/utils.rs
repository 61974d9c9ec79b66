// Helper functions for provider implementations

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::process::Stdio;

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use tokio::process::Command as TokioCommand;

lazy_static! {
    // What follows "<stem>." in files yt-dlp derives from an `%(ext)s`
    // template: "webm", "m4a", "f251.webm", "temp.mp4", "webm.part"
    static ref TEMPLATE_SUFFIX_RE: Regex =
        Regex::new(r"^(?:f[0-9]+\.|temp\.)?[A-Za-z0-9]{1,5}(?:\.part|\.ytdl)?$").unwrap();
}

/// Run a program to completion and capture its output.
///
/// No timeout is applied; only the provider's socket timeout. A spawn
/// failure is returned as `Err`, a non-zero exit as `Ok`.
pub async fn run_output(
    program: &Path,
    args: &[String],
    env_path: Option<&str>,
) -> Result<std::process::Output, std::io::Error> {
    let mut cmd = TokioCommand::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(path) = env_path {
        cmd.env("PATH", path);
    }

    debug!("[utils] exec {} {}", program.display(), args.join(" "));
    cmd.output().await
}

/// Last `max_lines` non-empty lines of captured stderr
pub fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return "no stderr output captured".to_string();
    }
    let skip = lines.len().saturating_sub(max_lines);
    lines[skip..].join("\n")
}

/// Remove a partially written file. Missing files are fine.
pub async fn remove_partial(path: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == IoErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Remove every file an `%(ext)s` template rooted at `destination` may have
/// produced, `destination` itself included. Returns how many were removed.
pub async fn remove_template_outputs(destination: &Path) -> Result<usize, std::io::Error> {
    let Some(stem) = destination.file_stem().and_then(|s| s.to_str()) else {
        return Ok(0);
    };
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let prefix = format!("{}.", stem);

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(suffix) = name.to_str().and_then(|n| n.strip_prefix(&prefix)) else {
            continue;
        };
        if TEMPLATE_SUFFIX_RE.is_match(suffix) {
            debug!("[utils] removing leftover {}", entry.path().display());
            remove_partial(&entry.path()).await?;
            removed += 1;
        }
    }
    Ok(removed)
}
