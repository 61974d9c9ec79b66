use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::info;
use serde::Deserialize;

use crate::downloader::extractors::ClientIdentity;
use crate::downloader::orchestrator::DEFAULT_AUDIO_BITRATE_KBPS;

/// Process-wide configuration. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: String,
    pub download_root: PathBuf,

    // Client identity injected into every provider call
    pub user_agent: Option<String>,
    pub cookies_file: Option<PathBuf>,

    pub ytdlp_bin: Option<PathBuf>,
    pub ffmpeg_bin: Option<PathBuf>,
    // PATH handed to yt-dlp (it finds ffmpeg/node through it)
    pub ytdlp_path: Option<String>,
    pub proxy: Option<String>,

    pub socket_timeout_secs: u32,
    pub audio_bitrate_kbps: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppConfigFile {
    listen_addr: Option<String>,
    download_root: Option<String>,
    user_agent: Option<String>,
    cookies_file: Option<String>,
    ytdlp_bin: Option<String>,
    ffmpeg_bin: Option<String>,
    ytdlp_path: Option<String>,
    proxy: Option<String>,
    socket_timeout_secs: Option<u32>,
    audio_bitrate_kbps: Option<u32>,
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.and_then(|s| {
        let s = s.trim().to_string();
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    })
}

fn default_download_root(configured: Option<String>) -> PathBuf {
    match configured {
        Some(raw) if raw.trim().is_empty() => dirs::download_dir()
            .map(|d| d.join("ytserve"))
            .unwrap_or_else(|| PathBuf::from("./downloads")),
        Some(raw) => PathBuf::from(raw.trim()),
        None => PathBuf::from("./downloads"),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_file(AppConfigFile::default())
    }
}

impl AppConfig {
    /// Load from `path`. A missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("[Config] {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let file: AppConfigFile = toml::from_str(raw).context("Invalid TOML")?;
        let cfg = Self::from_file(file);
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: AppConfigFile) -> Self {
        Self {
            listen_addr: non_empty(file.listen_addr).unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            download_root: default_download_root(file.download_root),
            user_agent: non_empty(file.user_agent),
            cookies_file: non_empty(file.cookies_file).map(PathBuf::from),
            ytdlp_bin: non_empty(file.ytdlp_bin).map(PathBuf::from),
            ffmpeg_bin: non_empty(file.ffmpeg_bin).map(PathBuf::from),
            ytdlp_path: non_empty(file.ytdlp_path),
            proxy: non_empty(file.proxy),
            socket_timeout_secs: file.socket_timeout_secs.unwrap_or(30),
            audio_bitrate_kbps: file.audio_bitrate_kbps.unwrap_or(DEFAULT_AUDIO_BITRATE_KBPS),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.socket_timeout_secs == 0 {
            return Err(anyhow!("socket_timeout_secs must be greater than 0"));
        }
        if !(32..=320).contains(&self.audio_bitrate_kbps) {
            return Err(anyhow!(
                "Invalid audio_bitrate_kbps: {} (expected 32..=320)",
                self.audio_bitrate_kbps
            ));
        }
        if !self.listen_addr.contains(':') {
            return Err(anyhow!(
                "Invalid listen_addr: {} (expected host:port)",
                self.listen_addr
            ));
        }
        Ok(())
    }

    /// Replace the port of `listen_addr` (the `PORT` env var on hosted platforms)
    pub fn with_port_override(mut self, port: Option<String>) -> Result<Self> {
        let Some(port) = non_empty(port) else {
            return Ok(self);
        };
        let port: u16 = port
            .parse()
            .with_context(|| format!("Invalid PORT value: {}", port))?;
        let host = self
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.listen_addr = format!("{}:{}", host, port);
        Ok(self)
    }

    pub fn client_identity(&self) -> ClientIdentity {
        ClientIdentity::default()
            .with_user_agent(self.user_agent.clone())
            .with_cookie_context(self.cookies_file.clone())
    }
}
