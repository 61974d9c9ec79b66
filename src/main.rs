use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use log::{error, info};

use ytserve_lib::config::AppConfig;
use ytserve_lib::downloader::tools::{ToolManager, ToolType};
use ytserve_lib::downloader::{CliExtractor, Downloader, VideoService};
use ytserve_lib::server::{self, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let cfg_path = std::env::args()
        .skip_while(|a| a != "--config")
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let cfg = match AppConfig::load(&cfg_path)
        .and_then(|c| c.with_port_override(std::env::var("PORT").ok()))
    {
        Ok(c) => c,
        Err(e) => {
            error!("[Config] Failed to load {}: {:#}", cfg_path, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = Downloader::prepare_root(&cfg.download_root) {
        error!("[Config] {}", e);
        std::process::exit(1);
    }

    let tools = match &cfg.ytdlp_path {
        Some(path) => ToolManager::with_search_path(Some(path.clone())),
        None => ToolManager::new(),
    };
    let ytdlp = tools.get_tool_info(ToolType::YtDlp, cfg.ytdlp_bin.as_deref());
    let ffmpeg = tools.get_tool_info(ToolType::Ffmpeg, cfg.ffmpeg_bin.as_deref());
    tools.report(&[ytdlp, ffmpeg.clone()]);

    let ytdlp_bin = tools.resolve_or_default(ToolType::YtDlp, cfg.ytdlp_bin.as_deref());
    let extractor = CliExtractor::new(ytdlp_bin)
        .with_ffmpeg(ffmpeg.path)
        .with_proxy(cfg.proxy.clone())
        .with_socket_timeout(cfg.socket_timeout_secs)
        .with_env_path(cfg.ytdlp_path.clone());

    let service = VideoService::new(
        Arc::new(extractor),
        cfg.client_identity(),
        cfg.download_root.clone(),
        cfg.audio_bitrate_kbps,
    );

    info!("========================================");
    info!("  ytserve {}", env!("CARGO_PKG_VERSION"));
    info!("  http://{}", cfg.listen_addr);
    info!("  downloads -> {}", cfg.download_root.display());
    info!("========================================");

    let bind_addr = cfg.listen_addr.clone();
    let state = web::Data::new(AppState {
        service: Arc::new(service),
    });

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(server::configure)
    })
    .bind(bind_addr.as_str())?
    .run()
    .await
}
