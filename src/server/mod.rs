// Thin HTTP host layer over VideoService

pub mod handlers;
pub mod state;

use actix_web::web;

pub use state::AppState;

/// Route table, shared by the binary and tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(handlers::index)))
        .service(web::resource("/api/health").route(web::get().to(handlers::health)))
        .service(web::resource("/api/videoInfo").route(web::get().to(handlers::video_info)))
        .service(web::resource("/api/download").route(web::get().to(handlers::download)))
        .service(web::resource("/api/audio").route(web::get().to(handlers::audio)));
}
