use actix_web::{web, HttpResponse, Responder};

use crate::error::ApiError;
use crate::server;

/// HTTP handler for the index page
pub async fn index() -> impl Responder {
    HttpResponse::Ok().body("ligachess server")
}

/// Configure the HTTP routes. Malformed bodies and queries get the same
/// JSON error shape as every other rejection.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::BadRequest(err.to_string()).into()),
    )
    .service(web::resource("/api/games").route(web::post().to(server::create_game)))
    .service(
        web::resource("/api/online-move")
            .route(web::get().to(server::poll_game))
            .route(web::post().to(server::post_action)),
    )
    .service(web::resource("/").route(web::get().to(index)));
}
