use actix_web::{web, App, HttpServer};
use log::info;

use ligachess::config::{self, ServerConfig};
use ligachess::models::AppState;
use ligachess::routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    config::load_dotenv();

    let config = ServerConfig::from_env();
    let bind_addr = config.bind_addr.clone();
    info!(
        "Starting ligachess server at http://{bind_addr} (default time control {})",
        config.default_time_control
    );

    // Create shared application state
    let app_state = web::Data::new(AppState::new(config));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .configure(configure_routes)
    })
    .bind(bind_addr)?
    .run()
    .await
}
