use actix_web::{middleware, web, App, HttpServer};
use exercise_runner::api::{configure_routes, cors_headers, json_config, AppState};
use exercise_runner::{banner, config};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Print the startup banner
    banner::print_banner();

    // A missing .env is fine; everything has a default.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("ℹ️  No .env file loaded: {}", e);
    }

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let app_config = config::AppConfig::load()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    let host = app_config.server.host.clone();
    let port = app_config.server.port;
    let max_body_bytes = app_config.server.max_body_bytes;

    log::info!(
        "Using {} backend, {}ms timeout per execution",
        app_config.sandbox.backend,
        app_config.sandbox.timeout_ms
    );

    let state = AppState::new(app_config);

    println!("🚀 Starting server...");
    println!("🧪 Execution endpoint available at http://{}:{}/api/v1/execute", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(json_config(max_body_bytes))
            .wrap(cors_headers())
            .wrap(middleware::Logger::default())
            .configure(configure_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
