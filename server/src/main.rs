use actix_cors::Cors;
use actix_web::{App, HttpServer};

use server::gateway::GatewayConfig;
use server::handlers;
use server::server::spawn_server;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init();

    let config = GatewayConfig::from_env();
    if !config.has_jdoodle_credentials() {
        log::warn!("JDoodle credentials are not set; jdoodle execution requests will fail");
    }

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(5000);

    let srv_tx = spawn_server();

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .data(srv_tx.clone())
            .data(config.clone())
            .configure(handlers::root)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
