use actix_web::{web, HttpResponse};

use crate::gateway::{self, ExecuteRequest, GatewayConfig, GatewayError};

pub fn configure_execute_handlers(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/compile").route(web::post().to(post)));
}

async fn post(
    config: web::Data<GatewayConfig>,
    request: web::Json<ExecuteRequest>,
) -> Result<HttpResponse, GatewayError> {
    log::info!(
        "Execution request: language={} backend={:?}",
        request.language_tag,
        request.backend_selector
    );
    let response = gateway::execute(&config, &request).await?;
    Ok(HttpResponse::Ok().json(response))
}
