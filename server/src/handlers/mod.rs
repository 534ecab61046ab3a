use crate::connection::ws_index;
use crate::handlers::execute::configure_execute_handlers;
use actix_web::{web, Responder};

mod execute;

pub fn root(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)));
    cfg.service(web::resource("/ws/").route(web::get().to(ws_index)));

    configure_execute_handlers(cfg);
}

async fn index() -> impl Responder {
    "Server is running!"
}
