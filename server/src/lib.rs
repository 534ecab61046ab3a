pub mod connection;
mod connection_tx_storage;
pub mod gateway;
pub mod handlers;
mod room;
pub mod server;
mod server_state;
