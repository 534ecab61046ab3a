pub extern crate bincode;
pub extern crate serde;
pub extern crate serde_json;

mod client_session;
mod message;

pub use client_session::{ClientEffect, ClientSession, ClientSessionState};
pub use message::*;
