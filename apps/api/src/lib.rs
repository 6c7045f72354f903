//! Resume API: renders resume documents to HTML and PDF, and stores the
//! photos they reference. `main.rs` wires these modules into the server.

pub mod config;
pub mod editor;
pub mod errors;
pub mod generation;
pub mod models;
pub mod render;
pub mod routes;
pub mod state;
pub mod uploads;
