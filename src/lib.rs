pub mod auth;
pub mod dead_letter;
pub mod error;
pub mod handlers;
pub mod retry;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;
