//! HTTP server for 40Weeks.

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod state;

pub use config::AppConfig;
pub use startup::{app, build_state};
pub use state::AppState;
