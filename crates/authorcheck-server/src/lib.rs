//! authorcheck Server
//!
//! Command-line entry point and HTTP prediction server.

pub mod cli;
pub mod commands;
pub mod routes;
pub mod state;

pub use cli::{Cli, Commands};
pub use routes::{create_router, PredictRequest, PredictResponse};
pub use state::AppState;
