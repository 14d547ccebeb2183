//! Web server exposing upload, version history, activation and catalog
//! search endpoints.

pub mod server;

pub use server::{create_router, run, AppState};
