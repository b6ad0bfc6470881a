//! AgroLens Gateway HTTP Server
//!
//! Accepts crop photos, forwards them to the multimodal AI gateway, and
//! returns the model's free-text diagnosis.

pub mod config;
pub mod crop_detect;
pub mod health_api;
pub mod server;

pub use config::GatewayConfig;
pub use server::{GatewayState, build_router, start_server};
